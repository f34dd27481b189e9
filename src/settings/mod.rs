//! SettingsRegistry - Write-Through Camera Settings
//!
//! ## Responsibilities
//!
//! - Named, typed view over every controllable setting
//! - User writes are sent to the device; identical writes are no-ops
//! - Device-reported values are applied without being sent back
//!
//! The write mode and the values sit behind one mutex. A refresh batch holds
//! it for its whole duration in `WriteMode::ApplyingRefresh`, so a user
//! write can never observe or interleave with a half-applied refresh.

pub mod encoding;
pub mod types;

use crate::error::{Error, Result};
use crate::event_hub::{CameraEvent, EventHub};
use crate::rpc_channel::RpcChannel;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Mutex;

pub use encoding::{ColorTemperatureRange, ExposureScale};
pub use types::{keys, Setting, WriteBack, WriteMode, WriteOutcome, COLOR_TEMPERATURE_MODE};

/// RPC issued for a user write
#[derive(Debug, Clone, PartialEq)]
struct WriteRequest {
    method: &'static str,
    params: Vec<Value>,
}

struct RegistryState {
    settings: Vec<Setting>,
    mode: WriteMode,
    exposure_scale: Option<ExposureScale>,
    color_temperature: Option<ColorTemperatureRange>,
}

impl RegistryState {
    fn find(&self, key: &str) -> Option<&Setting> {
        self.settings.iter().find(|s| s.key == key)
    }

    fn find_mut(&mut self, key: &str) -> Option<&mut Setting> {
        self.settings.iter_mut().find(|s| s.key == key)
    }

    /// Store `value`; returns the write-back request when `mode` allows one
    fn assign(
        &mut self,
        key: &str,
        value: &str,
        mode: WriteMode,
    ) -> Result<Option<WriteRequest>> {
        let setting = self
            .find(key)
            .ok_or_else(|| Error::UnknownSetting(key.to_string()))?;

        if setting.value == value {
            return Ok(None);
        }

        let request = match mode {
            WriteMode::Idle => {
                if !setting.is_settable() {
                    return Err(Error::NotSettable(key.to_string()));
                }
                Some(self.write_request(setting.write_back, value)?)
            }
            WriteMode::ApplyingRefresh => None,
        };

        if let Some(setting) = self.find_mut(key) {
            setting.value = value.to_string();
        }

        Ok(request)
    }

    fn write_request(&self, write_back: WriteBack, value: &str) -> Result<WriteRequest> {
        let (method, params) = match write_back {
            WriteBack::Method(method) => (method, vec![json!(value)]),
            WriteBack::ExposureMode => ("setExposureMode", vec![json!(value)]),
            WriteBack::SelfTimer => {
                let seconds: i64 = value
                    .trim()
                    .parse()
                    .map_err(|_| Error::Parse(format!("invalid self timer '{}'", value)))?;
                ("setSelfTimer", vec![json!(seconds)])
            }
            WriteBack::StillSize => {
                let (aspect, size) = value.split_once('-').ok_or_else(|| {
                    Error::Parse(format!("expected 'aspect - size', got '{}'", value))
                })?;
                ("setStillSize", vec![json!(aspect.trim()), json!(size.trim())])
            }
            WriteBack::ExposureCompensation => {
                let scale = self.exposure_scale.ok_or_else(|| {
                    Error::NotSettable(keys::EXPOSURE_COMPENSATION.to_string())
                })?;
                ("setExposureCompensation", vec![json!(scale.encode(value)?)])
            }
            WriteBack::WhiteBalance => {
                ("setWhiteBalance", vec![json!(value), json!(false), json!(0)])
            }
            WriteBack::ColorTemperature => {
                let range = self.color_temperature.as_ref().ok_or_else(|| {
                    Error::NotSettable(keys::COLOR_TEMPERATURE.to_string())
                })?;
                (
                    "setWhiteBalance",
                    vec![
                        json!(COLOR_TEMPERATURE_MODE),
                        json!(true),
                        json!(range.encode(value)?),
                    ],
                )
            }
        };

        Ok(WriteRequest { method, params })
    }
}

/// Device-side view of the registry, only reachable inside
/// [`SettingsRegistry::apply_refresh`]
pub struct RefreshBatch<'a> {
    state: &'a mut RegistryState,
    notices: Vec<(String, String)>,
}

impl RefreshBatch<'_> {
    /// Apply a device-reported value; never written back
    pub fn set_value(&mut self, key: &str, value: &str) -> bool {
        debug_assert_eq!(self.state.mode, WriteMode::ApplyingRefresh);

        let changed = match self.state.find(key) {
            Some(setting) => setting.value != value,
            None => {
                tracing::warn!(key = %key, "Refresh for unknown setting ignored");
                return false;
            }
        };

        if changed {
            // ApplyingRefresh never produces a request or fails settability
            let _ = self.state.assign(key, value, WriteMode::ApplyingRefresh);
            self.notices.push((key.to_string(), value.to_string()));
        }

        changed
    }

    pub fn set_options(&mut self, key: &str, options: Option<Vec<String>>) {
        match self.state.find_mut(key) {
            Some(setting) => setting.options = options,
            None => tracing::warn!(key = %key, "Options for unknown setting ignored"),
        }
    }

    pub fn set_exposure_scale(&mut self, scale: ExposureScale) {
        self.state.exposure_scale = Some(scale);
    }

    pub fn exposure_scale(&self) -> Option<ExposureScale> {
        self.state.exposure_scale
    }

    pub fn set_color_temperature_range(&mut self, range: Option<ColorTemperatureRange>) {
        self.state.color_temperature = range;
    }

    /// Forget every reported option list
    pub fn clear_options(&mut self) {
        for setting in &mut self.state.settings {
            setting.options = None;
        }
    }

    pub fn value(&self, key: &str) -> Option<&str> {
        self.state.find(key).map(|s| s.value.as_str())
    }
}

/// SettingsRegistry instance
pub struct SettingsRegistry {
    state: Mutex<RegistryState>,
    rpc: Arc<dyn RpcChannel>,
    hub: Arc<EventHub>,
}

impl SettingsRegistry {
    pub fn new(rpc: Arc<dyn RpcChannel>, hub: Arc<EventHub>) -> Self {
        Self {
            state: Mutex::new(RegistryState {
                settings: types::catalog(),
                mode: WriteMode::Idle,
                exposure_scale: None,
                color_temperature: None,
            }),
            rpc,
            hub,
        }
    }

    pub async fn get(&self, key: &str) -> Option<Setting> {
        self.state.lock().await.find(key).cloned()
    }

    pub async fn value(&self, key: &str) -> Option<String> {
        self.state.lock().await.find(key).map(|s| s.value.clone())
    }

    pub async fn all(&self) -> Vec<Setting> {
        self.state.lock().await.settings.clone()
    }

    /// Settings the device has reported candidates for
    pub async fn available(&self) -> Vec<Setting> {
        self.state
            .lock()
            .await
            .settings
            .iter()
            .filter(|s| s.is_settable())
            .cloned()
            .collect()
    }

    pub async fn exposure_scale(&self) -> Option<ExposureScale> {
        self.state.lock().await.exposure_scale
    }

    /// User write
    ///
    /// Identical values are a no-op. A changed value is stored, announced,
    /// then sent to the device. If the device rejects it the previous value
    /// is restored and announced, and the error is returned.
    pub async fn set(&self, key: &str, value: &str) -> Result<WriteOutcome> {
        let mut state = self.state.lock().await;

        let mode = state.mode;
        let current = state
            .find(key)
            .map(|s| s.value.clone())
            .ok_or_else(|| Error::UnknownSetting(key.to_string()))?;
        if current == value {
            return Ok(WriteOutcome::default());
        }

        let request = state.assign(key, value, mode)?;
        let write_back = state.find(key).map(|s| s.write_back);

        self.notify(key, value).await;

        let Some(request) = request else {
            return Ok(WriteOutcome {
                changed: true,
                requires_refresh: false,
            });
        };

        tracing::info!(key = %key, value = %value, method = %request.method, "Writing setting");
        if let Err(e) = self.rpc.invoke(request.method, request.params).await {
            tracing::warn!(key = %key, value = %value, error = %e, "Setting write rejected");
            state.assign(key, &current, WriteMode::ApplyingRefresh)?;
            self.notify(key, &current).await;
            return Err(e);
        }

        if write_back == Some(WriteBack::ColorTemperature) {
            let switched = state
                .assign(keys::WHITE_BALANCE, COLOR_TEMPERATURE_MODE, WriteMode::ApplyingRefresh)?;
            debug_assert!(switched.is_none());
            self.notify(keys::WHITE_BALANCE, COLOR_TEMPERATURE_MODE).await;
        }

        Ok(WriteOutcome {
            changed: true,
            requires_refresh: write_back == Some(WriteBack::ExposureMode),
        })
    }

    /// Apply device-reported values with write-back suppressed
    pub async fn apply_refresh<T>(&self, f: impl FnOnce(&mut RefreshBatch<'_>) -> T) -> T {
        let (out, notices) = {
            let mut state = self.state.lock().await;
            state.mode = WriteMode::ApplyingRefresh;

            let mut batch = RefreshBatch {
                state: &mut *state,
                notices: Vec::new(),
            };
            let out = f(&mut batch);
            let notices = std::mem::take(&mut batch.notices);

            state.mode = WriteMode::Idle;
            (out, notices)
        };

        for (key, value) in notices {
            self.notify(&key, &value).await;
        }

        out
    }

    async fn notify(&self, key: &str, value: &str) {
        self.hub
            .broadcast(CameraEvent::SettingChanged {
                key: key.to_string(),
                value: value.to_string(),
            })
            .await;
    }
}
