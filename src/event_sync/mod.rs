//! StateSynchronizer - Device Status Mirror
//!
//! ## Responsibilities
//!
//! - `getEvent` polling with a minimum interval between poll starts
//! - Sparse slot decoding into device attributes and settings
//! - Option-list follow-up fetches for still sizes and white balance
//!
//! ## Flow
//!
//! ```text
//! getEvent([long_poll]) -> RpcSlots -> SLOT_TABLE -> DeviceState / SettingsRegistry
//!                                               \-> ChangeSet -> AttributesChanged
//! ```

pub mod slots;
pub mod types;

use crate::config::PollingConfig;
use crate::error::Result;
use crate::event_hub::{CameraEvent, ChangeSet, EventHub};
use crate::rpc_channel::{RpcChannel, RpcSlots};
use crate::settings::{keys, SettingsRegistry};
use serde_json::{json, Value};
use slots::{SecondaryFetch, SlotTarget, SLOT_TABLE};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;

pub use types::{attributes, status, DeviceState};

/// StateSynchronizer instance
pub struct StateSynchronizer {
    rpc: Arc<dyn RpcChannel>,
    hub: Arc<EventHub>,
    settings: Arc<SettingsRegistry>,
    device: RwLock<DeviceState>,
    config: PollingConfig,
    polling: Mutex<Option<JoinHandle<()>>>,
}

impl StateSynchronizer {
    pub fn new(
        rpc: Arc<dyn RpcChannel>,
        hub: Arc<EventHub>,
        settings: Arc<SettingsRegistry>,
        config: PollingConfig,
    ) -> Self {
        Self {
            rpc,
            hub,
            settings,
            device: RwLock::new(DeviceState::default()),
            config,
            polling: Mutex::new(None),
        }
    }

    /// Snapshot of the device attributes
    pub async fn device_state(&self) -> DeviceState {
        self.device.read().await.clone()
    }

    /// Current value of a device attribute or setting by change-set name
    pub async fn attribute(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.device.read().await.attribute(name) {
            return Some(value);
        }

        self.settings.value(name).await.map(Value::String)
    }

    /// Poll once and apply whatever the device reported
    ///
    /// On failure nothing changes and the error is returned.
    pub async fn refresh(&self, long_poll: bool) -> Result<ChangeSet> {
        let slots = self.rpc.invoke("getEvent", vec![json!(long_poll)]).await?;

        let (changes, fetches) = self.apply(&slots).await;

        for fetch in fetches {
            self.spawn_secondary(fetch);
        }

        Ok(changes)
    }

    /// Full status refresh with option lists rebuilt from scratch
    pub async fn resync(&self) -> Result<ChangeSet> {
        self.settings.apply_refresh(|batch| batch.clear_options()).await;

        let mut changes = self.refresh(false).await?;
        changes.insert(attributes::AVAILABLE_SETTINGS.to_string());

        self.hub
            .broadcast(CameraEvent::AttributesChanged(changes.clone()))
            .await;

        Ok(changes)
    }

    /// Start the background polling loop; `false` if one is already running
    pub async fn start_polling(self: &Arc<Self>, cancel: CancellationToken) -> bool {
        let mut polling = self.polling.lock().await;

        if polling.as_ref().is_some_and(|task| !task.is_finished()) {
            tracing::debug!("Status polling already running");
            return false;
        }

        let this = self.clone();
        *polling = Some(tokio::spawn(async move { this.poll_loop(cancel).await }));
        true
    }

    async fn poll_loop(&self, cancel: CancellationToken) {
        tracing::info!(
            min_interval_ms = self.config.min_interval.as_millis() as u64,
            "Status polling started"
        );

        let mut polls: u64 = 0;

        while !cancel.is_cancelled() {
            let started = Instant::now();

            let result = tokio::select! {
                _ = cancel.cancelled() => break,
                result = self.refresh(true) => result,
            };
            polls += 1;

            match result {
                Ok(changes) if !changes.is_empty() => {
                    tracing::trace!(changed = changes.len(), "Status changed");
                    self.hub
                        .broadcast(CameraEvent::AttributesChanged(changes))
                        .await;
                }
                Ok(_) => {}
                Err(e) if e.is_transient() || e.is_device_error() => {
                    tracing::debug!(error = %e, "Status poll failed");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Status poll returned an unreadable reply");
                }
            }

            if let Some(rest) = self.config.min_interval.checked_sub(started.elapsed()) {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = sleep(rest) => {}
                }
            }
        }

        tracing::info!(polls = polls, "Status polling stopped");
    }

    async fn apply(&self, slots: &RpcSlots) -> (ChangeSet, Vec<SecondaryFetch>) {
        let mut device = self.device.write().await;

        self.settings
            .apply_refresh(|batch| {
                let mut target = SlotTarget {
                    device: &mut *device,
                    settings: batch,
                };
                let mut changes = ChangeSet::new();
                let mut fetches = Vec::new();

                for binding in SLOT_TABLE {
                    let Some(slot) = slots.slot(binding.index) else {
                        continue;
                    };

                    match (binding.decode)(slot, &mut target) {
                        Ok(true) => {
                            changes.extend(binding.attributes.iter().map(|a| a.to_string()));
                            fetches.extend(binding.secondary);
                        }
                        Ok(false) => {}
                        Err(e) => {
                            tracing::warn!(
                                slot = binding.index,
                                error = %e,
                                "Undecodable event slot ignored"
                            );
                        }
                    }
                }

                (changes, fetches)
            })
            .await
    }

    fn spawn_secondary(&self, fetch: SecondaryFetch) {
        let rpc = self.rpc.clone();
        let settings = self.settings.clone();
        let hub = self.hub.clone();

        tokio::spawn(async move {
            let changed = match fetch {
                SecondaryFetch::StillSizes => fetch_still_sizes(rpc.as_ref(), &settings).await,
                SecondaryFetch::WhiteBalances => {
                    fetch_white_balances(rpc.as_ref(), &settings).await
                }
            };

            if let Some(mut changes) = changed {
                changes.insert(attributes::AVAILABLE_SETTINGS.to_string());
                hub.broadcast(CameraEvent::AttributesChanged(changes)).await;
            }
        });
    }
}

async fn fetch_still_sizes(rpc: &dyn RpcChannel, settings: &SettingsRegistry) -> Option<ChangeSet> {
    let options = rpc
        .invoke("getAvailableStillSize", Vec::new())
        .await
        .and_then(|reply| slots::still_size_options(&reply));

    match options {
        Ok(options) => {
            settings
                .apply_refresh(|batch| batch.set_options(keys::PHOTO_RESOLUTION, Some(options)))
                .await;
            Some(ChangeSet::from([keys::PHOTO_RESOLUTION.to_string()]))
        }
        Err(e) => {
            tracing::debug!(error = %e, "Still size candidates unavailable");
            None
        }
    }
}

async fn fetch_white_balances(
    rpc: &dyn RpcChannel,
    settings: &SettingsRegistry,
) -> Option<ChangeSet> {
    let candidates = rpc
        .invoke("getAvailableWhiteBalance", Vec::new())
        .await
        .and_then(|reply| slots::white_balance_candidates(&reply));

    settings
        .apply_refresh(|batch| match candidates {
            Ok(candidates) => {
                batch.set_options(keys::WHITE_BALANCE, Some(candidates.modes));
                batch.set_options(
                    keys::COLOR_TEMPERATURE,
                    candidates.color_temperature.as_ref().map(|r| r.options()),
                );
                batch.set_color_temperature_range(candidates.color_temperature);
            }
            Err(e) => {
                tracing::debug!(error = %e, "White balance candidates unavailable");
                batch.set_options(keys::WHITE_BALANCE, None);
            }
        })
        .await;

    Some(ChangeSet::from([
        keys::WHITE_BALANCE.to_string(),
        keys::COLOR_TEMPERATURE.to_string(),
    ]))
}
