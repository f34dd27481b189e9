//! Camera - Remote Control Facade
//!
//! ## Responsibilities
//!
//! - Wiring of registry, synchronizer and live-view client over one RPC channel
//! - Shutter and movie recording with shoot-mode switching
//! - Exposure-mode writes followed by a full status refresh
//!
//! ## Usage
//!
//! ```ignore
//! let camera = Camera::new(rpc, &config);
//! let (_, mut events) = camera.subscribe().await;
//! camera.start_status_polling(cancel.clone()).await?;
//! camera.start_live_view(source, cancel.clone()).await?;
//! ```

use crate::config::{AppConfig, LiveViewConfig, PollingConfig};
use crate::error::{Error, Result};
use crate::event_hub::{CameraEvent, ChangeSet, EventHub};
use crate::event_sync::{status, DeviceState, StateSynchronizer};
use crate::live_view::{LiveViewClient, StreamSource};
use crate::rpc_channel::RpcChannel;
use crate::settings::{Setting, SettingsRegistry, WriteOutcome};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// How often the shoot mode is re-read while waiting for a switch
const SHOOT_MODE_CHECK_INTERVAL: Duration = Duration::from_millis(500);

const SHOOT_MODE_STILL: &str = "still";
const SHOOT_MODE_MOVIE: &str = "movie";

/// Camera instance
pub struct Camera {
    rpc: Arc<dyn RpcChannel>,
    hub: Arc<EventHub>,
    settings: Arc<SettingsRegistry>,
    sync: Arc<StateSynchronizer>,
    polling: PollingConfig,
    live_view: LiveViewConfig,
}

impl Camera {
    pub fn new(rpc: Arc<dyn RpcChannel>, config: &AppConfig) -> Self {
        let hub = Arc::new(EventHub::new());
        let settings = Arc::new(SettingsRegistry::new(rpc.clone(), hub.clone()));
        let sync = Arc::new(StateSynchronizer::new(
            rpc.clone(),
            hub.clone(),
            settings.clone(),
            config.polling.clone(),
        ));

        Self {
            rpc,
            hub,
            settings,
            sync,
            polling: config.polling.clone(),
            live_view: config.live_view.clone(),
        }
    }

    /// Receive every camera event from now on
    pub async fn subscribe(&self) -> (Uuid, UnboundedReceiver<CameraEvent>) {
        self.hub.register().await
    }

    pub async fn unsubscribe(&self, id: &Uuid) {
        self.hub.unregister(id).await;
    }

    pub async fn device_state(&self) -> DeviceState {
        self.sync.device_state().await
    }

    /// Device attribute or setting value by change-set name
    pub async fn attribute(&self, name: &str) -> Option<Value> {
        self.sync.attribute(name).await
    }

    pub async fn setting(&self, key: &str) -> Option<Setting> {
        self.settings.get(key).await
    }

    pub async fn settings(&self) -> Vec<Setting> {
        self.settings.all().await
    }

    /// Settings the device currently offers candidates for
    pub async fn available_settings(&self) -> Vec<Setting> {
        self.settings.available().await
    }

    /// Full refresh, then the background long-poll loop
    ///
    /// Returns `false` when polling was already running.
    pub async fn start_status_polling(&self, cancel: CancellationToken) -> Result<bool> {
        self.sync.resync().await?;
        Ok(self.sync.start_polling(cancel).await)
    }

    /// Full refresh; option lists are rebuilt from scratch
    pub async fn refresh_status(&self) -> Result<ChangeSet> {
        self.sync.resync().await
    }

    /// Write a setting to the device
    pub async fn set_setting(&self, key: &str, value: &str) -> Result<WriteOutcome> {
        let outcome = self.settings.set(key, value).await?;

        if outcome.requires_refresh {
            self.hub.broadcast(CameraEvent::LongRunningProcess(true)).await;
            let refreshed = self.sync.resync().await;
            self.hub.broadcast(CameraEvent::LongRunningProcess(false)).await;
            refreshed?;
        }

        Ok(outcome)
    }

    /// Ask the device for its live-view URL and start streaming it
    ///
    /// Images arrive as `CameraEvent::ImageReceived`; the returned task
    /// resolves to the number of watchdog restarts once `cancel` fires.
    pub async fn start_live_view(
        &self,
        source: Arc<dyn StreamSource>,
        cancel: CancellationToken,
    ) -> Result<JoinHandle<u64>> {
        let reply = self.rpc.invoke("startLiveview", Vec::new()).await?;
        let url = reply
            .slot(0)
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Protocol("startLiveview returned no URL".to_string()))?
            .to_string();

        let client = LiveViewClient::new(url, source, self.hub.clone(), self.live_view.clone());
        Ok(client.spawn(cancel))
    }

    /// Take a still picture
    ///
    /// `Ok(None)` when the camera is not idle. Otherwise the URL of the
    /// post-view image.
    pub async fn shutter(&self) -> Result<Option<String>> {
        if !self.sync.device_state().await.is_status(status::IDLE) {
            tracing::debug!("Camera busy, shutter ignored");
            return Ok(None);
        }

        self.ensure_shoot_mode(SHOOT_MODE_STILL).await?;

        let reply = self.rpc.invoke("actTakePicture", Vec::new()).await?;
        let url = postview_url(reply.slot(0))
            .ok_or_else(|| Error::Protocol("actTakePicture returned no URL".to_string()))?;

        tracing::info!(url = %url, "Picture taken");
        Ok(Some(url))
    }

    /// Start or stop movie recording; `false` when the camera is busy
    pub async fn toggle_movie_recording(&self) -> Result<bool> {
        let state = self.sync.device_state().await;

        if state.is_status(status::MOVIE_RECORDING) {
            self.rpc.invoke("stopMovieRec", Vec::new()).await?;
            tracing::info!("Movie recording stopped");
            return Ok(true);
        }

        if !state.is_status(status::IDLE) {
            tracing::debug!(status = ?state.status, "Camera busy, movie toggle ignored");
            return Ok(false);
        }

        self.ensure_shoot_mode(SHOOT_MODE_MOVIE).await?;
        self.rpc.invoke("startMovieRec", Vec::new()).await?;
        tracing::info!("Movie recording started");
        Ok(true)
    }

    async fn ensure_shoot_mode(&self, mode: &str) -> Result<()> {
        if self.current_shoot_mode().await.as_deref() == Some(mode) {
            return Ok(());
        }

        tracing::info!(shoot_mode = %mode, "Switching shoot mode");
        self.rpc.invoke("setShootMode", vec![json!(mode)]).await?;

        let deadline = Instant::now() + self.polling.shoot_mode_wait;

        loop {
            sleep(SHOOT_MODE_CHECK_INTERVAL).await;

            match self.sync.refresh(false).await {
                Ok(changes) if !changes.is_empty() => {
                    self.hub
                        .broadcast(CameraEvent::AttributesChanged(changes))
                        .await;
                }
                Ok(_) => {}
                Err(e) => tracing::debug!(error = %e, "Status refresh failed"),
            }

            if self.current_shoot_mode().await.as_deref() == Some(mode) {
                return Ok(());
            }

            if Instant::now() >= deadline {
                return Err(Error::Timeout(format!(
                    "camera did not switch to {} shoot mode",
                    mode
                )));
            }
        }
    }

    async fn current_shoot_mode(&self) -> Option<String> {
        self.sync.device_state().await.shoot_mode
    }
}

/// `actTakePicture` reports either a URL or a list of URLs
fn postview_url(slot: Option<&Value>) -> Option<String> {
    match slot? {
        Value::String(url) => Some(url.clone()),
        Value::Array(urls) => urls.first()?.as_str().map(str::to_string),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeRpc, ScriptedStreamSource, StreamScript};

    fn event(status: &str, shoot_mode: &str) -> Vec<Value> {
        let mut slots = vec![Value::Null; 35];
        slots[1] = json!({"type": "cameraStatus", "cameraStatus": status});
        slots[21] = json!({"type": "shootMode", "currentShootMode": shoot_mode});
        slots
    }

    async fn camera_with(rpc: &Arc<FakeRpc>, status: &str, shoot_mode: &str) -> Camera {
        rpc.respond_once("getEvent", event(status, shoot_mode));
        let camera = Camera::new(rpc.clone(), &AppConfig::default());
        camera.refresh_status().await.unwrap();
        camera
    }

    #[test]
    fn test_postview_url_shapes() {
        assert_eq!(
            postview_url(Some(&json!(["http://cam/pict.jpg"]))).as_deref(),
            Some("http://cam/pict.jpg")
        );
        assert_eq!(
            postview_url(Some(&json!("http://cam/pict.jpg"))).as_deref(),
            Some("http://cam/pict.jpg")
        );
        assert_eq!(postview_url(Some(&json!([]))), None);
        assert_eq!(postview_url(None), None);
    }

    #[tokio::test]
    async fn test_shutter_ignored_when_busy() {
        let rpc = Arc::new(FakeRpc::new());
        let camera = camera_with(&rpc, "StillCapturing", SHOOT_MODE_STILL).await;

        assert_eq!(camera.shutter().await.unwrap(), None);
        assert_eq!(rpc.calls_to("actTakePicture"), 0);
    }

    #[tokio::test]
    async fn test_shutter_in_still_mode() {
        let rpc = Arc::new(FakeRpc::new());
        rpc.respond("actTakePicture", vec![json!(["http://cam/pict.jpg"])]);
        let camera = camera_with(&rpc, status::IDLE, SHOOT_MODE_STILL).await;

        let url = camera.shutter().await.unwrap();

        assert_eq!(url.as_deref(), Some("http://cam/pict.jpg"));
        assert_eq!(rpc.calls_to("setShootMode"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutter_switches_shoot_mode_first() {
        let rpc = Arc::new(FakeRpc::new());
        rpc.respond("actTakePicture", vec![json!(["http://cam/pict.jpg"])]);
        let camera = camera_with(&rpc, status::IDLE, SHOOT_MODE_MOVIE).await;
        rpc.respond("getEvent", event(status::IDLE, SHOOT_MODE_STILL));

        assert!(camera.shutter().await.unwrap().is_some());

        let methods: Vec<String> = rpc.calls().into_iter().map(|(m, _)| m).collect();
        assert_eq!(
            methods,
            vec!["getEvent", "setShootMode", "getEvent", "actTakePicture"]
        );
        assert_eq!(rpc.calls()[1].1, vec![json!("still")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shoot_mode_switch_times_out() {
        let rpc = Arc::new(FakeRpc::new());
        rpc.respond("getEvent", event(status::IDLE, SHOOT_MODE_MOVIE));
        let camera = camera_with(&rpc, status::IDLE, SHOOT_MODE_MOVIE).await;

        let err = camera.shutter().await.unwrap_err();

        assert!(matches!(err, Error::Timeout(_)));
        assert_eq!(rpc.calls_to("actTakePicture"), 0);
    }

    #[tokio::test]
    async fn test_toggle_movie_recording() {
        let rpc = Arc::new(FakeRpc::new());
        let camera = camera_with(&rpc, status::MOVIE_RECORDING, SHOOT_MODE_MOVIE).await;
        assert!(camera.toggle_movie_recording().await.unwrap());
        assert_eq!(rpc.calls_to("stopMovieRec"), 1);

        let rpc = Arc::new(FakeRpc::new());
        let camera = camera_with(&rpc, status::IDLE, SHOOT_MODE_MOVIE).await;
        assert!(camera.toggle_movie_recording().await.unwrap());
        assert_eq!(rpc.calls_to("startMovieRec"), 1);

        let rpc = Arc::new(FakeRpc::new());
        let camera = camera_with(&rpc, "NotReady", SHOOT_MODE_MOVIE).await;
        assert!(!camera.toggle_movie_recording().await.unwrap());
        assert_eq!(rpc.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_exposure_mode_write_is_bracketed_by_refresh() {
        let rpc = Arc::new(FakeRpc::new());
        let mut slots = event(status::IDLE, SHOOT_MODE_STILL);
        slots[18] = json!({
            "currentExposureMode": "Intelligent Auto",
            "exposureModeCandidates": ["Intelligent Auto", "Program Auto"]
        });
        rpc.respond_once("getEvent", slots);
        let camera = Camera::new(rpc.clone(), &AppConfig::default());
        camera.refresh_status().await.unwrap();
        let (_, mut rx) = camera.subscribe().await;

        let outcome = camera.set_setting("exposure_mode", "Program Auto").await.unwrap();
        assert!(outcome.requires_refresh);

        let mut sequence = Vec::new();
        while let Ok(event) = rx.try_recv() {
            match event {
                CameraEvent::LongRunningProcess(running) => sequence.push(format!("busy:{}", running)),
                CameraEvent::AttributesChanged(_) => sequence.push("attributes".to_string()),
                CameraEvent::SettingChanged { key, .. } => sequence.push(key),
                _ => {}
            }
        }

        assert_eq!(
            sequence,
            vec!["exposure_mode", "busy:true", "attributes", "busy:false"]
        );
        let methods: Vec<String> = rpc.calls().into_iter().map(|(m, _)| m).collect();
        assert_eq!(methods, vec!["getEvent", "setExposureMode", "getEvent"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_status_polling_resyncs_first() {
        let rpc = Arc::new(FakeRpc::new());
        rpc.respond("getEvent", event(status::IDLE, SHOOT_MODE_STILL));
        let camera = Camera::new(rpc.clone(), &AppConfig::default());

        let cancel = CancellationToken::new();
        assert!(camera.start_status_polling(cancel.clone()).await.unwrap());
        assert!(!camera.start_status_polling(cancel.clone()).await.unwrap());
        sleep(Duration::from_millis(100)).await;
        cancel.cancel();

        let calls = rpc.calls();
        assert_eq!(calls[0], ("getEvent".to_string(), vec![json!(false)]));
        assert!(calls
            .iter()
            .any(|call| call == &("getEvent".to_string(), vec![json!(true)])));
        assert!(camera.device_state().await.is_status(status::IDLE));
    }

    #[tokio::test(start_paused = true)]
    async fn test_live_view_delivers_images() {
        let rpc = Arc::new(FakeRpc::new());
        rpc.respond("startLiveview", vec![json!("http://cam/liveview")]);
        let camera = Camera::new(rpc.clone(), &AppConfig::default());
        let (_, mut rx) = camera.subscribe().await;

        let source = Arc::new(ScriptedStreamSource::new(vec![StreamScript::endless(
            Duration::from_millis(100),
        )]));
        let cancel = CancellationToken::new();
        let handle = camera.start_live_view(source, cancel.clone()).await.unwrap();

        let frame = loop {
            if let Some(CameraEvent::ImageReceived(frame)) = rx.recv().await {
                break frame;
            }
        };
        frame.ack();
        assert_eq!(frame.sequence, 0);

        cancel.cancel();
        assert_eq!(handle.await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_live_view_requires_url() {
        let rpc = Arc::new(FakeRpc::new());
        rpc.fail("startLiveview", 1, "Any");
        let camera = Camera::new(rpc.clone(), &AppConfig::default());
        let source = Arc::new(ScriptedStreamSource::new(Vec::new()));

        let err = camera
            .start_live_view(source, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.is_device_error());
    }
}
