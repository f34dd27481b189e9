//! camremote - Camera Remote Console
//!
//! Connects to the camera, mirrors its status, and streams live view until
//! Ctrl-C. Every event is logged.

use camremote::{
    camera::Camera,
    config::AppConfig,
    event_hub::CameraEvent,
    live_view::HttpStreamSource,
    rpc_channel::JsonRpcClient,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "camremote=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting camremote v{}", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::from_env();
    tracing::info!(
        camera_endpoint = %config.camera_endpoint,
        rpc_timeout_ms = config.rpc_timeout.as_millis() as u64,
        poll_min_interval_ms = config.polling.min_interval.as_millis() as u64,
        max_pending_frames = config.live_view.max_pending_frames,
        "Configuration loaded"
    );

    let rpc = Arc::new(JsonRpcClient::new(&config.camera_endpoint, config.rpc_timeout)?);
    let camera = Camera::new(rpc, &config);
    let cancel = CancellationToken::new();

    // Log every event, acknowledging frames as soon as they are seen
    let (_, mut events) = camera.subscribe().await;
    let logger = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                CameraEvent::ImageReceived(frame) => {
                    tracing::trace!(sequence = frame.sequence, bytes = frame.len(), "Frame");
                    frame.ack();
                }
                CameraEvent::AttributesChanged(changes) => {
                    tracing::info!(changed = ?changes, "Attributes changed");
                }
                CameraEvent::SettingChanged { key, value } => {
                    tracing::info!(key = %key, value = %value, "Setting changed");
                }
                CameraEvent::StreamDisconnected => {
                    tracing::warn!("Live view reconnected");
                }
                CameraEvent::LongRunningProcess(running) => {
                    tracing::info!(running = running, "Long running process");
                }
            }
        }
    });

    camera.start_status_polling(cancel.clone()).await?;

    let state = camera.device_state().await;
    tracing::info!(
        status = ?state.status,
        shoot_mode = ?state.shoot_mode,
        available_settings = camera.available_settings().await.len(),
        "Camera connected"
    );

    let source = Arc::new(HttpStreamSource::new(config.rpc_timeout)?);
    let live_view = camera.start_live_view(source, cancel.clone()).await?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");

    cancel.cancel();
    let restarts = live_view.await?;
    tracing::info!(restarts = restarts, "Live view finished");

    drop(camera);
    logger.abort();

    Ok(())
}
