//! Watchdog-supervised live-view client
//!
//! One reader task per session decodes frames and pushes them through the
//! flow controller to the event hub. A separate timer loop watches the
//! session's decode counter and replaces the whole session when it stops
//! moving. Read errors never surface to the caller; they just look like a
//! stall.

use super::decoder::FrameDecoder;
use super::flow::{FlowController, ImageFrame};
use super::source::StreamSource;
use super::watchdog::{Watchdog, WatchdogAction};
use crate::config::LiveViewConfig;
use crate::event_hub::{CameraEvent, EventHub};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// A running reader task and its progress counter
struct StreamSession {
    id: u64,
    produced: Arc<AtomicU64>,
    cancel: CancellationToken,
    _task: JoinHandle<()>,
}

impl StreamSession {
    fn produced(&self) -> u64 {
        self.produced.load(Ordering::Relaxed)
    }

    fn shutdown(&self) {
        self.cancel.cancel();
        tracing::debug!(session_id = self.id, "Live-view session cancelled");
    }
}

/// LiveViewClient instance
pub struct LiveViewClient {
    url: String,
    source: Arc<dyn StreamSource>,
    hub: Arc<EventHub>,
    flow: FlowController,
    config: LiveViewConfig,
    next_session_id: u64,
}

impl LiveViewClient {
    pub fn new(
        url: String,
        source: Arc<dyn StreamSource>,
        hub: Arc<EventHub>,
        config: LiveViewConfig,
    ) -> Self {
        Self {
            url,
            source,
            hub,
            flow: FlowController::new(config.max_pending_frames),
            config,
            next_session_id: 0,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Shared handle to the delivery counters
    pub fn flow(&self) -> FlowController {
        self.flow.clone()
    }

    /// Run on a background task; resolves to the number of restarts
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<u64> {
        tokio::spawn(self.run(cancel))
    }

    /// Supervise sessions until `cancel` fires
    pub async fn run(mut self, cancel: CancellationToken) -> u64 {
        tracing::info!(url = %self.url, "Starting live view");

        let mut watchdog = Watchdog::new();
        let mut session = self.open_session(&cancel);

        let period = self.config.watchdog_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    watchdog.stop();
                }
                _ = ticker.tick() => {}
            }

            match watchdog.on_tick(session.produced()) {
                WatchdogAction::Continue => {}
                WatchdogAction::Halt => break,
                WatchdogAction::Restart => {
                    tracing::warn!(
                        session_id = session.id,
                        restarts = watchdog.restarts(),
                        "No live-view frame within watchdog interval, restarting stream"
                    );

                    session.shutdown();
                    self.hub.broadcast(CameraEvent::StreamDisconnected).await;
                    session = self.open_session(&cancel);

                    tokio::select! {
                        _ = cancel.cancelled() => {
                            watchdog.stop();
                            continue;
                        }
                        _ = sleep(self.config.watchdog_cooldown) => {}
                    }

                    watchdog.on_restarted();
                    ticker.reset();
                }
            }
        }

        session.shutdown();
        tracing::info!(restarts = watchdog.restarts(), "Live view stopped");
        watchdog.restarts()
    }

    fn open_session(&mut self, parent: &CancellationToken) -> StreamSession {
        let id = self.next_session_id;
        self.next_session_id += 1;

        let produced = Arc::new(AtomicU64::new(0));
        let cancel = parent.child_token();

        let task = tokio::spawn(read_session(
            id,
            self.url.clone(),
            self.source.clone(),
            produced.clone(),
            self.flow.clone(),
            self.hub.clone(),
            cancel.clone(),
        ));

        StreamSession {
            id,
            produced,
            cancel,
            _task: task,
        }
    }
}

async fn read_session(
    id: u64,
    url: String,
    source: Arc<dyn StreamSource>,
    produced: Arc<AtomicU64>,
    flow: FlowController,
    hub: Arc<EventHub>,
    cancel: CancellationToken,
) {
    let opened = tokio::select! {
        _ = cancel.cancelled() => return,
        opened = source.open(&url) => opened,
    };

    let stream = match opened {
        Ok(stream) => stream,
        Err(e) => {
            tracing::debug!(session_id = id, error = %e, "Live-view stream open failed");
            return;
        }
    };

    let mut decoder = FrameDecoder::with_progress(stream, produced);

    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => break,
            next = decoder.next_image() => next,
        };

        match next {
            Ok(Some(image)) => match flow.try_admit() {
                Some(ack) => {
                    let frame = ImageFrame::new(image.data, image.sequence, ack);
                    hub.broadcast(CameraEvent::ImageReceived(frame)).await;
                }
                None => {
                    tracing::trace!(
                        session_id = id,
                        sequence = image.sequence,
                        pending = flow.pending(),
                        "Consumer behind, dropping frame"
                    );
                }
            },
            Ok(None) => {
                tracing::debug!(session_id = id, "Live-view stream ended");
                break;
            }
            Err(e) => {
                tracing::debug!(session_id = id, error = %e, "Live-view read failed");
                break;
            }
        }
    }
}
