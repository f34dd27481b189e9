//! EventHub - Camera Event Distribution
//!
//! ## Responsibilities
//!
//! - Subscriber registration
//! - Fan-out of live-view images, attribute changes and stream restarts
//!
//! Subscribers receive every event on their own unbounded channel. Images
//! are bounded upstream by the flow controller, not here.

use crate::live_view::ImageFrame;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Names of the attributes touched by one refresh
pub type ChangeSet = BTreeSet<String>;

/// Events emitted by the camera
#[derive(Debug, Clone)]
pub enum CameraEvent {
    /// A live-view JPEG frame; call `ack()` once it has been shown
    ImageReceived(ImageFrame),
    /// Device-reported attributes changed
    AttributesChanged(ChangeSet),
    /// The watchdog tore down a stalled stream and reconnected
    StreamDisconnected,
    /// A setting value changed (user write or device refresh)
    SettingChanged { key: String, value: String },
    /// A blocking device operation started (`true`) or finished (`false`)
    LongRunningProcess(bool),
}

struct Subscriber {
    tx: mpsc::UnboundedSender<CameraEvent>,
}

/// EventHub instance
pub struct EventHub {
    subscribers: RwLock<HashMap<Uuid, Subscriber>>,
    subscriber_count: AtomicU64,
}

impl EventHub {
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            subscriber_count: AtomicU64::new(0),
        }
    }

    /// Register a new subscriber
    pub async fn register(&self) -> (Uuid, mpsc::UnboundedReceiver<CameraEvent>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();

        self.subscribers.write().await.insert(id, Subscriber { tx });
        self.subscriber_count.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(subscriber_id = %id, "Event subscriber registered");

        (id, rx)
    }

    /// Unregister a subscriber
    pub async fn unregister(&self, id: &Uuid) {
        let mut subscribers = self.subscribers.write().await;
        if subscribers.remove(id).is_some() {
            self.subscriber_count.fetch_sub(1, Ordering::Relaxed);
            tracing::debug!(subscriber_id = %id, "Event subscriber removed");
        }
    }

    /// Send an event to every subscriber, dropping closed ones
    pub async fn broadcast(&self, event: CameraEvent) {
        let mut closed = Vec::new();

        {
            let subscribers = self.subscribers.read().await;
            for (id, subscriber) in subscribers.iter() {
                if subscriber.tx.send(event.clone()).is_err() {
                    closed.push(*id);
                }
            }
        }

        for id in closed {
            self.unregister(&id).await;
        }
    }

    pub fn subscriber_count(&self) -> u64 {
        self.subscriber_count.load(Ordering::Relaxed)
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}
