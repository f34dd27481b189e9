//! Live-view backpressure
//!
//! A frame is delivered only while `produced - acknowledged <= threshold`.
//! Anything past that is dropped on the floor: live view prefers the newest
//! picture over a complete one.

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct Counters {
    produced: AtomicU64,
    acknowledged: AtomicU64,
}

/// Produced/acknowledged bookkeeping for delivered frames
#[derive(Debug, Clone)]
pub struct FlowController {
    counters: Arc<Counters>,
    threshold: u64,
}

impl FlowController {
    pub fn new(threshold: u64) -> Self {
        Self {
            counters: Arc::new(Counters::default()),
            threshold,
        }
    }

    /// Reserve a delivery slot, or `None` if the consumer is too far behind
    pub fn try_admit(&self) -> Option<AckHandle> {
        let produced = self.counters.produced.load(Ordering::Acquire);
        let acknowledged = self.counters.acknowledged.load(Ordering::Acquire);

        if produced.saturating_sub(acknowledged) > self.threshold {
            return None;
        }

        self.counters.produced.fetch_add(1, Ordering::AcqRel);
        Some(AckHandle {
            counters: self.counters.clone(),
            fired: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn produced(&self) -> u64 {
        self.counters.produced.load(Ordering::Acquire)
    }

    pub fn acknowledged(&self) -> u64 {
        self.counters.acknowledged.load(Ordering::Acquire)
    }

    pub fn pending(&self) -> u64 {
        self.produced().saturating_sub(self.acknowledged())
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }
}

/// One-shot acknowledgement; clones share the same shot
#[derive(Clone)]
pub struct AckHandle {
    counters: Arc<Counters>,
    fired: Arc<AtomicBool>,
}

impl AckHandle {
    /// Mark the frame as consumed. Later calls are ignored.
    pub fn ack(&self) {
        if !self.fired.swap(true, Ordering::AcqRel) {
            self.counters.acknowledged.fetch_add(1, Ordering::AcqRel);
        }
    }

    pub fn is_acked(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }
}

impl fmt::Debug for AckHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AckHandle")
            .field("acked", &self.is_acked())
            .finish()
    }
}

/// A delivered live-view JPEG
#[derive(Debug, Clone)]
pub struct ImageFrame {
    pub data: Arc<[u8]>,
    pub sequence: u16,
    pub received_at: DateTime<Utc>,
    ack: AckHandle,
}

impl ImageFrame {
    pub fn new(data: Vec<u8>, sequence: u16, ack: AckHandle) -> Self {
        Self {
            data: data.into(),
            sequence,
            received_at: Utc::now(),
            ack,
        }
    }

    /// Tell the client this frame has been shown
    pub fn ack(&self) {
        self.ack.ack();
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
