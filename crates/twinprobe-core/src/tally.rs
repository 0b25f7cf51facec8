//! Message tally for stream observation.
//!
//! Thread-safe counters shared between the receive loop and the supervisor.
//! The tally only grows while open and stops counting once frozen, so the
//! final figures are exactly those at teardown.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::types::Payload;

/// Counts messages received on a channel.
#[derive(Debug, Clone)]
pub struct MessageTally {
    inner: Arc<TallyInner>,
}

#[derive(Debug)]
struct TallyInner {
    total: AtomicU64,
    structured: AtomicU64,
    raw: AtomicU64,
    frozen: AtomicBool,
}

impl MessageTally {
    /// Creates an empty tally.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(TallyInner {
                total: AtomicU64::new(0),
                structured: AtomicU64::new(0),
                raw: AtomicU64::new(0),
                frozen: AtomicBool::new(false),
            }),
        }
    }

    /// Records a message and returns its 1-based sequence number.
    ///
    /// Returns `None` once the tally is frozen.
    pub fn record(&self, payload: &Payload) -> Option<u64> {
        if self.is_frozen() {
            return None;
        }
        let kind = if payload.is_structured() {
            &self.inner.structured
        } else {
            &self.inner.raw
        };
        kind.fetch_add(1, Ordering::Relaxed);
        Some(self.inner.total.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Stops counting. Idempotent.
    pub fn freeze(&self) {
        self.inner.frozen.store(true, Ordering::SeqCst);
    }

    /// Returns true once the tally is frozen.
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.inner.frozen.load(Ordering::SeqCst)
    }

    /// Returns the total number of messages.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.inner.total.load(Ordering::SeqCst)
    }

    /// Returns the number of messages that decoded as JSON.
    #[must_use]
    pub fn structured(&self) -> u64 {
        self.inner.structured.load(Ordering::Relaxed)
    }

    /// Returns the number of messages kept as raw text.
    #[must_use]
    pub fn raw(&self) -> u64 {
        self.inner.raw.load(Ordering::Relaxed)
    }

    /// Returns a point-in-time copy of the counters.
    #[must_use]
    pub fn snapshot(&self) -> TallySnapshot {
        TallySnapshot {
            total: self.total(),
            structured: self.structured(),
            raw: self.raw(),
        }
    }
}

impl Default for MessageTally {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of a [`MessageTally`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TallySnapshot {
    /// Total messages.
    pub total: u64,
    /// Messages that decoded as JSON.
    pub structured: u64,
    /// Messages kept as raw text.
    pub raw: u64,
}
