//! Global clock
//!
//! The protocol never caches time: every operation reads the clock once at
//! entry and compares against that reading.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use sarco_core::Timestamp;

/// Source of the current (monotonically non-decreasing) time
pub trait Clock {
    fn now(&self) -> Timestamp;
}

/// Wall-clock time in Unix seconds
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// A clock that only moves when told to; clones share the same time
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(start)),
        }
    }

    /// Move to `t`; the clock never goes backwards
    pub fn set(&self, t: Timestamp) {
        self.now.fetch_max(t, Ordering::SeqCst);
    }

    pub fn advance(&self, seconds: u64) {
        let _ = self
            .now
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |t| {
                Some(t.saturating_add(seconds))
            });
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }
}
