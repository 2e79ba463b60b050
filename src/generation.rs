//! Caller-side generation tracking.
//!
//! The worker never compares generations. Callers issue a fresh generation
//! for every navigation or search and drop any response or progress event
//! tagged with an older one. This module is the compare-on-receive half of
//! that contract and works without a worker at all.

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic generation counter with a staleness check.
#[derive(Debug, Default)]
pub struct GenerationTracker {
    latest: AtomicU64,
}

impl GenerationTracker {
    pub fn new() -> Self {
        Self {
            latest: AtomicU64::new(0),
        }
    }

    /// 次の世代を発行する。それより古い世代はすべて古い扱いになる
    pub fn issue(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Raise the watermark to `generation` if it is newer.
    ///
    /// Returns the resulting latest generation.
    pub fn observe(&self, generation: u64) -> u64 {
        let previous = self.latest.fetch_max(generation, Ordering::SeqCst);
        previous.max(generation)
    }

    pub fn latest(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }

    /// True if `generation` is older than the latest issued or observed one.
    pub fn is_stale(&self, generation: u64) -> bool {
        generation < self.latest.load(Ordering::SeqCst)
    }

    /// Keep `item` only when its generation is current.
    pub fn accept<T>(&self, generation: u64, item: T) -> Option<T> {
        (!self.is_stale(generation)).then_some(item)
    }
}
