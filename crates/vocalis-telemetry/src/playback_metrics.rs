use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Shared metrics for the speech playback queue.
#[derive(Clone, Default)]
pub struct PlaybackMetrics {
    pub items_enqueued: Arc<AtomicU64>,
    pub items_played: Arc<AtomicU64>,
    pub items_failed: Arc<AtomicU64>,
    pub items_cancelled: Arc<AtomicU64>,

    /// Items serviced by the fallback provider after the primary failed.
    pub fallback_count: Arc<AtomicU64>,

    pub queue_depth: Arc<AtomicUsize>,
}

impl PlaybackMetrics {
    pub fn record_enqueued(&self, depth: usize) {
        self.items_enqueued.fetch_add(1, Ordering::Relaxed);
        self.queue_depth.store(depth, Ordering::Relaxed);
    }

    pub fn record_played(&self) {
        self.items_played.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.items_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cancelled(&self, count: u64) {
        self.items_cancelled.fetch_add(count, Ordering::Relaxed);
        self.queue_depth.store(0, Ordering::Relaxed);
    }
}
