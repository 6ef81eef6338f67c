use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Shared metrics for the voice capture pipeline.
#[derive(Clone, Default)]
pub struct CaptureMetrics {
    // Recognizer event counters
    pub interim_count: Arc<AtomicU64>,
    pub final_count: Arc<AtomicU64>,
    pub error_count: Arc<AtomicU64>,

    // Session lifecycle
    pub sessions_started: Arc<AtomicU64>,
    pub sessions_completed: Arc<AtomicU64>,
    pub restarts: Arc<AtomicU64>, // auto-restarts after silence

    // Coordinator outcomes
    pub late_deliveries: Arc<AtomicU64>,
    pub low_confidence_rejections: Arc<AtomicU64>,

    pub last_event_time: Arc<RwLock<Option<Instant>>>,
}

impl CaptureMetrics {
    pub fn record_interim(&self) {
        self.interim_count.fetch_add(1, Ordering::Relaxed);
        *self.last_event_time.write() = Some(Instant::now());
    }

    pub fn record_final(&self) {
        self.final_count.fetch_add(1, Ordering::Relaxed);
        *self.last_event_time.write() = Some(Instant::now());
    }

    pub fn record_error(&self) {
        self.error_count.fetch_add(1, Ordering::Relaxed);
    }
}
