//! Shared metrics for the capture and playback pipelines.

pub mod capture_metrics;
pub mod playback_metrics;

pub use capture_metrics::CaptureMetrics;
pub use playback_metrics::PlaybackMetrics;
