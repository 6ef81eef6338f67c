//! Speech capture abstraction layer for Vocalis
//!
//! This crate provides the recognizer seam, capture event types, and the
//! session wrapper that manages one continuous recognition run.

use std::sync::atomic::{AtomicU64, Ordering};

pub mod mock;
pub mod recognizer;
pub mod session;
pub mod types;

pub use recognizer::SpeechRecognizer;
pub use session::SpeechCaptureSession;
pub use types::{CaptureConfig, RecognizerErrorKind, RecognizerEvent};

/// Generates unique capture session IDs
static SESSION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Generate a unique capture session ID
pub fn next_session_id() -> u64 {
    SESSION_ID_COUNTER.fetch_add(1, Ordering::SeqCst)
}
