//! Speech playback layer for Vocalis
//!
//! Provides the synthesis provider seam, the audio sink seam, and the
//! serializing playback queue with per-item provider fallback.

use std::sync::atomic::{AtomicU64, Ordering};

pub mod error;
pub mod mock;
pub mod process;
pub mod queue;
pub mod sink;
pub mod synthesizer;
pub mod types;

pub use error::{PlaybackError, PlaybackResult, SynthesisError};
pub use process::ProcessSynthesizer;
pub use queue::SpeechPlaybackQueue;
pub use sink::{AudioSink, DiscardSink};
pub use synthesizer::SpeechSynthesizer;
pub use types::{sanitize_for_speech, PlaybackEvent, SynthesisOptions, SynthesizedAudio};

/// Generates unique playback item IDs
static ITEM_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Generate a unique playback item ID
pub fn next_item_id() -> u64 {
    ITEM_ID_COUNTER.fetch_add(1, Ordering::SeqCst)
}
