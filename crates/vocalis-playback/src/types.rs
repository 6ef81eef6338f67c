//! Core types for speech playback

use std::sync::OnceLock;

use regex::Regex;

/// Options for individual synthesis requests. Every field is an optional
/// override layered over the queue's defaults; nothing here outlives one
/// request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SynthesisOptions {
    /// Override language for this request (e.g. "de-DE").
    pub language: Option<String>,
    /// Override voice identifier.
    pub voice: Option<String>,
    /// Speech rate multiplier (1.0 is normal).
    pub rate: Option<f32>,
    /// Voice pitch (0.0-2.0, 1.0 is normal).
    pub pitch: Option<f32>,
    /// Volume override for this request (0.0-1.0).
    pub volume: Option<f32>,
}

/// Synthesized audio returned by a provider.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesizedAudio {
    pub data: Vec<u8>,
    /// Media type of `data` (e.g. "audio/mp3", "audio/wav").
    pub media_type: String,
    pub sample_rate: Option<u32>,
}

/// Per-item lifecycle events emitted by the playback queue.
///
/// These are the sole mechanism for driving external presentation state;
/// the queue itself holds none.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    Started { item_id: u64, provider: String },
    Finished { item_id: u64 },
    Failed { item_id: u64, error: String },
}

fn markup_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>").unwrap())
}

fn whitespace_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").unwrap())
}

/// Prepare raw (possibly marked-up) text for synthesis: strip tags, drop
/// stray angle brackets, collapse whitespace.
pub fn sanitize_for_speech(text: &str) -> String {
    let stripped = markup_regex().replace_all(text, " ");
    let collapsed = whitespace_regex().replace_all(&stripped, " ");
    collapsed.replace(['<', '>'], "").trim().to_string()
}
