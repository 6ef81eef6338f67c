//! Error types for speech playback

use thiserror::Error;

/// Errors from an individual synthesis provider.
#[derive(Error, Debug)]
pub enum SynthesisError {
    /// Provider is not installed / not reachable on this host.
    #[error("Synthesis provider not available: {0}")]
    Unavailable(String),

    /// Network-level failure talking to a remote provider.
    #[error("Synthesis network error: {0}")]
    Network(String),

    /// The provider answered, but not with usable audio.
    #[error("Invalid synthesis response: {0}")]
    InvalidResponse(String),

    /// A local synthesis process exited abnormally.
    #[error("Synthesis process failed: {0}")]
    ProcessFailed(String),

    /// Synthesis succeeded but produced no audio bytes.
    #[error("No audio data generated")]
    EmptyAudio,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors surfaced to callers awaiting a queued playback item.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlaybackError {
    /// The queue was stopped while this item was queued or playing.
    #[error("Playback cancelled")]
    Cancelled,

    /// Both the primary and fallback provider failed for this item.
    #[error("Synthesis failed: {0}")]
    Synthesis(String),

    /// The audio sink rejected the synthesized audio.
    #[error("Audio output error: {0}")]
    Audio(String),
}

/// Result type for playback operations.
pub type PlaybackResult<T> = Result<T, PlaybackError>;
