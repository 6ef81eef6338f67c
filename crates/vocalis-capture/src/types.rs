//! Core types for speech capture

use vocalis_foundation::VoiceError;

/// Events emitted by a speech recognizer during a capture run.
#[derive(Debug, Clone, PartialEq)]
pub enum RecognizerEvent {
    /// Provisional transcript fragment, subject to revision.
    Interim { text: String },
    /// Finalized utterance segment; the recognizer will not revise it.
    Final { text: String, confidence: f32 },
    /// Recognition error.
    Error(RecognizerErrorKind),
    /// The recognition stream ended. May arrive after `stop()` returns, and
    /// may fire spontaneously on a provider silence timeout.
    Ended,
}

/// Error codes a recognition provider can report.
#[derive(Debug, Clone, PartialEq)]
pub enum RecognizerErrorKind {
    NoPermission,
    NoSpeech,
    Network,
    NoDevice,
    Other(String),
}

impl RecognizerErrorKind {
    pub fn to_voice_error(&self) -> VoiceError {
        match self {
            RecognizerErrorKind::NoPermission => VoiceError::PermissionDenied,
            RecognizerErrorKind::NoSpeech => VoiceError::NoSpeechDetected,
            RecognizerErrorKind::Network => {
                VoiceError::Network("Speech recognition network error".to_string())
            }
            RecognizerErrorKind::NoDevice => VoiceError::NoAudioDevice,
            RecognizerErrorKind::Other(msg) => VoiceError::Network(msg.clone()),
        }
    }
}

/// Capture configuration for one recognition run.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Recognition language code (e.g. "de-DE"). Required; there is no
    /// implicit default language.
    pub language: Option<String>,
    /// Keep recognizing across utterance boundaries.
    pub continuous: bool,
    /// Emit interim (non-final) results.
    pub interim_results: bool,
    /// Maximum alternatives requested from the provider.
    pub max_alternatives: u32,
    /// Minimum confidence for a final result to be accepted.
    pub confidence_threshold: f32,
    /// Restart the recognizer after a provider-enforced silence timeout.
    pub auto_restart_on_silence: bool,
    /// Delay before an auto-restart, in milliseconds.
    pub restart_delay_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            language: None,
            continuous: false,
            interim_results: true,
            max_alternatives: 3,
            confidence_threshold: 0.7,
            auto_restart_on_silence: false,
            restart_delay_ms: 100,
        }
    }
}
