use thiserror::Error;

/// Top-level error taxonomy shared by the capture and playback pipelines.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VoiceError {
    #[error("Microphone permission denied")]
    PermissionDenied,

    #[error("Speech recognition is not available on this host")]
    RecognitionUnavailable,

    #[error("Network error: {0}")]
    Network(String),

    #[error("No audio input device found")]
    NoAudioDevice,

    #[error("No speech detected")]
    NoSpeechDetected,

    #[error("Transcript rejected, confidence {confidence:.2} below threshold")]
    LowConfidenceRejected { text: String, confidence: f32 },

    #[error("Speech synthesis failed: {0}")]
    SynthesisFailed(String),

    #[error("Playback cancelled")]
    PlaybackCancelled,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl VoiceError {
    /// Human-readable message for the consumer's error-display hook.
    ///
    /// Every unrecoverable error reaches the user through this text; error
    /// values themselves stay internal.
    pub fn user_message(&self) -> String {
        match self {
            VoiceError::PermissionDenied => {
                "Microphone permission denied. Please allow microphone access and try again."
                    .to_string()
            }
            VoiceError::RecognitionUnavailable => {
                "Voice input is not supported on this system.".to_string()
            }
            VoiceError::Network(_) => {
                "Network error occurred. Please check your connection.".to_string()
            }
            VoiceError::NoAudioDevice => {
                "No microphone found. Please check your audio settings.".to_string()
            }
            VoiceError::NoSpeechDetected => {
                "No speech detected. Please try speaking again.".to_string()
            }
            VoiceError::LowConfidenceRejected { text, confidence } => format!(
                "I heard \"{}\" but I'm not confident ({:.0}%). Try speaking more clearly.",
                text,
                confidence * 100.0
            ),
            VoiceError::SynthesisFailed(_) => "Audio playback failed".to_string(),
            VoiceError::PlaybackCancelled => "Speech cancelled".to_string(),
            VoiceError::Config(msg) => format!("Configuration error: {}", msg),
        }
    }

    /// Whether the coordinator should terminate the current session on this
    /// error. Low-confidence rejections are advisory, everything else ends
    /// the session.
    pub fn is_session_fatal(&self) -> bool {
        !matches!(self, VoiceError::LowConfidenceRejected { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_messages_are_nonempty() {
        let errors = [
            VoiceError::PermissionDenied,
            VoiceError::RecognitionUnavailable,
            VoiceError::Network("timeout".into()),
            VoiceError::NoAudioDevice,
            VoiceError::LowConfidenceRejected {
                text: "hallo".into(),
                confidence: 0.4,
            },
            VoiceError::SynthesisFailed("bad audio".into()),
            VoiceError::PlaybackCancelled,
            VoiceError::Config("missing language".into()),
        ];
        for e in errors {
            assert!(!e.user_message().is_empty());
        }
    }

    #[test]
    fn low_confidence_is_advisory() {
        let advisory = VoiceError::LowConfidenceRejected {
            text: "wie geht".into(),
            confidence: 0.5,
        };
        assert!(!advisory.is_session_fatal());
        assert!(VoiceError::PermissionDenied.is_session_fatal());
    }
}
