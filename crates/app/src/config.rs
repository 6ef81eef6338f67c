//! Typed session configuration.
//!
//! Replaces the original's ad-hoc configuration object with a struct
//! enumerating exactly the recognized options, defaults applied at
//! construction.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use vocalis_capture::CaptureConfig;
use vocalis_foundation::VoiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordingMode {
    /// One utterance, confidence-gated delivery.
    Single,
    /// Continuous capture with a countdown timer and segment accumulation.
    Timed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoSubmitMode {
    /// Submit only confident single-utterance transcripts; timed transcripts
    /// fill the text field.
    Confidence,
    /// Submit automatically on timer expiry only.
    TimerOnly,
    /// Always submit without showing the transcript.
    Always,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerStyle {
    Circular,
    Linear,
}

/// The grace windows reconciling "stop was requested" with "the recognizer
/// is still delivering". Configurable constants, not correctness
/// guarantees.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct GraceWindows {
    /// Delay after a stop request before freezing the segment sequence.
    pub stop_grace_ms: u64,
    /// Extra wait when results were pending at finalization time.
    pub late_grace_ms: u64,
    /// How recent an interim must be to count as "pending".
    pub pending_window_ms: u64,
    /// Delay before restarting the recognizer after a silence timeout.
    pub restart_delay_ms: u64,
}

impl Default for GraceWindows {
    fn default() -> Self {
        Self {
            stop_grace_ms: 200,
            late_grace_ms: 300,
            pending_window_ms: 1000,
            restart_delay_ms: 100,
        }
    }
}

impl GraceWindows {
    pub fn stop_grace(&self) -> Duration {
        Duration::from_millis(self.stop_grace_ms)
    }

    pub fn late_grace(&self) -> Duration {
        Duration::from_millis(self.late_grace_ms)
    }

    pub fn pending_window(&self) -> Duration {
        Duration::from_millis(self.pending_window_ms)
    }
}

/// Recognized voice session options.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VoiceSessionConfig {
    /// Recognition language code. Required for capture; there is no
    /// implicit default.
    pub language: Option<String>,
    pub recording_mode: RecordingMode,
    /// Maximum timed-recording duration in milliseconds.
    #[serde(alias = "max_duration")]
    pub max_duration_ms: u64,
    pub auto_restart_on_silence: bool,
    pub auto_submit_mode: AutoSubmitMode,
    /// Overrides the default confidence threshold (0.7).
    pub confidence_override: Option<f32>,
    pub show_transcript: bool,
    pub allow_editing: bool,
    pub show_transcript_preview: bool,
    pub timer_style: TimerStyle,
    pub stop_button_text: String,
    pub grace: GraceWindows,
}

impl Default for VoiceSessionConfig {
    fn default() -> Self {
        Self {
            language: None,
            recording_mode: RecordingMode::Single,
            max_duration_ms: 30_000,
            auto_restart_on_silence: true,
            auto_submit_mode: AutoSubmitMode::Confidence,
            confidence_override: None,
            show_transcript: true,
            allow_editing: true,
            show_transcript_preview: false,
            timer_style: TimerStyle::Circular,
            stop_button_text: "Stop Recording".to_string(),
            grace: GraceWindows::default(),
        }
    }
}

impl VoiceSessionConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, VoiceError> {
        toml::from_str(raw).map_err(|e| VoiceError::Config(format!("invalid config: {}", e)))
    }

    pub fn load(path: &Path) -> Result<Self, VoiceError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| VoiceError::Config(format!("failed to read config: {}", e)))?;
        Self::from_toml_str(&raw)
    }

    pub fn confidence_threshold(&self) -> f32 {
        self.confidence_override.unwrap_or(0.7)
    }

    pub fn max_duration(&self) -> Duration {
        Duration::from_millis(self.max_duration_ms)
    }

    /// Derive the capture configuration for one recognition run.
    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            language: self.language.clone(),
            continuous: self.recording_mode == RecordingMode::Timed,
            interim_results: true,
            max_alternatives: 3,
            confidence_threshold: self.confidence_threshold(),
            auto_restart_on_silence: self.recording_mode == RecordingMode::Timed
                && self.auto_restart_on_silence,
            restart_delay_ms: self.grace.restart_delay_ms,
        }
    }
}
