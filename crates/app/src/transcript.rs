//! Consumer boundary: transcript notifications and the host text field.

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::config::AutoSubmitMode;
use vocalis_foundation::VoiceError;

/// Whether a transcript is the session's single main delivery or a
/// late-arriving follow-up. Callers must tolerate receiving text in two
/// deliveries for one logical session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Initial,
    Late,
}

/// What ended the capture that produced a transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    ManualStop,
    Timeout,
    /// Single-utterance mode: the utterance simply completed.
    Utterance,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptNotice {
    Transcript {
        text: String,
        delivery: Delivery,
        trigger: StopReason,
    },
    /// Advisory: a final transcript fell below the confidence threshold.
    LowConfidence { text: String, confidence: f32 },
    Error(VoiceError),
}

/// Receives coordinator output. Implementations must not block.
pub trait TranscriptSink: Send + Sync {
    fn notify(&self, notice: TranscriptNotice);
}

/// Models the host's editable text surface: transcripts either land in the
/// field for the user to edit, or are submitted directly, depending on
/// configuration.
pub struct TextFieldSink {
    auto_submit_mode: AutoSubmitMode,
    show_transcript: bool,
    allow_editing: bool,
    field: Mutex<String>,
    submissions: Mutex<Vec<String>>,
    advisories: Mutex<Vec<String>>,
    errors: Mutex<Vec<String>>,
}

impl TextFieldSink {
    pub fn new(auto_submit_mode: AutoSubmitMode, show_transcript: bool, allow_editing: bool) -> Self {
        Self {
            auto_submit_mode,
            show_transcript,
            allow_editing,
            field: Mutex::new(String::new()),
            submissions: Mutex::new(Vec::new()),
            advisories: Mutex::new(Vec::new()),
            errors: Mutex::new(Vec::new()),
        }
    }

    fn submit(&self, text: String) {
        info!(target: "transcript", "Submitting transcript: \"{}\"", text);
        self.submissions.lock().push(text);
        self.field.lock().clear();
    }

    fn fill_field(&self, text: &str, delivery: Delivery) {
        let mut field = self.field.lock();
        match delivery {
            Delivery::Initial => *field = text.to_string(),
            // A late fragment extends whatever is already there rather than
            // replacing user-visible text.
            Delivery::Late => {
                if field.is_empty() {
                    *field = text.to_string();
                } else {
                    field.push(' ');
                    field.push_str(text);
                }
            }
        }
        debug!(target: "transcript", "Text field now: \"{}\"", field);
    }

    pub fn field_text(&self) -> String {
        self.field.lock().clone()
    }

    pub fn submissions(&self) -> Vec<String> {
        self.submissions.lock().clone()
    }

    pub fn advisories(&self) -> Vec<String> {
        self.advisories.lock().clone()
    }

    pub fn error_messages(&self) -> Vec<String> {
        self.errors.lock().clone()
    }

    pub fn is_editable(&self) -> bool {
        self.allow_editing
    }
}

impl TranscriptSink for TextFieldSink {
    fn notify(&self, notice: TranscriptNotice) {
        match notice {
            TranscriptNotice::Transcript {
                text,
                delivery,
                trigger,
            } => {
                let submit_on_timeout = trigger == StopReason::Timeout
                    && matches!(
                        self.auto_submit_mode,
                        AutoSubmitMode::TimerOnly | AutoSubmitMode::Always
                    );
                let submit_hidden =
                    !self.show_transcript && self.auto_submit_mode == AutoSubmitMode::Always;
                // Single-utterance transcripts only reach the sink once they
                // cleared the confidence gate.
                let submit_confident = trigger == StopReason::Utterance
                    && matches!(
                        self.auto_submit_mode,
                        AutoSubmitMode::Confidence | AutoSubmitMode::Always
                    );

                if submit_on_timeout || submit_hidden || submit_confident {
                    self.submit(text);
                } else if self.show_transcript {
                    self.fill_field(&text, delivery);
                } else {
                    debug!(target: "transcript", "Transcript dropped by configuration");
                }
            }
            TranscriptNotice::LowConfidence { text, confidence } => {
                let message = VoiceError::LowConfidenceRejected { text, confidence }.user_message();
                debug!(target: "transcript", "{}", message);
                self.advisories.lock().push(message);
            }
            TranscriptNotice::Error(err) => {
                self.errors.lock().push(err.user_message());
            }
        }
    }
}
