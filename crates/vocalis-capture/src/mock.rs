//! Scripted recognizer for tests and offline demo runs.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::recognizer::SpeechRecognizer;
use crate::types::{CaptureConfig, RecognizerEvent};
use vocalis_foundation::VoiceError;

/// One step of a mock recognition run.
#[derive(Debug, Clone)]
pub struct ScriptedEvent {
    pub after: Duration,
    pub event: RecognizerEvent,
}

impl ScriptedEvent {
    pub fn immediate(event: RecognizerEvent) -> Self {
        Self {
            after: Duration::ZERO,
            event,
        }
    }

    pub fn after_ms(ms: u64, event: RecognizerEvent) -> Self {
        Self {
            after: Duration::from_millis(ms),
            event,
        }
    }
}

/// Plays back pre-scripted event runs. Each `start()` consumes the next run
/// from the script queue and emits its events on schedule.
///
/// `stop()` deliberately does not interrupt the running script: the in-flight
/// events model the buffered results a real asynchronous recognizer keeps
/// delivering after a stop request.
pub struct MockRecognizer {
    runs: Mutex<VecDeque<Vec<ScriptedEvent>>>,
    available: bool,
    starts: AtomicU64,
    stops: AtomicU64,
}

impl MockRecognizer {
    pub fn with_script(runs: Vec<Vec<ScriptedEvent>>) -> Self {
        Self {
            runs: Mutex::new(runs.into()),
            available: true,
            starts: AtomicU64::new(0),
            stops: AtomicU64::new(0),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            runs: Mutex::new(VecDeque::new()),
            available: false,
            starts: AtomicU64::new(0),
            stops: AtomicU64::new(0),
        }
    }

    pub fn start_count(&self) -> u64 {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stop_count(&self) -> u64 {
        self.stops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechRecognizer for MockRecognizer {
    fn name(&self) -> &str {
        "mock"
    }

    async fn is_available(&self) -> bool {
        self.available
    }

    async fn start(
        &self,
        _config: CaptureConfig,
        events: mpsc::Sender<RecognizerEvent>,
    ) -> Result<(), VoiceError> {
        if !self.available {
            return Err(VoiceError::RecognitionUnavailable);
        }
        self.starts.fetch_add(1, Ordering::SeqCst);
        let run = self.runs.lock().pop_front().unwrap_or_default();
        tokio::spawn(async move {
            for step in run {
                if !step.after.is_zero() {
                    tokio::time::sleep(step.after).await;
                }
                if events.send(step.event).await.is_err() {
                    return;
                }
            }
        });
        Ok(())
    }

    async fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}
