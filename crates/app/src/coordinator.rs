//! Reconciles asynchronous recognizer output with user- or timer-driven
//! stop requests, producing exactly one main transcript per session.
//!
//! The fundamental race: a stop request can land while the recognizer has
//! already started producing a final result that has not yet arrived. The
//! grace windows bound that race; they cannot eliminate it.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use vocalis_capture::{
    CaptureConfig, RecognizerErrorKind, RecognizerEvent, SpeechCaptureSession, SpeechRecognizer,
};
use vocalis_foundation::{SessionState, SessionStateMachine, VoiceError};
use vocalis_telemetry::CaptureMetrics;

use crate::config::{RecordingMode, VoiceSessionConfig};
use crate::timer::{RecordingTimer, TimerEvent};
use crate::transcript::{Delivery, StopReason, TranscriptNotice, TranscriptSink};
use crate::ui::{AvatarChannel, AvatarState};

/// Segment accumulation plus the pending-result timing state used to decide
/// whether finalization must wait for late results.
#[derive(Default)]
struct Accumulator {
    segments: Vec<String>,
    pending_since: Option<tokio::time::Instant>,
    pending_unresolved: bool,
}

impl Accumulator {
    fn note_interim(&mut self) {
        self.pending_since = Some(tokio::time::Instant::now());
        self.pending_unresolved = true;
    }

    /// Returns true when the segment was non-empty and appended.
    fn note_final(&mut self, text: &str) -> bool {
        self.pending_since = None;
        self.pending_unresolved = false;
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return false;
        }
        self.segments.push(trimmed.to_string());
        true
    }

    fn pending_recent(&self, window: Duration) -> bool {
        self.pending_since
            .map(|t| t.elapsed() < window)
            .unwrap_or(false)
    }

    fn joined(&self) -> String {
        self.segments.join(" ")
    }

    /// Freeze the sequence: join, clear, reset pending state.
    fn take_transcript(&mut self) -> String {
        let transcript = self.joined();
        self.segments.clear();
        self.pending_since = None;
        self.pending_unresolved = false;
        transcript
    }
}

/// Orchestrates one capture session at a time: starts the capture session
/// and timer concurrently, owns the stop/timeout protocol and the grace
/// windows, and notifies the transcript sink exactly once per session (plus
/// distinct late notifications for results arriving after delivery).
pub struct TimedRecordingCoordinator {
    recognizer: Arc<dyn SpeechRecognizer>,
    config: VoiceSessionConfig,
    sink: Arc<dyn TranscriptSink>,
    avatar: Arc<AvatarChannel>,
    timer: Arc<RecordingTimer>,
    timer_events: tokio::sync::Mutex<mpsc::Receiver<TimerEvent>>,
    state: Arc<SessionStateMachine>,
    metrics: CaptureMetrics,
    preview_tx: Arc<watch::Sender<String>>,
}

impl TimedRecordingCoordinator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        recognizer: Arc<dyn SpeechRecognizer>,
        config: VoiceSessionConfig,
        sink: Arc<dyn TranscriptSink>,
        avatar: Arc<AvatarChannel>,
        timer: Arc<RecordingTimer>,
        timer_events: mpsc::Receiver<TimerEvent>,
        metrics: CaptureMetrics,
    ) -> (Self, watch::Receiver<String>) {
        let (preview_tx, preview_rx) = watch::channel(String::new());
        (
            Self {
                recognizer,
                config,
                sink,
                avatar,
                timer,
                timer_events: tokio::sync::Mutex::new(timer_events),
                state: Arc::new(SessionStateMachine::new()),
                metrics,
                preview_tx: Arc::new(preview_tx),
            },
            preview_rx,
        )
    }

    pub fn session_state(&self) -> SessionState {
        self.state.current()
    }

    /// The session configuration this coordinator runs with (the renderer
    /// reads the timer style and stop-button label from here).
    pub fn config(&self) -> &VoiceSessionConfig {
        &self.config
    }

    pub fn state_machine(&self) -> &SessionStateMachine {
        &self.state
    }

    /// Run one recording session to completion according to the configured
    /// recording mode. Only one session runs at a time.
    pub async fn run_session(&self) -> Result<(), VoiceError> {
        match self.config.recording_mode {
            RecordingMode::Timed => self.run_timed().await,
            RecordingMode::Single => self.run_single().await,
        }
    }

    async fn start_capture(
        &self,
        capture_config: CaptureConfig,
    ) -> Result<(SpeechCaptureSession, mpsc::Receiver<RecognizerEvent>), VoiceError> {
        match SpeechCaptureSession::start(
            self.recognizer.clone(),
            capture_config,
            self.metrics.clone(),
        )
        .await
        {
            Ok(pair) => Ok(pair),
            Err(e) => {
                // No partial session: surface the failure and stay idle.
                self.sink.notify(TranscriptNotice::Error(e.clone()));
                Err(e)
            }
        }
    }

    async fn run_timed(&self) -> Result<(), VoiceError> {
        let mut timer_events = self.timer_events.lock().await;
        // Discard stop/timeout events left over from a previous session.
        while timer_events.try_recv().is_ok() {}

        let (session, mut capture_rx) = self.start_capture(self.config.capture_config()).await?;

        let avatar = match self.avatar.acquire("capture") {
            Ok(writer) => {
                writer.set(AvatarState::Listening);
                Some(writer)
            }
            Err(e) => {
                warn!(target: "coordinator", "Avatar channel unavailable: {}", e);
                None
            }
        };

        self.state.transition(SessionState::Recording)?;
        self.timer.set_stop_enabled(false);
        self.timer.start(self.config.max_duration());
        let _ = self.preview_tx.send(String::new());

        let windows = self.config.grace;
        let mut acc = Accumulator::default();
        let mut capture_open = true;

        // Recording: accumulate until a stop request or the timeout.
        let trigger = loop {
            tokio::select! {
                maybe_ev = capture_rx.recv(), if capture_open => {
                    match maybe_ev {
                        Some(event) => {
                            if let Some(err) = self.note_recording_event(event, &mut acc) {
                                self.timer.stop();
                                self.sink.notify(TranscriptNotice::Error(err.clone()));
                                session.shutdown().await;
                                drop(avatar);
                                self.state.transition(SessionState::Idle)?;
                                return Err(err);
                            }
                        }
                        None => capture_open = false,
                    }
                }
                Some(timer_event) = timer_events.recv() => match timer_event {
                    TimerEvent::Timeout => break StopReason::Timeout,
                    TimerEvent::StopRequested => break StopReason::ManualStop,
                },
            }
        };

        // Stopping: keep accumulating while in-flight segments land.
        info!(
            target: "coordinator",
            "Stop requested ({:?}), {} segments so far",
            trigger,
            acc.segments.len()
        );
        self.state.transition(SessionState::Stopping)?;
        self.timer.stop();
        self.absorb_for(windows.stop_grace(), &mut capture_rx, &mut capture_open, &mut acc)
            .await;

        // Finalizing: stop capture; wait once more only if results were
        // pending when the sequence would otherwise freeze.
        self.state.transition(SessionState::Finalizing)?;
        session.stop().await;
        if acc.pending_unresolved || acc.pending_recent(windows.pending_window()) {
            debug!(target: "coordinator", "Pending results detected, delaying finalization");
            self.absorb_for(windows.late_grace(), &mut capture_rx, &mut capture_open, &mut acc)
                .await;
        }

        let transcript = acc.take_transcript();
        if transcript.is_empty() {
            warn!(target: "coordinator", "No transcript to deliver");
        } else {
            info!(target: "coordinator", "Delivering transcript: \"{}\"", transcript);
            self.sink.notify(TranscriptNotice::Transcript {
                text: transcript,
                delivery: Delivery::Initial,
                trigger,
            });
        }
        self.metrics.sessions_completed.fetch_add(1, Ordering::Relaxed);
        drop(avatar);
        self.state.transition(SessionState::Idle)?;

        // Results that arrive from here on are a second delivery: collected
        // into a late buffer and surfaced as distinct late notifications,
        // never merged into the transcript above and never dropped.
        if capture_open {
            self.spawn_late_drain(session, capture_rx, trigger);
        } else {
            session.shutdown().await;
        }
        Ok(())
    }

    /// Handle one recognizer event during the recording phase. Returns an
    /// error when the session must terminate.
    fn note_recording_event(
        &self,
        event: RecognizerEvent,
        acc: &mut Accumulator,
    ) -> Option<VoiceError> {
        match event {
            RecognizerEvent::Interim { .. } => {
                acc.note_interim();
                // An utterance is in flight: ending the session now would
                // truncate it. Only gate once a segment exists, so the user
                // is never locked out before saying anything.
                if !acc.segments.is_empty() {
                    self.timer.set_stop_enabled(false);
                }
                None
            }
            RecognizerEvent::Final { text, .. } => {
                if acc.note_final(&text) {
                    self.timer.set_stop_enabled(true);
                    if self.config.show_transcript_preview {
                        let _ = self.preview_tx.send(acc.joined());
                    }
                }
                None
            }
            RecognizerEvent::Error(kind) => {
                if matches!(kind, RecognizerErrorKind::NoSpeech)
                    && self.config.auto_restart_on_silence
                {
                    // Not an error path: the auto-restart bridges it.
                    debug!(target: "coordinator", "Silence timeout, restart will bridge");
                    return None;
                }
                Some(kind.to_voice_error())
            }
            RecognizerEvent::Ended => {
                // Stream ended and will not restart; the session still ends
                // through stop or timeout with what was accumulated.
                debug!(target: "coordinator", "Capture stream ended during recording");
                None
            }
        }
    }

    /// Absorb capture events for a fixed grace duration.
    async fn absorb_for(
        &self,
        grace: Duration,
        capture_rx: &mut mpsc::Receiver<RecognizerEvent>,
        capture_open: &mut bool,
        acc: &mut Accumulator,
    ) {
        let deadline = tokio::time::sleep(grace);
        tokio::pin!(deadline);
        loop {
            tokio::select! {
                _ = &mut deadline => break,
                maybe_ev = capture_rx.recv(), if *capture_open => match maybe_ev {
                    Some(RecognizerEvent::Interim { .. }) => acc.note_interim(),
                    Some(RecognizerEvent::Final { text, .. }) => {
                        if acc.note_final(&text) {
                            debug!(target: "coordinator", "In-flight segment landed during grace window");
                        }
                    }
                    Some(_) => {}
                    None => *capture_open = false,
                },
            }
        }
    }

    fn spawn_late_drain(
        &self,
        session: SpeechCaptureSession,
        mut capture_rx: mpsc::Receiver<RecognizerEvent>,
        trigger: StopReason,
    ) {
        let sink = self.sink.clone();
        let metrics = self.metrics.clone();
        tokio::spawn(async move {
            let mut late_buffer: Vec<String> = Vec::new();
            while let Some(event) = capture_rx.recv().await {
                match event {
                    RecognizerEvent::Final { text, .. } => {
                        let trimmed = text.trim();
                        if trimmed.is_empty() {
                            continue;
                        }
                        late_buffer.push(trimmed.to_string());
                        metrics.late_deliveries.fetch_add(1, Ordering::Relaxed);
                        info!(
                            target: "coordinator",
                            "Late-arriving segment, delivering separately: \"{}\"",
                            trimmed
                        );
                        sink.notify(TranscriptNotice::Transcript {
                            text: late_buffer.join(" "),
                            delivery: Delivery::Late,
                            trigger,
                        });
                    }
                    RecognizerEvent::Ended => break,
                    _ => {}
                }
            }
            session.shutdown().await;
        });
    }

    async fn run_single(&self) -> Result<(), VoiceError> {
        let (session, mut capture_rx) = self.start_capture(self.config.capture_config()).await?;

        let avatar = match self.avatar.acquire("capture") {
            Ok(writer) => {
                writer.set(AvatarState::Listening);
                Some(writer)
            }
            Err(e) => {
                warn!(target: "coordinator", "Avatar channel unavailable: {}", e);
                None
            }
        };
        self.state.transition(SessionState::Recording)?;

        let threshold = self.config.confidence_threshold();
        let mut outcome = Ok(());
        while let Some(event) = capture_rx.recv().await {
            match event {
                RecognizerEvent::Final { text, confidence } => {
                    let trimmed = text.trim().to_string();
                    if trimmed.is_empty() {
                        continue;
                    }
                    if confidence >= threshold {
                        self.sink.notify(TranscriptNotice::Transcript {
                            text: trimmed,
                            delivery: Delivery::Initial,
                            trigger: StopReason::Utterance,
                        });
                        self.metrics
                            .sessions_completed
                            .fetch_add(1, Ordering::Relaxed);
                    } else {
                        warn!(
                            target: "coordinator",
                            "Low confidence transcript rejected: {:.2}",
                            confidence
                        );
                        self.metrics
                            .low_confidence_rejections
                            .fetch_add(1, Ordering::Relaxed);
                        self.sink.notify(TranscriptNotice::LowConfidence {
                            text: trimmed,
                            confidence,
                        });
                    }
                    break;
                }
                RecognizerEvent::Error(kind) => {
                    let err = kind.to_voice_error();
                    self.sink.notify(TranscriptNotice::Error(err.clone()));
                    outcome = Err(err);
                    break;
                }
                RecognizerEvent::Ended => break,
                RecognizerEvent::Interim { .. } => {}
            }
        }

        session.shutdown().await;
        drop(avatar);
        self.state.transition(SessionState::Idle)?;
        outcome
    }

    /// The user activated the stop affordance (delegates to the timer's
    /// gate).
    pub fn request_stop(&self) {
        self.timer.request_stop();
    }
}
