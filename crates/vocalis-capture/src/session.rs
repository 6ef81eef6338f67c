//! Capture session: thin control surface over one continuous recognition run.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::next_session_id;
use crate::recognizer::SpeechRecognizer;
use crate::types::{CaptureConfig, RecognizerEvent};
use vocalis_foundation::VoiceError;
use vocalis_telemetry::CaptureMetrics;

/// Wraps one continuous speech-recognition run.
///
/// The session forwards recognizer events to its consumer unchanged, with
/// one exception: a spontaneous `Ended` (provider silence timeout) in
/// continuous mode restarts the recognizer after a short delay instead of
/// being forwarded, unless a manual stop was requested in the interim.
pub struct SpeechCaptureSession {
    id: u64,
    recognizer: Arc<dyn SpeechRecognizer>,
    manual_stop: Arc<AtomicBool>,
    forward_handle: JoinHandle<()>,
}

impl SpeechCaptureSession {
    /// Start recognition. Fails with `RecognitionUnavailable` when the
    /// provider probe fails; permission errors arrive later as events.
    pub async fn start(
        recognizer: Arc<dyn SpeechRecognizer>,
        config: CaptureConfig,
        metrics: CaptureMetrics,
    ) -> Result<(Self, mpsc::Receiver<RecognizerEvent>), VoiceError> {
        if !recognizer.is_available().await {
            warn!(target: "capture", "Recognizer {} is not available", recognizer.name());
            return Err(VoiceError::RecognitionUnavailable);
        }

        let id = next_session_id();
        let (consumer_tx, consumer_rx) = mpsc::channel(64);
        let (inner_tx, inner_rx) = mpsc::channel(64);

        recognizer.start(config.clone(), inner_tx.clone()).await?;
        metrics.sessions_started.fetch_add(1, Ordering::Relaxed);
        info!(
            target: "capture",
            "Capture session {} started (recognizer: {})",
            id,
            recognizer.name()
        );

        let manual_stop = Arc::new(AtomicBool::new(false));
        let forward_handle = tokio::spawn(forward_loop(
            id,
            recognizer.clone(),
            config,
            inner_tx,
            inner_rx,
            consumer_tx,
            manual_stop.clone(),
            metrics,
        ));

        Ok((
            Self {
                id,
                recognizer,
                manual_stop,
                forward_handle,
            },
            consumer_rx,
        ))
    }

    /// Unique id of this capture session.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Request the run to end. Advisory: buffered results may still arrive
    /// on the event channel, followed by `Ended`.
    pub async fn stop(&self) {
        debug!(target: "capture", "Manual stop requested for session {}", self.id);
        self.manual_stop.store(true, Ordering::SeqCst);
        self.recognizer.stop().await;
    }

    pub fn manual_stop_requested(&self) -> bool {
        self.manual_stop.load(Ordering::SeqCst)
    }

    /// Tear the session down without waiting for remaining events.
    pub async fn shutdown(self) {
        self.manual_stop.store(true, Ordering::SeqCst);
        self.recognizer.stop().await;
        self.forward_handle.abort();
        let _ = self.forward_handle.await;
    }
}

#[allow(clippy::too_many_arguments)]
async fn forward_loop(
    session_id: u64,
    recognizer: Arc<dyn SpeechRecognizer>,
    config: CaptureConfig,
    inner_tx: mpsc::Sender<RecognizerEvent>,
    mut inner_rx: mpsc::Receiver<RecognizerEvent>,
    consumer_tx: mpsc::Sender<RecognizerEvent>,
    manual_stop: Arc<AtomicBool>,
    metrics: CaptureMetrics,
) {
    while let Some(event) = inner_rx.recv().await {
        match &event {
            RecognizerEvent::Interim { text } => {
                debug!(target: "capture", "Interim: {}", text);
                metrics.record_interim();
            }
            RecognizerEvent::Final { text, confidence } => {
                info!(target: "capture", "Final: {} (confidence: {:.2})", text, confidence);
                metrics.record_final();
            }
            RecognizerEvent::Error(kind) => {
                warn!(target: "capture", "Recognizer error: {:?}", kind);
                metrics.record_error();
            }
            RecognizerEvent::Ended => {
                let restart = config.continuous
                    && config.auto_restart_on_silence
                    && !manual_stop.load(Ordering::SeqCst);
                if restart {
                    debug!(
                        target: "capture",
                        "Session {} stream ended without manual stop, restarting",
                        session_id
                    );
                    tokio::time::sleep(Duration::from_millis(config.restart_delay_ms)).await;
                    // The user may have stopped during the delay.
                    if !manual_stop.load(Ordering::SeqCst) {
                        match recognizer.start(config.clone(), inner_tx.clone()).await {
                            Ok(()) => {
                                metrics.restarts.fetch_add(1, Ordering::Relaxed);
                                info!(
                                    target: "capture",
                                    "Session {} recognizer restarted after silence",
                                    session_id
                                );
                                continue;
                            }
                            Err(e) => {
                                warn!(target: "capture", "Session {} restart failed: {}", session_id, e);
                            }
                        }
                    }
                }
                let _ = consumer_tx.send(RecognizerEvent::Ended).await;
                break;
            }
        }
        if consumer_tx.send(event).await.is_err() {
            debug!(target: "capture", "Consumer dropped, ending forward loop");
            break;
        }
    }
    debug!(target: "capture", "Capture session {} forward loop finished", session_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockRecognizer, ScriptedEvent};
    use crate::types::RecognizerErrorKind;

    fn timed_config() -> CaptureConfig {
        CaptureConfig {
            language: Some("de-DE".to_string()),
            continuous: true,
            auto_restart_on_silence: true,
            ..CaptureConfig::default()
        }
    }

    #[tokio::test]
    async fn forwards_events_in_order() {
        let recognizer = Arc::new(MockRecognizer::with_script(vec![vec![
            ScriptedEvent::immediate(RecognizerEvent::Interim {
                text: "hal".into(),
            }),
            ScriptedEvent::immediate(RecognizerEvent::Final {
                text: "Hallo".into(),
                confidence: 0.9,
            }),
            ScriptedEvent::immediate(RecognizerEvent::Ended),
        ]]));
        let (session, mut rx) = SpeechCaptureSession::start(
            recognizer,
            CaptureConfig::default(),
            CaptureMetrics::default(),
        )
        .await
        .unwrap();

        assert_eq!(
            rx.recv().await.unwrap(),
            RecognizerEvent::Interim { text: "hal".into() }
        );
        assert_eq!(
            rx.recv().await.unwrap(),
            RecognizerEvent::Final {
                text: "Hallo".into(),
                confidence: 0.9
            }
        );
        assert_eq!(rx.recv().await.unwrap(), RecognizerEvent::Ended);
        session.shutdown().await;
    }

    #[tokio::test]
    async fn sessions_get_distinct_ids() {
        let recognizer = Arc::new(MockRecognizer::with_script(vec![
            vec![ScriptedEvent::immediate(RecognizerEvent::Ended)],
            vec![ScriptedEvent::immediate(RecognizerEvent::Ended)],
        ]));
        let (first, _rx1) = SpeechCaptureSession::start(
            recognizer.clone(),
            CaptureConfig::default(),
            CaptureMetrics::default(),
        )
        .await
        .unwrap();
        let (second, _rx2) = SpeechCaptureSession::start(
            recognizer,
            CaptureConfig::default(),
            CaptureMetrics::default(),
        )
        .await
        .unwrap();
        assert_ne!(first.id(), second.id());
        first.shutdown().await;
        second.shutdown().await;
    }

    #[tokio::test]
    async fn unavailable_recognizer_fails_start() {
        let recognizer = Arc::new(MockRecognizer::unavailable());
        let result = SpeechCaptureSession::start(
            recognizer,
            CaptureConfig::default(),
            CaptureMetrics::default(),
        )
        .await;
        assert!(matches!(result, Err(VoiceError::RecognitionUnavailable)));
    }

    #[tokio::test]
    async fn spontaneous_end_restarts_recognizer() {
        // First run ends on a silence timeout; second run produces the segment.
        let recognizer = Arc::new(MockRecognizer::with_script(vec![
            vec![ScriptedEvent::immediate(RecognizerEvent::Ended)],
            vec![
                ScriptedEvent::immediate(RecognizerEvent::Final {
                    text: "wie geht".into(),
                    confidence: 0.8,
                }),
                ScriptedEvent::immediate(RecognizerEvent::Ended),
            ],
        ]));
        let metrics = CaptureMetrics::default();
        let (session, mut rx) =
            SpeechCaptureSession::start(recognizer.clone(), timed_config(), metrics.clone())
                .await
                .unwrap();

        // The first Ended is swallowed by the restart; the consumer sees only
        // the second run's output.
        assert_eq!(
            rx.recv().await.unwrap(),
            RecognizerEvent::Final {
                text: "wie geht".into(),
                confidence: 0.8
            }
        );
        assert_eq!(metrics.restarts.load(Ordering::Relaxed), 1);
        assert_eq!(recognizer.start_count(), 2);
        session.shutdown().await;
    }

    #[tokio::test]
    async fn manual_stop_suppresses_restart() {
        let recognizer = Arc::new(MockRecognizer::with_script(vec![vec![
            ScriptedEvent::after_ms(
                50,
                RecognizerEvent::Final {
                    text: "Hallo".into(),
                    confidence: 0.9,
                },
            ),
            ScriptedEvent::after_ms(10, RecognizerEvent::Ended),
        ]]));
        let (session, mut rx) =
            SpeechCaptureSession::start(recognizer.clone(), timed_config(), CaptureMetrics::default())
                .await
                .unwrap();

        session.stop().await;

        // stop() is advisory: the buffered final still arrives, then Ended,
        // with no restart afterwards.
        assert_eq!(
            rx.recv().await.unwrap(),
            RecognizerEvent::Final {
                text: "Hallo".into(),
                confidence: 0.9
            }
        );
        assert_eq!(rx.recv().await.unwrap(), RecognizerEvent::Ended);
        assert_eq!(recognizer.start_count(), 1);
        session.shutdown().await;
    }

    #[tokio::test]
    async fn permission_error_arrives_as_event() {
        let recognizer = Arc::new(MockRecognizer::with_script(vec![vec![
            ScriptedEvent::immediate(RecognizerEvent::Error(RecognizerErrorKind::NoPermission)),
            ScriptedEvent::immediate(RecognizerEvent::Ended),
        ]]));
        let (session, mut rx) = SpeechCaptureSession::start(
            recognizer,
            CaptureConfig::default(),
            CaptureMetrics::default(),
        )
        .await
        .unwrap();

        assert_eq!(
            rx.recv().await.unwrap(),
            RecognizerEvent::Error(RecognizerErrorKind::NoPermission)
        );
        session.shutdown().await;
    }
}
