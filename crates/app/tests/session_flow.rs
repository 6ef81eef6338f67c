//! End-to-end recording session tests: coordinator + timer + scripted
//! recognizer, driven on a paused clock.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use vocalis_app::config::{AutoSubmitMode, RecordingMode, VoiceSessionConfig};
use vocalis_app::coordinator::TimedRecordingCoordinator;
use vocalis_app::timer::RecordingTimer;
use vocalis_app::transcript::{
    Delivery, StopReason, TextFieldSink, TranscriptNotice, TranscriptSink,
};
use vocalis_app::ui::{AvatarChannel, AvatarState};
use vocalis_capture::mock::{MockRecognizer, ScriptedEvent};
use vocalis_capture::{RecognizerErrorKind, RecognizerEvent};
use vocalis_foundation::{SessionState, VoiceError};
use vocalis_telemetry::CaptureMetrics;

#[derive(Default)]
struct RecordingSink {
    notices: Mutex<Vec<TranscriptNotice>>,
}

impl RecordingSink {
    fn notices(&self) -> Vec<TranscriptNotice> {
        self.notices.lock().clone()
    }
}

impl TranscriptSink for RecordingSink {
    fn notify(&self, notice: TranscriptNotice) {
        self.notices.lock().push(notice);
    }
}

struct Harness {
    coordinator: Arc<TimedRecordingCoordinator>,
    recognizer: Arc<MockRecognizer>,
    timer: Arc<RecordingTimer>,
    avatar_rx: tokio::sync::watch::Receiver<AvatarState>,
    metrics: CaptureMetrics,
}

fn timed_config() -> VoiceSessionConfig {
    VoiceSessionConfig {
        language: Some("de-DE".to_string()),
        recording_mode: RecordingMode::Timed,
        ..VoiceSessionConfig::default()
    }
}

fn build(
    script: Vec<Vec<ScriptedEvent>>,
    config: VoiceSessionConfig,
    sink: Arc<dyn TranscriptSink>,
) -> Harness {
    let recognizer = Arc::new(MockRecognizer::with_script(script));
    let (avatar, avatar_rx) = AvatarChannel::new();
    let (timer_tx, timer_rx) = mpsc::channel(8);
    let (timer, _snapshots) = RecordingTimer::new(timer_tx);
    let timer = Arc::new(timer);
    let metrics = CaptureMetrics::default();
    let (coordinator, _preview) = TimedRecordingCoordinator::new(
        recognizer.clone(),
        config,
        sink,
        avatar,
        timer.clone(),
        timer_rx,
        metrics.clone(),
    );
    Harness {
        coordinator: Arc::new(coordinator),
        recognizer,
        timer,
        avatar_rx,
        metrics,
    }
}

fn final_seg(text: &str, confidence: f32) -> RecognizerEvent {
    RecognizerEvent::Final {
        text: text.to_string(),
        confidence,
    }
}

fn interim(text: &str) -> RecognizerEvent {
    RecognizerEvent::Interim {
        text: text.to_string(),
    }
}

#[tokio::test(start_paused = true)]
async fn transcript_joins_segments_in_arrival_order() {
    let sink = Arc::new(RecordingSink::default());
    let h = build(
        vec![vec![
            ScriptedEvent::after_ms(50, final_seg("Hallo", 0.9)),
            ScriptedEvent::after_ms(70, final_seg("wie geht", 0.9)),
            ScriptedEvent::after_ms(380, RecognizerEvent::Ended),
        ]],
        timed_config(),
        sink.clone(),
    );

    let c = h.coordinator.clone();
    let run = tokio::spawn(async move { c.run_session().await });

    tokio::time::sleep(Duration::from_millis(200)).await;
    h.coordinator.request_stop();
    run.await.unwrap().unwrap();

    assert_eq!(
        sink.notices(),
        vec![TranscriptNotice::Transcript {
            text: "Hallo wie geht".to_string(),
            delivery: Delivery::Initial,
            trigger: StopReason::ManualStop,
        }]
    );
    assert_eq!(h.coordinator.session_state(), SessionState::Idle);
}

#[tokio::test(start_paused = true)]
async fn final_within_stop_grace_is_included_exactly_once() {
    let sink = Arc::new(RecordingSink::default());
    let h = build(
        vec![vec![
            ScriptedEvent::after_ms(50, final_seg("Hallo", 0.9)),
            // Lands 150 ms after the stop request, inside the 200 ms grace.
            ScriptedEvent::after_ms(200, final_seg("wie geht", 0.9)),
            ScriptedEvent::after_ms(50, RecognizerEvent::Ended),
        ]],
        timed_config(),
        sink.clone(),
    );

    let c = h.coordinator.clone();
    let run = tokio::spawn(async move { c.run_session().await });

    tokio::time::sleep(Duration::from_millis(100)).await;
    h.coordinator.request_stop();
    run.await.unwrap().unwrap();

    assert_eq!(
        sink.notices(),
        vec![TranscriptNotice::Transcript {
            text: "Hallo wie geht".to_string(),
            delivery: Delivery::Initial,
            trigger: StopReason::ManualStop,
        }]
    );
}

#[tokio::test(start_paused = true)]
async fn pending_interim_extends_the_wait_for_the_final() {
    let sink = Arc::new(RecordingSink::default());
    let h = build(
        vec![vec![
            ScriptedEvent::after_ms(50, final_seg("Hallo", 0.9)),
            // Interim during the stop grace flags pending results...
            ScriptedEvent::after_ms(100, interim("wie")),
            // ...so the final landing after the stop grace (at 500 ms, inside
            // the 300 ms late grace) is still absorbed.
            ScriptedEvent::after_ms(350, final_seg("wie geht", 0.9)),
            ScriptedEvent::after_ms(50, RecognizerEvent::Ended),
        ]],
        timed_config(),
        sink.clone(),
    );

    let c = h.coordinator.clone();
    let run = tokio::spawn(async move { c.run_session().await });

    tokio::time::sleep(Duration::from_millis(100)).await;
    h.coordinator.request_stop();
    run.await.unwrap().unwrap();

    assert_eq!(
        sink.notices(),
        vec![TranscriptNotice::Transcript {
            text: "Hallo wie geht".to_string(),
            delivery: Delivery::Initial,
            trigger: StopReason::ManualStop,
        }]
    );
}

#[tokio::test(start_paused = true)]
async fn post_delivery_final_arrives_as_one_late_notification() {
    let sink = Arc::new(RecordingSink::default());
    let h = build(
        vec![vec![
            ScriptedEvent::after_ms(50, final_seg("Hallo", 0.9)),
            ScriptedEvent::after_ms(950, final_seg("spät dran", 0.9)),
            ScriptedEvent::after_ms(50, RecognizerEvent::Ended),
        ]],
        timed_config(),
        sink.clone(),
    );

    let c = h.coordinator.clone();
    let run = tokio::spawn(async move { c.run_session().await });

    tokio::time::sleep(Duration::from_millis(100)).await;
    h.coordinator.request_stop();
    run.await.unwrap().unwrap();

    // Main delivery happened without the late segment...
    assert_eq!(
        sink.notices(),
        vec![TranscriptNotice::Transcript {
            text: "Hallo".to_string(),
            delivery: Delivery::Initial,
            trigger: StopReason::ManualStop,
        }]
    );

    // ...and the late segment arrives as exactly one distinct notification.
    tokio::time::sleep(Duration::from_millis(1500)).await;
    let notices = sink.notices();
    assert_eq!(notices.len(), 2);
    assert_eq!(
        notices[1],
        TranscriptNotice::Transcript {
            text: "spät dran".to_string(),
            delivery: Delivery::Late,
            trigger: StopReason::ManualStop,
        }
    );
    assert_eq!(
        h.metrics
            .late_deliveries
            .load(std::sync::atomic::Ordering::Relaxed),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn stop_affordance_tracks_interim_and_final_results() {
    let sink = Arc::new(RecordingSink::default());
    let h = build(
        vec![vec![
            ScriptedEvent::after_ms(50, final_seg("eins", 0.9)),
            ScriptedEvent::after_ms(100, interim("zw")),
            ScriptedEvent::after_ms(100, final_seg("zwei", 0.9)),
            ScriptedEvent::after_ms(400, RecognizerEvent::Ended),
        ]],
        timed_config(),
        sink.clone(),
    );

    let c = h.coordinator.clone();
    let run = tokio::spawn(async move { c.run_session().await });

    // Before the first segment the affordance is disabled.
    tokio::time::sleep(Duration::from_millis(25)).await;
    assert!(!h.timer.stop_enabled());

    // Enabled once a segment is safe to end on.
    tokio::time::sleep(Duration::from_millis(75)).await;
    assert!(h.timer.stop_enabled());

    // Disabled again while the next utterance is in flight.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!h.timer.stop_enabled());

    // Re-enabled by the next final.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(h.timer.stop_enabled());

    h.coordinator.request_stop();
    run.await.unwrap().unwrap();
    assert_eq!(
        sink.notices(),
        vec![TranscriptNotice::Transcript {
            text: "eins zwei".to_string(),
            delivery: Delivery::Initial,
            trigger: StopReason::ManualStop,
        }]
    );
}

#[tokio::test(start_paused = true)]
async fn timeout_delivers_and_submits_in_timer_only_mode() {
    let sink = Arc::new(TextFieldSink::new(AutoSubmitMode::TimerOnly, true, true));
    let config = VoiceSessionConfig {
        max_duration_ms: 400,
        auto_submit_mode: AutoSubmitMode::TimerOnly,
        ..timed_config()
    };
    let h = build(
        vec![vec![
            ScriptedEvent::after_ms(50, final_seg("auto senden", 0.9)),
            ScriptedEvent::after_ms(550, RecognizerEvent::Ended),
        ]],
        config,
        sink.clone(),
    );

    h.coordinator.run_session().await.unwrap();

    assert_eq!(sink.submissions(), vec!["auto senden"]);
    assert!(sink.field_text().is_empty());
}

#[tokio::test(start_paused = true)]
async fn unavailable_recognizer_surfaces_error_and_stays_idle() {
    let sink = Arc::new(RecordingSink::default());
    let recognizer = Arc::new(MockRecognizer::unavailable());
    let (avatar, _avatar_rx) = AvatarChannel::new();
    let (timer_tx, timer_rx) = mpsc::channel(8);
    let (timer, _snapshots) = RecordingTimer::new(timer_tx);
    let (coordinator, _preview) = TimedRecordingCoordinator::new(
        recognizer,
        timed_config(),
        sink.clone(),
        avatar,
        Arc::new(timer),
        timer_rx,
        CaptureMetrics::default(),
    );

    let result = coordinator.run_session().await;
    assert_eq!(result, Err(VoiceError::RecognitionUnavailable));
    assert_eq!(
        sink.notices(),
        vec![TranscriptNotice::Error(VoiceError::RecognitionUnavailable)]
    );
    assert_eq!(coordinator.session_state(), SessionState::Idle);
}

#[tokio::test(start_paused = true)]
async fn permission_denied_terminates_the_session() {
    let sink = Arc::new(RecordingSink::default());
    let h = build(
        vec![vec![
            ScriptedEvent::after_ms(
                50,
                RecognizerEvent::Error(RecognizerErrorKind::NoPermission),
            ),
            ScriptedEvent::after_ms(10, RecognizerEvent::Ended),
        ]],
        timed_config(),
        sink.clone(),
    );

    let result = h.coordinator.run_session().await;
    assert_eq!(result, Err(VoiceError::PermissionDenied));
    assert_eq!(
        sink.notices(),
        vec![TranscriptNotice::Error(VoiceError::PermissionDenied)]
    );
    assert_eq!(h.coordinator.session_state(), SessionState::Idle);
}

#[tokio::test(start_paused = true)]
async fn single_mode_submits_confident_utterance() {
    let sink = Arc::new(TextFieldSink::new(AutoSubmitMode::Confidence, true, true));
    let config = VoiceSessionConfig {
        language: Some("de-DE".to_string()),
        ..VoiceSessionConfig::default()
    };
    let h = build(
        vec![vec![
            ScriptedEvent::after_ms(30, interim("ha")),
            ScriptedEvent::after_ms(30, final_seg("Hallo", 0.92)),
            ScriptedEvent::after_ms(20, RecognizerEvent::Ended),
        ]],
        config,
        sink.clone(),
    );

    h.coordinator.run_session().await.unwrap();
    assert_eq!(sink.submissions(), vec!["Hallo"]);
}

#[tokio::test(start_paused = true)]
async fn single_mode_reports_low_confidence_as_advisory() {
    let sink = Arc::new(RecordingSink::default());
    let config = VoiceSessionConfig {
        language: Some("de-DE".to_string()),
        ..VoiceSessionConfig::default()
    };
    let h = build(
        vec![vec![
            ScriptedEvent::after_ms(30, final_seg("nuschel", 0.3)),
            ScriptedEvent::after_ms(20, RecognizerEvent::Ended),
        ]],
        config,
        sink.clone(),
    );

    h.coordinator.run_session().await.unwrap();
    assert_eq!(
        sink.notices(),
        vec![TranscriptNotice::LowConfidence {
            text: "nuschel".to_string(),
            confidence: 0.3,
        }]
    );
    assert_eq!(
        h.metrics
            .low_confidence_rejections
            .load(std::sync::atomic::Ordering::Relaxed),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn avatar_listens_during_capture_and_idles_after() {
    let sink = Arc::new(RecordingSink::default());
    let h = build(
        vec![vec![
            ScriptedEvent::after_ms(50, final_seg("Hallo", 0.9)),
            ScriptedEvent::after_ms(500, RecognizerEvent::Ended),
        ]],
        timed_config(),
        sink.clone(),
    );

    assert_eq!(*h.avatar_rx.borrow(), AvatarState::Idle);
    let c = h.coordinator.clone();
    let run = tokio::spawn(async move { c.run_session().await });

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(*h.avatar_rx.borrow(), AvatarState::Listening);

    h.coordinator.request_stop();
    run.await.unwrap().unwrap();
    assert_eq!(*h.avatar_rx.borrow(), AvatarState::Idle);
}

#[tokio::test(start_paused = true)]
async fn silence_restart_bridges_two_recognizer_runs() {
    let sink = Arc::new(RecordingSink::default());
    let h = build(
        vec![
            vec![
                ScriptedEvent::after_ms(50, final_seg("eins", 0.9)),
                ScriptedEvent::after_ms(50, RecognizerEvent::Ended),
            ],
            vec![
                ScriptedEvent::after_ms(100, final_seg("zwei", 0.9)),
                ScriptedEvent::after_ms(400, RecognizerEvent::Ended),
            ],
        ],
        timed_config(),
        sink.clone(),
    );

    let c = h.coordinator.clone();
    let run = tokio::spawn(async move { c.run_session().await });

    // Run 1 ends at 100 ms, restart fires at 200 ms, run 2's segment lands
    // at 300 ms.
    tokio::time::sleep(Duration::from_millis(350)).await;
    h.coordinator.request_stop();
    run.await.unwrap().unwrap();

    assert_eq!(h.recognizer.start_count(), 2);
    assert_eq!(
        sink.notices(),
        vec![TranscriptNotice::Transcript {
            text: "eins zwei".to_string(),
            delivery: Delivery::Initial,
            trigger: StopReason::ManualStop,
        }]
    );
}
