//! Explicit construction and ownership of the voice pipelines.
//!
//! One capture pipeline and one playback queue per runtime, built and owned
//! here and handed out as handles; nothing is looked up ambiently.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use vocalis_capture::SpeechRecognizer;
use vocalis_foundation::{UserPrefs, VoiceError};
use vocalis_playback::{
    AudioSink, PlaybackEvent, PlaybackResult, SpeechPlaybackQueue, SpeechSynthesizer,
    SynthesisOptions,
};
use vocalis_telemetry::{CaptureMetrics, PlaybackMetrics};

use crate::config::VoiceSessionConfig;
use crate::coordinator::TimedRecordingCoordinator;
use crate::timer::{RecordingTimer, TimerSnapshot};
use crate::transcript::TextFieldSink;
use crate::ui::{AvatarChannel, AvatarState};

/// Options for building a [`VoiceRuntime`].
pub struct VoiceRuntimeOptions {
    pub session: VoiceSessionConfig,
    /// Where the volume/language preferences live; `None` disables
    /// persistence.
    pub prefs_path: Option<PathBuf>,
}

/// Handle to the assembled voice pipelines.
pub struct VoiceRuntime {
    coordinator: Arc<TimedRecordingCoordinator>,
    playback: Arc<SpeechPlaybackQueue>,
    sink: Arc<TextFieldSink>,
    timer: Arc<RecordingTimer>,
    timer_snapshots: watch::Receiver<TimerSnapshot>,
    preview_rx: watch::Receiver<String>,
    avatar_rx: watch::Receiver<AvatarState>,
    avatar_driver: JoinHandle<()>,
    capture_metrics: CaptureMetrics,
    playback_metrics: PlaybackMetrics,
    prefs_path: Option<PathBuf>,
    prefs_language: Option<String>,
}

impl VoiceRuntime {
    pub fn build(
        recognizer: Arc<dyn SpeechRecognizer>,
        primary_synth: Arc<dyn SpeechSynthesizer>,
        fallback_synth: Option<Arc<dyn SpeechSynthesizer>>,
        audio_sink: Arc<dyn AudioSink>,
        options: VoiceRuntimeOptions,
    ) -> Result<Self, VoiceError> {
        let mut options = options;
        let prefs = match &options.prefs_path {
            Some(path) => UserPrefs::load(path)?,
            None => UserPrefs::default(),
        };
        // A persisted language preference wins over an unset session one.
        if options.session.language.is_none() {
            options.session.language = prefs.language.clone();
        }

        let capture_metrics = CaptureMetrics::default();
        let playback_metrics = PlaybackMetrics::default();
        let (avatar, avatar_rx) = AvatarChannel::new();

        let sink = Arc::new(TextFieldSink::new(
            options.session.auto_submit_mode,
            options.session.show_transcript,
            options.session.allow_editing,
        ));

        let (timer_events_tx, timer_events_rx) = mpsc::channel(8);
        let (timer, timer_snapshots) = RecordingTimer::new(timer_events_tx);
        let timer = Arc::new(timer);

        let (coordinator, preview_rx) = TimedRecordingCoordinator::new(
            recognizer,
            options.session,
            sink.clone(),
            avatar.clone(),
            timer.clone(),
            timer_events_rx,
            capture_metrics.clone(),
        );

        let (playback, playback_events) = SpeechPlaybackQueue::new(
            primary_synth,
            fallback_synth,
            audio_sink,
            playback_metrics.clone(),
            prefs.volume,
        );

        let avatar_driver = tokio::spawn(drive_avatar_from_playback(avatar, playback_events));

        info!(target: "runtime", "Voice runtime assembled (volume {:.0}%)", prefs.volume * 100.0);

        Ok(Self {
            coordinator: Arc::new(coordinator),
            playback: Arc::new(playback),
            sink,
            timer,
            timer_snapshots,
            preview_rx,
            avatar_rx,
            avatar_driver,
            capture_metrics,
            playback_metrics,
            prefs_path: options.prefs_path,
            prefs_language: prefs.language,
        })
    }

    /// The configuration the recording pipeline runs with.
    pub fn session_config(&self) -> &VoiceSessionConfig {
        self.coordinator.config()
    }

    pub fn coordinator(&self) -> Arc<TimedRecordingCoordinator> {
        self.coordinator.clone()
    }

    pub fn playback(&self) -> Arc<SpeechPlaybackQueue> {
        self.playback.clone()
    }

    pub fn transcript_sink(&self) -> Arc<TextFieldSink> {
        self.sink.clone()
    }

    pub fn timer(&self) -> Arc<RecordingTimer> {
        self.timer.clone()
    }

    pub fn timer_snapshots(&self) -> watch::Receiver<TimerSnapshot> {
        self.timer_snapshots.clone()
    }

    pub fn transcript_preview(&self) -> watch::Receiver<String> {
        self.preview_rx.clone()
    }

    pub fn avatar_states(&self) -> watch::Receiver<AvatarState> {
        self.avatar_rx.clone()
    }

    pub fn capture_metrics(&self) -> &CaptureMetrics {
        &self.capture_metrics
    }

    pub fn playback_metrics(&self) -> &PlaybackMetrics {
        &self.playback_metrics
    }

    /// Run one recording session to completion.
    pub async fn record(&self) -> Result<(), VoiceError> {
        self.coordinator.run_session().await
    }

    /// Queue text for speech playback.
    pub async fn speak(&self, text: &str, options: SynthesisOptions) -> PlaybackResult<()> {
        self.playback.enqueue(text, options).await
    }

    /// Set playback volume and persist the preference.
    pub fn set_volume(&self, volume: f32) {
        self.playback.set_volume(volume);
        self.persist_prefs();
    }

    pub fn toggle_mute(&self) -> bool {
        self.playback.toggle_mute()
    }

    fn persist_prefs(&self) {
        if let Some(path) = &self.prefs_path {
            let prefs = UserPrefs {
                volume: self.playback.volume(),
                language: self.prefs_language.clone(),
            };
            if let Err(e) = prefs.save(path) {
                warn!(target: "runtime", "Failed to persist preferences: {}", e);
            }
        }
    }

    /// Gracefully stop both pipelines and join the helper tasks.
    pub async fn shutdown(self) {
        info!(target: "runtime", "Shutting down voice runtime...");
        self.timer.stop();
        match Arc::try_unwrap(self.playback) {
            Ok(playback) => playback.shutdown().await,
            Err(shared) => shared.stop().await,
        }
        self.avatar_driver.abort();
        let _ = self.avatar_driver.await;
        info!(target: "runtime", "Voice runtime shutdown complete");
    }
}

/// Drives the avatar from playback lifecycle events: speaking while an item
/// plays, idle otherwise. The queue itself holds no avatar state.
async fn drive_avatar_from_playback(
    avatar: Arc<AvatarChannel>,
    mut events: mpsc::Receiver<PlaybackEvent>,
) {
    let mut active_writer = None;
    while let Some(event) = events.recv().await {
        match event {
            PlaybackEvent::Started { item_id, provider } => {
                match avatar.acquire("playback") {
                    Ok(writer) => {
                        writer.set(AvatarState::Speaking);
                        active_writer = Some(writer);
                    }
                    Err(e) => {
                        warn!(target: "runtime", "Avatar busy during playback of item {}: {}", item_id, e);
                    }
                }
                info!(target: "runtime", "Playback started (item {}, provider {})", item_id, provider);
            }
            PlaybackEvent::Finished { .. } | PlaybackEvent::Failed { .. } => {
                // Dropping the writer resets the avatar to idle.
                active_writer = None;
            }
        }
    }
    drop(active_writer);
}
