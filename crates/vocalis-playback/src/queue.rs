//! Serializing playback queue with per-item provider fallback.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot, watch, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{PlaybackError, PlaybackResult};
use crate::next_item_id;
use crate::sink::AudioSink;
use crate::synthesizer::SpeechSynthesizer;
use crate::types::{sanitize_for_speech, PlaybackEvent, SynthesisOptions};
use vocalis_telemetry::PlaybackMetrics;

struct QueuedItem {
    id: u64,
    text: String,
    options: SynthesisOptions,
    responder: oneshot::Sender<PlaybackResult<()>>,
}

struct VolumeState {
    volume: f32,
    muted: bool,
}

struct QueueShared {
    pending: Mutex<VecDeque<QueuedItem>>,
    wakeup: Notify,
    /// Bumped on every `stop()`; the worker snapshots it when an item
    /// becomes active. Send and snapshot both happen under the `pending`
    /// lock, so an item is either drained while queued or reliably sees the
    /// cancellation while active.
    cancel_tx: watch::Sender<u64>,
    volume: Mutex<VolumeState>,
    metrics: PlaybackMetrics,
}

impl QueueShared {
    fn effective_gain(&self, options: &SynthesisOptions) -> f32 {
        let vs = self.volume.lock();
        if vs.muted {
            0.0
        } else {
            options.volume.unwrap_or(vs.volume).clamp(0.0, 1.0)
        }
    }

    fn current_gain(&self) -> f32 {
        let vs = self.volume.lock();
        if vs.muted {
            0.0
        } else {
            vs.volume
        }
    }
}

/// Serializes text-to-speech playback across a primary and an optional
/// fallback provider.
///
/// Items play strictly in enqueue order. The fallback is tried per item and
/// is not sticky: the next item starts at the primary again.
pub struct SpeechPlaybackQueue {
    shared: Arc<QueueShared>,
    sink: Arc<dyn AudioSink>,
    worker: JoinHandle<()>,
}

impl SpeechPlaybackQueue {
    pub fn new(
        primary: Arc<dyn SpeechSynthesizer>,
        fallback: Option<Arc<dyn SpeechSynthesizer>>,
        sink: Arc<dyn AudioSink>,
        metrics: PlaybackMetrics,
        initial_volume: f32,
    ) -> (Self, mpsc::Receiver<PlaybackEvent>) {
        let (event_tx, event_rx) = mpsc::channel(32);
        let (cancel_tx, cancel_rx) = watch::channel(0u64);
        let shared = Arc::new(QueueShared {
            pending: Mutex::new(VecDeque::new()),
            wakeup: Notify::new(),
            cancel_tx,
            volume: Mutex::new(VolumeState {
                volume: initial_volume.clamp(0.0, 1.0),
                muted: false,
            }),
            metrics,
        });

        info!(
            target: "playback",
            "Playback queue ready (primary: {}, fallback: {})",
            primary.name(),
            fallback.as_deref().map(|f| f.name()).unwrap_or("none")
        );

        let worker = tokio::spawn(worker_loop(
            shared.clone(),
            primary,
            fallback,
            sink.clone(),
            event_tx,
            cancel_rx,
        ));

        (
            Self {
                shared,
                sink,
                worker,
            },
            event_rx,
        )
    }

    /// Queue `text` for playback. Resolves when this item finished playing,
    /// rejects when it failed on both providers or was cancelled.
    ///
    /// Text that sanitizes to nothing resolves immediately without playing.
    pub async fn enqueue(&self, text: &str, options: SynthesisOptions) -> PlaybackResult<()> {
        let clean = sanitize_for_speech(text);
        if clean.is_empty() {
            warn!(target: "playback", "Empty text after sanitization, nothing to play");
            return Ok(());
        }

        let (responder, done) = oneshot::channel();
        let id = next_item_id();
        {
            let mut pending = self.shared.pending.lock();
            pending.push_back(QueuedItem {
                id,
                text: clean,
                options,
                responder,
            });
            self.shared.metrics.record_enqueued(pending.len());
            debug!(target: "playback", "Item {} queued ({} pending)", id, pending.len());
        }
        self.shared.wakeup.notify_one();

        done.await.unwrap_or(Err(PlaybackError::Cancelled))
    }

    /// Halt active playback, reject every queued item, empty the queue.
    /// Authoritative: no further events fire for cancelled items.
    pub async fn stop(&self) {
        let drained: Vec<QueuedItem> = {
            let mut pending = self.shared.pending.lock();
            let drained = pending.drain(..).collect();
            self.shared
                .cancel_tx
                .send_modify(|epoch| *epoch = epoch.wrapping_add(1));
            drained
        };
        let count = drained.len() as u64;
        for item in drained {
            let _ = item.responder.send(Err(PlaybackError::Cancelled));
        }
        self.shared.metrics.record_cancelled(count);
        self.sink.stop().await;
        info!(target: "playback", "Playback stopped, {} queued items rejected", count);
    }

    /// Set the persistent volume level (0-1). Applies to subsequent items
    /// and to the gain of audio already in flight.
    pub fn set_volume(&self, volume: f32) {
        {
            let mut vs = self.shared.volume.lock();
            vs.volume = volume.clamp(0.0, 1.0);
        }
        self.sink.set_gain(self.shared.current_gain());
        debug!(target: "playback", "Volume set to {:.0}%", self.volume() * 100.0);
    }

    pub fn volume(&self) -> f32 {
        self.shared.volume.lock().volume
    }

    /// Toggle the mute flag; returns the new state.
    pub fn toggle_mute(&self) -> bool {
        let muted = {
            let mut vs = self.shared.volume.lock();
            vs.muted = !vs.muted;
            vs.muted
        };
        self.sink.set_gain(self.shared.current_gain());
        debug!(target: "playback", "Mute {}", if muted { "enabled" } else { "disabled" });
        muted
    }

    pub fn is_muted(&self) -> bool {
        self.shared.volume.lock().muted
    }

    pub fn queue_len(&self) -> usize {
        self.shared.pending.lock().len()
    }

    /// Tear the queue down, cancelling everything.
    pub async fn shutdown(self) {
        self.stop().await;
        self.worker.abort();
        let _ = self.worker.await;
    }
}

async fn worker_loop(
    shared: Arc<QueueShared>,
    primary: Arc<dyn SpeechSynthesizer>,
    fallback: Option<Arc<dyn SpeechSynthesizer>>,
    sink: Arc<dyn AudioSink>,
    event_tx: mpsc::Sender<PlaybackEvent>,
    mut cancel_rx: watch::Receiver<u64>,
) {
    loop {
        let item = {
            let mut pending = shared.pending.lock();
            match pending.pop_front() {
                Some(item) => {
                    // Mark the current cancel epoch as seen while still
                    // holding the lock; see QueueShared::cancel_tx.
                    cancel_rx.borrow_and_update();
                    shared.metrics.queue_depth.store(
                        pending.len(),
                        std::sync::atomic::Ordering::Relaxed,
                    );
                    Some(item)
                }
                None => None,
            }
        };
        let item = match item {
            Some(item) => item,
            None => {
                shared.wakeup.notified().await;
                continue;
            }
        };

        let result = tokio::select! {
            _ = cancel_rx.changed() => {
                debug!(target: "playback", "Item {} cancelled mid-flight", item.id);
                Err(PlaybackError::Cancelled)
            }
            res = attempt_item(&shared, &primary, fallback.as_deref(), sink.as_ref(), &item, &event_tx) => res,
        };

        match &result {
            Ok(()) => {
                shared.metrics.record_played();
                let _ = event_tx
                    .send(PlaybackEvent::Finished { item_id: item.id })
                    .await;
            }
            Err(PlaybackError::Cancelled) => {
                shared.metrics.record_cancelled(1);
                // No events for cancelled items.
            }
            Err(e) => {
                shared.metrics.record_failed();
                let _ = event_tx
                    .send(PlaybackEvent::Failed {
                        item_id: item.id,
                        error: e.to_string(),
                    })
                    .await;
            }
        }
        let _ = item.responder.send(result);
    }
}

async fn attempt_item(
    shared: &QueueShared,
    primary: &Arc<dyn SpeechSynthesizer>,
    fallback: Option<&dyn SpeechSynthesizer>,
    sink: &dyn AudioSink,
    item: &QueuedItem,
    event_tx: &mpsc::Sender<PlaybackEvent>,
) -> PlaybackResult<()> {
    let gain = shared.effective_gain(&item.options);

    match synth_and_play(primary.as_ref(), sink, item, gain, event_tx).await {
        Ok(()) => Ok(()),
        Err(primary_err) => match fallback {
            Some(fb) => {
                warn!(
                    target: "playback",
                    "Primary provider {} failed for item {}: {}; falling back to {}",
                    primary.name(),
                    item.id,
                    primary_err,
                    fb.name()
                );
                shared
                    .metrics
                    .fallback_count
                    .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                synth_and_play(fb, sink, item, gain, event_tx)
                    .await
                    .map_err(|fallback_err| {
                        PlaybackError::Synthesis(format!(
                            "{} (fallback: {})",
                            primary_err, fallback_err
                        ))
                    })
            }
            None => Err(primary_err),
        },
    }
}

async fn synth_and_play(
    provider: &dyn SpeechSynthesizer,
    sink: &dyn AudioSink,
    item: &QueuedItem,
    gain: f32,
    event_tx: &mpsc::Sender<PlaybackEvent>,
) -> PlaybackResult<()> {
    let audio = provider
        .synthesize(&item.text, &item.options)
        .await
        .map_err(|e| PlaybackError::Synthesis(e.to_string()))?;

    let _ = event_tx
        .send(PlaybackEvent::Started {
            item_id: item.id,
            provider: provider.name().to_string(),
        })
        .await;

    sink.play(audio, gain).await
}
