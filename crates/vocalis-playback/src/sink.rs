//! Audio output seam

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::debug;

use crate::error::PlaybackError;
use crate::types::SynthesizedAudio;

/// Plays synthesized audio. `play` resolves when the clip has finished (or
/// the sink was stopped). Gain changes apply to audio already in flight.
#[async_trait]
pub trait AudioSink: Send + Sync {
    async fn play(&self, audio: SynthesizedAudio, gain: f32) -> Result<(), PlaybackError>;

    /// Update the gain of the clip currently playing, if any.
    fn set_gain(&self, gain: f32);

    /// Halt the clip currently playing. `play` resolves shortly after.
    async fn stop(&self);
}

/// Sink that consumes audio without producing sound, simulating playback
/// duration from the byte count. Used in tests and headless runs.
///
/// A zero gain still "plays" the clip for its full duration; muting is not
/// skipping.
pub struct DiscardSink {
    bytes_per_ms: usize,
    stop_signal: Notify,
    last_gain: Mutex<Option<f32>>,
    clips_played: Mutex<u64>,
}

impl DiscardSink {
    pub fn new(bytes_per_ms: usize) -> Self {
        Self {
            bytes_per_ms: bytes_per_ms.max(1),
            stop_signal: Notify::new(),
            last_gain: Mutex::new(None),
            clips_played: Mutex::new(0),
        }
    }

    /// Gain the most recent clip was (last) played with.
    pub fn last_gain(&self) -> Option<f32> {
        *self.last_gain.lock()
    }

    pub fn clips_played(&self) -> u64 {
        *self.clips_played.lock()
    }
}

impl Default for DiscardSink {
    fn default() -> Self {
        // Roughly 24 kHz 16-bit mono.
        Self::new(48)
    }
}

#[async_trait]
impl AudioSink for DiscardSink {
    async fn play(&self, audio: SynthesizedAudio, gain: f32) -> Result<(), PlaybackError> {
        *self.last_gain.lock() = Some(gain);
        let duration = Duration::from_millis((audio.data.len() / self.bytes_per_ms) as u64);
        debug!(
            target: "playback",
            "Discard sink playing {} bytes (~{:?}, gain {:.2})",
            audio.data.len(),
            duration,
            gain
        );
        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = self.stop_signal.notified() => {
                debug!(target: "playback", "Discard sink stopped mid-clip");
            }
        }
        *self.clips_played.lock() += 1;
        Ok(())
    }

    fn set_gain(&self, gain: f32) {
        *self.last_gain.lock() = Some(gain);
    }

    async fn stop(&self) {
        self.stop_signal.notify_waiters();
    }
}
