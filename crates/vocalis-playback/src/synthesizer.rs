//! Synthesis provider seam

use crate::error::SynthesisError;
use crate::types::{SynthesisOptions, SynthesizedAudio};
use async_trait::async_trait;

/// Text-to-speech provider interface.
///
/// Implementations turn sanitized text into audio bytes; they do not play
/// anything themselves. The playback queue owns attempt ordering and
/// fallback.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Provider name for logs and lifecycle events.
    fn name(&self) -> &str;

    /// Whether this provider can synthesize on this host right now.
    async fn is_available(&self) -> bool;

    /// Synthesize `text` to audio. `options` are per-request overrides.
    async fn synthesize(
        &self,
        text: &str,
        options: &SynthesisOptions,
    ) -> Result<SynthesizedAudio, SynthesisError>;
}
