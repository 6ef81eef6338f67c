//! Recognition provider seam

use crate::types::{CaptureConfig, RecognizerEvent};
use async_trait::async_trait;
use tokio::sync::mpsc;
use vocalis_foundation::VoiceError;

/// Continuous speech recognition provider.
///
/// Implementations push events into the supplied channel until the stream
/// ends. `stop()` is advisory: buffered `Final` and `Ended` events may still
/// arrive after it returns.
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Provider name for logs.
    fn name(&self) -> &str;

    /// Whether the recognition capability exists on this host.
    async fn is_available(&self) -> bool;

    /// Begin one recognition run, delivering events into `events`.
    ///
    /// Permission problems are reported asynchronously as an
    /// `Error(NoPermission)` event, not as a return value; callers must be
    /// consuming `events` before this resolves. Implementations must emit
    /// `Ended` when the stream closes, including after errors.
    async fn start(
        &self,
        config: CaptureConfig,
        events: mpsc::Sender<RecognizerEvent>,
    ) -> Result<(), VoiceError>;

    /// Request the current run to end. Advisory.
    async fn stop(&self);
}
