//! Presentation state, decoupled from any rendering layer.
//!
//! The avatar channel is the single outward signal both pipelines drive.
//! Exactly one writer may hold it at a time; the guard enforces what the
//! original left to convention.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::debug;

use vocalis_foundation::VoiceError;

/// Closed set of avatar presentation states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvatarState {
    Idle,
    Thinking,
    Speaking,
    Listening,
}

/// Watch-published avatar state with a single-writer claim.
pub struct AvatarChannel {
    state_tx: watch::Sender<AvatarState>,
    owner: Mutex<Option<&'static str>>,
}

impl AvatarChannel {
    pub fn new() -> (Arc<Self>, watch::Receiver<AvatarState>) {
        let (state_tx, state_rx) = watch::channel(AvatarState::Idle);
        (
            Arc::new(Self {
                state_tx,
                owner: Mutex::new(None),
            }),
            state_rx,
        )
    }

    /// Claim the channel for one pipeline. Fails while another writer holds
    /// it; the claim is released (and the avatar reset to idle) when the
    /// returned guard drops.
    pub fn acquire(self: &Arc<Self>, who: &'static str) -> Result<AvatarWriter, VoiceError> {
        let mut owner = self.owner.lock();
        if let Some(current) = *owner {
            return Err(VoiceError::Config(format!(
                "avatar channel already owned by {}",
                current
            )));
        }
        *owner = Some(who);
        debug!(target: "ui", "Avatar channel claimed by {}", who);
        Ok(AvatarWriter {
            channel: self.clone(),
            who,
        })
    }

    pub fn current(&self) -> AvatarState {
        *self.state_tx.borrow()
    }
}

/// Exclusive write handle to the avatar channel.
pub struct AvatarWriter {
    channel: Arc<AvatarChannel>,
    who: &'static str,
}

impl AvatarWriter {
    pub fn set(&self, state: AvatarState) {
        debug!(target: "ui", "Avatar -> {:?} (by {})", state, self.who);
        let _ = self.channel.state_tx.send(state);
    }
}

impl Drop for AvatarWriter {
    fn drop(&mut self) {
        let _ = self.channel.state_tx.send(AvatarState::Idle);
        *self.channel.owner.lock() = None;
        debug!(target: "ui", "Avatar channel released by {}", self.who);
    }
}
