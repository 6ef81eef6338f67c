//! Countdown timer with a gated manual-stop affordance.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Events the timer raises towards the recording coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// The allotted duration elapsed. Fires exactly once per `start`.
    Timeout,
    /// The user activated the (enabled) manual-stop affordance.
    StopRequested,
}

/// Rendered countdown state, published for the (out-of-scope) UI layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimerSnapshot {
    pub remaining_ms: u64,
    /// 0.0 at start, 1.0 when the duration elapsed.
    pub progress: f32,
    pub stop_enabled: bool,
}

impl Default for TimerSnapshot {
    fn default() -> Self {
        Self {
            remaining_ms: 0,
            progress: 0.0,
            stop_enabled: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Idle,
    Running,
}

/// Visual countdown and manual-stop affordance for timed recording.
///
/// `{idle} -> start -> {running} -> (timeout | stop) -> {idle}`; no other
/// states.
pub struct RecordingTimer {
    events_tx: mpsc::Sender<TimerEvent>,
    snapshot_tx: Arc<watch::Sender<TimerSnapshot>>,
    stop_enabled: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    tick: Duration,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl RecordingTimer {
    pub fn new(events_tx: mpsc::Sender<TimerEvent>) -> (Self, watch::Receiver<TimerSnapshot>) {
        let (snapshot_tx, snapshot_rx) = watch::channel(TimerSnapshot::default());
        (
            Self {
                events_tx,
                snapshot_tx: Arc::new(snapshot_tx),
                stop_enabled: Arc::new(AtomicBool::new(false)),
                running: Arc::new(AtomicBool::new(false)),
                tick: Duration::from_millis(100),
                task: Mutex::new(None),
            },
            snapshot_rx,
        )
    }

    pub fn state(&self) -> TimerState {
        if self.running.load(Ordering::SeqCst) {
            TimerState::Running
        } else {
            TimerState::Idle
        }
    }

    /// Begin a countdown. A countdown already running is stopped first.
    pub fn start(&self, duration: Duration) {
        self.stop();
        self.running.store(true, Ordering::SeqCst);
        let _ = self.snapshot_tx.send(TimerSnapshot {
            remaining_ms: duration.as_millis() as u64,
            progress: 0.0,
            stop_enabled: self.stop_enabled.load(Ordering::SeqCst),
        });

        let events_tx = self.events_tx.clone();
        let snapshot_tx = self.snapshot_tx.clone();
        let stop_enabled = self.stop_enabled.clone();
        let running = self.running.clone();
        let tick = self.tick;
        let deadline = tokio::time::Instant::now() + duration;
        *self.task.lock() = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let now = tokio::time::Instant::now();
                let remaining = deadline.saturating_duration_since(now);
                let progress = if duration.is_zero() {
                    1.0
                } else {
                    1.0 - remaining.as_secs_f32() / duration.as_secs_f32()
                };
                let _ = snapshot_tx.send(TimerSnapshot {
                    remaining_ms: remaining.as_millis() as u64,
                    progress,
                    stop_enabled: stop_enabled.load(Ordering::SeqCst),
                });
                if remaining.is_zero() {
                    running.store(false, Ordering::SeqCst);
                    debug!(target: "timer", "Countdown elapsed");
                    let _ = events_tx.send(TimerEvent::Timeout).await;
                    return;
                }
            }
        }));
    }

    /// Cancel the countdown. No further callbacks fire.
    pub fn stop(&self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
        self.running.store(false, Ordering::SeqCst);
    }

    /// Toggle whether the manual-stop affordance accepts activation.
    pub fn set_stop_enabled(&self, enabled: bool) {
        self.stop_enabled.store(enabled, Ordering::SeqCst);
        self.snapshot_tx.send_modify(|s| s.stop_enabled = enabled);
    }

    pub fn stop_enabled(&self) -> bool {
        self.stop_enabled.load(Ordering::SeqCst)
    }

    /// Activate the manual-stop affordance. Ignored while disabled or idle,
    /// mirroring a disabled button swallowing clicks.
    pub fn request_stop(&self) {
        if !self.running.load(Ordering::SeqCst) {
            debug!(target: "timer", "Stop requested while idle, ignored");
            return;
        }
        if !self.stop_enabled.load(Ordering::SeqCst) {
            warn!(target: "timer", "Stop requested while disabled, ignored");
            return;
        }
        let _ = self.events_tx.try_send(TimerEvent::StopRequested);
    }
}

impl Drop for RecordingTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn timeout_fires_exactly_once() {
        let (events_tx, mut events_rx) = mpsc::channel(8);
        let (timer, _snapshots) = RecordingTimer::new(events_tx);
        timer.start(Duration::from_millis(500));

        tokio::time::advance(Duration::from_millis(600)).await;
        assert_eq!(events_rx.recv().await.unwrap(), TimerEvent::Timeout);
        assert_eq!(timer.state(), TimerState::Idle);

        tokio::time::advance(Duration::from_millis(1000)).await;
        assert!(events_rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_without_timeout() {
        let (events_tx, mut events_rx) = mpsc::channel(8);
        let (timer, _snapshots) = RecordingTimer::new(events_tx);
        timer.start(Duration::from_millis(500));

        tokio::time::advance(Duration::from_millis(200)).await;
        timer.stop();
        tokio::time::advance(Duration::from_millis(1000)).await;
        assert!(events_rx.try_recv().is_err());
        assert_eq!(timer.state(), TimerState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn snapshots_count_down() {
        let (events_tx, _events_rx) = mpsc::channel(8);
        let (timer, snapshots) = RecordingTimer::new(events_tx);
        timer.start(Duration::from_millis(1000));

        tokio::time::advance(Duration::from_millis(500)).await;
        tokio::task::yield_now().await;
        let snap = *snapshots.borrow();
        assert!(snap.remaining_ms <= 500);
        assert!(snap.progress >= 0.5);
    }

    #[tokio::test]
    async fn disabled_stop_requests_are_swallowed() {
        let (events_tx, mut events_rx) = mpsc::channel(8);
        let (timer, _snapshots) = RecordingTimer::new(events_tx);
        timer.start(Duration::from_secs(30));

        timer.request_stop();
        assert!(events_rx.try_recv().is_err());

        timer.set_stop_enabled(true);
        timer.request_stop();
        assert_eq!(events_rx.recv().await.unwrap(), TimerEvent::StopRequested);
        timer.stop();
    }

    #[tokio::test]
    async fn idle_stop_requests_are_swallowed() {
        let (events_tx, mut events_rx) = mpsc::channel(8);
        let (timer, _snapshots) = RecordingTimer::new(events_tx);
        timer.set_stop_enabled(true);
        timer.request_stop();
        assert!(events_rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_enabled_is_reflected_in_snapshots() {
        let (events_tx, _events_rx) = mpsc::channel(8);
        let (timer, snapshots) = RecordingTimer::new(events_tx);
        timer.start(Duration::from_secs(30));
        assert!(!snapshots.borrow().stop_enabled);
        timer.set_stop_enabled(true);
        assert!(snapshots.borrow().stop_enabled);
        timer.stop();
    }
}
