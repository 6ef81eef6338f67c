//! Voice session orchestration for Vocalis: the recording coordinator, the
//! countdown timer, typed configuration, the avatar/UI state channel, and
//! the runtime that owns it all.

pub mod config;
pub mod coordinator;
pub mod runtime;
pub mod timer;
pub mod transcript;
pub mod ui;

pub use config::{AutoSubmitMode, GraceWindows, RecordingMode, TimerStyle, VoiceSessionConfig};
pub use coordinator::TimedRecordingCoordinator;
pub use runtime::{VoiceRuntime, VoiceRuntimeOptions};
pub use timer::{RecordingTimer, TimerEvent, TimerSnapshot, TimerState};
pub use transcript::{Delivery, StopReason, TextFieldSink, TranscriptNotice, TranscriptSink};
pub use ui::{AvatarChannel, AvatarState, AvatarWriter};
