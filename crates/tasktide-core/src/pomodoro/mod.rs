//! Pomodoro focus timer.
//!
//! Work sessions alternate with short breaks; every
//! `sessions_until_long_break`-th completed work session is followed by a
//! long break instead. The transition logic lives in the synchronous
//! [`PomodoroTimer`]; [`PomodoroDriver`] runs it against real time and
//! feeds its events to a [`SessionRecorder`] and a [`CompletionNotifier`].

pub mod driver;
pub mod notifier;
pub mod recorder;
pub mod settings;
pub mod state;
pub mod timer;

pub use driver::{DriverError, PomodoroDriver, PomodoroHandle, TimerCommand, AUTO_START_DELAY};
pub use notifier::{completion_message, CompletionNotifier, NoopNotifier, TerminalBell};
pub use recorder::SessionRecorder;
pub use settings::{PomodoroSettings, SettingsError};
pub use state::{PomodoroRuntimeState, SessionType};
pub use timer::{PomodoroTimer, TimerEvent};
