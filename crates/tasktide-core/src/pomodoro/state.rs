use serde::{Deserialize, Serialize};

use super::PomodoroSettings;
use crate::utils::format_countdown;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "kebab-case")]
pub enum SessionType {
    #[default]
    Work,
    #[serde(alias = "shortBreak")]
    ShortBreak,
    #[serde(alias = "longBreak")]
    LongBreak,
}

impl SessionType {
    pub fn is_break(&self) -> bool {
        !matches!(self, SessionType::Work)
    }

    pub fn label(&self) -> &'static str {
        match self {
            SessionType::Work => "Focus",
            SessionType::ShortBreak => "Short Break",
            SessionType::LongBreak => "Long Break",
        }
    }
}

impl std::fmt::Display for SessionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Read-only snapshot of the timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct PomodoroRuntimeState {
    pub session_type: SessionType,
    pub time_left_seconds: u32,
    pub is_active: bool,
    pub is_paused: bool,
    /// Completed work sessions since the timer was created.
    pub session_count: u32,
}

impl PomodoroRuntimeState {
    pub fn new(settings: &PomodoroSettings) -> Self {
        Self {
            session_type: SessionType::Work,
            time_left_seconds: settings.duration_seconds(SessionType::Work),
            is_active: false,
            is_paused: false,
            session_count: 0,
        }
    }

    /// Counting down right now.
    pub fn is_running(&self) -> bool {
        self.is_active && !self.is_paused
    }

    pub fn countdown(&self) -> String {
        format_countdown(self.time_left_seconds)
    }

    /// Fraction of `total_seconds` already elapsed, in `[0, 1]`.
    pub fn progress(&self, total_seconds: u32) -> f64 {
        if total_seconds == 0 {
            return 1.0;
        }
        let left = self.time_left_seconds.min(total_seconds);
        f64::from(total_seconds - left) / f64::from(total_seconds)
    }
}
