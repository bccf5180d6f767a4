use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pomodoro::SessionType;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "kebab-case")]
pub enum SessionStatus {
    #[default]
    InProgress,
    Completed,
    Skipped,
    Stopped,
}

/// A Pomodoro session as recorded in the document store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct PomodoroSessionRecord {
    #[serde(default)]
    pub id: String,
    pub user_id: String,
    pub session_type: SessionType,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
    /// Configured length of the session in minutes.
    pub duration_minutes: u32,
    /// Seconds actually spent before the session ended.
    #[serde(default)]
    pub elapsed_seconds: u32,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub status: SessionStatus,
    #[serde(default)]
    pub task_id: Option<String>,
}

impl PomodoroSessionRecord {
    pub fn is_focus(&self) -> bool {
        self.session_type == SessionType::Work
    }

    /// Whole minutes of focus this record contributes.
    pub fn focus_minutes(&self) -> u32 {
        if self.is_focus() {
            self.elapsed_seconds / 60
        } else {
            0
        }
    }
}
