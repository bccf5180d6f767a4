use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::SessionType;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    #[error("{field} must be a positive number, got {value}")]
    NotPositive { field: &'static str, value: u32 },

    #[error("{field} must be at most {max}, got {value}")]
    TooLarge {
        field: &'static str,
        value: u32,
        max: u32,
    },
}

/// Longest allowed session, in minutes.
const MAX_DURATION_MINUTES: u32 = 24 * 60;

/// User-configurable timer settings. Durations are whole minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase", default)]
pub struct PomodoroSettings {
    pub work_duration: u32,
    pub short_break_duration: u32,
    pub long_break_duration: u32,
    pub sessions_until_long_break: u32,
    pub auto_start_breaks: bool,
    pub auto_start_work: bool,
    pub sound_enabled: bool,
}

impl Default for PomodoroSettings {
    fn default() -> Self {
        Self {
            work_duration: 25,
            short_break_duration: 5,
            long_break_duration: 15,
            sessions_until_long_break: 4,
            auto_start_breaks: false,
            auto_start_work: false,
            sound_enabled: true,
        }
    }
}

impl PomodoroSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        let durations = [
            ("workDuration", self.work_duration),
            ("shortBreakDuration", self.short_break_duration),
            ("longBreakDuration", self.long_break_duration),
        ];
        for (field, value) in durations {
            if value == 0 {
                return Err(SettingsError::NotPositive { field, value });
            }
            if value > MAX_DURATION_MINUTES {
                return Err(SettingsError::TooLarge {
                    field,
                    value,
                    max: MAX_DURATION_MINUTES,
                });
            }
        }
        if self.sessions_until_long_break == 0 {
            return Err(SettingsError::NotPositive {
                field: "sessionsUntilLongBreak",
                value: 0,
            });
        }
        Ok(())
    }

    pub fn duration_minutes(&self, session: SessionType) -> u32 {
        match session {
            SessionType::Work => self.work_duration,
            SessionType::ShortBreak => self.short_break_duration,
            SessionType::LongBreak => self.long_break_duration,
        }
    }

    pub fn duration_seconds(&self, session: SessionType) -> u32 {
        self.duration_minutes(session) * 60
    }

    /// Whether entering `session` should start it without user input.
    pub fn auto_starts(&self, session: SessionType) -> bool {
        if session.is_break() {
            self.auto_start_breaks
        } else {
            self.auto_start_work
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let s = PomodoroSettings::default();
        assert!(s.validate().is_ok());
        assert_eq!(s.duration_seconds(SessionType::Work), 1500);
        assert_eq!(s.duration_seconds(SessionType::ShortBreak), 300);
        assert_eq!(s.duration_seconds(SessionType::LongBreak), 900);
    }

    #[test]
    fn test_zero_values_rejected() {
        let s = PomodoroSettings {
            short_break_duration: 0,
            ..Default::default()
        };
        assert_eq!(
            s.validate(),
            Err(SettingsError::NotPositive {
                field: "shortBreakDuration",
                value: 0
            })
        );

        let s = PomodoroSettings {
            sessions_until_long_break: 0,
            ..Default::default()
        };
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let s: PomodoroSettings = serde_json::from_str(r#"{ "workDuration": 50 }"#).unwrap();
        assert_eq!(s.work_duration, 50);
        assert_eq!(s.short_break_duration, 5);
        assert!(s.sound_enabled);
    }
}
