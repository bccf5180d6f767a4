//! Strongly-typed user settings.
//!
//! Settings are grouped into fixed categories and changed only through
//! [`SettingsUpdate`], so an unknown key cannot be written.

use serde::{Deserialize, Serialize};

use crate::pomodoro::{PomodoroSettings, SettingsError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "lowercase")]
pub enum WeekStart {
    Sunday,
    #[default]
    Monday,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Private,
    Friends,
    Public,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationSettings {
    pub email_reminders: bool,
    pub push_enabled: bool,
    pub task_reminders: bool,
    /// Minutes before a due date to send a reminder.
    pub reminder_lead_minutes: u32,
    pub pomodoro_alerts: bool,
    pub weekly_summary: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            email_reminders: false,
            push_enabled: true,
            task_reminders: true,
            reminder_lead_minutes: 60,
            pomodoro_alerts: true,
            weekly_summary: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase", default)]
pub struct ProductivitySettings {
    pub pomodoro: PomodoroSettings,
    pub daily_goal_sessions: u32,
    pub daily_goal_tasks: u32,
}

impl Default for ProductivitySettings {
    fn default() -> Self {
        Self {
            pomodoro: PomodoroSettings::default(),
            daily_goal_sessions: 8,
            daily_goal_tasks: 5,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase", default)]
pub struct PrivacySettings {
    pub share_analytics: bool,
    pub profile_visibility: Visibility,
    pub show_activity_status: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase", default)]
pub struct GeneralSettings {
    pub theme: Theme,
    pub language: String,
    pub week_start: WeekStart,
    pub use_24_hour_time: bool,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            language: "en".to_string(),
            week_start: WeekStart::default(),
            use_24_hour_time: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileSettings {
    pub display_name: String,
    pub school: Option<String>,
    pub major: Option<String>,
    pub graduation_year: Option<u16>,
    pub bio: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase", default)]
pub struct UserSettings {
    pub notifications: NotificationSettings,
    pub productivity: ProductivitySettings,
    pub privacy: PrivacySettings,
    pub general: GeneralSettings,
    pub profile: ProfileSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsCategory {
    Notifications,
    Productivity,
    Privacy,
    General,
    Profile,
}

/// A single named settings change.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingsUpdate {
    EmailReminders(bool),
    PushEnabled(bool),
    TaskReminders(bool),
    ReminderLeadMinutes(u32),
    PomodoroAlerts(bool),
    WeeklySummary(bool),

    Pomodoro(PomodoroSettings),
    DailyGoalSessions(u32),
    DailyGoalTasks(u32),

    ShareAnalytics(bool),
    ProfileVisibility(Visibility),
    ShowActivityStatus(bool),

    Theme(Theme),
    Language(String),
    WeekStart(WeekStart),
    Use24HourTime(bool),

    DisplayName(String),
    School(Option<String>),
    Major(Option<String>),
    GraduationYear(Option<u16>),
    Bio(Option<String>),
}

impl SettingsUpdate {
    pub fn category(&self) -> SettingsCategory {
        use SettingsUpdate::*;
        match self {
            EmailReminders(_) | PushEnabled(_) | TaskReminders(_) | ReminderLeadMinutes(_)
            | PomodoroAlerts(_) | WeeklySummary(_) => SettingsCategory::Notifications,
            Pomodoro(_) | DailyGoalSessions(_) | DailyGoalTasks(_) => SettingsCategory::Productivity,
            ShareAnalytics(_) | ProfileVisibility(_) | ShowActivityStatus(_) => {
                SettingsCategory::Privacy
            }
            Theme(_) | Language(_) | WeekStart(_) | Use24HourTime(_) => SettingsCategory::General,
            DisplayName(_) | School(_) | Major(_) | GraduationYear(_) | Bio(_) => {
                SettingsCategory::Profile
            }
        }
    }
}

impl UserSettings {
    /// Apply one change. Invalid Pomodoro settings are rejected and leave
    /// the settings untouched.
    pub fn apply(&mut self, update: SettingsUpdate) -> Result<(), SettingsError> {
        match update {
            SettingsUpdate::EmailReminders(v) => self.notifications.email_reminders = v,
            SettingsUpdate::PushEnabled(v) => self.notifications.push_enabled = v,
            SettingsUpdate::TaskReminders(v) => self.notifications.task_reminders = v,
            SettingsUpdate::ReminderLeadMinutes(v) => self.notifications.reminder_lead_minutes = v,
            SettingsUpdate::PomodoroAlerts(v) => self.notifications.pomodoro_alerts = v,
            SettingsUpdate::WeeklySummary(v) => self.notifications.weekly_summary = v,

            SettingsUpdate::Pomodoro(pomodoro) => {
                pomodoro.validate()?;
                self.productivity.pomodoro = pomodoro;
            }
            SettingsUpdate::DailyGoalSessions(v) => self.productivity.daily_goal_sessions = v,
            SettingsUpdate::DailyGoalTasks(v) => self.productivity.daily_goal_tasks = v,

            SettingsUpdate::ShareAnalytics(v) => self.privacy.share_analytics = v,
            SettingsUpdate::ProfileVisibility(v) => self.privacy.profile_visibility = v,
            SettingsUpdate::ShowActivityStatus(v) => self.privacy.show_activity_status = v,

            SettingsUpdate::Theme(v) => self.general.theme = v,
            SettingsUpdate::Language(v) => self.general.language = v,
            SettingsUpdate::WeekStart(v) => self.general.week_start = v,
            SettingsUpdate::Use24HourTime(v) => self.general.use_24_hour_time = v,

            SettingsUpdate::DisplayName(v) => self.profile.display_name = v,
            SettingsUpdate::School(v) => self.profile.school = v,
            SettingsUpdate::Major(v) => self.profile.major = v,
            SettingsUpdate::GraduationYear(v) => self.profile.graduation_year = v,
            SettingsUpdate::Bio(v) => self.profile.bio = v,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_updates_named_fields() {
        let mut settings = UserSettings::default();
        settings.apply(SettingsUpdate::Theme(Theme::Dark)).unwrap();
        settings
            .apply(SettingsUpdate::DisplayName("Sam".into()))
            .unwrap();
        settings.apply(SettingsUpdate::DailyGoalSessions(6)).unwrap();

        assert_eq!(settings.general.theme, Theme::Dark);
        assert_eq!(settings.profile.display_name, "Sam");
        assert_eq!(settings.productivity.daily_goal_sessions, 6);
    }

    #[test]
    fn test_invalid_pomodoro_update_is_rejected() {
        let mut settings = UserSettings::default();
        let bad = PomodoroSettings {
            long_break_duration: 0,
            ..Default::default()
        };
        assert!(settings.apply(SettingsUpdate::Pomodoro(bad)).is_err());
        assert_eq!(settings.productivity.pomodoro, PomodoroSettings::default());
    }

    #[test]
    fn test_update_categories() {
        assert_eq!(
            SettingsUpdate::Bio(None).category(),
            SettingsCategory::Profile
        );
        assert_eq!(
            SettingsUpdate::Pomodoro(PomodoroSettings::default()).category(),
            SettingsCategory::Productivity
        );
    }

    #[test]
    fn test_partial_document_fills_defaults() {
        let json = r#"{ "general": { "theme": "dark" }, "productivity": { "pomodoro": { "workDuration": 30 } } }"#;
        let settings: UserSettings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.general.theme, Theme::Dark);
        assert_eq!(settings.general.language, "en");
        assert_eq!(settings.productivity.pomodoro.work_duration, 30);
        assert_eq!(settings.productivity.daily_goal_tasks, 5);
        assert!(settings.notifications.push_enabled);
    }
}
