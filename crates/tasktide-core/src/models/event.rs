use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::Task;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "lowercase")]
pub enum EventSource {
    #[default]
    Manual,
    Task,
    /// Imported from an external calendar.
    Synced,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    #[serde(default)]
    pub id: String,
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub all_day: bool,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub source: EventSource,
    /// Id of the event in the external calendar it was synced from.
    #[serde(default)]
    pub external_id: Option<String>,
}

impl CalendarEvent {
    /// All-day event on a task's due date, if it has one.
    pub fn from_task(task: &Task) -> Option<Self> {
        let due = task.due_date?;
        let start = due.date_naive().and_hms_opt(0, 0, 0)?.and_utc();
        Some(Self {
            id: String::new(),
            user_id: task.user_id.clone(),
            title: task.title.clone(),
            description: task.description.clone(),
            start,
            end: start + Duration::days(1),
            all_day: true,
            location: None,
            task_id: (!task.id.is_empty()).then(|| task.id.clone()),
            source: EventSource::Task,
            external_id: None,
        })
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Half-open overlap test against `[from, to)`.
    pub fn overlaps(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> bool {
        self.start < to && self.end > from
    }

    pub fn occurs_on(&self, day: NaiveDate) -> bool {
        match day.and_hms_opt(0, 0, 0) {
            Some(midnight) => {
                let from = midnight.and_utc();
                self.overlaps(from, from + Duration::days(1))
            }
            None => false,
        }
    }
}

/// Events touching `day`, ordered by start time.
pub fn events_on(events: &[CalendarEvent], day: NaiveDate) -> Vec<&CalendarEvent> {
    let mut out: Vec<&CalendarEvent> = events.iter().filter(|e| e.occurs_on(day)).collect();
    out.sort_by_key(|e| e.start);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_from_task_creates_all_day_event() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        let mut task = Task::new("u1", "Essay due", now);
        task.id = "t1".into();
        task.due_date = Some(Utc.with_ymd_and_hms(2024, 5, 3, 17, 30, 0).unwrap());

        let event = CalendarEvent::from_task(&task).unwrap();
        assert!(event.all_day);
        assert_eq!(event.start, Utc.with_ymd_and_hms(2024, 5, 3, 0, 0, 0).unwrap());
        assert_eq!(event.duration(), Duration::days(1));
        assert_eq!(event.task_id.as_deref(), Some("t1"));

        task.due_date = None;
        assert!(CalendarEvent::from_task(&task).is_none());
    }

    #[test]
    fn test_events_on_day() {
        let day = NaiveDate::from_ymd_opt(2024, 5, 3).unwrap();
        let make = |title: &str, h: u32, len: i64| CalendarEvent {
            id: String::new(),
            user_id: "u1".into(),
            title: title.into(),
            description: None,
            start: Utc.with_ymd_and_hms(2024, 5, 3, h, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2024, 5, 3, h, 0, 0).unwrap() + Duration::hours(len),
            all_day: false,
            location: None,
            task_id: None,
            source: EventSource::Manual,
            external_id: None,
        };
        let events = vec![make("lecture", 14, 2), make("gym", 8, 1), make("late", 23, 3)];
        let titles: Vec<&str> = events_on(&events, day).iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["gym", "lecture", "late"]);

        let next_day = day.succ_opt().unwrap();
        assert_eq!(events_on(&events, next_day).len(), 1);
    }
}
