//! Productivity analytics over recorded sessions and tasks.

use std::collections::{BTreeMap, HashSet};

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::cache::{cache_key, CacheCategory};
use crate::data::DataService;
use crate::models::{PomodoroSessionRecord, SessionStatus, Task};
use crate::store::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct DailyFocus {
    pub date: NaiveDate,
    pub minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct ProductivitySummary {
    pub total_focus_minutes: u32,
    pub completed_work_sessions: u32,
    pub skipped_sessions: u32,
    pub stopped_sessions: u32,
    /// Completed tasks over all tasks, 0.0 when there are none.
    pub task_completion_rate: f64,
    /// Consecutive days, ending today or yesterday, with a completed work
    /// session.
    pub current_streak_days: u32,
    pub last_seven_days: Vec<DailyFocus>,
}

fn is_completed_focus(record: &PomodoroSessionRecord) -> bool {
    record.is_focus() && record.status == SessionStatus::Completed
}

/// Focus minutes per UTC day, from every work session including partial ones.
pub fn daily_focus_minutes(records: &[PomodoroSessionRecord]) -> BTreeMap<NaiveDate, u32> {
    let mut by_day = BTreeMap::new();
    for record in records.iter().filter(|r| r.is_focus()) {
        *by_day.entry(record.started_at.date_naive()).or_insert(0) += record.focus_minutes();
    }
    by_day
}

/// The seven days ending at `today`, oldest first, with zero-filled gaps.
pub fn weekly_focus(records: &[PomodoroSessionRecord], today: NaiveDate) -> Vec<DailyFocus> {
    let by_day = daily_focus_minutes(records);
    (0..7)
        .rev()
        .map(|offset| {
            let date = today - Duration::days(offset);
            DailyFocus {
                date,
                minutes: by_day.get(&date).copied().unwrap_or(0),
            }
        })
        .collect()
}

pub fn task_completion_rate(tasks: &[Task]) -> f64 {
    if tasks.is_empty() {
        return 0.0;
    }
    let done = tasks.iter().filter(|t| t.is_completed()).count();
    done as f64 / tasks.len() as f64
}

/// Days in a row with at least one completed work session. A streak still
/// counts if today has nothing yet but yesterday does.
pub fn current_streak(records: &[PomodoroSessionRecord], today: NaiveDate) -> u32 {
    let days: HashSet<NaiveDate> = records
        .iter()
        .filter(|r| is_completed_focus(r))
        .map(|r| r.started_at.date_naive())
        .collect();

    let mut day = if days.contains(&today) {
        today
    } else {
        today - Duration::days(1)
    };
    let mut streak = 0;
    while days.contains(&day) {
        streak += 1;
        day -= Duration::days(1);
    }
    streak
}

pub fn summarize(
    records: &[PomodoroSessionRecord],
    tasks: &[Task],
    today: NaiveDate,
) -> ProductivitySummary {
    let count = |status: SessionStatus| records.iter().filter(|r| r.status == status).count() as u32;

    ProductivitySummary {
        total_focus_minutes: records.iter().map(|r| r.focus_minutes()).sum(),
        completed_work_sessions: records.iter().filter(|r| is_completed_focus(r)).count() as u32,
        skipped_sessions: count(SessionStatus::Skipped),
        stopped_sessions: count(SessionStatus::Stopped),
        task_completion_rate: task_completion_rate(tasks),
        current_streak_days: current_streak(records, today),
        last_seven_days: weekly_focus(records, today),
    }
}

impl DataService {
    /// Summary for `uid` as of `today`, cached for the analytics TTL.
    pub async fn productivity_summary(
        &self,
        uid: &str,
        today: NaiveDate,
    ) -> Result<ProductivitySummary, StoreError> {
        let key = format!("{}_{}", cache_key(CacheCategory::Analytics, uid), today);
        self.cache()
            .cached_operation(&key, Some(CacheCategory::Analytics.default_ttl()), || {
                self.compute_summary(uid, today)
            })
            .await
    }

    async fn compute_summary(
        &self,
        uid: &str,
        today: NaiveDate,
    ) -> Result<ProductivitySummary, StoreError> {
        let records = self.list::<PomodoroSessionRecord>(uid).await?;
        let tasks = self.list::<Task>(uid).await?;
        Ok(summarize(&records, &tasks, today))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pomodoro::SessionType;
    use chrono::{TimeZone, Utc};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn session(d: u32, kind: SessionType, status: SessionStatus, minutes: u32) -> PomodoroSessionRecord {
        PomodoroSessionRecord {
            id: String::new(),
            user_id: "u1".into(),
            session_type: kind,
            started_at: Utc.with_ymd_and_hms(2024, 3, d, 9, 0, 0).unwrap(),
            ended_at: None,
            duration_minutes: 25,
            elapsed_seconds: minutes * 60,
            completed: status != SessionStatus::Stopped,
            status,
            task_id: None,
        }
    }

    #[test]
    fn test_daily_focus_ignores_breaks() {
        let records = vec![
            session(4, SessionType::Work, SessionStatus::Completed, 25),
            session(4, SessionType::ShortBreak, SessionStatus::Completed, 5),
            session(4, SessionType::Work, SessionStatus::Stopped, 10),
            session(5, SessionType::Work, SessionStatus::Completed, 25),
        ];
        let by_day = daily_focus_minutes(&records);
        assert_eq!(by_day.get(&day(4)), Some(&35));
        assert_eq!(by_day.get(&day(5)), Some(&25));

        let week = weekly_focus(&records, day(6));
        assert_eq!(week.len(), 7);
        assert_eq!(week[0].date, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert_eq!(week[4].minutes, 35);
        assert_eq!(week[6].minutes, 0);
    }

    #[test]
    fn test_streak_counts_back_from_yesterday() {
        let records = vec![
            session(3, SessionType::Work, SessionStatus::Completed, 25),
            session(4, SessionType::Work, SessionStatus::Completed, 25),
            session(5, SessionType::Work, SessionStatus::Completed, 25),
            // Stopped sessions do not extend a streak
            session(1, SessionType::Work, SessionStatus::Stopped, 25),
        ];
        assert_eq!(current_streak(&records, day(5)), 3);
        assert_eq!(current_streak(&records, day(6)), 3);
        assert_eq!(current_streak(&records, day(7)), 0);
    }

    #[test]
    fn test_summarize() {
        let records = vec![
            session(5, SessionType::Work, SessionStatus::Completed, 25),
            session(5, SessionType::Work, SessionStatus::Skipped, 3),
            session(5, SessionType::ShortBreak, SessionStatus::Stopped, 1),
        ];
        let now = Utc::now();
        let mut done = Task::new("u1", "done", now);
        done.toggle_completed(now);
        let tasks = vec![done, Task::new("u1", "open", now)];

        let summary = summarize(&records, &tasks, day(5));
        assert_eq!(summary.total_focus_minutes, 28);
        assert_eq!(summary.completed_work_sessions, 1);
        assert_eq!(summary.skipped_sessions, 1);
        assert_eq!(summary.stopped_sessions, 1);
        assert_eq!(summary.task_completion_rate, 0.5);
        assert_eq!(summary.current_streak_days, 1);
        assert_eq!(task_completion_rate(&[]), 0.0);
    }

    #[tokio::test]
    async fn test_summary_is_cached_until_sessions_change() {
        use crate::cache::CacheManager;
        use crate::store::InMemoryStore;
        use std::sync::Arc;

        let data = DataService::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(CacheManager::in_memory()),
        );
        let first = data.productivity_summary("u1", day(5)).await.unwrap();
        assert_eq!(first.completed_work_sessions, 0);

        data.create(&session(5, SessionType::Work, SessionStatus::Completed, 25))
            .await
            .unwrap();
        let second = data.productivity_summary("u1", day(5)).await.unwrap();
        assert_eq!(second.completed_work_sessions, 1);
        assert_eq!(second.current_streak_days, 1);
    }
}
