use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Default time-to-live when the caller does not pick one.
pub const DEFAULT_TTL_MINUTES: i64 = 5;

/// A cached value with its write time and absolute expiry, both epoch ms.
///
/// This is also the JSON shape stored in the persistent tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub data: T,
    pub timestamp: i64,
    pub expiry: i64,
}

impl<T> CacheEntry<T> {
    pub fn new(data: T, now_millis: i64, ttl: Duration) -> Self {
        Self {
            data,
            timestamp: now_millis,
            expiry: now_millis.saturating_add(ttl.num_milliseconds()),
        }
    }

    /// An entry is expired once the clock reaches its expiry.
    pub fn is_expired(&self, now_millis: i64) -> bool {
        now_millis >= self.expiry
    }

    pub fn age_millis(&self, now_millis: i64) -> i64 {
        (now_millis - self.timestamp).max(0)
    }
}

/// Data categories with their default TTLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheCategory {
    Tasks,
    Grades,
    StudyMaterials,
    CalendarEvents,
    PomodoroSessions,
    Analytics,
    UserProfile,
    Settings,
    AiResponses,
}

impl CacheCategory {
    pub const ALL: [CacheCategory; 9] = [
        CacheCategory::Tasks,
        CacheCategory::Grades,
        CacheCategory::StudyMaterials,
        CacheCategory::CalendarEvents,
        CacheCategory::PomodoroSessions,
        CacheCategory::Analytics,
        CacheCategory::UserProfile,
        CacheCategory::Settings,
        CacheCategory::AiResponses,
    ];

    /// Key prefix used for this category.
    pub fn prefix(&self) -> &'static str {
        match self {
            CacheCategory::Tasks => "tasks",
            CacheCategory::Grades => "grades",
            CacheCategory::StudyMaterials => "materials",
            CacheCategory::CalendarEvents => "events",
            CacheCategory::PomodoroSessions => "pomodoro",
            CacheCategory::Analytics => "analytics",
            CacheCategory::UserProfile => "profile",
            CacheCategory::Settings => "settings",
            CacheCategory::AiResponses => "ai",
        }
    }

    pub fn default_ttl(&self) -> Duration {
        match self {
            CacheCategory::Tasks => Duration::minutes(5),
            CacheCategory::Grades => Duration::minutes(10),
            CacheCategory::StudyMaterials => Duration::minutes(15),
            CacheCategory::CalendarEvents => Duration::minutes(10),
            CacheCategory::PomodoroSessions => Duration::minutes(5),
            CacheCategory::Analytics => Duration::minutes(30),
            CacheCategory::UserProfile => Duration::minutes(30),
            CacheCategory::Settings => Duration::minutes(60),
            CacheCategory::AiResponses => Duration::hours(24),
        }
    }
}

/// Build a user-namespaced cache key, e.g. `tasks_u1`.
pub fn cache_key(category: CacheCategory, uid: &str) -> String {
    format!("{}_{}", category.prefix(), uid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_expiry_boundary() {
        let entry = CacheEntry::new("x", 1_000, Duration::milliseconds(500));
        assert_eq!(entry.expiry, 1_500);
        assert!(!entry.is_expired(1_499));
        assert!(entry.is_expired(1_500));
        assert!(entry.is_expired(2_000));
    }

    #[test]
    fn test_entry_json_shape() {
        let entry = CacheEntry::new(vec![1, 2], 10, Duration::milliseconds(5));
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "data": [1, 2], "timestamp": 10, "expiry": 15 })
        );
    }

    #[test]
    fn test_cache_key_is_namespaced_by_uid() {
        assert_eq!(cache_key(CacheCategory::Tasks, "u1"), "tasks_u1");
        assert_eq!(cache_key(CacheCategory::StudyMaterials, "u2"), "materials_u2");
    }

    #[test]
    fn test_category_ttls() {
        assert_eq!(CacheCategory::Tasks.default_ttl(), Duration::minutes(5));
        assert!(CacheCategory::AiResponses.default_ttl() > CacheCategory::Settings.default_ttl());
    }
}
