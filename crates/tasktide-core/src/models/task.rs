use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::{cmp_ignore_case, contains_ignore_case};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::Low => write!(f, "Low"),
            Priority::Medium => write!(f, "Medium"),
            Priority::High => write!(f, "High"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Completed,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Todo => write!(f, "To Do"),
            TaskStatus::InProgress => write!(f, "In Progress"),
            TaskStatus::Completed => write!(f, "Completed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(default)]
    pub id: String,
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn new(user_id: &str, title: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: String::new(),
            user_id: user_id.to_string(),
            title: title.to_string(),
            description: None,
            subject: None,
            due_date: None,
            priority: Priority::default(),
            status: TaskStatus::default(),
            created_at: now,
            updated_at: None,
            completed_at: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.is_completed() && self.due_date.is_some_and(|due| due < now)
    }

    /// Flip between completed and to-do, stamping the completion time.
    pub fn toggle_completed(&mut self, now: DateTime<Utc>) {
        if self.is_completed() {
            self.status = TaskStatus::Todo;
            self.completed_at = None;
        } else {
            self.status = TaskStatus::Completed;
            self.completed_at = Some(now);
        }
        self.updated_at = Some(now);
    }

    fn matches_search(&self, query: &str) -> bool {
        contains_ignore_case(&self.title, query)
            || self
                .description
                .as_deref()
                .is_some_and(|d| contains_ignore_case(d, query))
            || self
                .subject
                .as_deref()
                .is_some_and(|s| contains_ignore_case(s, query))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TaskSortColumn {
    #[default]
    DueDate,
    Priority,
    Title,
    Created,
}

impl TaskSortColumn {
    pub fn next(&self) -> Self {
        match self {
            TaskSortColumn::DueDate => TaskSortColumn::Priority,
            TaskSortColumn::Priority => TaskSortColumn::Title,
            TaskSortColumn::Title => TaskSortColumn::Created,
            TaskSortColumn::Created => TaskSortColumn::DueDate,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TaskSortColumn::DueDate => "Due",
            TaskSortColumn::Priority => "Priority",
            TaskSortColumn::Title => "Title",
            TaskSortColumn::Created => "Created",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub subject: Option<String>,
    pub search: String,
    pub hide_completed: bool,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        if self.hide_completed && task.is_completed() {
            return false;
        }
        if self.status.is_some_and(|s| s != task.status) {
            return false;
        }
        if self.priority.is_some_and(|p| p != task.priority) {
            return false;
        }
        if let Some(ref subject) = self.subject {
            let same = task
                .subject
                .as_deref()
                .is_some_and(|s| s.eq_ignore_ascii_case(subject));
            if !same {
                return false;
            }
        }
        self.search.is_empty() || task.matches_search(&self.search.to_lowercase())
    }
}

/// Filter and sort tasks for display. Tasks without a due date sort last
/// when ordering by due date ascending.
pub fn filter_and_sort<'a>(
    tasks: &'a [Task],
    filter: &TaskFilter,
    column: TaskSortColumn,
    ascending: bool,
) -> Vec<&'a Task> {
    let mut sorted: Vec<&Task> = tasks.iter().filter(|t| filter.matches(t)).collect();

    sorted.sort_by(|a, b| {
        let title_cmp = || cmp_ignore_case(&a.title, &b.title);
        let cmp = match column {
            TaskSortColumn::DueDate => match (a.due_date, b.due_date) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            }
            .then_with(title_cmp),
            // Highest priority first when ascending
            TaskSortColumn::Priority => b.priority.cmp(&a.priority).then_with(title_cmp),
            TaskSortColumn::Title => title_cmp(),
            TaskSortColumn::Created => a.created_at.cmp(&b.created_at),
        };
        if ascending {
            cmp
        } else {
            cmp.reverse()
        }
    });

    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn task(title: &str, priority: Priority, due_in_days: Option<i64>) -> Task {
        let now = Utc::now();
        let mut t = Task::new("u1", title, now);
        t.priority = priority;
        t.due_date = due_in_days.map(|d| now + Duration::days(d));
        t
    }

    #[test]
    fn test_sort_by_due_date_puts_undated_last() {
        let tasks = vec![
            task("no date", Priority::Low, None),
            task("later", Priority::Low, Some(5)),
            task("sooner", Priority::Low, Some(1)),
        ];
        let sorted = filter_and_sort(&tasks, &TaskFilter::default(), TaskSortColumn::DueDate, true);
        let titles: Vec<&str> = sorted.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["sooner", "later", "no date"]);
    }

    #[test]
    fn test_sort_by_priority_high_first() {
        let tasks = vec![
            task("b", Priority::Low, None),
            task("a", Priority::High, None),
            task("c", Priority::Medium, None),
        ];
        let sorted = filter_and_sort(&tasks, &TaskFilter::default(), TaskSortColumn::Priority, true);
        let titles: Vec<&str> = sorted.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "c", "b"]);
    }

    #[test]
    fn test_filter_search_and_completed() {
        let now = Utc::now();
        let mut essay = task("History essay", Priority::High, Some(2));
        essay.subject = Some("History".into());
        let mut lab = task("Lab report", Priority::Medium, Some(3));
        lab.toggle_completed(now);
        let tasks = vec![essay, lab];

        let filter = TaskFilter {
            search: "HIST".into(),
            ..Default::default()
        };
        assert_eq!(filter_and_sort(&tasks, &filter, TaskSortColumn::Title, true).len(), 1);

        let filter = TaskFilter {
            hide_completed: true,
            ..Default::default()
        };
        let visible = filter_and_sort(&tasks, &filter, TaskSortColumn::Title, true);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].title, "History essay");
    }

    #[test]
    fn test_overdue_and_toggle() {
        let now = Utc::now();
        let mut t = task("late", Priority::Low, Some(-1));
        assert!(t.is_overdue(now));
        t.toggle_completed(now);
        assert!(!t.is_overdue(now));
        assert_eq!(t.completed_at, Some(now));
        t.toggle_completed(now);
        assert_eq!(t.status, TaskStatus::Todo);
        assert_eq!(t.completed_at, None);
    }

    #[test]
    fn test_task_json_is_camel_case() {
        let t = Task::new("u1", "Read", Utc::now());
        let json = serde_json::to_value(&t).unwrap();
        assert_eq!(json["userId"], "u1");
        assert_eq!(json["status"], "todo");
        assert_eq!(json["priority"], "medium");
    }
}
