//! Data models for TaskTide records.
//!
//! Every record is a flat document owned by exactly one user id and stored
//! in the external document store under camelCase field names:
//!
//! - `Task`: to-dos with priority, status and due date
//! - `Grade`: scored assessments grouped by course
//! - `StudyMaterial`: notes, links and files tagged by subject
//! - `CalendarEvent`: manual, task-derived and synced events
//! - `PomodoroSessionRecord`: completed, skipped or stopped timer sessions

pub mod event;
pub mod grade;
pub mod material;
pub mod session;
pub mod task;

pub use event::{events_on, CalendarEvent, EventSource};
pub use grade::{course_summaries, gpa, letter_grade, weighted_average, AssessmentKind, CourseSummary, Grade};
pub use material::{subjects, MaterialKind, StudyMaterial};
pub use session::{PomodoroSessionRecord, SessionStatus};
pub use task::{filter_and_sort, Priority, Task, TaskFilter, TaskSortColumn, TaskStatus};
