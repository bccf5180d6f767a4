use std::sync::Arc;

use serde_json::json;
use tracing::{debug, warn};

use super::TimerEvent;
use crate::clock::Clock;
use crate::data::DataService;
use crate::models::{PomodoroSessionRecord, SessionStatus};

/// Persists timer events as [`PomodoroSessionRecord`]s.
///
/// A record is created when a session starts and closed when it completes,
/// is skipped or is stopped. Store failures are logged and never reach the
/// timer.
pub struct SessionRecorder {
    data: DataService,
    clock: Arc<dyn Clock>,
    user_id: String,
    task_id: Option<String>,
    current: Option<String>,
}

impl SessionRecorder {
    pub fn new(data: DataService, clock: Arc<dyn Clock>, user_id: impl Into<String>) -> Self {
        Self {
            data,
            clock,
            user_id: user_id.into(),
            task_id: None,
            current: None,
        }
    }

    /// Link subsequent sessions to a task.
    pub fn link_task(&mut self, task_id: Option<String>) {
        self.task_id = task_id;
    }

    pub fn task_id(&self) -> Option<&str> {
        self.task_id.as_deref()
    }

    /// Id of the open record, if a session is in progress.
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub async fn record(&mut self, event: &TimerEvent) {
        match *event {
            TimerEvent::SessionStarted {
                session_type,
                duration_minutes,
            } => {
                let record = PomodoroSessionRecord {
                    id: String::new(),
                    user_id: self.user_id.clone(),
                    session_type,
                    started_at: self.clock.now(),
                    ended_at: None,
                    duration_minutes,
                    elapsed_seconds: 0,
                    completed: false,
                    status: SessionStatus::InProgress,
                    task_id: self.task_id.clone(),
                };
                match self.data.create(&record).await {
                    Ok(id) => {
                        debug!(id = %id, session = %session_type, "Session record opened");
                        self.current = Some(id);
                    }
                    Err(e) => warn!("Failed to record session start: {}", e),
                }
            }
            TimerEvent::SessionStopped {
                elapsed_seconds, ..
            } => {
                self.close(SessionStatus::Stopped, false, elapsed_seconds)
                    .await;
            }
            TimerEvent::SessionCompleted {
                skipped,
                elapsed_seconds,
                ..
            } => {
                let status = if skipped {
                    SessionStatus::Skipped
                } else {
                    SessionStatus::Completed
                };
                self.close(status, true, elapsed_seconds).await;
            }
            _ => {}
        }
    }

    async fn close(&mut self, status: SessionStatus, completed: bool, elapsed_seconds: u32) {
        let Some(id) = self.current.take() else {
            return;
        };
        let patch = json!({
            "endedAt": self.clock.now(),
            "elapsedSeconds": elapsed_seconds,
            "completed": completed,
            "status": status,
        });
        if let Err(e) = self
            .data
            .update::<PomodoroSessionRecord>(&self.user_id, &id, patch)
            .await
        {
            warn!("Failed to close session record {}: {}", id, e);
        }
    }
}
