//! Application state management for TaskTide.
//!
//! This module contains the core `App` struct: UI state, the signed-in
//! user's workspace (data service, running timer, cache sweeper) and the
//! channel background loads report back on.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::Utc;
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use tasktide_core::analytics::ProductivitySummary;
use tasktide_core::auth::{AuthProvider, AuthUser, LocalAuthProvider};
use tasktide_core::cache::{
    CacheManager, CacheStats, FileStore, MemoryStore, PersistentStore, SweepReport, SweeperHandle,
};
use tasktide_core::clock::SystemClock;
use tasktide_core::config::USER_ENV;
use tasktide_core::models::{filter_and_sort, Priority, Task, TaskFilter, TaskSortColumn};
use tasktide_core::pomodoro::{
    DriverError, PomodoroDriver, PomodoroHandle, PomodoroRuntimeState, PomodoroSettings, PomodoroTimer,
    SessionRecorder, TerminalBell,
};
use tasktide_core::settings::{SettingsUpdate, UserSettings};
use tasktide_core::store::{DocumentStore, InMemoryStore, StoreError};
use tasktide_core::{Config, DataService};

// ============================================================================
// Constants
// ============================================================================

/// Buffer size for the background task message channel.
const CHANNEL_BUFFER_SIZE: usize = 32;

const MAX_TASK_TITLE_LENGTH: usize = 120;

const MAX_EMAIL_LENGTH: usize = 100;

const MAX_NAME_LENGTH: usize = 50;

/// Number of items to scroll on page up/down.
pub const PAGE_SCROLL_SIZE: usize = 10;

/// How often the cache screen re-reads entry counts.
const STATS_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// Document snapshot file in the data directory
const DOCUMENTS_FILE: &str = "documents.json";

/// Minutes added or removed per keypress when adjusting the focus length.
const WORK_DURATION_STEP: u32 = 5;

// ============================================================================
// UI State Types
// ============================================================================

/// Main navigation tabs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Timer,
    Tasks,
    Cache,
}

impl Tab {
    pub fn title(&self) -> &'static str {
        match self {
            Tab::Timer => "Timer",
            Tab::Tasks => "Tasks",
            Tab::Cache => "Cache",
        }
    }

    /// Get the next tab (wrapping around)
    pub fn next(&self) -> Self {
        match self {
            Tab::Timer => Tab::Tasks,
            Tab::Tasks => Tab::Cache,
            Tab::Cache => Tab::Timer,
        }
    }

    /// Get the previous tab (wrapping around)
    pub fn prev(&self) -> Self {
        match self {
            Tab::Timer => Tab::Cache,
            Tab::Tasks => Tab::Timer,
            Tab::Cache => Tab::Tasks,
        }
    }
}

/// Overall application state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Normal,
    Searching,
    AddingTask,
    ShowingHelp,
    SigningIn,
    ConfirmingQuit,
    Quitting,
}

/// Sign-in form focus state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SignInFocus {
    Email,
    Name,
    Button,
}

// ============================================================================
// Background Task Results
// ============================================================================

/// Results sent back from spawned loads and mutations.
enum BackgroundResult {
    Tasks(Vec<Task>),
    Summary(ProductivitySummary),
    Message(String),
    Error(String),
}

/// Everything that exists only while a user is signed in. Dropping it stops
/// the timer task and the cache sweeper.
pub struct Workspace {
    pub user: AuthUser,
    pub data: DataService,
    pub timer: PomodoroHandle,
    _sweeper: SweeperHandle,
}

impl Workspace {
    pub fn cache(&self) -> &Arc<CacheManager> {
        self.data.cache()
    }
}

// ============================================================================
// Main Application Struct
// ============================================================================

pub struct App {
    pub config: Config,
    auth: Arc<LocalAuthProvider>,
    store: Arc<dyn DocumentStore>,
    pub workspace: Option<Workspace>,

    // UI State
    pub state: AppState,
    pub current_tab: Tab,
    pub task_filter: TaskFilter,
    pub task_sort_column: TaskSortColumn,
    pub task_sort_ascending: bool,
    pub task_selection: usize,
    pub new_task_title: String,

    // Sign-in form state
    pub signin_email: String,
    pub signin_name: String,
    pub signin_focus: SignInFocus,
    pub signin_error: Option<String>,

    // Loaded data
    pub tasks: Vec<Task>,
    pub settings: UserSettings,
    pub summary: Option<ProductivitySummary>,
    pub timer_state: PomodoroRuntimeState,
    /// Title of the task the timer is linked to
    pub linked_task: Option<String>,

    // Cache diagnostics
    pub cache_stats: CacheStats,
    pub last_sweep: Option<SweepReport>,
    stats_refreshed_at: Option<Instant>,

    // Background task channel
    tx: mpsc::Sender<BackgroundResult>,
    rx: mpsc::Receiver<BackgroundResult>,

    pub status_message: Option<String>,
}

impl App {
    /// Create a new application instance, restoring a saved sign-in.
    pub async fn new(config: Config) -> Result<Self> {
        let data_dir = config.data_dir().unwrap_or_else(|_| PathBuf::from("./data"));
        debug!(?data_dir, "Data directory configured");

        let store: Arc<dyn DocumentStore> = match InMemoryStore::open(data_dir.join(DOCUMENTS_FILE)) {
            Ok(store) => Arc::new(store),
            Err(e) => {
                warn!(error = %e, "Failed to open document snapshot, starting empty");
                Arc::new(InMemoryStore::new())
            }
        };
        let auth = Arc::new(LocalAuthProvider::open(data_dir.join("auth")));

        let (tx, rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        let timer_state = PomodoroRuntimeState::new(&config.pomodoro);

        let mut app = Self {
            config,
            auth,
            store,
            workspace: None,

            state: AppState::Normal,
            current_tab: Tab::Timer,
            task_filter: TaskFilter::default(),
            task_sort_column: TaskSortColumn::default(),
            task_sort_ascending: true,
            task_selection: 0,
            new_task_title: String::new(),

            signin_email: String::new(),
            signin_name: String::new(),
            signin_focus: SignInFocus::Email,
            signin_error: None,

            tasks: Vec::new(),
            settings: UserSettings::default(),
            summary: None,
            timer_state,
            linked_task: None,

            cache_stats: CacheStats::default(),
            last_sweep: None,
            stats_refreshed_at: None,

            tx,
            rx,

            status_message: None,
        };

        // A uid in the environment skips sign-in entirely
        let user = match std::env::var(USER_ENV).ok().filter(|u| !u.trim().is_empty()) {
            Some(uid) => {
                info!(uid = %uid, "Using uid from environment");
                Some(AuthUser {
                    uid,
                    email: String::new(),
                    display_name: None,
                    email_verified: false,
                })
            }
            None => app.auth.current_user().await,
        };
        if let Some(user) = user {
            app.enter_workspace(user).await?;
        }

        Ok(app)
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    pub fn is_signed_in(&self) -> bool {
        self.workspace.is_some()
    }

    /// Show the sign-in overlay
    pub fn start_sign_in(&mut self) {
        self.state = AppState::SigningIn;
        self.signin_focus = SignInFocus::Email;
        self.signin_error = None;
    }

    pub async fn attempt_sign_in(&mut self) {
        let email = self.signin_email.trim().to_string();
        let name = self.signin_name.trim().to_string();
        if email.is_empty() {
            self.signin_error = Some("Email required".to_string());
            return;
        }

        let display_name = (!name.is_empty()).then_some(name.as_str());
        match self.auth.sign_in(&email, display_name).await {
            Ok(user) => {
                info!(uid = %user.uid, "Signed in");
                if let Err(e) = self.enter_workspace(user).await {
                    self.signin_error = Some(format!("Could not start timer: {}", e));
                    return;
                }
                self.signin_error = None;
                self.state = AppState::Normal;
            }
            Err(e) => {
                warn!(error = %e, "Sign-in failed");
                self.signin_error = Some(e.to_string());
            }
        }
    }

    pub async fn sign_out(&mut self) {
        if let Err(e) = self.auth.sign_out().await {
            warn!(error = %e, "Sign-out failed");
        }
        self.workspace = None;
        self.tasks.clear();
        self.summary = None;
        self.linked_task = None;
        self.cache_stats = CacheStats::default();
        self.last_sweep = None;
        self.config.last_uid = None;
        self.start_sign_in();
    }

    /// Build the per-user cache, data service and timer.
    async fn enter_workspace(&mut self, user: AuthUser) -> Result<()> {
        self.config.last_uid = Some(user.uid.clone());
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }

        let persistent: Arc<dyn PersistentStore> = match self
            .config
            .cache_dir()
            .and_then(|dir| Ok(FileStore::new(dir)?))
        {
            Ok(store) => match self.config.cache_quota_bytes {
                Some(quota) => Arc::new(store.with_quota(quota)),
                None => Arc::new(store),
            },
            Err(e) => {
                warn!(error = %e, "Cache directory unavailable, caching in memory only");
                Arc::new(MemoryStore::new())
            }
        };
        let cache = Arc::new(CacheManager::new(persistent));
        let sweeper = cache.spawn_sweeper(self.config.sweep_interval());
        let data = DataService::new(Arc::clone(&self.store), cache);

        self.settings = match data.load_settings(&user.uid).await {
            Ok(settings) => settings,
            Err(e) => {
                warn!(error = %e, "Failed to load settings, using device defaults");
                let mut settings = UserSettings::default();
                settings.productivity.pomodoro = self.config.pomodoro;
                settings
            }
        };

        let timer = PomodoroTimer::new(self.settings.productivity.pomodoro)
            .or_else(|e| {
                warn!(error = %e, "Stored timer settings invalid, using defaults");
                PomodoroTimer::new(PomodoroSettings::default())
            })?;
        self.timer_state = timer.snapshot();
        let recorder = SessionRecorder::new(data.clone(), Arc::new(SystemClock), user.uid.clone());
        let timer = PomodoroDriver::new(timer)
            .with_recorder(recorder)
            .with_notifier(Arc::new(TerminalBell))
            .spawn();

        self.workspace = Some(Workspace {
            user,
            data,
            timer,
            _sweeper: sweeper,
        });

        self.refresh_tasks();
        self.refresh_summary();
        self.refresh_cache_stats(true);
        Ok(())
    }

    /// Save config on the way out
    pub fn shutdown(&self) -> Result<()> {
        self.config.save()
    }

    // =========================================================================
    // Background Tasks
    // =========================================================================

    /// Load the task list through the cache
    pub fn refresh_tasks(&mut self) {
        let Some(ws) = self.workspace.as_ref() else {
            return;
        };
        let data = ws.data.clone();
        let uid = ws.user.uid.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = match data.list::<Task>(&uid).await {
                Ok(tasks) => BackgroundResult::Tasks(tasks),
                Err(e) => BackgroundResult::Error(format!("Failed to load tasks: {}", e)),
            };
            let _ = tx.send(result).await;
        });
    }

    /// Drop the cached task list and reload it
    pub fn force_refresh_tasks(&mut self) {
        if let Some(ws) = self.workspace.as_ref() {
            ws.data.invalidate::<Task>(&ws.user.uid);
            self.status_message = Some("Refreshing tasks...".to_string());
        }
        self.refresh_tasks();
    }

    pub fn refresh_summary(&mut self) {
        let Some(ws) = self.workspace.as_ref() else {
            return;
        };
        let data = ws.data.clone();
        let uid = ws.user.uid.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let today = Utc::now().date_naive();
            let result = match data.productivity_summary(&uid, today).await {
                Ok(summary) => BackgroundResult::Summary(summary),
                Err(e) => BackgroundResult::Error(format!("Failed to load analytics: {}", e)),
            };
            let _ = tx.send(result).await;
        });
    }

    /// Run a task mutation in the background, then reload the list.
    fn spawn_task_mutation<F, Fut>(&self, done: &'static str, mutation: F)
    where
        F: FnOnce(DataService, String) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), StoreError>> + Send + 'static,
    {
        let Some(ws) = self.workspace.as_ref() else {
            return;
        };
        let data = ws.data.clone();
        let uid = ws.user.uid.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            match mutation(data.clone(), uid.clone()).await {
                Ok(()) => {
                    let _ = tx.send(BackgroundResult::Message(done.to_string())).await;
                }
                Err(e) => {
                    let _ = tx.send(BackgroundResult::Error(format!("{}", e))).await;
                    return;
                }
            }
            if let Ok(tasks) = data.list::<Task>(&uid).await {
                let _ = tx.send(BackgroundResult::Tasks(tasks)).await;
            }
        });
    }

    /// Drain finished background work and refresh live state.
    pub fn check_background_tasks(&mut self) {
        let mut results = Vec::new();
        while let Ok(result) = self.rx.try_recv() {
            results.push(result);
        }
        for result in results {
            self.process_background_result(result);
        }

        if let Some(ws) = self.workspace.as_ref() {
            let snapshot = ws.timer.snapshot();
            let session_finished = snapshot.session_count != self.timer_state.session_count
                || snapshot.session_type != self.timer_state.session_type;
            self.timer_state = snapshot;
            if session_finished {
                self.refresh_summary();
            }
        }

        self.refresh_cache_stats(false);
    }

    fn process_background_result(&mut self, result: BackgroundResult) {
        match result {
            BackgroundResult::Tasks(tasks) => {
                self.tasks = tasks;
                let visible = self.get_sorted_tasks().len();
                if self.task_selection >= visible {
                    self.task_selection = visible.saturating_sub(1);
                }
                self.refresh_summary();
            }
            BackgroundResult::Summary(summary) => self.summary = Some(summary),
            BackgroundResult::Message(msg) => self.status_message = Some(msg),
            BackgroundResult::Error(msg) => {
                warn!("{}", msg);
                self.status_message = Some(msg);
            }
        }
    }

    // =========================================================================
    // Tasks
    // =========================================================================

    pub fn get_sorted_tasks(&self) -> Vec<&Task> {
        filter_and_sort(
            &self.tasks,
            &self.task_filter,
            self.task_sort_column,
            self.task_sort_ascending,
        )
    }

    pub fn selected_task(&self) -> Option<Task> {
        self.get_sorted_tasks()
            .get(self.task_selection)
            .map(|t| (*t).clone())
    }

    /// Toggle task sort column - if already sorting by this column, flip
    /// direction; otherwise switch to this column ascending.
    pub fn toggle_task_sort(&mut self, column: TaskSortColumn) {
        if self.task_sort_column == column {
            self.task_sort_ascending = !self.task_sort_ascending;
        } else {
            self.task_sort_column = column;
            self.task_sort_ascending = true;
        }
        self.task_selection = 0;
    }

    pub fn toggle_hide_completed(&mut self) {
        self.task_filter.hide_completed = !self.task_filter.hide_completed;
        self.task_selection = 0;
    }

    pub fn start_adding_task(&mut self) {
        self.new_task_title.clear();
        self.state = AppState::AddingTask;
    }

    pub fn submit_new_task(&mut self) {
        let title = self.new_task_title.trim().to_string();
        self.state = AppState::Normal;
        if title.is_empty() {
            return;
        }
        let Some(ws) = self.workspace.as_ref() else {
            return;
        };
        let task = Task::new(&ws.user.uid, &title, Utc::now());
        self.spawn_task_mutation("Task added", move |data, _uid| async move {
            data.create(&task).await.map(|_| ())
        });
        self.new_task_title.clear();
    }

    pub fn toggle_selected_task(&mut self) {
        let Some(mut task) = self.selected_task() else {
            return;
        };
        task.toggle_completed(Utc::now());
        let done = if task.is_completed() {
            "Task completed"
        } else {
            "Task reopened"
        };
        self.spawn_task_mutation(done, move |data, _uid| async move { data.save(&task).await });
    }

    pub fn cycle_selected_priority(&mut self) {
        let Some(task) = self.selected_task() else {
            return;
        };
        let next = match task.priority {
            Priority::Low => Priority::Medium,
            Priority::Medium => Priority::High,
            Priority::High => Priority::Low,
        };
        self.spawn_task_mutation("Priority changed", move |data, uid| async move {
            data.update::<Task>(
                &uid,
                &task.id,
                json!({ "priority": next, "updatedAt": Utc::now() }),
            )
            .await
        });
    }

    pub fn delete_selected_task(&mut self) {
        let Some(task) = self.selected_task() else {
            return;
        };
        self.spawn_task_mutation("Task deleted", move |data, uid| async move {
            data.delete::<Task>(&uid, &task.id).await
        });
    }

    /// Link the selected task to the timer and start focusing on it.
    pub fn focus_selected_task(&mut self) {
        let Some(task) = self.selected_task() else {
            return;
        };
        let Some(ws) = self.workspace.as_ref() else {
            return;
        };
        let linked = ws
            .timer
            .link_task(Some(task.id.clone()))
            .and_then(|_| ws.timer.start());
        match linked {
            Ok(()) => {
                self.linked_task = Some(task.title);
                self.current_tab = Tab::Timer;
            }
            Err(e) => self.status_message = Some(e.to_string()),
        }
    }

    // =========================================================================
    // Timer
    // =========================================================================

    fn with_timer(&mut self, f: impl FnOnce(&PomodoroHandle) -> Result<(), DriverError>) {
        let Some(ws) = self.workspace.as_ref() else {
            return;
        };
        if let Err(e) = f(&ws.timer) {
            warn!(error = %e, "Timer command failed");
            self.status_message = Some(e.to_string());
        }
    }

    pub fn timer_start(&mut self) {
        self.with_timer(|t| t.start());
    }

    pub fn timer_resume(&mut self) {
        self.with_timer(|t| t.resume());
    }

    pub fn timer_pause(&mut self) {
        self.with_timer(|t| t.pause());
    }

    pub fn timer_stop(&mut self) {
        self.with_timer(|t| t.stop());
    }

    pub fn timer_skip(&mut self) {
        self.with_timer(|t| t.skip());
    }

    pub fn unlink_task(&mut self) {
        self.linked_task = None;
        self.with_timer(|t| t.link_task(None));
    }

    pub fn timer_settings(&self) -> PomodoroSettings {
        self.settings.productivity.pomodoro
    }

    pub fn adjust_work_duration(&mut self, increase: bool) {
        let mut pomodoro = self.timer_settings();
        pomodoro.work_duration = if increase {
            pomodoro.work_duration + WORK_DURATION_STEP
        } else {
            pomodoro
                .work_duration
                .saturating_sub(WORK_DURATION_STEP)
                .max(WORK_DURATION_STEP)
        };
        self.apply_timer_settings(pomodoro);
    }

    pub fn toggle_auto_start_breaks(&mut self) {
        let mut pomodoro = self.timer_settings();
        pomodoro.auto_start_breaks = !pomodoro.auto_start_breaks;
        self.apply_timer_settings(pomodoro);
    }

    pub fn toggle_auto_start_work(&mut self) {
        let mut pomodoro = self.timer_settings();
        pomodoro.auto_start_work = !pomodoro.auto_start_work;
        self.apply_timer_settings(pomodoro);
    }

    pub fn toggle_sound(&mut self) {
        let mut pomodoro = self.timer_settings();
        pomodoro.sound_enabled = !pomodoro.sound_enabled;
        self.apply_timer_settings(pomodoro);
    }

    /// Validate, apply to the running timer and persist new timer settings.
    fn apply_timer_settings(&mut self, pomodoro: PomodoroSettings) {
        if let Err(e) = self.settings.apply(SettingsUpdate::Pomodoro(pomodoro)) {
            self.status_message = Some(e.to_string());
            return;
        }
        self.config.pomodoro = pomodoro;
        self.with_timer(|t| t.update_settings(pomodoro));

        let Some(ws) = self.workspace.as_ref() else {
            return;
        };
        let data = ws.data.clone();
        let uid = ws.user.uid.clone();
        let settings = self.settings.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            if let Err(e) = data.save_settings(&uid, &settings).await {
                let _ = tx
                    .send(BackgroundResult::Error(format!("Failed to save settings: {}", e)))
                    .await;
            }
        });
    }

    // =========================================================================
    // Cache Diagnostics
    // =========================================================================

    fn refresh_cache_stats(&mut self, force: bool) {
        let due = self
            .stats_refreshed_at
            .map_or(true, |at| at.elapsed() >= STATS_REFRESH_INTERVAL);
        if !(force || due) {
            return;
        }
        if let Some(ws) = self.workspace.as_ref() {
            self.cache_stats = ws.cache().stats();
            self.stats_refreshed_at = Some(Instant::now());
        }
    }

    /// Sweep expired entries now instead of waiting for the sweeper.
    pub fn sweep_cache(&mut self) {
        let Some(ws) = self.workspace.as_ref() else {
            return;
        };
        let report = ws.cache().clear_expired();
        self.status_message = Some(format!("Swept {} cache entries", report.total()));
        self.last_sweep = Some(report);
        self.refresh_cache_stats(true);
    }

    pub fn clear_cache(&mut self) {
        let Some(ws) = self.workspace.as_ref() else {
            return;
        };
        ws.cache().clear();
        info!("Cache cleared from diagnostics screen");
        self.status_message = Some("Cache cleared".to_string());
        self.refresh_cache_stats(true);
    }
}

// ============================================================================
// Input Validation
// ============================================================================

fn is_valid_input_char(c: char) -> bool {
    !c.is_control()
}

pub fn can_add_title_char(current_len: usize, c: char) -> bool {
    current_len < MAX_TASK_TITLE_LENGTH && is_valid_input_char(c)
}

pub fn can_add_email_char(current_len: usize, c: char) -> bool {
    current_len < MAX_EMAIL_LENGTH && is_valid_input_char(c) && !c.is_whitespace()
}

pub fn can_add_name_char(current_len: usize, c: char) -> bool {
    current_len < MAX_NAME_LENGTH && is_valid_input_char(c)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tab_cycle_wraps() {
        assert_eq!(Tab::Timer.next(), Tab::Tasks);
        assert_eq!(Tab::Cache.next(), Tab::Timer);
        assert_eq!(Tab::Timer.prev(), Tab::Cache);
        for tab in [Tab::Timer, Tab::Tasks, Tab::Cache] {
            assert_eq!(tab.next().prev(), tab);
        }
    }

    #[test]
    fn test_input_char_limits() {
        assert!(can_add_title_char(0, 'a'));
        assert!(!can_add_title_char(MAX_TASK_TITLE_LENGTH, 'a'));
        assert!(!can_add_title_char(0, '\n'));
        assert!(can_add_email_char(0, '@'));
        assert!(!can_add_email_char(0, ' '));
        assert!(can_add_name_char(0, ' '));
    }
}
