//! Async driver for [`PomodoroTimer`].
//!
//! The driver owns the machine on a tokio task: it ticks it once a second,
//! applies commands from a [`PomodoroHandle`], fires scheduled auto-starts
//! and publishes every new state on a `watch` channel. Dropping the handle
//! stops the task.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior, Sleep};
use tracing::debug;

use super::notifier::{completion_message, CompletionNotifier, NoopNotifier};
use super::recorder::SessionRecorder;
use super::{
    PomodoroRuntimeState, PomodoroSettings, PomodoroTimer, SessionType, SettingsError, TimerEvent,
};

const TICK: Duration = Duration::from_secs(1);

/// Pause between a transition and an auto-started session.
pub const AUTO_START_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq)]
pub enum TimerCommand {
    Start,
    Resume,
    Pause,
    Stop,
    Skip,
    UpdateSettings(PomodoroSettings),
    LinkTask(Option<String>),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    #[error("timer task has stopped")]
    Stopped,

    #[error("invalid settings: {0}")]
    InvalidSettings(#[from] SettingsError),
}

pub struct PomodoroDriver {
    timer: PomodoroTimer,
    recorder: Option<SessionRecorder>,
    notifier: Arc<dyn CompletionNotifier>,
}

impl PomodoroDriver {
    pub fn new(timer: PomodoroTimer) -> Self {
        Self {
            timer,
            recorder: None,
            notifier: Arc::new(NoopNotifier),
        }
    }

    pub fn with_recorder(mut self, recorder: SessionRecorder) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn CompletionNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Move the timer onto a background task. Must be called inside a tokio
    /// runtime.
    pub fn spawn(self) -> PomodoroHandle {
        let (commands, rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(self.timer.snapshot());
        let task = tokio::spawn(self.run(rx, state_tx));
        PomodoroHandle {
            commands,
            state: state_rx,
            task,
        }
    }

    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<TimerCommand>,
        state: watch::Sender<PomodoroRuntimeState>,
    ) {
        let mut ticker = interval_at(Instant::now() + TICK, TICK);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut auto_start: Option<Pin<Box<Sleep>>> = None;

        loop {
            let was_running = self.timer.snapshot().is_running();

            let events = tokio::select! {
                cmd = commands.recv() => {
                    let Some(cmd) = cmd else { break };
                    if matches!(
                        cmd,
                        TimerCommand::Start | TimerCommand::Resume | TimerCommand::Stop | TimerCommand::Skip
                    ) {
                        auto_start = None;
                    }
                    self.apply(cmd)
                }
                _ = ticker.tick() => self.timer.tick(),
                _ = wait_auto_start(&mut auto_start) => {
                    auto_start = None;
                    debug!("Auto-starting next session");
                    self.timer.start()
                }
            };

            // A session that just began running counts its first second
            // from now, not from the previous tick.
            if !was_running && self.timer.snapshot().is_running() {
                ticker.reset();
            }

            for event in &events {
                self.handle_event(event, &mut auto_start).await;
            }
            state.send_replace(self.timer.snapshot());
        }
        debug!("Pomodoro driver stopped");
    }

    fn apply(&mut self, cmd: TimerCommand) -> Vec<TimerEvent> {
        match cmd {
            TimerCommand::Start => self.timer.start(),
            TimerCommand::Resume => self.timer.resume(),
            TimerCommand::Pause => self.timer.pause(),
            TimerCommand::Stop => self.timer.stop(),
            TimerCommand::Skip => self.timer.skip(),
            TimerCommand::UpdateSettings(settings) => {
                // Validated by the handle before sending
                if let Err(e) = self.timer.update_settings(settings) {
                    debug!("Ignoring invalid settings: {}", e);
                }
                Vec::new()
            }
            TimerCommand::LinkTask(task_id) => {
                if let Some(recorder) = self.recorder.as_mut() {
                    recorder.link_task(task_id);
                }
                Vec::new()
            }
        }
    }

    async fn handle_event(&mut self, event: &TimerEvent, auto_start: &mut Option<Pin<Box<Sleep>>>) {
        if let Some(recorder) = self.recorder.as_mut() {
            recorder.record(event).await;
        }
        match event {
            TimerEvent::SessionCompleted { session_type, .. } => self.announce(*session_type),
            TimerEvent::AutoStartScheduled { .. } => {
                *auto_start = Some(Box::pin(sleep(AUTO_START_DELAY)));
            }
            _ => {}
        }
    }

    fn announce(&self, finished: SessionType) {
        if self.timer.settings().sound_enabled {
            if let Err(e) = self.notifier.play_sound() {
                debug!("Completion sound failed: {}", e);
            }
        }
        let (title, body) = completion_message(finished);
        if let Err(e) = self.notifier.notify(title, body) {
            debug!("Completion notification failed: {}", e);
        }
    }
}

async fn wait_auto_start(pending: &mut Option<Pin<Box<Sleep>>>) {
    match pending {
        Some(delay) => delay.as_mut().await,
        None => std::future::pending().await,
    }
}

/// Control surface for a running timer.
pub struct PomodoroHandle {
    commands: mpsc::UnboundedSender<TimerCommand>,
    state: watch::Receiver<PomodoroRuntimeState>,
    task: JoinHandle<()>,
}

impl PomodoroHandle {
    fn send(&self, cmd: TimerCommand) -> Result<(), DriverError> {
        self.commands.send(cmd).map_err(|_| DriverError::Stopped)
    }

    pub fn start(&self) -> Result<(), DriverError> {
        self.send(TimerCommand::Start)
    }

    pub fn resume(&self) -> Result<(), DriverError> {
        self.send(TimerCommand::Resume)
    }

    /// Toggle pause.
    pub fn pause(&self) -> Result<(), DriverError> {
        self.send(TimerCommand::Pause)
    }

    pub fn stop(&self) -> Result<(), DriverError> {
        self.send(TimerCommand::Stop)
    }

    pub fn skip(&self) -> Result<(), DriverError> {
        self.send(TimerCommand::Skip)
    }

    pub fn update_settings(&self, settings: PomodoroSettings) -> Result<(), DriverError> {
        settings.validate()?;
        self.send(TimerCommand::UpdateSettings(settings))
    }

    pub fn link_task(&self, task_id: Option<String>) -> Result<(), DriverError> {
        self.send(TimerCommand::LinkTask(task_id))
    }

    /// Latest published state.
    pub fn snapshot(&self) -> PomodoroRuntimeState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<PomodoroRuntimeState> {
        self.state.clone()
    }
}

impl Drop for PomodoroHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingNotifier {
        sounds: AtomicUsize,
        notifications: AtomicUsize,
    }

    impl CompletionNotifier for CountingNotifier {
        fn play_sound(&self) -> anyhow::Result<()> {
            self.sounds.fetch_add(1, Ordering::SeqCst);
            anyhow::bail!("autoplay blocked")
        }

        fn notify(&self, _title: &str, _body: &str) -> anyhow::Result<()> {
            self.notifications.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn spawn(settings: PomodoroSettings) -> PomodoroHandle {
        PomodoroDriver::new(PomodoroTimer::new(settings).unwrap()).spawn()
    }

    async fn settle() {
        // Let the driver task drain its queue
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_counts_down_once_per_second() {
        let handle = spawn(PomodoroSettings::default());
        handle.start().unwrap();
        settle().await;
        assert!(handle.snapshot().is_active);

        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(handle.snapshot().time_left_seconds, 1500 - 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_holds_countdown() {
        let handle = spawn(PomodoroSettings::default());
        handle.start().unwrap();
        tokio::time::sleep(Duration::from_millis(2500)).await;
        handle.pause().unwrap();
        settle().await;
        let paused_at = handle.snapshot().time_left_seconds;

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(handle.snapshot().time_left_seconds, paused_at);
        assert!(handle.snapshot().is_paused);
    }

    #[tokio::test(start_paused = true)]
    async fn test_natural_completion_auto_starts_break() {
        let notifier = Arc::new(CountingNotifier::default());
        let settings = PomodoroSettings {
            work_duration: 1,
            auto_start_breaks: true,
            ..Default::default()
        };
        let handle = PomodoroDriver::new(PomodoroTimer::new(settings).unwrap())
            .with_notifier(notifier.clone())
            .spawn();
        handle.start().unwrap();

        tokio::time::sleep(Duration::from_millis(60_500)).await;
        let s = handle.snapshot();
        assert_eq!(s.session_type, SessionType::ShortBreak);
        assert_eq!(s.session_count, 1);
        assert!(!s.is_active);

        // Failed sound does not block the notification or the transition
        assert_eq!(notifier.sounds.load(Ordering::SeqCst), 1);
        assert_eq!(notifier.notifications.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(handle.snapshot().is_active);
        assert_eq!(handle.snapshot().session_type, SessionType::ShortBreak);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_pending_auto_start() {
        let handle = spawn(PomodoroSettings {
            auto_start_breaks: true,
            ..Default::default()
        });
        handle.skip().unwrap();
        handle.stop().unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
        let s = handle.snapshot();
        assert_eq!(s.session_type, SessionType::ShortBreak);
        assert!(!s.is_active);
        assert_eq!(s.time_left_seconds, 300);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_settings_rejected_by_handle() {
        let handle = spawn(PomodoroSettings::default());
        let bad = PomodoroSettings {
            short_break_duration: 0,
            ..Default::default()
        };
        assert!(matches!(
            handle.update_settings(bad),
            Err(DriverError::InvalidSettings(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribers_see_updates() {
        let handle = spawn(PomodoroSettings::default());
        let mut rx = handle.subscribe();
        handle.skip().unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().session_type, SessionType::ShortBreak);
    }
}
