//! The Pomodoro session state machine.
//!
//! `PomodoroTimer` is synchronous and clock-free: the owner calls [`tick`]
//! once per second and each command returns the [`TimerEvent`]s it caused.
//! Side effects (recording, notifications, auto-start scheduling) belong to
//! whoever drives the machine.
//!
//! [`tick`]: PomodoroTimer::tick

use super::{PomodoroRuntimeState, PomodoroSettings, SessionType, SettingsError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerEvent {
    /// A fresh session began counting down (not a resume).
    SessionStarted {
        session_type: SessionType,
        duration_minutes: u32,
    },
    Paused,
    Resumed,
    /// An active session was abandoned.
    SessionStopped {
        session_type: SessionType,
        elapsed_seconds: u32,
    },
    /// A session ended by reaching zero or by skip.
    SessionCompleted {
        session_type: SessionType,
        skipped: bool,
        /// Whether the session had been started before it ended.
        was_active: bool,
        elapsed_seconds: u32,
    },
    Transitioned {
        from: SessionType,
        to: SessionType,
        session_count: u32,
    },
    /// The new session should be started after the auto-start delay.
    AutoStartScheduled { session_type: SessionType },
}

#[derive(Debug, Clone)]
pub struct PomodoroTimer {
    settings: PomodoroSettings,
    state: PomodoroRuntimeState,
    /// Full length of the current session, fixed when it was last reset.
    session_length_seconds: u32,
}

impl PomodoroTimer {
    pub fn new(settings: PomodoroSettings) -> Result<Self, SettingsError> {
        settings.validate()?;
        let state = PomodoroRuntimeState::new(&settings);
        Ok(Self {
            settings,
            session_length_seconds: state.time_left_seconds,
            state,
        })
    }

    pub fn snapshot(&self) -> PomodoroRuntimeState {
        self.state
    }

    pub fn settings(&self) -> &PomodoroSettings {
        &self.settings
    }

    /// Length of the session currently on the clock.
    pub fn session_length_seconds(&self) -> u32 {
        self.session_length_seconds
    }

    /// Start a fresh session, or resume a paused one.
    pub fn start(&mut self) -> Vec<TimerEvent> {
        if self.state.is_active {
            return self.resume();
        }
        self.state.is_active = true;
        self.state.is_paused = false;
        vec![TimerEvent::SessionStarted {
            session_type: self.state.session_type,
            duration_minutes: self.session_length_seconds / 60,
        }]
    }

    pub fn resume(&mut self) -> Vec<TimerEvent> {
        if !self.state.is_active {
            return self.start();
        }
        if !self.state.is_paused {
            return Vec::new();
        }
        self.state.is_paused = false;
        vec![TimerEvent::Resumed]
    }

    /// Toggle pause. Does nothing when no session is active.
    pub fn pause(&mut self) -> Vec<TimerEvent> {
        if !self.state.is_active {
            return Vec::new();
        }
        self.state.is_paused = !self.state.is_paused;
        if self.state.is_paused {
            vec![TimerEvent::Paused]
        } else {
            vec![TimerEvent::Resumed]
        }
    }

    /// Abandon the session and reset the countdown to its full duration.
    pub fn stop(&mut self) -> Vec<TimerEvent> {
        let was_active = self.state.is_active;
        let elapsed_seconds = self.elapsed_seconds();

        self.state.is_active = false;
        self.state.is_paused = false;
        self.reset_countdown();

        if was_active {
            vec![TimerEvent::SessionStopped {
                session_type: self.state.session_type,
                elapsed_seconds,
            }]
        } else {
            Vec::new()
        }
    }

    /// End the current session now, exactly as if it had reached zero.
    pub fn skip(&mut self) -> Vec<TimerEvent> {
        self.complete(true)
    }

    /// Advance the countdown by one second.
    pub fn tick(&mut self) -> Vec<TimerEvent> {
        if !self.state.is_running() {
            return Vec::new();
        }
        self.state.time_left_seconds = self.state.time_left_seconds.saturating_sub(1);
        if self.state.time_left_seconds == 0 {
            self.complete(false)
        } else {
            Vec::new()
        }
    }

    /// Replace the settings.
    ///
    /// An idle countdown picks up the new duration immediately. A running or
    /// paused session keeps its current countdown; the change applies from
    /// the next transition.
    pub fn update_settings(&mut self, settings: PomodoroSettings) -> Result<(), SettingsError> {
        settings.validate()?;
        self.settings = settings;
        if !self.state.is_active {
            self.reset_countdown();
        }
        Ok(())
    }

    fn elapsed_seconds(&self) -> u32 {
        self.session_length_seconds
            .saturating_sub(self.state.time_left_seconds)
    }

    fn reset_countdown(&mut self) {
        self.session_length_seconds = self.settings.duration_seconds(self.state.session_type);
        self.state.time_left_seconds = self.session_length_seconds;
    }

    fn complete(&mut self, skipped: bool) -> Vec<TimerEvent> {
        let from = self.state.session_type;
        let mut events = vec![TimerEvent::SessionCompleted {
            session_type: from,
            skipped,
            was_active: self.state.is_active,
            elapsed_seconds: self.elapsed_seconds(),
        }];

        let to = match from {
            SessionType::Work => {
                self.state.session_count += 1;
                if self.state.session_count % self.settings.sessions_until_long_break == 0 {
                    SessionType::LongBreak
                } else {
                    SessionType::ShortBreak
                }
            }
            SessionType::ShortBreak | SessionType::LongBreak => SessionType::Work,
        };

        self.state.session_type = to;
        self.state.is_active = false;
        self.state.is_paused = false;
        self.reset_countdown();

        events.push(TimerEvent::Transitioned {
            from,
            to,
            session_count: self.state.session_count,
        });
        if self.settings.auto_starts(to) {
            events.push(TimerEvent::AutoStartScheduled { session_type: to });
        }
        events
    }
}
