//! The pomodoro state machine.
//!
//! A run starts in the Work phase and alternates Work → Rest → Work until the
//! configured number of work phases has completed, then returns to idle. Every
//! finished or stopped phase produces exactly one [`SessionRecord`]. Time is
//! passed in by the caller so the machine never reads the clock itself.

use chrono::{DateTime, Local};
use thiserror::Error;
use tracing::{debug, info};

use crate::record::{SessionRecord, SessionType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum_macros::Display)]
pub enum TimerStatus {
    #[default]
    Idle,
    Running,
    Paused,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerSettings {
    pub module: String,
    pub work_minutes: u32,
    pub rest_minutes: u32,
    pub target_sessions: u32,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            module: String::new(),
            work_minutes: 25,
            rest_minutes: 5,
            target_sessions: 1,
        }
    }
}

impl TimerSettings {
    pub fn phase_seconds(&self, phase: SessionType) -> u32 {
        match phase {
            SessionType::Work => self.work_minutes * 60,
            SessionType::Rest => self.rest_minutes * 60,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    Start,
    Pause,
    Resume,
    TogglePause,
    Stop,
    Tick,
    Reset,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerError {
    #[error("Please enter or select a module.")]
    MissingModule,
    #[error("A session is already in progress.")]
    AlreadyActive,
    #[error("No session is in progress.")]
    NotActive,
}

/// A message for the status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Info(String),
    Success(String),
    Warning(String),
    Error(String),
}

impl Notice {
    pub fn text(&self) -> &str {
        match self {
            Notice::Info(s) | Notice::Success(s) | Notice::Warning(s) | Notice::Error(s) => s,
        }
    }
}

/// A phase that ran down to zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub record: SessionRecord,
    pub phase: SessionType,
    /// `None` once the last work phase of the run is done.
    pub next: Option<SessionType>,
}

/// Everything the shell has to act on after one event.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Transition {
    pub record: Option<SessionRecord>,
    pub notices: Vec<Notice>,
    /// Set on natural completion only; the shell rings the bell for it.
    pub completed: Option<Completion>,
}

#[derive(Debug, Clone, Default)]
pub struct Timer {
    settings: TimerSettings,
    status: TimerStatus,
    phase: SessionType,
    remaining_seconds: u32,
    completed_work_sessions: u32,
    started_at: Option<DateTime<Local>>,
}

impl Timer {
    pub fn new(settings: TimerSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn settings(&self) -> &TimerSettings {
        &self.settings
    }

    /// Settings can only change between runs.
    pub fn settings_mut(&mut self) -> Option<&mut TimerSettings> {
        if self.is_idle() {
            Some(&mut self.settings)
        } else {
            None
        }
    }

    pub fn status(&self) -> TimerStatus {
        self.status
    }

    pub fn phase(&self) -> SessionType {
        self.phase
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.remaining_seconds
    }

    pub fn completed_work_sessions(&self) -> u32 {
        self.completed_work_sessions
    }

    /// When `start` was pressed. Later phases of the same run keep it.
    pub fn started_at(&self) -> Option<DateTime<Local>> {
        self.started_at
    }

    pub fn is_idle(&self) -> bool {
        self.status == TimerStatus::Idle
    }

    pub fn is_running(&self) -> bool {
        self.status == TimerStatus::Running
    }

    pub fn is_paused(&self) -> bool {
        self.status == TimerStatus::Paused
    }

    /// Seconds shown on the clock: the live countdown, or the next phase's length when idle.
    pub fn display_seconds(&self) -> u32 {
        if self.is_idle() {
            self.settings.phase_seconds(self.phase)
        } else {
            self.remaining_seconds
        }
    }

    /// Fraction of the current phase already elapsed, in `0.0..=1.0`.
    pub fn progress(&self) -> f64 {
        let total = self.settings.phase_seconds(self.phase) as f64;
        if self.is_idle() || total <= 0.0 {
            return 0.0;
        }
        ((total - self.remaining_seconds as f64) / total).clamp(0.0, 1.0)
    }

    pub fn start(&mut self, now: DateTime<Local>) -> Result<(), TimerError> {
        if !self.is_idle() {
            return Err(TimerError::AlreadyActive);
        }
        if self.settings.module.trim().is_empty() {
            return Err(TimerError::MissingModule);
        }
        self.remaining_seconds = self.settings.phase_seconds(self.phase);
        self.status = TimerStatus::Running;
        self.started_at = Some(now);
        info!(
            module = %self.settings.module,
            phase = %self.phase,
            seconds = self.remaining_seconds,
            "timer started"
        );
        Ok(())
    }

    pub fn pause(&mut self) -> bool {
        if self.is_running() {
            self.status = TimerStatus::Paused;
            debug!(remaining = self.remaining_seconds, "timer paused");
            true
        } else {
            false
        }
    }

    pub fn resume(&mut self) -> bool {
        if self.is_paused() {
            self.status = TimerStatus::Running;
            debug!(remaining = self.remaining_seconds, "timer resumed");
            true
        } else {
            false
        }
    }

    /// End the current phase early and return its record.
    pub fn stop(&mut self, now: DateTime<Local>) -> Result<SessionRecord, TimerError> {
        if self.is_idle() {
            return Err(TimerError::NotActive);
        }
        let record = SessionRecord::new(
            self.settings.module.clone(),
            self.phase,
            self.elapsed_minutes(now),
            self.settings.target_sessions,
            now,
        );
        info!(phase = %self.phase, minutes = record.actual_minutes, "timer stopped early");
        self.reset();
        Ok(record)
    }

    /// Advance the countdown by one second.
    pub fn tick(&mut self, now: DateTime<Local>) -> Option<Completion> {
        if !self.is_running() {
            return None;
        }
        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        if self.remaining_seconds == 0 {
            Some(self.complete_phase(now))
        } else {
            None
        }
    }

    pub fn reset(&mut self) {
        self.status = TimerStatus::Idle;
        self.phase = SessionType::Work;
        self.remaining_seconds = 0;
        self.completed_work_sessions = 0;
        self.started_at = None;
    }

    pub fn handle_event(&mut self, event: TimerEvent, now: DateTime<Local>) -> Transition {
        let mut transition = Transition::default();
        match event {
            TimerEvent::Start => match self.start(now) {
                Ok(()) => transition.notices.push(Notice::Info(format!(
                    "{} session started for {}.",
                    self.phase, self.settings.module
                ))),
                Err(e) => transition.notices.push(Notice::Error(e.to_string())),
            },
            TimerEvent::Pause => {
                if self.pause() {
                    transition.notices.push(Notice::Info("Paused.".into()));
                }
            }
            TimerEvent::Resume => {
                if self.resume() {
                    transition.notices.push(Notice::Info("Resumed.".into()));
                }
            }
            TimerEvent::TogglePause => {
                let event = if self.is_paused() {
                    TimerEvent::Resume
                } else {
                    TimerEvent::Pause
                };
                return self.handle_event(event, now);
            }
            TimerEvent::Stop => match self.stop(now) {
                Ok(record) => {
                    transition.notices.push(Notice::Success(format!(
                        "Session stopped early. Actual time: {} minutes.",
                        record.actual_minutes
                    )));
                    transition.record = Some(record);
                }
                Err(e) => transition.notices.push(Notice::Warning(e.to_string())),
            },
            TimerEvent::Tick => {
                if let Some(completion) = self.tick(now) {
                    transition
                        .notices
                        .push(Notice::Success(format!("{} session completed!", completion.phase)));
                    if completion.next.is_none() {
                        transition
                            .notices
                            .push(Notice::Success("All work sessions completed!".into()));
                    }
                    transition.record = Some(completion.record.clone());
                    transition.completed = Some(completion);
                }
            }
            TimerEvent::Reset => {
                self.reset();
                transition.notices.push(Notice::Info("Timer reset.".into()));
            }
        }
        transition
    }

    fn elapsed_minutes(&self, now: DateTime<Local>) -> u32 {
        self.started_at
            .map(|start| (now - start).num_minutes().max(0) as u32)
            .unwrap_or(0)
    }

    fn begin_phase(&mut self, phase: SessionType) {
        self.phase = phase;
        self.remaining_seconds = self.settings.phase_seconds(phase);
    }

    fn complete_phase(&mut self, now: DateTime<Local>) -> Completion {
        let finished = self.phase;
        let module = self.settings.module.clone();
        let completion = match finished {
            SessionType::Work => {
                self.completed_work_sessions += 1;
                let record = SessionRecord::new(
                    module,
                    SessionType::Work,
                    self.elapsed_minutes(now),
                    self.completed_work_sessions,
                    now,
                );
                if self.completed_work_sessions < self.settings.target_sessions {
                    self.begin_phase(SessionType::Rest);
                    Completion {
                        record,
                        phase: finished,
                        next: Some(SessionType::Rest),
                    }
                } else {
                    self.reset();
                    Completion {
                        record,
                        phase: finished,
                        next: None,
                    }
                }
            }
            SessionType::Rest => {
                // Rest rows carry the work count so far; they do not add to it.
                let record = SessionRecord::new(
                    module,
                    SessionType::Rest,
                    self.settings.rest_minutes,
                    self.completed_work_sessions,
                    now,
                );
                self.begin_phase(SessionType::Work);
                Completion {
                    record,
                    phase: finished,
                    next: Some(SessionType::Work),
                }
            }
        };
        info!(
            phase = %completion.phase,
            next = ?completion.next,
            completed = self.completed_work_sessions,
            "phase completed"
        );
        completion
    }
}
