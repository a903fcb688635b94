//! Threshold-driven logging state machine

use serde::Serialize;

/// Logger state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum LoggerState {
    /// Waiting for the trigger to rise above the threshold
    #[default]
    NotLogging,
    /// Appending one row per tick
    Logging,
    /// Stopped on request; the session is over
    StopLogging,
}

impl LoggerState {
    /// Status text reported on every evaluated tick
    pub fn label(self) -> &'static str {
        match self {
            LoggerState::NotLogging => "NOT LOGGING",
            LoggerState::Logging => "LOGGING",
            LoggerState::StopLogging => "STOP LOGGING",
        }
    }
}

/// What a tick evaluation asks the scheduler to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Below threshold while not logging
    Idle,
    /// Above threshold: append the record
    Log {
        /// Whether this tick moved the machine into `Logging`
        entered: bool,
    },
    /// Dropped below the exit level while logging: end the session
    Exit,
    /// No rule matched; nothing to do
    Hold,
    /// Stop requested: end the session and do not restart
    Stop,
}

impl Transition {
    /// Whether this transition ends the current session
    pub fn ends_session(self) -> bool {
        matches!(self, Transition::Exit | Transition::Stop)
    }
}

/// Logging state machine.
///
/// Rules are checked in a fixed order against the threshold value `T`:
///
/// 1. `trigger < T` while not logging: stay idle
/// 2. `trigger > T` in any state: log
/// 3. `trigger < 3T` while logging: exit
///
/// Anything else holds the current state. The exit level is deliberately
/// three times the entry level, so a logging session ends as soon as the
/// trigger drops below `3T` without first exceeding `T`.
#[derive(Debug, Clone, Default)]
pub struct StateMachine {
    state: LoggerState,
}

impl StateMachine {
    /// Create a machine in `NotLogging`
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state
    pub fn state(&self) -> LoggerState {
        self.state
    }

    /// Whether the machine is logging
    pub fn is_logging(&self) -> bool {
        self.state == LoggerState::Logging
    }

    /// Evaluate one tick
    pub fn evaluate(&mut self, trigger: i32, threshold_value: i32) -> Transition {
        let exit_level = 3 * i64::from(threshold_value);

        if trigger < threshold_value && self.state == LoggerState::NotLogging {
            Transition::Idle
        } else if trigger > threshold_value {
            let entered = self.state != LoggerState::Logging;
            self.state = LoggerState::Logging;
            Transition::Log { entered }
        } else if i64::from(trigger) < exit_level && self.state == LoggerState::Logging {
            self.state = LoggerState::NotLogging;
            Transition::Exit
        } else {
            Transition::Hold
        }
    }

    /// Enter `StopLogging`
    pub fn stop(&mut self) -> Transition {
        self.state = LoggerState::StopLogging;
        Transition::Stop
    }

    /// Return to `NotLogging` for a fresh session
    pub fn reset(&mut self) {
        self.state = LoggerState::NotLogging;
    }
}
