//! Session clock - elapsed challenge time and its state machine.
//!
//! The clock owns nothing but state; it is advanced exactly once per
//! scheduling tick and never reads wall time, so ticks skipped by the
//! host cannot fast-forward the elapsed count.

use serde::{Deserialize, Serialize};

/// Lifecycle state of the session clock.
///
/// "Completed" is not a clock state; the coordinator latches completion
/// separately and stops the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockState {
    /// No session in progress.
    Inactive,
    /// Session in progress, elapsed time advancing.
    Running,
    /// Session in progress, elapsed time frozen.
    Paused,
}

/// The shared session clock.
#[derive(Debug, Clone)]
pub struct SessionClock {
    state: ClockState,
    elapsed_seconds: u64,
}

impl Default for SessionClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionClock {
    /// Create an inactive clock at zero.
    pub fn new() -> Self {
        Self {
            state: ClockState::Inactive,
            elapsed_seconds: 0,
        }
    }

    /// Current state.
    pub fn state(&self) -> ClockState {
        self.state
    }

    /// Seconds elapsed while running.
    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed_seconds
    }

    /// True while a session is in progress, paused or not.
    pub fn is_active(&self) -> bool {
        self.state != ClockState::Inactive
    }

    /// Start a new session: `Inactive -> Running`, elapsed reset to zero.
    ///
    /// No-op unless inactive; an already-running session is not restarted.
    /// Returns whether the transition happened.
    pub fn start(&mut self) -> bool {
        if self.state != ClockState::Inactive {
            return false;
        }
        self.state = ClockState::Running;
        self.elapsed_seconds = 0;
        true
    }

    /// `Running -> Paused`. No-op otherwise.
    pub fn pause(&mut self) -> bool {
        if self.state != ClockState::Running {
            return false;
        }
        self.state = ClockState::Paused;
        true
    }

    /// `Paused -> Running`. No-op otherwise.
    pub fn resume(&mut self) -> bool {
        if self.state != ClockState::Paused {
            return false;
        }
        self.state = ClockState::Running;
        true
    }

    /// Any state `-> Inactive`. Elapsed time is kept so the final time
    /// stays displayable until the next `start()` resets it.
    pub fn stop(&mut self) {
        self.state = ClockState::Inactive;
    }

    /// Any state `-> Inactive`, elapsed time zeroed.
    pub fn reset(&mut self) {
        self.state = ClockState::Inactive;
        self.elapsed_seconds = 0;
    }

    /// Advance by one second if running. The only scheduler-driven mutation.
    pub fn tick(&mut self) {
        if self.state == ClockState::Running {
            self.elapsed_seconds += 1;
        }
    }

    /// Elapsed time in `MM:SS` / `H:MM:SS` form.
    pub fn formatted(&self) -> String {
        format_elapsed(self.elapsed_seconds)
    }

    /// Restore from persisted state. A snapshot taken while running is
    /// coerced to paused: real time elapsed during downtime is unknown
    /// and must not be double-counted.
    pub fn restore(&mut self, state: ClockState, elapsed_seconds: u64) {
        self.elapsed_seconds = elapsed_seconds;
        self.state = match state {
            ClockState::Running => ClockState::Paused,
            other => other,
        };
    }
}

/// Format an elapsed-seconds count as `MM:SS`, with an hours column only
/// when nonzero.
pub fn format_elapsed(elapsed_seconds: u64) -> String {
    let hours = elapsed_seconds / 3600;
    let minutes = (elapsed_seconds % 3600) / 60;
    let seconds = elapsed_seconds % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

/// Long-form rendering for broadcast text, e.g. "2 hours 5 minutes 1 second".
pub fn detailed_elapsed(elapsed_seconds: u64) -> String {
    let hours = elapsed_seconds / 3600;
    let minutes = (elapsed_seconds % 3600) / 60;
    let seconds = elapsed_seconds % 60;

    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{} hour{} ", hours, if hours == 1 { "" } else { "s" }));
    }
    if minutes > 0 || hours > 0 {
        out.push_str(&format!(
            "{} minute{} ",
            minutes,
            if minutes == 1 { "" } else { "s" }
        ));
    }
    out.push_str(&format!(
        "{} second{}",
        seconds,
        if seconds == 1 { "" } else { "s" }
    ));
    out
}
