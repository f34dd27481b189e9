//! Stream watchdog state machine
//!
//! `Running -> Restarting -> Running | Stopped`. The transitions are pure;
//! the live-view client owns the timer and the sessions and asks the
//! watchdog what to do on every tick.

/// Watchdog state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogState {
    /// Watching a session; `last_seen` is its counter at the previous tick
    Running { last_seen: u64 },
    /// A replacement session is being brought up; ticks are ignored
    Restarting,
    /// Live view cancelled
    Stopped,
}

/// What the driver should do after a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogAction {
    Continue,
    /// Tear the session down and open a fresh one
    Restart,
    /// Exit the driver loop
    Halt,
}

#[derive(Debug, Clone)]
pub struct Watchdog {
    state: WatchdogState,
    restarts: u64,
}

impl Watchdog {
    pub fn new() -> Self {
        Self {
            state: WatchdogState::Running { last_seen: 0 },
            restarts: 0,
        }
    }

    pub fn state(&self) -> WatchdogState {
        self.state
    }

    /// Number of restarts requested so far
    pub fn restarts(&self) -> u64 {
        self.restarts
    }

    /// Compare the session's decoded-frame counter with the previous tick
    pub fn on_tick(&mut self, produced: u64) -> WatchdogAction {
        match self.state {
            WatchdogState::Running { last_seen } if produced == last_seen => {
                self.state = WatchdogState::Restarting;
                self.restarts += 1;
                WatchdogAction::Restart
            }
            WatchdogState::Running { .. } => {
                self.state = WatchdogState::Running { last_seen: produced };
                WatchdogAction::Continue
            }
            WatchdogState::Restarting => WatchdogAction::Continue,
            WatchdogState::Stopped => WatchdogAction::Halt,
        }
    }

    /// The replacement session is up and its cooldown has elapsed
    pub fn on_restarted(&mut self) {
        if self.state == WatchdogState::Restarting {
            self.state = WatchdogState::Running { last_seen: 0 };
        }
    }

    /// Terminal; no restart is requested after this
    pub fn stop(&mut self) {
        self.state = WatchdogState::Stopped;
    }
}

impl Default for Watchdog {
    fn default() -> Self {
        Self::new()
    }
}
