//! Provides the [`FailSafe`] state machine which governs panics, and the [`Clock`] it is timed against.
//!
//! A panic silences every pipe and forgets all state. The blanket silence itself is carried out by the
//! [controller](crate::controller), which owns the state to be forgotten; this module only keeps track of where in
//! that procedure the console is, and for how long it must stay quiet afterwards.

use embassy_time::{Duration, Instant};

/// Collaborator providing monotonic time.
pub trait Clock {
    /// Returns the current [`Instant`].
    fn now(&self) -> Instant;
}

/// A [`Clock`] backed by the Embassy time driver.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Where the console is in the panic procedure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FailSafeState {
    /// Ordinary operation.
    Normal,
    /// Every pipe is being closed and all state cleared.
    Panicking,
    /// All state is clear; input is drained and discarded until the [`Instant`] passes.
    Cooldown {
        /// When ordinary operation may resume.
        until: Instant,
    },
}

/// Why a panic began.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PanicCause {
    /// The output queue refused an instruction.
    QueueOverflow,
    /// Someone pressed the panic button, or otherwise asked.
    Requested,
}

/// Normal → Panicking → Cooldown → Normal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FailSafe {
    state: FailSafeState,
    cooldown: Duration,
    /// Panics begun since power-on.
    panics: u32,
}

impl FailSafe {
    /// Constructs a `FailSafe` in [`FailSafeState::Normal`].
    pub const fn new(cooldown: Duration) -> Self {
        Self {
            state: FailSafeState::Normal,
            cooldown,
            panics: 0,
        }
    }

    /// Returns the current state.
    pub fn state(&self) -> FailSafeState {
        self.state
    }

    /// Determine if inbound key events may touch any state.
    pub fn accepts_input(&self) -> bool {
        self.state == FailSafeState::Normal
    }

    /// Enters [`FailSafeState::Panicking`]. Panicking again while already panicking or cooling down restarts the
    /// procedure.
    pub fn begin_panic(&mut self, cause: PanicCause) {
        self.panics = self.panics.saturating_add(1);
        warn!("Panic #{} ({}): silencing every rank", self.panics, cause);
        self.state = FailSafeState::Panicking;
    }

    /// Enters [`FailSafeState::Cooldown`] once everything is silent and clear.
    pub fn begin_cooldown(&mut self, now: Instant) {
        let until = now + self.cooldown;
        info!("Cooling down for {} ms", self.cooldown.as_millis());
        self.state = FailSafeState::Cooldown { until };
    }

    /// Advances the state machine. Returns `true` if this call ended a cooldown.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.state {
            FailSafeState::Cooldown { until } if now >= until => {
                info!("Cooldown over, resuming");
                self.state = FailSafeState::Normal;
                true
            }
            _ => false,
        }
    }
}
