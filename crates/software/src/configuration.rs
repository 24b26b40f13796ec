//! This module contains both the fixed settings of the console (channel assignments, timing, wiring) and the
//! user-configurable ones (implemented as enums), along with traits to make them easier to work with in code.

mod registration_mode;
pub use registration_mode::*;

use crate::{keyboards::Manual, ranks::Rank, stop_panel::SwitchWiring};
use embassy_time::Duration;
use num_traits::{FromPrimitive, ToPrimitive};
use wmidi::{Channel, U7, Velocity};

/// A trait which allows infinite cycling of an enum's variants.
///
/// Useful for pushbutton user interfaces, allowing presses to advance from the current to the next variant,
/// cycling back to the beginning when all variants have been exhausted.
pub trait CycleConfig {
    /// Return the next variant, cycling back to the beginning as needed.
    fn cycle(self) -> Self
    where
        Self: FromPrimitive + ToPrimitive + Sized,
    {
        let index = self
            .to_u8()
            .expect("enum variants should be castable to u8");
        match <Self as FromPrimitive>::from_u8(index + 1) {
            Some(new_selection) => new_selection,
            None => FromPrimitive::from_u8(0).expect("enum should not be empty"),
        }
    }
}

/// Velocity sent with every note instruction; pipes are either open or closed, so its value is nominal.
pub const DEFAULT_OUTPUT_VELOCITY: Velocity = U7::from_u8_lossy(100);

/// How long the console stays silent after a panic.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(5);

/// Note instructions are two bytes each on the wire and the serial transmit buffer holds 64 bytes, so staying
/// below 32 per batch keeps the wire layer from overwriting itself.
pub const DEFAULT_SENDS_PER_BATCH: usize = 24;

/// Everything about the console that is decided when the device is built rather than while it is played.
#[derive(Clone, Copy, Debug)]
pub struct OrganConfig {
    /// MIDI channel on which each [`Manual`] transmits, indexed by `Manual as usize`.
    pub manual_channels: [Channel; Manual::ALL.len()],
    /// MIDI channel on which each [`Rank`] listens, indexed by `Rank as usize`.
    pub rank_channels: [Channel; Rank::ALL.len()],
    /// Velocity attached to outbound note instructions.
    pub output_velocity: Velocity,
    /// Silence enforced after a panic before normal operation resumes.
    pub cooldown: Duration,
    /// Upper bound on queued instructions sent per batch.
    pub sends_per_batch: usize,
    /// Which sensor reports each stop switch.
    pub wiring: &'static [SwitchWiring],
    /// Sensor for the panic button, if the console has one.
    pub panic_button: Option<crate::stop_panel::Sensor>,
    /// Whether stops come from the panel or are all drawn.
    pub registration_mode: RegistrationMode,
}

impl Default for OrganConfig {
    fn default() -> Self {
        Self {
            manual_channels: [Channel::Ch3, Channel::Ch2, Channel::Ch1],
            rank_channels: [Channel::Ch13, Channel::Ch14, Channel::Ch15, Channel::Ch16],
            output_velocity: DEFAULT_OUTPUT_VELOCITY,
            cooldown: DEFAULT_COOLDOWN,
            sends_per_batch: DEFAULT_SENDS_PER_BATCH,
            wiring: &[],
            panic_button: None,
            registration_mode: RegistrationMode::default(),
        }
    }
}

impl OrganConfig {
    /// Returns the [`Manual`] transmitting on `channel`, if any.
    pub fn manual_for(&self, channel: Channel) -> Option<Manual> {
        Manual::ALL
            .into_iter()
            .find(|&manual| self.manual_channels[manual as usize] == channel)
    }

    /// Returns the output channel of a [`Rank`].
    pub fn rank_channel(&self, rank: Rank) -> Channel {
        self.rank_channels[rank as usize]
    }
}
