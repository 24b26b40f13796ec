//! This crate contains architecture-agnostic logic for the Organ Brain, a device which sits between three MIDI
//! keyboards (swell, great and pedal) and four ranks of MIDI-driven organ pipes, emulating the stop-and-coupler
//! action of a mechanical [pipe organ](https://en.wikipedia.org/wiki/Pipe_organ).
//!
//! Every cycle, the held keys and the drawn stops are combined into the set of pipes that should sound. That set is
//! compared with what the pipes were last told, and only the differences are queued for transmission. Should the
//! queue ever overflow, every pipe is silenced and the device rests for a moment before carrying on.

#![deny(missing_docs)]
#![no_std]

#[macro_use]
mod fmt;

pub mod configuration;

/// Data structures describing the keyboards and the state of the keys held on them.
pub mod keyboards;

/// A fixed-width set of MIDI notes.
pub mod note_bitmap;

pub mod controller;
pub mod fail_safe;
pub mod input_drain;
pub mod output_queue;
pub mod output_state;
pub mod ranks;
pub mod registration;
pub mod routing;
pub mod stop_panel;
pub mod transport;
pub mod usb_midi;
