//! Combines held keys with drawn stops into the candidate state of every rank.
//!
//! Routing is stateless: the candidate [`Ranks`] are rebuilt from scratch every cycle out of the raw keyboard state,
//! never adjusted incrementally. Because the candidate is a boolean union, two keys (or two stops) supplying the same
//! pipe keep it sounding until the last of them lets go, with no reference counting involved.

use crate::{
    keyboards::{Keyboards, Manual},
    ranks::Ranks,
    registration::Registration,
    stop_panel::StopPanel,
};
use wmidi::{Note, U7};

/// Shifts `note` by `offset` semitones, returning `None` when the result falls outside the MIDI range.
///
/// Results are never wrapped or clamped.
pub fn transpose(note: Note, offset: i8) -> Option<Note> {
    let shifted = i16::from(note as u8) + i16::from(offset);
    u8::try_from(shifted)
        .ok()
        .filter(|&index| index <= 127)
        .map(|index| Note::from(U7::from_u8_lossy(index)))
}

/// Applies a [`Registration`] to keyboard and stop snapshots.
pub struct RoutingEngine<'a> {
    registration: &'a Registration,
}

impl<'a> RoutingEngine<'a> {
    /// Constructs a `RoutingEngine` for a given rule table.
    pub fn new(registration: &'a Registration) -> Self {
        Self { registration }
    }

    /// Adds every contribution of `note` to `candidate`, for each keyboard on which it is held.
    ///
    /// Only ever sets bits; clearing the candidate at the start of the cycle is the caller's business.
    pub fn route_note(
        &self,
        note: Note,
        keyboards: &Keyboards,
        panel: &StopPanel,
        candidate: &mut Ranks,
    ) {
        for keyboard in Manual::ALL {
            if !keyboards[keyboard].contains(note) {
                continue;
            }
            self.sound_division(keyboard, note, panel, candidate);

            for coupler in self
                .registration
                .couplers_for(keyboard)
                .filter(|coupler| panel.is_drawn(coupler.stop))
            {
                match transpose(note, coupler.offset) {
                    Some(coupled) => {
                        self.sound_division(coupler.division, coupled, panel, candidate)
                    }
                    None => trace!("Coupled key out of range, dropped"),
                }
            }
        }
    }

    /// Sets the bit of every drawn stop of `division` for a key.
    ///
    /// Couplers are not followed from here, so coupling is never transitive.
    fn sound_division(
        &self,
        division: Manual,
        note: Note,
        panel: &StopPanel,
        candidate: &mut Ranks,
    ) {
        for route in self
            .registration
            .routes_for(division)
            .filter(|route| panel.is_drawn(route.stop))
        {
            if let Some(pipe) = transpose(note, route.offset) {
                candidate[route.rank].insert(pipe);
            }
        }
    }
}
