//! Provides [`Rank`], the four sets of pipes the organ can voice, along with [`Ranks`], a [`NoteBitmap`] per rank.
//!
//! The same structure holds two very different things: the candidate state rebuilt from scratch every cycle by
//! [routing](crate::routing), and the output state recording what the pipes were last told.

use crate::note_bitmap::NoteBitmap;
use core::ops::{Index, IndexMut};

/// A set of pipes sharing a timbre, addressed by its own MIDI output channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Rank {
    /// Principal (diapason) pipes, the characteristic organ tone.
    #[default]
    Principal,
    /// String pipes.
    String,
    /// Flute pipes.
    Flute,
    /// Reed pipes.
    Reed,
}

impl Rank {
    /// Every rank, in the order the output sweep visits them.
    pub const ALL: [Rank; 4] = [Rank::Principal, Rank::String, Rank::Flute, Rank::Reed];

    /// Recovers a `Rank` from the two bits produced by `rank as u8`.
    pub(crate) fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0 => Self::Principal,
            1 => Self::String,
            2 => Self::Flute,
            _ => Self::Reed,
        }
    }
}

/// One [`NoteBitmap`] per [`Rank`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Ranks {
    pipes: [NoteBitmap; Rank::ALL.len()],
}

impl Ranks {
    /// Constructs `Ranks` with nothing sounding.
    pub const fn new() -> Self {
        Self {
            pipes: [NoteBitmap::new(); Rank::ALL.len()],
        }
    }

    /// Unsets every note of every [`Rank`].
    pub fn clear(&mut self) {
        self.pipes.iter_mut().for_each(NoteBitmap::clear);
    }

    /// Determine if no [`Rank`] has anything set.
    pub fn is_empty(&self) -> bool {
        self.pipes.iter().all(NoteBitmap::is_empty)
    }
}

impl Index<Rank> for Ranks {
    type Output = NoteBitmap;

    fn index(&self, rank: Rank) -> &Self::Output {
        &self.pipes[rank as usize]
    }
}

impl IndexMut<Rank> for Ranks {
    fn index_mut(&mut self, rank: Rank) -> &mut Self::Output {
        &mut self.pipes[rank as usize]
    }
}
