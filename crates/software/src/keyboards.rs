use crate::note_bitmap::NoteBitmap;
use core::ops::{Index, IndexMut};
use wmidi::Note;

/// One of the organ's keyboards, each of which is also the name of the division of stops it normally plays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Manual {
    /// The upper manual.
    #[default]
    Swell,
    /// The lower manual.
    Great,
    /// The pedalboard, played with the feet.
    Pedal,
}

impl Manual {
    /// Every manual, top to bottom.
    pub const ALL: [Manual; 3] = [Manual::Swell, Manual::Great, Manual::Pedal];
}

/// The keys currently held down on each [`Manual`].
///
/// Only inbound key events write to this state; routing reads it and nothing else.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Keyboards {
    held: [NoteBitmap; Manual::ALL.len()],
}

impl Keyboards {
    /// Constructs `Keyboards` with no keys held.
    pub const fn new() -> Self {
        Self {
            held: [NoteBitmap::new(); Manual::ALL.len()],
        }
    }

    /// Records a key being depressed or released, returning `true` if that changed anything.
    pub fn set(&mut self, manual: Manual, note: Note, held: bool) -> bool {
        self[manual].set(note as u8, held)
    }

    /// Determine if `note` is held on any [`Manual`].
    pub fn any_held(&self, note: Note) -> bool {
        self.held.iter().any(|keys| keys.contains(note))
    }

    /// Releases every key on every [`Manual`].
    pub fn clear(&mut self) {
        self.held.iter_mut().for_each(NoteBitmap::clear);
    }

    /// Determine if no key is held anywhere.
    pub fn is_empty(&self) -> bool {
        self.held.iter().all(NoteBitmap::is_empty)
    }
}

impl Index<Manual> for Keyboards {
    type Output = NoteBitmap;

    fn index(&self, manual: Manual) -> &Self::Output {
        &self.held[manual as usize]
    }
}

impl IndexMut<Manual> for Keyboards {
    fn index_mut(&mut self, manual: Manual) -> &mut Self::Output {
        &mut self.held[manual as usize]
    }
}
