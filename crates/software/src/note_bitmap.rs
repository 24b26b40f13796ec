//! Provides [`NoteBitmap`], the storage behind every keyboard and every rank. Here a note is "set" when it is held
//! (on a keyboard) or sounding (in a rank); which of the two depends entirely on who owns the bitmap.

use wmidi::{Note, U7};

/// The number of notes addressable by MIDI.
pub const NOTE_COUNT: usize = 128;

const WORD_BITS: usize = u32::BITS as usize;
const WORD_COUNT: usize = NOTE_COUNT / WORD_BITS;

/// Returns an [`Iterator`] over every MIDI [`Note`], lowest first.
pub fn all_notes() -> impl Iterator<Item = Note> {
    (0..NOTE_COUNT as u8).map(|index| Note::from(U7::from_u8_lossy(index)))
}

/// Set membership over the 128 MIDI note indices.
///
/// Indices outside of `0..=127` are never stored: [`get`][Self::get] reports them as unset and
/// [`set`][Self::set] ignores them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NoteBitmap {
    words: [u32; WORD_COUNT],
}

#[cfg(feature = "defmt")]
impl defmt::Format for NoteBitmap {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "NoteBitmap {{ [");
        for (i, note) in self.iter().enumerate() {
            if i == 0 {
                defmt::write!(fmt, " ");
            } else {
                defmt::write!(fmt, ", ");
            }
            defmt::write!(fmt, "{} ({})", note.to_str(), note as u8);
        }
        defmt::write!(fmt, " ] }}");
    }
}

impl NoteBitmap {
    /// Constructs an empty `NoteBitmap`.
    pub const fn new() -> Self {
        Self {
            words: [0; WORD_COUNT],
        }
    }

    /// Returns whether the bit at `index` is set. Out-of-range indices are never set.
    pub fn get(&self, index: u8) -> bool {
        let index = usize::from(index);
        if index >= NOTE_COUNT {
            return false;
        }
        (self.words[index / WORD_BITS] >> (index % WORD_BITS)) & 1 == 1
    }

    /// Sets the bit at `index` to `value`, returning `true` if the stored bit changed.
    ///
    /// Out-of-range indices are ignored and report no change.
    pub fn set(&mut self, index: u8, value: bool) -> bool {
        let index = usize::from(index);
        if index >= NOTE_COUNT {
            return false;
        }
        let word = &mut self.words[index / WORD_BITS];
        let mask = 1 << (index % WORD_BITS);
        let previous = *word & mask != 0;
        if value {
            *word |= mask;
        } else {
            *word &= !mask;
        }
        previous != value
    }

    /// Convenience wrapper around [`get`][Self::get] for a [`Note`].
    pub fn contains(&self, note: Note) -> bool {
        self.get(note as u8)
    }

    /// Adds a [`Note`], returning `true` if it wasn't already present.
    pub fn insert(&mut self, note: Note) -> bool {
        self.set(note as u8, true)
    }

    /// Unsets every bit.
    pub fn clear(&mut self) {
        self.words = [0; WORD_COUNT];
    }

    /// Determine if no [`Note`]s are set.
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&word| word == 0)
    }

    /// Returns the number of [`Note`]s set.
    pub fn len(&self) -> usize {
        self.words
            .iter()
            .map(|word| word.count_ones() as usize)
            .sum()
    }

    /// Returns an [`Iterator`] over the set [`Note`]s, lowest first.
    pub fn iter(&self) -> impl Iterator<Item = Note> + '_ {
        all_notes().filter(move |&note| self.contains(note))
    }
}
