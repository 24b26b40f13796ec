//! Provides [`OutputQueue`], the fixed-capacity FIFO holding note instructions until the transport has room for them.
//!
//! Instructions are stored packed into a `u16` each: the pitch in the low byte, the rank index in the next seven
//! bits, and on/off in the top bit. The rank index is not a MIDI channel; the controller looks up the rank's output
//! channel when the instruction is sent.

use crate::ranks::Rank;
use wmidi::{Note, U7};

/// Four ranks of 128 notes: enough to hold every change a single cycle could possibly produce.
pub const QUEUE_CAPACITY: usize = 512;

const PITCH_MASK: u16 = 0x00FF;
const RANK_SHIFT: u16 = 8;
const RANK_MASK: u16 = 0b0111_1111;
const ON_SHIFT: u16 = 15;

/// An instruction to open (`on`) or close a single pipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipeInstruction {
    /// The rank whose pipe changes.
    pub rank: Rank,
    /// The pipe.
    pub note: Note,
    /// `true` for note on, `false` for note off.
    pub on: bool,
}

#[cfg(feature = "defmt")]
impl defmt::Format for PipeInstruction {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(
            fmt,
            "PipeInstruction {{ rank: {}, note: {} ({}), on: {} }}",
            self.rank,
            self.note.to_str(),
            self.note as u8,
            self.on
        );
    }
}

impl PipeInstruction {
    /// Constructs a `PipeInstruction`.
    pub fn new(rank: Rank, note: Note, on: bool) -> Self {
        Self { rank, note, on }
    }

    fn encode(self) -> u16 {
        u16::from(self.note as u8)
            | (u16::from(self.rank as u8) << RANK_SHIFT)
            | (u16::from(self.on) << ON_SHIFT)
    }

    fn decode(word: u16) -> Self {
        Self {
            rank: Rank::from_bits(((word >> RANK_SHIFT) & RANK_MASK) as u8),
            note: Note::from(U7::from_u8_lossy((word & PITCH_MASK) as u8)),
            on: word >> ON_SHIFT == 1,
        }
    }
}

/// The queue was full; the instruction was not stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct QueueOverflow;

/// A fixed-capacity circular buffer of [`PipeInstruction`]s.
///
/// A full queue refuses new instructions instead of overwriting old ones.
#[derive(Clone, Debug)]
pub struct OutputQueue<const N: usize = QUEUE_CAPACITY> {
    slots: [u16; N],
    /// Index of the oldest instruction.
    head: usize,
    len: usize,
}

impl<const N: usize> Default for OutputQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> OutputQueue<N> {
    /// Constructs an empty `OutputQueue`.
    pub const fn new() -> Self {
        Self {
            slots: [0; N],
            head: 0,
            len: 0,
        }
    }

    /// Appends an instruction, failing without side effects when the queue is full.
    pub fn push(&mut self, instruction: PipeInstruction) -> Result<(), QueueOverflow> {
        if self.is_full() {
            return Err(QueueOverflow);
        }
        let tail = (self.head + self.len) % N;
        self.slots[tail] = instruction.encode();
        self.len += 1;
        Ok(())
    }

    /// Removes and returns the oldest instruction, if any.
    pub fn pop(&mut self) -> Option<PipeInstruction> {
        if self.is_empty() {
            return None;
        }
        let word = self.slots[self.head];
        self.head = (self.head + 1) % N;
        self.len -= 1;
        Some(PipeInstruction::decode(word))
    }

    /// Discards every pending instruction.
    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }

    /// Returns the number of pending instructions.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Determine if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Determine if another push would fail.
    pub fn is_full(&self) -> bool {
        self.len == N
    }
}
