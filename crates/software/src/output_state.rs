//! Provides [`OutputStateTracker`], which remembers what every pipe was last told and queues instructions only for
//! the pipes whose candidate state differs.

use crate::{
    output_queue::{OutputQueue, PipeInstruction, QueueOverflow},
    ranks::{Rank, Ranks},
};
use wmidi::Note;

/// Edge-triggered comparison of candidate rank state against the last state successfully queued.
///
/// Output state changes only once the matching instruction has been accepted by the queue. An instruction the queue
/// refuses therefore leaves its discrepancy in place to be rediscovered on the next sweep.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OutputStateTracker {
    sounding: Ranks,
}

impl OutputStateTracker {
    /// Constructs an `OutputStateTracker` which believes every pipe is closed.
    pub const fn new() -> Self {
        Self {
            sounding: Ranks::new(),
        }
    }

    /// Compares one pipe, queueing an instruction if it changed.
    pub fn reconcile<const N: usize>(
        &mut self,
        rank: Rank,
        note: Note,
        candidate: &Ranks,
        queue: &mut OutputQueue<N>,
    ) -> Result<(), QueueOverflow> {
        let wanted = candidate[rank].contains(note);
        if self.sounding[rank].contains(note) != wanted {
            queue.push(PipeInstruction::new(rank, note, wanted))?;
            self.sounding[rank].set(note as u8, wanted);
        }
        Ok(())
    }

    /// Reconciles one note across every [`Rank`], in [`Rank::ALL`] order.
    ///
    /// Stops at the first refused instruction.
    pub fn reconcile_note<const N: usize>(
        &mut self,
        note: Note,
        candidate: &Ranks,
        queue: &mut OutputQueue<N>,
    ) -> Result<(), QueueOverflow> {
        for rank in Rank::ALL {
            self.reconcile(rank, note, candidate, queue)?;
        }
        Ok(())
    }

    /// Forgets everything; used once every pipe has been explicitly closed.
    pub fn clear(&mut self) {
        self.sounding.clear();
    }
}
