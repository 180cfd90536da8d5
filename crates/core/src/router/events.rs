//! Internal timed events.
//!
//! The controller never blocks. Work that finishes in the future is pushed on
//! an `EventQueue` and handled when the external scheduler advances time past
//! it. Events fire in tick order; events with equal ticks fire in the order
//! they were scheduled.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::request::RequestId;
use crate::common::{BlockAddr, Tick};
use crate::map::SlotId;

/// Why a block leaves the near tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DemotionCause {
    /// Cooled below the cold threshold during aging.
    Aging,
    /// Displaced by a hotter block.
    Eviction,
}

/// A block copy planned by the policy engine.
///
/// A swap carries both halves and reuses the evicted block's slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MigrationJob {
    /// Block moving into `slot`.
    pub promote: Option<(BlockAddr, SlotId)>,
    /// Block leaving `slot`, and why.
    pub demote: Option<(BlockAddr, SlotId, DemotionCause)>,
}

/// Controller event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// A sub-request of `RequestId` has completed.
    Complete(RequestId),
    /// All earlier traffic to the job's blocks has drained; start copying.
    MigrationStart(MigrationJob),
    /// The copy of `block` has landed.
    MigrationDone {
        /// Block whose migration finished.
        block: BlockAddr,
        /// Slot to free once the block is out, for aging demotions.
        release: Option<SlotId>,
        /// Set for the demotion half of a swap.
        eviction: bool,
    },
}

#[derive(Debug)]
struct Scheduled {
    tick: Tick,
    seq: u64,
    event: Event,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        (self.tick, self.seq) == (other.tick, other.seq)
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    // Reversed so the max-heap pops the earliest event first.
    fn cmp(&self, other: &Self) -> Ordering {
        (other.tick, other.seq).cmp(&(self.tick, self.seq))
    }
}

/// Min-heap of events keyed by `(tick, scheduling order)`.
#[derive(Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<Scheduled>,
    next_seq: u64,
}

impl EventQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `event` at `tick`.
    pub fn push(&mut self, tick: Tick, event: Event) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Scheduled { tick, seq, event });
    }

    /// Tick of the earliest pending event.
    pub fn peek_tick(&self) -> Option<Tick> {
        self.heap.peek().map(|s| s.tick)
    }

    /// Removes the earliest event if it is due at or before `now`.
    pub fn pop_due(&mut self, now: Tick) -> Option<(Tick, Event)> {
        if self.peek_tick()? > now {
            return None;
        }
        self.heap.pop().map(|s| (s.tick, s.event))
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Returns `true` if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
