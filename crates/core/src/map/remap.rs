//! Remap table and near migration slots.
//!
//! A block that has been moved away from its home has a remap entry naming
//! its current tier and physical offset. Blocks without an entry live at home.
//! Promoted blocks occupy one of the near tier's migration slots; `NearSlots`
//! hands them out so the near tier can never be over-committed.

use std::collections::HashMap;

use crate::common::BlockAddr;
use crate::tier::Tier;

/// Current placement of a migrated block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RemapEntry {
    /// Tier holding the block.
    pub tier: Tier,
    /// Physical offset of the block inside that tier.
    pub offset: u64,
}

/// Mapping from migrated blocks to their current placement.
#[derive(Clone, Debug, Default)]
pub struct RemapTable {
    entries: HashMap<BlockAddr, RemapEntry>,
}

impl RemapTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `block` now lives at `entry`, returning any previous entry.
    pub fn insert(&mut self, block: BlockAddr, entry: RemapEntry) -> Option<RemapEntry> {
        self.entries.insert(block, entry)
    }

    /// Forgets the entry of `block`; it is back at its home.
    pub fn remove(&mut self, block: BlockAddr) -> Option<RemapEntry> {
        self.entries.remove(&block)
    }

    /// Looks up the placement of `block`.
    #[inline]
    pub fn get(&self, block: BlockAddr) -> Option<RemapEntry> {
        self.entries.get(&block).copied()
    }

    /// Number of migrated blocks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no block is migrated.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Identifier of a near migration slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotId(pub usize);

/// Free list of near migration slots.
///
/// Slot `n` lives at physical offset `base + n * block_size` of the near tier.
#[derive(Clone, Debug)]
pub struct NearSlots {
    base: u64,
    block_size: u64,
    capacity: usize,
    free: Vec<SlotId>,
}

impl NearSlots {
    /// Creates `capacity` free slots starting at near offset `base`.
    pub fn new(base: u64, block_size: u64, capacity: usize) -> Self {
        Self {
            base,
            block_size,
            capacity,
            free: (0..capacity).rev().map(SlotId).collect(),
        }
    }

    /// Takes the lowest free slot.
    pub fn reserve(&mut self) -> Option<SlotId> {
        self.free.pop()
    }

    /// Returns `slot` to the free list.
    pub fn release(&mut self, slot: SlotId) {
        debug_assert!(!self.free.contains(&slot), "slot {slot:?} released twice");
        self.free.push(slot);
    }

    /// Physical near offset of `slot`.
    pub const fn offset(&self, slot: SlotId) -> u64 {
        self.base + slot.0 as u64 * self.block_size
    }

    /// Maps a physical near offset back to its slot, if it is a slot offset.
    pub const fn slot_at(&self, offset: u64) -> Option<SlotId> {
        if offset < self.base || (offset - self.base) % self.block_size != 0 {
            return None;
        }
        let idx = ((offset - self.base) / self.block_size) as usize;
        if idx < self.capacity {
            Some(SlotId(idx))
        } else {
            None
        }
    }

    /// Total number of slots.
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots currently handed out.
    pub fn in_use(&self) -> usize {
        self.capacity - self.free.len()
    }

    /// Slots still available.
    pub fn available(&self) -> usize {
        self.free.len()
    }
}
