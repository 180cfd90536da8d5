//! Address, block and tick types.
//!
//! This module defines the strong types used to talk about the controller's
//! logical address space. It provides the following:
//! 1. **Ranges:** `AddressRange`, a half-open `[start, end)` interval used for tier regions.
//! 2. **Blocks:** `BlockAddr`, the aligned base address of a migration unit.
//! 3. **Time:** the `Tick` alias used for every simulated timestamp and latency.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Simulated time and latencies, in ticks (the default configuration uses picoseconds).
pub type Tick = u64;

/// A half-open address interval `[start, end)`.
///
/// Regions handed to the controller must be non-empty and must not overlap;
/// both conditions are checked when the configuration is validated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AddressRange {
    /// First address inside the range.
    pub start: u64,
    /// First address past the range.
    pub end: u64,
}

impl AddressRange {
    /// Creates a range covering `[start, end)`.
    pub const fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// Creates a range of `len` bytes beginning at `start`.
    ///
    /// Saturates at `u64::MAX` instead of wrapping.
    pub const fn with_len(start: u64, len: u64) -> Self {
        Self {
            start,
            end: start.saturating_add(len),
        }
    }

    /// Returns the number of bytes covered by the range.
    #[inline]
    pub const fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    /// Returns `true` if the range covers no bytes.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Returns `true` if `addr` lies inside the range.
    #[inline]
    pub const fn contains(&self, addr: u64) -> bool {
        addr >= self.start && addr < self.end
    }

    /// Returns `true` if every byte of `[addr, addr + size)` lies inside the range.
    pub const fn contains_span(&self, addr: u64, size: u64) -> bool {
        match addr.checked_add(size) {
            Some(last) => addr >= self.start && last <= self.end,
            None => false,
        }
    }

    /// Returns `true` if the two ranges share at least one address.
    pub const fn overlaps(&self, other: &Self) -> bool {
        !self.is_empty() && !other.is_empty() && self.start < other.end && other.start < self.end
    }

    /// Returns `true` if both bounds are multiples of `align`.
    pub const fn is_aligned(&self, align: u64) -> bool {
        align != 0 && self.start % align == 0 && self.end % align == 0
    }
}

impl fmt::Display for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:#x}, {:#x})", self.start, self.end)
    }
}

/// The aligned base address of a block, in the logical address space.
///
/// Blocks are the unit of migration; every byte address belongs to exactly one block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockAddr(pub u64);

impl BlockAddr {
    /// Returns the block containing `addr` for a power-of-two `block_size`.
    #[inline(always)]
    pub const fn containing(addr: u64, block_size: u64) -> Self {
        Self(addr & !(block_size - 1))
    }

    /// Returns the raw base address.
    #[inline(always)]
    pub const fn val(&self) -> u64 {
        self.0
    }

    /// Returns the byte offset of `addr` inside this block.
    #[inline(always)]
    pub const fn offset_of(&self, addr: u64) -> u64 {
        addr - self.0
    }
}

impl fmt::Display for BlockAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}
