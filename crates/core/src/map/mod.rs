//! Address translation.
//!
//! This module turns logical addresses into tier placements. It provides:
//! 1. **Address Space Map:** Static home tier and offset of every address.
//! 2. **Remap Table:** Current placement of migrated blocks.
//! 3. **Near Slots:** Free list of near-tier frames available to promoted blocks.
//! 4. **Near Cache:** Tags of the direct-mapped lines used by the `TwoLevel` mode.

/// Static home placement.
pub mod address_map;

/// Migrated-block placement and near slots.
pub mod remap;

/// Direct-mapped cache tags.
pub mod cache;

pub use address_map::{AddressSpaceMap, HomeLocation};
pub use cache::{CacheTag, LineId, Lookup, NearCache};
pub use remap::{NearSlots, RemapEntry, RemapTable, SlotId};
