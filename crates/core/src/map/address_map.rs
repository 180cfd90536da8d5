//! Logical address space map.
//!
//! Every configured tier owns one contiguous region of the logical address
//! space. The map answers which tier is an address's home and where inside
//! that tier the address lives when the block has not been migrated.

use crate::common::{AddressRange, BlockAddr, ConfigError, HumError, Result};
use crate::config::Config;
use crate::tier::Tier;

/// Home placement of an address.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HomeLocation {
    /// Tier whose region contains the address.
    pub tier: Tier,
    /// Physical offset inside that tier.
    pub offset: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Region {
    tier: Tier,
    range: AddressRange,
}

/// Immutable table of tier regions, sorted by start address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddressSpaceMap {
    regions: Vec<Region>,
    block_size: u64,
}

impl AddressSpaceMap {
    /// Builds the map from a configuration.
    ///
    /// # Errors
    ///
    /// Any [`ConfigError`] reported by `Config::validate`.
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut regions: Vec<Region> = config
            .tiers()
            .map(|(tier, cfg)| Region {
                tier,
                range: cfg.range,
            })
            .collect();
        regions.sort_by_key(|r| r.range.start);
        Ok(Self {
            regions,
            block_size: config.block_size,
        })
    }

    fn region_of(&self, addr: u64) -> Option<&Region> {
        let idx = self.regions.partition_point(|r| r.range.start <= addr);
        let region = self.regions.get(idx.checked_sub(1)?)?;
        region.range.contains(addr).then_some(region)
    }

    /// Returns the home tier and in-tier offset of `addr`.
    pub fn home_of(&self, addr: u64) -> Option<HomeLocation> {
        self.region_of(addr).map(|r| HomeLocation {
            tier: r.tier,
            offset: addr - r.range.start,
        })
    }

    /// Returns the home placement of `addr`, treating an unmapped address as an error.
    ///
    /// # Errors
    ///
    /// [`HumError::AddressOutOfRange`] if no region contains `addr`.
    pub fn resolve(&self, addr: u64) -> Result<HomeLocation> {
        self.home_of(addr)
            .ok_or(HumError::AddressOutOfRange { addr, size: 1 })
    }

    /// Returns `true` if every byte of `[addr, addr + size)` is mapped.
    ///
    /// Adjacent regions of different tiers together cover a span.
    pub fn covers(&self, addr: u64, size: u64) -> bool {
        let Some(end) = addr.checked_add(size) else {
            return false;
        };
        let mut cursor = addr;
        while cursor < end {
            match self.region_of(cursor) {
                Some(r) => cursor = r.range.end,
                None => return false,
            }
        }
        true
    }

    /// Returns the block containing `addr`.
    #[inline]
    pub const fn block_of(&self, addr: u64) -> BlockAddr {
        BlockAddr::containing(addr, self.block_size)
    }

    /// Returns the block size.
    #[inline]
    pub const fn block_size(&self) -> u64 {
        self.block_size
    }

    /// Returns the region of `tier`, if configured.
    pub fn range_of(&self, tier: Tier) -> Option<AddressRange> {
        self.regions.iter().find(|r| r.tier == tier).map(|r| r.range)
    }

    /// Returns the lowest and highest mapped addresses as one range.
    pub fn bounds(&self) -> AddressRange {
        match (self.regions.first(), self.regions.last()) {
            (Some(lo), Some(hi)) => AddressRange::new(lo.range.start, hi.range.end),
            _ => AddressRange::new(0, 0),
        }
    }

    /// Iterates over `(tier, region)` pairs in address order.
    pub fn regions(&self) -> impl Iterator<Item = (Tier, AddressRange)> + '_ {
        self.regions.iter().map(|r| (r.tier, r.range))
    }
}
