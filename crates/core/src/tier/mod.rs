//! Memory tiers.
//!
//! This module models the physical devices behind the controller. It provides:
//! 1. **Identity:** The `Tier` enum naming the near, far and optional backup devices.
//! 2. **Backend Trait:** `TierBackend`, the seam between the router and a device.
//! 3. **Timed Tier:** `TimedTier`, the stock backend pairing a `BackingStore` with a `TierTiming`.
//! 4. **Tier Set:** `TierSet`, the per-tier backend table owned by the controller.
//!
//! Offsets handed to a backend are physical offsets inside that tier. For the
//! near tier the home region occupies the first bytes and the migration slots
//! follow it.

/// Byte storage for tier contents.
pub mod buffer;

/// Latency and bandwidth model.
pub mod timing;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::common::{AccessKind, ConfigError, HumError, Result, Tick};
use crate::config::{Config, TierConfig};

pub use buffer::BackingStore;
pub use timing::{TierAccess, TierTiming};

/// One of the controller's memory devices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Fast, small memory (SRAM in the reference setup).
    Near,
    /// Slow, large memory (STT-RAM in the reference setup).
    Far,
    /// Optional additional slow memory; treated like `Far` for migration.
    Backup,
}

impl Tier {
    /// Every tier, in table order.
    pub const ALL: [Self; 3] = [Self::Near, Self::Far, Self::Backup];

    /// Returns the table index of the tier.
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Self::Near => 0,
            Self::Far => 1,
            Self::Backup => 2,
        }
    }

    /// Returns `true` for tiers whose blocks may be promoted into `Near`.
    #[inline]
    pub const fn is_slow(self) -> bool {
        !matches!(self, Self::Near)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Near => "near",
            Self::Far => "far",
            Self::Backup => "backup",
        })
    }
}

/// Interface between the router and a memory device.
///
/// Timed operations (`read`, `write`) advance the device's occupancy and
/// return when the access completes. Functional operations (`peek`, `poke`)
/// move data with no timing side effects.
pub trait TierBackend: Send {
    /// Returns which tier this backend implements.
    fn tier(&self) -> Tier;

    /// Returns the physical size of the device in bytes.
    fn size(&self) -> u64;

    /// Reads `buf.len()` bytes at `offset`, issued at `issued_at`.
    ///
    /// # Errors
    ///
    /// [`HumError::TierOutOfBounds`] if the span exceeds the device.
    fn read(&mut self, issued_at: Tick, offset: u64, buf: &mut [u8]) -> Result<TierAccess>;

    /// Writes `data` at `offset`, issued at `issued_at`.
    ///
    /// # Errors
    ///
    /// [`HumError::TierOutOfBounds`] if the span exceeds the device.
    fn write(&mut self, issued_at: Tick, offset: u64, data: &[u8]) -> Result<TierAccess>;

    /// Reads without timing.
    ///
    /// # Errors
    ///
    /// [`HumError::TierOutOfBounds`] if the span exceeds the device.
    fn peek(&self, offset: u64, buf: &mut [u8]) -> Result<()>;

    /// Writes without timing.
    ///
    /// # Errors
    ///
    /// [`HumError::TierOutOfBounds`] if the span exceeds the device.
    fn poke(&mut self, offset: u64, data: &[u8]) -> Result<()>;

    /// Returns the tick the device's last booked transfer ends.
    fn busy_until(&self) -> Tick;
}

/// Stock backend: zero-initialised storage with latency and bandwidth timing.
#[derive(Debug)]
pub struct TimedTier {
    tier: Tier,
    timing: TierTiming,
    store: BackingStore,
}

impl TimedTier {
    /// Creates a backend of `size` bytes timed according to `cfg`.
    ///
    /// # Errors
    ///
    /// [`HumError::Allocation`] if the storage cannot be reserved.
    pub fn new(tier: Tier, cfg: &TierConfig, size: u64) -> Result<Self> {
        Ok(Self {
            tier,
            timing: TierTiming::from_config(cfg),
            store: BackingStore::new(tier, size)?,
        })
    }

    /// Returns the timing model.
    pub const fn timing(&self) -> &TierTiming {
        &self.timing
    }
}

impl TierBackend for TimedTier {
    fn tier(&self) -> Tier {
        self.tier
    }

    fn size(&self) -> u64 {
        self.store.len()
    }

    fn read(&mut self, issued_at: Tick, offset: u64, buf: &mut [u8]) -> Result<TierAccess> {
        self.store.read_into(offset, buf)?;
        Ok(self
            .timing
            .access(issued_at, AccessKind::Read, buf.len() as u64))
    }

    fn write(&mut self, issued_at: Tick, offset: u64, data: &[u8]) -> Result<TierAccess> {
        self.store.write_from(offset, data)?;
        Ok(self
            .timing
            .access(issued_at, AccessKind::Write, data.len() as u64))
    }

    fn peek(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        self.store.read_into(offset, buf)
    }

    fn poke(&mut self, offset: u64, data: &[u8]) -> Result<()> {
        self.store.write_from(offset, data)
    }

    fn busy_until(&self) -> Tick {
        self.timing.busy_until()
    }
}

/// Backends indexed by tier.
pub struct TierSet {
    slots: [Option<Box<dyn TierBackend>>; 3],
}

impl fmt::Debug for TierSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for backend in self.slots.iter().flatten() {
            let _ = list.entry(&(backend.tier(), backend.size()));
        }
        list.finish()
    }
}

impl TierSet {
    /// Returns the physical bytes `tier` must provide under `config`.
    pub fn required_size(config: &Config, tier: Tier) -> Option<u64> {
        match tier {
            Tier::Near => Some(config.near_physical_size()),
            _ => config.tier(tier).map(|c| c.range.len()),
        }
    }

    /// Builds a `TimedTier` for every configured tier.
    ///
    /// # Errors
    ///
    /// [`HumError::Allocation`] if a backing store cannot be reserved.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut slots: [Option<Box<dyn TierBackend>>; 3] = [None, None, None];
        for (tier, cfg) in config.tiers() {
            let size = Self::required_size(config, tier).unwrap_or_default();
            slots[tier.index()] = Some(Box::new(TimedTier::new(tier, cfg, size)?));
        }
        Ok(Self { slots })
    }

    /// Installs caller-supplied backends, one per configured tier.
    ///
    /// # Errors
    ///
    /// As [`TierSet::verify`], plus [`ConfigError::BackendMismatch`] if two
    /// backends claim the same tier.
    pub fn from_backends(config: &Config, backends: Vec<Box<dyn TierBackend>>) -> Result<Self> {
        let mut slots: [Option<Box<dyn TierBackend>>; 3] = [None, None, None];
        for backend in backends {
            let tier = backend.tier();
            let slot = &mut slots[tier.index()];
            if slot.is_some() {
                return Err(ConfigError::BackendMismatch(tier).into());
            }
            *slot = Some(backend);
        }
        let set = Self { slots };
        set.verify(config)?;
        Ok(set)
    }

    /// Checks that the set holds exactly the configured tiers, each large enough.
    ///
    /// # Errors
    ///
    /// [`ConfigError::BackendMismatch`] for a missing or unconfigured backend,
    /// and [`ConfigError::BackendSize`] for one too small for its tier.
    pub fn verify(&self, config: &Config) -> Result<(), ConfigError> {
        for tier in Tier::ALL {
            let backend = self.slots[tier.index()].as_deref();
            match (backend, Self::required_size(config, tier)) {
                (None, None) => {}
                (Some(_), None) | (None, Some(_)) => {
                    return Err(ConfigError::BackendMismatch(tier));
                }
                (Some(b), Some(expected)) => {
                    if b.tier() != tier {
                        return Err(ConfigError::BackendMismatch(tier));
                    }
                    if b.size() < expected {
                        return Err(ConfigError::BackendSize {
                            tier,
                            expected,
                            actual: b.size(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Returns the backend for `tier`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::BackendMismatch`] if the tier is not configured.
    pub fn get(&self, tier: Tier) -> Result<&dyn TierBackend> {
        self.slots[tier.index()]
            .as_deref()
            .ok_or(HumError::Config(ConfigError::BackendMismatch(tier)))
    }

    /// Returns the backend for `tier` mutably.
    ///
    /// # Errors
    ///
    /// [`ConfigError::BackendMismatch`] if the tier is not configured.
    pub fn get_mut(&mut self, tier: Tier) -> Result<&mut (dyn TierBackend + 'static)> {
        self.slots[tier.index()]
            .as_deref_mut()
            .ok_or(HumError::Config(ConfigError::BackendMismatch(tier)))
    }
}
