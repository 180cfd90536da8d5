//! Configuration system for the migration controller.
//!
//! This module defines all configuration structures and enums used to parameterize
//! the controller. It provides:
//! 1. **Defaults:** Baseline constants reproducing the SRAM/STT-RAM hybrid setup.
//! 2. **Structures:** Per-tier region and timing, block size, ports, and policy parameters.
//! 3. **Validation:** `Config::validate` rejects every configuration the controller cannot honour.
//!
//! Configuration is supplied as JSON (`Config::from_json_str`, `Config::from_json_file`)
//! or built from `Config::default()`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::common::{AddressRange, ConfigError, Tick};
use crate::tier::Tier;

/// Default configuration constants for the controller.
///
/// Latencies are in ticks of one picosecond; the values are the SRAM and
/// STT-RAM delays the hybrid controller was characterised with.
mod defaults {
    use crate::common::Tick;

    /// Far (STT-RAM) region base.
    pub const FAR_BASE: u64 = 0;

    /// Far (STT-RAM) region size (2 MiB).
    pub const FAR_SIZE: u64 = 2048 * 1024;

    /// Near (SRAM) region base, directly after the far region.
    pub const NEAR_BASE: u64 = FAR_BASE + FAR_SIZE;

    /// Near (SRAM) region size (256 KiB).
    pub const NEAR_SIZE: u64 = 256 * 1024;

    /// SRAM read delay (2.02 ns).
    pub const NEAR_READ_LATENCY: Tick = 2020;

    /// SRAM write delay (1.313 ns).
    pub const NEAR_WRITE_LATENCY: Tick = 1313;

    /// SRAM transfer cost per byte (about 74 GB/s).
    pub const NEAR_TICKS_PER_BYTE: Tick = 13;

    /// STT-RAM read delay (3.511 ns).
    pub const FAR_READ_LATENCY: Tick = 3511;

    /// STT-RAM write delay (13.026 ns).
    pub const FAR_WRITE_LATENCY: Tick = 13026;

    /// STT-RAM transfer cost per byte (about 31 GB/s).
    pub const FAR_TICKS_PER_BYTE: Tick = 30;

    /// Migration granularity in bytes.
    pub const BLOCK_SIZE: u64 = 1024;

    /// CPU-side endpoints: instruction port, data port and system port.
    pub const PORTS: usize = 3;

    /// Accesses within an aging window before a block is promoted.
    pub const HOT_THRESHOLD: u32 = 7;

    /// Hotness below which an aged near-resident block is demoted.
    pub const COLD_THRESHOLD: u32 = 1;

    /// Saturation value of the 4-bit hotness counter.
    pub const MAX_HOTNESS: u32 = 15;

    /// Aging period in ticks (1 us).
    pub const AGING_INTERVAL: Tick = 1_000_000;

    /// Near migration slots (one per near block).
    pub const NEAR_CAPACITY_BLOCKS: usize = (NEAR_SIZE / BLOCK_SIZE) as usize;
}

/// Migration policy implementation types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum PolicyKind {
    /// Two-threshold hot/cold policy with periodic aging.
    ///
    /// Promotes blocks that reach the hot threshold into the near tier and
    /// demotes near-resident blocks that cool below the cold threshold.
    #[default]
    #[serde(alias = "HOTCOLD", alias = "hot_cold")]
    HotCold,
    /// Pass-through policy.
    ///
    /// Never migrates; every block stays in its home tier.
    #[serde(alias = "STATIC", alias = "static")]
    Static,
    /// Direct-mapped write-back cache.
    ///
    /// The near slots hold copies of far and backup blocks, one line per slot,
    /// indexed by block number. A miss fills the line and writes a dirty
    /// previous occupant back to its home. No block ever migrates.
    #[serde(alias = "TWOLEVEL", alias = "two_level")]
    TwoLevel,
}

/// Root configuration structure containing all controller settings.
///
/// # Examples
///
/// Creating a default configuration:
///
/// ```
/// use humsim_core::config::Config;
///
/// let config = Config::default();
/// assert_eq!(config.block_size, 1024);
/// assert!(config.backup.is_none());
/// assert!(config.validate().is_ok());
/// ```
///
/// Deserializing from JSON; omitted fields take their defaults:
///
/// ```
/// use humsim_core::config::{Config, PolicyKind};
///
/// let json = r#"{
///     "near": { "range": { "start": 65536, "end": 131072 }, "read_latency": 2, "write_latency": 2 },
///     "far":  { "range": { "start": 0, "end": 65536 }, "read_latency": 10, "write_latency": 40 },
///     "block_size": 4096,
///     "policy": { "kind": "HotCold", "hot_threshold": 3, "near_capacity_blocks": 4 }
/// }"#;
///
/// let config = Config::from_json_str(json).unwrap();
/// assert_eq!(config.policy.kind, PolicyKind::HotCold);
/// assert_eq!(config.policy.near_capacity_blocks, 4);
/// assert_eq!(config.ports, 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Near (fast, small) tier
    #[serde(default = "TierConfig::default_near")]
    pub near: TierConfig,

    /// Far (slow, large) tier
    #[serde(default = "TierConfig::default_far")]
    pub far: TierConfig,

    /// Optional backup tier; migrates like the far tier
    #[serde(default)]
    pub backup: Option<TierConfig>,

    /// Migration granularity in bytes (power of two)
    #[serde(default = "Config::default_block_size")]
    pub block_size: u64,

    /// Number of CPU-side endpoints
    #[serde(default = "Config::default_ports")]
    pub ports: usize,

    /// Migration policy parameters
    #[serde(default)]
    pub policy: PolicyConfig,
}

impl Config {
    /// Returns the default block size in bytes.
    fn default_block_size() -> u64 {
        defaults::BLOCK_SIZE
    }

    /// Returns the default number of CPU-side ports.
    fn default_ports() -> usize {
        defaults::PORTS
    }

    /// Parses and validates a JSON configuration.
    ///
    /// # Errors
    ///
    /// `ConfigError::Parse` for malformed JSON, or any validation error.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file.
    ///
    /// # Errors
    ///
    /// `ConfigError::Io` if the file cannot be read, otherwise as [`Config::from_json_str`].
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&text)
    }

    /// Returns the configuration of `tier`, if that tier is present.
    pub const fn tier(&self, tier: Tier) -> Option<&TierConfig> {
        match tier {
            Tier::Near => Some(&self.near),
            Tier::Far => Some(&self.far),
            Tier::Backup => self.backup.as_ref(),
        }
    }

    /// Iterates over the configured tiers in `Tier::ALL` order.
    pub fn tiers(&self) -> impl Iterator<Item = (Tier, &TierConfig)> + '_ {
        Tier::ALL
            .into_iter()
            .filter_map(move |t| self.tier(t).map(|c| (t, c)))
    }

    /// Physical bytes the near tier must hold: its home region plus the migration slots.
    pub const fn near_physical_size(&self) -> u64 {
        self.near.range.len() + self.near_slot_bytes()
    }

    /// Bytes reserved for near migration slots or cache lines.
    pub const fn near_slot_bytes(&self) -> u64 {
        match self.policy.kind {
            PolicyKind::HotCold | PolicyKind::TwoLevel => {
                self.policy.near_capacity_blocks as u64 * self.block_size
            }
            PolicyKind::Static => 0,
        }
    }

    /// Checks every invariant the controller relies on.
    ///
    /// # Errors
    ///
    /// The first violated constraint, as a [`ConfigError`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.block_size == 0 || !self.block_size.is_power_of_two() {
            return Err(ConfigError::BlockSize(self.block_size));
        }
        if self.ports == 0 {
            return Err(ConfigError::NoPorts);
        }

        let tiers: Vec<(Tier, &TierConfig)> = self.tiers().collect();
        for (tier, cfg) in &tiers {
            if cfg.range.is_empty() {
                return Err(ConfigError::EmptyRange(*tier));
            }
            if !cfg.range.is_aligned(self.block_size) {
                return Err(ConfigError::Misaligned {
                    tier: *tier,
                    range: cfg.range,
                    block_size: self.block_size,
                });
            }
            if cfg.read_latency == 0 || cfg.write_latency == 0 {
                return Err(ConfigError::ZeroLatency(*tier));
            }
        }
        for (i, (a, a_cfg)) in tiers.iter().enumerate() {
            for (b, b_cfg) in &tiers[i + 1..] {
                if a_cfg.range.overlaps(&b_cfg.range) {
                    return Err(ConfigError::Overlap {
                        a: *a,
                        a_range: a_cfg.range,
                        b: *b,
                        b_range: b_cfg.range,
                    });
                }
            }
        }

        self.policy.validate()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            near: TierConfig::default_near(),
            far: TierConfig::default_far(),
            backup: None,
            block_size: defaults::BLOCK_SIZE,
            ports: defaults::PORTS,
            policy: PolicyConfig::default(),
        }
    }
}

/// Region and timing of one memory tier.
///
/// Transfer time is `size * ticks_per_byte`; a tier is busy for that long per
/// access and requests issued while it is busy queue behind it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierConfig {
    /// Logical addresses whose home is this tier
    pub range: AddressRange,

    /// Fixed read latency in ticks
    pub read_latency: Tick,

    /// Fixed write latency in ticks
    pub write_latency: Tick,

    /// Transfer cost per byte in ticks (0 disables bandwidth gating)
    #[serde(default)]
    pub ticks_per_byte: Tick,
}

impl TierConfig {
    /// Returns the default near (SRAM) tier.
    fn default_near() -> Self {
        Self {
            range: AddressRange::with_len(defaults::NEAR_BASE, defaults::NEAR_SIZE),
            read_latency: defaults::NEAR_READ_LATENCY,
            write_latency: defaults::NEAR_WRITE_LATENCY,
            ticks_per_byte: defaults::NEAR_TICKS_PER_BYTE,
        }
    }

    /// Returns the default far (STT-RAM) tier.
    fn default_far() -> Self {
        Self {
            range: AddressRange::with_len(defaults::FAR_BASE, defaults::FAR_SIZE),
            read_latency: defaults::FAR_READ_LATENCY,
            write_latency: defaults::FAR_WRITE_LATENCY,
            ticks_per_byte: defaults::FAR_TICKS_PER_BYTE,
        }
    }
}

/// Migration policy parameters.
///
/// `hot_threshold`, `cold_threshold` and the aging interval are tunables, not
/// fixed constants of the hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Policy implementation
    #[serde(default)]
    pub kind: PolicyKind,

    /// Hotness at which a far/backup block is promoted
    #[serde(default = "PolicyConfig::default_hot_threshold")]
    pub hot_threshold: u32,

    /// Aged hotness below which a near-resident block is demoted
    #[serde(default = "PolicyConfig::default_cold_threshold")]
    pub cold_threshold: u32,

    /// Saturation value of the hotness counter
    #[serde(default = "PolicyConfig::default_max_hotness")]
    pub max_hotness: u32,

    /// Ticks between two aging rounds
    #[serde(default = "PolicyConfig::default_aging_interval")]
    pub aging_interval: Tick,

    /// Blocks the near tier can hold on behalf of other tiers (cache lines for `TwoLevel`)
    #[serde(default = "PolicyConfig::default_near_capacity")]
    pub near_capacity_blocks: usize,
}

impl PolicyConfig {
    /// Returns the default promotion threshold.
    fn default_hot_threshold() -> u32 {
        defaults::HOT_THRESHOLD
    }

    /// Returns the default demotion threshold.
    fn default_cold_threshold() -> u32 {
        defaults::COLD_THRESHOLD
    }

    /// Returns the default hotness saturation value.
    fn default_max_hotness() -> u32 {
        defaults::MAX_HOTNESS
    }

    /// Returns the default aging interval in ticks.
    fn default_aging_interval() -> Tick {
        defaults::AGING_INTERVAL
    }

    /// Returns the default number of near migration slots.
    fn default_near_capacity() -> usize {
        defaults::NEAR_CAPACITY_BLOCKS
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.aging_interval == 0 {
            return Err(ConfigError::ZeroAgingInterval);
        }
        if self.kind == PolicyKind::Static {
            return Ok(());
        }
        if self.near_capacity_blocks == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.kind == PolicyKind::TwoLevel {
            return Ok(());
        }
        if self.hot_threshold == 0
            || self.hot_threshold > self.max_hotness
            || self.cold_threshold > self.hot_threshold
        {
            return Err(ConfigError::Thresholds {
                hot: self.hot_threshold,
                cold: self.cold_threshold,
                max: self.max_hotness,
            });
        }
        Ok(())
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            kind: PolicyKind::default(),
            hot_threshold: defaults::HOT_THRESHOLD,
            cold_threshold: defaults::COLD_THRESHOLD,
            max_hotness: defaults::MAX_HOTNESS,
            aging_interval: defaults::AGING_INTERVAL,
            near_capacity_blocks: defaults::NEAR_CAPACITY_BLOCKS,
        }
    }
}
