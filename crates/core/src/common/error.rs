//! Error definitions.
//!
//! This module defines the two error families of the controller. It provides:
//! 1. **Configuration errors:** Raised while validating a `Config`; always fatal.
//! 2. **Runtime errors:** Raised by request submission, tier access and time handling.
//! 3. **Result alias:** `Result<T>` defaulting to `HumError`.
//!
//! Contention (a saturated tier, a migrating block) is never reported as an
//! error: such requests are queued and replayed internally.

use thiserror::Error;

use super::addr::{AddressRange, Tick};
use super::data::PortId;
use crate::tier::Tier;

/// Problems detected while validating a configuration.
///
/// Every variant aborts controller construction.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A tier region covers no addresses.
    #[error("{0} region is empty")]
    EmptyRange(Tier),

    /// Two tier regions share addresses.
    #[error("{a} region {a_range} overlaps {b} region {b_range}")]
    Overlap {
        /// First tier.
        a: Tier,
        /// Region of the first tier.
        a_range: AddressRange,
        /// Second tier.
        b: Tier,
        /// Region of the second tier.
        b_range: AddressRange,
    },

    /// A region does not start and end on a block boundary.
    #[error("{tier} region {range} is not aligned to the {block_size}-byte block size")]
    Misaligned {
        /// Offending tier.
        tier: Tier,
        /// Its region.
        range: AddressRange,
        /// Configured block size.
        block_size: u64,
    },

    /// A read or write latency of zero was configured.
    #[error("{0} latency must be positive")]
    ZeroLatency(Tier),

    /// The block size is zero or not a power of two.
    #[error("block size {0} must be a non-zero power of two")]
    BlockSize(u64),

    /// No CPU-side ports were registered.
    #[error("at least one CPU-side port is required")]
    NoPorts,

    /// The near tier was given no migration slots under a migrating policy.
    #[error("near capacity must be at least one block")]
    ZeroCapacity,

    /// The aging interval is zero.
    #[error("aging interval must be positive")]
    ZeroAgingInterval,

    /// Hotness thresholds are inconsistent.
    #[error("invalid thresholds: hot={hot} cold={cold} max={max}")]
    Thresholds {
        /// Promotion threshold.
        hot: u32,
        /// Demotion threshold.
        cold: u32,
        /// Saturation value of the hotness counter.
        max: u32,
    },

    /// A backend handed to the controller does not match its configured tier.
    #[error("{tier} backend has {actual} bytes, {expected} required")]
    BackendSize {
        /// Tier of the backend.
        tier: Tier,
        /// Bytes the controller needs.
        expected: u64,
        /// Bytes the backend exposes.
        actual: u64,
    },

    /// A configured tier has no backend, or a backend has no configured tier.
    #[error("{0} backend does not match the configured tiers")]
    BackendMismatch(Tier),

    /// The configuration text could not be parsed.
    #[error("cannot parse configuration: {0}")]
    Parse(String),

    /// The configuration file could not be read.
    #[error("cannot read configuration file: {0}")]
    Io(String),
}

/// Runtime errors reported by the controller.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum HumError {
    /// Construction failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A request touched an address outside every configured region.
    ///
    /// This is a caller defect; the controller halts after reporting it.
    #[error("access [{addr:#x}, +{size}) lies outside the configured address space")]
    AddressOutOfRange {
        /// Start of the access.
        addr: u64,
        /// Length of the access in bytes.
        size: u64,
    },

    /// A request named a port that was never registered.
    #[error("{0} is not a registered port")]
    UnknownPort(PortId),

    /// A request of zero bytes.
    #[error("request size must be positive")]
    ZeroSize,

    /// A write payload whose length differs from the request size.
    #[error("write payload is {actual} bytes, request size is {expected}")]
    PayloadSize {
        /// Declared request size.
        expected: u64,
        /// Bytes actually supplied.
        actual: u64,
    },

    /// The caller's context went back in time.
    #[error("time went backwards: {now} < {last}")]
    TimeWentBackwards {
        /// Time presented by the caller.
        now: Tick,
        /// Latest time already observed.
        last: Tick,
    },

    /// A tier access fell outside that tier's physical storage.
    #[error("{tier} access at offset {offset:#x} (+{len}) exceeds {size} bytes")]
    TierOutOfBounds {
        /// Tier accessed.
        tier: Tier,
        /// Physical offset.
        offset: u64,
        /// Access length.
        len: u64,
        /// Size of the tier.
        size: u64,
    },

    /// The backing store for a tier could not be allocated.
    #[error("cannot allocate {0} bytes of tier storage")]
    Allocation(u64),

    /// The controller stopped after a fatal addressing error.
    #[error("controller halted after a fatal error")]
    Halted,

    /// The controller was shut down and accepts no new requests.
    #[error("controller is shut down")]
    ShutDown,
}

/// Result type used across the crate.
pub type Result<T, E = HumError> = std::result::Result<T, E>;
