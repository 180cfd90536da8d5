//! Hot/Cold Migration Policy.
//!
//! Each block carries a saturating hotness counter incremented on every routed
//! access. A block living in a slow tier is promoted once its counter reaches
//! the hot threshold. Aging halves every counter; a migrated near-resident
//! block that cools below the cold threshold is sent back home.
//!
//! # Eviction
//!
//! When the near slots are full, a promotion may displace a near-resident
//! block only if that block is itself not hot and is strictly colder than
//! the candidate. This keeps two equally hot blocks from evicting each other
//! on alternate accesses.

use super::{BlockMeta, MigrationPolicy};
use crate::common::{AccessKind, Tick};
use crate::config::PolicyConfig;

/// Two-threshold hotness policy with periodic halving.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HotColdPolicy {
    hot: u32,
    cold: u32,
    max: u32,
    interval: Tick,
}

impl HotColdPolicy {
    /// Creates a policy instance.
    ///
    /// # Arguments
    ///
    /// * `hot` - Hotness at which a slow-tier block is promoted.
    /// * `cold` - Aged hotness below which a near-resident block is demoted.
    /// * `max` - Saturation value of the counter.
    /// * `interval` - Ticks between aging rounds.
    pub const fn new(hot: u32, cold: u32, max: u32, interval: Tick) -> Self {
        Self {
            hot,
            cold,
            max,
            interval,
        }
    }

    /// Builds the policy from its configuration.
    pub const fn from_config(cfg: &PolicyConfig) -> Self {
        Self::new(
            cfg.hot_threshold,
            cfg.cold_threshold,
            cfg.max_hotness,
            cfg.aging_interval,
        )
    }
}

impl MigrationPolicy for HotColdPolicy {
    fn name(&self) -> &'static str {
        "HotCold"
    }

    /// Bumps the counter, saturating at `max`.
    fn record_access(&mut self, meta: &mut BlockMeta, _kind: AccessKind) {
        meta.hotness = meta.hotness.saturating_add(1).min(self.max);
    }

    fn should_promote(&self, meta: &BlockMeta) -> bool {
        meta.hotness >= self.hot
    }

    fn is_evictable(&self, victim: &BlockMeta, candidate: &BlockMeta) -> bool {
        victim.hotness < self.hot && victim.hotness < candidate.hotness
    }

    /// Halves the counter and reports whether the block is now cold.
    fn age(&mut self, meta: &mut BlockMeta) -> bool {
        meta.hotness /= 2;
        meta.hotness < self.cold
    }

    fn aging_interval(&self) -> Option<Tick> {
        Some(self.interval)
    }
}
