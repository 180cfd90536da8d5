//! Controller statistics collection and reporting.
//!
//! This module tracks what the controller did. It provides:
//! 1. **Traffic:** Requests, responses and split requests on the CPU side.
//! 2. **Per-tier counters:** CPU-originated reads/writes and bytes, plus the
//!    extra reads/writes issued by migration copies.
//! 3. **Migration:** Promotions, demotions, evictions, deferrals and aging rounds.
//! 4. **Time accounting:** Extra time spent copying, block-ticks spent migrating
//!    and block-ticks promoted blocks spent in the near tier.
//! 5. **Cache:** Hits, misses and dirty write-backs of the `TwoLevel` near cache.
//! 6. **Gauge:** Promoted blocks currently resident in the near tier.
//!
//! Counters only grow; they are reset only when a controller is constructed.

use serde::Serialize;
use std::fmt;

use crate::common::{AccessKind, Tick};
use crate::tier::Tier;

/// Counters for one tier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TierCounters {
    /// CPU-originated reads served by the tier.
    pub reads: u64,
    /// CPU-originated writes served by the tier.
    pub writes: u64,
    /// Bytes read on behalf of the CPU side.
    pub bytes_read: u64,
    /// Bytes written on behalf of the CPU side.
    pub bytes_written: u64,
    /// Reads issued by migration copies.
    pub extra_reads: u64,
    /// Writes issued by migration copies.
    pub extra_writes: u64,
}

impl TierCounters {
    /// Records one CPU-originated access of `size` bytes.
    pub const fn record(&mut self, kind: AccessKind, size: u64) {
        match kind {
            AccessKind::Read => {
                self.reads += 1;
                self.bytes_read += size;
            }
            AccessKind::Write => {
                self.writes += 1;
                self.bytes_written += size;
            }
        }
    }

    /// Records one migration-originated access.
    pub const fn record_extra(&mut self, kind: AccessKind) {
        match kind {
            AccessKind::Read => self.extra_reads += 1,
            AccessKind::Write => self.extra_writes += 1,
        }
    }
}

/// Monotonic controller counters.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Counters {
    /// Near tier counters.
    pub near: TierCounters,
    /// Far tier counters.
    pub far: TierCounters,
    /// Backup tier counters (zero when the tier is absent).
    pub backup: TierCounters,

    /// Requests accepted.
    pub requests: u64,
    /// Responses produced.
    pub responses: u64,
    /// Requests spanning more than one block.
    pub split_requests: u64,

    /// Promotions into the near tier.
    pub migrations: u64,
    /// Moves out of the near tier (aging and swap demotions).
    pub demotions: u64,
    /// Demotions forced by a swap.
    pub evictions: u64,
    /// Blocks whose promotion waited for a free slot, counted once per wait.
    pub deferred_migrations: u64,
    /// Sub-requests held back because their block was migrating.
    pub suspended_requests: u64,
    /// Tier accesses that waited for a busy tier.
    pub saturation_stalls: u64,
    /// Aging rounds executed.
    pub aging_rounds: u64,

    /// Near cache lookups that found their block.
    pub cache_hits: u64,
    /// Near cache lookups that had to fill a line.
    pub cache_misses: u64,
    /// Dirty lines copied back to their home on a miss.
    pub cache_writebacks: u64,

    /// Ticks spent copying blocks.
    pub extra_time_consumption: u64,
    /// Block-ticks spent in the migrating state.
    pub migrating_ticks: u64,
    /// Block-ticks promoted blocks spent in the near tier, credited on departure.
    pub near_residency_ticks: u64,
}

impl Counters {
    /// Returns the counters of `tier`.
    pub const fn tier(&self, tier: Tier) -> &TierCounters {
        match tier {
            Tier::Near => &self.near,
            Tier::Far => &self.far,
            Tier::Backup => &self.backup,
        }
    }

    /// Returns the counters of `tier` mutably.
    pub const fn tier_mut(&mut self, tier: Tier) -> &mut TierCounters {
        match tier {
            Tier::Near => &mut self.near,
            Tier::Far => &mut self.far,
            Tier::Backup => &mut self.backup,
        }
    }

    /// Adds the cost of one migration copy.
    pub const fn add_extra_time(&mut self, ticks: Tick) {
        self.extra_time_consumption = self.extra_time_consumption.saturating_add(ticks);
    }
}

/// Point-in-time copy of the counters plus the near-resident gauge.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CounterSnapshot {
    /// Monotonic counters.
    #[serde(flatten)]
    pub counters: Counters,
    /// Promoted blocks currently in the near tier.
    pub near_resident: u64,
}

impl CounterSnapshot {
    /// Captures `counters` together with the current gauge value.
    pub fn new(counters: &Counters, near_resident: u64) -> Self {
        Self {
            counters: counters.clone(),
            near_resident,
        }
    }

    /// Returns every value as a `(name, value)` pair, in a fixed order.
    ///
    /// Per-tier counters are named `<tier>.<counter>`.
    pub fn named(&self) -> Vec<(String, u64)> {
        let c = &self.counters;
        let mut out = Vec::with_capacity(36);
        for tier in Tier::ALL {
            let t = c.tier(tier);
            for (name, value) in [
                ("reads", t.reads),
                ("writes", t.writes),
                ("bytes_read", t.bytes_read),
                ("bytes_written", t.bytes_written),
                ("extra_reads", t.extra_reads),
                ("extra_writes", t.extra_writes),
            ] {
                out.push((format!("{tier}.{name}"), value));
            }
        }
        for (name, value) in [
            ("requests", c.requests),
            ("responses", c.responses),
            ("split_requests", c.split_requests),
            ("migrations", c.migrations),
            ("demotions", c.demotions),
            ("evictions", c.evictions),
            ("deferred_migrations", c.deferred_migrations),
            ("suspended_requests", c.suspended_requests),
            ("saturation_stalls", c.saturation_stalls),
            ("aging_rounds", c.aging_rounds),
            ("cache_hits", c.cache_hits),
            ("cache_misses", c.cache_misses),
            ("cache_writebacks", c.cache_writebacks),
            ("extra_time_consumption", c.extra_time_consumption),
            ("migrating_ticks", c.migrating_ticks),
            ("near_residency_ticks", c.near_residency_ticks),
            ("near_resident", self.near_resident),
        ] {
            out.push((name.to_owned(), value));
        }
        out
    }

    /// Looks up a single value by its `named()` name.
    pub fn get(&self, name: &str) -> Option<u64> {
        self.named()
            .into_iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }
}

impl fmt::Display for CounterSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "==========================================================")?;
        writeln!(f, "HETEROGENEOUS MEMORY CONTROLLER STATISTICS")?;
        writeln!(f, "==========================================================")?;
        for (name, value) in self.named() {
            writeln!(f, "{name:<32} {value}")?;
        }
        write!(f, "==========================================================")
    }
}
