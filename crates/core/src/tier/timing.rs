//! Tier latency and bandwidth model.
//!
//! Each tier charges a fixed per-kind latency plus a transfer time proportional
//! to the access size. Transfers serialise on the tier: an access issued while
//! the previous transfer is still in flight starts when that transfer ends.

use crate::common::{AccessKind, Tick};
use crate::config::TierConfig;

/// Timing of a single tier access.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TierAccess {
    /// Tick the transfer actually began (after any bandwidth stall).
    pub started_at: Tick,
    /// Tick the data (or write acknowledgement) is available.
    pub completed_at: Tick,
}

impl TierAccess {
    /// Returns `true` if the access had to wait for the tier.
    #[inline]
    pub const fn stalled_from(&self, issued_at: Tick) -> bool {
        self.started_at > issued_at
    }
}

/// Stateful latency model for one tier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TierTiming {
    read_latency: Tick,
    write_latency: Tick,
    ticks_per_byte: Tick,
    busy_until: Tick,
}

impl TierTiming {
    /// Creates a timing model with the given latencies and per-byte transfer cost.
    ///
    /// # Arguments
    ///
    /// * `read_latency` - Ticks from transfer end to data availability on reads.
    /// * `write_latency` - Ticks from transfer end to acknowledgement on writes.
    /// * `ticks_per_byte` - Transfer cost; `0` removes bandwidth gating.
    pub const fn new(read_latency: Tick, write_latency: Tick, ticks_per_byte: Tick) -> Self {
        Self {
            read_latency,
            write_latency,
            ticks_per_byte,
            busy_until: 0,
        }
    }

    /// Builds the model from a tier configuration.
    pub const fn from_config(cfg: &TierConfig) -> Self {
        Self::new(cfg.read_latency, cfg.write_latency, cfg.ticks_per_byte)
    }

    /// Returns the fixed latency for `kind`.
    #[inline]
    pub const fn latency(&self, kind: AccessKind) -> Tick {
        match kind {
            AccessKind::Read => self.read_latency,
            AccessKind::Write => self.write_latency,
        }
    }

    /// Returns the tick at which the tier's last transfer ends.
    #[inline]
    pub const fn busy_until(&self) -> Tick {
        self.busy_until
    }

    /// Returns the uncontended cost of moving `size` bytes.
    pub const fn unloaded_cost(&self, kind: AccessKind, size: u64) -> Tick {
        size.saturating_mul(self.ticks_per_byte)
            .saturating_add(self.latency(kind))
    }

    /// Books an access of `size` bytes issued at `issued_at` and returns its timing.
    ///
    /// # Arguments
    ///
    /// * `issued_at` - Tick the access reaches the tier.
    /// * `kind` - Read or write.
    /// * `size` - Bytes transferred.
    ///
    /// # Returns
    ///
    /// The start and completion ticks; the tier stays busy until the transfer ends.
    pub fn access(&mut self, issued_at: Tick, kind: AccessKind, size: u64) -> TierAccess {
        let started_at = issued_at.max(self.busy_until);
        let transfer = size.saturating_mul(self.ticks_per_byte);
        let transfer_end = started_at.saturating_add(transfer);
        self.busy_until = transfer_end;
        TierAccess {
            started_at,
            completed_at: transfer_end.saturating_add(self.latency(kind)),
        }
    }
}
