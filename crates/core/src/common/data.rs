//! Memory Access Types.
//!
//! This module defines how accesses are classified throughout the controller.
//! These types are used for the following:
//! 1. **Timing:** Tiers charge independent read and write latencies.
//! 2. **Policy:** The policy engine is told the kind of every routed access.
//! 3. **Statistics Tracking:** Per-tier read/write counters.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of memory access carried by a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessKind {
    /// Data is returned to the requester.
    Read,

    /// The request carries a payload to store; the response is an acknowledgement.
    Write,
}

impl AccessKind {
    /// Returns `true` for [`AccessKind::Write`].
    #[inline]
    pub const fn is_write(self) -> bool {
        matches!(self, Self::Write)
    }
}

impl fmt::Display for AccessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => write!(f, "R"),
            Self::Write => write!(f, "W"),
        }
    }
}

/// Identifies one of the CPU-side endpoints registered at configuration time.
///
/// By convention port 0 carries instruction fetches, port 1 data and port 2
/// system traffic; the controller only checks that the index is registered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PortId(pub usize);

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cpu_side[{}]", self.0)
    }
}
