//! Heterogeneous memory migration controller library.
//!
//! This crate models a memory controller sitting in front of a fast, small
//! near tier, a slow, large far tier and an optional backup tier. It provides:
//! 1. **Address Mapping:** Static home regions per tier plus a remap table for moved blocks.
//! 2. **Tiers:** Latency and bandwidth timed backends with lazily allocated storage.
//! 3. **Policy:** Hot/cold tracking that promotes hot blocks and demotes cold ones,
//!    or a direct-mapped write-back near cache in the `TwoLevel` mode.
//! 4. **Routing:** Request admission, splitting, per-block ordering and migration copies.
//! 5. **Statistics:** Named counters describing traffic and migration activity.
//!
//! The controller is driven by an external discrete-event scheduler through
//! `HumController::submit`, `HumController::advance` and `HumController::next_event_tick`.

/// Common types (addresses, blocks, access kinds, ports, errors).
pub mod common;
/// Controller configuration (defaults, tier and policy parameters, validation).
pub mod config;
/// Address space map, remap table, near migration slots and cache tags.
pub mod map;
/// Migration policy engine and policies.
pub mod policy;
/// Request router and migration orchestration.
pub mod router;
/// Controller statistics collection and reporting.
pub mod stats;
/// Memory tier backends and timing.
pub mod tier;

/// Root configuration type; use `Config::default()` or deserialize from JSON.
pub use crate::config::Config;
/// The controller; construct with `HumController::new`.
pub use crate::router::HumController;
/// Request and response types exchanged with CPU-side ports.
pub use crate::router::request::{Request, RequestId, Response, SimContext};
