//! Common utilities and types used throughout the controller.
//!
//! This module provides the building blocks shared by every component. It includes:
//! 1. **Address Types:** Address ranges, block addresses and the tick alias.
//! 2. **Access Types:** Read/write classification and CPU-side port identifiers.
//! 3. **Error Handling:** Configuration and runtime error enums.

/// Address range, block address and tick definitions.
pub mod addr;

/// Memory access type definitions.
pub mod data;

/// Error types.
pub mod error;

pub use addr::{AddressRange, BlockAddr, Tick};
pub use data::{AccessKind, PortId};
pub use error::{ConfigError, HumError, Result};
