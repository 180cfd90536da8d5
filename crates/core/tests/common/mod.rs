//! Shared test infrastructure.

/// Controller harness and configuration helpers.
pub mod harness;

/// Mock tier backends.
pub mod mocks;
