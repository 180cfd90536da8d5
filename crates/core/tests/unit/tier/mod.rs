
/// Timed tiers and backend sets.
pub mod backends;
