//! Tier Backend Unit Tests.
//!
//! Verifies `TimedTier` data and timing, and `TierSet` construction checks.

use humsim_core::common::{ConfigError, HumError};
use humsim_core::tier::{Tier, TierBackend, TierSet, TimedTier};
use pretty_assertions::assert_eq;

use crate::common::harness::{small_config, with_backup};
use crate::common::mocks::tier::boxed_identity;

// ══════════════════════════════════════════════════════════
// 1. TimedTier
// ══════════════════════════════════════════════════════════

#[test]
fn timed_tier_stores_and_times() {
    let cfg = small_config();
    let mut far = TimedTier::new(Tier::Far, &cfg.far, 4096).unwrap();
    let w = far.write(0, 128, &[1, 2, 3, 4]).unwrap();
    assert_eq!(w.completed_at, 4 * 2 + 300);

    let mut buf = [0u8; 4];
    let r = far.read(0, 128, &mut buf).unwrap();
    assert_eq!(buf, [1, 2, 3, 4]);
    assert_eq!(r.started_at, 8);
    assert_eq!(r.completed_at, 8 + 8 + 100);
    assert_eq!(far.busy_until(), 16);
}

#[test]
fn functional_access_leaves_timing_alone() {
    let cfg = small_config();
    let mut near = TimedTier::new(Tier::Near, &cfg.near, 1024).unwrap();
    near.poke(0, &[9; 16]).unwrap();
    let mut buf = [0u8; 16];
    near.peek(0, &mut buf).unwrap();
    assert_eq!(buf, [9; 16]);
    assert_eq!(near.busy_until(), 0);
}

#[test]
fn timed_tier_bounds_are_errors() {
    let cfg = small_config();
    let mut near = TimedTier::new(Tier::Near, &cfg.near, 1024).unwrap();
    let mut buf = [0u8; 8];
    assert_eq!(
        near.read(0, 1020, &mut buf),
        Err(HumError::TierOutOfBounds {
            tier: Tier::Near,
            offset: 1020,
            len: 8,
            size: 1024,
        })
    );
    assert_eq!(near.busy_until(), 0);
}

// ══════════════════════════════════════════════════════════
// 2. TierSet
// ══════════════════════════════════════════════════════════

#[test]
fn from_config_sizes_every_tier() {
    let cfg = with_backup();
    let set = TierSet::from_config(&cfg).unwrap();
    assert_eq!(set.get(Tier::Near).unwrap().size(), 1024 + 4 * 64);
    assert_eq!(set.get(Tier::Far).unwrap().size(), 4096);
    assert_eq!(set.get(Tier::Backup).unwrap().size(), 1024);
}

#[test]
fn missing_tier_lookup_fails() {
    let set = TierSet::from_config(&small_config()).unwrap();
    assert!(matches!(
        set.get(Tier::Backup),
        Err(HumError::Config(ConfigError::BackendMismatch(Tier::Backup)))
    ));
}

#[test]
fn from_backends_accepts_exact_set() {
    let cfg = small_config();
    let set = TierSet::from_backends(
        &cfg,
        vec![
            boxed_identity(Tier::Far, 4096),
            boxed_identity(Tier::Near, 1280),
        ],
    );
    assert!(set.is_ok());
}

#[test]
fn from_backends_rejects_small_backend() {
    let cfg = small_config();
    let err = TierSet::from_backends(
        &cfg,
        vec![
            boxed_identity(Tier::Far, 4096),
            boxed_identity(Tier::Near, 1024),
        ],
    )
    .unwrap_err();
    assert_eq!(
        err,
        HumError::Config(ConfigError::BackendSize {
            tier: Tier::Near,
            expected: 1280,
            actual: 1024,
        })
    );
}

#[test]
fn from_backends_rejects_missing_and_extra() {
    let cfg = small_config();
    let missing = TierSet::from_backends(&cfg, vec![boxed_identity(Tier::Far, 4096)]);
    assert!(matches!(
        missing,
        Err(HumError::Config(ConfigError::BackendMismatch(Tier::Near)))
    ));

    let extra = TierSet::from_backends(
        &cfg,
        vec![
            boxed_identity(Tier::Far, 4096),
            boxed_identity(Tier::Near, 1280),
            boxed_identity(Tier::Backup, 1024),
        ],
    );
    assert!(matches!(
        extra,
        Err(HumError::Config(ConfigError::BackendMismatch(Tier::Backup)))
    ));
}

#[test]
fn from_backends_rejects_duplicates() {
    let cfg = small_config();
    let dup = TierSet::from_backends(
        &cfg,
        vec![
            boxed_identity(Tier::Far, 4096),
            boxed_identity(Tier::Far, 4096),
        ],
    );
    assert!(matches!(
        dup,
        Err(HumError::Config(ConfigError::BackendMismatch(Tier::Far)))
    ));
}
