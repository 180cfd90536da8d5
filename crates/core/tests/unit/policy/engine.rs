//! Policy Engine Unit Tests.
//!
//! Verifies the per-block state machine, victim selection order and aging.

use humsim_core::common::{AccessKind, BlockAddr, Tick};
use humsim_core::config::{PolicyConfig, PolicyKind};
use humsim_core::policy::{BlockState, MigrationOutcome, PolicyEngine};
use humsim_core::tier::Tier;
use pretty_assertions::assert_eq;

fn engine() -> PolicyEngine {
    PolicyEngine::from_config(&PolicyConfig {
        kind: PolicyKind::HotCold,
        hot_threshold: 3,
        cold_threshold: 1,
        max_hotness: 15,
        aging_interval: 1000,
        near_capacity_blocks: 4,
    })
}

fn touch(engine: &mut PolicyEngine, block: BlockAddr, times: u32, now: Tick) -> bool {
    let mut wants = false;
    for _ in 0..times {
        wants = engine.observe(block, Tier::Far, Tier::Far, AccessKind::Read, now);
    }
    wants
}

/// Runs a full promotion of `block` completing at `at`.
fn promote(engine: &mut PolicyEngine, block: BlockAddr, at: Tick) {
    let _ = engine.begin_migration(block, Tier::Near, at);
    let _ = engine.complete_migration(block, at);
}

// ══════════════════════════════════════════════════════════
// 1. Observation
// ══════════════════════════════════════════════════════════

#[test]
fn third_access_requests_promotion() {
    let mut e = engine();
    let b = BlockAddr(0);
    assert!(!touch(&mut e, b, 2, 0));
    assert!(touch(&mut e, b, 1, 0));
    assert_eq!(e.meta(b).map(|m| m.hotness), Some(3));
}

#[test]
fn near_home_blocks_are_never_promoted() {
    let mut e = engine();
    for _ in 0..10 {
        assert!(!e.observe(BlockAddr(4096), Tier::Near, Tier::Near, AccessKind::Write, 0));
    }
}

#[test]
fn promotion_follows_the_serving_tier() {
    let mut e = engine();
    let b = BlockAddr(0);
    let _ = touch(&mut e, b, 3, 0);
    promote(&mut e, b, 10);
    // Home is far, but the access was served near: nothing to promote.
    assert!(!e.observe(b, Tier::Far, Tier::Near, AccessKind::Read, 20));
    assert_eq!(e.meta(b).map(|m| m.hotness), Some(4));
}

#[test]
fn wants_promotion_needs_a_hot_slow_resident() {
    let mut e = engine();
    let b = BlockAddr(64);
    assert!(!e.wants_promotion(b));
    let _ = touch(&mut e, b, 2, 0);
    assert!(!e.wants_promotion(b));
    let _ = touch(&mut e, b, 1, 0);
    assert!(e.wants_promotion(b));
    let _ = e.begin_migration(b, Tier::Near, 5);
    assert!(!e.wants_promotion(b));
}

#[test]
fn migrating_block_is_not_promoted_again() {
    let mut e = engine();
    let b = BlockAddr(64);
    let _ = touch(&mut e, b, 3, 0);
    assert_eq!(e.begin_migration(b, Tier::Near, 5), Some(Tier::Far));
    assert!(!touch(&mut e, b, 1, 6));
    assert_eq!(e.begin_migration(b, Tier::Near, 7), None);
}

// ══════════════════════════════════════════════════════════
// 2. State machine
// ══════════════════════════════════════════════════════════

#[test]
fn resident_migrating_resident() {
    let mut e = engine();
    let b = BlockAddr(128);
    let _ = touch(&mut e, b, 3, 0);
    let _ = e.begin_migration(b, Tier::Near, 10);
    assert_eq!(
        e.state(b),
        Some(BlockState::Migrating {
            from: Tier::Far,
            to: Tier::Near,
            since: 10
        })
    );
    assert_eq!(e.near_resident_count(), 0);

    let outcome = e.complete_migration(b, 50);
    assert_eq!(
        outcome,
        Some(MigrationOutcome {
            from: Tier::Far,
            to: Tier::Near,
            since: 10,
            near_residency: None,
        })
    );
    assert_eq!(e.state(b), Some(BlockState::Resident(Tier::Near)));
    assert_eq!(e.near_resident_count(), 1);
    assert_eq!(e.meta(b).and_then(|m| m.last_migrated), Some(50));
}

#[test]
fn demotion_reports_near_residency() {
    let mut e = engine();
    let b = BlockAddr(0);
    let _ = touch(&mut e, b, 3, 0);
    promote(&mut e, b, 100);
    let _ = e.begin_migration(b, Tier::Far, 400);
    assert_eq!(e.near_resident_count(), 0);
    let outcome = e.complete_migration(b, 450).unwrap();
    assert_eq!(outcome.near_residency, Some(350));
    assert_eq!(e.state(b), Some(BlockState::Resident(Tier::Far)));
}

#[test]
fn completing_a_resident_block_is_ignored() {
    let mut e = engine();
    let _ = touch(&mut e, BlockAddr(0), 1, 0);
    assert_eq!(e.complete_migration(BlockAddr(0), 10), None);
    assert_eq!(e.complete_migration(BlockAddr(999 * 64), 10), None);
}

// ══════════════════════════════════════════════════════════
// 3. Victim selection
// ══════════════════════════════════════════════════════════

#[test]
fn coldest_resident_is_chosen() {
    let mut e = engine();
    let (a, b, c) = (BlockAddr(0), BlockAddr(64), BlockAddr(128));
    let _ = touch(&mut e, a, 3, 0);
    promote(&mut e, a, 10);
    let _ = touch(&mut e, b, 3, 0);
    promote(&mut e, b, 20);
    // One aging round leaves `a` at 2 and `b` at 1, neither below cold.
    let _ = touch(&mut e, a, 1, 30);
    let _ = e.age();
    assert_eq!(e.meta(a).map(|m| m.hotness), Some(2));
    assert_eq!(e.meta(b).map(|m| m.hotness), Some(1));

    let _ = touch(&mut e, c, 3, 40);
    assert_eq!(e.select_victim(c), Some(b));
}

#[test]
fn ties_prefer_least_recently_migrated() {
    let mut e = engine();
    let (a, b, c) = (BlockAddr(0), BlockAddr(64), BlockAddr(128));
    let _ = touch(&mut e, b, 3, 0);
    promote(&mut e, b, 10);
    let _ = touch(&mut e, a, 3, 0);
    promote(&mut e, a, 20);
    let _ = e.age();
    // Both at hotness 1; `b` migrated earlier despite the higher address.
    let _ = touch(&mut e, c, 3, 30);
    assert_eq!(e.select_victim(c), Some(b));
}

#[test]
fn hot_residents_are_not_evicted() {
    let mut e = engine();
    let (a, c) = (BlockAddr(0), BlockAddr(64));
    let _ = touch(&mut e, a, 3, 0);
    promote(&mut e, a, 10);
    let _ = touch(&mut e, c, 15, 20);
    assert_eq!(e.select_victim(c), None);
}

// ══════════════════════════════════════════════════════════
// 4. Aging
// ══════════════════════════════════════════════════════════

#[test]
fn aging_returns_cold_promoted_blocks_in_address_order() {
    let mut e = engine();
    for addr in [192, 0, 64] {
        let b = BlockAddr(addr);
        let _ = touch(&mut e, b, 3, 0);
        promote(&mut e, b, 10);
    }
    // A far-resident block going cold is not a demotion candidate.
    let _ = touch(&mut e, BlockAddr(256), 1, 0);

    assert!(e.age().is_empty());
    assert_eq!(
        e.age(),
        vec![BlockAddr(0), BlockAddr(64), BlockAddr(192)]
    );
}

#[test]
fn quiescence_tracks_hotness_and_residents() {
    let mut e = engine();
    assert!(e.is_quiescent());
    let _ = touch(&mut e, BlockAddr(0), 2, 0);
    assert!(!e.is_quiescent());
    let _ = e.age();
    let _ = e.age();
    assert!(e.is_quiescent());
}

#[test]
fn cold_blocks_at_home_are_forgotten() {
    let mut e = engine();
    let (a, b) = (BlockAddr(0), BlockAddr(64));
    let _ = touch(&mut e, a, 1, 0);
    let _ = touch(&mut e, b, 3, 0);
    promote(&mut e, b, 10);
    assert_eq!(e.tracked_blocks(), 2);

    // `a` reaches zero at home and is dropped; `b` is cold but still near.
    let _ = e.age();
    assert_eq!(e.tracked_blocks(), 1);
    assert_eq!(e.meta(a), None);
    assert_eq!(e.age(), vec![b]);
    assert_eq!(e.tracked_blocks(), 1);
    assert!(!e.is_quiescent());
}

#[test]
fn static_engine_never_ages() {
    let e = PolicyEngine::from_config(&PolicyConfig {
        kind: PolicyKind::Static,
        ..PolicyConfig::default()
    });
    assert_eq!(e.aging_interval(), None);
    assert_eq!(e.policy_name(), "Static");
}
