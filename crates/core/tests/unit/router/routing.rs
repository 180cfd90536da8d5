//! Routing Tests.
//!
//! Verifies home resolution, tier timing as seen through the controller,
//! request splitting and functional access.

use humsim_core::common::AccessKind;
use humsim_core::config::PolicyKind;
use humsim_core::policy::BlockState;
use humsim_core::stats::CounterSnapshot;
use humsim_core::tier::Tier;
use pretty_assertions::assert_eq;

use crate::common::harness::{pattern, small_config, with_backup, Harness, BLOCK, FAR, NEAR};

// ══════════════════════════════════════════════════════════
// 1. Single-block requests
// ══════════════════════════════════════════════════════════

#[test]
fn far_read_pays_far_timing() {
    let mut h = Harness::new();
    let id = h.read(0, 0x100, 16);
    let out = h.drain();
    assert_eq!(out.len(), 1);
    let r = h.response(id);
    assert_eq!(r.completed_at, 16 * 2 + 100);
    assert_eq!(r.kind, AccessKind::Read);
    assert_eq!(r.data, Some(vec![0; 16]));

    let c = h.counters();
    assert_eq!(c.get("far.reads"), Some(1));
    assert_eq!(c.get("far.bytes_read"), Some(16));
    assert_eq!(c.get("near.reads"), Some(0));
    assert_eq!(c.get("responses"), Some(1));
}

#[test]
fn near_write_pays_near_timing() {
    let mut h = Harness::new();
    let addr = NEAR.start + BLOCK;
    let id = h.write(5, addr, &[0xab; 8]);
    let _ = h.drain();
    assert_eq!(h.response(id).completed_at, 5 + 8 + 12);
    assert_eq!(h.response(id).data, None);
    assert_eq!(h.peek(addr, 8), vec![0xab; 8]);
    assert_eq!(h.hum.resident_tier(addr), Some(Tier::Near));
    assert_eq!(h.hum.block_state(addr), Some(BlockState::Resident(Tier::Near)));
    assert_eq!(h.counters().get("near.bytes_written"), Some(8));
}

#[test]
fn near_homed_blocks_never_migrate() {
    let mut h = Harness::new();
    for i in 0..20 {
        let _ = h.read(i * 10, NEAR.start, 8);
    }
    let _ = h.drain();
    assert_eq!(h.counters().get("migrations"), Some(0));
    assert_eq!(h.hum.near_occupancy(), 0);
}

#[test]
fn busy_tier_stalls_the_next_access() {
    let mut h = Harness::new();
    let a = h.read(0, 0, 8);
    let b = h.read(0, 0x200, 8);
    let _ = h.drain();
    assert_eq!(h.response(a).completed_at, 116);
    assert_eq!(h.response(b).completed_at, 132);
    assert_eq!(h.counters().get("saturation_stalls"), Some(1));
}

#[test]
fn unmapped_queries_return_none() {
    let h = Harness::new();
    assert_eq!(h.hum.block_state(NEAR.end), None);
    assert_eq!(h.hum.resident_tier(NEAR.end + 100), None);
    assert_eq!(h.hum.block_state(FAR.start), Some(BlockState::Resident(Tier::Far)));
}

// ══════════════════════════════════════════════════════════
// 2. Splitting
// ══════════════════════════════════════════════════════════

#[test]
fn request_spanning_two_blocks_is_split() {
    let mut h = Harness::new();
    let data = pattern(7, 8);
    h.hum.functional_write(BLOCK - 4, &data).unwrap();

    let id = h.read(0, BLOCK - 4, 8);
    let out = h.drain();
    assert_eq!(out.len(), 1);
    let r = h.response(id);
    assert_eq!(r.data, Some(data));
    assert_eq!((r.addr, r.size), (BLOCK - 4, 8));
    // Second half waits for the first half's transfer.
    assert_eq!(r.completed_at, 8 + 8 + 100);

    let c = h.counters();
    assert_eq!(c.get("split_requests"), Some(1));
    assert_eq!(c.get("requests"), Some(1));
    assert_eq!(c.get("responses"), Some(1));
    assert_eq!(c.get("far.reads"), Some(2));
    assert_eq!(c.get("far.bytes_read"), Some(8));
}

#[test]
fn split_write_lands_in_both_tiers() {
    let mut h = Harness::new();
    let data = pattern(3, 8);
    let id = h.write(0, FAR.end - 4, &data);
    let _ = h.drain();

    assert_eq!(h.peek(FAR.end - 4, 8), data);
    let c = h.counters();
    assert_eq!(c.get("far.writes"), Some(1));
    assert_eq!(c.get("near.writes"), Some(1));
    // The far half is the slower one.
    assert_eq!(h.response(id).completed_at, 4 * 2 + 300);
}

#[test]
fn many_block_request_produces_one_response() {
    let mut h = Harness::new();
    let data = pattern(11, 4 * BLOCK as usize);
    let w = h.write(0, 2 * BLOCK, &data);
    let r = h.read(1, 2 * BLOCK, 4 * BLOCK);
    let out = h.drain();
    assert_eq!(out.len(), 2);
    assert_eq!(h.response(r).data, Some(data));
    assert!(h.response(w).completed_at <= h.response(r).completed_at);
    assert_eq!(h.counters().get("split_requests"), Some(2));
    assert_eq!(h.counters().get("far.reads"), Some(4));
}

// ══════════════════════════════════════════════════════════
// 3. Functional access
// ══════════════════════════════════════════════════════════

#[test]
fn functional_access_is_invisible() {
    let mut h = Harness::new();
    let data = pattern(1, 200);
    h.hum.functional_write(FAR.end - 100, &data).unwrap();
    assert_eq!(h.peek(FAR.end - 100, 200), data);
    assert_eq!(h.counters(), CounterSnapshot::default());

    // Tier timing is unaffected.
    let id = h.read(0, 0, 8);
    let _ = h.drain();
    assert_eq!(h.response(id).completed_at, 116);
}

// ══════════════════════════════════════════════════════════
// 4. Policies and tiers
// ══════════════════════════════════════════════════════════

#[test]
fn static_policy_routes_home_forever() {
    let mut config = small_config();
    config.policy.kind = PolicyKind::Static;
    let mut h = Harness::with_config(config);
    for i in 0..50 {
        let _ = h.read(i * 10, 0, 8);
    }
    let _ = h.drain();
    let _ = h.advance(10 * 1_000_000);

    let c = h.counters();
    assert_eq!(c.get("far.reads"), Some(50));
    assert_eq!(c.get("migrations"), Some(0));
    assert_eq!(c.get("aging_rounds"), Some(0));
    assert_eq!(h.hum.resident_tier(0), Some(Tier::Far));
    assert_eq!(h.hum.next_event_tick(), None);
}

#[test]
fn backup_blocks_are_promoted() {
    let mut h = Harness::with_config(with_backup());
    let base = 5120;
    let data = pattern(9, BLOCK as usize);
    h.hum.functional_write(base, &data).unwrap();

    h.heat(0, base);
    assert_eq!(h.hum.resident_tier(base), Some(Tier::Near));
    assert_eq!(h.peek(base, BLOCK as usize), data);

    let c = h.counters();
    assert_eq!(c.get("migrations"), Some(1));
    assert_eq!(c.get("backup.reads"), Some(3));
    assert_eq!(c.get("backup.extra_reads"), Some(1));
    assert_eq!(c.get("near.extra_writes"), Some(1));

    // Once promoted, the block is served by the near tier.
    let id = h.read(10_000, base + 8, 8);
    let _ = h.drain();
    assert_eq!(h.response(id).data, Some(data[8..16].to_vec()));
    assert_eq!(h.response(id).completed_at, 10_000 + 8 + 10);
    assert_eq!(h.counters().get("near.reads"), Some(1));
}
