//! Injected Backend Tests.
//!
//! The controller must route through whatever `TierBackend` it is given and
//! trust the timing that backend reports.

use humsim_core::common::{ConfigError, HumError, PortId};
use humsim_core::tier::{Tier, TierAccess, TierBackend, TierSet, TimedTier};
use humsim_core::{HumController, Request, SimContext};
use pretty_assertions::assert_eq;

use crate::common::harness::{small_config, with_backup, Harness};
use crate::common::mocks::tier::identity;

fn near() -> Box<dyn TierBackend> {
    let cfg = small_config();
    match TimedTier::new(Tier::Near, &cfg.near, cfg.near_physical_size()) {
        Ok(tier) => Box::new(tier),
        Err(e) => panic!("near tier: {e}"),
    }
}

fn harness_with_far(far: Box<dyn TierBackend>) -> Harness {
    let config = small_config();
    let tiers = TierSet::from_backends(&config, vec![far, near()]).unwrap();
    Harness {
        hum: HumController::with_backends(config, tiers).unwrap(),
        responses: Vec::new(),
    }
}

#[test]
fn reads_use_backend_data_and_timing() {
    let mut far = identity(Tier::Far, 4096);
    let _ = far
        .expect_read()
        .withf(|_, offset, buf| *offset == 0x40 && buf.len() == 8)
        .times(1)
        .returning(|issued_at, _, buf| {
            buf.fill(0x77);
            Ok(TierAccess {
                started_at: issued_at,
                completed_at: issued_at + 1000,
            })
        });
    let mut h = harness_with_far(Box::new(far));

    let id = h.read(5, 0x40, 8);
    let _ = h.drain();
    assert_eq!(h.response(id).completed_at, 1005);
    assert_eq!(h.response(id).data, Some(vec![0x77; 8]));
    assert_eq!(h.counters().get("far.reads"), Some(1));
    assert_eq!(h.counters().get("saturation_stalls"), Some(0));
}

#[test]
fn late_start_counts_as_a_stall() {
    let mut far = identity(Tier::Far, 4096);
    let _ = far.expect_write().times(1).returning(|issued_at, _, _| {
        Ok(TierAccess {
            started_at: issued_at + 50,
            completed_at: issued_at + 400,
        })
    });
    let mut h = harness_with_far(Box::new(far));

    let id = h.write(0, 0, &[1; 4]);
    let _ = h.drain();
    assert_eq!(h.response(id).completed_at, 400);
    assert_eq!(h.counters().get("saturation_stalls"), Some(1));
}

#[test]
fn backend_errors_reach_the_caller() {
    let mut far = identity(Tier::Far, 4096);
    let _ = far.expect_write().returning(|_, offset, data| {
        Err(HumError::TierOutOfBounds {
            tier: Tier::Far,
            offset,
            len: data.len() as u64,
            size: 0,
        })
    });
    let mut h = harness_with_far(Box::new(far));

    let err = h
        .hum
        .submit(&SimContext::at(0), Request::write(PortId(0), 8, vec![0; 4]))
        .unwrap_err();
    assert_eq!(
        err,
        HumError::TierOutOfBounds {
            tier: Tier::Far,
            offset: 8,
            len: 4,
            size: 0,
        }
    );
}

#[test]
fn mismatched_tier_set_is_rejected() {
    let tiers = TierSet::from_config(&with_backup()).unwrap();
    let err = HumController::with_backends(small_config(), tiers).unwrap_err();
    assert_eq!(err, HumError::Config(ConfigError::BackendMismatch(Tier::Backup)));
}

#[test]
fn invalid_config_is_rejected_before_backends() {
    let mut config = small_config();
    config.ports = 0;
    let tiers = TierSet::from_config(&small_config()).unwrap();
    assert_eq!(
        HumController::with_backends(config, tiers).unwrap_err(),
        HumError::Config(ConfigError::NoPorts)
    );
}
