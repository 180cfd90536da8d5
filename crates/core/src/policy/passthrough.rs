//! Static (pass-through) policy.
//!
//! Blocks never leave their home tier. The controller degenerates into a timed
//! router in front of the tiers, which is useful as a baseline.

use super::{BlockMeta, MigrationPolicy};
use crate::common::{AccessKind, Tick};

/// Policy that never migrates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StaticPolicy;

impl MigrationPolicy for StaticPolicy {
    fn name(&self) -> &'static str {
        "Static"
    }

    fn record_access(&mut self, _meta: &mut BlockMeta, _kind: AccessKind) {}

    fn should_promote(&self, _meta: &BlockMeta) -> bool {
        false
    }

    fn is_evictable(&self, _victim: &BlockMeta, _candidate: &BlockMeta) -> bool {
        false
    }

    fn age(&mut self, _meta: &mut BlockMeta) -> bool {
        false
    }

    fn aging_interval(&self) -> Option<Tick> {
        None
    }
}
