//! Migration Policy Engine.
//!
//! This module decides which blocks move between tiers. It provides:
//! 1. **Block State:** Per-block metadata and the `Resident`/`Migrating` state machine.
//! 2. **Policy Trait:** `MigrationPolicy`, the pluggable hotness and eviction rules.
//! 3. **Engine:** `PolicyEngine`, which owns the metadata, tracks near residents
//!    and turns policy verdicts into promotion, eviction and aging decisions.
//!
//! # Policies
//!
//! - `HotColdPolicy`: threshold promotion with periodic halving and cold demotion.
//! - `StaticPolicy`: never migrates. The `TwoLevel` mode uses it too, since its
//!   near tier caches blocks instead of taking them over.
//!
//! The engine only decides; the router performs the copies and reports back
//! through `begin_migration` and `complete_migration`.

/// Hot/cold threshold policy.
pub mod hot_cold;

/// Pass-through policy.
pub mod passthrough;

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use crate::common::{AccessKind, BlockAddr, Tick};
use crate::config::{PolicyConfig, PolicyKind};
use crate::tier::Tier;

pub use hot_cold::HotColdPolicy;
pub use passthrough::StaticPolicy;

/// Placement state of a block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockState {
    /// The block is served from `Tier`.
    Resident(Tier),
    /// The block is being copied; requests to it are held back.
    Migrating {
        /// Tier the block is leaving.
        from: Tier,
        /// Tier the block is moving to.
        to: Tier,
        /// Tick the migration was planned.
        since: Tick,
    },
}

impl BlockState {
    /// Returns `true` while a migration is in progress.
    #[inline]
    pub const fn is_migrating(&self) -> bool {
        matches!(self, Self::Migrating { .. })
    }
}

/// Metadata kept for every block the controller has touched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockMeta {
    /// Tier owning the block's logical address.
    pub home: Tier,
    /// Current placement.
    pub state: BlockState,
    /// Saturating access counter.
    pub hotness: u32,
    /// Tick the last migration of this block completed.
    pub last_migrated: Option<Tick>,
    /// Tick of the latest routed access.
    pub last_access: Tick,
    /// Tick the block became resident in the near tier away from home.
    pub near_since: Option<Tick>,
}

impl BlockMeta {
    /// Metadata for a block never touched before; it lives at `home`.
    pub const fn new(home: Tier) -> Self {
        Self {
            home,
            state: BlockState::Resident(home),
            hotness: 0,
            last_migrated: None,
            last_access: 0,
            near_since: None,
        }
    }

    /// Returns `true` if the block sits in the near tier away from home.
    pub const fn is_promoted(&self) -> bool {
        self.home.is_slow() && matches!(self.state, BlockState::Resident(Tier::Near))
    }
}

/// Rules deciding when blocks move.
///
/// Implementors must be `Send` so a controller can be handed to a worker thread.
pub trait MigrationPolicy: Send {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Updates a block's metadata for one routed access.
    fn record_access(&mut self, meta: &mut BlockMeta, kind: AccessKind);

    /// Returns `true` if a slow-tier block should move to the near tier.
    fn should_promote(&self, meta: &BlockMeta) -> bool;

    /// Returns `true` if `victim` may be evicted to make room for `candidate`.
    fn is_evictable(&self, victim: &BlockMeta, candidate: &BlockMeta) -> bool;

    /// Applies one aging round; returns `true` if the block has gone cold.
    fn age(&mut self, meta: &mut BlockMeta) -> bool;

    /// Ticks between aging rounds, or `None` if the policy never ages.
    fn aging_interval(&self) -> Option<Tick>;
}

/// Result of a completed migration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MigrationOutcome {
    /// Tier the block left.
    pub from: Tier,
    /// Tier the block now lives in.
    pub to: Tier,
    /// Tick the migration was planned.
    pub since: Tick,
    /// Ticks the block had spent promoted, if it just left the near tier.
    pub near_residency: Option<Tick>,
}

/// Owner of all block metadata.
///
/// Metadata of a block that has cooled to zero while resident at home is
/// dropped by the next aging round; such a block is indistinguishable from
/// one never touched.
pub struct PolicyEngine {
    policy: Box<dyn MigrationPolicy>,
    blocks: HashMap<BlockAddr, BlockMeta>,
    near_residents: BTreeSet<BlockAddr>,
    /// Blocks with non-zero hotness.
    warm: usize,
}

impl std::fmt::Debug for PolicyEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyEngine")
            .field("policy", &self.policy.name())
            .field("blocks", &self.blocks.len())
            .field("near_residents", &self.near_residents.len())
            .field("warm", &self.warm)
            .finish()
    }
}

impl PolicyEngine {
    /// Creates an engine driven by `policy`.
    pub fn new(policy: Box<dyn MigrationPolicy>) -> Self {
        Self {
            policy,
            blocks: HashMap::new(),
            near_residents: BTreeSet::new(),
            warm: 0,
        }
    }

    /// Creates the engine selected by the configuration.
    pub fn from_config(cfg: &PolicyConfig) -> Self {
        let policy: Box<dyn MigrationPolicy> = match cfg.kind {
            PolicyKind::HotCold => Box::new(HotColdPolicy::from_config(cfg)),
            PolicyKind::Static | PolicyKind::TwoLevel => Box::new(StaticPolicy),
        };
        Self::new(policy)
    }

    /// Name of the active policy.
    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    /// Ticks between aging rounds, if the policy ages.
    pub fn aging_interval(&self) -> Option<Tick> {
        self.policy.aging_interval()
    }

    /// Records a routed access and returns `true` if the block should be promoted.
    ///
    /// # Arguments
    ///
    /// * `block` - Block accessed.
    /// * `home` - Home tier of the block, used the first time it is seen.
    /// * `routed` - Tier that served the access.
    /// * `kind` - Read or write.
    /// * `now` - Tick of the access.
    pub fn observe(
        &mut self,
        block: BlockAddr,
        home: Tier,
        routed: Tier,
        kind: AccessKind,
        now: Tick,
    ) -> bool {
        let meta = self.blocks.entry(block).or_insert_with(|| BlockMeta::new(home));
        let was_cold = meta.hotness == 0;
        meta.last_access = now;
        self.policy.record_access(meta, kind);
        if was_cold && meta.hotness > 0 {
            self.warm += 1;
        }
        routed.is_slow() && !meta.state.is_migrating() && self.policy.should_promote(meta)
    }

    /// Returns `true` if `block` sits in a slow tier and is hot enough to promote.
    pub fn wants_promotion(&self, block: BlockAddr) -> bool {
        self.blocks.get(&block).is_some_and(|m| {
            matches!(m.state, BlockState::Resident(t) if t.is_slow())
                && self.policy.should_promote(m)
        })
    }

    /// Picks the near resident to evict in favour of `candidate`.
    ///
    /// Among eligible residents the lowest hotness wins, then the least
    /// recently migrated, then the lowest address.
    pub fn select_victim(&self, candidate: BlockAddr) -> Option<BlockAddr> {
        let cand = self.blocks.get(&candidate)?;
        self.near_residents
            .iter()
            .filter_map(|addr| self.blocks.get(addr).map(|m| (*addr, m)))
            .filter(|(_, m)| m.is_promoted() && self.policy.is_evictable(m, cand))
            .min_by_key(|(addr, m)| (m.hotness, m.last_migrated, *addr))
            .map(|(addr, _)| addr)
    }

    /// Moves `block` into `Migrating` towards `to`.
    ///
    /// Returns the source tier, or `None` if the block is unknown or already migrating.
    pub fn begin_migration(&mut self, block: BlockAddr, to: Tier, now: Tick) -> Option<Tier> {
        let meta = self.blocks.get_mut(&block)?;
        let BlockState::Resident(from) = meta.state else {
            return None;
        };
        meta.state = BlockState::Migrating { from, to, since: now };
        if from == Tier::Near {
            let _ = self.near_residents.remove(&block);
        }
        debug!(%block, %from, %to, "migration planned");
        Some(from)
    }

    /// Settles a migration of `block` at `now`.
    ///
    /// Returns `None` if the block was not migrating.
    pub fn complete_migration(&mut self, block: BlockAddr, now: Tick) -> Option<MigrationOutcome> {
        let meta = self.blocks.get_mut(&block)?;
        let BlockState::Migrating { from, to, since } = meta.state else {
            return None;
        };
        meta.state = BlockState::Resident(to);
        meta.last_migrated = Some(now);

        let near_residency = if from == Tier::Near {
            meta.near_since.take().map(|t| now.saturating_sub(t))
        } else {
            None
        };
        if meta.is_promoted() {
            meta.near_since = Some(now);
            let _ = self.near_residents.insert(block);
        }
        Some(MigrationOutcome {
            from,
            to,
            since,
            near_residency,
        })
    }

    /// Runs one aging round.
    ///
    /// Returns the promoted blocks that went cold, in address order.
    pub fn age(&mut self) -> Vec<BlockAddr> {
        let mut cold = Vec::new();
        for (addr, meta) in &mut self.blocks {
            let was_warm = meta.hotness > 0;
            let is_cold = self.policy.age(meta);
            if was_warm && meta.hotness == 0 {
                self.warm -= 1;
            }
            if is_cold && meta.is_promoted() {
                cold.push(*addr);
            }
        }
        self.blocks
            .retain(|_, m| m.hotness > 0 || m.state != BlockState::Resident(m.home));
        cold.sort_unstable();
        cold
    }

    /// Current state of `block`; untouched blocks report `None`.
    pub fn state(&self, block: BlockAddr) -> Option<BlockState> {
        self.blocks.get(&block).map(|m| m.state)
    }

    /// Metadata of `block`.
    pub fn meta(&self, block: BlockAddr) -> Option<&BlockMeta> {
        self.blocks.get(&block)
    }

    /// Returns `true` if an aging round would change nothing.
    pub fn is_quiescent(&self) -> bool {
        self.near_residents.is_empty() && self.warm == 0
    }

    /// Number of promoted blocks currently resident in the near tier.
    pub fn near_resident_count(&self) -> usize {
        self.near_residents.len()
    }

    /// Number of blocks with metadata.
    pub fn tracked_blocks(&self) -> usize {
        self.blocks.len()
    }
}
