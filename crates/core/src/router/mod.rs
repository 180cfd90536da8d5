//! Request Router.
//!
//! This module implements `HumController`, the component CPU-side ports talk to.
//! It provides:
//! 1. **Admission:** Validation of port, size, payload, address coverage and time.
//! 2. **Splitting:** Requests spanning several blocks become one sub-request per block;
//!    a single response is produced once every piece has completed.
//! 3. **Routing:** Each sub-request goes to the block's remapped location, or to its home.
//! 4. **Migration:** Promotions, swaps and aging demotions planned by the policy engine
//!    are copied block by block, with traffic to a migrating block held back and replayed.
//! 5. **Caching:** In the `TwoLevel` mode far and backup blocks are served
//!    through a direct-mapped write-back cache in the near slots instead.
//! 6. **Functional access:** Untimed reads and writes for loaders and debuggers.
//!
//! The controller is passive: it owns a queue of its own timed events and
//! handles them only when the external scheduler calls `submit`, `advance`,
//! `drain` or `shutdown`.
//!
//! # Ordering
//!
//! Sub-requests to the same block complete in submission order. A response
//! is held until every earlier request sharing one of its blocks has been
//! answered, so a split request with a slow piece delays later requests to
//! its other blocks. Requests with disjoint block sets may complete in
//! either order.

/// Timed event queue.
pub mod events;

/// Request and response types.
pub mod request;

use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::mem;

use tracing::{debug, error, info, warn};

use self::events::{DemotionCause, Event, EventQueue, MigrationJob};
use self::request::{Request, RequestId, Response, SimContext};
use crate::common::{AccessKind, BlockAddr, HumError, PortId, Result, Tick};
use crate::config::{Config, PolicyKind};
use crate::map::{
    AddressSpaceMap, LineId, Lookup, NearCache, NearSlots, RemapEntry, RemapTable, SlotId,
};
use crate::policy::{BlockState, PolicyEngine};
use crate::stats::{CounterSnapshot, Counters};
use crate::tier::{Tier, TierAccess, TierBackend, TierSet};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Running,
    Halted,
    ShutDown,
}

/// One block-sized piece of a request.
#[derive(Debug)]
struct SubRequest {
    parent: RequestId,
    block: BlockAddr,
    addr: u64,
    size: u64,
    kind: AccessKind,
    payload: Option<Vec<u8>>,
}

/// A request whose pieces have not all completed.
#[derive(Debug)]
struct Pending {
    port: PortId,
    addr: u64,
    size: u64,
    kind: AccessKind,
    data: Option<Vec<u8>>,
    issued_at: Tick,
    completed_at: Tick,
    outstanding: usize,
    blocks: Vec<BlockAddr>,
}

/// Heterogeneous memory migration controller.
///
/// # Examples
///
/// ```
/// use humsim_core::common::PortId;
/// use humsim_core::config::Config;
/// use humsim_core::router::HumController;
/// use humsim_core::router::request::{Request, SimContext};
///
/// let mut hum = HumController::new(Config::default()).unwrap();
/// let ctx = SimContext::at(0);
/// let _ = hum.submit(&ctx, Request::write(PortId(1), 0x40, vec![7; 8])).unwrap();
/// let _ = hum.submit(&ctx, Request::read(PortId(1), 0x40, 8)).unwrap();
///
/// let responses = hum.drain().unwrap();
/// assert_eq!(responses.len(), 2);
/// assert_eq!(responses[1].data.as_deref(), Some(&[7u8; 8][..]));
/// ```
#[derive(Debug)]
pub struct HumController {
    config: Config,
    map: AddressSpaceMap,
    remap: RemapTable,
    slots: NearSlots,
    cache: Option<NearCache>,
    tiers: TierSet,
    engine: PolicyEngine,
    counters: Counters,
    events: EventQueue,
    pending: HashMap<RequestId, Pending>,
    suspended: HashMap<BlockAddr, VecDeque<SubRequest>>,
    block_tail: HashMap<BlockAddr, Tick>,
    /// Unanswered requests per block, oldest first.
    answer_order: HashMap<BlockAddr, VecDeque<RequestId>>,
    /// Hot blocks waiting for a near slot to free up.
    deferred: BTreeSet<BlockAddr>,
    outbox: Vec<Response>,
    last_now: Tick,
    next_id: u64,
    next_aging: Option<Tick>,
    phase: Phase,
}

impl HumController {
    /// Creates a controller with a `TimedTier` backend for every configured tier.
    ///
    /// # Errors
    ///
    /// A configuration error, or [`HumError::Allocation`] if tier storage
    /// cannot be reserved.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let tiers = TierSet::from_config(&config)?;
        Self::assemble(config, tiers)
    }

    /// Creates a controller around caller-supplied tier backends.
    ///
    /// # Errors
    ///
    /// A configuration error, including a backend set that does not match the
    /// configured tiers.
    pub fn with_backends(config: Config, tiers: TierSet) -> Result<Self> {
        config.validate()?;
        tiers.verify(&config)?;
        Self::assemble(config, tiers)
    }

    fn assemble(config: Config, tiers: TierSet) -> Result<Self> {
        let map = AddressSpaceMap::new(&config)?;
        let engine = PolicyEngine::from_config(&config.policy);
        let base = config.near.range.len();
        let capacity = match config.policy.kind {
            PolicyKind::HotCold => config.policy.near_capacity_blocks,
            PolicyKind::Static | PolicyKind::TwoLevel => 0,
        };
        let slots = NearSlots::new(base, config.block_size, capacity);
        let cache = (config.policy.kind == PolicyKind::TwoLevel).then(|| {
            NearCache::new(base, config.block_size, config.policy.near_capacity_blocks)
        });
        info!(
            policy = ?config.policy.kind,
            block_size = config.block_size,
            near_slots = capacity,
            cache_lines = cache.as_ref().map_or(0, NearCache::lines),
            backup = config.backup.is_some(),
            "controller ready"
        );
        Ok(Self {
            next_aging: engine.aging_interval(),
            config,
            map,
            remap: RemapTable::new(),
            slots,
            cache,
            tiers,
            engine,
            counters: Counters::default(),
            events: EventQueue::new(),
            pending: HashMap::new(),
            suspended: HashMap::new(),
            block_tail: HashMap::new(),
            answer_order: HashMap::new(),
            deferred: BTreeSet::new(),
            outbox: Vec::new(),
            last_now: 0,
            next_id: 0,
            phase: Phase::Running,
        })
    }

    /// Accepts a request arriving at `ctx.now`.
    ///
    /// Events due at or before `ctx.now` are handled first, so the request
    /// observes every migration that has already landed.
    ///
    /// # Errors
    ///
    /// - [`HumError::Halted`] / [`HumError::ShutDown`] once the controller stopped.
    /// - [`HumError::TimeWentBackwards`] if `ctx.now` precedes an earlier call.
    /// - [`HumError::ZeroSize`], [`HumError::UnknownPort`], [`HumError::PayloadSize`]
    ///   for malformed requests; the controller keeps running.
    /// - [`HumError::AddressOutOfRange`] if any byte is unmapped. This halts
    ///   the controller and leaves every counter untouched.
    pub fn submit(&mut self, ctx: &SimContext, req: Request) -> Result<RequestId> {
        self.check_running()?;
        self.check_time(ctx.now)?;

        let Request {
            port,
            addr,
            size,
            kind,
            payload,
        } = req;
        if size == 0 {
            return Err(HumError::ZeroSize);
        }
        if port.0 >= self.config.ports {
            return Err(HumError::UnknownPort(port));
        }
        let payload = match kind {
            AccessKind::Read => None,
            AccessKind::Write => {
                let data = payload.unwrap_or_default();
                if data.len() as u64 != size {
                    return Err(HumError::PayloadSize {
                        expected: size,
                        actual: data.len() as u64,
                    });
                }
                Some(data)
            }
        };
        if !self.map.covers(addr, size) {
            error!(
                addr = format_args!("{addr:#x}"),
                size,
                %port,
                bounds = %self.map.bounds(),
                "access outside the configured address space, halting"
            );
            self.phase = Phase::Halted;
            return Err(HumError::AddressOutOfRange { addr, size });
        }
        let len = usize::try_from(size).map_err(|_| HumError::Allocation(size))?;

        let now = ctx.now;
        self.last_now = now;
        self.process_due(now)?;

        let id = RequestId(self.next_id);
        self.next_id += 1;
        self.counters.requests += 1;

        let chunks = self.chunks(addr, size);
        if chunks.len() > 1 {
            self.counters.split_requests += 1;
        }
        let _ = self.pending.insert(
            id,
            Pending {
                port,
                addr,
                size,
                kind,
                data: (kind == AccessKind::Read).then(|| vec![0u8; len]),
                issued_at: now,
                completed_at: now,
                outstanding: chunks.len(),
                blocks: chunks.iter().map(|(block, _, _)| *block).collect(),
            },
        );
        for (block, _, _) in &chunks {
            self.answer_order.entry(*block).or_default().push_back(id);
        }

        for (block, chunk_addr, chunk_size) in chunks {
            let lo = (chunk_addr - addr) as usize;
            let sub = SubRequest {
                parent: id,
                block,
                addr: chunk_addr,
                size: chunk_size,
                kind,
                payload: payload
                    .as_ref()
                    .map(|p| p[lo..lo + chunk_size as usize].to_vec()),
            };
            self.dispatch(sub, now)?;
        }
        Ok(id)
    }

    /// Handles every event due at or before `ctx.now` and returns the
    /// responses completed so far, ordered by completion tick then request id.
    ///
    /// # Errors
    ///
    /// [`HumError::TimeWentBackwards`], or a tier access error.
    pub fn advance(&mut self, ctx: &SimContext) -> Result<Vec<Response>> {
        self.check_time(ctx.now)?;
        self.last_now = ctx.now;
        self.process_due(ctx.now)?;
        Ok(self.take_responses())
    }

    /// Tick at which the controller next has work, if any.
    ///
    /// Aging rounds are reported only while some block still carries hotness.
    pub fn next_event_tick(&self) -> Option<Tick> {
        let aging = self.next_aging.filter(|_| !self.engine.is_quiescent());
        match (self.events.peek_tick(), aging) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Runs every outstanding event, moving time forward as needed.
    ///
    /// Later calls must not present a tick earlier than the last event handled.
    ///
    /// # Errors
    ///
    /// A tier access error.
    pub fn drain(&mut self) -> Result<Vec<Response>> {
        while let Some(tick) = self.events.peek_tick() {
            let now = tick.max(self.last_now);
            self.last_now = now;
            self.process_due(now)?;
        }
        Ok(self.take_responses())
    }

    /// Stops accepting requests, flushes in-flight and held-back traffic and
    /// returns the remaining responses.
    ///
    /// # Errors
    ///
    /// A tier access error.
    pub fn shutdown(&mut self) -> Result<Vec<Response>> {
        if self.phase == Phase::Running {
            self.phase = Phase::ShutDown;
        }
        info!(
            in_flight = self.pending.len(),
            queued_events = self.events.len(),
            "controller shutting down"
        );
        self.drain()
    }

    /// Reads `buf.len()` bytes at `addr` without timing, counters or policy effects.
    ///
    /// # Errors
    ///
    /// [`HumError::AddressOutOfRange`] if any byte is unmapped; the controller keeps running.
    pub fn functional_read(&self, addr: u64, buf: &mut [u8]) -> Result<()> {
        let size = buf.len() as u64;
        if !self.map.covers(addr, size) {
            return Err(HumError::AddressOutOfRange { addr, size });
        }
        for (block, chunk_addr, chunk_size) in self.chunks(addr, size) {
            let (tier, offset) = self.locate(block, chunk_addr)?;
            let lo = (chunk_addr - addr) as usize;
            self.tiers
                .get(tier)?
                .peek(offset, &mut buf[lo..lo + chunk_size as usize])?;
        }
        Ok(())
    }

    /// Writes `data` at `addr` without timing, counters or policy effects.
    ///
    /// # Errors
    ///
    /// [`HumError::AddressOutOfRange`] if any byte is unmapped; the controller keeps running.
    pub fn functional_write(&mut self, addr: u64, data: &[u8]) -> Result<()> {
        let size = data.len() as u64;
        if !self.map.covers(addr, size) {
            return Err(HumError::AddressOutOfRange { addr, size });
        }
        for (block, chunk_addr, chunk_size) in self.chunks(addr, size) {
            let (tier, offset) = self.locate(block, chunk_addr)?;
            let lo = (chunk_addr - addr) as usize;
            self.tiers
                .get_mut(tier)?
                .poke(offset, &data[lo..lo + chunk_size as usize])?;
            self.dirty_cached(block);
        }
        Ok(())
    }

    /// Snapshot of the counters and the near-resident gauge.
    pub fn counters(&self) -> CounterSnapshot {
        CounterSnapshot::new(&self.counters, self.engine.near_resident_count() as u64)
    }

    /// Placement state of the block containing `addr`; `None` if unmapped.
    pub fn block_state(&self, addr: u64) -> Option<BlockState> {
        let home = self.map.home_of(addr)?;
        let block = self.map.block_of(addr);
        Some(
            self.engine
                .state(block)
                .unwrap_or(BlockState::Resident(home.tier)),
        )
    }

    /// Tier currently holding the block containing `addr`; `None` if unmapped.
    ///
    /// A block cached in the near tier by the `TwoLevel` mode reports `Tier::Near`.
    pub fn resident_tier(&self, addr: u64) -> Option<Tier> {
        self.locate(self.map.block_of(addr), addr)
            .ok()
            .map(|(tier, _)| tier)
    }

    /// Near migration slots currently reserved, or valid cache lines in the `TwoLevel` mode.
    pub fn near_occupancy(&self) -> usize {
        self.cache
            .as_ref()
            .map_or_else(|| self.slots.in_use(), NearCache::valid_lines)
    }

    /// Hot blocks waiting for a near slot.
    pub fn deferred_blocks(&self) -> usize {
        self.deferred.len()
    }

    /// The configuration the controller was built with.
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Returns `true` once a fatal addressing error has stopped the controller.
    pub fn is_halted(&self) -> bool {
        self.phase == Phase::Halted
    }

    /// Requests accepted but not yet answered.
    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    fn check_running(&self) -> Result<()> {
        match self.phase {
            Phase::Running => Ok(()),
            Phase::Halted => Err(HumError::Halted),
            Phase::ShutDown => Err(HumError::ShutDown),
        }
    }

    const fn check_time(&self, now: Tick) -> Result<()> {
        if now < self.last_now {
            return Err(HumError::TimeWentBackwards {
                now,
                last: self.last_now,
            });
        }
        Ok(())
    }

    /// Splits `[addr, addr + size)` at block boundaries.
    fn chunks(&self, addr: u64, size: u64) -> Vec<(BlockAddr, u64, u64)> {
        let block_size = self.map.block_size();
        let end = addr + size;
        let mut out = Vec::with_capacity(1);
        let mut cursor = addr;
        while cursor < end {
            let block = self.map.block_of(cursor);
            let chunk_end = end.min(block.val() + block_size);
            out.push((block, cursor, chunk_end - cursor));
            cursor = chunk_end;
        }
        out
    }

    /// Physical tier and offset of `addr`, honouring the remap table and the near cache.
    fn locate(&self, block: BlockAddr, addr: u64) -> Result<(Tier, u64)> {
        if let Some(entry) = self.remap.get(block) {
            return Ok((entry.tier, entry.offset + block.offset_of(addr)));
        }
        if let Some(cache) = &self.cache {
            if let Some(line) = cache.holding(block) {
                return Ok((Tier::Near, cache.offset(line) + block.offset_of(addr)));
            }
        }
        let home = self.map.resolve(addr)?;
        Ok((home.tier, home.offset))
    }

    fn tail(&self, block: BlockAddr) -> Tick {
        self.block_tail.get(&block).copied().unwrap_or_default()
    }

    /// Returns `true` if the policy may move blocks.
    const fn migrates(&self) -> bool {
        self.slots.capacity() > 0
    }

    fn dirty_cached(&mut self, block: BlockAddr) {
        if let Some(cache) = self.cache.as_mut() {
            if let Some(line) = cache.holding(block) {
                cache.mark_dirty(line);
            }
        }
    }

    fn is_migrating(&self, block: BlockAddr) -> bool {
        self.engine
            .state(block)
            .is_some_and(|s| s.is_migrating())
    }

    /// Slot held by a promoted block.
    fn slot_of(&self, block: BlockAddr) -> Option<SlotId> {
        let entry = self.remap.get(block)?;
        if entry.tier != Tier::Near {
            return None;
        }
        self.slots.slot_at(entry.offset)
    }

    fn dispatch(&mut self, sub: SubRequest, now: Tick) -> Result<()> {
        if self.is_migrating(sub.block) || self.suspended.contains_key(&sub.block) {
            self.counters.suspended_requests += 1;
            debug!(id = %sub.parent, block = %sub.block, "block migrating, request held");
            self.suspended.entry(sub.block).or_default().push_back(sub);
            return Ok(());
        }
        self.service(&sub, now)
    }

    fn service(&mut self, sub: &SubRequest, now: Tick) -> Result<()> {
        let home = self.map.resolve(sub.addr)?;
        if let Some(cache) = self.cache.as_ref().filter(|_| home.tier.is_slow()) {
            let lookup = cache.lookup(sub.block);
            let line_offset = cache.offset(lookup.line());
            return self.service_cached(sub, lookup, line_offset, now);
        }

        let (tier, offset) = self.locate(sub.block, sub.addr)?;
        let access = self.access(tier, offset, sub, now)?;
        self.settle(sub, tier, offset, access, now);

        if self.migrates() && self.engine.observe(sub.block, home.tier, tier, sub.kind, now) {
            self.plan_promotion(sub.block, now);
        }
        Ok(())
    }

    /// Serves a far or backup block out of its near cache line, filling the
    /// line first on a miss.
    fn service_cached(
        &mut self,
        sub: &SubRequest,
        lookup: Lookup,
        line_offset: u64,
        now: Tick,
    ) -> Result<()> {
        let ready_at = match lookup {
            Lookup::Hit(_) => {
                self.counters.cache_hits += 1;
                now
            }
            Lookup::Miss { line, victim } => {
                self.counters.cache_misses += 1;
                self.fill_line(sub.block, line, line_offset, victim, now)?
            }
        };
        let offset = line_offset + sub.block.offset_of(sub.addr);
        let access = self.access(Tier::Near, offset, sub, ready_at)?;
        if sub.kind == AccessKind::Write {
            self.dirty_cached(sub.block);
        }
        self.settle(sub, Tier::Near, offset, access, ready_at);
        Ok(())
    }

    /// Writes a dirty occupant of `line` back home, then copies `block` in.
    ///
    /// Returns the tick the line holds `block`.
    fn fill_line(
        &mut self,
        block: BlockAddr,
        line: LineId,
        line_offset: u64,
        victim: Option<(BlockAddr, bool)>,
        now: Tick,
    ) -> Result<Tick> {
        let mut buf = vec![0u8; self.config.block_size as usize];
        let mut line_free_at = now;

        if let Some((old, true)) = victim {
            let old_home = self.map.resolve(old.val())?;
            let read = self
                .tiers
                .get_mut(Tier::Near)?
                .read(now, line_offset, &mut buf)?;
            let _ = self
                .tiers
                .get_mut(old_home.tier)?
                .write(read.completed_at, old_home.offset, &buf)?;
            self.counters.near.record_extra(AccessKind::Read);
            self.counters
                .tier_mut(old_home.tier)
                .record_extra(AccessKind::Write);
            self.counters.cache_writebacks += 1;
            line_free_at = read.completed_at;
            debug!(block = %old, line = line.0, to = %old_home.tier, "dirty line written back");
        }

        let home = self.map.resolve(block.val())?;
        let read = self
            .tiers
            .get_mut(home.tier)?
            .read(now, home.offset, &mut buf)?;
        let write = self.tiers.get_mut(Tier::Near)?.write(
            read.completed_at.max(line_free_at),
            line_offset,
            &buf,
        )?;
        self.counters
            .tier_mut(home.tier)
            .record_extra(AccessKind::Read);
        self.counters.near.record_extra(AccessKind::Write);
        if let Some(cache) = self.cache.as_mut() {
            cache.fill(line, block);
        }
        debug!(%block, line = line.0, ready = write.completed_at, "line filled");
        Ok(write.completed_at)
    }

    /// Performs the tier access of `sub` and copies read data into its parent.
    fn access(
        &mut self,
        tier: Tier,
        offset: u64,
        sub: &SubRequest,
        at: Tick,
    ) -> Result<TierAccess> {
        let backend: &mut dyn TierBackend = self.tiers.get_mut(tier)?;
        match sub.kind {
            AccessKind::Read => {
                let mut buf = vec![0u8; sub.size as usize];
                let access = backend.read(at, offset, &mut buf)?;
                if let Some(parent) = self.pending.get_mut(&sub.parent) {
                    let lo = (sub.addr - parent.addr) as usize;
                    if let Some(data) = parent.data.as_mut() {
                        data[lo..lo + buf.len()].copy_from_slice(&buf);
                    }
                }
                Ok(access)
            }
            AccessKind::Write => {
                backend.write(at, offset, sub.payload.as_deref().unwrap_or_default())
            }
        }
    }

    /// Counts a serviced piece and schedules its completion behind earlier
    /// traffic to the same block.
    fn settle(
        &mut self,
        sub: &SubRequest,
        tier: Tier,
        offset: u64,
        access: TierAccess,
        issued_at: Tick,
    ) {
        if access.stalled_from(issued_at) {
            self.counters.saturation_stalls += 1;
        }
        self.counters.tier_mut(tier).record(sub.kind, sub.size);

        let tail = self.block_tail.entry(sub.block).or_default();
        let done = access.completed_at.max(*tail);
        *tail = done;
        self.events.push(done, Event::Complete(sub.parent));
        debug!(
            id = %sub.parent,
            block = %sub.block,
            %tier,
            offset = format_args!("{offset:#x}"),
            kind = %sub.kind,
            done,
            "routed"
        );
    }

    fn plan_promotion(&mut self, block: BlockAddr, now: Tick) {
        if let Some(slot) = self.slots.reserve() {
            if self.engine.begin_migration(block, Tier::Near, now).is_none() {
                self.slots.release(slot);
                return;
            }
            let _ = self.deferred.remove(&block);
            let start = now.max(self.tail(block));
            self.events.push(
                start,
                Event::MigrationStart(MigrationJob {
                    promote: Some((block, slot)),
                    demote: None,
                }),
            );
            debug!(%block, slot = slot.0, start, "promotion scheduled");
            return;
        }

        let victim = self.engine.select_victim(block);
        let slot = victim.and_then(|v| self.slot_of(v));
        let home = victim.and_then(|v| self.map.home_of(v.val()));
        let (Some(victim), Some(slot), Some(home)) = (victim, slot, home) else {
            if self.deferred.insert(block) {
                self.counters.deferred_migrations += 1;
                warn!(%block, "near tier full and no colder resident, promotion deferred");
            }
            return;
        };
        let _ = self.deferred.remove(&block);

        let _ = self.engine.begin_migration(victim, home.tier, now);
        let _ = self.engine.begin_migration(block, Tier::Near, now);
        let start = now.max(self.tail(block)).max(self.tail(victim));
        self.events.push(
            start,
            Event::MigrationStart(MigrationJob {
                promote: Some((block, slot)),
                demote: Some((victim, slot, DemotionCause::Eviction)),
            }),
        );
        debug!(%block, %victim, slot = slot.0, start, "swap scheduled");
    }

    fn process_due(&mut self, now: Tick) -> Result<()> {
        loop {
            let event_at = self.events.peek_tick().filter(|&t| t <= now);
            let aging_at = self.next_aging.filter(|&t| t <= now);
            match (event_at, aging_at) {
                (Some(e), a) if a.is_none_or(|a| e <= a) => {
                    if let Some((tick, event)) = self.events.pop_due(e) {
                        self.handle(tick, event)?;
                    }
                }
                (_, Some(a)) => self.run_aging(a, now),
                _ => return Ok(()),
            }
        }
    }

    fn handle(&mut self, tick: Tick, event: Event) -> Result<()> {
        match event {
            Event::Complete(id) => {
                self.complete(id, tick);
                Ok(())
            }
            Event::MigrationStart(job) => self.start_migration(job, tick),
            Event::MigrationDone {
                block,
                release,
                eviction,
            } => self.finish_migration(block, release, eviction, tick),
        }
    }

    fn complete(&mut self, id: RequestId, tick: Tick) {
        let Some(parent) = self.pending.get_mut(&id) else {
            return;
        };
        parent.outstanding -= 1;
        parent.completed_at = parent.completed_at.max(tick);
        if parent.outstanding == 0 {
            self.answer(id, tick);
        }
    }

    /// Answers `id` if no earlier request shares one of its blocks, then
    /// every request it was holding back that has become answerable.
    fn answer(&mut self, id: RequestId, tick: Tick) {
        let mut ready = vec![id];
        while let Some(id) = ready.pop() {
            let answerable = self.pending.get(&id).is_some_and(|p| {
                p.outstanding == 0
                    && p.blocks.iter().all(|b| {
                        self.answer_order.get(b).and_then(VecDeque::front) == Some(&id)
                    })
            });
            if !answerable {
                continue;
            }
            let Some(p) = self.pending.remove(&id) else {
                continue;
            };
            for block in &p.blocks {
                if let Entry::Occupied(mut queue) = self.answer_order.entry(*block) {
                    let _ = queue.get_mut().pop_front();
                    match queue.get().front() {
                        Some(next) => ready.push(*next),
                        None => {
                            let _ = queue.remove();
                        }
                    }
                }
            }
            self.counters.responses += 1;
            self.outbox.push(Response {
                id,
                port: p.port,
                addr: p.addr,
                size: p.size,
                kind: p.kind,
                data: p.data,
                issued_at: p.issued_at,
                completed_at: p.completed_at.max(tick),
            });
        }
    }

    /// Copies the blocks of `job`; the demotion half goes first so the
    /// promoted block may overwrite the slot.
    fn start_migration(&mut self, job: MigrationJob, at: Tick) -> Result<()> {
        let mut buf = vec![0u8; self.config.block_size as usize];
        let mut copy_end = at;
        let mut slot_free_at = at;

        if let Some((victim, slot, cause)) = job.demote {
            let home = self.map.resolve(victim.val())?;
            let slot_offset = self.slots.offset(slot);
            let read = self
                .tiers
                .get_mut(Tier::Near)?
                .read(at, slot_offset, &mut buf)?;
            let write = self
                .tiers
                .get_mut(home.tier)?
                .write(read.completed_at, home.offset, &buf)?;
            let _ = self.remap.remove(victim);
            self.counters.near.record_extra(AccessKind::Read);
            self.counters
                .tier_mut(home.tier)
                .record_extra(AccessKind::Write);

            slot_free_at = read.completed_at;
            copy_end = copy_end.max(write.completed_at);
            self.events.push(
                write.completed_at,
                Event::MigrationDone {
                    block: victim,
                    release: (cause == DemotionCause::Aging).then_some(slot),
                    eviction: cause == DemotionCause::Eviction,
                },
            );
        }

        if let Some((block, slot)) = job.promote {
            let home = self.map.resolve(block.val())?;
            let slot_offset = self.slots.offset(slot);
            let read = self
                .tiers
                .get_mut(home.tier)?
                .read(at, home.offset, &mut buf)?;
            let write = self.tiers.get_mut(Tier::Near)?.write(
                read.completed_at.max(slot_free_at),
                slot_offset,
                &buf,
            )?;
            let _ = self.remap.insert(
                block,
                RemapEntry {
                    tier: Tier::Near,
                    offset: slot_offset,
                },
            );
            self.counters
                .tier_mut(home.tier)
                .record_extra(AccessKind::Read);
            self.counters.near.record_extra(AccessKind::Write);

            copy_end = copy_end.max(write.completed_at);
            self.events.push(
                write.completed_at,
                Event::MigrationDone {
                    block,
                    release: None,
                    eviction: false,
                },
            );
        }

        self.counters.add_extra_time(copy_end - at);
        Ok(())
    }

    fn finish_migration(
        &mut self,
        block: BlockAddr,
        release: Option<SlotId>,
        eviction: bool,
        at: Tick,
    ) -> Result<()> {
        let Some(outcome) = self.engine.complete_migration(block, at) else {
            return Ok(());
        };
        self.counters.migrating_ticks += at.saturating_sub(outcome.since);
        if let Some(ticks) = outcome.near_residency {
            self.counters.near_residency_ticks += ticks;
        }
        if outcome.to == Tier::Near {
            self.counters.migrations += 1;
            info!(%block, from = %outcome.from, at, "block promoted");
        } else {
            self.counters.demotions += 1;
            if eviction {
                self.counters.evictions += 1;
            }
            info!(%block, to = %outcome.to, at, eviction, "block demoted");
        }
        let tail = self.block_tail.entry(block).or_default();
        *tail = (*tail).max(at);
        if let Some(slot) = release {
            self.slots.release(slot);
            self.promote_deferred(at);
        }
        self.replay(block, at)
    }

    /// Hands a freed slot to the hottest deferred block still worth promoting.
    fn promote_deferred(&mut self, at: Tick) {
        self.deferred.retain(|b| self.engine.wants_promotion(*b));
        let hottest = self
            .deferred
            .iter()
            .filter_map(|b| self.engine.meta(*b).map(|m| (*b, m.hotness)))
            .max_by_key(|(b, hotness)| (*hotness, std::cmp::Reverse(*b)))
            .map(|(b, _)| b);
        if let Some(block) = hottest {
            debug!(%block, "deferred promotion resumed");
            self.plan_promotion(block, at);
        }
    }

    /// Services requests held while `block` migrated, stopping early if one
    /// of them starts another migration of the same block.
    fn replay(&mut self, block: BlockAddr, at: Tick) -> Result<()> {
        let Some(mut queue) = self.suspended.remove(&block) else {
            return Ok(());
        };
        while let Some(sub) = queue.pop_front() {
            self.service(&sub, at)?;
            if self.is_migrating(block) {
                if !queue.is_empty() {
                    let _ = self.suspended.insert(block, queue);
                }
                return Ok(());
            }
        }
        Ok(())
    }

    fn run_aging(&mut self, at: Tick, now: Tick) {
        let Some(interval) = self.engine.aging_interval() else {
            self.next_aging = None;
            return;
        };
        if self.engine.is_quiescent() {
            // Nothing to halve or demote before the next event can touch a block.
            let limit = self
                .events
                .peek_tick()
                .filter(|&t| t <= now)
                .map_or(now, |t| t.saturating_sub(1));
            let rounds = limit.saturating_sub(at) / interval + 1;
            self.counters.aging_rounds += rounds;
            self.next_aging = Some(at + rounds * interval);
            return;
        }

        self.counters.aging_rounds += 1;
        self.next_aging = Some(at + interval);
        self.block_tail.retain(|_, tail| *tail > at);
        let cold = self.engine.age();
        let mut demoted = 0usize;
        for victim in cold {
            let Some(slot) = self.slot_of(victim) else {
                continue;
            };
            let Some(home) = self.map.home_of(victim.val()) else {
                continue;
            };
            if self.engine.begin_migration(victim, home.tier, at).is_none() {
                continue;
            }
            let start = at.max(self.tail(victim));
            self.events.push(
                start,
                Event::MigrationStart(MigrationJob {
                    promote: None,
                    demote: Some((victim, slot, DemotionCause::Aging)),
                }),
            );
            demoted += 1;
        }
        debug!(at, round = self.counters.aging_rounds, demoted, "aging round");
    }

    fn take_responses(&mut self) -> Vec<Response> {
        let mut out = mem::take(&mut self.outbox);
        out.sort_by_key(|r| (r.completed_at, r.id));
        out
    }
}
