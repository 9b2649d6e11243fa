//! Incremental light propagation engine.
//!
//! Light changes are recorded as raw position updates per channel and only
//! resolved when the channel is processed. A processing pass runs in three
//! stages:
//!
//! 1. Classify: every queued position is compared against the value it should
//!    have right now. Positions that should be brighter or darker are staged.
//! 2. Stage: staged positions are moved into per-level queues. Their storage is
//!    written immediately (new value for brightenings, zero for darkenings) so
//!    a position staged twice is only scheduled once.
//! 3. Settle: levels are walked from 15 down to 0. At each level, darkenings
//!    are resolved first, then brightenings are spread. When a level is
//!    reached, every brighter level is final and can be trusted as a source.
//!
//! Darkening never commits a voxel to darkness without checking its
//! neighbours: a neighbour that this voxel could have lit is itself scheduled
//! for darkening, while any other lit neighbour is pinned by a different source
//! and still feeds the voxel.

use std::{
    mem,
    sync::atomic::{AtomicUsize, Ordering},
};

use lumen_utils::BlockPos;
use parking_lot::Mutex;

use crate::config::LightingConfig;

use super::{
    access::{LightAccess, RenderNotifier},
    cursor::Cursor,
    light_queue::{PooledQueue, QueuePool},
    light_type::{LightType, MAX_LIGHT},
    ownership::{Access, OwnerToken, OwnershipGuard},
    packed_pos::PackedPos,
};

const LEVELS: usize = MAX_LIGHT as usize + 1;

/// Queues and cursor of an engine. Only touched while the ownership guard is held.
#[derive(Debug)]
struct PropagationState {
    pool: QueuePool,
    /// Raw updates per channel.
    updates: [PooledQueue; LightType::COUNT],
    /// Positions that should get brighter, tagged with the target level.
    initial_brightenings: PooledQueue,
    /// Positions that should get darker.
    initial_darkenings: PooledQueue,
    /// Positions raised to a level whose light still has to be spread.
    brightenings: [PooledQueue; LEVELS],
    /// Positions zeroed from a level that still have to be re-derived.
    darkenings: [PooledQueue; LEVELS],
    cursor: Cursor,
    max_scheduled_updates: usize,
}

impl PropagationState {
    fn new(config: &LightingConfig) -> Self {
        Self {
            pool: QueuePool::with_segments(config.preallocated_segments),
            updates: Default::default(),
            initial_brightenings: PooledQueue::new(),
            initial_darkenings: PooledQueue::new(),
            brightenings: Default::default(),
            darkenings: Default::default(),
            cursor: Cursor::new(),
            max_scheduled_updates: config.max_scheduled_updates.max(1),
        }
    }

    /// Queues a raw update, processing the channel if the queue hit its ceiling.
    fn schedule<W>(&mut self, world: &mut W, light_type: LightType, pos: PackedPos)
    where
        W: LightAccess + RenderNotifier + ?Sized,
    {
        let queue = &mut self.updates[light_type.index()];
        queue.push(&mut self.pool, pos);
        if queue.len() >= self.max_scheduled_updates {
            log::debug!(
                "{light_type:?} light queue reached {} entries, processing early",
                self.max_scheduled_updates
            );
            self.process(world, light_type);
        }
    }

    fn pending(&self, light_type: LightType) -> usize {
        self.updates[light_type.index()].len()
    }

    fn process<W>(&mut self, world: &mut W, light_type: LightType)
    where
        W: LightAccess + RenderNotifier + ?Sized,
    {
        let _span = tracing::debug_span!("light_update", channel = ?light_type).entered();
        self.cursor.reset();

        let scheduled = self.classify(world, light_type);
        self.stage(world, light_type);
        loop {
            for level in (0..=MAX_LIGHT).rev() {
                self.darken_level(world, light_type, level);
                self.brighten_level(world, light_type, level);
            }
            if self.levels_settled() {
                break;
            }
            // A voxel derived more light than it was zeroed from.
            log::trace!("{light_type:?} light rose above a settled level, settling again");
        }

        log::trace!("Processed {scheduled} scheduled {light_type:?} light updates");
    }

    fn levels_settled(&self) -> bool {
        self.brightenings
            .iter()
            .chain(&self.darkenings)
            .all(PooledQueue::is_empty)
    }

    /// Compares each raw update against its desired value and stages the differences.
    fn classify<W>(&mut self, world: &mut W, light_type: LightType) -> usize
    where
        W: LightAccess + RenderNotifier + ?Sized,
    {
        let mut queue = mem::take(&mut self.updates[light_type.index()]);
        let scheduled = queue.len();
        while let Some(pos) = queue.pop() {
            if !self.cursor.move_to(world, pos) {
                continue;
            }
            let old_light = self.cursor.light(world, light_type);
            let new_light = self.desired_from_cursor(world, light_type);
            if old_light < new_light {
                self.initial_brightenings
                    .push(&mut self.pool, pos.with_tag(new_light));
            } else if old_light > new_light {
                self.initial_darkenings.push(&mut self.pool, pos);
            }
        }
        queue.recycle(&mut self.pool);
        self.updates[light_type.index()] = queue;
        scheduled
    }

    /// Moves staged entries into the level queues, writing storage right away.
    fn stage<W>(&mut self, world: &mut W, light_type: LightType)
    where
        W: LightAccess + RenderNotifier + ?Sized,
    {
        let mut queue = mem::take(&mut self.initial_brightenings);
        while let Some(entry) = queue.pop() {
            if !self.cursor.move_to(world, entry) {
                continue;
            }
            let new_light = entry.tag();
            if new_light > self.cursor.light(world, light_type) {
                self.enqueue_brightening(world, light_type, entry.untagged(), new_light);
            }
        }
        queue.recycle(&mut self.pool);
        self.initial_brightenings = queue;

        let mut queue = mem::take(&mut self.initial_darkenings);
        while let Some(pos) = queue.pop() {
            if !self.cursor.move_to(world, pos) {
                continue;
            }
            let old_light = self.cursor.light(world, light_type);
            if old_light != 0 {
                self.enqueue_darkening(world, light_type, pos, old_light);
            }
        }
        queue.recycle(&mut self.pool);
        self.initial_darkenings = queue;
    }

    /// Re-derives every voxel zeroed from `level`.
    fn darken_level<W>(&mut self, world: &mut W, light_type: LightType, level: u8)
    where
        W: LightAccess + RenderNotifier + ?Sized,
    {
        let mut queue = mem::take(&mut self.darkenings[usize::from(level)]);
        while let Some(pos) = queue.pop() {
            if !self.cursor.move_to(world, pos) {
                continue;
            }
            // Something brighter already reached this voxel.
            if self.cursor.light(world, light_type) >= level {
                continue;
            }

            let block_pos = self.cursor.block_pos();
            let own_light = world.own_light(light_type, block_pos);
            let opacity = Self::effective_opacity(world, block_pos, own_light);

            let desired = self.desired_with(world, light_type, own_light, opacity);
            if desired >= level {
                // Not actually darker. Restore what it derives and let the brightening pass spread it.
                self.enqueue_brightening(world, light_type, pos, desired);
                continue;
            }

            let mut new_light = own_light;
            let neighbors = *self.cursor.neighbors(world, light_type);
            for neighbor in &neighbors {
                if !neighbor.loaded || neighbor.light == 0 {
                    continue;
                }
                if level.saturating_sub(neighbor.opacity) >= neighbor.light {
                    // This voxel may have been what lit the neighbour.
                    self.enqueue_darkening(world, light_type, neighbor.pos, neighbor.light);
                } else {
                    // Lit by something brighter; levels above are final so it stays.
                    new_light = new_light.max(neighbor.light.saturating_sub(opacity));
                }
            }
            self.enqueue_brightening(world, light_type, pos, new_light);
        }
        queue.recycle(&mut self.pool);
        self.darkenings[usize::from(level)] = queue;
    }

    /// Spreads light from every voxel that still holds `level`.
    fn brighten_level<W>(&mut self, world: &mut W, light_type: LightType, level: u8)
    where
        W: LightAccess + RenderNotifier + ?Sized,
    {
        let mut queue = mem::take(&mut self.brightenings[usize::from(level)]);
        while let Some(pos) = queue.pop() {
            if !self.cursor.move_to(world, pos) {
                continue;
            }
            // Only handle it if nothing changed this voxel since it was queued.
            if self.cursor.light(world, light_type) != level {
                continue;
            }
            world.mark_for_visual_update(self.cursor.block_pos());
            if level > 1 {
                self.spread_from_cursor(world, light_type, level);
            }
        }
        queue.recycle(&mut self.pool);
        self.brightenings[usize::from(level)] = queue;
    }

    fn spread_from_cursor<W>(&mut self, world: &mut W, light_type: LightType, level: u8)
    where
        W: LightAccess + RenderNotifier + ?Sized,
    {
        let neighbors = *self.cursor.neighbors(world, light_type);
        for neighbor in &neighbors {
            if !neighbor.loaded {
                continue;
            }
            let new_light = level.saturating_sub(neighbor.opacity);
            if new_light > neighbor.light {
                self.enqueue_brightening(world, light_type, neighbor.pos, new_light);
            }
        }
    }

    /// Opacity only matters while a voxel's own light is below 14.
    fn effective_opacity<W>(world: &W, pos: BlockPos, own_light: u8) -> u8
    where
        W: LightAccess + ?Sized,
    {
        if own_light >= MAX_LIGHT - 1 {
            1
        } else {
            world.opacity(pos).clamp(1, MAX_LIGHT)
        }
    }

    /// The light the voxel under the cursor should hold given its surroundings.
    fn desired_from_cursor<W>(&mut self, world: &W, light_type: LightType) -> u8
    where
        W: LightAccess + ?Sized,
    {
        let block_pos = self.cursor.block_pos();
        let own_light = world.own_light(light_type, block_pos);
        let opacity = Self::effective_opacity(world, block_pos, own_light);
        self.desired_with(world, light_type, own_light, opacity)
    }

    fn desired_with<W>(&mut self, world: &W, light_type: LightType, own_light: u8, opacity: u8) -> u8
    where
        W: LightAccess + ?Sized,
    {
        if own_light >= MAX_LIGHT.saturating_sub(opacity) {
            return own_light;
        }
        let mut new_light = own_light;
        for neighbor in self.cursor.neighbors(world, light_type) {
            if neighbor.loaded {
                new_light = new_light.max(neighbor.light.saturating_sub(opacity));
            }
        }
        new_light.min(MAX_LIGHT)
    }

    fn enqueue_brightening<W>(&mut self, world: &mut W, light_type: LightType, pos: PackedPos, level: u8)
    where
        W: LightAccess + ?Sized,
    {
        debug_assert!(
            LightType::base_value_range().contains(&level),
            "Light level {level} outside the channel range"
        );
        self.brightenings[usize::from(level)].push(&mut self.pool, pos);
        world.set_light(light_type, pos.block_pos(), level);
    }

    fn enqueue_darkening<W>(&mut self, world: &mut W, light_type: LightType, pos: PackedPos, old_level: u8)
    where
        W: LightAccess + ?Sized,
    {
        debug_assert!(
            LightType::base_value_range().contains(&old_level),
            "Light level {old_level} outside the channel range"
        );
        self.darkenings[usize::from(old_level)].push(&mut self.pool, pos);
        world.set_light(light_type, pos.block_pos(), 0);
    }
}

/// Light engine for one world, processing both light channels.
///
/// The engine holds only queues. Voxel data lives behind the [`LightAccess`]
/// passed into each call. All calls are synchronous; nothing runs in the
/// background.
///
/// Every call that touches the queues takes an optional [`OwnerToken`]. The
/// thread that created the engine should pass its token. Callers without it
/// that find the engine busy are logged as a violation before they wait.
///
/// A [`RenderNotifier`] may call back into the engine while a pass is running
/// on the same thread. Updates scheduled that way are held aside and queued
/// once the running call is done; a nested process call returns right away.
#[derive(Debug)]
pub struct LightingEngine {
    config: LightingConfig,
    state: OwnershipGuard<PropagationState>,
    /// Updates scheduled from inside a running call on the holding thread.
    deferred: Mutex<Vec<(LightType, PackedPos)>>,
    /// Mirrors the raw queue lengths so an idle channel can be skipped without locking.
    pending: [AtomicUsize; LightType::COUNT],
    segments_created: AtomicUsize,
}

impl LightingEngine {
    /// Creates an engine owned by the calling thread.
    #[must_use]
    pub fn new(config: LightingConfig) -> (Self, OwnerToken) {
        let (state, token) =
            OwnershipGuard::new(PropagationState::new(&config), config.warn_on_foreign_access);
        let segments_created = AtomicUsize::new(config.preallocated_segments);
        let engine = Self {
            config,
            state,
            deferred: Mutex::new(Vec::new()),
            pending: Default::default(),
            segments_created,
        };
        (engine, token)
    }

    /// The settings this engine was created with.
    #[must_use]
    pub fn config(&self) -> &LightingConfig {
        &self.config
    }

    /// Queues a recompute of `pos` for `light_type`.
    ///
    /// Positions outside the packable range are ignored. When the channel's
    /// queue reaches `max_scheduled_updates` it is processed on the spot.
    pub fn schedule_update<W>(
        &self,
        token: Option<&OwnerToken>,
        world: &mut W,
        light_type: LightType,
        pos: BlockPos,
    ) where
        W: LightAccess + RenderNotifier + ?Sized,
    {
        let Some(packed) = Self::pack(pos) else {
            return;
        };
        match self.state.lock(token) {
            Access::Locked(mut state) => {
                state.schedule(world, light_type, packed);
                self.finish(&mut state, world);
            }
            Access::Reentrant => self.defer(light_type, packed),
        }
    }

    /// Queues every position of the box spanned by `min` and `max`, both inclusive.
    pub fn schedule_range_update<W>(
        &self,
        token: Option<&OwnerToken>,
        world: &mut W,
        light_type: LightType,
        min: BlockPos,
        max: BlockPos,
    ) where
        W: LightAccess + RenderNotifier + ?Sized,
    {
        let positions = (min.y().max(0)..=max.y().min(255)).flat_map(move |y| {
            (min.z()..=max.z())
                .flat_map(move |z| (min.x()..=max.x()).map(move |x| BlockPos::new(x, y, z)))
        });
        match self.state.lock(token) {
            Access::Locked(mut state) => {
                for packed in positions.filter_map(Self::pack) {
                    state.schedule(world, light_type, packed);
                }
                self.finish(&mut state, world);
            }
            Access::Reentrant => {
                for packed in positions.filter_map(Self::pack) {
                    self.defer(light_type, packed);
                }
            }
        }
    }

    /// Queues the column at `x`, `z` from `min_y` to `max_y`, both inclusive.
    #[allow(clippy::too_many_arguments)]
    pub fn schedule_column_update<W>(
        &self,
        token: Option<&OwnerToken>,
        world: &mut W,
        light_type: LightType,
        x: i32,
        z: i32,
        min_y: i32,
        max_y: i32,
    ) where
        W: LightAccess + RenderNotifier + ?Sized,
    {
        self.schedule_range_update(
            token,
            world,
            light_type,
            BlockPos::new(x, min_y, z),
            BlockPos::new(x, max_y, z),
        );
    }

    /// Resolves every queued update of `light_type` until the channel is stable.
    ///
    /// Returns immediately, without locking, if nothing is queued. Updates
    /// scheduled by the render notifier during the pass stay queued for the
    /// next call.
    pub fn process_updates<W>(&self, token: Option<&OwnerToken>, world: &mut W, light_type: LightType)
    where
        W: LightAccess + RenderNotifier + ?Sized,
    {
        if !self.has_pending_updates(light_type) {
            return;
        }
        match self.state.lock(token) {
            Access::Locked(mut state) => {
                state.process(world, light_type);
                self.finish(&mut state, world);
            }
            Access::Reentrant => {
                log::debug!("Skipping nested {light_type:?} light processing, a pass is already running");
            }
        }
    }

    /// Processes the sky channel, then the block channel.
    pub fn process_all_updates<W>(&self, token: Option<&OwnerToken>, world: &mut W)
    where
        W: LightAccess + RenderNotifier + ?Sized,
    {
        for light_type in LightType::ALL {
            self.process_updates(token, world, light_type);
        }
    }

    /// Number of raw updates waiting for `light_type`.
    #[must_use]
    pub fn pending_updates(&self, light_type: LightType) -> usize {
        self.pending[light_type.index()].load(Ordering::Acquire)
    }

    /// Checks whether `light_type` has raw updates waiting.
    #[must_use]
    pub fn has_pending_updates(&self, light_type: LightType) -> bool {
        self.pending_updates(light_type) != 0
    }

    /// Total queue segments the engine's pool had allocated when the last call finished.
    #[must_use]
    pub fn segments_created(&self) -> usize {
        self.segments_created.load(Ordering::Acquire)
    }

    /// How many times a caller without the owner's token found the engine busy.
    #[must_use]
    pub fn foreign_accesses(&self) -> u64 {
        self.state.foreign_accesses()
    }

    /// How many times the engine was called back into from a running call.
    #[must_use]
    pub fn reentrant_accesses(&self) -> u64 {
        self.state.reentrant_accesses()
    }

    fn defer(&self, light_type: LightType, pos: PackedPos) {
        self.deferred.lock().push((light_type, pos));
        self.pending[light_type.index()].fetch_add(1, Ordering::AcqRel);
    }

    /// Queues the deferred updates and publishes the counters before the lock is released.
    fn finish<W>(&self, state: &mut PropagationState, world: &mut W)
    where
        W: LightAccess + RenderNotifier + ?Sized,
    {
        loop {
            let deferred = mem::take(&mut *self.deferred.lock());
            if deferred.is_empty() {
                break;
            }
            log::debug!("Queueing {} light updates scheduled during a running call", deferred.len());
            for (light_type, pos) in deferred {
                state.schedule(world, light_type, pos);
            }
        }
        for light_type in LightType::ALL {
            self.pending[light_type.index()].store(state.pending(light_type), Ordering::Release);
        }
        self.segments_created
            .store(state.pool.segments_created(), Ordering::Release);
    }

    fn pack(pos: BlockPos) -> Option<PackedPos> {
        if PackedPos::in_range(pos.x(), pos.y(), pos.z()) {
            Some(PackedPos::from_block_pos(pos))
        } else {
            log::debug!("Ignoring light update outside the packable range at {pos}");
            None
        }
    }
}
