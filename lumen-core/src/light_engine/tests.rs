//! End-to-end propagation scenarios, checked against an independent
//! recomputation of every voxel's expected light.

use std::{
    sync::{Arc, mpsc},
    thread,
};

use lumen_utils::{BlockPos, BlockStateId, ChunkPos};
use tracing_subscriber::EnvFilter;

use super::*;
use crate::{
    chunk::LightChunk,
    config::LightingConfig,
    world::{BlockLightProperties, ChunkMap, Level, LightRegistry},
};

fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}

struct Blocks {
    stone: BlockStateId,
    glowstone: BlockStateId,
    torch: BlockStateId,
    water: BlockStateId,
}

fn registry() -> (Arc<LightRegistry>, Blocks) {
    let mut registry = LightRegistry::new();
    let mut register = |name, opacity, emission| {
        registry
            .register(name, BlockLightProperties::new(opacity, emission))
            .unwrap()
    };
    let blocks = Blocks {
        stone: register("stone", 15, 0),
        glowstone: register("glowstone", 0, 15),
        torch: register("torch", 0, 14),
        water: register("water", 3, 0),
    };
    (Arc::new(registry), blocks)
}

fn grid(radius: i32) -> Vec<ChunkPos> {
    let mut chunks = Vec::new();
    for z in -radius..=radius {
        for x in -radius..=radius {
            chunks.push(ChunkPos::new(x, z));
        }
    }
    chunks
}

fn level_with(chunks: &[ChunkPos], config: LightingConfig) -> (Level, Blocks) {
    init_test_logging();
    let (registry, blocks) = registry();
    let mut level = Level::new(registry, config);
    for &pos in chunks {
        level.add_chunk(LightChunk::new(pos));
    }
    level.process_light_updates();
    (level, blocks)
}

fn for_each_voxel(chunks: &[ChunkPos], mut f: impl FnMut(BlockPos)) {
    for chunk in chunks {
        for y in 0..256 {
            for z in 0..16 {
                for x in 0..16 {
                    f(BlockPos::new(chunk.min_block_x() + x, y, chunk.min_block_z() + z));
                }
            }
        }
    }
}

/// The value `pos` should hold given its neighbours' stored light.
fn expected_light(map: &ChunkMap, light_type: LightType, pos: BlockPos) -> u8 {
    let own = map.own_light(light_type, pos);
    if own >= MAX_LIGHT - 1 {
        return own;
    }
    let opacity = map.opacity(pos);
    Direction::ALL
        .into_iter()
        .map(|direction| direction.relative(pos))
        .filter(|neighbor| map.is_loaded(*neighbor))
        .map(|neighbor| map.light(light_type, neighbor).saturating_sub(opacity))
        .fold(own, u8::max)
}

fn assert_fixed_point(level: &Level, chunks: &[ChunkPos]) {
    for light_type in LightType::ALL {
        let mut violations = Vec::new();
        for_each_voxel(chunks, |pos| {
            let stored = level.light(light_type, pos);
            let expected = expected_light(level.chunks(), light_type, pos);
            if stored != expected {
                violations.push((pos, stored, expected));
            }
        });
        assert!(
            violations.is_empty(),
            "{} {light_type:?} voxels off their fixed point, first (pos, stored, expected): {:?}",
            violations.len(),
            &violations[..violations.len().min(8)]
        );
    }
}

fn snapshot(level: &Level, chunks: &[ChunkPos], light_type: LightType) -> Vec<u8> {
    let mut values = Vec::new();
    for_each_voxel(chunks, |pos| values.push(level.light(light_type, pos)));
    values
}

/// Forwards to a [`ChunkMap`] while recording every light write.
struct RecordingWorld<'a> {
    inner: &'a mut ChunkMap,
    writes: usize,
    max_written: u8,
}

impl<'a> RecordingWorld<'a> {
    fn new(inner: &'a mut ChunkMap) -> Self {
        Self {
            inner,
            writes: 0,
            max_written: 0,
        }
    }
}

impl LightAccess for RecordingWorld<'_> {
    fn light(&self, light_type: LightType, pos: BlockPos) -> u8 {
        self.inner.light(light_type, pos)
    }

    fn set_light(&mut self, light_type: LightType, pos: BlockPos, level: u8) {
        self.writes += 1;
        self.max_written = self.max_written.max(level);
        self.inner.set_light(light_type, pos, level);
    }

    fn opacity(&self, pos: BlockPos) -> u8 {
        self.inner.opacity(pos)
    }

    fn emission(&self, pos: BlockPos) -> u8 {
        self.inner.emission(pos)
    }

    fn can_see_sky(&self, pos: BlockPos) -> bool {
        self.inner.can_see_sky(pos)
    }

    fn is_loaded(&self, pos: BlockPos) -> bool {
        self.inner.is_loaded(pos)
    }
}

impl RenderNotifier for RecordingWorld<'_> {
    fn mark_for_visual_update(&mut self, pos: BlockPos) {
        self.inner.mark_for_visual_update(pos);
    }
}

struct XorShift(u64);

impl XorShift {
    fn below(&mut self, bound: u64) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x % bound
    }
}

#[test]
fn test_single_emitter_falls_off_with_distance() {
    let chunks = grid(1);
    let (mut level, blocks) = level_with(&chunks, LightingConfig::default());
    level.take_dirty();

    let origin = BlockPos::new(8, 100, 8);
    level.set_block(origin, blocks.glowstone);
    level.process_light_updates();

    for distance in 0..=15 {
        let expected = 15 - distance as u8;
        assert_eq!(level.light(LightType::Block, origin.offset(distance, 0, 0)), expected);
        assert_eq!(level.light(LightType::Block, origin.offset(-distance, 0, 0)), expected);
        assert_eq!(level.light(LightType::Block, origin.offset(0, -distance, 0)), expected);
        assert_eq!(level.light(LightType::Block, origin.offset(0, 0, distance)), expected);
    }
    assert_eq!(level.light(LightType::Block, origin.offset(1, 1, 1)), 12);
    assert_eq!(level.light(LightType::Sky, origin), 15);

    let dirty = level.take_dirty();
    assert!(dirty.contains(&origin));
    assert!(dirty.contains(&origin.offset(2, 0, 0)));
    assert!(!dirty.contains(&origin.offset(20, 0, 0)));

    assert_fixed_point(&level, &chunks);
}

#[test]
fn test_removing_the_only_source_goes_dark() {
    let chunks = grid(1);
    let (mut level, blocks) = level_with(&chunks, LightingConfig::default());

    let origin = BlockPos::new(8, 100, 8);
    level.set_block(origin, blocks.glowstone);
    level.process_light_updates();
    assert_eq!(level.light(LightType::Block, origin.offset(10, 0, 0)), 5);

    level.set_block(origin, BlockStateId::AIR);
    level.process_light_updates();

    for_each_voxel(&chunks, |pos| {
        assert_eq!(level.light(LightType::Block, pos), 0, "{pos} still lit");
    });
    assert_fixed_point(&level, &chunks);
}

#[test]
fn test_occluder_casts_shadow() {
    let chunks = grid(1);
    let (mut level, blocks) = level_with(&chunks, LightingConfig::default());

    let origin = BlockPos::new(8, 100, 8);
    let target = origin.offset(5, 0, 0);
    level.set_block(origin, blocks.glowstone);
    level.process_light_updates();
    assert_eq!(level.light(LightType::Block, target), 10);

    level.set_block(origin.offset(2, 0, 0), blocks.stone);
    level.process_light_updates();
    // Shortest way around the occluder is two steps longer.
    assert_eq!(level.light(LightType::Block, target), 8);
    assert_eq!(level.light(LightType::Block, origin.offset(2, 0, 0)), 0);
    assert_fixed_point(&level, &chunks);

    for direction in Direction::ALL {
        level.set_block(direction.relative(origin), blocks.stone);
    }
    level.process_light_updates();
    assert_eq!(level.light(LightType::Block, origin), 15);
    assert_eq!(level.light(LightType::Block, target), 0);
    assert_eq!(level.light(LightType::Block, origin.offset(0, 0, 2)), 0);
    assert_fixed_point(&level, &chunks);
}

#[test]
fn test_random_scene_converges_and_is_idempotent() {
    let chunks = [
        ChunkPos::new(0, 0),
        ChunkPos::new(1, 0),
        ChunkPos::new(0, 1),
        ChunkPos::new(1, 1),
    ];
    let (mut level, blocks) = level_with(&chunks, LightingConfig::default());
    let palette = [
        blocks.stone,
        blocks.stone,
        blocks.water,
        blocks.glowstone,
        blocks.torch,
        BlockStateId::AIR,
    ];

    let mut rng = XorShift(0x9E37_79B9_7F4A_7C15);
    for _ in 0..600 {
        let pos = BlockPos::new(
            rng.below(32) as i32,
            40 + rng.below(80) as i32,
            rng.below(32) as i32,
        );
        let state = palette[rng.below(palette.len() as u64) as usize];
        level.set_block(pos, state);
    }

    {
        let (engine, token, map) = level.split_mut();
        let mut world = RecordingWorld::new(map);
        engine.process_all_updates(Some(token), &mut world);
        assert!(world.writes > 0);
        assert!(world.max_written <= MAX_LIGHT);
    }
    assert_fixed_point(&level, &chunks);

    let (engine, token, map) = level.split_mut();
    let mut world = RecordingWorld::new(map);
    engine.process_all_updates(Some(token), &mut world);
    assert_eq!(world.writes, 0);

    for chunk in chunks {
        let min = BlockPos::new(chunk.min_block_x(), 0, chunk.min_block_z());
        for light_type in LightType::ALL {
            engine.schedule_range_update(Some(token), &mut world, light_type, min, min.offset(15, 255, 15));
        }
    }
    engine.process_all_updates(Some(token), &mut world);
    assert_eq!(world.writes, 0, "a settled world must not be rewritten");
}

#[test]
fn test_darkening_keeps_light_from_other_sources() {
    let chunks = grid(1);
    let (mut level, blocks) = level_with(&chunks, LightingConfig::default());

    let kept = BlockPos::new(0, 64, 0);
    let removed = BlockPos::new(6, 64, 0);
    level.set_block(kept, blocks.glowstone);
    level.set_block(removed, blocks.glowstone);
    level.process_light_updates();
    assert_eq!(level.light(LightType::Block, BlockPos::new(5, 64, 0)), 14);

    level.set_block(removed, BlockStateId::AIR);
    level.process_light_updates();

    assert_eq!(level.light(LightType::Block, removed), 9);
    assert_eq!(level.light(LightType::Block, BlockPos::new(5, 64, 0)), 10);
    assert_eq!(level.light(LightType::Block, BlockPos::new(-3, 64, 0)), 12);
    assert_fixed_point(&level, &chunks);
}

#[test]
fn test_darkened_voxel_keeps_its_own_emission() {
    let chunks = [ChunkPos::new(0, 0)];
    let (mut level, blocks) = level_with(&chunks, LightingConfig::default());

    // An emitter placed behind the engine's back, next to light that has no source.
    let lamp = BlockPos::new(8, 64, 8);
    let stray = BlockPos::new(9, 64, 8);
    let map = level.chunks_mut();
    map.get_mut(ChunkPos::new(0, 0))
        .unwrap()
        .set_block_state(8, 64, 8, blocks.glowstone);
    map.set_light(LightType::Block, lamp, 5);
    map.set_light(LightType::Block, stray, 6);

    // Darkening the stray light reaches the lamp, which must come back at full strength.
    level.schedule_update(LightType::Block, stray);
    level.process_light_updates();

    assert_eq!(level.light(LightType::Block, lamp), 15);
    assert_eq!(level.light(LightType::Block, stray), 14);
    assert_eq!(level.light(LightType::Block, BlockPos::new(8, 64, 12)), 11);
    assert_fixed_point(&level, &chunks);
}

#[test]
fn test_opacity_changes_are_monotone() {
    let chunks = [ChunkPos::new(0, 0)];
    let (mut level, blocks) = level_with(&chunks, LightingConfig::default());

    level.set_block(BlockPos::new(8, 64, 8), blocks.torch);
    level.process_light_updates();

    let changed = BlockPos::new(10, 64, 8);
    let mut previous: Vec<Vec<u8>> = LightType::ALL
        .iter()
        .map(|&light_type| snapshot(&level, &chunks, light_type))
        .collect();

    for (state, brighter) in [
        (blocks.water, false),
        (blocks.stone, false),
        (BlockStateId::AIR, true),
    ] {
        level.set_block(changed, state);
        level.process_light_updates();

        for (index, light_type) in LightType::ALL.into_iter().enumerate() {
            let current = snapshot(&level, &chunks, light_type);
            for (before, after) in previous[index].iter().zip(&current) {
                if brighter {
                    assert!(after >= before, "{light_type:?} got darker with lower opacity");
                } else {
                    assert!(after <= before, "{light_type:?} got brighter with higher opacity");
                }
            }
            previous[index] = current;
        }
    }
    assert_fixed_point(&level, &chunks);
}

#[test]
fn test_queue_ceiling_flushes_without_dropping_updates() {
    let chunks = [ChunkPos::new(0, 0)];
    let config = LightingConfig {
        max_scheduled_updates: 64,
        ..LightingConfig::default()
    };
    let (mut level, blocks) = level_with(&chunks, config);

    let emitter = BlockPos::new(8, 100, 8);
    let chunk = level.chunks_mut().get_mut(ChunkPos::new(0, 0)).unwrap();
    chunk.set_block_state(8, 100, 8, blocks.glowstone);

    level.schedule_chunk_update(ChunkPos::new(0, 0));
    for light_type in LightType::ALL {
        assert!(level.engine().pending_updates(light_type) < 64);
    }
    // The emitter was handled by one of the early flushes.
    assert_eq!(level.light(LightType::Block, emitter), 15);

    level.process_light_updates();
    assert_eq!(level.light(LightType::Block, emitter.offset(4, 0, 0)), 11);
    assert_fixed_point(&level, &chunks);
}

#[test]
fn test_steady_state_does_not_allocate_segments() {
    let chunks = grid(1);
    let (mut level, blocks) = level_with(&chunks, LightingConfig::default());
    let origin = BlockPos::new(8, 100, 8);

    let toggle = |level: &mut Level| {
        level.set_block(origin, blocks.glowstone);
        level.process_light_updates();
        level.set_block(origin, BlockStateId::AIR);
        level.process_light_updates();
    };

    toggle(&mut level);
    toggle(&mut level);
    let created = level.engine().segments_created();
    assert!(created > 0);

    for _ in 0..5 {
        toggle(&mut level);
    }
    assert_eq!(level.engine().segments_created(), created);
}

#[test]
fn test_sky_light_reaches_under_overhang() {
    let chunks = grid(1);
    let (mut level, blocks) = level_with(&chunks, LightingConfig::default());

    for z in 4..=12 {
        for x in 4..=12 {
            level.set_block(BlockPos::new(x, 100, z), blocks.stone);
        }
    }
    level.process_light_updates();

    assert_eq!(level.light(LightType::Sky, BlockPos::new(8, 101, 8)), 15);
    assert_eq!(level.light(LightType::Sky, BlockPos::new(8, 100, 8)), 0);
    assert_eq!(level.light(LightType::Sky, BlockPos::new(8, 99, 8)), 10);
    assert_eq!(level.light(LightType::Sky, BlockPos::new(8, 0, 8)), 10);
    assert_eq!(level.light(LightType::Sky, BlockPos::new(4, 99, 8)), 14);
    assert_fixed_point(&level, &chunks);

    level.set_block(BlockPos::new(8, 100, 8), BlockStateId::AIR);
    level.process_light_updates();
    assert_eq!(level.light(LightType::Sky, BlockPos::new(8, 99, 8)), 15);
    assert_eq!(level.light(LightType::Sky, BlockPos::new(7, 99, 8)), 14);
    assert_fixed_point(&level, &chunks);
}

#[test]
fn test_light_crosses_into_later_loaded_chunks() {
    init_test_logging();
    let (registry, blocks) = registry();
    let mut level = Level::new(registry, LightingConfig::default());

    let mut roofed = LightChunk::new(ChunkPos::new(0, 0));
    for z in 0..16 {
        for x in 0..16 {
            roofed.set_block_state(x, 200, z, blocks.stone);
        }
    }
    roofed.set_block_state(15, 50, 8, blocks.glowstone);
    level.add_chunk(roofed);
    level.process_light_updates();
    assert_eq!(level.light(LightType::Sky, BlockPos::new(15, 150, 8)), 0);
    assert_eq!(level.light(LightType::Block, BlockPos::new(12, 50, 8)), 12);

    level.add_chunk(LightChunk::new(ChunkPos::new(1, 0)));
    level.process_light_updates();

    assert_eq!(level.light(LightType::Block, BlockPos::new(16, 50, 8)), 14);
    assert_eq!(level.light(LightType::Block, BlockPos::new(20, 50, 8)), 10);
    assert_eq!(level.light(LightType::Sky, BlockPos::new(16, 150, 8)), 15);
    assert_eq!(level.light(LightType::Sky, BlockPos::new(15, 150, 8)), 14);
    assert_eq!(level.light(LightType::Sky, BlockPos::new(10, 150, 8)), 9);
    assert_fixed_point(&level, &[ChunkPos::new(0, 0), ChunkPos::new(1, 0)]);

    level.remove_chunk(ChunkPos::new(1, 0));
    assert!(!level.chunks().is_loaded(BlockPos::new(16, 50, 8)));
    assert_eq!(level.light(LightType::Block, BlockPos::new(16, 50, 8)), 0);

    // Sky light that came in sideways from the unloaded chunk is gone.
    level.process_light_updates();
    assert_eq!(level.light(LightType::Sky, BlockPos::new(15, 150, 8)), 0);
    assert_eq!(level.light(LightType::Block, BlockPos::new(12, 50, 8)), 12);
    assert_fixed_point(&level, &[ChunkPos::new(0, 0)]);
}

#[test]
fn test_unloading_a_chunk_takes_its_light_from_neighbours() {
    let chunks = [ChunkPos::new(0, 0), ChunkPos::new(1, 0)];
    let (mut level, blocks) = level_with(&chunks, LightingConfig::default());

    let emitter = BlockPos::new(16, 64, 8);
    level.set_block(emitter, blocks.glowstone);
    level.process_light_updates();
    assert_eq!(level.light(LightType::Block, BlockPos::new(15, 64, 8)), 14);
    assert_eq!(level.light(LightType::Block, BlockPos::new(10, 64, 8)), 9);

    assert!(level.remove_chunk(ChunkPos::new(1, 0)).is_some());
    level.process_light_updates();

    assert_eq!(level.light(LightType::Block, BlockPos::new(15, 64, 8)), 0);
    assert_eq!(level.light(LightType::Block, BlockPos::new(10, 64, 8)), 0);
    assert_fixed_point(&level, &[ChunkPos::new(0, 0)]);
}

#[test]
fn test_saved_light_round_trips_and_bad_data_is_recomputed() {
    init_test_logging();
    let (registry, blocks) = registry();
    let pos = ChunkPos::new(0, 0);
    let scene = || {
        let mut chunk = LightChunk::new(pos);
        for z in 2..14 {
            for x in 2..14 {
                chunk.set_block_state(x, 90, z, blocks.stone);
            }
        }
        chunk.set_block_state(8, 60, 8, blocks.torch);
        chunk.set_block_state(3, 120, 12, blocks.glowstone);
        chunk
    };

    let mut saved = Level::new(Arc::clone(&registry), LightingConfig::default());
    saved.add_chunk(scene());
    saved.process_light_updates();
    assert_fixed_point(&saved, &[pos]);
    let bytes = saved.save_light(pos).unwrap();

    let mut restored = Level::new(Arc::clone(&registry), LightingConfig::default());
    restored.add_chunk(scene());
    assert!(restored.load_light(pos, &bytes));
    for light_type in LightType::ALL {
        assert_eq!(
            snapshot(&restored, &[pos], light_type),
            snapshot(&saved, &[pos], light_type)
        );
    }

    let mut recovered = Level::new(registry, LightingConfig::default());
    recovered.add_chunk(scene());
    recovered.process_light_updates();
    for section in recovered.chunks_mut().get_mut(pos).unwrap().sections.iter_mut() {
        section.sky_light.fill(0);
        section.block_light.fill(0);
    }
    assert!(!recovered.load_light(pos, &bytes[..100]));
    assert!(recovered.engine().has_pending_updates(LightType::Sky));
    recovered.process_light_updates();
    for light_type in LightType::ALL {
        assert_eq!(
            snapshot(&recovered, &[pos], light_type),
            snapshot(&saved, &[pos], light_type)
        );
    }
}

/// A world that stalls its first render notification until another thread has
/// run into the busy engine.
struct StallingWorld {
    inner: ChunkMap,
    engine: Arc<LightingEngine>,
    go: Option<mpsc::Sender<()>>,
}

impl LightAccess for StallingWorld {
    fn light(&self, light_type: LightType, pos: BlockPos) -> u8 {
        self.inner.light(light_type, pos)
    }

    fn set_light(&mut self, light_type: LightType, pos: BlockPos, level: u8) {
        self.inner.set_light(light_type, pos, level);
    }

    fn opacity(&self, pos: BlockPos) -> u8 {
        self.inner.opacity(pos)
    }

    fn emission(&self, pos: BlockPos) -> u8 {
        self.inner.emission(pos)
    }

    fn can_see_sky(&self, pos: BlockPos) -> bool {
        self.inner.can_see_sky(pos)
    }

    fn is_loaded(&self, pos: BlockPos) -> bool {
        self.inner.is_loaded(pos)
    }
}

impl RenderNotifier for StallingWorld {
    fn mark_for_visual_update(&mut self, pos: BlockPos) {
        if let Some(go) = self.go.take() {
            go.send(()).unwrap();
            while self.engine.foreign_accesses() == 0 {
                thread::yield_now();
            }
        }
        self.inner.mark_for_visual_update(pos);
    }
}

#[test]
fn test_foreign_thread_is_reported_then_served() {
    init_test_logging();
    let (registry, blocks) = registry();
    let (engine, token) = LightingEngine::new(LightingConfig::default());
    let engine = Arc::new(engine);

    let mut chunk = LightChunk::new(ChunkPos::new(0, 0));
    chunk.set_block_state(8, 30, 8, blocks.glowstone);
    let mut inner = ChunkMap::new(Arc::clone(&registry));
    inner.insert(chunk);

    let (go_tx, go_rx) = mpsc::channel();
    let mut world = StallingWorld {
        inner,
        engine: Arc::clone(&engine),
        go: Some(go_tx),
    };

    let foreign = {
        let engine = Arc::clone(&engine);
        let mut other = ChunkMap::new(registry);
        thread::spawn(move || {
            go_rx.recv().unwrap();
            engine.schedule_update(None, &mut other, LightType::Block, BlockPos::new(1, 1, 1));
        })
    };

    let emitter = BlockPos::new(8, 30, 8);
    engine.schedule_update(Some(&token), &mut world, LightType::Block, emitter);
    engine.process_updates(Some(&token), &mut world, LightType::Block);
    foreign.join().unwrap();

    assert_eq!(engine.foreign_accesses(), 1);
    assert_eq!(world.inner.light(LightType::Block, emitter), 15);
    assert_eq!(engine.pending_updates(LightType::Block), 1);
}

/// A world whose first render notification schedules another update on the
/// engine that is notifying it.
struct ReschedulingWorld<'a> {
    inner: ChunkMap,
    engine: &'a LightingEngine,
    token: &'a OwnerToken,
    follow_up: Option<BlockPos>,
}

impl LightAccess for ReschedulingWorld<'_> {
    fn light(&self, light_type: LightType, pos: BlockPos) -> u8 {
        self.inner.light(light_type, pos)
    }

    fn set_light(&mut self, light_type: LightType, pos: BlockPos, level: u8) {
        self.inner.set_light(light_type, pos, level);
    }

    fn opacity(&self, pos: BlockPos) -> u8 {
        self.inner.opacity(pos)
    }

    fn emission(&self, pos: BlockPos) -> u8 {
        self.inner.emission(pos)
    }

    fn can_see_sky(&self, pos: BlockPos) -> bool {
        self.inner.can_see_sky(pos)
    }

    fn is_loaded(&self, pos: BlockPos) -> bool {
        self.inner.is_loaded(pos)
    }
}

impl RenderNotifier for ReschedulingWorld<'_> {
    fn mark_for_visual_update(&mut self, pos: BlockPos) {
        if let Some(follow_up) = self.follow_up.take() {
            let (engine, token) = (self.engine, self.token);
            engine.schedule_update(Some(token), self, LightType::Block, follow_up);
            engine.process_updates(Some(token), self, LightType::Block);
        }
        self.inner.mark_for_visual_update(pos);
    }
}

#[test]
fn test_notifier_can_schedule_during_a_pass() {
    init_test_logging();
    let (registry, blocks) = registry();
    let (engine, token) = LightingEngine::new(LightingConfig::default());

    let mut chunk = LightChunk::new(ChunkPos::new(0, 0));
    chunk.set_block_state(8, 30, 8, blocks.glowstone);
    let mut inner = ChunkMap::new(registry);
    inner.insert(chunk);

    let follow_up = BlockPos::new(3, 30, 3);
    let mut world = ReschedulingWorld {
        inner,
        engine: &engine,
        token: &token,
        follow_up: Some(follow_up),
    };

    let emitter = BlockPos::new(8, 30, 8);
    engine.schedule_update(Some(&token), &mut world, LightType::Block, emitter);
    engine.process_updates(Some(&token), &mut world, LightType::Block);

    assert_eq!(world.inner.light(LightType::Block, emitter), 15);
    assert_eq!(engine.reentrant_accesses(), 2);
    assert_eq!(engine.foreign_accesses(), 0);
    assert_eq!(engine.pending_updates(LightType::Block), 1);

    engine.process_updates(Some(&token), &mut world, LightType::Block);
    assert!(!engine.has_pending_updates(LightType::Block));
    assert_eq!(world.inner.light(LightType::Block, follow_up), 5);
}

#[test]
fn test_out_of_range_updates_are_ignored() {
    let chunks = [ChunkPos::new(0, 0)];
    let (mut level, _) = level_with(&chunks, LightingConfig::default());

    level.schedule_update(LightType::Block, BlockPos::new(0, 300, 0));
    level.schedule_update(LightType::Block, BlockPos::new(1 << 26, 10, 0));
    assert!(!level.engine().has_pending_updates(LightType::Block));

    level.schedule_update(LightType::Block, BlockPos::new(0, 10, 0));
    assert_eq!(level.engine().pending_updates(LightType::Block), 1);
    level.process_light_updates();
    assert!(!level.engine().has_pending_updates(LightType::Block));
}
