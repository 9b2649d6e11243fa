//! Loaded chunk columns, exposed to the light engine as voxel storage.

use std::{mem, sync::Arc};

use lumen_utils::{BlockPos, BlockStateId, ChunkPos};
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use crate::{
    chunk::LightChunk,
    light_engine::{Direction, LightAccess, LightType, RenderNotifier},
};

use super::light_registry::LightRegistry;

/// The horizontally adjacent chunks of a column that are loaded.
pub type LoadedNeighbors = SmallVec<[(Direction, ChunkPos); 4]>;

/// Directions to the four horizontal neighbours of a chunk column.
pub const HORIZONTAL: [Direction; 4] = [
    Direction::North,
    Direction::South,
    Direction::West,
    Direction::East,
];

/// A map of loaded chunk columns keyed by position.
///
/// Positions in missing columns, or outside the column height, are reported
/// as not loaded and read as dark.
#[derive(Debug)]
pub struct ChunkMap {
    chunks: FxHashMap<ChunkPos, LightChunk>,
    registry: Arc<LightRegistry>,
    /// Positions whose light settled since the last [`ChunkMap::take_dirty`].
    dirty: FxHashSet<BlockPos>,
}

impl ChunkMap {
    /// Creates an empty map resolving block states through `registry`.
    #[must_use]
    pub fn new(registry: Arc<LightRegistry>) -> Self {
        Self {
            chunks: FxHashMap::default(),
            registry,
            dirty: FxHashSet::default(),
        }
    }

    /// The block state table.
    #[must_use]
    pub fn registry(&self) -> &LightRegistry {
        &self.registry
    }

    /// Inserts a column, returning the one it replaced.
    pub fn insert(&mut self, chunk: LightChunk) -> Option<LightChunk> {
        self.chunks.insert(chunk.pos, chunk)
    }

    /// Removes a column.
    pub fn remove(&mut self, pos: ChunkPos) -> Option<LightChunk> {
        self.chunks.remove(&pos)
    }

    /// Gets a loaded column.
    #[must_use]
    pub fn get(&self, pos: ChunkPos) -> Option<&LightChunk> {
        self.chunks.get(&pos)
    }

    /// Gets a loaded column mutably.
    pub fn get_mut(&mut self, pos: ChunkPos) -> Option<&mut LightChunk> {
        self.chunks.get_mut(&pos)
    }

    /// Checks whether a column is loaded.
    #[must_use]
    pub fn contains(&self, pos: ChunkPos) -> bool {
        self.chunks.contains_key(&pos)
    }

    /// Loaded horizontal neighbours of `pos`.
    #[must_use]
    pub fn loaded_neighbors(&self, pos: ChunkPos) -> LoadedNeighbors {
        HORIZONTAL
            .into_iter()
            .filter_map(|direction| {
                let (dx, _, dz) = direction.offset();
                let neighbor = pos.offset(dx, dz);
                self.contains(neighbor).then_some((direction, neighbor))
            })
            .collect()
    }

    /// Block state at a world position, air if not loaded.
    #[must_use]
    pub fn block_state(&self, pos: BlockPos) -> BlockStateId {
        self.locate(pos)
            .map_or(BlockStateId::AIR, |(chunk, x, y, z)| chunk.block_state(x, y, z))
    }

    /// Sky source height of the column at world `x`, `z`, if its chunk is loaded.
    #[must_use]
    pub fn sky_source_height(&self, x: i32, z: i32) -> Option<i32> {
        let (local_x, _, local_z) = BlockPos::new(x, 0, z).chunk_local();
        self.chunks
            .get(&BlockPos::new(x, 0, z).chunk_pos())
            .map(|chunk| chunk.sky_light_sources.get(local_x, local_z))
    }

    /// Replaces the block at `pos` and keeps the column's sky source current.
    ///
    /// Returns the previous state and, if the sky source moved, its old and new
    /// heights. Returns `None` if `pos` is not loaded.
    pub fn replace_block(
        &mut self,
        pos: BlockPos,
        state: BlockStateId,
    ) -> Option<(BlockStateId, Option<(i32, i32)>)> {
        let (x, y, z) = pos.chunk_local();
        if !LightChunk::contains_y(y) {
            return None;
        }
        let Self {
            chunks, registry, ..
        } = self;
        let chunk = chunks.get_mut(&pos.chunk_pos())?;
        let old = chunk.set_block_state(x, y, z, state);
        if old == state {
            return Some((old, None));
        }
        let sky_change = chunk.update_sky_source(x, y, z, |block| registry.blocks_sky(block));
        Some((old, sky_change))
    }

    /// Drains the positions whose light settled since the last call.
    pub fn take_dirty(&mut self) -> FxHashSet<BlockPos> {
        mem::take(&mut self.dirty)
    }

    #[inline]
    fn locate(&self, pos: BlockPos) -> Option<(&LightChunk, usize, i32, usize)> {
        let (x, y, z) = pos.chunk_local();
        if !LightChunk::contains_y(y) {
            return None;
        }
        self.chunks
            .get(&pos.chunk_pos())
            .map(|chunk| (chunk, x, y, z))
    }
}

impl LightAccess for ChunkMap {
    fn light(&self, light_type: LightType, pos: BlockPos) -> u8 {
        self.locate(pos)
            .map_or(0, |(chunk, x, y, z)| chunk.light(light_type, x, y, z))
    }

    fn set_light(&mut self, light_type: LightType, pos: BlockPos, level: u8) {
        let (x, y, z) = pos.chunk_local();
        if !LightChunk::contains_y(y) {
            return;
        }
        if let Some(chunk) = self.chunks.get_mut(&pos.chunk_pos()) {
            chunk.set_light(light_type, x, y, z, level);
        }
    }

    fn opacity(&self, pos: BlockPos) -> u8 {
        self.registry.opacity(self.block_state(pos))
    }

    fn emission(&self, pos: BlockPos) -> u8 {
        self.registry.emission(self.block_state(pos))
    }

    fn can_see_sky(&self, pos: BlockPos) -> bool {
        self.locate(pos)
            .is_some_and(|(chunk, x, y, z)| chunk.can_see_sky(x, y, z))
    }

    fn is_loaded(&self, pos: BlockPos) -> bool {
        self.locate(pos).is_some()
    }
}

impl RenderNotifier for ChunkMap {
    fn mark_for_visual_update(&mut self, pos: BlockPos) {
        self.dirty.insert(pos);
    }
}
