//! A world of chunk columns lit by one [`LightingEngine`].

use std::sync::Arc;

use lumen_utils::{BlockPos, BlockStateId, ChunkPos};
use rustc_hash::FxHashSet;

use crate::{
    chunk::{
        LightChunk, LightDataError, deserialize_light,
        light_chunk::{HEIGHT, MIN_Y},
        section::{BlockStorage, SECTION_SIZE},
        serialize_light,
    },
    config::LightingConfig,
    light_engine::{Direction, LightAccess, LightType, LightingEngine, OwnerToken},
};

use super::{
    chunk_map::{ChunkMap, HORIZONTAL},
    light_registry::LightRegistry,
};

const MAX_Y: i32 = MIN_Y + HEIGHT - 1;

/// Chunk storage and the light engine that keeps it lit.
///
/// A level is owned by the thread that created it; it holds that thread's
/// [`OwnerToken`] and passes it on every engine call.
#[derive(Debug)]
pub struct Level {
    chunks: ChunkMap,
    engine: LightingEngine,
    token: OwnerToken,
}

impl Level {
    /// Creates an empty level.
    #[must_use]
    pub fn new(registry: Arc<LightRegistry>, config: LightingConfig) -> Self {
        let (engine, token) = LightingEngine::new(config);
        Self {
            chunks: ChunkMap::new(registry),
            engine,
            token,
        }
    }

    /// The loaded chunks.
    #[must_use]
    pub fn chunks(&self) -> &ChunkMap {
        &self.chunks
    }

    /// The loaded chunks, mutably. Edits made here are not scheduled for lighting.
    pub fn chunks_mut(&mut self) -> &mut ChunkMap {
        &mut self.chunks
    }

    /// The light engine.
    #[must_use]
    pub fn engine(&self) -> &LightingEngine {
        &self.engine
    }

    /// The token of the thread owning this level.
    #[must_use]
    pub fn token(&self) -> &OwnerToken {
        &self.token
    }

    /// Borrows the engine, the owner token and the chunks at once, for driving
    /// the engine through a wrapping accessor.
    pub fn split_mut(&mut self) -> (&LightingEngine, &OwnerToken, &mut ChunkMap) {
        (&self.engine, &self.token, &mut self.chunks)
    }

    /// Loads a chunk and schedules its initial lighting.
    ///
    /// Sky light above every column's source height and above all neighbouring
    /// source heights is written directly. The band in between, emitters and
    /// the faces shared with loaded neighbours are left to the engine.
    pub fn add_chunk(&mut self, mut chunk: LightChunk) {
        let pos = chunk.pos;
        let registry = self.chunks.registry();
        chunk.recompute_sky_sources(|state| registry.blocks_sky(state));

        let mut sky_bands = Vec::new();
        for z in 0..SECTION_SIZE {
            for x in 0..SECTION_SIZE {
                let height = chunk.sky_light_sources.get(x, z);
                let top = HORIZONTAL
                    .into_iter()
                    .filter_map(|direction| self.neighbor_source_height(&chunk, x, z, direction))
                    .fold(height, i32::max);
                for y in top..=MAX_Y {
                    chunk.set_light(LightType::Sky, x, y, z, LightType::Sky.default_value());
                }
                if top > height {
                    sky_bands.push((x as i32, z as i32, height, top - 1));
                }
            }
        }
        let emitters = Self::emitters(&chunk, registry);

        let neighbors = self.chunks.loaded_neighbors(pos);
        if self.chunks.insert(chunk).is_some() {
            log::warn!("Chunk {pos} was already loaded, replacing it");
        }
        log::debug!(
            "Loaded chunk {pos}: {} sky bands, {} emitters, {} loaded neighbours",
            sky_bands.len(),
            emitters.len(),
            neighbors.len()
        );

        let (base_x, base_z) = (pos.min_block_x(), pos.min_block_z());
        for (x, z, min_y, max_y) in sky_bands {
            self.engine.schedule_column_update(
                Some(&self.token),
                &mut self.chunks,
                LightType::Sky,
                base_x + x,
                base_z + z,
                min_y,
                max_y,
            );
        }
        for emitter in emitters {
            self.schedule_update(LightType::Block, emitter);
        }
        for (direction, neighbor) in neighbors {
            for (min, max) in [face_bounds(pos, direction), face_bounds(neighbor, direction.opposite())] {
                for light_type in LightType::ALL {
                    self.engine.schedule_range_update(
                        Some(&self.token),
                        &mut self.chunks,
                        light_type,
                        min,
                        max,
                    );
                }
            }
        }
    }

    /// Unloads a chunk. Its voxels act as absent from now on.
    ///
    /// The faces of loaded neighbours that touched it are scheduled on both
    /// channels, so light that reached them through the chunk is taken back
    /// on the next process call.
    pub fn remove_chunk(&mut self, pos: ChunkPos) -> Option<LightChunk> {
        let removed = self.chunks.remove(pos)?;
        let neighbors = self.chunks.loaded_neighbors(pos);
        log::debug!("Unloaded chunk {pos}, {} loaded neighbours", neighbors.len());

        for (direction, neighbor) in neighbors {
            let (min, max) = face_bounds(neighbor, direction.opposite());
            for light_type in LightType::ALL {
                self.engine.schedule_range_update(
                    Some(&self.token),
                    &mut self.chunks,
                    light_type,
                    min,
                    max,
                );
            }
        }
        Some(removed)
    }

    /// Replaces a block and schedules every voxel whose light may change.
    ///
    /// Returns the previous state, or `None` if `pos` is not loaded.
    pub fn set_block(&mut self, pos: BlockPos, state: BlockStateId) -> Option<BlockStateId> {
        let (old, sky_change) = self.chunks.replace_block(pos, state)?;
        if old == state {
            return Some(old);
        }
        for light_type in LightType::ALL {
            self.schedule_update(light_type, pos);
        }
        if let Some((old_height, new_height)) = sky_change {
            self.engine.schedule_column_update(
                Some(&self.token),
                &mut self.chunks,
                LightType::Sky,
                pos.x(),
                pos.z(),
                old_height.min(new_height),
                old_height.max(new_height) - 1,
            );
        }
        Some(old)
    }

    /// Queues a recompute of one voxel.
    pub fn schedule_update(&mut self, light_type: LightType, pos: BlockPos) {
        self.engine
            .schedule_update(Some(&self.token), &mut self.chunks, light_type, pos);
    }

    /// Queues a recompute of every voxel of a loaded chunk on both channels.
    pub fn schedule_chunk_update(&mut self, pos: ChunkPos) {
        if !self.chunks.contains(pos) {
            log::debug!("Skipping light recompute of unloaded chunk {pos}");
            return;
        }
        let min = BlockPos::new(pos.min_block_x(), MIN_Y, pos.min_block_z());
        let max = min.offset(SECTION_SIZE as i32 - 1, HEIGHT - 1, SECTION_SIZE as i32 - 1);
        for light_type in LightType::ALL {
            self.engine
                .schedule_range_update(Some(&self.token), &mut self.chunks, light_type, min, max);
        }
    }

    /// Processes every queued update of both channels.
    pub fn process_light_updates(&mut self) {
        self.engine
            .process_all_updates(Some(&self.token), &mut self.chunks);
    }

    /// Stored light at `pos`. Queued updates are not applied first.
    #[must_use]
    pub fn light(&self, light_type: LightType, pos: BlockPos) -> u8 {
        self.chunks.light(light_type, pos)
    }

    /// Drains the positions whose light settled since the last call.
    pub fn take_dirty(&mut self) -> FxHashSet<BlockPos> {
        self.chunks.take_dirty()
    }

    /// Serializes the light of a loaded chunk.
    #[must_use]
    pub fn save_light(&self, pos: ChunkPos) -> Option<Vec<u8>> {
        self.chunks.get(pos).map(serialize_light)
    }

    /// Restores the light of a loaded chunk from serialized data.
    ///
    /// If the data is rejected the chunk keeps its current light and is
    /// scheduled for a full recompute instead. Returns whether the data was
    /// applied.
    pub fn load_light(&mut self, pos: ChunkPos, bytes: &[u8]) -> bool {
        let Some(chunk) = self.chunks.get_mut(pos) else {
            log::debug!("Ignoring light data for unloaded chunk {pos}");
            return false;
        };
        match deserialize_light(chunk, bytes) {
            Ok(()) => true,
            Err(err) => {
                self.recover_light(pos, &err);
                false
            }
        }
    }

    fn recover_light(&mut self, pos: ChunkPos, err: &LightDataError) {
        log::warn!("Discarding light data of chunk {pos}, recomputing: {err}");
        self.schedule_chunk_update(pos);
    }

    /// Sky source height of the column next to `x`, `z` in `direction`.
    fn neighbor_source_height(
        &self,
        chunk: &LightChunk,
        x: usize,
        z: usize,
        direction: Direction,
    ) -> Option<i32> {
        let (dx, _, dz) = direction.offset();
        let (nx, nz) = (x as i32 + dx, z as i32 + dz);
        let inside = 0..SECTION_SIZE as i32;
        if inside.contains(&nx) && inside.contains(&nz) {
            Some(chunk.sky_light_sources.get(nx as usize, nz as usize))
        } else {
            self.chunks
                .sky_source_height(chunk.pos.min_block_x() + nx, chunk.pos.min_block_z() + nz)
        }
    }

    /// World positions of every light emitting block in `chunk`.
    fn emitters(chunk: &LightChunk, registry: &LightRegistry) -> Vec<BlockPos> {
        let mut emitters = Vec::new();
        for (index, section) in chunk.sections.iter().enumerate() {
            match section.states {
                BlockStorage::Homogeneous(state) if registry.emission(state) == 0 => continue,
                _ => {}
            }
            let base_y = MIN_Y + (index * SECTION_SIZE) as i32;
            for y in 0..SECTION_SIZE {
                for z in 0..SECTION_SIZE {
                    for x in 0..SECTION_SIZE {
                        if registry.emission(section.states.get(x, y, z)) > 0 {
                            emitters.push(BlockPos::new(
                                chunk.pos.min_block_x() + x as i32,
                                base_y + y as i32,
                                chunk.pos.min_block_z() + z as i32,
                            ));
                        }
                    }
                }
            }
        }
        emitters
    }
}

/// The full-height slice of `chunk` facing `direction`, as inclusive bounds.
fn face_bounds(chunk: ChunkPos, direction: Direction) -> (BlockPos, BlockPos) {
    let edge = SECTION_SIZE as i32 - 1;
    let (dx, _, dz) = direction.offset();
    let (min_x, max_x) = match dx {
        1 => (edge, edge),
        -1 => (0, 0),
        _ => (0, edge),
    };
    let (min_z, max_z) = match dz {
        1 => (edge, edge),
        -1 => (0, 0),
        _ => (0, edge),
    };
    let (base_x, base_z) = (chunk.min_block_x(), chunk.min_block_z());
    (
        BlockPos::new(base_x + min_x, MIN_Y, base_z + min_z),
        BlockPos::new(base_x + max_x, MAX_Y, base_z + max_z),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_face_bounds() {
        let chunk = ChunkPos::new(1, -1);
        assert_eq!(
            face_bounds(chunk, Direction::East),
            (BlockPos::new(31, 0, -16), BlockPos::new(31, 255, -1))
        );
        assert_eq!(
            face_bounds(chunk, Direction::North),
            (BlockPos::new(16, 0, -16), BlockPos::new(31, 255, -16))
        );
    }

    #[test]
    fn test_open_chunk_is_fully_sky_lit_without_updates() {
        let mut level = Level::new(Arc::new(LightRegistry::new()), LightingConfig::default());
        level.add_chunk(LightChunk::new(ChunkPos::new(0, 0)));

        assert!(!level.engine().has_pending_updates(LightType::Sky));
        assert!(!level.engine().has_pending_updates(LightType::Block));
        assert_eq!(level.light(LightType::Sky, BlockPos::new(7, 0, 7)), 15);
        assert_eq!(level.light(LightType::Block, BlockPos::new(7, 0, 7)), 0);
    }

    #[test]
    fn test_unloaded_positions_are_ignored() {
        let mut level = Level::new(Arc::new(LightRegistry::new()), LightingConfig::default());
        assert_eq!(level.set_block(BlockPos::new(0, 10, 0), BlockStateId(1)), None);
        assert!(!level.load_light(ChunkPos::new(0, 0), &[]));
        assert_eq!(level.save_light(ChunkPos::new(0, 0)), None);
        assert!(level.remove_chunk(ChunkPos::new(0, 0)).is_none());
    }
}
