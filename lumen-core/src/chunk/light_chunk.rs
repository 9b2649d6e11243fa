//! A chunk column: the spatial partition that owns light storage.

use lumen_utils::{BlockStateId, ChunkPos};

use crate::light_engine::LightType;

use super::{
    section::{ChunkSection, SECTION_SIZE},
    sky_light_sources::ChunkSkyLightSources,
};

/// Lowest block Y of a chunk column.
pub const MIN_Y: i32 = 0;
/// Number of blocks in a chunk column along Y.
pub const HEIGHT: i32 = 256;
/// Number of sections stacked in a chunk column.
pub const SECTION_COUNT: usize = HEIGHT as usize / SECTION_SIZE;

/// A 16x256x16 column of sections with sky light source tracking.
///
/// All coordinates taken by its methods are chunk-relative: `x` and `z` in
/// 0-15, `y` in `MIN_Y..MIN_Y + HEIGHT`.
#[derive(Debug, Clone)]
pub struct LightChunk {
    /// Position of the column.
    pub pos: ChunkPos,
    /// Sections from bottom to top.
    pub sections: Box<[ChunkSection]>,
    /// Per column sky light entry heights.
    pub sky_light_sources: ChunkSkyLightSources,
}

impl LightChunk {
    /// Creates an all-air, unlit column.
    #[must_use]
    pub fn new(pos: ChunkPos) -> Self {
        Self {
            pos,
            sections: (0..SECTION_COUNT).map(|_| ChunkSection::new_empty()).collect(),
            sky_light_sources: ChunkSkyLightSources::new(MIN_Y, MIN_Y + HEIGHT),
        }
    }

    /// Checks whether a relative Y lies inside the column.
    #[must_use]
    #[inline]
    pub fn contains_y(y: i32) -> bool {
        (MIN_Y..MIN_Y + HEIGHT).contains(&y)
    }

    #[inline]
    fn section_index(y: i32) -> (usize, usize) {
        debug_assert!(Self::contains_y(y), "Y {y} outside the chunk column");
        let rel_y = (y - MIN_Y) as usize;
        (rel_y / SECTION_SIZE, rel_y % SECTION_SIZE)
    }

    /// Gets the block state at a relative position.
    #[must_use]
    #[inline]
    pub fn block_state(&self, x: usize, y: i32, z: usize) -> BlockStateId {
        let (section, section_y) = Self::section_index(y);
        self.sections[section].states.get(x, section_y, z)
    }

    /// Sets the block state at a relative position and returns the old state.
    ///
    /// Sky light sources are not touched; see [`LightChunk::update_sky_source`].
    pub fn set_block_state(&mut self, x: usize, y: i32, z: usize, state: BlockStateId) -> BlockStateId {
        let (section, section_y) = Self::section_index(y);
        self.sections[section].states.set(x, section_y, z, state)
    }

    /// Gets the stored light of a channel at a relative position.
    #[must_use]
    #[inline]
    pub fn light(&self, light_type: LightType, x: usize, y: i32, z: usize) -> u8 {
        let (section, section_y) = Self::section_index(y);
        self.sections[section].light(light_type).get(x, section_y, z)
    }

    /// Stores light of a channel at a relative position.
    #[inline]
    pub fn set_light(&mut self, light_type: LightType, x: usize, y: i32, z: usize, level: u8) {
        let (section, section_y) = Self::section_index(y);
        self.sections[section]
            .light_mut(light_type)
            .set(x, section_y, z, level);
    }

    /// Checks whether the block at a relative position can see the sky.
    #[must_use]
    #[inline]
    pub fn can_see_sky(&self, x: usize, y: i32, z: usize) -> bool {
        self.sky_light_sources.can_see_sky(x, y, z)
    }

    /// Rebuilds the sky light sources of every column.
    pub fn recompute_sky_sources(&mut self, blocks_sky: impl Fn(BlockStateId) -> bool) {
        let Self {
            sections,
            sky_light_sources,
            ..
        } = self;
        sky_light_sources.recompute_all(|x, y, z| {
            let (section, section_y) = Self::section_index(y);
            blocks_sky(sections[section].states.get(x, section_y, z))
        });
    }

    /// Updates the sky source of one column after the block at `y` changed.
    ///
    /// Returns the old and new source heights if they differ.
    pub fn update_sky_source(
        &mut self,
        x: usize,
        y: i32,
        z: usize,
        blocks_sky: impl Fn(BlockStateId) -> bool,
    ) -> Option<(i32, i32)> {
        let blocks_now = blocks_sky(self.block_state(x, y, z));
        let Self {
            sections,
            sky_light_sources,
            ..
        } = self;
        sky_light_sources.update_after_edit(x, y, z, blocks_now, |column_y| {
            let (section, section_y) = Self::section_index(column_y);
            blocks_sky(sections[section].states.get(x, section_y, z))
        })
    }
}
