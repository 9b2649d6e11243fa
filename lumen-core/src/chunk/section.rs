//! This module contains the `ChunkSection` and `BlockStorage` types.

use std::mem;

use lumen_utils::BlockStateId;

use crate::light_engine::LightType;

use super::light_storage::LightStorage;

/// Blocks along one axis of a section.
pub const SECTION_SIZE: usize = 16;
/// Blocks in a section.
pub const SECTION_VOLUME: usize = SECTION_SIZE * SECTION_SIZE * SECTION_SIZE;

/// Block states of a 16x16x16 section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockStorage {
    /// Every block is the same state.
    Homogeneous(BlockStateId),
    /// One state per block, indexed `y << 8 | z << 4 | x`.
    Heterogeneous(Box<[BlockStateId; SECTION_VOLUME]>),
}

impl BlockStorage {
    #[inline]
    fn index(x: usize, y: usize, z: usize) -> usize {
        debug_assert!(x < SECTION_SIZE && y < SECTION_SIZE && z < SECTION_SIZE);
        (y << 8) | (z << 4) | x
    }

    /// Gets the block state at a section-relative position.
    #[must_use]
    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize) -> BlockStateId {
        match self {
            Self::Homogeneous(state) => *state,
            Self::Heterogeneous(states) => states[Self::index(x, y, z)],
        }
    }

    /// Sets the block state at a section-relative position and returns the old one.
    pub fn set(&mut self, x: usize, y: usize, z: usize, state: BlockStateId) -> BlockStateId {
        if let Self::Homogeneous(current) = *self {
            if current == state {
                return current;
            }
            *self = Self::Heterogeneous(Box::new([current; SECTION_VOLUME]));
        }
        match self {
            Self::Heterogeneous(states) => mem::replace(&mut states[Self::index(x, y, z)], state),
            Self::Homogeneous(current) => *current,
        }
    }

    /// Checks if the section holds nothing but air.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Homogeneous(state) => *state == BlockStateId::AIR,
            Self::Heterogeneous(states) => states.iter().all(|state| *state == BlockStateId::AIR),
        }
    }
}

/// A chunk section: its blocks and both light channels.
#[derive(Debug, Clone)]
pub struct ChunkSection {
    /// The block states in the section.
    pub states: BlockStorage,
    /// Sky light of the section.
    pub sky_light: LightStorage,
    /// Block light of the section.
    pub block_light: LightStorage,
}

impl ChunkSection {
    /// Creates a dark section holding the given blocks.
    #[must_use]
    pub fn new(states: BlockStorage) -> Self {
        Self {
            states,
            sky_light: LightStorage::new_empty(),
            block_light: LightStorage::new_empty(),
        }
    }

    /// Creates a new empty chunk section.
    #[must_use]
    pub fn new_empty() -> Self {
        Self::new(BlockStorage::Homogeneous(BlockStateId::AIR))
    }

    /// Light storage of one channel.
    #[must_use]
    #[inline]
    pub fn light(&self, light_type: LightType) -> &LightStorage {
        match light_type {
            LightType::Sky => &self.sky_light,
            LightType::Block => &self.block_light,
        }
    }

    /// Mutable light storage of one channel.
    #[inline]
    pub fn light_mut(&mut self, light_type: LightType) -> &mut LightStorage {
        match light_type {
            LightType::Sky => &mut self.sky_light,
            LightType::Block => &mut self.block_light,
        }
    }
}

impl Default for ChunkSection {
    fn default() -> Self {
        Self::new_empty()
    }
}
