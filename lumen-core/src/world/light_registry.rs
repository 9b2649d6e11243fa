//! Opacity and emission of block states.

use lumen_utils::BlockStateId;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::light_engine::MAX_LIGHT;

/// Light related properties of one block state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockLightProperties {
    /// Light absorbed entering the block, 0-15. Zero lets light through unchanged
    /// apart from the one level every step costs.
    pub opacity: u8,
    /// Light emitted by the block, 0-15.
    pub emission: u8,
}

impl BlockLightProperties {
    /// Fully transparent and dark.
    pub const AIR: Self = Self {
        opacity: 0,
        emission: 0,
    };

    /// Creates properties, clamping both values to 0-15.
    #[must_use]
    pub const fn new(opacity: u8, emission: u8) -> Self {
        Self {
            opacity: if opacity > MAX_LIGHT { MAX_LIGHT } else { opacity },
            emission: if emission > MAX_LIGHT { MAX_LIGHT } else { emission },
        }
    }

    /// Whether the block stops sky light from falling straight down.
    #[must_use]
    pub const fn blocks_sky(self) -> bool {
        self.opacity > 0
    }
}

/// Errors raised while registering block states.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// Every state id is taken.
    #[error("block state ids exhausted")]
    Full,
    /// The name was already registered.
    #[error("block state {0} already registered")]
    Duplicate(&'static str),
}

/// Block state table used by the light engine.
///
/// State [`BlockStateId::AIR`] is always registered as `"air"`. Unknown states
/// read as air.
#[derive(Debug, Clone)]
pub struct LightRegistry {
    by_id: Vec<BlockLightProperties>,
    by_name: FxHashMap<&'static str, BlockStateId>,
}

impl LightRegistry {
    /// Creates a registry holding only air.
    #[must_use]
    pub fn new() -> Self {
        let mut by_name = FxHashMap::default();
        by_name.insert("air", BlockStateId::AIR);
        Self {
            by_id: vec![BlockLightProperties::AIR],
            by_name,
        }
    }

    /// Registers a new block state and returns its id.
    pub fn register(
        &mut self,
        name: &'static str,
        properties: BlockLightProperties,
    ) -> Result<BlockStateId, RegistryError> {
        if self.by_name.contains_key(name) {
            return Err(RegistryError::Duplicate(name));
        }
        let id = u16::try_from(self.by_id.len()).map_err(|_| RegistryError::Full)?;
        let id = BlockStateId(id);
        self.by_id.push(properties);
        self.by_name.insert(name, id);
        Ok(id)
    }

    /// Raw properties of a state.
    #[must_use]
    #[inline]
    pub fn properties(&self, state: BlockStateId) -> BlockLightProperties {
        self.by_id
            .get(usize::from(state.0))
            .copied()
            .unwrap_or(BlockLightProperties::AIR)
    }

    /// Opacity of a state as the engine sees it, clamped to 1-15.
    #[must_use]
    #[inline]
    pub fn opacity(&self, state: BlockStateId) -> u8 {
        self.properties(state).opacity.clamp(1, MAX_LIGHT)
    }

    /// Emission of a state.
    #[must_use]
    #[inline]
    pub fn emission(&self, state: BlockStateId) -> u8 {
        self.properties(state).emission
    }

    /// Whether a state stops sky light from falling straight down.
    #[must_use]
    #[inline]
    pub fn blocks_sky(&self, state: BlockStateId) -> bool {
        self.properties(state).blocks_sky()
    }
}

impl Default for LightRegistry {
    fn default() -> Self {
        Self::new()
    }
}
