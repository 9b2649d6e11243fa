// Wrapper types making it harder to accidentaly use the wrong underlying type.

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::math::{vector2::Vector2, vector3::Vector3};

// A raw block state id. Using a block table this id can be resolved into opacity and emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BlockStateId(pub u16);

impl BlockStateId {
    /// The air block state. Always transparent and never emitting.
    pub const AIR: Self = Self(0);
}

// A chunk column position, `y` holds the world Z axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ChunkPos(pub Vector2<i32>);

impl ChunkPos {
    /// Creates a chunk position from chunk coordinates.
    #[must_use]
    pub const fn new(x: i32, z: i32) -> Self {
        Self(Vector2::new(x, z))
    }

    /// Chunk X coordinate.
    #[must_use]
    pub const fn x(self) -> i32 {
        self.0.x
    }

    /// Chunk Z coordinate.
    #[must_use]
    pub const fn z(self) -> i32 {
        self.0.y
    }

    /// The lowest block X coordinate inside this chunk.
    #[must_use]
    pub const fn min_block_x(self) -> i32 {
        self.0.x << 4
    }

    /// The lowest block Z coordinate inside this chunk.
    #[must_use]
    pub const fn min_block_z(self) -> i32 {
        self.0.y << 4
    }

    /// Returns the chunk offset by `dx`, `dz` chunks.
    #[must_use]
    pub const fn offset(self, dx: i32, dz: i32) -> Self {
        Self::new(self.0.x + dx, self.0.y + dz)
    }
}

impl Display for ChunkPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.0.x, self.0.y)
    }
}

// A block position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BlockPos(pub Vector3<i32>);

impl BlockPos {
    /// Creates a block position.
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self(Vector3::new(x, y, z))
    }

    /// X coordinate.
    #[must_use]
    pub const fn x(self) -> i32 {
        self.0.x
    }

    /// Y coordinate.
    #[must_use]
    pub const fn y(self) -> i32 {
        self.0.y
    }

    /// Z coordinate.
    #[must_use]
    pub const fn z(self) -> i32 {
        self.0.z
    }

    /// The chunk column containing this block.
    #[must_use]
    pub const fn chunk_pos(self) -> ChunkPos {
        ChunkPos::new(self.0.x >> 4, self.0.z >> 4)
    }

    /// Coordinates relative to the containing chunk column, `(x & 15, y, z & 15)`.
    #[must_use]
    pub const fn chunk_local(self) -> (usize, i32, usize) {
        ((self.0.x & 15) as usize, self.0.y, (self.0.z & 15) as usize)
    }

    /// Returns the position offset by the given deltas.
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.0.x + dx, self.0.y + dy, self.0.z + dz)
    }
}

impl Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.0.x, self.0.y, self.0.z)
    }
}
