//! Cardinal direction enum for light propagation.

use lumen_utils::BlockPos;

use super::packed_pos::PackedPos;

/// Six cardinal directions for light propagation.
///
/// The ordinal values (0-5) index the neighbour slots of the propagation cursor.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Downward (-Y direction) - ordinal 0
    Down = 0,
    /// Upward (+Y direction) - ordinal 1
    Up = 1,
    /// North (-Z direction) - ordinal 2
    North = 2,
    /// South (+Z direction) - ordinal 3
    South = 3,
    /// West (-X direction) - ordinal 4
    West = 4,
    /// East (+X direction) - ordinal 5
    East = 5,
}

impl Direction {
    /// All six directions in array form for iteration.
    pub const ALL: [Direction; 6] = [
        Direction::Down,
        Direction::Up,
        Direction::North,
        Direction::South,
        Direction::West,
        Direction::East,
    ];

    /// Returns the opposite direction.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Down => Self::Up,
            Self::Up => Self::Down,
            Self::North => Self::South,
            Self::South => Self::North,
            Self::West => Self::East,
            Self::East => Self::West,
        }
    }

    /// Gets the offset in the given direction.
    ///
    /// Returns (dx, dy, dz) for this direction.
    #[must_use]
    pub const fn offset(self) -> (i32, i32, i32) {
        match self {
            Self::Down => (0, -1, 0),
            Self::Up => (0, 1, 0),
            Self::North => (0, 0, -1),
            Self::South => (0, 0, 1),
            Self::West => (-1, 0, 0),
            Self::East => (1, 0, 0),
        }
    }

    /// The value added to a [`PackedPos`] to step one voxel in this direction.
    ///
    /// Only valid when the step stays inside the packable range.
    #[must_use]
    pub(crate) const fn packed_delta(self) -> u64 {
        match self {
            Self::Down => PackedPos::Y_UNIT.wrapping_neg(),
            Self::Up => PackedPos::Y_UNIT,
            Self::North => PackedPos::Z_UNIT.wrapping_neg(),
            Self::South => PackedPos::Z_UNIT,
            Self::West => PackedPos::X_UNIT.wrapping_neg(),
            Self::East => PackedPos::X_UNIT,
        }
    }

    /// Returns a new `BlockPos` relative to the given position in this direction.
    #[must_use]
    pub fn relative(self, pos: BlockPos) -> BlockPos {
        let (dx, dy, dz) = self.offset();
        pos.offset(dx, dy, dz)
    }
}
