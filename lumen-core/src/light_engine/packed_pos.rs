//! `PackedPos` bit-packing for light queue entries.
//!
//! A voxel position and an optional light level share one u64 so queues can
//! store plain integers:
//!
//! ```text
//! Bit Position:  63..60  59......52  51..................26  25...................0
//!                | TAG  |    Y      |          X           |          Z           |
//!                   |        |                 |                      |
//!                   |        |                 |                      +-> Z + 2^25 (26 bits)
//!                   |        |                 +------------------------> X + 2^25 (26 bits)
//!                   |        +------------------------------------------> Y (8 bits, 0..=255)
//!                   +---------------------------------------------------> Light level tag (4 bits)
//! ```
//!
//! X and Z are biased so the signed range `-2^25..2^25` maps onto the unsigned
//! field. Positions outside that range, or with Y outside `0..=255`, cannot be
//! encoded; callers must check with [`PackedPos::in_range`] first.

use lumen_utils::BlockPos;

use super::direction::Direction;

const Z_BITS: u32 = 26;
const X_BITS: u32 = 26;
const Y_BITS: u32 = 8;
const TAG_BITS: u32 = 4;

const Z_SHIFT: u32 = 0;
const X_SHIFT: u32 = Z_SHIFT + Z_BITS;
const Y_SHIFT: u32 = X_SHIFT + X_BITS;
const TAG_SHIFT: u32 = Y_SHIFT + Y_BITS;

const Z_MASK: u64 = (1 << Z_BITS) - 1;
const X_MASK: u64 = (1 << X_BITS) - 1;
const Y_MASK: u64 = (1 << Y_BITS) - 1;
const TAG_MASK: u64 = (1 << TAG_BITS) - 1;

const XZ_BIAS: i32 = 1 << (X_BITS - 1);

/// Mask over every bit that carries position, excluding the tag.
const POSITION_MASK: u64 = !(TAG_MASK << TAG_SHIFT);

/// Mask keeping only the chunk part of X and Z (everything above their low 4 bits).
const COLUMN_MASK: u64 = ((X_MASK >> 4) << (X_SHIFT + 4)) | ((Z_MASK >> 4) << (Z_SHIFT + 4));

/// Lowest encodable Y.
pub const MIN_Y: i32 = 0;
/// Highest encodable Y.
pub const MAX_Y: i32 = Y_MASK as i32;
/// Lowest encodable X or Z.
pub const MIN_XZ: i32 = -XZ_BIAS;
/// Highest encodable X or Z.
pub const MAX_XZ: i32 = XZ_BIAS - 1;

/// A voxel position packed into a u64, optionally tagged with a light level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PackedPos(u64);

impl PackedPos {
    /// Packs a position. The coordinates must satisfy [`PackedPos::in_range`].
    #[must_use]
    #[inline]
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        debug_assert!(Self::in_range(x, y, z), "position ({x}, {y}, {z}) cannot be packed");
        Self(
            (((y as u64) & Y_MASK) << Y_SHIFT)
                | ((((x + XZ_BIAS) as u64) & X_MASK) << X_SHIFT)
                | ((((z + XZ_BIAS) as u64) & Z_MASK) << Z_SHIFT),
        )
    }

    /// Packs a block position. See [`PackedPos::new`].
    #[must_use]
    #[inline]
    pub fn from_block_pos(pos: BlockPos) -> Self {
        Self::new(pos.x(), pos.y(), pos.z())
    }

    /// Checks whether a coordinate triple fits the bit layout.
    #[must_use]
    #[inline]
    pub const fn in_range(x: i32, y: i32, z: i32) -> bool {
        y >= MIN_Y && y <= MAX_Y && x >= MIN_XZ && x <= MAX_XZ && z >= MIN_XZ && z <= MAX_XZ
    }

    /// Reinterprets a raw queue value.
    #[must_use]
    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw u64, including the tag.
    #[must_use]
    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// X coordinate.
    #[must_use]
    #[inline]
    pub const fn x(self) -> i32 {
        ((self.0 >> X_SHIFT) & X_MASK) as i32 - XZ_BIAS
    }

    /// Y coordinate.
    #[must_use]
    #[inline]
    pub const fn y(self) -> i32 {
        ((self.0 >> Y_SHIFT) & Y_MASK) as i32
    }

    /// Z coordinate.
    #[must_use]
    #[inline]
    pub const fn z(self) -> i32 {
        ((self.0 >> Z_SHIFT) & Z_MASK) as i32 - XZ_BIAS
    }

    /// Unpacks into a block position, ignoring the tag.
    #[must_use]
    #[inline]
    pub const fn block_pos(self) -> BlockPos {
        BlockPos::new(self.x(), self.y(), self.z())
    }

    /// The light level tag (0-15).
    #[must_use]
    #[inline]
    pub const fn tag(self) -> u8 {
        ((self.0 >> TAG_SHIFT) & TAG_MASK) as u8
    }

    /// Replaces the light level tag.
    #[must_use]
    #[inline]
    pub fn with_tag(self, level: u8) -> Self {
        debug_assert!(u64::from(level) <= TAG_MASK, "Light level must be 0-15");
        Self((self.0 & POSITION_MASK) | ((u64::from(level) & TAG_MASK) << TAG_SHIFT))
    }

    /// The same position with the tag cleared.
    #[must_use]
    #[inline]
    pub const fn untagged(self) -> Self {
        Self(self.0 & POSITION_MASK)
    }

    /// Identifies the 16x16 chunk column holding this position without unpacking it.
    #[must_use]
    #[inline]
    pub const fn column_key(self) -> u64 {
        self.0 & COLUMN_MASK
    }

    /// The adjacent position in `dir`, or `None` if it falls outside the packable range.
    ///
    /// Stepping below Y 0 or above Y 255 is the common case; such neighbours
    /// are treated as absent by the engine.
    #[must_use]
    #[inline]
    pub fn neighbor(self, dir: Direction) -> Option<Self> {
        let pos = self.untagged();
        let blocked = match dir {
            Direction::Down => pos.y() == MIN_Y,
            Direction::Up => pos.y() == MAX_Y,
            Direction::North => pos.z() == MIN_XZ,
            Direction::South => pos.z() == MAX_XZ,
            Direction::West => pos.x() == MIN_XZ,
            Direction::East => pos.x() == MAX_XZ,
        };
        if blocked {
            return None;
        }
        Some(Self(pos.0.wrapping_add(dir.packed_delta())))
    }

    /// Unit step along Y in packed form.
    pub(crate) const Y_UNIT: u64 = 1 << Y_SHIFT;
    /// Unit step along X in packed form.
    pub(crate) const X_UNIT: u64 = 1 << X_SHIFT;
    /// Unit step along Z in packed form.
    pub(crate) const Z_UNIT: u64 = 1 << Z_SHIFT;
}

impl From<PackedPos> for BlockPos {
    fn from(pos: PackedPos) -> Self {
        pos.block_pos()
    }
}
