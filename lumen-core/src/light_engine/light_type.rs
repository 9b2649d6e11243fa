//! Light channels.

use std::ops::RangeInclusive;

/// The highest light level a voxel can hold.
pub const MAX_LIGHT: u8 = 15;

/// An independently propagated light channel.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightType {
    /// Ambient light coming down from the open sky.
    Sky = 0,
    /// Light emitted by blocks.
    Block = 1,
}

impl LightType {
    /// Every channel, in processing order.
    pub const ALL: [LightType; 2] = [LightType::Sky, LightType::Block];

    /// Number of channels.
    pub const COUNT: usize = Self::ALL.len();

    /// Index of this channel into per-channel arrays.
    #[must_use]
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// The value a voxel of this channel takes on its own, absent any neighbour.
    ///
    /// For sky light this is the level of a voxel that can see the sky.
    #[must_use]
    pub const fn default_value(self) -> u8 {
        match self {
            Self::Sky => MAX_LIGHT,
            Self::Block => 0,
        }
    }

    /// Smallest and largest default value over all channels. Every level the
    /// engine writes lies in this range.
    #[must_use]
    pub fn base_value_range() -> RangeInclusive<u8> {
        let mut min = MAX_LIGHT;
        let mut max = 0;
        for light_type in Self::ALL {
            min = min.min(light_type.default_value());
            max = max.max(light_type.default_value());
        }
        min..=max
    }
}
