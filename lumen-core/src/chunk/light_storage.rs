//! Light storage for chunk sections.
//!
//! Light values are stored as 4-bit values (0-15), packed as two values per byte.
//! For a 16x16x16 section, this requires 2048 bytes (4096 blocks / 2).

use std::fmt::Debug;

/// The number of bytes needed to store light data for a 16x16x16 section.
/// 16*16*16 blocks = 4096 blocks, at 4 bits per block = 2048 bytes
pub const LIGHT_ARRAY_SIZE: usize = 2048;

/// Storage for one light channel of a chunk section.
/// Light values range from 0-15 (4 bits per block).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LightStorage {
    /// All blocks in the section have the same light level (0-15).
    Homogeneous(u8),
    /// Blocks have different light levels, stored as packed nibbles.
    /// Even block indices use the low nibble, odd ones the high nibble.
    Heterogeneous(Box<[u8; LIGHT_ARRAY_SIZE]>),
}

/// Byte index and nibble shift of a section-relative coordinate.
#[inline]
fn nibble_slot(x: usize, y: usize, z: usize) -> (usize, u32) {
    debug_assert!(x < 16 && y < 16 && z < 16, "Coordinates must be 0-15");
    let block_index = (y << 8) | (z << 4) | x;
    (block_index >> 1, ((block_index & 1) as u32) * 4)
}

/// Both nibbles of a byte set to `level`.
#[inline]
fn packed_byte(level: u8) -> u8 {
    (level & 0x0F) * 0x11
}

impl LightStorage {
    /// Creates a new homogeneous light storage with all blocks at the given light level.
    #[must_use]
    pub fn new_filled(light_level: u8) -> Self {
        debug_assert!(light_level <= 15, "Light level must be 0-15");
        Self::Homogeneous(light_level)
    }

    /// Creates a new empty (dark) light storage.
    #[must_use]
    pub fn new_empty() -> Self {
        Self::Homogeneous(0)
    }

    /// Gets the light level at the given section-relative position.
    #[must_use]
    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize) -> u8 {
        match self {
            Self::Homogeneous(level) => *level,
            Self::Heterogeneous(data) => {
                let (byte_index, shift) = nibble_slot(x, y, z);
                (data[byte_index] >> shift) & 0x0F
            }
        }
    }

    /// Sets the light level at the given section-relative position.
    ///
    /// If currently homogeneous and setting a different value, upgrades to heterogeneous.
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, z: usize, light_level: u8) {
        debug_assert!(light_level <= 15, "Light level must be 0-15");

        if let Self::Homogeneous(current_level) = *self {
            if light_level == current_level {
                return;
            }
            *self = Self::Heterogeneous(Box::new([packed_byte(current_level); LIGHT_ARRAY_SIZE]));
        }

        if let Self::Heterogeneous(data) = self {
            let (byte_index, shift) = nibble_slot(x, y, z);
            data[byte_index] = (data[byte_index] & !(0x0F << shift)) | ((light_level & 0x0F) << shift);
        }
    }

    /// Sets every block of the section to one level.
    pub fn fill(&mut self, light_level: u8) {
        debug_assert!(light_level <= 15, "Light level must be 0-15");
        *self = Self::Homogeneous(light_level);
    }

    /// Appends the 2048 nibble-packed bytes of this section to `out`.
    pub fn write_packed(&self, out: &mut Vec<u8>) {
        match self {
            Self::Homogeneous(level) => {
                out.resize(out.len() + LIGHT_ARRAY_SIZE, packed_byte(*level));
            }
            Self::Heterogeneous(data) => out.extend_from_slice(&data[..]),
        }
    }

    /// Rebuilds storage from 2048 nibble-packed bytes, collapsing uniform data.
    ///
    /// Returns `None` if `bytes` is not exactly [`LIGHT_ARRAY_SIZE`] long.
    #[must_use]
    pub fn from_packed(bytes: &[u8]) -> Option<Self> {
        let data: [u8; LIGHT_ARRAY_SIZE] = bytes.try_into().ok()?;
        let first = data[0];
        if first >> 4 == first & 0x0F && data.iter().all(|&byte| byte == first) {
            Some(Self::Homogeneous(first & 0x0F))
        } else {
            Some(Self::Heterogeneous(Box::new(data)))
        }
    }
}

impl Default for LightStorage {
    fn default() -> Self {
        Self::new_empty()
    }
}
