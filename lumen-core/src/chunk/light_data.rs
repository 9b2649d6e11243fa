//! Persisted form of a chunk's light.
//!
//! Layout:
//!
//! ```text
//! [version: u8 = 1][section count: u8]
//! for each section, bottom to top:
//!     [sky light: 2048 bytes][block light: 2048 bytes]
//! ```
//!
//! Light arrays are nibble packed, two voxels per byte, in the same order as
//! [`LightStorage`].

use thiserror::Error;

use super::{
    light_chunk::LightChunk,
    light_storage::{LIGHT_ARRAY_SIZE, LightStorage},
};

/// Current layout version.
pub const LIGHT_DATA_VERSION: u8 = 1;

const HEADER_LEN: usize = 2;
const SECTION_LEN: usize = LIGHT_ARRAY_SIZE * 2;

/// Reasons persisted light data cannot be trusted.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LightDataError {
    /// Written by an unknown layout version.
    #[error("unsupported light data version {0}")]
    UnsupportedVersion(u8),
    /// Shorter than its header promises.
    #[error("light data truncated: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Bytes the header calls for.
        expected: usize,
        /// Bytes present.
        actual: usize,
    },
    /// Written for a chunk with a different number of sections.
    #[error("light data has {found} sections, chunk has {expected}")]
    SectionCountMismatch {
        /// Sections in the target chunk.
        expected: usize,
        /// Sections in the data.
        found: usize,
    },
    /// Longer than its header promises.
    #[error("{0} unexpected trailing bytes after light data")]
    TrailingBytes(usize),
}

/// Serializes both light channels of `chunk`.
#[must_use]
pub fn serialize_light(chunk: &LightChunk) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + chunk.sections.len() * SECTION_LEN);
    out.push(LIGHT_DATA_VERSION);
    out.push(chunk.sections.len() as u8);
    for section in &chunk.sections {
        section.sky_light.write_packed(&mut out);
        section.block_light.write_packed(&mut out);
    }
    out
}

/// Replaces both light channels of `chunk` with serialized data.
///
/// The data is fully validated before anything is written, so on error the
/// chunk is left untouched.
pub fn deserialize_light(chunk: &mut LightChunk, bytes: &[u8]) -> Result<(), LightDataError> {
    let [version, section_count, body @ ..] = bytes else {
        return Err(LightDataError::Truncated {
            expected: HEADER_LEN,
            actual: bytes.len(),
        });
    };
    if *version != LIGHT_DATA_VERSION {
        return Err(LightDataError::UnsupportedVersion(*version));
    }
    let section_count = usize::from(*section_count);
    if section_count != chunk.sections.len() {
        return Err(LightDataError::SectionCountMismatch {
            expected: chunk.sections.len(),
            found: section_count,
        });
    }

    let expected = section_count * SECTION_LEN;
    if body.len() < expected {
        return Err(LightDataError::Truncated {
            expected: HEADER_LEN + expected,
            actual: bytes.len(),
        });
    }
    if body.len() > expected {
        return Err(LightDataError::TrailingBytes(body.len() - expected));
    }

    let mut parsed = Vec::with_capacity(section_count);
    for section_bytes in body.chunks_exact(SECTION_LEN) {
        let (sky, block) = section_bytes.split_at(LIGHT_ARRAY_SIZE);
        let sky = LightStorage::from_packed(sky);
        let block = LightStorage::from_packed(block);
        if let (Some(sky), Some(block)) = (sky, block) {
            parsed.push((sky, block));
        }
    }

    for (section, (sky, block)) in chunk.sections.iter_mut().zip(parsed) {
        section.sky_light = sky;
        section.block_light = block;
    }
    Ok(())
}
