//! Collaborator seams the light engine drives.
//!
//! The engine owns no voxel data. Everything it reads or writes goes through
//! [`LightAccess`], and every settled voxel is reported through
//! [`RenderNotifier`].

use lumen_utils::BlockPos;

use super::light_type::{LightType, MAX_LIGHT};

/// Voxel storage as seen by the light engine.
///
/// Implementations may assume every position they receive is loaded when the
/// engine reads or writes it; the engine asks [`LightAccess::is_loaded`] first.
pub trait LightAccess {
    /// Gets the stored light level (0-15) of a channel at `pos`.
    fn light(&self, light_type: LightType, pos: BlockPos) -> u8;

    /// Stores a light level (0-15) of a channel at `pos`.
    fn set_light(&mut self, light_type: LightType, pos: BlockPos, level: u8);

    /// Gets how much light is absorbed entering `pos`, already clamped to 1-15.
    fn opacity(&self, pos: BlockPos) -> u8;

    /// Gets the light emitted by the block at `pos` (0-15).
    fn emission(&self, pos: BlockPos) -> u8;

    /// Checks whether `pos` has an unobstructed path straight up to the sky.
    fn can_see_sky(&self, pos: BlockPos) -> bool;

    /// Checks whether the partition holding `pos` is present.
    fn is_loaded(&self, pos: BlockPos) -> bool;

    /// The light `pos` produces on its own for `light_type`.
    fn own_light(&self, light_type: LightType, pos: BlockPos) -> u8 {
        match light_type {
            LightType::Sky => {
                if self.can_see_sky(pos) {
                    LightType::Sky.default_value()
                } else {
                    0
                }
            }
            LightType::Block => self.emission(pos).min(MAX_LIGHT),
        }
    }
}

/// Receiver for voxels whose light settled to a new value.
pub trait RenderNotifier {
    /// Marks `pos` as needing to be redrawn.
    fn mark_for_visual_update(&mut self, pos: BlockPos);
}
