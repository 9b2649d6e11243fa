//! Incremental flood-fill light propagation over two light channels.

mod access;
mod cursor;
pub mod direction;
pub mod light_queue;
pub mod light_type;
mod lighting_engine;
pub mod ownership;
pub mod packed_pos;

#[cfg(test)]
mod tests;

// Re-export main types for convenience
pub use access::{LightAccess, RenderNotifier};
pub use cursor::{Cursor, NeighborInfo};
pub use direction::Direction;
pub use light_queue::{PooledQueue, QueuePool};
pub use light_type::{LightType, MAX_LIGHT};
pub use lighting_engine::LightingEngine;
pub use ownership::{Access, OwnerToken, OwnershipGuard};
pub use packed_pos::PackedPos;
