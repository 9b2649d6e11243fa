//! Shared value types for the lumen workspace.

pub mod math;
mod types;

pub use types::{BlockPos, BlockStateId, ChunkPos};
