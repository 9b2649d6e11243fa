//! In-memory world: chunk storage, the block light table and the level that
//! ties them to a [`LightingEngine`](crate::light_engine::LightingEngine).

pub mod chunk_map;
pub mod level;
pub mod light_registry;

pub use chunk_map::ChunkMap;
pub use level::Level;
pub use light_registry::{BlockLightProperties, LightRegistry, RegistryError};
