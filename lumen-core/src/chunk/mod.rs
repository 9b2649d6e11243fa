//! Chunk columns and the light they store.

pub mod light_chunk;
pub mod light_data;
pub mod light_storage;
pub mod section;
pub mod sky_light_sources;

pub use light_chunk::LightChunk;
pub use light_data::{LightDataError, deserialize_light, serialize_light};
pub use light_storage::LightStorage;
pub use section::{BlockStorage, ChunkSection};
pub use sky_light_sources::ChunkSkyLightSources;
