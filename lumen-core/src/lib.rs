//! Incremental voxel lighting.
//!
//! [`light_engine`] holds the propagation engine and the traits it drives,
//! [`chunk`] the column storage light lives in, and [`world`] an in-memory
//! world wiring the two together.

pub mod chunk;
pub mod config;
pub mod light_engine;
pub mod world;
