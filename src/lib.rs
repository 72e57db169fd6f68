// src/lib.rs
//
// GPU-encoded spatial queries over streamed chunk geometry: a worker that
// answers point, collision-grid and batched physics raycasts by rendering
// the scene with value-encoding shaders and decoding the pixels read back.

pub mod chunks;
pub mod config;
pub mod encoding;
pub mod error;
pub mod raycast;
pub mod scene;
pub mod worker;

pub use error::{Error, Result};
