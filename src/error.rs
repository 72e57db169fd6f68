// src/error.rs

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A chunk mesh ran out of slab slots. The arena never grows; callers
    /// must unload before loading past `num_slices`.
    #[error("slab capacity exhausted: slot {requested} of {num_slices}")]
    SlabCapacity { requested: u32, num_slices: u32 },

    #[error("no suitable GPU adapter")]
    NoAdapter,

    #[error("device request failed: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    #[error("hull load failed: {0}")]
    HullLoad(String),
}

pub type Result<T> = std::result::Result<T, Error>;
