// src/config.rs

/// Point raycast camera: matches the main renderer's picking camera.
pub const POINT_FOV_DEG: f32 = 60.0;
pub const POINT_ASPECT: f32 = 1.0;
pub const POINT_NEAR: f32 = 0.1;
pub const POINT_FAR: f32 = 1000.0;

/// Collision/physics orthographic near plane. Far comes from the query depth.
pub const ORTHO_NEAR: f32 = 0.001;

/// Collision sampling grid, one depth+normal per cell.
pub const COLLISION_GRID: u32 = 10;
pub const COLLISION_SAMPLES: usize = (COLLISION_GRID * COLLISION_GRID) as usize;

/// Physics batch width: one raycast per column, reset on readback.
pub const PHYSICS_BATCH: u32 = 64;

/// Per-render cap on encoded draws (chunk groups + build meshes). Bounded by
/// the dynamic-offset uniform slot count; overflow is logged and dropped.
pub const MAX_DRAWS_PER_PASS: usize = 256;

/// Uniform slot stride. min_uniform_buffer_offset_alignment on default limits.
pub const UNIFORM_SLOT_BYTES: u64 = 256;
