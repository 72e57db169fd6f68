// src/raycast/shaders.rs
//
// Centralized shader sources. Each pass body is concatenated behind the
// shared encode prelude so every pipeline sees the same contract constants.

pub const CHUNK_ID_WGSL: &str = concat!(
    include_str!("../shaders/encode_common.wgsl"),
    "\n",
    include_str!("../shaders/chunk_id.wgsl"),
);

pub const CHUNK_DEPTH_WGSL: &str = concat!(
    include_str!("../shaders/encode_common.wgsl"),
    "\n",
    include_str!("../shaders/chunk_depth.wgsl"),
);

pub const DEPTH_ONLY_WGSL: &str = concat!(
    include_str!("../shaders/encode_common.wgsl"),
    "\n",
    include_str!("../shaders/depth_only.wgsl"),
);
