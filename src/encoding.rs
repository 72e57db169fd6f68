// src/encoding.rs
//
// Pixel-channel contract shared by the encode shaders (producer) and the
// readback decoders (consumer). The WGSL side lives in
// shaders/encode_common.wgsl; a test below keeps the two in sync.

/// Divisor for the mesh-id and triangle-index channels.
///
/// Inherited ceiling: at most 64000 distinct mesh ids and 64000 triangle
/// indices per encoded draw survive the round-trip. Raising it would change
/// the wire contract with every consumer of the encoded pixels, so it stays.
pub const ID_CHANNEL_SCALE: f32 = 64000.0;

/// Two-channel depth split: integer part spread over a 255-step carry channel,
/// fractional part kept at full float precision in the first channel.
#[inline]
pub fn encode_depth(v: f32) -> [f32; 2] {
    let x = v.fract();
    let carry = (v - x) / 255.0;
    [x, carry.fract()]
}

/// Inverse of [`encode_depth`], mapped onto a camera depth range.
#[inline]
pub fn decode_depth(c0: f32, c1: f32, near: f32, far: f32) -> f32 {
    near + (c0 + c1 * 255.0) * (far - near)
}

#[inline]
pub fn encode_id(id: u32) -> f32 {
    id as f32 / ID_CHANNEL_SCALE
}

#[inline]
pub fn decode_id(channel: f32) -> u32 {
    (channel * ID_CHANNEL_SCALE).round() as u32
}
