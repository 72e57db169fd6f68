// src/chunks/slab.rs
//
// Fixed-capacity attribute arena backing one chunk mesh. One byte buffer
// holds four attribute planes; each slab owns a fixed slice of every plane,
// addressed by an immutable slot index. Slices never move or resize, so
// streaming churn never reallocates.

use glam::Vec3;

/// Sizing parameters for a chunk mesh arena, taken verbatim from the
/// `loadSlab` command that first creates the mesh.
#[derive(Clone, Copy, Debug)]
pub struct SlabLayout {
    pub total_byte_size: u32,
    /// Byte stride between the four attribute planes inside the buffer.
    pub attribute_byte_size: u32,
    pub vertices_per_slice: u32,
    pub num_slices: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Attribute {
    Position,
    Barycentric,
    Id,
    TriIndex,
}

impl Attribute {
    #[inline]
    fn plane(self) -> u32 {
        match self {
            Attribute::Position => 0,
            Attribute::Barycentric => 1,
            Attribute::Id => 2,
            Attribute::TriIndex => 3,
        }
    }

    /// Floats per vertex in this plane.
    #[inline]
    pub fn width(self) -> u32 {
        match self {
            Attribute::Position | Attribute::Barycentric => 3,
            Attribute::Id | Attribute::TriIndex => 1,
        }
    }
}

impl SlabLayout {
    /// Float offset of `slot`'s slice inside `attr`'s plane.
    #[inline]
    pub fn slice_offset(&self, attr: Attribute, slot: u32) -> u32 {
        debug_assert!(slot < self.num_slices, "slot {slot} out of {}", self.num_slices);
        attr.plane() * self.attribute_byte_size / 4 + slot * self.slice_len(attr)
    }

    /// Slice capacity in floats for one slab.
    #[inline]
    pub fn slice_len(&self, attr: Attribute) -> u32 {
        self.vertices_per_slice * attr.width()
    }

    /// Byte range of a whole attribute plane, for vertex-buffer binding.
    #[inline]
    pub fn plane_bytes(&self, attr: Attribute) -> (u64, u64) {
        let start = (attr.plane() * self.attribute_byte_size) as u64;
        let len = (self.num_slices * self.slice_len(attr) * 4) as u64;
        (start, len)
    }
}

/// CPU mirror + GPU-visible buffer for one chunk mesh.
///
/// All writes go through [`SlabArena::write`], which copies into the mirror
/// and marks exactly the written byte range dirty on the GPU buffer. The
/// mirror is what readback-side triangle resolution reads.
pub struct SlabArena {
    layout: SlabLayout,
    data: Vec<f32>,
    buffer: wgpu::Buffer,
}

impl SlabArena {
    pub fn new(device: &wgpu::Device, label: &str, layout: SlabLayout) -> Self {
        debug_assert_eq!(layout.total_byte_size % 4, 0);
        debug_assert!(
            layout.attribute_byte_size * 4 <= layout.total_byte_size,
            "arena too small for four planes"
        );

        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: layout.total_byte_size as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            layout,
            data: vec![0.0; (layout.total_byte_size / 4) as usize],
            buffer,
        }
    }

    #[inline]
    pub fn layout(&self) -> &SlabLayout {
        &self.layout
    }

    #[inline]
    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    /// Copy `values` to the start of `slot`'s slice of `attr` and upload the
    /// dirty range. `values` longer than the slice capacity is a caller
    /// contract violation.
    pub fn write(&mut self, queue: &wgpu::Queue, attr: Attribute, slot: u32, values: &[f32]) {
        debug_assert!(
            values.len() as u32 <= self.layout.slice_len(attr),
            "attribute write of {} floats exceeds slice capacity {}",
            values.len(),
            self.layout.slice_len(attr),
        );

        let off = self.layout.slice_offset(attr, slot) as usize;
        self.data[off..off + values.len()].copy_from_slice(values);

        queue.write_buffer(
            &self.buffer,
            (off * 4) as u64,
            bytemuck::cast_slice(values),
        );
    }

    /// Three corners of triangle `tri_index`, read from the position plane.
    /// `None` when the index points past the arena (stale or corrupt pixel).
    pub fn triangle_positions(&self, tri_index: u32) -> Option<[Vec3; 3]> {
        let base = tri_index as usize * 9;
        let plane_len = (self.layout.num_slices * self.layout.slice_len(Attribute::Position)) as usize;
        if base + 9 > plane_len {
            return None;
        }
        let p = &self.data[base..base + 9];
        Some([
            Vec3::new(p[0], p[1], p[2]),
            Vec3::new(p[3], p[4], p[5]),
            Vec3::new(p[6], p[7], p[8]),
        ])
    }
}

/// One streamed spatial cell. Holds only its binding and slot; the backing
/// ranges are derived from the arena layout, so a freed slab keeps its slot
/// for reuse without touching buffer bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Slab {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub slot: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> SlabLayout {
        // 4 slices of 6 vertices.
        let vertices_per_slice = 6;
        let num_slices = 4;
        let attribute_byte_size = num_slices * vertices_per_slice * 3 * 4;
        SlabLayout {
            total_byte_size: attribute_byte_size * 4,
            attribute_byte_size,
            vertices_per_slice,
            num_slices,
        }
    }

    #[test]
    fn planes_do_not_overlap() {
        let l = layout();
        let attrs = [
            Attribute::Position,
            Attribute::Barycentric,
            Attribute::Id,
            Attribute::TriIndex,
        ];
        for pair in attrs.windows(2) {
            let (a0, len0) = l.plane_bytes(pair[0]);
            let (a1, _) = l.plane_bytes(pair[1]);
            assert!(a0 + len0 <= a1);
        }
    }

    #[test]
    fn slice_offsets_are_slot_strided() {
        let l = layout();
        for slot in 0..l.num_slices {
            assert_eq!(
                l.slice_offset(Attribute::Position, slot),
                slot * l.slice_len(Attribute::Position)
            );
            let id0 = l.slice_offset(Attribute::Id, 0);
            assert_eq!(
                l.slice_offset(Attribute::Id, slot),
                id0 + slot * l.vertices_per_slice
            );
        }
    }
}
