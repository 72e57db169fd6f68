// src/scene/build_mesh.rs

use glam::{Mat4, Quat, Vec3};

use super::hulls::HullGeometry;

/// A placed build hull, decorated with the per-vertex id/index attributes the
/// encode shaders expect: every vertex carries the mesh id, and each
/// triangle's three vertices carry its triangle ordinal.
pub struct BuildMesh {
    pub mesh_id: u32,
    pub position: Vec3,
    pub rotation: Quat,

    vertex_count: u32,
    positions_cpu: Vec<f32>,

    position_buf: wgpu::Buffer,
    id_buf: wgpu::Buffer,
    tri_index_buf: wgpu::Buffer,
}

impl BuildMesh {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        mesh_id: u32,
        hull: &HullGeometry,
        position: Vec3,
        rotation: Quat,
    ) -> Self {
        let vertex_count = hull.vertex_count();
        let tri_count = vertex_count / 3;

        let ids = vec![mesh_id as f32; vertex_count as usize];
        let mut tri_indices = vec![0.0f32; vertex_count as usize];
        for tri in 0..tri_count as usize {
            tri_indices[tri * 3] = tri as f32;
            tri_indices[tri * 3 + 1] = tri as f32;
            tri_indices[tri * 3 + 2] = tri as f32;
        }

        let make = |label: &str, len_bytes: u64| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size: len_bytes,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        };

        let position_buf = make(
            &format!("build_{mesh_id}_positions"),
            (hull.positions.len() * 4) as u64,
        );
        let id_buf = make(&format!("build_{mesh_id}_ids"), (ids.len() * 4) as u64);
        let tri_index_buf = make(
            &format!("build_{mesh_id}_indices"),
            (tri_indices.len() * 4) as u64,
        );

        queue.write_buffer(&position_buf, 0, bytemuck::cast_slice(&hull.positions));
        queue.write_buffer(&id_buf, 0, bytemuck::cast_slice(&ids));
        queue.write_buffer(&tri_index_buf, 0, bytemuck::cast_slice(&tri_indices));

        Self {
            mesh_id,
            position,
            rotation,
            vertex_count,
            positions_cpu: hull.positions.clone(),
            position_buf,
            id_buf,
            tri_index_buf,
        }
    }

    #[inline]
    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    #[inline]
    pub fn local_transform(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.position)
    }

    #[inline]
    pub fn position_buffer(&self) -> &wgpu::Buffer {
        &self.position_buf
    }

    #[inline]
    pub fn id_buffer(&self) -> &wgpu::Buffer {
        &self.id_buf
    }

    #[inline]
    pub fn tri_index_buffer(&self) -> &wgpu::Buffer {
        &self.tri_index_buf
    }

    pub fn triangle_positions(&self, tri_index: u32) -> Option<[Vec3; 3]> {
        let base = tri_index as usize * 9;
        if base + 9 > self.positions_cpu.len() {
            return None;
        }
        let p = &self.positions_cpu[base..base + 9];
        Some([
            Vec3::new(p[0], p[1], p[2]),
            Vec3::new(p[3], p[4], p[5]),
            Vec3::new(p[6], p[7], p[8]),
        ])
    }
}
