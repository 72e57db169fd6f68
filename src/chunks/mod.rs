// src/chunks/mod.rs
// Streamed chunk geometry: slab arena + registry.

mod chunk_mesh;
mod slab;

pub use chunk_mesh::{BoundingSphere, ChunkMesh, GeometryUpdate, Group, GroupSet};
pub use slab::{Attribute, Slab, SlabArena, SlabLayout};

use glam::Vec3;
use rustc_hash::FxHashMap;

/// Owner of all live chunk meshes, keyed by mesh id. Lifetimes are tied to
/// streaming commands: a mesh exists from the `loadSlab` that first names it
/// until an `unloadSlab` removes its last slab.
#[derive(Default)]
pub struct ChunkRegistry {
    meshes: FxHashMap<u32, ChunkMesh>,
}

impl ChunkRegistry {
    pub fn get(&self, mesh_id: u32) -> Option<&ChunkMesh> {
        self.meshes.get(&mesh_id)
    }

    pub fn get_mut(&mut self, mesh_id: u32) -> Option<&mut ChunkMesh> {
        self.meshes.get_mut(&mesh_id)
    }

    /// Idempotent create: an existing mesh is returned unchanged and the
    /// sizing arguments are ignored.
    #[allow(clippy::too_many_arguments)]
    pub fn get_or_create(
        &mut self,
        device: &wgpu::Device,
        mesh_id: u32,
        origin: Vec3,
        parcel_size: u32,
        subparcel_size: u32,
        layout: SlabLayout,
    ) -> &mut ChunkMesh {
        self.meshes.entry(mesh_id).or_insert_with(|| {
            ChunkMesh::new(device, mesh_id, origin, parcel_size, subparcel_size, layout)
        })
    }

    /// Drop `mesh_id` if its last slab is gone. Returns true when destroyed.
    pub fn remove_if_empty(&mut self, mesh_id: u32) -> bool {
        if self.meshes.get(&mesh_id).is_some_and(|m| m.is_empty()) {
            self.meshes.remove(&mesh_id);
            true
        } else {
            false
        }
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChunkMesh> {
        self.meshes.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ChunkMesh> {
        self.meshes.values_mut()
    }
}
