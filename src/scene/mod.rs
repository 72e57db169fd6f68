// src/scene/mod.rs
// Shared geometry container + per-query visibility filtering.

mod build_mesh;
mod frustum;
mod hulls;

pub use build_mesh::BuildMesh;
pub use frustum::Frustum;
pub use hulls::{HullGeometry, HullKind, HullLibrary, HullSource, PrefabHulls};

use glam::{Mat4, Quat, Vec3};

use crate::chunks::ChunkRegistry;

/// Camera pose + projection for one raycast query.
#[derive(Clone, Copy, Debug)]
pub struct QueryCamera {
    pub position: Vec3,
    pub rotation: Quat,
    pub projection: Mat4,
    pub near: f32,
    pub far: f32,
}

impl QueryCamera {
    #[inline]
    pub fn view(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.position).inverse()
    }

    #[inline]
    pub fn view_proj(&self) -> Mat4 {
        self.projection * self.view()
    }

    /// Query ray direction: camera forward.
    #[inline]
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }
}

/// Everything the raycast passes can see: the streamed chunk meshes and the
/// placed build hulls, under one shared transform set per query from
/// `containerMatrix`. Mutated only by the dispatcher thread.
pub struct Container {
    pub transform: Mat4,
    pub chunks: ChunkRegistry,
    pub builds: Vec<BuildMesh>,
}

impl Container {
    pub fn new() -> Self {
        Self {
            transform: Mat4::IDENTITY,
            chunks: ChunkRegistry::default(),
            builds: Vec::new(),
        }
    }

    pub fn find_build(&self, mesh_id: u32) -> Option<&BuildMesh> {
        self.builds.iter().find(|b| b.mesh_id == mesh_id)
    }

    pub fn remove_build(&mut self, mesh_id: u32) -> bool {
        match self.builds.iter().position(|b| b.mesh_id == mesh_id) {
            Some(i) => {
                self.builds.remove(i);
                true
            }
            None => false,
        }
    }

    /// World-space corners of a triangle recovered from encoded pixels.
    /// Chunk meshes and build meshes share the id namespace; a dead id is a
    /// miss, not an error.
    pub fn resolve_triangle(&self, mesh_id: u32, tri_index: u32) -> Option<[Vec3; 3]> {
        let (corners, local) = if let Some(mesh) = self.chunks.get(mesh_id) {
            (
                mesh.arena().triangle_positions(tri_index)?,
                mesh.local_transform(),
            )
        } else if let Some(build) = self.find_build(mesh_id) {
            (build.triangle_positions(tri_index)?, build.local_transform())
        } else {
            return None;
        };

        let world = self.transform * local;
        Some(corners.map(|p| world.transform_point3(p)))
    }

    /// Narrow every chunk mesh's group list to the camera's view volume.
    /// The returned guard restores the saved lists when dropped, so a render
    /// that panics or returns early cannot leak a culled state.
    pub fn filter_groups(&mut self, camera: &QueryCamera) -> FilterScope<'_> {
        let view_proj = camera.view_proj();
        for mesh in self.chunks.iter_mut() {
            let local = view_proj * self.transform * mesh.local_transform();
            let frustum = Frustum::from_matrix(local);
            mesh.groups.filter(|g| frustum.intersects_sphere(&g.sphere));
        }
        FilterScope { container: self }
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

/// Scope for a filtered render. Holds the container mutably so nothing else
/// can touch group membership mid-render.
pub struct FilterScope<'a> {
    container: &'a mut Container,
}

impl FilterScope<'_> {
    #[inline]
    pub fn container(&self) -> &Container {
        self.container
    }
}

impl Drop for FilterScope<'_> {
    fn drop(&mut self) {
        for mesh in self.container.chunks.iter_mut() {
            mesh.groups.restore();
        }
    }
}
