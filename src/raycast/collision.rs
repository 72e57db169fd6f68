// src/raycast/collision.rs

use glam::{Mat4, Quat, Vec3};

use crate::config;
use crate::encoding;
use crate::scene::{Container, QueryCamera};

use super::target::EncodeTarget;
use super::{render_scene, EncodePass, EncodePipelines, GpuContext};

/// Decoded samples for one collision target: a depth and a face normal per
/// grid cell. Misses carry `f32::INFINITY` and the default up normal.
#[derive(Clone, Debug)]
pub struct CollisionResult {
    pub position: Vec3,
    pub rotation: Quat,
    pub depths: Vec<f32>,
    pub normals: Vec<f32>,
}

/// One indexed grid target, plus the camera context its next readback needs.
/// Pose and range stay valid until a later query at the same index
/// overwrites them.
struct CollisionTarget {
    target: EncodeTarget,
    position: Vec3,
    rotation: Quat,
    near: f32,
    far: f32,
}

/// Dense collision sampler: one 10x10 orthographic footprint per caller
/// index, each decoding to 100 depth/normal pairs.
pub struct CollisionRaycaster {
    targets: Vec<Option<CollisionTarget>>,
}

impl CollisionRaycaster {
    pub fn new() -> Self {
        Self {
            targets: Vec::new(),
        }
    }

    /// Render the container into the grid target at `index`, creating the
    /// target on first use.
    #[allow(clippy::too_many_arguments)]
    pub fn raycast(
        &mut self,
        gpu: &GpuContext,
        pipelines: &EncodePipelines,
        container: &mut Container,
        position: Vec3,
        rotation: Quat,
        width: f32,
        height: f32,
        depth: f32,
        index: usize,
    ) {
        let near = config::ORTHO_NEAR;
        let far = depth;
        let camera = QueryCamera {
            position,
            rotation,
            projection: Mat4::orthographic_rh(
                width / -2.0,
                width / 2.0,
                height / -2.0,
                height / 2.0,
                near,
                far,
            ),
            near,
            far,
        };

        if index >= self.targets.len() {
            self.targets.resize_with(index + 1, || None);
        }
        let slot = self.targets[index].get_or_insert_with(|| CollisionTarget {
            target: EncodeTarget::new(
                gpu,
                "collision_raycast_target",
                config::COLLISION_GRID,
                config::COLLISION_GRID,
            ),
            position,
            rotation,
            near,
            far,
        });
        slot.position = position;
        slot.rotation = rotation;
        slot.near = near;
        slot.far = far;

        let view_proj = camera.view_proj();
        let scope = container.filter_groups(&camera);
        render_scene(
            gpu,
            pipelines,
            &slot.target,
            EncodePass::DepthId,
            scope.container(),
            view_proj,
            None,
        );
    }

    /// Read back and decode every live target, in index order, clearing each
    /// for its next query.
    pub fn read_all(&mut self, gpu: &GpuContext, container: &Container) -> Vec<CollisionResult> {
        let mut results = Vec::new();

        for slot in self.targets.iter_mut().flatten() {
            let pixels = slot.target.read_pixels(gpu);
            slot.target.clear(gpu);

            let mut depths = vec![f32::INFINITY; config::COLLISION_SAMPLES];
            let mut normals = vec![0.0f32; config::COLLISION_SAMPLES * 3];

            for i in 0..config::COLLISION_SAMPLES {
                let j = i * 4;
                if pixels[j] == 0.0 {
                    // Miss: infinite depth, default up normal.
                    normals[i * 3 + 1] = 1.0;
                    continue;
                }

                depths[i] =
                    encoding::decode_depth(pixels[j], pixels[j + 1], slot.near, slot.far);

                let mesh_id = encoding::decode_id(pixels[j + 2]);
                let tri_index = encoding::decode_id(pixels[j + 3]);
                let normal = container
                    .resolve_triangle(mesh_id, tri_index)
                    .map(|[a, b, c]| (c - b).cross(a - b).normalize())
                    .unwrap_or(Vec3::Y);
                normals[i * 3] = normal.x;
                normals[i * 3 + 1] = normal.y;
                normals[i * 3 + 2] = normal.z;
            }

            results.push(CollisionResult {
                position: slot.position,
                rotation: slot.rotation,
                depths,
                normals,
            });
        }

        results
    }
}

impl Default for CollisionRaycaster {
    fn default() -> Self {
        Self::new()
    }
}
