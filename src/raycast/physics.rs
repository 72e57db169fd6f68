// src/raycast/physics.rs

use glam::{Mat4, Quat, Vec3};

use crate::config;
use crate::encoding;
use crate::scene::{Container, QueryCamera};

use super::target::EncodeTarget;
use super::{render_scene, EncodePass, EncodePipelines, GpuContext};

/// Depths for the last physics batch; one entry per claimed column, misses
/// as `f32::INFINITY`.
#[derive(Clone, Debug)]
pub struct PhysicsResult {
    pub depths: Vec<f32>,
}

/// Batched depth raycaster: a 64x1 target where each query claims one column
/// through the viewport, so a whole batch shares a single readback.
pub struct PhysicsRaycaster {
    target: EncodeTarget,
    cursor: u32,
    depths: Vec<f32>,
    near: f32,
    far: f32,
}

impl PhysicsRaycaster {
    pub fn new(gpu: &GpuContext) -> Self {
        Self {
            target: EncodeTarget::new(gpu, "physics_raycast_target", config::PHYSICS_BATCH, 1),
            cursor: 0,
            depths: vec![f32::INFINITY; config::PHYSICS_BATCH as usize],
            near: config::ORTHO_NEAR,
            far: config::ORTHO_NEAR,
        }
    }

    /// Render one query into the next column. Returns the claimed column.
    /// Past `PHYSICS_BATCH` queries the column wraps and overwrites; callers
    /// are expected to batch in groups of at most 64.
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
    ) -> u32 {
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
        self.near = near;
        self.far = far;

        let column = self.cursor % config::PHYSICS_BATCH;
        if self.cursor == config::PHYSICS_BATCH {
            log::warn!("physics raycast batch past {} columns, wrapping", config::PHYSICS_BATCH);
        }
        self.cursor += 1;

        let view_proj = camera.view_proj();
        let scope = container.filter_groups(&camera);
        render_scene(
            gpu,
            pipelines,
            &self.target,
            EncodePass::DepthOnly,
            scope.container(),
            view_proj,
            Some(column),
        );

        column
    }

    /// Decode every claimed column, clear the target and reset the batch
    /// cursor. Columns beyond the batch keep their previous values.
    pub fn read(&mut self, gpu: &GpuContext) -> PhysicsResult {
        let pixels = self.target.read_pixels(gpu);
        self.target.clear(gpu);

        let count = self.cursor.min(config::PHYSICS_BATCH) as usize;
        for i in 0..count {
            let j = i * 4;
            // Covered pixels carry the 1.0 marker in the blue channel.
            self.depths[i] = if pixels[j + 2] != 0.0 {
                encoding::decode_depth(pixels[j], pixels[j + 1], self.near, self.far)
            } else {
                f32::INFINITY
            };
        }
        self.cursor = 0;

        PhysicsResult {
            depths: self.depths.clone(),
        }
    }

    #[cfg(test)]
    pub(crate) fn cursor(&self) -> u32 {
        self.cursor
    }
}
