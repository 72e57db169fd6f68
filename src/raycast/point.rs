// src/raycast/point.rs

use glam::{Mat4, Quat, Vec3};

use crate::config;
use crate::encoding;
use crate::scene::{Container, QueryCamera};

use super::target::EncodeTarget;
use super::{render_scene, EncodePass, EncodePipelines, GpuContext};

/// One resolved point raycast.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointHit {
    pub mesh_id: u32,
    pub tri_index: u32,
    pub point: Vec3,
    pub normal: Vec3,
}

/// Single-pixel picking raycast: a perspective camera at the query pose, the
/// id-encoding pass, and a CPU-side plane intersection against the one
/// triangle the pixel resolved to.
pub struct PointRaycaster {
    target: EncodeTarget,
    last_camera: Option<QueryCamera>,
}

impl PointRaycaster {
    pub fn new(gpu: &GpuContext) -> Self {
        Self {
            target: EncodeTarget::new(gpu, "point_raycast_target", 1, 1),
            last_camera: None,
        }
    }

    /// Render the container through a 1x1 picking camera. The result is
    /// fetched later by [`PointRaycaster::read`].
    pub fn raycast(
        &mut self,
        gpu: &GpuContext,
        pipelines: &EncodePipelines,
        container: &mut Container,
        position: Vec3,
        rotation: Quat,
    ) {
        let camera = QueryCamera {
            position,
            rotation,
            projection: Mat4::perspective_rh(
                config::POINT_FOV_DEG.to_radians(),
                config::POINT_ASPECT,
                config::POINT_NEAR,
                config::POINT_FAR,
            ),
            near: config::POINT_NEAR,
            far: config::POINT_FAR,
        };
        self.last_camera = Some(camera);

        let view_proj = camera.view_proj();
        let scope = container.filter_groups(&camera);
        render_scene(
            gpu,
            pipelines,
            &self.target,
            EncodePass::Id,
            scope.container(),
            view_proj,
            None,
        );
    }

    /// Read the pixel, clear the target, and resolve the hit against the
    /// live container. A mesh unloaded between render and readback decodes
    /// as a miss.
    pub fn read(&mut self, gpu: &GpuContext, container: &Container) -> Option<PointHit> {
        let pixels = self.target.read_pixels(gpu);
        self.target.clear(gpu);

        if pixels[0] == 0.0 {
            return None;
        }
        let camera = self.last_camera?;

        let mesh_id = encoding::decode_id(pixels[0]);
        let tri_index = encoding::decode_id(pixels[1]);

        let [a, b, c] = container.resolve_triangle(mesh_id, tri_index)?;
        let normal = (c - b).cross(a - b).normalize();

        // Plane through the triangle, intersected with the camera-forward ray.
        let plane_d = -normal.dot(a);
        let origin = camera.position;
        let dir = camera.forward();

        let denom = normal.dot(dir);
        if denom == 0.0 {
            return None;
        }
        let t = -(normal.dot(origin) + plane_d) / denom;
        if t < 0.0 || !t.is_finite() {
            return None;
        }

        Some(PointHit {
            mesh_id,
            tri_index,
            point: origin + dir * t,
            normal,
        })
    }
}
