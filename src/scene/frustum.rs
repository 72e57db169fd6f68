// src/scene/frustum.rs

use glam::{Mat4, Vec3, Vec4};

use crate::chunks::BoundingSphere;

#[derive(Clone, Copy, Debug)]
struct Plane {
    normal: Vec3,
    d: f32,
}

impl Plane {
    fn from_vec4(v: Vec4) -> Self {
        let normal = Vec3::new(v.x, v.y, v.z);
        let inv_len = 1.0 / normal.length();
        Plane {
            normal: normal * inv_len,
            d: v.w * inv_len,
        }
    }

    #[inline]
    fn distance(&self, p: Vec3) -> f32 {
        self.normal.dot(p) + self.d
    }
}

/// View volume as six inward-facing planes, extracted from a combined
/// projection-view(-model) matrix with 0..1 clip depth.
#[derive(Clone, Copy, Debug)]
pub struct Frustum {
    planes: [Plane; 6],
}

impl Frustum {
    pub fn from_matrix(m: Mat4) -> Self {
        let r0 = m.row(0);
        let r1 = m.row(1);
        let r2 = m.row(2);
        let r3 = m.row(3);

        Frustum {
            planes: [
                Plane::from_vec4(r3 + r0), // left
                Plane::from_vec4(r3 - r0), // right
                Plane::from_vec4(r3 + r1), // bottom
                Plane::from_vec4(r3 - r1), // top
                Plane::from_vec4(r2),      // near, clip z >= 0
                Plane::from_vec4(r3 - r2), // far
            ],
        }
    }

    pub fn intersects_sphere(&self, sphere: &BoundingSphere) -> bool {
        self.planes
            .iter()
            .all(|p| p.distance(sphere.center) >= -sphere.radius)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sphere(center: Vec3, radius: f32) -> BoundingSphere {
        BoundingSphere { center, radius }
    }

    fn looking_down_neg_z() -> Frustum {
        // Camera at origin, -Z forward, 2x2 ortho window, depth 0.1..10.
        let proj = Mat4::orthographic_rh(-1.0, 1.0, -1.0, 1.0, 0.1, 10.0);
        Frustum::from_matrix(proj)
    }

    #[test]
    fn sphere_inside_is_kept() {
        let f = looking_down_neg_z();
        assert!(f.intersects_sphere(&sphere(Vec3::new(0.0, 0.0, -5.0), 0.5)));
    }

    #[test]
    fn sphere_behind_camera_is_culled() {
        let f = looking_down_neg_z();
        assert!(!f.intersects_sphere(&sphere(Vec3::new(0.0, 0.0, 5.0), 0.5)));
    }

    #[test]
    fn sphere_off_to_the_side_is_culled() {
        let f = looking_down_neg_z();
        assert!(!f.intersects_sphere(&sphere(Vec3::new(8.0, 0.0, -5.0), 0.5)));
    }

    #[test]
    fn sphere_straddling_a_side_plane_is_kept() {
        let f = looking_down_neg_z();
        assert!(f.intersects_sphere(&sphere(Vec3::new(1.4, 0.0, -5.0), 0.5)));
    }
}
