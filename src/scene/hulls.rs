// src/scene/hulls.rs
//
// Build-hull shapes cloned by `loadBuildMesh`. The worker only consumes the
// loader interface; where the hulls come from (asset pack, network, prefab
// generator) is the embedder's business.

use glam::Vec3;

use crate::error::{Error, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HullKind {
    Wall,
    Floor,
    Stair,
    Trap,
}

impl HullKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "wall" => Some(HullKind::Wall),
            "floor" => Some(HullKind::Floor),
            "stair" => Some(HullKind::Stair),
            "trap" => Some(HullKind::Trap),
            _ => None,
        }
    }
}

/// Decoded hull geometry: non-indexed triangle soup, 9 floats per triangle.
#[derive(Clone, Debug)]
pub struct HullGeometry {
    pub positions: Vec<f32>,
}

impl HullGeometry {
    #[inline]
    pub fn vertex_count(&self) -> u32 {
        (self.positions.len() / 3) as u32
    }
}

/// The four hull shapes fetched once at startup.
pub struct HullLibrary {
    pub wall: HullGeometry,
    pub floor: HullGeometry,
    pub stair: HullGeometry,
    pub trap: HullGeometry,
}

impl HullLibrary {
    pub fn get(&self, kind: HullKind) -> &HullGeometry {
        match kind {
            HullKind::Wall => &self.wall,
            HullKind::Floor => &self.floor,
            HullKind::Stair => &self.stair,
            HullKind::Trap => &self.trap,
        }
    }
}

/// Resolves content to decoded hull geometry. Runs on the loader thread
/// during the worker's Loading state; a failure is terminal (no retry).
pub trait HullSource: Send {
    fn load(&self) -> Result<HullLibrary>;
}

/// Procedural stand-in for the hull asset pack: plain boxes, a stepped
/// staircase and a spike row, matching the footprint of the shipped hulls.
pub struct PrefabHulls;

impl HullSource for PrefabHulls {
    fn load(&self) -> Result<HullLibrary> {
        let lib = HullLibrary {
            wall: wall(),
            floor: floor(),
            stair: stair(),
            trap: trap(),
        };
        for (name, g) in [
            ("wall", &lib.wall),
            ("floor", &lib.floor),
            ("stair", &lib.stair),
            ("trap", &lib.trap),
        ] {
            if g.positions.is_empty() || g.positions.len() % 9 != 0 {
                return Err(Error::HullLoad(format!("{name} hull is not a triangle soup")));
            }
        }
        Ok(lib)
    }
}

fn wall() -> HullGeometry {
    let mut p = Vec::new();
    push_box(&mut p, Vec3::new(-2.0, 0.0, -0.1), Vec3::new(2.0, 3.0, 0.1));
    HullGeometry { positions: p }
}

fn floor() -> HullGeometry {
    let mut p = Vec::new();
    push_box(&mut p, Vec3::new(-2.0, -0.1, -2.0), Vec3::new(2.0, 0.1, 2.0));
    HullGeometry { positions: p }
}

fn stair() -> HullGeometry {
    let mut p = Vec::new();
    // Four steps rising along -Z.
    let steps = 4;
    for i in 0..steps {
        let t = i as f32;
        push_box(
            &mut p,
            Vec3::new(-1.0, 0.0, -(t + 1.0)),
            Vec3::new(1.0, (t + 1.0) * 0.5, -t),
        );
    }
    HullGeometry { positions: p }
}

fn trap() -> HullGeometry {
    let mut p = Vec::new();
    // Row of four spikes on a thin base plate.
    push_box(&mut p, Vec3::new(-2.0, 0.0, -0.5), Vec3::new(2.0, 0.1, 0.5));
    for i in 0..4 {
        let cx = -1.5 + i as f32;
        push_spike(&mut p, Vec3::new(cx, 0.1, 0.0), 0.4, 0.9);
    }
    HullGeometry { positions: p }
}

fn push_tri(out: &mut Vec<f32>, a: Vec3, b: Vec3, c: Vec3) {
    out.extend_from_slice(&[a.x, a.y, a.z, b.x, b.y, b.z, c.x, c.y, c.z]);
}

fn push_quad(out: &mut Vec<f32>, a: Vec3, b: Vec3, c: Vec3, d: Vec3) {
    push_tri(out, a, b, c);
    push_tri(out, a, c, d);
}

/// Axis-aligned box as 12 CCW-outward triangles.
fn push_box(out: &mut Vec<f32>, min: Vec3, max: Vec3) {
    let (a, b) = (min, max);
    // -Z / +Z
    push_quad(
        out,
        Vec3::new(a.x, a.y, a.z),
        Vec3::new(a.x, b.y, a.z),
        Vec3::new(b.x, b.y, a.z),
        Vec3::new(b.x, a.y, a.z),
    );
    push_quad(
        out,
        Vec3::new(a.x, a.y, b.z),
        Vec3::new(b.x, a.y, b.z),
        Vec3::new(b.x, b.y, b.z),
        Vec3::new(a.x, b.y, b.z),
    );
    // -X / +X
    push_quad(
        out,
        Vec3::new(a.x, a.y, a.z),
        Vec3::new(a.x, a.y, b.z),
        Vec3::new(a.x, b.y, b.z),
        Vec3::new(a.x, b.y, a.z),
    );
    push_quad(
        out,
        Vec3::new(b.x, a.y, a.z),
        Vec3::new(b.x, b.y, a.z),
        Vec3::new(b.x, b.y, b.z),
        Vec3::new(b.x, a.y, b.z),
    );
    // -Y / +Y
    push_quad(
        out,
        Vec3::new(a.x, a.y, a.z),
        Vec3::new(b.x, a.y, a.z),
        Vec3::new(b.x, a.y, b.z),
        Vec3::new(a.x, a.y, b.z),
    );
    push_quad(
        out,
        Vec3::new(a.x, b.y, a.z),
        Vec3::new(a.x, b.y, b.z),
        Vec3::new(b.x, b.y, b.z),
        Vec3::new(b.x, b.y, a.z),
    );
}

/// Square-based pyramid: apex up, four sides plus the base.
fn push_spike(out: &mut Vec<f32>, base_center: Vec3, half_width: f32, height: f32) {
    let h = half_width;
    let c = base_center;
    let apex = c + Vec3::new(0.0, height, 0.0);
    let corners = [
        c + Vec3::new(-h, 0.0, -h),
        c + Vec3::new(h, 0.0, -h),
        c + Vec3::new(h, 0.0, h),
        c + Vec3::new(-h, 0.0, h),
    ];
    for i in 0..4 {
        push_tri(out, corners[i], corners[(i + 1) % 4], apex);
    }
    push_quad(out, corners[3], corners[2], corners[1], corners[0]);
}
