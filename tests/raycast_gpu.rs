// End-to-end checks against a real adapter. Every test bails out quietly on
// machines with no GPU (CI runners), so the suite stays green headless.

use glam::Vec3;

use rastercast::chunks::{ChunkMesh, GeometryUpdate, SlabLayout};
use rastercast::raycast::GpuContext;
use rastercast::scene::{HullLibrary, HullSource, PrefabHulls};
use rastercast::worker::{self, protocol::{Reply, ReplyResult, Request, SlabSpec}};
use rastercast::{Error, Result};

const IDENTITY: [f32; 16] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];
const NO_ROTATION: [f32; 4] = [0.0, 0.0, 0.0, 1.0];
/// 180 degrees around Y: forward becomes +Z.
const ABOUT_FACE: [f32; 4] = [0.0, 1.0, 0.0, 0.0];

fn spawn_or_skip() -> Option<worker::WorkerHandle> {
    match worker::spawn(Box::new(PrefabHulls)) {
        Ok(handle) => Some(handle),
        Err(Error::NoAdapter) => {
            eprintln!("no GPU adapter, skipping");
            None
        }
        Err(err) => panic!("worker spawn failed: {err}"),
    }
}

/// One triangle in the z=0 plane, spanning the origin, as mesh 1.
fn triangle_slab() -> Request {
    Request::LoadSlab {
        mesh_id: 1,
        x: 0.0,
        y: 0.0,
        z: 0.0,
        specs: vec![SlabSpec {
            x: 0,
            y: 0,
            z: 0,
            positions: vec![-1.0, -1.0, 0.0, 1.0, -1.0, 0.0, 0.0, 1.0, 0.0],
            barycentrics: vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
            ids: vec![1.0, 1.0, 1.0],
            indices: vec![0.0, 0.0, 0.0],
        }],
        parcel_size: 16,
        subparcel_size: 4,
        slab_total_size: 144,
        slab_attribute_size: 36,
        slab_slice_vertices: 3,
        num_slices: 1,
    }
}

/// A 4x4 quad at z = -4 (two triangles), as mesh 2.
fn quad_slab() -> Request {
    Request::LoadSlab {
        mesh_id: 2,
        x: 0.0,
        y: 0.0,
        z: 0.0,
        specs: vec![SlabSpec {
            x: 0,
            y: 0,
            z: -1,
            positions: vec![
                -2.0, -2.0, -4.0, 2.0, -2.0, -4.0, 2.0, 2.0, -4.0, //
                -2.0, -2.0, -4.0, 2.0, 2.0, -4.0, -2.0, 2.0, -4.0,
            ],
            barycentrics: vec![
                1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, //
                1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0,
            ],
            ids: vec![2.0; 6],
            indices: vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0],
        }],
        parcel_size: 16,
        subparcel_size: 4,
        slab_total_size: 4 * 288,
        slab_attribute_size: 288,
        slab_slice_vertices: 6,
        num_slices: 4,
    }
}

fn expect_empty(reply: Option<Reply>) {
    match reply {
        Some(Reply {
            result: ReplyResult::Empty {},
        }) => {}
        other => panic!("expected empty reply, got {other:?}"),
    }
}

fn read_results(
    handle: &worker::WorkerHandle,
) -> (
    Option<rastercast::worker::protocol::PointHitPayload>,
    Vec<rastercast::worker::protocol::CollisionPayload>,
    rastercast::worker::protocol::PhysicsPayload,
) {
    handle.send(Request::RaycastResult {});
    match handle.recv() {
        Some(Reply {
            result: ReplyResult::Raycast(point, collisions, physics),
        }) => (point, collisions, physics),
        other => panic!("expected raycast results, got {other:?}"),
    }
}

#[test]
fn point_raycast_hits_a_known_triangle() {
    let Some(handle) = spawn_or_skip() else { return };

    handle.send(triangle_slab());
    expect_empty(handle.recv());

    handle.send(Request::PointRaycast {
        container_matrix: IDENTITY,
        position: [0.0, 0.0, 5.0],
        quaternion: NO_ROTATION,
    });
    expect_empty(handle.recv());

    let (point, _, _) = read_results(&handle);
    let hit = point.expect("camera is staring at the triangle");

    assert_eq!(hit.mesh_id, 1);
    assert_eq!(hit.index, 0);

    let p = Vec3::from_array(hit.point);
    assert!(p.distance(Vec3::ZERO) < 1e-3, "hit point {p}");

    let n = Vec3::from_array(hit.normal);
    assert!(n.distance(Vec3::Z) < 1e-4, "normal {n}");

    handle.shutdown();
}

#[test]
fn point_raycast_facing_away_is_null() {
    let Some(handle) = spawn_or_skip() else { return };

    handle.send(triangle_slab());
    expect_empty(handle.recv());

    handle.send(Request::PointRaycast {
        container_matrix: IDENTITY,
        position: [0.0, 0.0, 5.0],
        quaternion: ABOUT_FACE,
    });
    expect_empty(handle.recv());

    let (point, _, _) = read_results(&handle);
    assert!(point.is_none());

    handle.shutdown();
}

#[test]
fn collision_raycast_decodes_plane_depth() {
    let Some(handle) = spawn_or_skip() else { return };

    handle.send(quad_slab());
    expect_empty(handle.recv());

    // Index 0 looks straight at the quad 4 units away; index 1 looks the
    // other way into empty space.
    handle.send(Request::CollisionRaycast {
        container_matrix: IDENTITY,
        position: [0.0, 0.0, 0.0],
        quaternion: NO_ROTATION,
        width: 1.0,
        height: 1.0,
        depth: 10.0,
        index: 0,
    });
    expect_empty(handle.recv());
    handle.send(Request::CollisionRaycast {
        container_matrix: IDENTITY,
        position: [0.0, 0.0, 0.0],
        quaternion: ABOUT_FACE,
        width: 1.0,
        height: 1.0,
        depth: 10.0,
        index: 1,
    });
    expect_empty(handle.recv());

    let (_, collisions, _) = read_results(&handle);
    assert_eq!(collisions.len(), 2);

    assert_eq!(collisions[0].depths.len(), 100);
    assert_eq!(collisions[0].normals.len(), 300);
    for (i, &d) in collisions[0].depths.iter().enumerate() {
        assert!((d - 4.0).abs() < 0.02, "sample {i} depth {d}");
    }
    for chunk in collisions[0].normals.chunks(3) {
        let n = Vec3::new(chunk[0], chunk[1], chunk[2]);
        assert!(n.distance(Vec3::Z) < 1e-3, "normal {n}");
    }

    for &d in &collisions[1].depths {
        assert!(d.is_infinite());
    }

    handle.shutdown();
}

#[test]
fn physics_batch_of_three_returns_three_depths_and_resets() {
    let Some(handle) = spawn_or_skip() else { return };

    handle.send(quad_slab());
    expect_empty(handle.recv());

    let pose = ([0.0, 0.0, 0.0], NO_ROTATION);
    handle.send(Request::PhysicsRaycast {
        container_matrix: IDENTITY,
        collisions: vec![pose, pose, pose],
        width: 0.5,
        height: 0.5,
        depth: 10.0,
    });
    expect_empty(handle.recv());

    let (_, _, physics) = read_results(&handle);
    assert_eq!(physics.depths.len(), 64);
    for i in 0..3 {
        let d = physics.depths[i];
        assert!((d - 4.0).abs() < 0.02, "column {i} depth {d}");
    }
    for &d in &physics.depths[3..] {
        assert!(d.is_infinite());
    }

    // Cursor reset: the next batch starts back at column 0.
    handle.send(Request::PhysicsRaycast {
        container_matrix: IDENTITY,
        collisions: vec![pose],
        width: 0.5,
        height: 0.5,
        depth: 8.0,
    });
    expect_empty(handle.recv());

    let (_, _, physics) = read_results(&handle);
    assert!((physics.depths[0] - 4.0).abs() < 0.02);

    handle.shutdown();
}

#[test]
fn slab_slots_are_reused_without_growing() {
    let gpu = match GpuContext::new() {
        Ok(gpu) => gpu,
        Err(Error::NoAdapter) => {
            eprintln!("no GPU adapter, skipping");
            return;
        }
        Err(err) => panic!("{err}"),
    };

    let layout = SlabLayout {
        total_byte_size: 576,
        attribute_byte_size: 144,
        vertices_per_slice: 6,
        num_slices: 2,
    };
    let mut mesh = ChunkMesh::new(&gpu.device, 9, Vec3::ZERO, 16, 4, layout);

    let update_data = [0.0f32; 18];
    let per_vertex = [0.0f32; 6];
    let update = GeometryUpdate {
        positions: &update_data,
        barycentrics: &update_data,
        ids: &per_vertex,
        indices: &per_vertex,
    };

    let first = mesh.get_slab(0, 0, 0).unwrap();
    mesh.update_geometry(&gpu.queue, first, &update);

    // Churn one coordinate far past capacity; the freed slot must absorb
    // every re-add.
    for cycle in 0..layout.num_slices * 4 {
        let slab = mesh.get_slab(1, 0, cycle as i32 % 3).unwrap();
        assert!(slab.slot < layout.num_slices, "slot grew past capacity");
        assert_eq!(slab.slot, 1, "reused slot changed");
        mesh.update_geometry(&gpu.queue, slab, &update);
        assert!(mesh.remove_slab(1, 0, cycle as i32 % 3));
    }

    // Both slots live: a third distinct cell must fail, not grow.
    let second = mesh.get_slab(2, 0, 0).unwrap();
    assert_eq!(second.slot, 1);
    let overflow = mesh.get_slab(3, 0, 0);
    assert!(matches!(overflow, Err(Error::SlabCapacity { .. })));

    assert_eq!(mesh.groups.groups().len(), 2);
}

struct SlowHulls;

impl HullSource for SlowHulls {
    fn load(&self) -> Result<HullLibrary> {
        std::thread::sleep(std::time::Duration::from_millis(200));
        PrefabHulls.load()
    }
}

#[test]
fn commands_queued_while_loading_replay_in_order() {
    let handle = match worker::spawn(Box::new(SlowHulls)) {
        Ok(handle) => handle,
        Err(Error::NoAdapter) => {
            eprintln!("no GPU adapter, skipping");
            return;
        }
        Err(err) => panic!("worker spawn failed: {err}"),
    };

    // All of these land before the hulls finish loading.
    handle.send(triangle_slab());
    handle.send(Request::PointRaycast {
        container_matrix: IDENTITY,
        position: [0.0, 0.0, 5.0],
        quaternion: NO_ROTATION,
    });
    handle.send(Request::RaycastResult {});

    // Replies arrive in submission order once the gate opens.
    expect_empty(handle.recv());
    expect_empty(handle.recv());
    match handle.recv() {
        Some(Reply {
            result: ReplyResult::Raycast(point, _, _),
        }) => {
            let hit = point.expect("queued raycast ran after its queued loadSlab");
            assert_eq!(hit.mesh_id, 1);
        }
        other => panic!("expected raycast results, got {other:?}"),
    }

    handle.shutdown();
}
