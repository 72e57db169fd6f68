// src/worker/protocol.rs
//
// Wire protocol for the worker channel. Requests are JSON objects tagged by
// `method`; every reply is wrapped in `{"result": ...}`. Field names mirror
// the main-thread callers, hence camelCase throughout.

use serde::{Deserialize, Serialize};

use crate::raycast::{CollisionResult, PhysicsResult, PointHit};

/// Per-slab payload inside a `loadSlab` command: four parallel attribute
/// arrays for the cell at `(x, y, z)`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SlabSpec {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub positions: Vec<f32>,
    pub barycentrics: Vec<f32>,
    pub ids: Vec<f32>,
    pub indices: Vec<f32>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "camelCase")]
pub enum Request {
    #[serde(rename_all = "camelCase")]
    LoadSlab {
        mesh_id: u32,
        x: f32,
        y: f32,
        z: f32,
        specs: Vec<SlabSpec>,
        parcel_size: u32,
        subparcel_size: u32,
        slab_total_size: u32,
        slab_attribute_size: u32,
        slab_slice_vertices: u32,
        num_slices: u32,
    },
    #[serde(rename_all = "camelCase")]
    UnloadSlab { mesh_id: u32, x: i32, y: i32, z: i32 },
    #[serde(rename_all = "camelCase")]
    PointRaycast {
        container_matrix: [f32; 16],
        position: [f32; 3],
        quaternion: [f32; 4],
    },
    #[serde(rename_all = "camelCase")]
    CollisionRaycast {
        container_matrix: [f32; 16],
        position: [f32; 3],
        quaternion: [f32; 4],
        width: f32,
        height: f32,
        depth: f32,
        index: u32,
    },
    #[serde(rename_all = "camelCase")]
    PhysicsRaycast {
        container_matrix: [f32; 16],
        /// `[position, quaternion]` pairs, one raycast each.
        collisions: Vec<([f32; 3], [f32; 4])>,
        width: f32,
        height: f32,
        depth: f32,
    },
    #[serde(rename_all = "camelCase")]
    RaycastResult {},
    #[serde(rename_all = "camelCase")]
    LoadBuildMesh {
        mesh_id: u32,
        #[serde(rename = "type")]
        kind: String,
        position: [f32; 3],
        quaternion: [f32; 4],
    },
    #[serde(rename_all = "camelCase")]
    UnloadBuildMesh { mesh_id: u32 },
}

#[derive(Clone, Debug, Serialize)]
pub struct Reply {
    pub result: ReplyResult,
}

impl Reply {
    pub fn empty() -> Self {
        Reply {
            result: ReplyResult::Empty {},
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum ReplyResult {
    Empty {},
    /// `raycastResult` payload: `[pointResult, collisionResults, physicsResult]`.
    Raycast(
        Option<PointHitPayload>,
        Vec<CollisionPayload>,
        PhysicsPayload,
    ),
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PointHitPayload {
    pub mesh_id: u32,
    pub index: u32,
    pub point: [f32; 3],
    pub normal: [f32; 3],
}

impl From<PointHit> for PointHitPayload {
    fn from(hit: PointHit) -> Self {
        PointHitPayload {
            mesh_id: hit.mesh_id,
            index: hit.tri_index,
            point: hit.point.to_array(),
            normal: hit.normal.to_array(),
        }
    }
}

/// Non-finite depths serialize as JSON `null`; consumers read `null` as a
/// miss. The in-process channel carries the real `f32::INFINITY`.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollisionPayload {
    pub position: [f32; 3],
    pub quaternion: [f32; 4],
    pub depths: Vec<f32>,
    pub normals: Vec<f32>,
}

impl From<CollisionResult> for CollisionPayload {
    fn from(r: CollisionResult) -> Self {
        CollisionPayload {
            position: r.position.to_array(),
            quaternion: r.rotation.to_array(),
            depths: r.depths,
            normals: r.normals,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhysicsPayload {
    pub depths: Vec<f32>,
}

impl From<PhysicsResult> for PhysicsPayload {
    fn from(r: PhysicsResult) -> Self {
        PhysicsPayload { depths: r.depths }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_slab_parses_the_wire_shape() {
        let json = r#"{
            "method": "loadSlab",
            "meshId": 7,
            "x": 0.0, "y": 0.0, "z": 0.0,
            "specs": [{
                "x": 1, "y": 0, "z": -2,
                "positions": [0,0,0, 1,0,0, 0,1,0],
                "barycentrics": [1,0,0, 0,1,0, 0,0,1],
                "ids": [7,7,7],
                "indices": [0,0,0]
            }],
            "parcelSize": 16,
            "subparcelSize": 4,
            "slabTotalSize": 4096,
            "slabAttributeSize": 1024,
            "slabSliceVertices": 12,
            "numSlices": 4
        }"#;

        let req: Request = serde_json::from_str(json).unwrap();
        match req {
            Request::LoadSlab {
                mesh_id,
                specs,
                num_slices,
                ..
            } => {
                assert_eq!(mesh_id, 7);
                assert_eq!(specs.len(), 1);
                assert_eq!(specs[0].z, -2);
                assert_eq!(num_slices, 4);
            }
            other => panic!("parsed as {other:?}"),
        }
    }

    #[test]
    fn unknown_method_fails_to_parse() {
        let err = serde_json::from_str::<Request>(r#"{"method":"teleport"}"#);
        assert!(err.is_err());
    }

    #[test]
    fn physics_collisions_parse_as_pose_pairs() {
        let json = r#"{
            "method": "physicsRaycast",
            "containerMatrix": [1,0,0,0, 0,1,0,0, 0,0,1,0, 0,0,0,1],
            "collisions": [[[0,2,0],[0,0,0,1]], [[1,2,0],[0,0,0,1]]],
            "width": 0.5, "height": 0.5, "depth": 3.0
        }"#;
        let req: Request = serde_json::from_str(json).unwrap();
        match req {
            Request::PhysicsRaycast { collisions, .. } => {
                assert_eq!(collisions.len(), 2);
                assert_eq!(collisions[1].0, [1.0, 2.0, 0.0]);
            }
            other => panic!("parsed as {other:?}"),
        }
    }

    #[test]
    fn empty_reply_serializes_as_result_object() {
        let s = serde_json::to_string(&Reply::empty()).unwrap();
        assert_eq!(s, r#"{"result":{}}"#);
    }

    #[test]
    fn raycast_reply_serializes_as_triple() {
        let reply = Reply {
            result: ReplyResult::Raycast(
                None,
                Vec::new(),
                PhysicsPayload {
                    depths: vec![1.5, f32::INFINITY],
                },
            ),
        };
        let v = serde_json::to_value(&reply).unwrap();
        let triple = v.get("result").unwrap().as_array().unwrap();
        assert_eq!(triple.len(), 3);
        assert!(triple[0].is_null());
        // Non-finite floats become null on the JSON wire.
        assert!(triple[2]["depths"][1].is_null());
    }

    #[test]
    fn build_mesh_type_field_round_trips() {
        let json = r#"{
            "method": "loadBuildMesh",
            "meshId": 42,
            "type": "stair",
            "position": [0,0,0],
            "quaternion": [0,0,0,1]
        }"#;
        let req: Request = serde_json::from_str(json).unwrap();
        match req {
            Request::LoadBuildMesh { kind, .. } => assert_eq!(kind, "stair"),
            other => panic!("parsed as {other:?}"),
        }
    }
}
