// src/worker/mod.rs
// Protocol dispatcher: one thread owning the GPU context, the scene and the
// three raycasters. Commands run to completion in arrival order; the only
// suspension point is the Loading -> Ready transition while startup hulls
// are fetched.

pub mod protocol;

use std::collections::VecDeque;
use std::thread;

use crossbeam_channel::{bounded, never, unbounded, Receiver, Sender};
use glam::{Mat4, Quat, Vec3};

use crate::chunks::{GeometryUpdate, SlabLayout};
use crate::error::Result;
use crate::raycast::{
    CollisionRaycaster, EncodePipelines, GpuContext, PhysicsRaycaster, PointRaycaster,
};
use crate::scene::{Container, HullKind, HullLibrary, HullSource};

use protocol::{Reply, ReplyResult, Request};

/// Request backlog held while startup assets load. Admitted requests pass
/// straight through once the gate opens; the backlog drains strictly FIFO.
pub struct StartupGate {
    queue: VecDeque<Request>,
    ready: bool,
}

impl StartupGate {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            ready: false,
        }
    }

    /// Pass the request through when ready, otherwise buffer it.
    pub fn admit(&mut self, req: Request) -> Option<Request> {
        if self.ready {
            Some(req)
        } else {
            self.queue.push_back(req);
            None
        }
    }

    /// Open the gate and hand back the backlog in arrival order.
    pub fn open(&mut self) -> VecDeque<Request> {
        self.ready = true;
        std::mem::take(&mut self.queue)
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

impl Default for StartupGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Caller side of a spawned worker.
pub struct WorkerHandle {
    tx: Sender<Request>,
    rx: Receiver<Reply>,
    thread: Option<thread::JoinHandle<()>>,
}

impl WorkerHandle {
    pub fn send(&self, req: Request) {
        let _ = self.tx.send(req);
    }

    /// Next reply, in command order. `None` once the worker is gone.
    pub fn recv(&self) -> Option<Reply> {
        self.rx.recv().ok()
    }

    /// Split into the raw channel ends plus the join handle, for frontends
    /// that pump requests and replies from different threads.
    pub fn into_parts(self) -> (Sender<Request>, Receiver<Reply>, thread::JoinHandle<()>) {
        let WorkerHandle { tx, rx, thread } = self;
        (tx, rx, thread.expect("worker thread handle"))
    }

    /// Close the request channel and wait for the worker to drain and exit.
    pub fn shutdown(mut self) {
        let thread = self.thread.take();
        drop(self); // closes the request sender, ending the dispatch loop
        if let Some(t) = thread {
            let _ = t.join();
        }
    }
}

/// Spawn the worker thread plus the hull-loader thread feeding it. Fails
/// fast when no GPU device is available.
pub fn spawn(hulls: Box<dyn HullSource>) -> Result<WorkerHandle> {
    let gpu = GpuContext::new()?;

    let (tx_req, rx_req) = bounded::<Request>(256);
    let (tx_reply, rx_reply) = unbounded::<Reply>();
    let (tx_hulls, rx_hulls) = bounded::<Result<HullLibrary>>(1);

    thread::spawn(move || {
        let _ = tx_hulls.send(hulls.load());
    });

    let thread = thread::spawn(move || {
        let mut worker = Worker::new(gpu);
        worker.run(rx_req, rx_hulls, tx_reply);
    });

    Ok(WorkerHandle {
        tx: tx_req,
        rx: rx_reply,
        thread: Some(thread),
    })
}

struct Worker {
    gpu: GpuContext,
    pipelines: EncodePipelines,
    container: Container,

    point: PointRaycaster,
    collision: CollisionRaycaster,
    physics: PhysicsRaycaster,

    hulls: Option<HullLibrary>,
}

impl Worker {
    fn new(gpu: GpuContext) -> Self {
        let pipelines = EncodePipelines::new(&gpu.device);
        let point = PointRaycaster::new(&gpu);
        let collision = CollisionRaycaster::new();
        let physics = PhysicsRaycaster::new(&gpu);

        Self {
            gpu,
            pipelines,
            container: Container::new(),
            point,
            collision,
            physics,
            hulls: None,
        }
    }

    fn run(
        &mut self,
        rx_req: Receiver<Request>,
        rx_hulls: Receiver<Result<HullLibrary>>,
        tx_reply: Sender<Reply>,
    ) {
        let mut gate = StartupGate::new();
        let mut rx_hulls = rx_hulls;

        loop {
            crossbeam_channel::select! {
                recv(rx_hulls) -> msg => {
                    match msg {
                        Ok(Ok(lib)) => {
                            self.hulls = Some(lib);
                            let backlog = gate.open();
                            log::info!("startup hulls loaded, replaying {} queued commands", backlog.len());
                            for req in backlog {
                                self.handle_and_reply(req, &tx_reply);
                            }
                        }
                        Ok(Err(err)) => {
                            // Terminal: the gate never opens, queued commands
                            // stay unserved. Callers own their timeouts.
                            log::error!("startup hull load failed: {err}");
                        }
                        Err(_) => {}
                    }
                    rx_hulls = never();
                }
                recv(rx_req) -> msg => {
                    match msg {
                        Ok(req) => {
                            if let Some(req) = gate.admit(req) {
                                self.handle_and_reply(req, &tx_reply);
                            }
                        }
                        Err(_) => break, // request channel closed
                    }
                }
            }
        }
    }

    fn handle_and_reply(&mut self, req: Request, tx_reply: &Sender<Reply>) {
        if let Some(reply) = self.handle(req) {
            let _ = tx_reply.send(reply);
        }
    }

    /// Run one command to completion. `None` means the command was dropped
    /// without a reply (malformed content behind a well-formed envelope).
    fn handle(&mut self, req: Request) -> Option<Reply> {
        match req {
            Request::LoadSlab {
                mesh_id,
                x,
                y,
                z,
                specs,
                parcel_size,
                subparcel_size,
                slab_total_size,
                slab_attribute_size,
                slab_slice_vertices,
                num_slices,
            } => {
                let layout = SlabLayout {
                    total_byte_size: slab_total_size,
                    attribute_byte_size: slab_attribute_size,
                    vertices_per_slice: slab_slice_vertices,
                    num_slices,
                };
                let mesh = self.container.chunks.get_or_create(
                    &self.gpu.device,
                    mesh_id,
                    Vec3::new(x, y, z),
                    parcel_size,
                    subparcel_size,
                    layout,
                );

                for spec in &specs {
                    match mesh.get_slab(spec.x, spec.y, spec.z) {
                        Ok(slab) => mesh.update_geometry(
                            &self.gpu.queue,
                            slab,
                            &GeometryUpdate {
                                positions: &spec.positions,
                                barycentrics: &spec.barycentrics,
                                ids: &spec.ids,
                                indices: &spec.indices,
                            },
                        ),
                        Err(err) => log::error!(
                            "loadSlab mesh {mesh_id} cell ({}, {}, {}): {err}",
                            spec.x,
                            spec.y,
                            spec.z
                        ),
                    }
                }
                Some(Reply::empty())
            }

            Request::UnloadSlab { mesh_id, x, y, z } => {
                match self.container.chunks.get_mut(mesh_id) {
                    Some(mesh) => {
                        if !mesh.remove_slab(x, y, z) {
                            log::warn!("unloadSlab mesh {mesh_id}: no slab at ({x}, {y}, {z})");
                        }
                    }
                    None => log::warn!("unloadSlab: no mesh {mesh_id}"),
                }
                self.container.chunks.remove_if_empty(mesh_id);
                Some(Reply::empty())
            }

            Request::PointRaycast {
                container_matrix,
                position,
                quaternion,
            } => {
                self.container.transform = Mat4::from_cols_array(&container_matrix);
                self.point.raycast(
                    &self.gpu,
                    &self.pipelines,
                    &mut self.container,
                    Vec3::from_array(position),
                    Quat::from_array(quaternion),
                );
                Some(Reply::empty())
            }

            Request::CollisionRaycast {
                container_matrix,
                position,
                quaternion,
                width,
                height,
                depth,
                index,
            } => {
                self.container.transform = Mat4::from_cols_array(&container_matrix);
                self.collision.raycast(
                    &self.gpu,
                    &self.pipelines,
                    &mut self.container,
                    Vec3::from_array(position),
                    Quat::from_array(quaternion),
                    width,
                    height,
                    depth,
                    index as usize,
                );
                Some(Reply::empty())
            }

            Request::PhysicsRaycast {
                container_matrix,
                collisions,
                width,
                height,
                depth,
            } => {
                self.container.transform = Mat4::from_cols_array(&container_matrix);
                for (position, quaternion) in collisions {
                    self.physics.raycast(
                        &self.gpu,
                        &self.pipelines,
                        &mut self.container,
                        Vec3::from_array(position),
                        Quat::from_array(quaternion),
                        width,
                        height,
                        depth,
                    );
                }
                Some(Reply::empty())
            }

            Request::RaycastResult {} => {
                let point = self
                    .point
                    .read(&self.gpu, &self.container)
                    .map(Into::into);
                let collisions = self
                    .collision
                    .read_all(&self.gpu, &self.container)
                    .into_iter()
                    .map(Into::into)
                    .collect();
                let physics = self.physics.read(&self.gpu).into();

                Some(Reply {
                    result: ReplyResult::Raycast(point, collisions, physics),
                })
            }

            Request::LoadBuildMesh {
                mesh_id,
                kind,
                position,
                quaternion,
            } => {
                let Some(kind) = HullKind::from_name(&kind) else {
                    log::warn!("loadBuildMesh: unknown hull type {kind:?}, dropping");
                    return None;
                };
                let Some(hulls) = self.hulls.as_ref() else {
                    // Unreachable through the gate; guard for direct callers.
                    log::error!("loadBuildMesh before hulls loaded");
                    return None;
                };

                let build = crate::scene::BuildMesh::new(
                    &self.gpu.device,
                    &self.gpu.queue,
                    mesh_id,
                    hulls.get(kind),
                    Vec3::from_array(position),
                    Quat::from_array(quaternion),
                );
                self.container.builds.push(build);
                Some(Reply::empty())
            }

            Request::UnloadBuildMesh { mesh_id } => {
                if !self.container.remove_build(mesh_id) {
                    log::warn!("unloadBuildMesh: no build mesh {mesh_id}");
                }
                Some(Reply::empty())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(tag: u32) -> Request {
        Request::UnloadBuildMesh { mesh_id: tag }
    }

    fn tag_of(r: &Request) -> u32 {
        match r {
            Request::UnloadBuildMesh { mesh_id } => *mesh_id,
            _ => unreachable!(),
        }
    }

    #[test]
    fn gate_buffers_until_open_then_passes_through() {
        let mut gate = StartupGate::new();
        assert!(gate.admit(req(0)).is_none());
        assert!(gate.admit(req(1)).is_none());
        assert_eq!(gate.pending(), 2);

        let backlog = gate.open();
        let order: Vec<u32> = backlog.iter().map(tag_of).collect();
        assert_eq!(order, [0, 1]);

        assert!(gate.is_ready());
        assert_eq!(tag_of(&gate.admit(req(2)).unwrap()), 2);
        assert_eq!(gate.pending(), 0);
    }

    #[test]
    fn gate_replays_in_arrival_order() {
        let mut gate = StartupGate::new();
        for i in 0..16 {
            let _ = gate.admit(req(i));
        }
        let order: Vec<u32> = gate.open().iter().map(tag_of).collect();
        let expected: Vec<u32> = (0..16).collect();
        assert_eq!(order, expected);
    }
}
