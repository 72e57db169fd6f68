// src/raycast/mod.rs
// Encoding raycast pipelines: render the scene with value-encoding shaders,
// read pixels back, decode query results.

mod collision;
mod gpu;
mod physics;
mod pipelines;
mod point;
mod shaders;
mod target;

pub use collision::{CollisionRaycaster, CollisionResult};
pub use gpu::GpuContext;
pub use physics::{PhysicsRaycaster, PhysicsResult};
pub use pipelines::EncodePipelines;
pub use point::{PointHit, PointRaycaster};
pub use target::EncodeTarget;

use glam::Mat4;

use crate::config;
use crate::scene::Container;

/// Which encode shader a render uses, and with it which vertex planes the
/// draw binds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum EncodePass {
    /// Point pass: id + triangle-index channels.
    Id,
    /// Collision pass: depth + id + triangle-index channels.
    DepthId,
    /// Physics pass: depth channels, positions only.
    DepthOnly,
}

/// Render every visible mesh into `target` with the chosen encode pass.
///
/// Callers hold the visibility-filter scope around this; group lists are read
/// as-is. Color and depth load whatever the target currently holds; the miss
/// state comes from the clear performed at creation and after readback.
fn render_scene(
    gpu: &GpuContext,
    pipelines: &EncodePipelines,
    target: &EncodeTarget,
    pass: EncodePass,
    scene: &Container,
    view_proj: Mat4,
    viewport_column: Option<u32>,
) {
    enum Source<'a> {
        Chunk(&'a crate::chunks::ChunkMesh),
        Build(&'a crate::scene::BuildMesh),
    }

    let mut draws: Vec<(Mat4, Source)> = Vec::new();
    for mesh in scene.chunks.iter() {
        let mvp = view_proj * scene.transform * mesh.local_transform();
        draws.push((mvp, Source::Chunk(mesh)));
    }
    for build in &scene.builds {
        let mvp = view_proj * scene.transform * build.local_transform();
        draws.push((mvp, Source::Build(build)));
    }

    if draws.len() > config::MAX_DRAWS_PER_PASS {
        log::warn!(
            "encode pass draw cap exceeded: {} > {}, dropping the tail",
            draws.len(),
            config::MAX_DRAWS_PER_PASS
        );
        draws.truncate(config::MAX_DRAWS_PER_PASS);
    }

    for (slot, (mvp, _)) in draws.iter().enumerate() {
        pipelines.write_draw_uniform(&gpu.queue, slot, mvp);
    }

    let mut encoder = gpu
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("encode_pass"),
        });
    {
        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("encode_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &target.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &target.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        if let Some(column) = viewport_column {
            rpass.set_viewport(column as f32, 0.0, 1.0, target.height as f32, 0.0, 1.0);
        }

        rpass.set_pipeline(match pass {
            EncodePass::Id => &pipelines.point,
            EncodePass::DepthId => &pipelines.collision,
            EncodePass::DepthOnly => &pipelines.physics,
        });

        for (slot, (_, source)) in draws.iter().enumerate() {
            let offset = slot as u32 * config::UNIFORM_SLOT_BYTES as u32;
            rpass.set_bind_group(0, pipelines.uniform_bind(), &[offset]);

            match source {
                Source::Chunk(mesh) => {
                    let arena = mesh.arena();
                    let layout = arena.layout();
                    let buffer = arena.buffer();

                    let (start, len) = layout.plane_bytes(crate::chunks::Attribute::Position);
                    rpass.set_vertex_buffer(0, buffer.slice(start..start + len));
                    if pass != EncodePass::DepthOnly {
                        let (start, len) = layout.plane_bytes(crate::chunks::Attribute::Id);
                        rpass.set_vertex_buffer(1, buffer.slice(start..start + len));
                        let (start, len) =
                            layout.plane_bytes(crate::chunks::Attribute::TriIndex);
                        rpass.set_vertex_buffer(2, buffer.slice(start..start + len));
                    }

                    for group in mesh.groups.groups() {
                        if group.count > 0 {
                            rpass.draw(group.start..group.start + group.count, 0..1);
                        }
                    }
                }
                Source::Build(build) => {
                    rpass.set_vertex_buffer(0, build.position_buffer().slice(..));
                    if pass != EncodePass::DepthOnly {
                        rpass.set_vertex_buffer(1, build.id_buffer().slice(..));
                        rpass.set_vertex_buffer(2, build.tri_index_buffer().slice(..));
                    }
                    rpass.draw(0..build.vertex_count(), 0..1);
                }
            }
        }
    }
    gpu.queue.submit(Some(encoder.finish()));
}
