// src/raycast/pipelines.rs

use glam::Mat4;

use crate::config;

use super::shaders;

/// Output format every encode pass renders into. Full-float channels keep the
/// id/index divisions and depth fractions exact through readback.
pub const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// The three encode pipelines plus the dynamic-offset draw-uniform buffer
/// they share. Explicitly constructed and owned here; creation and teardown
/// follow the worker lifecycle.
pub struct EncodePipelines {
    /// Point pass: mesh id + triangle index channels.
    pub point: wgpu::RenderPipeline,

    /// Collision pass: two-channel depth + id + index.
    pub collision: wgpu::RenderPipeline,

    /// Physics pass: depth channels only, positions-only vertex input.
    pub physics: wgpu::RenderPipeline,

    uniforms: wgpu::Buffer,
    uniform_bind: wgpu::BindGroup,
}

fn make_encode_pipeline(
    device: &wgpu::Device,
    label: &str,
    source: &str,
    layout: &wgpu::PipelineLayout,
    buffers: &[wgpu::VertexBufferLayout],
) -> wgpu::RenderPipeline {
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: &module,
            entry_point: "vs_main",
            buffers,
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &module,
            entry_point: "fs_main",
            targets: &[Some(wgpu::ColorTargetState {
                format: TARGET_FORMAT,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
    })
}

const POSITION_ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];
const ID_ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![1 => Float32];
const TRI_INDEX_ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![2 => Float32];

const POSITION_LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
    array_stride: 12,
    step_mode: wgpu::VertexStepMode::Vertex,
    attributes: &POSITION_ATTRS,
};

const ID_LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
    array_stride: 4,
    step_mode: wgpu::VertexStepMode::Vertex,
    attributes: &ID_ATTRS,
};

const TRI_INDEX_LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
    array_stride: 4,
    step_mode: wgpu::VertexStepMode::Vertex,
    attributes: &TRI_INDEX_ATTRS,
};

impl EncodePipelines {
    pub fn new(device: &wgpu::Device) -> Self {
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("draw_uniforms_bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(64),
                },
                count: None,
            }],
        });

        let uniforms = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("draw_uniforms"),
            size: config::MAX_DRAWS_PER_PASS as u64 * config::UNIFORM_SLOT_BYTES,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uniform_bind = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("draw_uniforms_bg"),
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &uniforms,
                    offset: 0,
                    size: wgpu::BufferSize::new(64),
                }),
            }],
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("encode_pl"),
            bind_group_layouts: &[&uniform_layout],
            push_constant_ranges: &[],
        });

        let point = make_encode_pipeline(
            device,
            "point_id_pipeline",
            shaders::CHUNK_ID_WGSL,
            &layout,
            &[POSITION_LAYOUT, ID_LAYOUT, TRI_INDEX_LAYOUT],
        );

        let collision = make_encode_pipeline(
            device,
            "collision_depth_pipeline",
            shaders::CHUNK_DEPTH_WGSL,
            &layout,
            &[POSITION_LAYOUT, ID_LAYOUT, TRI_INDEX_LAYOUT],
        );

        let physics = make_encode_pipeline(
            device,
            "physics_depth_pipeline",
            shaders::DEPTH_ONLY_WGSL,
            &layout,
            &[POSITION_LAYOUT],
        );

        Self {
            point,
            collision,
            physics,
            uniforms,
            uniform_bind,
        }
    }

    #[inline]
    pub fn uniform_bind(&self) -> &wgpu::BindGroup {
        &self.uniform_bind
    }

    /// Stage one draw's MVP into its uniform slot. Slots are consumed in
    /// draw order and rewritten every render.
    pub fn write_draw_uniform(&self, queue: &wgpu::Queue, slot: usize, mvp: &Mat4) {
        debug_assert!(slot < config::MAX_DRAWS_PER_PASS);
        queue.write_buffer(
            &self.uniforms,
            slot as u64 * config::UNIFORM_SLOT_BYTES,
            bytemuck::cast_slice(&mvp.to_cols_array()),
        );
    }
}
