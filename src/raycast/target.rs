// src/raycast/target.rs

use super::gpu::GpuContext;
use super::pipelines::{DEPTH_FORMAT, TARGET_FORMAT};

/// Offscreen encode target: float color + depth, plus a mapped-read buffer
/// sized for the padded copy rows. Targets are long-lived; one per point and
/// physics raycaster, one per collision index.
pub struct EncodeTarget {
    pub width: u32,
    pub height: u32,

    texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub depth_view: wgpu::TextureView,

    readback: wgpu::Buffer,
    padded_bytes_per_row: u32,
}

impl EncodeTarget {
    pub fn new(gpu: &GpuContext, label: &str, width: u32, height: u32) -> Self {
        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TARGET_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&Default::default());

        let depth = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&format!("{label}_depth")),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let depth_view = depth.create_view(&Default::default());

        let unpadded = width * 16; // four f32 channels
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_bytes_per_row = (unpadded + align - 1) / align * align;

        let readback = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("{label}_readback")),
            size: (padded_bytes_per_row * height) as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let target = Self {
            width,
            height,
            texture,
            view,
            depth_view,
            readback,
            padded_bytes_per_row,
        };
        // Start from a cleared miss state, like every post-readback state.
        target.clear(gpu);
        target
    }

    /// Reset color to the miss value and depth to the far plane.
    pub fn clear(&self, gpu: &GpuContext) {
        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("encode_target_clear"),
            });
        {
            let _rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("clear_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
        }
        gpu.queue.submit(Some(encoder.finish()));
    }

    /// Synchronous pixel readback: `width * height * 4` floats, row-major.
    pub fn read_pixels(&self, gpu: &GpuContext) -> Vec<f32> {
        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("encode_target_readback"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &self.readback,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(self.padded_bytes_per_row),
                    rows_per_image: Some(self.height),
                },
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
        gpu.queue.submit(Some(encoder.finish()));

        let slice = self.readback.slice(..);
        slice.map_async(wgpu::MapMode::Read, |_| {});
        let _ = gpu.device.poll(wgpu::Maintain::Wait);

        let data = slice.get_mapped_range();
        let unpadded = (self.width * 16) as usize;
        let mut pixels = Vec::with_capacity((self.width * self.height * 4) as usize);
        for row in 0..self.height as usize {
            let start = row * self.padded_bytes_per_row as usize;
            let floats: &[f32] = bytemuck::cast_slice(&data[start..start + unpadded]);
            pixels.extend_from_slice(floats);
        }
        drop(data);
        self.readback.unmap();

        pixels
    }
}
