use crate::types::mip_level_count;

use super::mips::{blit_sampler, MipChain};
use super::pipeline::{copy_layout, copy_pipeline};
use super::WORKING_FORMAT;

const BYTES_PER_PIXEL: u32 = 4;

/// Sampleable RGBA8 texture that CPU-side frames are uploaded into.
///
/// Stands in for the video texture a browser or capture pipeline would
/// normally provide: [`FrameTexture::upload`] replaces the whole image and
/// rebuilds its mip chain, and [`FrameTexture::view`] (every level) is what
/// [`super::GpuPhotometer`] measures.
pub struct FrameTexture {
    device: wgpu::Device,
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    mips: MipChain,
    mip_pipeline: wgpu::RenderPipeline,
    width: u32,
    height: u32,
}

impl FrameTexture {
    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("photometer frame texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: mip_level_count(width.max(height)),
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: WORKING_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let layout = copy_layout(device);
        let mips = MipChain::new(
            device,
            &texture,
            "photometer frame",
            &layout,
            &blit_sampler(device),
        );
        tracing::debug!(width, height, mip_levels = mips.levels(), "frame texture ready");

        Self {
            device: device.clone(),
            mip_pipeline: copy_pipeline(device, &layout),
            texture,
            view,
            mips,
            width,
            height,
        }
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    /// Replaces the frame contents with tightly packed RGBA8 rows and
    /// regenerates the mip chain from them.
    pub fn upload(&self, queue: &wgpu::Queue, rgba: &[u8]) {
        let expected_len = (self.width * self.height * BYTES_PER_PIXEL) as usize;
        if rgba.len() != expected_len {
            tracing::warn!(
                expected_len,
                actual_len = rgba.len(),
                "frame upload ignored due to mismatched payload size"
            );
            return;
        }

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(self.width * BYTES_PER_PIXEL),
                rows_per_image: Some(self.height),
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );

        if self.mips.levels() > 1 {
            let mut encoder = self
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("photometer frame mips"),
                });
            self.mips.encode(&mut encoder, &self.mip_pipeline);
            queue.submit(std::iter::once(encoder.finish()));
        }
    }
}
