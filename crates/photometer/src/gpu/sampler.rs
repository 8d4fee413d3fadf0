use crossbeam_channel::bounded;

use crate::types::{brightness_from_rgba, mip_level_count, validate_subsample_size};
use crate::{Photometer, PhotometerError, SampleRegion};

use super::mips::{blit_sampler, copy_bind_group, encode_pass, MipChain};
use super::pipeline::{SamplerLayouts, SamplerPipelines};
use super::uniforms::CropUniform;
use super::WORKING_FORMAT;

/// Bytes per row of the readback copy; wgpu requires the row pitch to be
/// aligned even when only one texel is copied.
const READBACK_ROW_BYTES: u32 = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

/// Mipmap-reduction photometer.
///
/// Owns a square crop texture with a full mip chain, a 1×1 readback target
/// and the buffer the averaged pixel is copied into. Every measurement
/// overwrites all three, so a single instance must not be driven from two
/// places at once.
///
/// The crop pass samples the frame trilinearly, so the frame view must carry
/// a complete, up to date mip chain (as [`super::FrameTexture`] does). A
/// single-level view of a frame much larger than the crop texture is point
/// sampled rather than averaged.
pub struct GpuPhotometer {
    device: wgpu::Device,
    queue: wgpu::Queue,
    layouts: SamplerLayouts,
    pipelines: SamplerPipelines,
    crop_mips: MipChain,
    reduce_bind_group: wgpu::BindGroup,
    crop_uniform: wgpu::Buffer,
    source_sampler: wgpu::Sampler,
    readback_texture: wgpu::Texture,
    readback_view: wgpu::TextureView,
    readback_buffer: wgpu::Buffer,
}

impl GpuPhotometer {
    /// Builds every GPU object the sampler needs.
    ///
    /// Validation errors raised by wgpu while creating the objects are caught
    /// through an error scope and reported as [`PhotometerError::Setup`];
    /// there is no way to recover a half-built sampler.
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        subsample_size: u32,
    ) -> Result<Self, PhotometerError> {
        let size = validate_subsample_size(subsample_size)?;
        let max = device.limits().max_texture_dimension_2d;
        if size > max {
            return Err(PhotometerError::TextureTooLarge { size, max });
        }

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let photometer = Self::build(device, queue, size);
        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(PhotometerError::Setup(error.to_string()));
        }

        tracing::debug!(
            subsample_size = size,
            mip_levels = mip_level_count(size),
            "photometer resources ready"
        );
        Ok(photometer)
    }

    fn build(device: &wgpu::Device, queue: &wgpu::Queue, size: u32) -> Self {
        let layouts = SamplerLayouts::new(device);
        let pipelines = SamplerPipelines::new(device, &layouts);
        let mip_levels = mip_level_count(size);

        let crop_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("photometer crop texture"),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 1,
            },
            mip_level_count: mip_levels,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: WORKING_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let crop_chain_view = crop_texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("photometer crop chain"),
            ..Default::default()
        });

        // Trilinear, so the crop pass reads the frame level whose texels
        // match one crop texel.
        let source_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("photometer source sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        // Nearest within a level, linear between levels; the 1×1 viewport
        // drives the LOD to the coarsest level.
        let reduce_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("photometer reduce sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let crop_mips = MipChain::new(
            device,
            &crop_texture,
            "photometer crop",
            &layouts.copy,
            &blit_sampler(device),
        );
        let reduce_bind_group = copy_bind_group(
            device,
            &layouts.copy,
            "photometer reduce source",
            &crop_chain_view,
            &reduce_sampler,
        );

        let crop_uniform = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("photometer crop area"),
            size: std::mem::size_of::<CropUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        queue.write_buffer(
            &crop_uniform,
            0,
            bytemuck::bytes_of(&CropUniform::from_region(&SampleRegion::FULL)),
        );

        let readback_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("photometer readback target"),
            size: wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: WORKING_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let readback_view = readback_texture.create_view(&wgpu::TextureViewDescriptor::default());
        let readback_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("photometer readback buffer"),
            size: u64::from(READBACK_ROW_BYTES),
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            device: device.clone(),
            queue: queue.clone(),
            layouts,
            pipelines,
            crop_mips,
            reduce_bind_group,
            crop_uniform,
            source_sampler,
            readback_texture,
            readback_view,
            readback_buffer,
        }
    }

    fn encode(&self, encoder: &mut wgpu::CommandEncoder, source: &wgpu::BindGroup) {
        encode_pass(
            encoder,
            "photometer crop pass",
            self.crop_mips.base(),
            &self.pipelines.crop,
            source,
        );
        self.crop_mips.encode(encoder, &self.pipelines.copy);
        encode_pass(
            encoder,
            "photometer reduce pass",
            &self.readback_view,
            &self.pipelines.copy,
            &self.reduce_bind_group,
        );

        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.readback_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &self.readback_buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(READBACK_ROW_BYTES),
                    rows_per_image: Some(1),
                },
            },
            wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
        );
    }

    fn read_pixel(&self) -> Result<[u8; 4], PhotometerError> {
        let slice = self.readback_buffer.slice(..);
        let (sender, receiver) = bounded(1);
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        if let Err(err) = self.device.poll(wgpu::PollType::Wait) {
            self.release_readback();
            return Err(PhotometerError::Readback(err.to_string()));
        }
        receiver
            .recv()
            .map_err(|_| PhotometerError::Readback("map callback was dropped".into()))?
            .map_err(|err| PhotometerError::Readback(err.to_string()))?;

        let pixel = {
            let data = slice.get_mapped_range();
            [data[0], data[1], data[2], data[3]]
        };
        self.readback_buffer.unmap();
        Ok(pixel)
    }

    /// Drops a map left pending or open by an interrupted readback.
    fn release_readback(&self) {
        if !matches!(self.readback_buffer.map_state(), wgpu::MapState::Unmapped) {
            tracing::debug!("releasing stale readback mapping");
            self.readback_buffer.unmap();
        }
    }
}

impl Photometer for GpuPhotometer {
    type Frame = wgpu::TextureView;

    fn measure(
        &self,
        frame: &wgpu::TextureView,
        region: SampleRegion,
    ) -> Result<f32, PhotometerError> {
        // The readback copy below is rejected while the buffer is mapped.
        self.release_readback();
        self.queue.write_buffer(
            &self.crop_uniform,
            0,
            bytemuck::bytes_of(&CropUniform::from_region(&region)),
        );
        let source = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("photometer frame source"),
            layout: &self.layouts.crop,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(frame),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.source_sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: self.crop_uniform.as_entire_binding(),
                },
            ],
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("photometer measure"),
            });
        self.encode(&mut encoder, &source);
        self.queue.submit(std::iter::once(encoder.finish()));

        let pixel = self.read_pixel()?;
        let brightness = brightness_from_rgba(pixel);
        tracing::trace!(?pixel, brightness, ?region, "photometer readback");
        Ok(brightness)
    }
}
