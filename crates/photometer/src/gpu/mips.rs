/// Single-level views of a mipmapped texture and the bind groups that
/// downsample each level into the next with the copy program.
pub(crate) struct MipChain {
    views: Vec<wgpu::TextureView>,
    /// `bind_groups[i]` samples level `i` and feeds the pass writing `i + 1`.
    bind_groups: Vec<wgpu::BindGroup>,
}

impl MipChain {
    pub fn new(
        device: &wgpu::Device,
        texture: &wgpu::Texture,
        label: &str,
        layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
    ) -> Self {
        let views: Vec<wgpu::TextureView> = (0..texture.mip_level_count())
            .map(|level| {
                texture.create_view(&wgpu::TextureViewDescriptor {
                    label: Some(&format!("{label} mip #{level}")),
                    base_mip_level: level,
                    mip_level_count: Some(1),
                    ..Default::default()
                })
            })
            .collect();
        let bind_groups = views
            .iter()
            .take(views.len().saturating_sub(1))
            .enumerate()
            .map(|(level, view)| {
                copy_bind_group(
                    device,
                    layout,
                    &format!("{label} mip source #{level}"),
                    view,
                    sampler,
                )
            })
            .collect();
        Self { views, bind_groups }
    }

    /// View of level 0 only, the render target that seeds the chain.
    pub fn base(&self) -> &wgpu::TextureView {
        &self.views[0]
    }

    /// Rebuilds every level below the base from the one above it.
    pub fn encode(&self, encoder: &mut wgpu::CommandEncoder, pipeline: &wgpu::RenderPipeline) {
        for (level, bind_group) in self.bind_groups.iter().enumerate() {
            encode_pass(
                encoder,
                "photometer mip pass",
                &self.views[level + 1],
                pipeline,
                bind_group,
            );
        }
    }

    pub fn levels(&self) -> usize {
        self.views.len()
    }
}

// Sampling a single-level view halfway between four texels averages them.
pub(crate) fn blit_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("photometer mip blit sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    })
}

pub(crate) fn copy_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    label: &str,
    view: &wgpu::TextureView,
    sampler: &wgpu::Sampler,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}

pub(crate) fn encode_pass(
    encoder: &mut wgpu::CommandEncoder,
    label: &str,
    target: &wgpu::TextureView,
    pipeline: &wgpu::RenderPipeline,
    bind_group: &wgpu::BindGroup,
) {
    let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: target,
            depth_slice: None,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        occlusion_query_set: None,
        timestamp_writes: None,
    });
    render_pass.set_pipeline(pipeline);
    render_pass.set_bind_group(0, bind_group, &[]);
    render_pass.draw(0..3, 0..1);
}
