use crate::compile::{compile_fragment_shader, compile_vertex_shader, VertexProgram};

use super::WORKING_FORMAT;

/// Bind group layouts shared by every pass of a measurement.
pub(crate) struct SamplerLayouts {
    /// texture + sampler + crop area uniform.
    pub crop: wgpu::BindGroupLayout,
    /// texture + sampler.
    pub copy: wgpu::BindGroupLayout,
}

impl SamplerLayouts {
    pub fn new(device: &wgpu::Device) -> Self {
        let crop = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("photometer crop layout"),
            entries: &[
                texture_entry(0),
                sampler_entry(1),
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });
        Self {
            crop,
            copy: copy_layout(device),
        }
    }
}

/// Layout of the copy program: texture + sampler.
pub(crate) fn copy_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("photometer copy layout"),
        entries: &[texture_entry(0), sampler_entry(1)],
    })
}

/// Copy program on its own, for textures that only need a mip chain built.
pub(crate) fn copy_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let fragment = compile_fragment_shader(device);
    let vertex = compile_vertex_shader(device, VertexProgram::Copy);
    build_pipeline(device, "photometer copy pipeline", layout, &vertex, &fragment)
}

/// The two programs of the sampler, compiled for [`WORKING_FORMAT`] targets.
pub(crate) struct SamplerPipelines {
    pub crop: wgpu::RenderPipeline,
    pub copy: wgpu::RenderPipeline,
}

impl SamplerPipelines {
    pub fn new(device: &wgpu::Device, layouts: &SamplerLayouts) -> Self {
        let fragment = compile_fragment_shader(device);
        let crop_vertex = compile_vertex_shader(device, VertexProgram::Crop);
        let copy_vertex = compile_vertex_shader(device, VertexProgram::Copy);

        let crop = build_pipeline(
            device,
            "photometer crop pipeline",
            &layouts.crop,
            &crop_vertex,
            &fragment,
        );
        let copy = build_pipeline(
            device,
            "photometer copy pipeline",
            &layouts.copy,
            &copy_vertex,
            &fragment,
        );
        Self { crop, copy }
    }
}

fn build_pipeline(
    device: &wgpu::Device,
    label: &str,
    bind_group_layout: &wgpu::BindGroupLayout,
    vertex_module: &wgpu::ShaderModule,
    fragment_module: &wgpu::ShaderModule,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: &[bind_group_layout],
        push_constant_ranges: &[],
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: vertex_module,
            entry_point: Some("main"),
            buffers: &[],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: fragment_module,
            entry_point: Some("main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: WORKING_FORMAT,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        multiview: None,
        cache: None,
    })
}

fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn sampler_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}
