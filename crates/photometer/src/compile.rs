use std::borrow::Cow;

use wgpu::naga::ShaderStage;

/// Vertex programs used by the sampler. Both draw the same oversized
/// full-viewport triangle and differ only in how they derive texture UVs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum VertexProgram {
    /// Offsets and scales UVs by the crop area uniform.
    Crop,
    /// Maps the viewport straight onto the source texture.
    Copy,
}

impl VertexProgram {
    fn source(self) -> &'static str {
        match self {
            VertexProgram::Crop => CROP_VERTEX_GLSL,
            VertexProgram::Copy => COPY_VERTEX_GLSL,
        }
    }

    fn label(self) -> &'static str {
        match self {
            VertexProgram::Crop => "photometer crop vertex",
            VertexProgram::Copy => "photometer copy vertex",
        }
    }
}

pub(crate) fn compile_vertex_shader(
    device: &wgpu::Device,
    program: VertexProgram,
) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(program.label()),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(program.source()),
            stage: ShaderStage::Vertex,
            defines: &[],
        },
    })
}

/// Shared by both programs: sample the bound texture at the interpolated UV.
pub(crate) fn compile_fragment_shader(device: &wgpu::Device) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("photometer copy fragment"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(COPY_FRAGMENT_GLSL),
            stage: ShaderStage::Fragment,
            defines: &[],
        },
    })
}

/// Crop program vertex stage.
///
/// The crop area packs the region centre in `xy` and its extent in `zw`, so a
/// viewport corner at `pos` samples the frame point `centre + pos * extent`
/// in `[-1, 1]` frame coordinates. The V axis is flipped because the region's
/// `y` grows upwards while texture rows grow downwards.
const CROP_VERTEX_GLSL: &str = r"#version 450
layout(location = 0) out vec2 v_uv;

layout(std140, set = 0, binding = 2) uniform CropArea {
    vec4 area;
} crop;

const vec2 positions[3] = vec2[3](
    vec2(-1.0, -1.0),
    vec2(3.0, -1.0),
    vec2(-1.0, 3.0)
);

void main() {
    vec2 pos = positions[uint(gl_VertexIndex)];
    vec2 frame = crop.area.xy + pos * crop.area.zw;
    v_uv = vec2(0.5 + 0.5 * frame.x, 0.5 - 0.5 * frame.y);
    gl_Position = vec4(pos, 0.0, 1.0);
}
";

const COPY_VERTEX_GLSL: &str = r"#version 450
layout(location = 0) out vec2 v_uv;

const vec2 positions[3] = vec2[3](
    vec2(-1.0, -1.0),
    vec2(3.0, -1.0),
    vec2(-1.0, 3.0)
);

void main() {
    vec2 pos = positions[uint(gl_VertexIndex)];
    v_uv = vec2(0.5 + 0.5 * pos.x, 0.5 - 0.5 * pos.y);
    gl_Position = vec4(pos, 0.0, 1.0);
}
";

const COPY_FRAGMENT_GLSL: &str = r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 out_color;

layout(set = 0, binding = 0) uniform texture2D source_texture;
layout(set = 0, binding = 1) uniform sampler source_sampler;

void main() {
    out_color = texture(sampler2D(source_texture, source_sampler), v_uv);
}
";
