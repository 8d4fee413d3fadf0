//! wgpu side of the photometer.
//!
//! - `context` creates a headless instance/adapter/device for callers that do
//!   not already own one.
//! - `pipeline` builds the bind group layouts and the two render pipelines
//!   (crop and copy) from the GLSL programs in `compile`.
//! - `uniforms` mirrors the crop area uniform block.
//! - `mips` downsamples a texture level by level with the copy program.
//! - `sampler` owns the crop texture, its mip chain, the 1×1 readback target
//!   and drives one measurement per call.
//! - `frame` uploads CPU frames into a mipmapped texture.

mod context;
mod frame;
mod mips;
mod pipeline;
mod sampler;
mod uniforms;

pub use context::GpuContext;
pub use frame::FrameTexture;
pub use sampler::GpuPhotometer;

/// Format shared by the frame, the crop chain and the readback target.
pub(crate) const WORKING_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
