//! GPU photometry for the exposure controller.
//!
//! Turns a video frame that already lives on the GPU into one brightness
//! scalar while moving only four bytes back to the CPU:
//!
//! ```text
//!   frame texture ──crop pass──▶ N×N crop texture (mip 0)
//!                                    │ blit chain (copy program)
//!                                    ▼
//!                              mip 1 … mip log2(N) (1×1)
//!                                    │ copy program, 1×1 viewport
//!                                    ▼
//!                              1×1 readback target ──▶ 4 bytes ──▶ mean(R,G,B)
//! ```
//!
//! The reduction cost only depends on the subsample size, never on the
//! resolution of the incoming frame. [`GpuPhotometer`] owns every GPU object
//! involved; callers only hand it a texture view and a [`SampleRegion`].

mod compile;
mod gpu;
mod types;

pub use gpu::{FrameTexture, GpuContext, GpuPhotometer};
pub use types::{
    brightness_from_rgba, mip_level_count, validate_subsample_size, GpuPowerPreference,
    SampleRegion, DEFAULT_SUBSAMPLE_SIZE,
};

/// Errors raised while building or using the photometric sampler.
#[derive(Debug, thiserror::Error)]
pub enum PhotometerError {
    #[error("subsample size {0} must be a non-zero power of two")]
    InvalidSubsampleSize(u32),
    #[error("subsample size {size} exceeds the GPU max texture dimension {max}")]
    TextureTooLarge { size: u32, max: u32 },
    #[error("failed to create GPU resources: {0}")]
    Setup(String),
    #[error("failed to read back the averaged pixel: {0}")]
    Readback(String),
}

/// Measures the mean brightness of a region of a frame.
///
/// Implementations are not reentrant: the controller guarantees a single
/// measurement in flight per session.
pub trait Photometer {
    /// Handle to the frame being measured (a texture view for the GPU sampler).
    type Frame: ?Sized;

    /// Returns the mean of the R, G and B channels over `region`, in `[0, 1]`.
    ///
    /// GPU frames must be sampled through a view that carries the frame's
    /// full mip chain; without it only a sparse subset of the frame's pixels
    /// contributes.
    fn measure(&self, frame: &Self::Frame, region: SampleRegion) -> Result<f32, PhotometerError>;
}
