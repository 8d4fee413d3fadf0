use crate::PhotometerError;

/// Side of the square crop texture used when the caller does not pick one.
pub const DEFAULT_SUBSAMPLE_SIZE: u32 = 16;

/// Rectangle of the frame over which brightness is measured.
///
/// `x`/`y` locate the centre in `[-1, 1]` (left to right, bottom to top) and
/// `w`/`h` give the extent as a fraction of the full frame in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SampleRegion {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl SampleRegion {
    /// The whole frame.
    pub const FULL: Self = Self {
        x: 0.0,
        y: 0.0,
        w: 1.0,
        h: 1.0,
    };

    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// A region of the given extent centred on the frame.
    pub fn centered(w: f32, h: f32) -> Self {
        Self::new(0.0, 0.0, w, h)
    }

    pub fn is_valid(&self) -> bool {
        let centre_ok = (-1.0..=1.0).contains(&self.x) && (-1.0..=1.0).contains(&self.y);
        let extent_ok = self.w > 0.0 && self.w <= 1.0 && self.h > 0.0 && self.h <= 1.0;
        centre_ok && extent_ok
    }

    /// Packs the region the way the crop vertex program expects it.
    pub(crate) fn crop_area(&self) -> [f32; 4] {
        [self.x, self.y, self.w, self.h]
    }
}

impl Default for SampleRegion {
    fn default() -> Self {
        Self::FULL
    }
}

/// Adapter power preference for the headless context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GpuPowerPreference {
    #[default]
    Low,
    High,
}

pub fn validate_subsample_size(size: u32) -> Result<u32, PhotometerError> {
    if size == 0 || !size.is_power_of_two() {
        return Err(PhotometerError::InvalidSubsampleSize(size));
    }
    Ok(size)
}

/// Number of mip levels in a full chain for a texture whose larger side is
/// `size` texels.
pub fn mip_level_count(size: u32) -> u32 {
    size.max(1).ilog2() + 1
}

/// Mean of the colour channels of an RGBA8 pixel; alpha is ignored.
pub fn brightness_from_rgba(pixel: [u8; 4]) -> f32 {
    let sum = u32::from(pixel[0]) + u32::from(pixel[1]) + u32::from(pixel[2]);
    sum as f32 / (255.0 * 3.0)
}
