use camera::CameraError;

/// Lower bound of the normalized exposure estimate.
pub const MIN_EXPOSURE: f32 = 0.01;
/// Upper bound of the normalized exposure estimate.
pub const MAX_EXPOSURE: f32 = 1.0;
/// Estimate used whenever the camera runs in automatic mode.
pub const NEUTRAL_EXPOSURE: f32 = 0.2;

pub fn clamp_exposure(normalized: f32) -> f32 {
    if normalized.is_nan() {
        return NEUTRAL_EXPOSURE;
    }
    normalized.clamp(MIN_EXPOSURE, MAX_EXPOSURE)
}

/// Brightness goal of one control cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdjustTarget {
    /// Target mean brightness in `[0, 1]`.
    pub brightness: f32,
    /// Half-width of the band around `brightness` that counts as settled.
    pub epsilon: f32,
    /// Fraction of the brightness error folded into each correction.
    pub relaxation: f32,
}

impl AdjustTarget {
    pub fn new(brightness: f32, epsilon: f32, relaxation: f32) -> Self {
        Self {
            brightness,
            epsilon,
            relaxation,
        }
    }
}

impl Default for AdjustTarget {
    fn default() -> Self {
        Self::new(0.5, 0.05, 0.1)
    }
}

/// Result of one [`crate::ExposureController::adjust`] call.
#[derive(Debug)]
pub enum AdjustOutcome {
    /// Brightness was already within `epsilon`; the camera was left alone.
    Settled { brightness: f32 },
    /// A correction was committed and confirmed by the camera.
    Adjusting { brightness: f32, exposure: f32 },
    /// A correction was attempted but the camera refused or ignored it.
    Rejected {
        brightness: f32,
        exposure: f32,
        error: CameraError,
    },
}

impl AdjustOutcome {
    pub fn is_settled(&self) -> bool {
        matches!(self, AdjustOutcome::Settled { .. })
    }

    pub fn brightness(&self) -> f32 {
        match self {
            AdjustOutcome::Settled { brightness }
            | AdjustOutcome::Adjusting { brightness, .. }
            | AdjustOutcome::Rejected { brightness, .. } => *brightness,
        }
    }
}
