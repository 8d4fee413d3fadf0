use crate::track::{
    Constraint, ExposureMode, MediaRange, TrackCapabilities, TrackError, TrackSettings,
};

/// Raw values closer than this (relative to their magnitude) are treated as equal.
const VALUE_TOLERANCE: f64 = 1e-9;

#[derive(Debug, thiserror::Error)]
pub enum NegotiationError {
    #[error("track did not report capabilities: {0}")]
    NoCapabilities(#[source] TrackError),
    #[error("incompatible camera: {0}")]
    IncompatibleDevice(&'static str),
    #[error("track did not report settings: {0}")]
    NoSettings(#[source] TrackError),
    #[error("invalid camera settings: {0}")]
    InvalidSettings(&'static str),
}

impl NegotiationError {
    pub fn code(&self) -> &'static str {
        match self {
            NegotiationError::NoCapabilities(_) => "NO_CAMERACAPABILITIES",
            NegotiationError::IncompatibleDevice(_) => "INVALID_CAMERACAPABILITIES",
            NegotiationError::NoSettings(_) => "NO_CAMERASETTINGS",
            NegotiationError::InvalidSettings(_) => "INVALID_CAMERASETTINGS",
        }
    }
}

/// The capability axis that carries exposure for a session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExposureAxis {
    /// Exposure compensation, in stops.
    Compensation(MediaRange),
    /// Exposure time, in device units.
    Time(MediaRange),
}

impl ExposureAxis {
    pub fn range(&self) -> MediaRange {
        match self {
            ExposureAxis::Compensation(range) | ExposureAxis::Time(range) => *range,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ExposureAxis::Compensation(_) => "exposureCompensation",
            ExposureAxis::Time(_) => "exposureTime",
        }
    }

    pub fn constraint(&self, raw: f64) -> Constraint {
        match self {
            ExposureAxis::Compensation(_) => Constraint::ExposureCompensation(raw),
            ExposureAxis::Time(_) => Constraint::ExposureTime(raw),
        }
    }

    /// Value on this axis from a raw settings report.
    pub fn read(&self, settings: &TrackSettings) -> Option<f64> {
        match self {
            ExposureAxis::Compensation(_) => settings.exposure_compensation,
            ExposureAxis::Time(_) => settings.exposure_time,
        }
    }

    /// Maps a normalized exposure onto the raw range and snaps it to the
    /// device step. NaN maps to the bottom of the range.
    pub fn to_raw(&self, normalized: f32) -> f64 {
        let range = self.range();
        let normalized = if normalized.is_nan() {
            0.0
        } else {
            f64::from(normalized.clamp(0.0, 1.0))
        };
        quantize(range.min + normalized * range.span(), &range)
    }

    /// Inverse of [`ExposureAxis::to_raw`] without quantization. `None` for a
    /// degenerate range.
    pub fn to_normalized(&self, raw: f64) -> Option<f32> {
        let range = self.range();
        if range.span() <= 0.0 {
            return None;
        }
        Some(((raw - range.min) / range.span()) as f32)
    }
}

/// Rounds `value` to the nearest multiple of the range step, keeping the
/// result inside `[min, max]`.
///
/// When rounding lands outside the range the neighbouring multiple on the
/// inside is used instead. A range without a positive step, or one that
/// contains no multiple of its step, only clamps.
pub fn quantize(value: f64, range: &MediaRange) -> f64 {
    let clamped = value.clamp(range.min, range.max);
    if range.step <= 0.0 || !range.step.is_finite() {
        return clamped;
    }

    let step = range.step;
    let mut snapped = step * (clamped / step).round();
    if snapped > range.max {
        snapped -= step;
    }
    if snapped < range.min {
        snapped += step;
    }
    if snapped < range.min || snapped > range.max {
        return clamped;
    }
    snapped
}

/// Capabilities resolved once per session.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraCapabilities {
    pub exposure_modes: Vec<ExposureMode>,
    pub axis: ExposureAxis,
}

impl CameraCapabilities {
    /// Requires manual exposure support and at least one exposure axis,
    /// preferring compensation over exposure time.
    pub fn negotiate(raw: &TrackCapabilities) -> Result<Self, NegotiationError> {
        if !raw.exposure_modes.contains(&ExposureMode::Manual) {
            return Err(NegotiationError::IncompatibleDevice(
                "manual exposure mode is not supported",
            ));
        }

        let axis = match (raw.exposure_compensation, raw.exposure_time) {
            (Some(range), _) => ExposureAxis::Compensation(range),
            (None, Some(range)) => ExposureAxis::Time(range),
            (None, None) => {
                return Err(NegotiationError::IncompatibleDevice(
                    "neither exposure compensation nor exposure time is reported",
                ))
            }
        };

        Ok(Self {
            exposure_modes: raw.exposure_modes.clone(),
            axis,
        })
    }

    pub fn supports(&self, mode: ExposureMode) -> bool {
        self.exposure_modes.contains(&mode)
    }
}

/// Settings snapshot projected onto the active exposure axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraSettings {
    pub mode: Option<ExposureMode>,
    pub exposure: Option<f64>,
}

impl CameraSettings {
    pub fn from_track(raw: &TrackSettings, axis: &ExposureAxis) -> Self {
        Self {
            mode: raw.exposure_mode,
            exposure: axis.read(raw),
        }
    }

    pub fn is_manual(&self) -> bool {
        self.mode == Some(ExposureMode::Manual)
    }

    /// Whether this snapshot already reflects `constraint`.
    pub fn satisfies(&self, constraint: &Constraint) -> bool {
        match constraint {
            Constraint::ExposureMode(mode) => self.mode == Some(*mode),
            Constraint::ExposureCompensation(value) | Constraint::ExposureTime(value) => self
                .exposure
                .is_some_and(|current| values_match(current, *value)),
        }
    }
}

fn values_match(a: f64, b: f64) -> bool {
    let scale = a.abs().max(b.abs()).max(1.0);
    (a - b).abs() <= VALUE_TOLERANCE * scale
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(
        modes: &[ExposureMode],
        compensation: Option<MediaRange>,
        time: Option<MediaRange>,
    ) -> TrackCapabilities {
        TrackCapabilities {
            exposure_modes: modes.to_vec(),
            exposure_compensation: compensation,
            exposure_time: time,
        }
    }

    #[test]
    fn prefers_compensation_over_time() {
        let raw = caps(
            &[ExposureMode::Manual, ExposureMode::Continuous],
            Some(MediaRange::new(-2.0, 2.0, 0.5)),
            Some(MediaRange::new(1.0, 1000.0, 1.0)),
        );
        let negotiated = CameraCapabilities::negotiate(&raw).unwrap();
        assert!(matches!(negotiated.axis, ExposureAxis::Compensation(_)));
        assert_eq!(negotiated.axis.name(), "exposureCompensation");
    }

    #[test]
    fn falls_back_to_exposure_time() {
        let raw = caps(
            &[ExposureMode::Manual],
            None,
            Some(MediaRange::new(1.0, 1000.0, 1.0)),
        );
        let negotiated = CameraCapabilities::negotiate(&raw).unwrap();
        assert_eq!(
            negotiated.axis,
            ExposureAxis::Time(MediaRange::new(1.0, 1000.0, 1.0))
        );
        assert!(!negotiated.supports(ExposureMode::Continuous));
    }

    #[test]
    fn requires_manual_mode() {
        let raw = caps(
            &[ExposureMode::Continuous],
            Some(MediaRange::new(-2.0, 2.0, 0.5)),
            None,
        );
        let err = CameraCapabilities::negotiate(&raw).unwrap_err();
        assert!(matches!(err, NegotiationError::IncompatibleDevice(_)));
        assert_eq!(err.code(), "INVALID_CAMERACAPABILITIES");
    }

    #[test]
    fn requires_an_exposure_axis() {
        let raw = caps(&[ExposureMode::Manual], None, None);
        let err = CameraCapabilities::negotiate(&raw).unwrap_err();
        assert_eq!(err.code(), "INVALID_CAMERACAPABILITIES");
    }

    #[test]
    fn quantizes_to_nearest_step() {
        let axis = ExposureAxis::Compensation(MediaRange::new(-2.0, 2.0, 0.5));
        // -2 + 0.6 * 4 = 0.4, nearest multiple of 0.5 is 0.5
        assert_eq!(axis.to_raw(0.6), 0.5);
        assert_eq!(axis.to_raw(0.0), -2.0);
        assert_eq!(axis.to_raw(1.0), 2.0);
        // 0.55 -> -2 + 2.2 = 0.2, rounds down to 0.0
        assert_eq!(axis.to_raw(0.55), 0.0);
    }

    #[test]
    fn non_finite_input_stays_in_range() {
        let axis = ExposureAxis::Compensation(MediaRange::new(-2.0, 2.0, 0.5));
        assert_eq!(axis.to_raw(f32::NAN), -2.0);
        assert_eq!(axis.to_raw(f32::INFINITY), 2.0);
        assert_eq!(axis.to_raw(f32::NEG_INFINITY), -2.0);
    }

    #[test]
    fn quantized_values_are_step_multiples_within_range() {
        let ranges = [
            MediaRange::new(-2.0, 2.0, 0.5),
            MediaRange::new(-3.0, 3.0, 1.0 / 3.0),
            MediaRange::new(0.3, 10.7, 0.5),
            MediaRange::new(1.0, 1250.0, 3.0),
        ];
        for range in ranges {
            let axis = ExposureAxis::Time(range);
            for i in 0..=200 {
                let normalized = i as f32 / 200.0;
                let raw = axis.to_raw(normalized);
                assert!(
                    raw >= range.min - 1e-9 && raw <= range.max + 1e-9,
                    "{raw} outside {range:?}"
                );
                let steps = raw / range.step;
                assert!(
                    (steps - steps.round()).abs() < 1e-6,
                    "{raw} is not a multiple of {}",
                    range.step
                );
            }
        }
    }

    #[test]
    fn zero_step_only_clamps() {
        let range = MediaRange::new(0.0, 10.0, 0.0);
        assert_eq!(quantize(3.3, &range), 3.3);
        assert_eq!(quantize(12.0, &range), 10.0);
    }

    #[test]
    fn normalizes_raw_values() {
        let axis = ExposureAxis::Compensation(MediaRange::new(-2.0, 2.0, 0.5));
        assert_eq!(axis.to_normalized(0.0), Some(0.5));
        let flat = ExposureAxis::Compensation(MediaRange::new(1.0, 1.0, 0.5));
        assert_eq!(flat.to_normalized(1.0), None);
    }

    #[test]
    fn settings_match_constraints() {
        let settings = CameraSettings {
            mode: Some(ExposureMode::Manual),
            exposure: Some(0.5),
        };
        assert!(settings.is_manual());
        assert!(settings.satisfies(&Constraint::ExposureMode(ExposureMode::Manual)));
        assert!(settings.satisfies(&Constraint::ExposureCompensation(0.5)));
        assert!(!settings.satisfies(&Constraint::ExposureCompensation(1.0)));
        assert!(!settings.satisfies(&Constraint::ExposureMode(ExposureMode::Continuous)));
    }
}
