use std::fmt;
use std::future::Future;
use std::str::FromStr;

/// Exposure modes a capture track may report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExposureMode {
    None,
    Manual,
    SingleShot,
    Continuous,
}

impl ExposureMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExposureMode::None => "none",
            ExposureMode::Manual => "manual",
            ExposureMode::SingleShot => "single-shot",
            ExposureMode::Continuous => "continuous",
        }
    }
}

impl fmt::Display for ExposureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExposureMode {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(ExposureMode::None),
            "manual" => Ok(ExposureMode::Manual),
            "single-shot" | "singleshot" => Ok(ExposureMode::SingleShot),
            "continuous" | "auto" => Ok(ExposureMode::Continuous),
            other => Err(format!("unknown exposure mode '{other}'")),
        }
    }
}

/// Numeric capability range as reported by the device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaRange {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl MediaRange {
    pub fn new(min: f64, max: f64, step: f64) -> Self {
        Self { min, max, step }
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }
}

/// Raw capability report of a track. Axes the device does not expose are `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackCapabilities {
    pub exposure_modes: Vec<ExposureMode>,
    pub exposure_compensation: Option<MediaRange>,
    pub exposure_time: Option<MediaRange>,
}

/// Raw settings report of a track.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackSettings {
    pub exposure_mode: Option<ExposureMode>,
    pub exposure_compensation: Option<f64>,
    pub exposure_time: Option<f64>,
}

/// One advanced constraint applied to a track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Constraint {
    ExposureMode(ExposureMode),
    ExposureCompensation(f64),
    ExposureTime(f64),
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::ExposureMode(mode) => write!(f, "exposureMode={mode}"),
            Constraint::ExposureCompensation(value) => write!(f, "exposureCompensation={value}"),
            Constraint::ExposureTime(value) => write!(f, "exposureTime={value}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackState {
    Live,
    Ended,
}

/// Failure reported by the track primitives themselves.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TrackError {
    #[error("track has ended")]
    Ended,
    #[error("{0}")]
    Device(String),
}

/// A live video track able to introspect and constrain its camera.
///
/// Constraint application is asynchronous and may complete without the
/// device honouring the request; callers must re-read [`VideoTrack::settings`]
/// to learn what is actually in effect.
pub trait VideoTrack {
    fn ready_state(&self) -> TrackState;

    fn capabilities(&self) -> Result<TrackCapabilities, TrackError>;

    fn settings(&self) -> Result<TrackSettings, TrackError>;

    fn apply_constraint(
        &self,
        constraint: Constraint,
    ) -> impl Future<Output = Result<(), TrackError>>;
}

/// Something bound to a media stream, e.g. a video element.
pub trait MediaSource {
    type Track: VideoTrack;

    /// Whether the platform exposes the image-capture API needed to drive
    /// camera settings at all.
    fn supports_image_capture(&self) -> bool;

    /// The first video track of the bound stream, if any.
    fn video_track(&self) -> Option<Self::Track>;
}
