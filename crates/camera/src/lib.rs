//! Camera capability negotiation.
//!
//! The device side is described by [`MediaSource`] and [`VideoTrack`], a thin
//! mirror of a capture track's capability/settings introspection plus its
//! asynchronous constraint primitive. [`Negotiator`] sits on top: it picks
//! the exposure axis once per session, keeps the settings snapshot current
//! and converts normalized exposure into quantized raw constraints.

mod capabilities;
mod negotiator;
mod track;

pub use capabilities::{
    quantize, CameraCapabilities, CameraSettings, ExposureAxis, NegotiationError,
};
pub use negotiator::{CameraError, ModeTarget, Negotiator};
pub use track::{
    Constraint, ExposureMode, MediaRange, MediaSource, TrackCapabilities, TrackError,
    TrackSettings, TrackState, VideoTrack,
};
