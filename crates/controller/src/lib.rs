//! Closed-loop exposure control.
//!
//! [`ExposureController`] ties a [`photometer::Photometer`] to a
//! [`camera::Negotiator`]: every [`ExposureController::adjust`] call measures
//! one frame, compares it with the target brightness and commits at most one
//! damped correction to the camera. Retry cadence belongs to the caller.

mod controller;
mod error;
mod outcome;

pub use controller::{ControllerState, ExposureController};
pub use error::{ControlError, InitError};
pub use outcome::{
    clamp_exposure, AdjustOutcome, AdjustTarget, MAX_EXPOSURE, MIN_EXPOSURE, NEUTRAL_EXPOSURE,
};
