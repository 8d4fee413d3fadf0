use std::cell::RefCell;

use crate::capabilities::{CameraCapabilities, CameraSettings, NegotiationError};
use crate::track::{Constraint, ExposureMode, TrackError, VideoTrack};

#[derive(Debug, thiserror::Error)]
pub enum CameraError {
    #[error("camera rejected {constraint}: {source}")]
    ConstraintRejected {
        constraint: Constraint,
        #[source]
        source: TrackError,
    },
    #[error("camera accepted {0} but did not apply it")]
    ConstraintIgnored(Constraint),
    #[error("exposure mode '{0}' is not supported by the camera")]
    UnsupportedMode(ExposureMode),
    #[error("exposure can only be set in manual mode")]
    NotManual,
    #[error("normalized exposure {0} is not a finite number")]
    InvalidExposure(f32),
    #[error("failed to refresh camera settings: {0}")]
    Track(#[from] TrackError),
}

/// Requested exposure mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeTarget {
    Auto,
    Manual,
}

impl ModeTarget {
    pub fn exposure_mode(self) -> ExposureMode {
        match self {
            ModeTarget::Auto => ExposureMode::Continuous,
            ModeTarget::Manual => ExposureMode::Manual,
        }
    }
}

/// Bridges normalized exposure to one camera track.
///
/// The capability set and active axis are fixed at construction. The
/// settings snapshot is refreshed after every constraint application and is
/// what every query reads.
pub struct Negotiator<T> {
    track: T,
    capabilities: CameraCapabilities,
    settings: RefCell<CameraSettings>,
}

impl<T: VideoTrack> Negotiator<T> {
    pub fn negotiate(track: T) -> Result<Self, NegotiationError> {
        let raw_capabilities = track
            .capabilities()
            .map_err(NegotiationError::NoCapabilities)?;
        let capabilities = CameraCapabilities::negotiate(&raw_capabilities)?;
        tracing::debug!(
            modes = ?capabilities.exposure_modes,
            axis = capabilities.axis.name(),
            range = ?capabilities.axis.range(),
            "negotiated camera capabilities"
        );

        let raw_settings = track.settings().map_err(NegotiationError::NoSettings)?;
        let settings = CameraSettings::from_track(&raw_settings, &capabilities.axis);
        if settings.mode.is_none() {
            return Err(NegotiationError::InvalidSettings(
                "exposure mode is not reported",
            ));
        }
        if settings.exposure.is_none() {
            return Err(NegotiationError::InvalidSettings(
                "no value is reported on the active exposure axis",
            ));
        }

        Ok(Self {
            track,
            capabilities,
            settings: RefCell::new(settings),
        })
    }

    pub fn capabilities(&self) -> &CameraCapabilities {
        &self.capabilities
    }

    pub fn settings(&self) -> CameraSettings {
        *self.settings.borrow()
    }

    /// `(min, max)` of the active exposure axis.
    pub fn exposure_range(&self) -> (f64, f64) {
        let range = self.capabilities.axis.range();
        (range.min, range.max)
    }

    pub fn is_manual_mode(&self) -> bool {
        self.settings.borrow().is_manual()
    }

    /// Current raw exposure mapped back to `[0, 1]`, if known.
    pub fn current_normalized(&self) -> Option<f32> {
        let exposure = self.settings.borrow().exposure?;
        self.capabilities.axis.to_normalized(exposure)
    }

    /// Switches the exposure mode and reports whether the device now runs in
    /// the requested mode.
    pub async fn set_mode(&self, target: ModeTarget) -> Result<(), CameraError> {
        let mode = target.exposure_mode();
        if !self.capabilities.supports(mode) {
            return Err(CameraError::UnsupportedMode(mode));
        }
        self.apply(Constraint::ExposureMode(mode)).await
    }

    /// Applies a normalized exposure and returns the quantized raw value that
    /// is now in effect.
    pub async fn set_exposure(&self, normalized: f32) -> Result<f64, CameraError> {
        if !normalized.is_finite() {
            return Err(CameraError::InvalidExposure(normalized));
        }
        if !self.is_manual_mode() {
            tracing::warn!(
                normalized,
                "cannot set exposure while the camera is not in manual mode"
            );
            return Err(CameraError::NotManual);
        }

        let axis = self.capabilities.axis;
        let raw = axis.to_raw(normalized);
        self.apply(axis.constraint(raw)).await?;
        Ok(raw)
    }

    async fn apply(&self, constraint: Constraint) -> Result<(), CameraError> {
        if self.settings.borrow().satisfies(&constraint) {
            tracing::trace!(%constraint, "constraint already in effect");
            return Ok(());
        }

        tracing::debug!(%constraint, "applying camera constraint");
        let applied = self.track.apply_constraint(constraint).await;
        let refreshed = self.refresh_settings();

        if let Err(source) = applied {
            tracing::warn!(%constraint, error = %source, "camera rejected constraint");
            if let Err(error) = refreshed {
                tracing::warn!(%error, "failed to refresh camera settings after rejection");
            }
            return Err(CameraError::ConstraintRejected { constraint, source });
        }
        refreshed?;

        if !self.settings.borrow().satisfies(&constraint) {
            tracing::warn!(
                %constraint,
                settings = ?self.settings(),
                "camera ignored constraint"
            );
            return Err(CameraError::ConstraintIgnored(constraint));
        }
        Ok(())
    }

    fn refresh_settings(&self) -> Result<(), TrackError> {
        let raw = self.track.settings()?;
        *self.settings.borrow_mut() = CameraSettings::from_track(&raw, &self.capabilities.axis);
        Ok(())
    }
}
