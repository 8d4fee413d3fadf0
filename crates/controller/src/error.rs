use camera::{CameraError, NegotiationError};
use photometer::PhotometerError;

/// Reasons a session could not be started. The controller is back in
/// `NotLoaded` after any of them except `AlreadyInitialized`.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("the media source does not expose the image capture API")]
    ImageCaptureUnavailable,
    #[error("the controller is already initialized")]
    AlreadyInitialized,
    #[error("the media source has no video track")]
    NoVideoTrack,
    #[error("the video track is not live")]
    InvalidVideoTrack,
    #[error(transparent)]
    Negotiation(#[from] NegotiationError),
    #[error("failed to set up the photometer: {0}")]
    Photometer(#[from] PhotometerError),
}

impl InitError {
    /// Stable string code for callers that report failures by name.
    pub fn code(&self) -> &'static str {
        match self {
            InitError::ImageCaptureUnavailable => "IMAGECAPTUREAPI_NOTFOUND",
            InitError::AlreadyInitialized => "ALREADY_INITIALIZED",
            InitError::NoVideoTrack => "NO_VIDEOTRACK",
            InitError::InvalidVideoTrack => "INVALID_VIDEOTRACK",
            InitError::Negotiation(err) => err.code(),
            InitError::Photometer(_) => "GPU_SETUP_FAILED",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error("the controller is not ready for this operation")]
    NotReady,
    #[error(transparent)]
    Camera(#[from] CameraError),
    #[error("failed to measure frame brightness: {0}")]
    Measurement(#[from] PhotometerError),
}
