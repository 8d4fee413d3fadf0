use std::cell::{Cell, OnceCell};

use camera::{
    CameraError, ExposureMode, MediaSource, ModeTarget, Negotiator, TrackState, VideoTrack,
};
use photometer::{Photometer, PhotometerError, SampleRegion, DEFAULT_SUBSAMPLE_SIZE};

use crate::error::{ControlError, InitError};
use crate::outcome::{clamp_exposure, AdjustOutcome, AdjustTarget, NEUTRAL_EXPOSURE};

/// Lifecycle of an [`ExposureController`].
///
/// `NotLoaded → Loading → Idle ⇄ Busy`. A failed initialization drops back to
/// `NotLoaded`; failures are reported through [`InitError`] codes instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    NotLoaded,
    Loading,
    Idle,
    Busy,
    /// Part of the published state set; no operation of the controller moves
    /// into it.
    Error,
}

struct Session<P, T> {
    photometer: P,
    camera: Negotiator<T>,
}

/// One exposure control session.
///
/// All methods take `&self`: the controller is meant to be driven from a
/// single thread where an in-flight `adjust` may be suspended on the camera
/// while other calls come in. The `Busy` state makes overlapping `adjust`
/// calls fail fast instead of queueing.
pub struct ExposureController<P, T> {
    state: Cell<ControllerState>,
    normalized: Cell<f32>,
    session: OnceCell<Session<P, T>>,
}

impl<P, T> Default for ExposureController<P, T>
where
    P: Photometer,
    T: VideoTrack,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<P, T> ExposureController<P, T>
where
    P: Photometer,
    T: VideoTrack,
{
    pub fn new() -> Self {
        Self {
            state: Cell::new(ControllerState::NotLoaded),
            normalized: Cell::new(NEUTRAL_EXPOSURE),
            session: OnceCell::new(),
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state.get()
    }

    /// Current normalized exposure estimate, always within
    /// `[MIN_EXPOSURE, MAX_EXPOSURE]`.
    pub fn normalized_exposure(&self) -> f32 {
        self.normalized.get()
    }

    /// Camera side of the session, once initialized.
    pub fn camera(&self) -> Option<&Negotiator<T>> {
        self.session.get().map(|session| &session.camera)
    }

    pub fn photometer(&self) -> Option<&P> {
        self.session.get().map(|session| &session.photometer)
    }

    /// Whether `source` can be driven at all.
    pub fn is_compatible<M>(source: &M) -> bool
    where
        M: MediaSource<Track = T>,
    {
        source.supports_image_capture()
    }

    /// Starts the session: negotiates the camera of `source`, then builds the
    /// photometer with `subsample_size` (default 16) through `build_photometer`.
    ///
    /// The photometer is only built once every camera check has passed.
    pub fn init<M, F>(
        &self,
        source: &M,
        build_photometer: F,
        subsample_size: Option<u32>,
    ) -> Result<(), InitError>
    where
        M: MediaSource<Track = T>,
        F: FnOnce(u32) -> Result<P, PhotometerError>,
    {
        if !Self::is_compatible(source) {
            return Err(InitError::ImageCaptureUnavailable);
        }
        if self.state.get() != ControllerState::NotLoaded {
            return Err(InitError::AlreadyInitialized);
        }

        self.state.set(ControllerState::Loading);
        match self.load(source, build_photometer, subsample_size) {
            Ok(session) => {
                let estimate = initial_estimate(&session.camera);
                if self.session.set(session).is_err() {
                    self.state.set(ControllerState::NotLoaded);
                    return Err(InitError::AlreadyInitialized);
                }
                self.normalized.set(estimate);
                self.state.set(ControllerState::Idle);
                tracing::debug!(normalized = estimate, "exposure controller ready");
                Ok(())
            }
            Err(err) => {
                tracing::debug!(code = err.code(), error = %err, "exposure controller init failed");
                self.state.set(ControllerState::NotLoaded);
                Err(err)
            }
        }
    }

    fn load<M, F>(
        &self,
        source: &M,
        build_photometer: F,
        subsample_size: Option<u32>,
    ) -> Result<Session<P, T>, InitError>
    where
        M: MediaSource<Track = T>,
        F: FnOnce(u32) -> Result<P, PhotometerError>,
    {
        let track = source.video_track().ok_or(InitError::NoVideoTrack)?;
        if track.ready_state() != TrackState::Live {
            return Err(InitError::InvalidVideoTrack);
        }
        let camera = Negotiator::negotiate(track)?;
        let photometer = build_photometer(subsample_size.unwrap_or(DEFAULT_SUBSAMPLE_SIZE))?;
        Ok(Session { photometer, camera })
    }

    /// Runs one control cycle over `region` of `frame`.
    ///
    /// Settles without touching the camera when the measured brightness is
    /// within `target.epsilon`. Otherwise moves the exposure estimate by
    /// `error * target.relaxation` and commits it, switching the camera to
    /// manual mode first if needed.
    pub async fn adjust(
        &self,
        frame: &P::Frame,
        region: SampleRegion,
        target: &AdjustTarget,
    ) -> Result<AdjustOutcome, ControlError> {
        if self.state.get() != ControllerState::Idle {
            return Err(ControlError::NotReady);
        }
        let session = self.session.get().ok_or(ControlError::NotReady)?;
        let _busy = BusyGuard::enter(&self.state);

        let brightness = session.photometer.measure(frame, region)?;
        let error = brightness - target.brightness;
        tracing::debug!(
            brightness,
            target = target.brightness,
            error,
            "measured frame brightness"
        );
        if error.abs() < target.epsilon {
            return Ok(AdjustOutcome::Settled { brightness });
        }

        let exposure = clamp_exposure(self.normalized.get() - error * target.relaxation);
        self.normalized.set(exposure);

        match commit_manual_exposure(&session.camera, exposure).await {
            Ok(_) => Ok(AdjustOutcome::Adjusting {
                brightness,
                exposure,
            }),
            Err(error) => Ok(AdjustOutcome::Rejected {
                brightness,
                exposure,
                error,
            }),
        }
    }

    /// [`ExposureController::adjust`] over the whole frame.
    pub async fn adjust_full(
        &self,
        frame: &P::Frame,
        target: &AdjustTarget,
    ) -> Result<AdjustOutcome, ControlError> {
        self.adjust(frame, SampleRegion::FULL, target).await
    }

    /// Hands exposure back to the camera's continuous mode.
    pub async fn toggle_auto(&self) -> Result<(), ControlError> {
        let session = self.loaded_session()?;
        if session.camera.capabilities().supports(ExposureMode::Continuous) {
            self.normalized.set(NEUTRAL_EXPOSURE);
        }
        session.camera.set_mode(ModeTarget::Auto).await?;
        Ok(())
    }

    /// Applies `normalized` (clamped) as a manual exposure and returns the raw
    /// value now in effect. The mode switch, when needed, must be confirmed
    /// before the exposure value is sent.
    pub async fn set_manual_exposure(&self, normalized: f32) -> Result<f64, ControlError> {
        let session = self.loaded_session()?;
        let normalized = clamp_exposure(normalized);
        let raw = commit_manual_exposure(&session.camera, normalized).await?;
        self.normalized.set(normalized);
        Ok(raw)
    }

    fn loaded_session(&self) -> Result<&Session<P, T>, ControlError> {
        match self.state.get() {
            ControllerState::Idle | ControllerState::Busy => {
                self.session.get().ok_or(ControlError::NotReady)
            }
            _ => Err(ControlError::NotReady),
        }
    }
}

async fn commit_manual_exposure<T: VideoTrack>(
    camera: &Negotiator<T>,
    normalized: f32,
) -> Result<f64, CameraError> {
    if !camera.is_manual_mode() {
        camera.set_mode(ModeTarget::Manual).await?;
    }
    camera.set_exposure(normalized).await
}

fn initial_estimate<T: VideoTrack>(camera: &Negotiator<T>) -> f32 {
    if !camera.is_manual_mode() {
        return NEUTRAL_EXPOSURE;
    }
    camera
        .current_normalized()
        .map(clamp_exposure)
        .unwrap_or(NEUTRAL_EXPOSURE)
}

/// Holds the controller in `Busy` and releases it to `Idle` when dropped,
/// including when the `adjust` future is dropped mid-flight.
struct BusyGuard<'a> {
    state: &'a Cell<ControllerState>,
}

impl<'a> BusyGuard<'a> {
    fn enter(state: &'a Cell<ControllerState>) -> Self {
        state.set(ControllerState::Busy);
        Self { state }
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.state.set(ControllerState::Idle);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::future::Future;
    use std::pin::{pin, Pin};
    use std::rc::Rc;
    use std::task::{Context, Poll, Waker};

    use camera::{Constraint, MediaRange, TrackCapabilities, TrackError, TrackSettings};

    use super::*;
    use crate::outcome::{MAX_EXPOSURE, MIN_EXPOSURE};

    /// Resolves on the second poll.
    struct YieldOnce<T> {
        value: Option<T>,
        yielded: bool,
    }

    impl<T: Unpin> Future for YieldOnce<T> {
        type Output = T;

        fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
            if !self.yielded {
                self.yielded = true;
                cx.waker().wake_by_ref();
                return Poll::Pending;
            }
            match self.value.take() {
                Some(value) => Poll::Ready(value),
                None => panic!("polled after completion"),
            }
        }
    }

    struct StubTrack {
        state: TrackState,
        capabilities: Option<TrackCapabilities>,
        settings: RefCell<TrackSettings>,
        settings_available: bool,
        ignore_mode: bool,
        reject: bool,
        yielding: bool,
        applied: RefCell<Vec<Constraint>>,
    }

    impl StubTrack {
        fn new(mode: ExposureMode, compensation: f64) -> Self {
            Self {
                state: TrackState::Live,
                capabilities: Some(TrackCapabilities {
                    exposure_modes: vec![ExposureMode::Manual, ExposureMode::Continuous],
                    exposure_compensation: Some(MediaRange::new(-2.0, 2.0, 0.1)),
                    exposure_time: None,
                }),
                settings: RefCell::new(TrackSettings {
                    exposure_mode: Some(mode),
                    exposure_compensation: Some(compensation),
                    exposure_time: None,
                }),
                settings_available: true,
                ignore_mode: false,
                reject: false,
                yielding: false,
                applied: RefCell::new(Vec::new()),
            }
        }

        fn manual() -> Self {
            Self::new(ExposureMode::Manual, 0.0)
        }

        fn constraint_calls(&self) -> usize {
            self.applied.borrow().len()
        }
    }

    impl VideoTrack for Rc<StubTrack> {
        fn ready_state(&self) -> TrackState {
            self.state
        }

        fn capabilities(&self) -> Result<TrackCapabilities, TrackError> {
            self.capabilities
                .clone()
                .ok_or_else(|| TrackError::Device("getCapabilities unavailable".into()))
        }

        fn settings(&self) -> Result<TrackSettings, TrackError> {
            if !self.settings_available {
                return Err(TrackError::Device("getSettings unavailable".into()));
            }
            Ok(self.settings.borrow().clone())
        }

        fn apply_constraint(
            &self,
            constraint: Constraint,
        ) -> impl Future<Output = Result<(), TrackError>> {
            self.applied.borrow_mut().push(constraint);
            let result = if self.reject {
                Err(TrackError::Device("constraint not satisfiable".into()))
            } else {
                let mut settings = self.settings.borrow_mut();
                match constraint {
                    Constraint::ExposureMode(_) if self.ignore_mode => {}
                    Constraint::ExposureMode(mode) => settings.exposure_mode = Some(mode),
                    Constraint::ExposureCompensation(value) => {
                        settings.exposure_compensation = Some(value)
                    }
                    Constraint::ExposureTime(value) => settings.exposure_time = Some(value),
                }
                Ok(())
            };
            YieldOnce {
                value: Some(result),
                yielded: !self.yielding,
            }
        }
    }

    struct StubMedia {
        image_capture: bool,
        track: Option<Rc<StubTrack>>,
    }

    impl StubMedia {
        fn with(track: StubTrack) -> (Self, Rc<StubTrack>) {
            let track = Rc::new(track);
            let media = Self {
                image_capture: true,
                track: Some(Rc::clone(&track)),
            };
            (media, track)
        }
    }

    impl MediaSource for StubMedia {
        type Track = Rc<StubTrack>;

        fn supports_image_capture(&self) -> bool {
            self.image_capture
        }

        fn video_track(&self) -> Option<Rc<StubTrack>> {
            self.track.clone()
        }
    }

    struct StubPhotometer {
        brightness: Cell<f32>,
        fail: Cell<bool>,
        regions: RefCell<Vec<SampleRegion>>,
    }

    impl StubPhotometer {
        fn reading(brightness: f32) -> Self {
            Self {
                brightness: Cell::new(brightness),
                fail: Cell::new(false),
                regions: RefCell::new(Vec::new()),
            }
        }
    }

    impl Photometer for StubPhotometer {
        type Frame = ();

        fn measure(&self, _frame: &(), region: SampleRegion) -> Result<f32, PhotometerError> {
            self.regions.borrow_mut().push(region);
            if self.fail.get() {
                return Err(PhotometerError::Readback("device lost".into()));
            }
            Ok(self.brightness.get())
        }
    }

    type Controller = ExposureController<StubPhotometer, Rc<StubTrack>>;

    fn ready_controller(track: StubTrack, brightness: f32) -> (Controller, Rc<StubTrack>) {
        let (media, track) = StubMedia::with(track);
        let controller = Controller::new();
        controller
            .init(&media, |_| Ok(StubPhotometer::reading(brightness)), None)
            .unwrap();
        (controller, track)
    }

    fn init_error(media: &StubMedia) -> InitError {
        let controller = Controller::new();
        let err = controller
            .init(media, |_| Ok(StubPhotometer::reading(0.5)), None)
            .unwrap_err();
        assert_eq!(controller.state(), ControllerState::NotLoaded);
        err
    }

    #[test]
    fn settles_without_touching_the_camera() {
        let (controller, track) = ready_controller(StubTrack::manual(), 0.52);
        let outcome =
            pollster::block_on(controller.adjust_full(&(), &AdjustTarget::new(0.5, 0.05, 0.1)))
                .unwrap();

        assert!(outcome.is_settled());
        assert_eq!(outcome.brightness(), 0.52);
        assert_eq!(track.constraint_calls(), 0);
        assert_eq!(controller.normalized_exposure(), 0.5);
        assert_eq!(controller.state(), ControllerState::Idle);
    }

    #[test]
    fn takes_one_relaxed_step_when_too_bright() {
        let (controller, track) = ready_controller(StubTrack::manual(), 0.8);
        let outcome =
            pollster::block_on(controller.adjust_full(&(), &AdjustTarget::new(0.5, 0.05, 0.1)))
                .unwrap();

        assert!(!outcome.is_settled());
        match outcome {
            AdjustOutcome::Adjusting { exposure, .. } => assert!((exposure - 0.47).abs() < 1e-6),
            other => panic!("unexpected outcome {other:?}"),
        }
        assert!((controller.normalized_exposure() - 0.47).abs() < 1e-6);
        assert_eq!(track.constraint_calls(), 1);
        assert!(matches!(
            track.applied.borrow()[0],
            Constraint::ExposureCompensation(raw) if (raw + 0.1).abs() < 1e-9
        ));
        assert_eq!(controller.state(), ControllerState::Idle);
    }

    #[test]
    fn measures_the_requested_region() {
        let (controller, _track) = ready_controller(StubTrack::manual(), 0.5);
        let region = SampleRegion::new(0.2, -0.3, 0.25, 0.5);
        pollster::block_on(controller.adjust(&(), region, &AdjustTarget::default())).unwrap();
        let photometer = controller.photometer().unwrap();
        assert_eq!(*photometer.regions.borrow(), vec![region]);
    }

    #[test]
    fn exposure_estimate_stays_clamped() {
        let (controller, _track) = ready_controller(StubTrack::manual(), 1.0);
        let outcome =
            pollster::block_on(controller.adjust_full(&(), &AdjustTarget::new(0.0, 0.01, 1e6)))
                .unwrap();
        assert!(matches!(
            outcome,
            AdjustOutcome::Adjusting { exposure, .. } if exposure == MIN_EXPOSURE
        ));

        let photometer = controller.photometer().unwrap();
        photometer.brightness.set(0.0);
        for _ in 0..3 {
            pollster::block_on(controller.adjust_full(&(), &AdjustTarget::new(1.0, 0.01, 1e6)))
                .unwrap();
            assert_eq!(controller.normalized_exposure(), MAX_EXPOSURE);
        }
    }

    #[test]
    fn rejected_corrections_are_reported_distinctly() {
        let mut track = StubTrack::manual();
        track.reject = true;
        let (controller, track) = ready_controller(track, 0.8);
        let outcome =
            pollster::block_on(controller.adjust_full(&(), &AdjustTarget::default())).unwrap();

        assert!(matches!(
            outcome,
            AdjustOutcome::Rejected {
                error: CameraError::ConstraintRejected { .. },
                ..
            }
        ));
        assert_eq!(track.constraint_calls(), 1);
        assert_eq!(controller.state(), ControllerState::Idle);
    }

    #[test]
    fn measurement_failure_releases_the_session() {
        let (controller, track) = ready_controller(StubTrack::manual(), 0.8);
        controller.photometer().unwrap().fail.set(true);
        let err =
            pollster::block_on(controller.adjust_full(&(), &AdjustTarget::default())).unwrap_err();
        assert!(matches!(err, ControlError::Measurement(_)));
        assert_eq!(controller.state(), ControllerState::Idle);
        assert_eq!(track.constraint_calls(), 0);
    }

    #[test]
    fn adjust_requires_initialization() {
        let controller = Controller::new();
        let err =
            pollster::block_on(controller.adjust_full(&(), &AdjustTarget::default())).unwrap_err();
        assert!(matches!(err, ControlError::NotReady));
        assert!(matches!(
            pollster::block_on(controller.toggle_auto()),
            Err(ControlError::NotReady)
        ));
    }

    #[test]
    fn busy_controller_rejects_overlapping_adjust() {
        let mut track = StubTrack::manual();
        track.yielding = true;
        let (controller, track) = ready_controller(track, 0.8);
        let target = AdjustTarget::default();

        let mut first = pin!(controller.adjust_full(&(), &target));
        let mut cx = Context::from_waker(Waker::noop());
        assert!(first.as_mut().poll(&mut cx).is_pending());
        assert_eq!(controller.state(), ControllerState::Busy);

        let second = pollster::block_on(controller.adjust_full(&(), &target));
        assert!(matches!(second, Err(ControlError::NotReady)));

        let outcome = match first.as_mut().poll(&mut cx) {
            Poll::Ready(outcome) => outcome.unwrap(),
            Poll::Pending => panic!("adjust should complete after one yield"),
        };
        assert!(matches!(outcome, AdjustOutcome::Adjusting { .. }));
        assert_eq!(track.constraint_calls(), 1);
        assert_eq!(controller.state(), ControllerState::Idle);
    }

    #[test]
    fn dropped_adjust_returns_to_idle() {
        let mut track = StubTrack::manual();
        track.yielding = true;
        let (controller, _track) = ready_controller(track, 0.8);
        let target = AdjustTarget::default();
        {
            let mut pending = pin!(controller.adjust_full(&(), &target));
            let mut cx = Context::from_waker(Waker::noop());
            assert!(pending.as_mut().poll(&mut cx).is_pending());
            assert_eq!(controller.state(), ControllerState::Busy);
        }
        assert_eq!(controller.state(), ControllerState::Idle);
    }

    #[test]
    fn manual_exposure_switches_mode_first() {
        let (controller, track) =
            ready_controller(StubTrack::new(ExposureMode::Continuous, 0.0), 0.5);
        assert_eq!(controller.normalized_exposure(), NEUTRAL_EXPOSURE);

        let raw = pollster::block_on(controller.set_manual_exposure(0.75)).unwrap();
        assert!((raw - 1.0).abs() < 1e-9);
        let applied = track.applied.borrow();
        assert_eq!(applied.len(), 2);
        assert_eq!(applied[0], Constraint::ExposureMode(ExposureMode::Manual));
        assert!(matches!(applied[1], Constraint::ExposureCompensation(_)));
        assert_eq!(controller.normalized_exposure(), 0.75);
    }

    #[test]
    fn unconfirmed_mode_switch_blocks_exposure() {
        let mut track = StubTrack::new(ExposureMode::Continuous, 0.0);
        track.ignore_mode = true;
        let (controller, track) = ready_controller(track, 0.5);

        let err = pollster::block_on(controller.set_manual_exposure(0.75)).unwrap_err();
        assert!(matches!(
            err,
            ControlError::Camera(CameraError::ConstraintIgnored(_))
        ));
        assert_eq!(
            *track.applied.borrow(),
            vec![Constraint::ExposureMode(ExposureMode::Manual)]
        );
        assert_eq!(controller.normalized_exposure(), NEUTRAL_EXPOSURE);
    }

    #[test]
    fn toggle_auto_resets_the_estimate() {
        let (controller, track) = ready_controller(StubTrack::new(ExposureMode::Manual, 1.0), 0.5);
        assert_eq!(controller.normalized_exposure(), 0.75);

        pollster::block_on(controller.toggle_auto()).unwrap();
        assert_eq!(controller.normalized_exposure(), NEUTRAL_EXPOSURE);
        assert_eq!(
            *track.applied.borrow(),
            vec![Constraint::ExposureMode(ExposureMode::Continuous)]
        );
        assert!(!controller.camera().unwrap().is_manual_mode());
    }

    #[test]
    fn second_init_is_rejected_without_side_effects() {
        let (media, track) = StubMedia::with(StubTrack::manual());
        let controller = Controller::new();
        let builds = Cell::new(0);
        let build = |_: u32| -> Result<StubPhotometer, PhotometerError> {
            builds.set(builds.get() + 1);
            Ok(StubPhotometer::reading(0.5))
        };
        controller.init(&media, build, Some(32)).unwrap();

        let err = controller.init(&media, build, None).unwrap_err();
        assert_eq!(err.code(), "ALREADY_INITIALIZED");
        assert_eq!(builds.get(), 1);
        assert_eq!(track.constraint_calls(), 0);
        assert_eq!(controller.state(), ControllerState::Idle);
    }

    #[test]
    fn passes_subsample_size_to_the_photometer() {
        let (media, _track) = StubMedia::with(StubTrack::manual());
        let sizes = RefCell::new(Vec::new());
        for requested in [None, Some(64)] {
            let controller = Controller::new();
            controller
                .init(
                    &media,
                    |size| {
                        sizes.borrow_mut().push(size);
                        Ok(StubPhotometer::reading(0.5))
                    },
                    requested,
                )
                .unwrap();
        }
        assert_eq!(*sizes.borrow(), vec![DEFAULT_SUBSAMPLE_SIZE, 64]);
    }

    #[test]
    fn init_failures_report_codes_and_stay_retryable() {
        let (mut media, _) = StubMedia::with(StubTrack::manual());
        media.image_capture = false;
        assert_eq!(init_error(&media).code(), "IMAGECAPTUREAPI_NOTFOUND");

        let no_track = StubMedia {
            image_capture: true,
            track: None,
        };
        assert_eq!(init_error(&no_track).code(), "NO_VIDEOTRACK");

        let mut ended = StubTrack::manual();
        ended.state = TrackState::Ended;
        assert_eq!(init_error(&StubMedia::with(ended).0).code(), "INVALID_VIDEOTRACK");

        let mut blind = StubTrack::manual();
        blind.capabilities = None;
        assert_eq!(init_error(&StubMedia::with(blind).0).code(), "NO_CAMERACAPABILITIES");

        let mut auto_only = StubTrack::manual();
        if let Some(caps) = auto_only.capabilities.as_mut() {
            caps.exposure_modes = vec![ExposureMode::Continuous];
        }
        assert_eq!(
            init_error(&StubMedia::with(auto_only).0).code(),
            "INVALID_CAMERACAPABILITIES"
        );

        let mut silent = StubTrack::manual();
        silent.settings_available = false;
        assert_eq!(init_error(&StubMedia::with(silent).0).code(), "NO_CAMERASETTINGS");

        let modeless = StubTrack::manual();
        modeless.settings.borrow_mut().exposure_mode = None;
        assert_eq!(
            init_error(&StubMedia::with(modeless).0).code(),
            "INVALID_CAMERASETTINGS"
        );

        let (media, _) = StubMedia::with(StubTrack::manual());
        let controller = Controller::new();
        let err = controller
            .init(&media, |size| Err(PhotometerError::InvalidSubsampleSize(size)), Some(3))
            .unwrap_err();
        assert_eq!(err.code(), "GPU_SETUP_FAILED");
        assert_eq!(controller.state(), ControllerState::NotLoaded);

        controller
            .init(&media, |_| Ok(StubPhotometer::reading(0.5)), None)
            .unwrap();
        assert_eq!(controller.state(), ControllerState::Idle);
    }
}
