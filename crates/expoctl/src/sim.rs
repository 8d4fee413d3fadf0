use std::cell::{Cell, RefCell};
use std::future::{ready, Future};
use std::path::Path;
use std::rc::Rc;

use anyhow::{Context, Result};
use camera::{
    Constraint, ExposureMode, MediaRange, MediaSource, TrackCapabilities, TrackError,
    TrackSettings, TrackState, VideoTrack,
};
use rand::prelude::*;

use crate::cli::{SimAxis, StartMode};

/// Exposure time that yields unit gain, in 100 µs units.
const REFERENCE_EXPOSURE_TIME: f64 = 100.0;
const FLAT_SCENE_SIZE: u32 = 64;

struct CameraCore {
    axis: SimAxis,
    capabilities: TrackCapabilities,
    settings: RefCell<TrackSettings>,
    constraint_calls: Cell<u32>,
}

/// In-process stand-in for a webcam bound to a media stream.
///
/// Offers manual and continuous exposure on a single axis. Continuous mode
/// leaves the sensor at unit gain; manual mode applies `2^ev` for
/// compensation or `t / t_ref` for exposure time.
#[derive(Clone)]
pub struct SimulatedCamera {
    core: Rc<CameraCore>,
}

/// Video track of a [`SimulatedCamera`].
pub struct SimTrack {
    core: Rc<CameraCore>,
}

impl SimulatedCamera {
    pub fn new(axis: SimAxis, start_mode: StartMode) -> Self {
        let (compensation, time) = match axis {
            SimAxis::Compensation => (Some(MediaRange::new(-2.0, 2.0, 0.1)), None),
            SimAxis::Time => (None, Some(MediaRange::new(1.0, 1000.0, 1.0))),
        };
        let mode = match start_mode {
            StartMode::Auto => ExposureMode::Continuous,
            StartMode::Manual => ExposureMode::Manual,
        };
        let settings = TrackSettings {
            exposure_mode: Some(mode),
            exposure_compensation: compensation.map(|_| 0.0),
            exposure_time: time.map(|_| REFERENCE_EXPOSURE_TIME),
        };
        let capabilities = TrackCapabilities {
            exposure_modes: vec![ExposureMode::Manual, ExposureMode::Continuous],
            exposure_compensation: compensation,
            exposure_time: time,
        };

        Self {
            core: Rc::new(CameraCore {
                axis,
                capabilities,
                settings: RefCell::new(settings),
                constraint_calls: Cell::new(0),
            }),
        }
    }

    /// Multiplier the sensor currently applies to scene luminance.
    pub fn gain(&self) -> f64 {
        let settings = self.core.settings.borrow();
        if settings.exposure_mode != Some(ExposureMode::Manual) {
            return 1.0;
        }
        match self.core.axis {
            SimAxis::Compensation => 2f64.powf(settings.exposure_compensation.unwrap_or(0.0)),
            SimAxis::Time => {
                settings.exposure_time.unwrap_or(REFERENCE_EXPOSURE_TIME) / REFERENCE_EXPOSURE_TIME
            }
        }
    }

    pub fn constraint_calls(&self) -> u32 {
        self.core.constraint_calls.get()
    }
}

impl MediaSource for SimulatedCamera {
    type Track = SimTrack;

    fn supports_image_capture(&self) -> bool {
        true
    }

    fn video_track(&self) -> Option<SimTrack> {
        Some(SimTrack {
            core: Rc::clone(&self.core),
        })
    }
}

impl SimTrack {
    fn check(&self, constraint: &Constraint) -> Result<(), TrackError> {
        let capabilities = &self.core.capabilities;
        let (value, range) = match constraint {
            Constraint::ExposureMode(mode) => {
                if capabilities.exposure_modes.contains(mode) {
                    return Ok(());
                }
                return Err(TrackError::Device(format!(
                    "OverconstrainedError: exposureMode '{mode}' is not supported"
                )));
            }
            Constraint::ExposureCompensation(value) => (*value, capabilities.exposure_compensation),
            Constraint::ExposureTime(value) => (*value, capabilities.exposure_time),
        };
        match range {
            Some(range) if value >= range.min && value <= range.max => Ok(()),
            Some(_) => Err(TrackError::Device(format!(
                "OverconstrainedError: {constraint} is out of range"
            ))),
            None => Err(TrackError::Device(format!(
                "OverconstrainedError: {constraint} is not supported"
            ))),
        }
    }
}

impl VideoTrack for SimTrack {
    fn ready_state(&self) -> TrackState {
        TrackState::Live
    }

    fn capabilities(&self) -> Result<TrackCapabilities, TrackError> {
        Ok(self.core.capabilities.clone())
    }

    fn settings(&self) -> Result<TrackSettings, TrackError> {
        Ok(self.core.settings.borrow().clone())
    }

    fn apply_constraint(
        &self,
        constraint: Constraint,
    ) -> impl Future<Output = Result<(), TrackError>> {
        let calls = &self.core.constraint_calls;
        calls.set(calls.get() + 1);

        let result = self.check(&constraint).map(|()| {
            let mut settings = self.core.settings.borrow_mut();
            match constraint {
                Constraint::ExposureMode(mode) => settings.exposure_mode = Some(mode),
                Constraint::ExposureCompensation(value) => {
                    settings.exposure_compensation = Some(value)
                }
                Constraint::ExposureTime(value) => settings.exposure_time = Some(value),
            }
        });
        ready(result)
    }
}

/// Linear RGB scene in `[0, 1]`.
pub struct Scene {
    width: u32,
    height: u32,
    pixels: Vec<[f32; 3]>,
}

impl Scene {
    pub fn flat(luminance: f32) -> Self {
        let count = (FLAT_SCENE_SIZE * FLAT_SCENE_SIZE) as usize;
        Self {
            width: FLAT_SCENE_SIZE,
            height: FLAT_SCENE_SIZE,
            pixels: vec![[luminance; 3]; count],
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let image = image::open(path)
            .with_context(|| format!("failed to open scene image at {}", path.display()))?;
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        if width == 0 || height == 0 {
            anyhow::bail!(
                "scene image at {} has zero extent ({}x{})",
                path.display(),
                width,
                height
            );
        }
        let pixels = rgba
            .pixels()
            .map(|pixel| {
                let [r, g, b, _] = pixel.0;
                [r, g, b].map(|channel| f32::from(channel) / 255.0)
            })
            .collect();
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Turns the scene into RGBA8 frames at a given gain.
pub struct Sensor {
    scene: Scene,
    noise: f32,
    rng: StdRng,
}

impl Sensor {
    pub fn new(scene: Scene, noise: f32, seed: u64) -> Self {
        Self {
            scene,
            noise,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn size(&self) -> (u32, u32) {
        self.scene.size()
    }

    pub fn expose(&mut self, gain: f64) -> Vec<u8> {
        let gain = gain as f32;
        let mut frame = Vec::with_capacity(self.scene.pixels.len() * 4);
        for pixel in &self.scene.pixels {
            for channel in pixel {
                let jitter = if self.noise > 0.0 {
                    self.rng.gen_range(-self.noise..=self.noise)
                } else {
                    0.0
                };
                let value = (channel * gain + jitter).clamp(0.0, 1.0);
                frame.push((value * 255.0).round() as u8);
            }
            frame.push(u8::MAX);
        }
        frame
    }
}
