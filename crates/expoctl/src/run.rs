use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use controller::{AdjustOutcome, AdjustTarget, ExposureController};
use loopconfig::ControlConfig;
use photometer::{FrameTexture, GpuContext, GpuPhotometer, GpuPowerPreference, SampleRegion};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use crate::cli::{SimAxis, SimulateArgs};
use crate::sim::{Scene, Sensor, SimTrack, SimulatedCamera};

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Effective settings of one simulation run after CLI overrides.
#[derive(Debug, Clone, PartialEq)]
struct LoopSettings {
    target: AdjustTarget,
    region: SampleRegion,
    subsample_size: u32,
    attempt_limit: Option<u32>,
    delay: Duration,
}

impl LoopSettings {
    fn resolve(config: &ControlConfig, args: &SimulateArgs) -> Self {
        let region = config.region();
        let mut target = AdjustTarget::new(
            config.target.brightness as f32,
            config.target.epsilon as f32,
            config.target.relaxation as f32,
        );
        if let Some(brightness) = args.target {
            target.brightness = brightness;
        }
        if let Some(epsilon) = args.epsilon {
            target.epsilon = epsilon;
        }
        if let Some(relaxation) = args.relaxation {
            target.relaxation = relaxation;
        }

        let attempt_limit = match args.max_attempts {
            Some(0) => None,
            Some(limit) => Some(limit),
            None => config.attempt_limit(),
        };

        Self {
            target,
            region: SampleRegion::new(
                region.x as f32,
                region.y as f32,
                region.w as f32,
                region.h as f32,
            ),
            subsample_size: args
                .subsample_size
                .unwrap_or(config.sampler.subsample_size),
            attempt_limit,
            delay: args
                .delay_ms
                .map(Duration::from_millis)
                .unwrap_or(config.retry.delay),
        }
    }
}

#[derive(Debug, Serialize)]
struct Attempt {
    attempt: u32,
    brightness: f32,
    outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    exposure: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl Attempt {
    fn record(attempt: u32, outcome: &AdjustOutcome) -> Self {
        let (label, exposure, error) = match outcome {
            AdjustOutcome::Settled { .. } => ("settled", None, None),
            AdjustOutcome::Adjusting { exposure, .. } => ("adjusting", Some(*exposure), None),
            AdjustOutcome::Rejected {
                exposure, error, ..
            } => ("rejected", Some(*exposure), Some(error.to_string())),
        };
        Self {
            attempt,
            brightness: outcome.brightness(),
            outcome: label,
            exposure,
            error,
        }
    }
}

#[derive(Debug, Serialize)]
struct Report {
    adapter: String,
    backend: String,
    axis: &'static str,
    settled: bool,
    attempts: u32,
    final_brightness: f32,
    normalized_exposure: f32,
    raw_exposure: Option<f64>,
    manual_mode: bool,
    constraint_calls: u32,
    history: Vec<Attempt>,
}

pub fn simulate(args: SimulateArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => ControlConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => ControlConfig::default(),
    };
    let settings = LoopSettings::resolve(&config, &args);
    if !settings.region.is_valid() {
        anyhow::bail!("sample region {:?} lies outside the frame", settings.region);
    }

    let scene = match &args.scene {
        Some(path) => Scene::load(path)?,
        None => Scene::flat(args.luminance),
    };
    let mut sensor = Sensor::new(scene, args.noise, args.seed);

    let gpu = GpuContext::headless(GpuPowerPreference::Low)?;
    tracing::info!(adapter = %gpu.adapter_name, backend = ?gpu.backend, "using GPU adapter");

    let camera = SimulatedCamera::new(args.axis, args.start_mode);
    let controller = ExposureController::<GpuPhotometer, SimTrack>::new();
    controller
        .init(
            &camera,
            |size| GpuPhotometer::new(&gpu.device, &gpu.queue, size),
            Some(settings.subsample_size),
        )
        .map_err(|err| anyhow!("controller init failed ({}): {err}", err.code()))?;

    let (width, height) = sensor.size();
    let frame = FrameTexture::new(&gpu.device, width, height);

    tracing::info!(
        brightness_target = settings.target.brightness,
        epsilon = settings.target.epsilon,
        relaxation = settings.target.relaxation,
        limit = ?settings.attempt_limit,
        "starting exposure loop"
    );

    let mut history = Vec::new();
    let mut attempt = 0u32;
    let settled = loop {
        attempt += 1;
        frame.upload(&gpu.queue, &sensor.expose(camera.gain()));
        let outcome = pollster::block_on(controller.adjust(
            frame.view(),
            settings.region,
            &settings.target,
        ))
        .context("exposure adjustment failed")?;

        let record = Attempt::record(attempt, &outcome);
        match &outcome {
            AdjustOutcome::Settled { brightness } => {
                tracing::info!(attempt, brightness, "brightness settled");
            }
            AdjustOutcome::Adjusting {
                brightness,
                exposure,
            } => {
                tracing::debug!(attempt, brightness, exposure, "exposure corrected");
            }
            AdjustOutcome::Rejected {
                brightness, error, ..
            } => {
                tracing::warn!(attempt, brightness, %error, "exposure correction rejected");
            }
        }
        history.push(record);

        if outcome.is_settled() {
            break true;
        }
        if settings.attempt_limit.is_some_and(|limit| attempt >= limit) {
            break false;
        }
        if !settings.delay.is_zero() {
            std::thread::sleep(settings.delay);
        }
    };

    let negotiator = controller.camera();
    let report = Report {
        adapter: gpu.adapter_name.clone(),
        backend: format!("{:?}", gpu.backend),
        axis: match args.axis {
            SimAxis::Compensation => "exposureCompensation",
            SimAxis::Time => "exposureTime",
        },
        settled,
        attempts: attempt,
        final_brightness: history.last().map(|a| a.brightness).unwrap_or_default(),
        normalized_exposure: controller.normalized_exposure(),
        raw_exposure: negotiator.and_then(|camera| camera.settings().exposure),
        manual_mode: negotiator.is_some_and(|camera| camera.is_manual_mode()),
        constraint_calls: camera.constraint_calls(),
        history,
    };
    print_report(&report, args.json)?;

    if !settled {
        anyhow::bail!("brightness did not settle within {attempt} attempts");
    }
    Ok(())
}

fn print_report(report: &Report, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!("Adapter:          {} ({})", report.adapter, report.backend);
    println!("Exposure axis:    {}", report.axis);
    println!(
        "Result:           {} after {} attempt(s)",
        if report.settled { "settled" } else { "not settled" },
        report.attempts
    );
    println!("Final brightness: {:.3}", report.final_brightness);
    println!("Normalized:       {:.3}", report.normalized_exposure);
    match report.raw_exposure {
        Some(raw) => println!(
            "Raw exposure:     {raw} ({})",
            if report.manual_mode { "manual" } else { "auto" }
        ),
        None => println!("Raw exposure:     (unknown)"),
    }
    println!("Constraint calls: {}", report.constraint_calls);
    Ok(())
}

pub fn validate_config(path: &std::path::Path) -> Result<()> {
    let config = ControlConfig::load(path)
        .with_context(|| format!("failed to load config {}", path.display()))?;
    let region = config.region();
    println!("{}: ok", path.display());
    println!("  subsample size: {}", config.sampler.subsample_size);
    println!(
        "  target:         brightness {} epsilon {} relaxation {}",
        config.target.brightness, config.target.epsilon, config.target.relaxation
    );
    println!(
        "  region:         centre ({}, {}) extent {}x{}",
        region.x, region.y, region.w, region.h
    );
    match config.attempt_limit() {
        Some(limit) => println!(
            "  retry:          every {:?}, at most {limit} attempts",
            config.retry.delay
        ),
        None => println!(
            "  retry:          every {:?} until settled",
            config.retry.delay
        ),
    }
    Ok(())
}

pub fn print_default_config() -> Result<()> {
    let text = ControlConfig::default()
        .to_toml()
        .context("failed to serialise default config")?;
    print!("{text}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::cli::{Cli, Command};

    fn simulate_args(extra: &[&str]) -> SimulateArgs {
        let argv = ["expoctl", "simulate"].iter().chain(extra.iter());
        match Cli::try_parse_from(argv).unwrap().command {
            Command::Simulate(args) => args,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn cli_overrides_config() {
        let config = ControlConfig::from_toml_str(
            "[target]\nbrightness = 0.4\nepsilon = 0.02\n[retry]\nmax_attempts = 10\ndelay = \"5ms\"\n",
        )
        .unwrap();
        let args = simulate_args(&["--target", "0.6", "--max-attempts", "0", "--delay-ms", "0"]);
        let settings = LoopSettings::resolve(&config, &args);

        assert_eq!(settings.target.brightness, 0.6);
        assert_eq!(settings.target.epsilon, 0.02);
        assert_eq!(settings.target.relaxation, 0.1);
        assert_eq!(settings.attempt_limit, None);
        assert_eq!(settings.delay, Duration::ZERO);
        assert_eq!(settings.region, SampleRegion::FULL);
        assert_eq!(settings.subsample_size, 16);
    }

    #[test]
    fn config_values_apply_without_overrides() {
        let config = ControlConfig::from_toml_str(
            "[sampler]\nsubsample_size = 64\n[region]\nx = 0.5\nw = 0.25\nh = 0.25\n",
        )
        .unwrap();
        let settings = LoopSettings::resolve(&config, &simulate_args(&[]));
        assert_eq!(settings.subsample_size, 64);
        assert_eq!(settings.region, SampleRegion::new(0.5, 0.0, 0.25, 0.25));
        assert_eq!(settings.attempt_limit, Some(200));
        assert_eq!(settings.delay, Duration::from_millis(50));
    }

    #[test]
    fn attempt_records_outcome_kind() {
        let record = Attempt::record(
            3,
            &AdjustOutcome::Adjusting {
                brightness: 0.8,
                exposure: 0.47,
            },
        );
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["outcome"], "adjusting");
        assert_eq!(json["attempt"], 3);
        assert!(json.get("error").is_none());
    }
}
