use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "expoctl",
    author,
    version,
    about = "Closed-loop camera exposure controller"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Drive a simulated camera with the GPU photometer until brightness settles.
    Simulate(SimulateArgs),
    /// Inspect control loop configuration files.
    Config(ConfigCommand),
}

#[derive(Parser, Debug)]
pub struct SimulateArgs {
    /// Control loop configuration (TOML). Defaults apply when omitted.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Image used as the scene seen by the simulated sensor.
    #[arg(long, value_name = "IMAGE", conflicts_with = "luminance")]
    pub scene: Option<PathBuf>,

    /// Uniform scene luminance in [0, 1] when no scene image is given.
    #[arg(long, value_name = "F", default_value_t = 0.3, value_parser = parse_unit)]
    pub luminance: f32,

    /// Exposure axis offered by the simulated camera.
    #[arg(long, value_enum, default_value_t = SimAxis::Compensation)]
    pub axis: SimAxis,

    /// Exposure mode the simulated camera starts in.
    #[arg(long, value_enum, default_value_t = StartMode::Auto)]
    pub start_mode: StartMode,

    /// Amplitude of uniform per-pixel sensor noise in [0, 1].
    #[arg(long, value_name = "F", default_value_t = 0.0, value_parser = parse_unit)]
    pub noise: f32,

    /// Seed for the sensor noise generator.
    #[arg(long, value_name = "N", default_value_t = 0)]
    pub seed: u64,

    /// Target brightness, overriding the configuration.
    #[arg(long, value_name = "F", value_parser = parse_unit)]
    pub target: Option<f32>,

    /// Settle tolerance, overriding the configuration.
    #[arg(long, value_name = "F", value_parser = parse_unit)]
    pub epsilon: Option<f32>,

    /// Relaxation factor, overriding the configuration.
    #[arg(long, value_name = "F", value_parser = parse_unit)]
    pub relaxation: Option<f32>,

    /// Side of the square crop texture (power of two), overriding the configuration.
    #[arg(long, value_name = "N")]
    pub subsample_size: Option<u32>,

    /// Attempt limit of the retry loop (`0` for unbounded), overriding the configuration.
    #[arg(long, value_name = "N")]
    pub max_attempts: Option<u32>,

    /// Delay between attempts in milliseconds, overriding the configuration.
    #[arg(long, value_name = "MILLISECONDS")]
    pub delay_ms: Option<u64>,

    /// Print the run summary as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SimAxis {
    /// Exposure compensation in stops.
    Compensation,
    /// Exposure time in 100 µs units.
    Time,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StartMode {
    Auto,
    Manual,
}

#[derive(Parser, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Parse and validate a configuration file.
    Validate {
        #[arg(value_name = "FILE")]
        path: PathBuf,
    },
    /// Print the default configuration as TOML.
    Defaults,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_unit(value: &str) -> Result<f32, String> {
    let parsed: f32 = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid number '{value}'"))?;
    if !(0.0..=1.0).contains(&parsed) {
        return Err(format!("{parsed} must be within [0, 1]"));
    }
    Ok(parsed)
}
