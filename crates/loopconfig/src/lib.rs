use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

/// Largest crop texture side accepted by the configuration.
pub const MAX_SUBSAMPLE_SIZE: u32 = 4096;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Settings of one exposure control session plus the retry cadence of the
/// loop that drives it.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ControlConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub sampler: SamplerConfig,
    #[serde(default)]
    pub target: TargetConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<RegionConfig>,
    #[serde(default)]
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct SamplerConfig {
    #[serde(default = "default_subsample_size")]
    pub subsample_size: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct TargetConfig {
    #[serde(default = "default_brightness")]
    pub brightness: f64,
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,
    #[serde(default = "default_relaxation")]
    pub relaxation: f64,
}

/// Measured area: centre in `[-1, 1]`, extent in `(0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct RegionConfig {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default = "default_extent")]
    pub w: f64,
    #[serde(default = "default_extent")]
    pub h: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct RetryConfig {
    #[serde(
        default = "default_retry_delay",
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub delay: Duration,
    /// `0` retries until the controller settles.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            sampler: SamplerConfig::default(),
            target: TargetConfig::default(),
            region: None,
            retry: RetryConfig::default(),
        }
    }
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            subsample_size: default_subsample_size(),
        }
    }
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            brightness: default_brightness(),
            epsilon: default_epsilon(),
            relaxation: default_relaxation(),
        }
    }
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            w: default_extent(),
            h: default_extent(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            delay: default_retry_delay(),
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_version() -> u32 {
    1
}

fn default_subsample_size() -> u32 {
    16
}

fn default_brightness() -> f64 {
    0.5
}

fn default_epsilon() -> f64 {
    0.05
}

fn default_relaxation() -> f64 {
    0.1
}

fn default_extent() -> f64 {
    1.0
}

fn default_retry_delay() -> Duration {
    Duration::from_millis(50)
}

fn default_max_attempts() -> u32 {
    200
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of milliseconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Duration::from_millis(v))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Duration::from_millis(v as u64))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v.is_nan() || v.is_sign_negative() {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Duration::from_secs_f64(v / 1000.0))
        }
    }

    deserializer.deserialize_any(Visitor)
}

fn serialize_duration<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&humantime::format_duration(*duration).to_string())
}

impl ControlConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: ControlConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&input)
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string(self)
    }

    /// The configured region, or the full frame.
    pub fn region(&self) -> RegionConfig {
        self.region.unwrap_or_default()
    }

    /// Attempt limit of the retry loop, `None` when unbounded.
    pub fn attempt_limit(&self) -> Option<u32> {
        match self.retry.max_attempts {
            0 => None,
            limit => Some(limit),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected 1",
                self.version
            )));
        }

        let size = self.sampler.subsample_size;
        if !size.is_power_of_two() || size > MAX_SUBSAMPLE_SIZE {
            return Err(ConfigError::Invalid(format!(
                "sampler.subsample_size {size} must be a power of two between 1 and {MAX_SUBSAMPLE_SIZE}"
            )));
        }

        let target = &self.target;
        if !(0.0..=1.0).contains(&target.brightness) {
            return Err(ConfigError::Invalid(format!(
                "target.brightness {} must be within [0, 1]",
                target.brightness
            )));
        }
        check_unit_fraction("target.epsilon", target.epsilon)?;
        check_unit_fraction("target.relaxation", target.relaxation)?;

        if let Some(region) = &self.region {
            if !(-1.0..=1.0).contains(&region.x) || !(-1.0..=1.0).contains(&region.y) {
                return Err(ConfigError::Invalid(format!(
                    "region centre ({}, {}) must lie within [-1, 1]",
                    region.x, region.y
                )));
            }
            check_unit_fraction("region.w", region.w)?;
            check_unit_fraction("region.h", region.h)?;
        }

        Ok(())
    }
}

fn check_unit_fraction(name: &str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && value <= 1.0 {
        return Ok(());
    }
    Err(ConfigError::Invalid(format!(
        "{name} {value} must be within (0, 1]"
    )))
}
