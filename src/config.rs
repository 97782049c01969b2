use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer};
use thiserror::Error;

use crate::actuator::{ActuatorSettings, AxisSpec, RetryPolicy};
use crate::propagate::{OrbitalParameters, ParameterError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("default orbit: {0}")]
    Orbit(#[from] ParameterError),
    #[error("invalid axes: {0}")]
    Axes(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub axes: AxesConfig,
    #[serde(default)]
    pub actuator: ActuatorConfig,
    pub persistence: PersistenceConfig,
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AxesConfig {
    pub aov: AxisSpec,
    pub eqx: AxisSpec,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActuatorConfig {
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_retry_base_delay", deserialize_with = "human_duration")]
    pub retry_base_delay: Duration,
    #[serde(default = "default_poll_window", deserialize_with = "human_duration")]
    pub poll_window: Duration,
    #[serde(default = "default_offline_threshold")]
    pub offline_threshold: u32,
    #[serde(default = "default_transport_timeout", deserialize_with = "human_duration")]
    pub transport_timeout: Duration,
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        Self {
            retry_attempts: default_retry_attempts(),
            retry_base_delay: default_retry_base_delay(),
            poll_window: default_poll_window(),
            offline_threshold: default_offline_threshold(),
            transport_timeout: default_transport_timeout(),
        }
    }
}

impl ActuatorConfig {
    pub fn settings(&self) -> ActuatorSettings {
        ActuatorSettings {
            retry: RetryPolicy {
                attempts: self.retry_attempts,
                base_delay: self.retry_base_delay,
            },
            poll_window: self.poll_window,
            offline_threshold: self.offline_threshold,
        }
    }
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_base_delay() -> Duration {
    Duration::from_millis(10)
}

fn default_poll_window() -> Duration {
    Duration::from_millis(500)
}

fn default_offline_threshold() -> u32 {
    5
}

fn default_transport_timeout() -> Duration {
    Duration::from_millis(150)
}

#[derive(Debug, Clone, Deserialize)]
pub struct PersistenceConfig {
    /// Image file standing in for the RTC SRAM; without it only flash is used.
    #[serde(default)]
    pub nvm_image: Option<PathBuf>,
    #[serde(default = "default_nvm_capacity")]
    pub nvm_capacity: usize,
    pub flash_path: PathBuf,
    #[serde(default = "default_catchup_window", deserialize_with = "human_duration")]
    pub catchup_window: Duration,
}

fn default_nvm_capacity() -> usize {
    236
}

fn default_catchup_window() -> Duration {
    Duration::from_secs(300)
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    pub cache_path: PathBuf,
    #[serde(default = "default_stale_after", deserialize_with = "human_duration")]
    pub stale_after: Duration,
}

fn default_stale_after() -> Duration {
    Duration::from_secs(24 * 3_600)
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_loop_period", deserialize_with = "human_duration")]
    pub loop_period: Duration,
    #[serde(default = "default_command_interval", deserialize_with = "human_duration")]
    pub command_interval: Duration,
    #[serde(default = "default_tolerance_deg")]
    pub tolerance_deg: f64,
    /// Velocity limit while closing a gap larger than the tolerance.
    #[serde(default = "default_catchup_velocity")]
    pub catchup_velocity_limit: u32,
    #[serde(default)]
    pub default_orbit: OrbitConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            loop_period: default_loop_period(),
            command_interval: default_command_interval(),
            tolerance_deg: default_tolerance_deg(),
            catchup_velocity_limit: default_catchup_velocity(),
            default_orbit: OrbitConfig::default(),
        }
    }
}

fn default_loop_period() -> Duration {
    Duration::from_millis(10)
}

fn default_command_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_tolerance_deg() -> f64 {
    2.0
}

fn default_catchup_velocity() -> u32 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrbitConfig {
    pub altitude_km: f64,
    pub inclination_deg: f64,
    #[serde(default)]
    pub eccentricity: f64,
    #[serde(default)]
    pub periapsis_deg: f64,
}

impl Default for OrbitConfig {
    fn default() -> Self {
        Self {
            altitude_km: 400.0,
            inclination_deg: 51.6,
            eccentricity: 0.0,
            periapsis_deg: 0.0,
        }
    }
}

impl OrbitConfig {
    pub fn parameters(&self) -> Result<OrbitalParameters, ParameterError> {
        OrbitalParameters::new(
            self.altitude_km,
            self.inclination_deg,
            self.eccentricity,
            self.periapsis_deg,
        )
    }
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        content.parse()
    }

    /// Checks what serde cannot: value ranges and cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.session.default_orbit.parameters()?;

        let (aov, eqx) = (&self.axes.aov, &self.axes.eqx);
        if aov.motor_id == eqx.motor_id {
            return Err(ConfigError::Axes(format!(
                "both axes use motor id {}",
                aov.motor_id
            )));
        }
        for (name, axis) in [("aov", aov), ("eqx", eqx)] {
            if !(axis.gear_ratio.is_finite() && axis.gear_ratio > 0.0) {
                return Err(ConfigError::Axes(format!(
                    "{} gear ratio must be positive, got {}",
                    name, axis.gear_ratio
                )));
            }
        }
        Ok(())
    }
}

impl std::str::FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config: Config = serde_yaml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}

fn human_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    humantime::parse_duration(s.trim()).map_err(serde::de::Error::custom)
}
