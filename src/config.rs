//! Configuration types for driftflow
//!
//! Every key has a default, so an empty file (or no file) is a valid config.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::data_fetch::{ReturnStatistics, DEFAULT_BASE_URL};
use crate::error::ConfigError;
use crate::models::{DriftCorrection, Simulation, SimulationParameters};

/// One trading day as a fraction of a year
pub const TRADING_DAY: f64 = 1.0 / 252.0;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Monte Carlo engine configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulationConfig {
    /// Horizon as a fraction of a year (default: one trading day)
    #[serde(default = "default_time_step")]
    pub time_step: f64,

    /// Trials per run
    #[serde(default = "default_iterations")]
    pub iterations: usize,

    /// Drift term in the exponent
    #[serde(default)]
    pub drift_correction: DriftCorrection,

    /// Fixed seed for reproducible runs; OS entropy when absent
    #[serde(default)]
    pub seed: Option<u64>,

    /// Parallel workers; 1 runs sequentially
    #[serde(default = "default_workers")]
    pub workers: usize,
}

fn default_time_step() -> f64 {
    TRADING_DAY
}
fn default_iterations() -> usize {
    1000
}
fn default_workers() -> usize {
    1
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            time_step: TRADING_DAY,
            iterations: 1000,
            drift_correction: DriftCorrection::Literal,
            seed: None,
            workers: 1,
        }
    }
}

impl SimulationConfig {
    /// Engine inputs for a price and its return statistics
    pub fn parameters(&self, current_price: f64, stats: &ReturnStatistics) -> SimulationParameters {
        SimulationParameters {
            current_price,
            mean: stats.mean,
            volatility: stats.volatility,
            time_step: self.time_step,
            iterations: self.iterations,
        }
    }

    pub fn engine(&self) -> Simulation {
        Simulation::new(self.drift_correction)
    }
}

/// Market data configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DataConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// History window for the return statistics
    #[serde(default = "default_history_range")]
    pub history_range: String,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}
fn default_history_range() -> String {
    "1y".to_string()
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            history_range: default_history_range(),
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Like `load`, but a missing file yields the defaults
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        match Self::load(path) {
            Err(ConfigError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(Self::default())
            }
            other => other,
        }
    }
}
