//! Error types

use thiserror::Error;

/// Failures raised by the Monte Carlo engine
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimulationError {
    /// Structurally invalid simulation input
    #[error("invalid parameter `{parameter}` = {value}: {constraint}")]
    InvalidParameter {
        parameter: &'static str,
        value: f64,
        constraint: &'static str,
    },
    /// A trial produced a terminal price that is not a finite positive number
    #[error(
        "numeric overflow (price={current_price}, mean={mean}, volatility={volatility}, \
         time_step={time_step}, draw={draw:?})"
    )]
    NumericOverflow {
        current_price: f64,
        mean: f64,
        volatility: f64,
        time_step: f64,
        /// Offending draw; `None` when the accumulated sum overflowed
        draw: Option<f64>,
    },
    /// The run was cancelled between trials
    #[error("simulation cancelled after {completed} trials")]
    Cancelled { completed: usize },
}

/// Failures raised while collecting market data
#[derive(Debug, Error)]
pub enum DataError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider returned an error: {0}")]
    Provider(String),
    #[error("missing field in provider response: {0}")]
    MissingField(&'static str),
    #[error("need at least {needed} usable observations, got {got}")]
    InsufficientHistory { needed: usize, got: usize },
}

/// Failures raised while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse config: {0}")]
    Parse(#[from] toml::de::Error),
}
