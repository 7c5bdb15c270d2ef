//! driftflow: Monte Carlo forecasting of the next stock price
//!
//! The engine evolves the current price under Geometric Brownian Motion
//! many times and averages the terminal prices. Around it:
//! - Market data and log-return statistics from the chart API
//! - TOML configuration with documented defaults
//! - Console report and terminal-price histogram
//! - CLI and structured logging

pub mod cli;
pub mod config;
pub mod data_fetch;
pub mod error;
pub mod models;
pub mod report;
pub mod telemetry;
pub mod visualisations;
