//! CLI interface for driftflow
//!
//! Provides subcommands for:
//! - `forecast`: Fetch a ticker's history and forecast its next price
//! - `simulate`: Run the engine on caller-supplied statistics
//! - `config`: Show the effective configuration

mod forecast;
mod simulate;

pub use forecast::ForecastArgs;
pub use simulate::SimulateArgs;

use anyhow::Context;
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::SimulationConfig;
use crate::models::{
    DriftCorrection, NormalSource, RngNormals, SimulationParameters, SimulationResult,
};
use crate::report::ForecastReport;
use crate::visualisations::plot_terminal_distribution;

#[derive(Parser, Debug)]
#[command(name = "driftflow")]
#[command(about = "Monte Carlo GBM forecast of the next stock price")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "driftflow.toml")]
    pub config: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Forecast a listed ticker from its price history
    Forecast(ForecastArgs),
    /// Run the engine on explicit price and return statistics
    Simulate(SimulateArgs),
    /// Show the effective configuration
    Config,
}

/// Per-call overrides of the `[simulation]` section
#[derive(Args, Debug, Default, Clone)]
pub struct EngineArgs {
    /// Number of trials
    #[arg(short = 'n', long)]
    pub iterations: Option<usize>,

    /// Horizon as a fraction of a year
    #[arg(long)]
    pub time_step: Option<f64>,

    /// Seed for a reproducible run
    #[arg(long)]
    pub seed: Option<u64>,

    /// Parallel workers
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Use the Itô-corrected drift (mu - sigma^2/2)
    #[arg(long, conflicts_with = "literal")]
    pub ito: bool,

    /// Use the historical drift (mu - sigma^2)
    #[arg(long)]
    pub literal: bool,

    /// Save a histogram of terminal prices to this PNG
    #[arg(long)]
    pub plot: Option<PathBuf>,
}

impl EngineArgs {
    pub fn apply(&self, base: &SimulationConfig) -> SimulationConfig {
        SimulationConfig {
            time_step: self.time_step.unwrap_or(base.time_step),
            iterations: self.iterations.unwrap_or(base.iterations),
            drift_correction: match (self.ito, self.literal) {
                (true, _) => DriftCorrection::Ito,
                (_, true) => DriftCorrection::Literal,
                _ => base.drift_correction,
            },
            seed: self.seed.or(base.seed),
            workers: self.workers.unwrap_or(base.workers),
        }
    }
}

/// Run the engine off the async runtime; Ctrl-C cancels between trials.
///
/// With `keep_samples` the run is sequential and the returned samples are
/// the ones averaged into the result.
async fn run_engine(
    sim: &SimulationConfig,
    params: SimulationParameters,
    keep_samples: bool,
) -> anyhow::Result<(SimulationResult, Option<Vec<f64>>)> {
    let cancel = Arc::new(AtomicBool::new(false));
    let engine = sim.engine().with_cancellation(cancel.clone());
    let (seed, workers) = (sim.seed, sim.workers);

    let mut task = tokio::task::spawn_blocking(move || {
        if !keep_samples {
            return engine
                .run_seeded(&params, seed, workers)
                .map(|result| (result, None));
        }
        if workers > 1 {
            debug!(workers, "keeping samples, running sequentially");
        }
        let mut source: Box<dyn NormalSource> = match seed {
            Some(seed) => Box::new(RngNormals::seeded(seed)),
            None => Box::new(RngNormals::from_entropy()),
        };
        engine
            .run_with_samples(&params, source.as_mut())
            .map(|(result, samples)| (result, Some(samples)))
    });

    let outcome = tokio::select! {
        joined = &mut task => joined?,
        _ = tokio::signal::ctrl_c() => {
            warn!("interrupt received, stopping simulation");
            cancel.store(true, Ordering::Relaxed);
            task.await?
        }
    };

    Ok(outcome?)
}

/// Run, report and optionally plot one forecast
async fn forecast(
    symbol: &str,
    sim: &SimulationConfig,
    params: SimulationParameters,
    plot: Option<&Path>,
) -> anyhow::Result<()> {
    let as_of = Local::now();
    let (result, samples) = run_engine(sim, params, plot.is_some())
        .await
        .context("simulation failed")?;
    info!(
        symbol,
        expected = result.expected_price,
        iterations = result.iterations,
        "forecast complete"
    );

    let report = ForecastReport::new(symbol, &params, sim.drift_correction, result, as_of);
    println!("{report}");

    if let (Some(path), Some(samples)) = (plot, samples) {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || {
            plot_terminal_distribution(&samples, params.current_price, result.expected_price, &path)
        })
        .await?
        .map_err(|e| anyhow::anyhow!(e))
        .context("plotting terminal prices")?;
    }

    Ok(())
}
