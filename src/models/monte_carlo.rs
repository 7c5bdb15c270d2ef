//! Monte Carlo estimate of the one-step-ahead GBM price
//!
//! Each trial draws z ~ N(0,1), evolves the current price over `time_step`
//! with the closed-form solution and the trials are averaged.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::distr::Open01;
use rand::rngs::{StdRng, ThreadRng};
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use statrs::distribution::{ContinuousCDF, Normal};
use tracing::debug;

use super::brownian::{exponent, DriftCorrection};
use crate::error::SimulationError;

/// Inputs for one simulation run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationParameters {
    /// Latest observed price
    pub current_price: f64,
    /// Per-period mean of log returns
    pub mean: f64,
    /// Per-period standard deviation of log returns
    pub volatility: f64,
    /// Horizon as a fraction of a year
    pub time_step: f64,
    /// Number of independent trials
    pub iterations: usize,
}

impl SimulationParameters {
    /// Reject structurally invalid inputs
    pub fn validate(&self) -> Result<(), SimulationError> {
        if !(self.current_price.is_finite() && self.current_price > 0.0) {
            return Err(invalid("current_price", self.current_price, "must be finite and > 0"));
        }
        if !self.mean.is_finite() {
            return Err(invalid("mean", self.mean, "must be finite"));
        }
        if !(self.volatility.is_finite() && self.volatility >= 0.0) {
            return Err(invalid("volatility", self.volatility, "must be finite and >= 0"));
        }
        if !(self.time_step.is_finite() && self.time_step > 0.0) {
            return Err(invalid("time_step", self.time_step, "must be finite and > 0"));
        }
        if self.iterations == 0 {
            return Err(invalid("iterations", 0.0, "must be >= 1"));
        }
        Ok(())
    }

    fn overflow(&self, draw: Option<f64>) -> SimulationError {
        SimulationError::NumericOverflow {
            current_price: self.current_price,
            mean: self.mean,
            volatility: self.volatility,
            time_step: self.time_step,
            draw,
        }
    }
}

fn invalid(parameter: &'static str, value: f64, constraint: &'static str) -> SimulationError {
    SimulationError::InvalidParameter {
        parameter,
        value,
        constraint,
    }
}

/// Outcome of a run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationResult {
    /// Arithmetic mean of all terminal prices
    pub expected_price: f64,
    /// Standard error of `expected_price`; `None` for a single trial
    pub standard_error: Option<f64>,
    pub iterations: usize,
}

/// Source of standard normal draws
pub trait NormalSource {
    fn next_draw(&mut self) -> f64;
}

/// Normal draws by inverse-CDF sampling of a uniform on (0, 1)
#[derive(Debug, Clone)]
pub struct RngNormals<R> {
    rng: R,
    normal: Normal,
}

impl<R: Rng> RngNormals<R> {
    pub fn new(rng: R) -> Self {
        Self {
            rng,
            normal: Normal::standard(),
        }
    }
}

impl RngNormals<StdRng> {
    /// Reproducible stream
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl RngNormals<ThreadRng> {
    /// Thread-local generator seeded from the operating system
    pub fn from_entropy() -> Self {
        Self::new(rand::rng())
    }
}

impl<R: Rng> NormalSource for RngNormals<R> {
    fn next_draw(&mut self) -> f64 {
        let u: f64 = self.rng.sample(Open01);
        self.normal.inverse_cdf(u)
    }
}

/// Replays a fixed sequence of draws, wrapping around at the end.
///
/// An empty sequence yields `0.0` forever.
#[derive(Debug, Clone, Default)]
pub struct ReplayDraws {
    draws: Vec<f64>,
    pos: usize,
}

impl ReplayDraws {
    pub fn new(draws: Vec<f64>) -> Self {
        Self { draws, pos: 0 }
    }
}

impl NormalSource for ReplayDraws {
    fn next_draw(&mut self) -> f64 {
        if self.draws.is_empty() {
            return 0.0;
        }
        let draw = self.draws[self.pos];
        self.pos = (self.pos + 1) % self.draws.len();
        draw
    }
}

/// Running sums for one block of trials.
///
/// Squared deviations are taken around the current price to keep the
/// variance estimate away from catastrophic cancellation.
#[derive(Debug, Clone, Copy)]
struct Accumulator {
    shift: f64,
    count: usize,
    sum: f64,
    sum_dev: f64,
    sum_dev_sq: f64,
}

impl Accumulator {
    fn new(shift: f64) -> Self {
        Self {
            shift,
            count: 0,
            sum: 0.0,
            sum_dev: 0.0,
            sum_dev_sq: 0.0,
        }
    }

    fn push(&mut self, price: f64) {
        let dev = price - self.shift;
        self.count += 1;
        self.sum += price;
        self.sum_dev += dev;
        self.sum_dev_sq += dev * dev;
    }

    fn merge(&mut self, other: &Accumulator) {
        self.count += other.count;
        self.sum += other.sum;
        self.sum_dev += other.sum_dev;
        self.sum_dev_sq += other.sum_dev_sq;
    }

    fn finish(&self, params: &SimulationParameters) -> Result<SimulationResult, SimulationError> {
        if !self.sum.is_finite() {
            return Err(params.overflow(None));
        }
        let n = self.count as f64;
        let standard_error = (self.count > 1).then(|| {
            let variance = (self.sum_dev_sq - self.sum_dev * self.sum_dev / n) / (n - 1.0);
            (variance.max(0.0) / n).sqrt()
        });
        Ok(SimulationResult {
            expected_price: self.sum / n,
            standard_error,
            iterations: self.count,
        })
    }
}

/// Monte Carlo GBM engine
#[derive(Debug, Clone, Default)]
pub struct Simulation {
    correction: DriftCorrection,
    cancel: Option<Arc<AtomicBool>>,
}

impl Simulation {
    pub fn new(correction: DriftCorrection) -> Self {
        Self {
            correction,
            cancel: None,
        }
    }

    /// Stop between trials once `flag` is set
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn correction(&self) -> DriftCorrection {
        self.correction
    }

    /// Sequential run drawing from `source`
    pub fn run<S: NormalSource + ?Sized>(
        &self,
        params: &SimulationParameters,
        source: &mut S,
    ) -> Result<SimulationResult, SimulationError> {
        params.validate()?;
        debug!(
            price = params.current_price,
            mean = params.mean,
            volatility = params.volatility,
            iterations = params.iterations,
            correction = ?self.correction,
            "starting simulation"
        );

        if let Some(result) = self.deterministic(params) {
            return result;
        }

        let acc = self.run_block(params, params.iterations, source)?;
        let result = acc.finish(params)?;
        debug!(expected = result.expected_price, "simulation finished");
        Ok(result)
    }

    /// Trials split into `workers` contiguous blocks, block `k` drawing from
    /// `StdRng::seed_from_u64(seed + k)`.
    ///
    /// Block sums are reduced in block order, so the result depends only on
    /// `(seed, workers)` and never on thread scheduling. With one worker the
    /// result equals `run` over `RngNormals::seeded(seed)`.
    pub fn run_parallel(
        &self,
        params: &SimulationParameters,
        seed: u64,
        workers: usize,
    ) -> Result<SimulationResult, SimulationError> {
        params.validate()?;
        let workers = workers.clamp(1, params.iterations);
        debug!(
            price = params.current_price,
            iterations = params.iterations,
            workers,
            seed,
            "starting parallel simulation"
        );

        if let Some(result) = self.deterministic(params) {
            return result;
        }

        let base = params.iterations / workers;
        let extra = params.iterations % workers;
        let blocks: Vec<Result<Accumulator, SimulationError>> = (0..workers)
            .into_par_iter()
            .map(|k| {
                let trials = base + usize::from(k < extra);
                let mut source = RngNormals::seeded(seed.wrapping_add(k as u64));
                self.run_block(params, trials, &mut source)
            })
            .collect();

        let mut total = Accumulator::new(params.current_price);
        let mut cancelled = false;
        let mut completed = 0;
        for block in blocks {
            match block {
                Ok(acc) => {
                    completed += acc.count;
                    total.merge(&acc);
                }
                Err(SimulationError::Cancelled { completed: done }) => {
                    cancelled = true;
                    completed += done;
                }
                Err(e) => return Err(e),
            }
        }
        if cancelled {
            return Err(SimulationError::Cancelled { completed });
        }

        let result = total.finish(params)?;
        debug!(expected = result.expected_price, "parallel simulation finished");
        Ok(result)
    }

    /// Sequential run on a fixed seed, or parallel when `workers > 1`.
    /// Without a seed the stream is seeded from the operating system.
    pub fn run_seeded(
        &self,
        params: &SimulationParameters,
        seed: Option<u64>,
        workers: usize,
    ) -> Result<SimulationResult, SimulationError> {
        match (seed, workers) {
            (Some(seed), 0 | 1) => self.run(params, &mut RngNormals::seeded(seed)),
            (None, 0 | 1) => self.run(params, &mut RngNormals::from_entropy()),
            (seed, workers) => {
                let seed = seed.unwrap_or_else(|| rand::rng().random());
                self.run_parallel(params, seed, workers)
            }
        }
    }

    /// Sequential run that also returns every terminal price in trial order.
    ///
    /// `expected_price` is the mean of exactly the returned samples.
    pub fn run_with_samples<S: NormalSource + ?Sized>(
        &self,
        params: &SimulationParameters,
        source: &mut S,
    ) -> Result<(SimulationResult, Vec<f64>), SimulationError> {
        params.validate()?;

        if let Some(result) = self.deterministic(params) {
            let result = result?;
            return Ok((result, vec![result.expected_price; params.iterations]));
        }

        let mut samples = Vec::with_capacity(params.iterations);
        let mut acc = Accumulator::new(params.current_price);
        for i in 0..params.iterations {
            self.check_cancelled(i)?;
            let price = self.trial(params, source.next_draw())?;
            acc.push(price);
            samples.push(price);
        }
        Ok((acc.finish(params)?, samples))
    }

    fn run_block<S: NormalSource + ?Sized>(
        &self,
        params: &SimulationParameters,
        trials: usize,
        source: &mut S,
    ) -> Result<Accumulator, SimulationError> {
        let mut acc = Accumulator::new(params.current_price);
        for i in 0..trials {
            self.check_cancelled(i)?;
            acc.push(self.trial(params, source.next_draw())?);
        }
        Ok(acc)
    }

    fn trial(&self, params: &SimulationParameters, draw: f64) -> Result<f64, SimulationError> {
        let x = exponent(
            params.mean,
            params.volatility,
            params.time_step,
            draw,
            self.correction,
        );
        let price = params.current_price * x.exp();
        if !x.is_finite() || !price.is_finite() || price <= 0.0 {
            return Err(params.overflow(Some(draw)));
        }
        Ok(price)
    }

    // With zero volatility every trial lands on the same price.
    fn deterministic(
        &self,
        params: &SimulationParameters,
    ) -> Option<Result<SimulationResult, SimulationError>> {
        if params.volatility != 0.0 {
            return None;
        }
        let price = params.current_price * (params.mean * params.time_step).exp();
        if !price.is_finite() || price <= 0.0 {
            return Some(Err(params.overflow(None)));
        }
        Some(Ok(SimulationResult {
            expected_price: price,
            standard_error: (params.iterations > 1).then_some(0.0),
            iterations: params.iterations,
        }))
    }

    fn check_cancelled(&self, completed: usize) -> Result<(), SimulationError> {
        match &self.cancel {
            Some(flag) if flag.load(Ordering::Relaxed) => {
                Err(SimulationError::Cancelled { completed })
            }
            _ => Ok(()),
        }
    }
}

/// Single sequential run with the historical drift term
pub fn simulate<S: NormalSource + ?Sized>(
    params: &SimulationParameters,
    source: &mut S,
) -> Result<SimulationResult, SimulationError> {
    Simulation::default().run(params, source)
}
