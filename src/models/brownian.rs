//! Closed-form Geometric Brownian Motion
//!
//! S_T = S_0 * exp((mu - k * sigma^2) * t + sigma * W), W = z * sqrt(t)

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};

/// Variance term subtracted from the drift in the exponent
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriftCorrection {
    /// `mu - sigma^2`, the historical behaviour of the forecaster
    #[default]
    Literal,
    /// `mu - sigma^2 / 2`, the Itô-corrected exact solution
    Ito,
}

impl DriftCorrection {
    /// Multiplier applied to `sigma^2`
    pub fn factor(self) -> f64 {
        match self {
            DriftCorrection::Literal => 1.0,
            DriftCorrection::Ito => 0.5,
        }
    }
}

/// Inverse CDF of the standard normal distribution
pub fn standard_normal_quantile(u: f64) -> f64 {
    Normal::standard().inverse_cdf(u)
}

/// Exponent of the GBM solution for a single standard normal draw.
pub fn exponent(
    mean: f64,
    volatility: f64,
    time_step: f64,
    draw: f64,
    correction: DriftCorrection,
) -> f64 {
    let w = draw * time_step.sqrt();
    (mean - correction.factor() * volatility * volatility) * time_step + volatility * w
}

/// Terminal price after `time_step` for one standard normal draw.
pub fn terminal_price(
    s0: f64,
    mean: f64,
    volatility: f64,
    time_step: f64,
    draw: f64,
    correction: DriftCorrection,
) -> f64 {
    s0 * exponent(mean, volatility, time_step, draw, correction).exp()
}

/// E[S_T] under the chosen correction: S_0 * exp((mu - k*sigma^2 + sigma^2/2) * t)
pub fn analytic_expectation(
    s0: f64,
    mean: f64,
    volatility: f64,
    time_step: f64,
    correction: DriftCorrection,
) -> f64 {
    let variance = volatility * volatility;
    s0 * ((mean - correction.factor() * variance + 0.5 * variance) * time_step).exp()
}

/// Terminal price at the given quantile of the normal draw.
pub fn price_at_quantile(
    s0: f64,
    mean: f64,
    volatility: f64,
    time_step: f64,
    quantile: f64,
    correction: DriftCorrection,
) -> f64 {
    let z = standard_normal_quantile(quantile);
    terminal_price(s0, mean, volatility, time_step, z, correction)
}
