use chrono::{DateTime, Local};
use std::fmt;

use crate::models::brownian::price_at_quantile;
use crate::models::{DriftCorrection, SimulationParameters, SimulationResult};

pub const TIMESTAMP_FORMAT: &str = "%H:%M:%S %d-%m-%Y";
const RULE: &str = "=========================================================";

/// Console summary of one forecast
#[derive(Debug, Clone)]
pub struct ForecastReport {
    pub symbol: String,
    pub price: f64,
    pub result: SimulationResult,
    pub as_of: DateTime<Local>,
    /// 5% and 95% terminal price quantiles
    pub band: (f64, f64),
}

impl ForecastReport {
    pub fn new(
        symbol: impl Into<String>,
        params: &SimulationParameters,
        correction: DriftCorrection,
        result: SimulationResult,
        as_of: DateTime<Local>,
    ) -> Self {
        let quantile = |q| {
            price_at_quantile(
                params.current_price,
                params.mean,
                params.volatility,
                params.time_step,
                q,
                correction,
            )
        };
        Self {
            symbol: symbol.into(),
            price: params.current_price,
            result,
            as_of,
            band: (quantile(0.05), quantile(0.95)),
        }
    }
}

impl fmt::Display for ForecastReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stamp = self.as_of.format(TIMESTAMP_FORMAT);
        writeln!(f, "{RULE}")?;
        writeln!(f, "Stock chosen: {}", self.symbol)?;
        writeln!(f, "Price as of {} is {:.4}", stamp, self.price)?;
        writeln!(
            f,
            "Price one step from {} is expected to be: {:.4}",
            stamp, self.result.expected_price
        )?;
        if let Some(se) = self.result.standard_error {
            writeln!(
                f,
                "Standard error: {:.4} ({} trials)",
                se, self.result.iterations
            )?;
        }
        writeln!(f, "90% band: {:.4} - {:.4}", self.band.0, self.band.1)?;
        write!(f, "{RULE}")
    }
}
