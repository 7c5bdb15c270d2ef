use serde_json::Value;
use statrs::statistics::Statistics;
use tracing::{debug, info, instrument};

use crate::error::DataError;

pub const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";

/// Drift and dispersion of per-period log returns
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReturnStatistics {
    pub mean: f64,
    pub volatility: f64,
    /// Number of log returns used
    pub observations: usize,
}

/// Current price plus the return statistics of its history
#[derive(Debug, Clone, PartialEq)]
pub struct MarketSnapshot {
    pub symbol: String,
    pub price: f64,
    pub statistics: ReturnStatistics,
}

fn usable(price: Option<f64>) -> Option<f64> {
    price.filter(|p| p.is_finite() && *p > 0.0)
}

/// `ln(p[t] / p[t-1])` for consecutive closes.
///
/// A missing or unusable close drops both returns next to it; no return
/// spans a gap.
pub fn log_returns(prices: &[Option<f64>]) -> Vec<f64> {
    prices
        .windows(2)
        .filter_map(|w| match (usable(w[0]), usable(w[1])) {
            (Some(prev), Some(next)) => Some((next / prev).ln()),
            _ => None,
        })
        .collect()
}

/// Sample mean and sample standard deviation of the log returns
pub fn return_statistics(prices: &[Option<f64>]) -> Result<ReturnStatistics, DataError> {
    let returns = log_returns(prices);
    if returns.len() < 2 {
        return Err(DataError::InsufficientHistory {
            needed: 2,
            got: returns.len(),
        });
    }

    Ok(ReturnStatistics {
        mean: returns.iter().mean(),
        volatility: returns.iter().std_dev(),
        observations: returns.len(),
    })
}

/// Closing prices from a chart response; null closes stay as `None`
pub fn parse_chart_closes(body: &Value) -> Result<Vec<Option<f64>>, DataError> {
    let chart = body.get("chart").ok_or(DataError::MissingField("chart"))?;

    if let Some(error) = chart.get("error").filter(|e| !e.is_null()) {
        let message = error["description"]
            .as_str()
            .map(str::to_owned)
            .unwrap_or_else(|| error.to_string());
        return Err(DataError::Provider(message));
    }

    let closes = chart["result"][0]["indicators"]["quote"][0]["close"]
        .as_array()
        .ok_or(DataError::MissingField("close"))?;

    Ok(closes.iter().map(Value::as_f64).collect())
}

/// Client for the chart endpoint of the market-data provider
#[derive(Debug, Clone)]
pub struct MarketDataClient {
    client: reqwest::Client,
    base_url: String,
}

impl MarketDataClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        }
    }

    /// Daily closes over `range` (e.g. "1y", "6mo", "1d")
    #[instrument(skip(self))]
    pub async fn fetch_closes(
        &self,
        symbol: &str,
        range: &str,
    ) -> Result<Vec<Option<f64>>, DataError> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);

        let body = self
            .client
            .get(&url)
            .query(&[("range", range), ("interval", "1d")])
            .header("User-Agent", "Mozilla/5.0")
            .send()
            .await?
            .json::<Value>()
            .await?;

        let closes = parse_chart_closes(&body)?;
        debug!(count = closes.len(), "fetched closes");
        Ok(closes)
    }

    /// Latest close of the one-day history
    pub async fn fetch_stock_price(&self, symbol: &str) -> Result<f64, DataError> {
        self.fetch_closes(symbol, "1d")
            .await?
            .into_iter()
            .rev()
            .find_map(usable)
            .ok_or(DataError::InsufficientHistory { needed: 1, got: 0 })
    }

    /// Current price and return statistics, fetched concurrently
    pub async fn fetch_snapshot(
        &self,
        symbol: &str,
        range: &str,
    ) -> Result<MarketSnapshot, DataError> {
        let (price, history) = futures::try_join!(
            self.fetch_stock_price(symbol),
            self.fetch_closes(symbol, range)
        )?;
        let statistics = return_statistics(&history)?;

        info!(
            symbol,
            price,
            mean = statistics.mean,
            volatility = statistics.volatility,
            "market snapshot ready"
        );

        Ok(MarketSnapshot {
            symbol: symbol.to_owned(),
            price,
            statistics,
        })
    }
}

impl Default for MarketDataClient {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn closes(prices: &[f64]) -> Vec<Option<f64>> {
        prices.iter().copied().map(Some).collect()
    }

    #[test]
    fn test_log_returns() {
        let r = log_returns(&closes(&[100.0, 110.0, 99.0]));
        assert_eq!(r.len(), 2);
        assert!((r[0] - (1.1f64).ln()).abs() < 1e-12);
        assert!((r[1] - (0.9f64).ln()).abs() < 1e-12);
    }

    #[test]
    fn test_log_returns_skip_bad_prices() {
        let r = log_returns(&closes(&[100.0, 0.0, 101.0, 102.0]));
        assert_eq!(r.len(), 1);
    }

    #[test]
    fn test_log_returns_do_not_span_gaps() {
        let r = log_returns(&[Some(100.0), Some(101.0), None, Some(120.0), Some(121.0)]);
        assert_eq!(r.len(), 2);
        assert!((r[0] - (1.01f64).ln()).abs() < 1e-12);
        assert!((r[1] - (121.0f64 / 120.0).ln()).abs() < 1e-12);
    }

    #[test]
    fn test_return_statistics_uses_sample_std() {
        let prices = closes(&[100.0, 101.0, 100.0, 102.0, 101.5]);
        let stats = return_statistics(&prices).unwrap();
        let r = log_returns(&prices);
        let mean = r.iter().sum::<f64>() / r.len() as f64;
        let var = r.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (r.len() as f64 - 1.0);
        assert!((stats.mean - mean).abs() < 1e-12);
        assert!((stats.volatility - var.sqrt()).abs() < 1e-12);
        assert_eq!(stats.observations, 4);
    }

    #[test]
    fn test_return_statistics_needs_history() {
        let err = return_statistics(&closes(&[100.0, 101.0])).unwrap_err();
        assert!(matches!(err, DataError::InsufficientHistory { needed: 2, got: 1 }));
    }

    #[test]
    fn test_insufficient_history_counts_usable_returns() {
        let err = return_statistics(&closes(&[100.0, 0.0, 101.0, 102.0])).unwrap_err();
        assert!(matches!(err, DataError::InsufficientHistory { needed: 2, got: 1 }));
    }

    #[test]
    fn test_parse_chart_closes() {
        let body = json!({
            "chart": {
                "result": [{
                    "meta": { "symbol": "AAPL" },
                    "indicators": { "quote": [{ "close": [189.5, null, 190.25] }] }
                }],
                "error": null
            }
        });
        assert_eq!(
            parse_chart_closes(&body).unwrap(),
            vec![Some(189.5), None, Some(190.25)]
        );
    }

    #[test]
    fn test_parse_chart_provider_error() {
        let body = json!({
            "chart": {
                "result": null,
                "error": { "code": "Not Found", "description": "No data found, symbol may be delisted" }
            }
        });
        match parse_chart_closes(&body) {
            Err(DataError::Provider(msg)) => assert!(msg.contains("delisted")),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_parse_chart_missing_quote() {
        let body = json!({ "chart": { "result": [{}], "error": null } });
        assert!(matches!(
            parse_chart_closes(&body),
            Err(DataError::MissingField("close"))
        ));
    }

    #[test]
    fn test_client_trims_base_url() {
        let client = MarketDataClient::new("http://localhost:9000/");
        assert_eq!(client.base_url, "http://localhost:9000");
    }
}
