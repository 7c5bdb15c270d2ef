//! Forecast command implementation

use anyhow::{bail, Context};
use clap::Args;
use std::io::{self, BufRead, Write};

use super::EngineArgs;
use crate::config::Config;
use crate::data_fetch::MarketDataClient;

#[derive(Args, Debug)]
pub struct ForecastArgs {
    /// Ticker symbol; prompted for when omitted
    pub symbol: Option<String>,

    /// History window for the return statistics (overrides config)
    #[arg(long)]
    pub range: Option<String>,

    #[command(flatten)]
    pub engine: EngineArgs,
}

impl ForecastArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let symbol = match &self.symbol {
            Some(symbol) => symbol.trim().to_owned(),
            None => prompt_symbol()?,
        };
        let range = self.range.as_deref().unwrap_or(&config.data.history_range);

        let client = MarketDataClient::new(config.data.base_url.as_str());
        let snapshot = client
            .fetch_snapshot(&symbol, range)
            .await
            .with_context(|| format!("fetching market data for {symbol}"))?;

        let sim = self.engine.apply(&config.simulation);
        let params = sim.parameters(snapshot.price, &snapshot.statistics);
        super::forecast(&symbol, &sim, params, self.engine.plot.as_deref()).await
    }
}

fn prompt_symbol() -> anyhow::Result<String> {
    print!("Enter stock name: ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let symbol = line.trim();
    if symbol.is_empty() {
        bail!("no ticker symbol given");
    }
    Ok(symbol.to_owned())
}
