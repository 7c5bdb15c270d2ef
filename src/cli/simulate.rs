//! Simulate command implementation

use clap::Args;

use super::EngineArgs;
use crate::config::Config;
use crate::data_fetch::ReturnStatistics;

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Current price
    #[arg(long)]
    pub price: f64,

    /// Mean of per-period log returns
    #[arg(long, allow_negative_numbers = true)]
    pub mean: f64,

    /// Standard deviation of per-period log returns
    #[arg(long)]
    pub volatility: f64,

    /// Label shown in the report
    #[arg(long, default_value = "custom")]
    pub label: String,

    #[command(flatten)]
    pub engine: EngineArgs,
}

impl SimulateArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let stats = ReturnStatistics {
            mean: self.mean,
            volatility: self.volatility,
            observations: 0,
        };
        let sim = self.engine.apply(&config.simulation);
        let params = sim.parameters(self.price, &stats);
        super::forecast(&self.label, &sim, params, self.engine.plot.as_deref()).await
    }
}
