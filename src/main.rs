use anyhow::Context;
use clap::Parser;
use driftflow::cli::{Cli, Commands};
use driftflow::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load_or_default(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;

    driftflow::telemetry::init_logging(&config.telemetry)?;
    tracing::debug!(path = %cli.config.display(), "configuration loaded");

    match cli.command {
        Commands::Forecast(args) => args.execute(&config).await?,
        Commands::Simulate(args) => args.execute(&config).await?,
        Commands::Config => {
            println!("Current configuration:");
            print!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
