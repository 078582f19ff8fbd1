use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod config;
mod daemon;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let cli = cli::Cli::parse();
    let config = config::DaemonConfig::load(cli.config.as_deref())?;
    daemon::run(config).await
}
