//! citizen-store - Main entry point.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use citizen_store::{
    cli::{Cli, run_command},
    config::Config,
    store::Store,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.command.default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!("{}", e))?;
    let store = Store::new(&config.database);
    tracing::debug!(backend = store.dialect().name, "Using database backend");

    run_command(cli.command, &store, cli.json).await
}
