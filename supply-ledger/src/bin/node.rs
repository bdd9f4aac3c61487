//! Ledger node binary
//!
//! Loads configuration (from the file named by `SUPPLY_LEDGER_CONFIG`, else
//! from `SUPPLY_LEDGER_*` environment variables), applies the genesis
//! registrations and keeps the in-memory ledger alive until Ctrl-C.

use anyhow::Context;
use supply_ledger::{Config, Ledger};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting supply ledger node");

    // Load configuration
    let config = match std::env::var("SUPPLY_LEDGER_CONFIG") {
        Ok(path) => Config::from_file(&path)
            .with_context(|| format!("loading configuration from {}", path))?,
        Err(_) => Config::from_env().context("loading configuration from environment")?,
    };

    let ledger = Ledger::open(config.clone())?;
    ledger
        .bootstrap(&config.genesis)
        .await
        .context("applying genesis registrations")?;
    ledger.verify_chain().await?;

    let balances = ledger.balances().await?;
    tracing::info!(
        distributors = balances.distributors.len(),
        clients = balances.clients.len(),
        validators = balances.validators.len(),
        "Ledger ready"
    );

    tokio::signal::ctrl_c().await?;

    tracing::debug!("Final metrics:\n{}", ledger.metrics().gather_text());
    tracing::info!("Shutting down supply ledger node");
    ledger.shutdown().await?;
    Ok(())
}
