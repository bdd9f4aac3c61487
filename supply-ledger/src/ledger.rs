//! Main ledger orchestration layer
//!
//! Ties together the blockchain, the actor and metrics into the public
//! command surface: registrations, submissions, dispatch/receipt events,
//! dispute resolution, consensus rounds and queries.
//!
//! # Example
//!
//! ```no_run
//! use rust_decimal::Decimal;
//! use supply_ledger::{Config, Ledger};
//!
//! #[tokio::main]
//! async fn main() -> supply_ledger::Result<()> {
//!     let ledger = Ledger::open(Config::default())?;
//!
//!     ledger.register_distributor("D1", Decimal::from(5_000)).await?;
//!     ledger.register_client("C1", Decimal::from(2_000)).await?;
//!     ledger.register_node("N1", Decimal::from(30)).await?;
//!
//!     ledger.submit("D1", "C1", "P-100", Some(Decimal::from(50))).await?;
//!     ledger.record_dispatch("D1").await?;
//!     ledger.record_receipt("C1").await?;
//!     ledger.resolve_disputes().await?;
//!     ledger.seal_block().await?;
//!
//!     ledger.shutdown().await
//! }
//! ```

use crate::{
    actor::{spawn_ledger_actor, LedgerHandle},
    config::GenesisConfig,
    metrics::Metrics,
    snapshot::TransactionSnapshot,
    Blockchain, Config, Error, Result,
};
use std::ops::Deref;

/// Main ledger interface
#[derive(Debug)]
pub struct Ledger {
    /// Actor handle for all operations
    handle: LedgerHandle,

    /// Metrics shared with the actor
    metrics: Metrics,

    /// Configuration
    config: Config,
}

impl Ledger {
    /// Open an empty ledger (genesis block only) and start its actor.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        let metrics = Metrics::new()
            .map_err(|e| Error::Other(format!("Failed to create metrics: {}", e)))?;
        let blockchain = Blockchain::new(&config);
        let handle = spawn_ledger_actor(blockchain, config.actor.mailbox_capacity, metrics.clone());

        tracing::info!(
            service = %config.service_name,
            version = %config.service_version,
            manufacturer_id = %config.manufacturer_id,
            "Ledger opened"
        );

        Ok(Self {
            handle,
            metrics,
            config,
        })
    }

    /// Apply the startup registrations from [`GenesisConfig`]
    pub async fn bootstrap(&self, genesis: &GenesisConfig) -> Result<()> {
        if let Some(deposit) = genesis.manufacturer_deposit {
            self.handle.register_manufacturer(deposit).await?;
        }
        for distributor in &genesis.distributors {
            self.handle
                .register_distributor(distributor.id.clone(), distributor.deposit)
                .await?;
        }
        for client in &genesis.clients {
            self.handle
                .register_client(client.id.clone(), client.deposit)
                .await?;
        }
        for validator in &genesis.validators {
            self.handle
                .register_node(validator.id.clone(), validator.stake)
                .await?;
        }
        Ok(())
    }

    /// Plain-text snapshot of the transaction between a distributor and a client
    pub async fn snapshot(
        &self,
        distributor_id: impl Into<String>,
        client_id: impl Into<String>,
    ) -> Result<Option<TransactionSnapshot>> {
        let tx = self.handle.find_transaction(distributor_id, client_id).await?;
        Ok(tx.as_ref().map(TransactionSnapshot::from))
    }

    /// Actor handle, cloneable for concurrent callers
    pub fn handle(&self) -> LedgerHandle {
        self.handle.clone()
    }

    /// Metrics collector
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Shutdown ledger; in-memory state is discarded
    pub async fn shutdown(self) -> Result<()> {
        self.handle.shutdown().await
    }
}

impl Deref for Ledger {
    type Target = LedgerHandle;

    fn deref(&self) -> &Self::Target {
        &self.handle
    }
}
