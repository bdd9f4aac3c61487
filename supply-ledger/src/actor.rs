//! Actor-based concurrency for the ledger
//!
//! This module implements the single-writer pattern using Tokio actors:
//! - One task owns the [`Blockchain`]; nothing else can touch it
//! - Every operation, read or write, runs to completion before the next
//! - Async message passing with backpressure (bounded mailbox)
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │          Callers (CLI, services, tests)              │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │               LedgerHandle (Clone)                   │
//! │         Sends messages to actor mailbox              │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       │ mpsc::channel (bounded)
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │              LedgerActor (Single Task)               │
//! │   submit / dispatch / receive / resolve / seal       │
//! │                       │                              │
//! │                       ▼                              │
//! │        Blockchain (chain, pending, confirmed)        │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! A dispute pass or consensus round is a single message, so no submission
//! can interleave with it and the stake of the chosen validator cannot change
//! between selection and reward.

use crate::block::Block;
use crate::consensus::SealedRound;
use crate::dispute::ResolutionOutcome;
use crate::metrics::Metrics;
use crate::registry::BalanceSheet;
use crate::types::Transaction;
use crate::{Blockchain, Error, Result};
use rust_decimal::Decimal;
use tokio::sync::{mpsc, oneshot};

type Reply<T> = oneshot::Sender<Result<T>>;

/// Message sent to the ledger actor
#[derive(Debug)]
pub enum LedgerMessage {
    /// Register the manufacturer singleton
    RegisterManufacturer {
        deposit: Decimal,
        response: Reply<()>,
    },

    /// Register a distributor
    RegisterDistributor {
        id: String,
        deposit: Decimal,
        response: Reply<()>,
    },

    /// Register a client
    RegisterClient {
        id: String,
        deposit: Decimal,
        response: Reply<()>,
    },

    /// Register a validator node
    RegisterNode {
        id: String,
        stake: Decimal,
        response: Reply<()>,
    },

    /// Add stake to a node
    Stake {
        node_id: String,
        amount: Decimal,
        response: Reply<Decimal>,
    },

    /// Submit a transaction
    Submit {
        distributor_id: String,
        client_id: String,
        product_id: String,
        amount: Option<Decimal>,
        response: Reply<Transaction>,
    },

    /// Distributor dispatched
    RecordDispatch {
        distributor_id: String,
        response: Reply<Transaction>,
    },

    /// Client received
    RecordReceipt {
        client_id: String,
        response: Reply<Transaction>,
    },

    /// Run dispute resolution
    ResolveDisputes {
        response: Reply<ResolutionOutcome>,
    },

    /// Run one consensus round
    SealBlock {
        response: Reply<SealedRound>,
    },

    /// Get pending transactions
    GetPending {
        response: Reply<Vec<Transaction>>,
    },

    /// Get confirmed, not yet sealed transactions
    GetConfirmed {
        response: Reply<Vec<Transaction>>,
    },

    /// Get the full chain
    GetChain {
        response: Reply<Vec<Block>>,
    },

    /// Get latest block
    GetLatestBlock {
        response: Reply<Block>,
    },

    /// Get balances
    GetBalances {
        response: Reply<BalanceSheet>,
    },

    /// Find transaction by distributor and client
    FindTransaction {
        distributor_id: String,
        client_id: String,
        response: Reply<Option<Transaction>>,
    },

    /// Verify chain linkage and integrity
    VerifyChain {
        response: Reply<()>,
    },

    /// Shutdown actor
    Shutdown,
}

/// Actor that processes ledger messages
#[derive(Debug)]
pub struct LedgerActor {
    /// Ledger state, owned exclusively by this task
    blockchain: Blockchain,

    /// Mailbox for incoming messages
    mailbox: mpsc::Receiver<LedgerMessage>,

    /// Metrics
    metrics: Metrics,
}

impl LedgerActor {
    /// Create new actor
    pub fn new(
        blockchain: Blockchain,
        mailbox: mpsc::Receiver<LedgerMessage>,
        metrics: Metrics,
    ) -> Self {
        Self {
            blockchain,
            mailbox,
            metrics,
        }
    }

    /// Run the actor event loop until shutdown, mailbox close, or a fatal error
    pub async fn run(mut self) {
        while let Some(msg) = self.mailbox.recv().await {
            if let LedgerMessage::Shutdown = msg {
                tracing::info!("Ledger actor shutting down");
                break;
            }
            if let Err(e) = self.handle_message(msg) {
                tracing::error!("Fatal ledger error, stopping actor: {}", e);
                break;
            }
        }
        self.mailbox.close();
    }

    /// Handle a single message. Returns an error only for fatal conditions.
    fn handle_message(&mut self, msg: LedgerMessage) -> Result<()> {
        let bc = &mut self.blockchain;
        match msg {
            LedgerMessage::RegisterManufacturer { deposit, response } => {
                reply(response, bc.register_manufacturer(deposit))
            }

            LedgerMessage::RegisterDistributor { id, deposit, response } => {
                reply(response, bc.register_distributor(id, deposit))
            }

            LedgerMessage::RegisterClient { id, deposit, response } => {
                reply(response, bc.register_client(id, deposit))
            }

            LedgerMessage::RegisterNode { id, stake, response } => {
                reply(response, bc.register_node(id, stake))
            }

            LedgerMessage::Stake { node_id, amount, response } => {
                reply(response, bc.stake(&node_id, amount))
            }

            LedgerMessage::Submit {
                distributor_id,
                client_id,
                product_id,
                amount,
                response,
            } => {
                let result = bc.submit(&distributor_id, &client_id, &product_id, amount);
                self.metrics.record_submission(result.is_ok());
                self.metrics.set_pending(bc.pending().len());
                reply(response, result)
            }

            LedgerMessage::RecordDispatch { distributor_id, response } => {
                reply(response, bc.record_dispatch(&distributor_id))
            }

            LedgerMessage::RecordReceipt { client_id, response } => {
                reply(response, bc.record_receipt(&client_id))
            }

            LedgerMessage::ResolveDisputes { response } => {
                let result = bc.resolve_disputes();
                if let Ok(outcome) = &result {
                    self.metrics
                        .record_resolution(outcome.confirmed.len(), outcome.penalties.len());
                }
                self.metrics.set_pending(bc.pending().len());
                reply(response, result)
            }

            LedgerMessage::SealBlock { response } => {
                let result = bc.seal_block();
                if result.is_ok() {
                    self.metrics.record_block_sealed();
                }
                reply(response, result)
            }

            LedgerMessage::GetPending { response } => reply(response, Ok(bc.pending().to_vec())),

            LedgerMessage::GetConfirmed { response } => {
                reply(response, Ok(bc.confirmed().to_vec()))
            }

            LedgerMessage::GetChain { response } => reply(response, Ok(bc.chain().to_vec())),

            LedgerMessage::GetLatestBlock { response } => {
                reply(response, Ok(bc.latest_block().clone()))
            }

            LedgerMessage::GetBalances { response } => reply(response, Ok(bc.balances())),

            LedgerMessage::FindTransaction {
                distributor_id,
                client_id,
                response,
            } => {
                let found = bc.find_transaction(&distributor_id, &client_id).cloned();
                reply(response, Ok(found))
            }

            LedgerMessage::VerifyChain { response } => reply(response, bc.verify_chain()),

            LedgerMessage::Shutdown => {
                // Handled in main loop
                Ok(())
            }
        }
    }
}

/// Send the result back; a non-recoverable error is also returned to the loop
fn reply<T>(response: Reply<T>, result: Result<T>) -> Result<()> {
    let fatal = match &result {
        Err(e) if !e.is_recoverable() => Some(Error::InvariantViolation(e.to_string())),
        _ => None,
    };
    // Caller may have gone away; nothing to do then
    let _ = response.send(result);
    match fatal {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Handle for sending messages to the actor
#[derive(Clone, Debug)]
pub struct LedgerHandle {
    sender: mpsc::Sender<LedgerMessage>,
}

impl LedgerHandle {
    /// Create new handle
    pub fn new(sender: mpsc::Sender<LedgerMessage>) -> Self {
        Self { sender }
    }

    async fn request<T>(&self, build: impl FnOnce(Reply<T>) -> LedgerMessage) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(build(tx))
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Register the manufacturer singleton
    pub async fn register_manufacturer(&self, deposit: Decimal) -> Result<()> {
        self.request(|response| LedgerMessage::RegisterManufacturer { deposit, response })
            .await
    }

    /// Register a distributor
    pub async fn register_distributor(&self, id: impl Into<String>, deposit: Decimal) -> Result<()> {
        let id = id.into();
        self.request(|response| LedgerMessage::RegisterDistributor { id, deposit, response })
            .await
    }

    /// Register a client
    pub async fn register_client(&self, id: impl Into<String>, deposit: Decimal) -> Result<()> {
        let id = id.into();
        self.request(|response| LedgerMessage::RegisterClient { id, deposit, response })
            .await
    }

    /// Register a validator node
    pub async fn register_node(&self, id: impl Into<String>, stake: Decimal) -> Result<()> {
        let id = id.into();
        self.request(|response| LedgerMessage::RegisterNode { id, stake, response })
            .await
    }

    /// Add stake to a node
    pub async fn stake(&self, node_id: impl Into<String>, amount: Decimal) -> Result<Decimal> {
        let node_id = node_id.into();
        self.request(|response| LedgerMessage::Stake {
            node_id,
            amount,
            response,
        })
        .await
    }

    /// Submit a transaction
    pub async fn submit(
        &self,
        distributor_id: impl Into<String>,
        client_id: impl Into<String>,
        product_id: impl Into<String>,
        amount: Option<Decimal>,
    ) -> Result<Transaction> {
        let (distributor_id, client_id, product_id) =
            (distributor_id.into(), client_id.into(), product_id.into());
        self.request(|response| LedgerMessage::Submit {
            distributor_id,
            client_id,
            product_id,
            amount,
            response,
        })
        .await
    }

    /// Record dispatch by a distributor
    pub async fn record_dispatch(&self, distributor_id: impl Into<String>) -> Result<Transaction> {
        let distributor_id = distributor_id.into();
        self.request(|response| LedgerMessage::RecordDispatch {
            distributor_id,
            response,
        })
        .await
    }

    /// Record receipt by a client
    pub async fn record_receipt(&self, client_id: impl Into<String>) -> Result<Transaction> {
        let client_id = client_id.into();
        self.request(|response| LedgerMessage::RecordReceipt { client_id, response })
            .await
    }

    /// Run dispute resolution
    pub async fn resolve_disputes(&self) -> Result<ResolutionOutcome> {
        self.request(|response| LedgerMessage::ResolveDisputes { response })
            .await
    }

    /// Run one consensus round
    pub async fn seal_block(&self) -> Result<SealedRound> {
        self.request(|response| LedgerMessage::SealBlock { response })
            .await
    }

    /// Get pending transactions
    pub async fn pending(&self) -> Result<Vec<Transaction>> {
        self.request(|response| LedgerMessage::GetPending { response })
            .await
    }

    /// Get confirmed transactions awaiting the next block
    pub async fn confirmed(&self) -> Result<Vec<Transaction>> {
        self.request(|response| LedgerMessage::GetConfirmed { response })
            .await
    }

    /// Get the full chain
    pub async fn chain(&self) -> Result<Vec<Block>> {
        self.request(|response| LedgerMessage::GetChain { response })
            .await
    }

    /// Get latest block
    pub async fn latest_block(&self) -> Result<Block> {
        self.request(|response| LedgerMessage::GetLatestBlock { response })
            .await
    }

    /// Get balances
    pub async fn balances(&self) -> Result<BalanceSheet> {
        self.request(|response| LedgerMessage::GetBalances { response })
            .await
    }

    /// Find a transaction between a distributor and a client
    pub async fn find_transaction(
        &self,
        distributor_id: impl Into<String>,
        client_id: impl Into<String>,
    ) -> Result<Option<Transaction>> {
        let (distributor_id, client_id) = (distributor_id.into(), client_id.into());
        self.request(|response| LedgerMessage::FindTransaction {
            distributor_id,
            client_id,
            response,
        })
        .await
    }

    /// Verify chain linkage and integrity
    pub async fn verify_chain(&self) -> Result<()> {
        self.request(|response| LedgerMessage::VerifyChain { response })
            .await
    }

    /// Shutdown actor
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(LedgerMessage::Shutdown)
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;
        Ok(())
    }
}

/// Spawn the ledger actor
pub fn spawn_ledger_actor(
    blockchain: Blockchain,
    mailbox_capacity: usize,
    metrics: Metrics,
) -> LedgerHandle {
    let (tx, rx) = mpsc::channel(mailbox_capacity); // Bounded channel for backpressure
    let actor = LedgerActor::new(blockchain, rx, metrics);

    tokio::spawn(async move {
        actor.run().await;
    });

    LedgerHandle::new(tx)
}
