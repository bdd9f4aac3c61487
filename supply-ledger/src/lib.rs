//! Supply Ledger Core
//!
//! In-memory supply-chain ledger: trade transactions between a manufacturer,
//! distributors and clients, sealed into a hash-linked chain by a
//! stake-weighted validator, with a dispute pass that penalizes the party whose
//! claim does not match the recorded dispatch/receipt events.
//!
//! # Architecture
//!
//! - **Blockchain**: aggregate root owning chain, pending and confirmed sets
//! - **Single Writer**: one actor task serializes every ledger operation
//! - **Merkle Root**: ordered pairwise SHA-256 aggregation of transactions
//! - **Proof of Stake**: deterministic max-stake validator pick plus reward
//!
//! # Invariants
//!
//! - At most one pending transaction per distributor
//! - Every non-genesis block links to its predecessor's digest
//! - Confirmed set is emptied exactly when a block is sealed from it
//! - Exactly one reward per sealed block

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod types;
pub mod canonical;
pub mod merkle;
pub mod block;
pub mod registry;
pub mod dispute;
pub mod consensus;
pub mod blockchain;
pub mod snapshot;
pub mod error;
pub mod actor;
pub mod ledger;
pub mod config;
pub mod metrics;

// Re-exports
pub use error::{Error, Result};
pub use types::{Digest, Party, Transaction, TransactionStatus};
pub use block::Block;
pub use blockchain::Blockchain;
pub use ledger::Ledger;
pub use config::Config;
