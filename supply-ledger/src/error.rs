//! Error types for the ledger

use crate::types::TransactionStatus;
use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
#[derive(Error, Debug)]
pub enum Error {
    /// Identifier (or the manufacturer slot) is already taken
    #[error("Registration conflict: {0}")]
    RegistrationConflict(String),

    /// Distributor already has an in-flight transaction
    #[error("Distributor {0} already has a pending transaction")]
    DuplicatePendingTransaction(String),

    /// Dispatch/receipt event has no pending transaction in the expected status
    #[error("No matching transaction: {0}")]
    NoMatchingTransaction(String),

    /// Consensus round attempted with zero registered nodes
    #[error("No validators available")]
    NoValidatorsAvailable,

    /// Client or distributor is not registered
    #[error("Unknown party: {0}")]
    UnknownParty(String),

    /// Status change not allowed by the transition table
    #[error("Invalid transition: {from} -> {to}")]
    InvalidTransition {
        /// Current status
        from: TransactionStatus,
        /// Requested status
        to: TransactionStatus,
    },

    /// Negative stake or otherwise unusable amount
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Chain linkage or block integrity broken
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Concurrency error (actor mailbox closed, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether the caller may retry after fixing the precondition.
    ///
    /// An invariant violation means the in-memory chain can no longer be
    /// trusted and the process should stop.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Error::InvariantViolation(_))
    }
}
