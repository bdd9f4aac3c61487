//! Core types for the ledger
//!
//! All types are designed for:
//! - Deterministic hashing (see [`crate::canonical`])
//! - Explicit lifecycles (closed status enum with a transition table)
//! - Exact arithmetic (Decimal for money and stake)

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use uuid::Uuid;

/// SHA-256 output used for Merkle roots, block digests and chain linkage
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest([u8; 32]);

impl Digest {
    /// All-zero digest, stands in for the missing parent of the genesis block
    pub const ZERO: Digest = Digest([0u8; 32]);

    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex rendering
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from a 64-character hex string
    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = hex::decode(s).ok()?;
        let bytes: [u8; 32] = bytes.try_into().ok()?;
        Some(Self(bytes))
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Digest::from_hex(&s).ok_or_else(|| serde::de::Error::custom("expected 32-byte hex digest"))
    }
}

/// Transaction status
///
/// Forward-only lifecycle. `Rejected` is reached only through dispute
/// resolution, directly from `Created` or `Dispatched`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TransactionStatus {
    /// Submitted, waiting for the distributor to dispatch
    Created = 1,
    /// Distributor claims the product left
    Dispatched = 2,
    /// Client acknowledged receipt
    Received = 3,
    /// Accepted by dispute resolution (terminal)
    Confirmed = 4,
    /// Dropped by dispute resolution (terminal)
    Rejected = 5,
}

impl TransactionStatus {
    /// Check the transition table
    pub fn can_transition_to(self, next: TransactionStatus) -> bool {
        use TransactionStatus::*;
        matches!(
            (self, next),
            (Created, Dispatched)
                | (Dispatched, Received)
                | (Received, Confirmed)
                | (Created, Rejected)
                | (Dispatched, Rejected)
        )
    }

    /// Check if status is terminal
    pub fn is_terminal(self) -> bool {
        matches!(self, TransactionStatus::Confirmed | TransactionStatus::Rejected)
    }

    /// Status name
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionStatus::Created => "Created",
            TransactionStatus::Dispatched => "Dispatched",
            TransactionStatus::Received => "Received",
            TransactionStatus::Confirmed => "Confirmed",
            TransactionStatus::Rejected => "Rejected",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle timestamps of a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamps {
    /// Submission time
    pub created: DateTime<Utc>,
    /// Set when the distributor records dispatch
    pub dispatched: Option<DateTime<Utc>>,
    /// Set when the client records receipt
    pub received: Option<DateTime<Utc>>,
}

/// One trade of a product from a distributor to a client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    tx_id: Uuid,
    product_id: String,
    manufacturer_id: String,
    distributor_id: String,
    client_id: String,
    amount: Option<Decimal>,
    status: TransactionStatus,
    timestamps: Timestamps,
}

impl Transaction {
    /// Create a new transaction in `Created` status, stamped now
    pub fn new(
        manufacturer_id: impl Into<String>,
        distributor_id: impl Into<String>,
        client_id: impl Into<String>,
        product_id: impl Into<String>,
        amount: Option<Decimal>,
    ) -> Self {
        Self {
            tx_id: Uuid::now_v7(),
            product_id: product_id.into(),
            manufacturer_id: manufacturer_id.into(),
            distributor_id: distributor_id.into(),
            client_id: client_id.into(),
            amount,
            status: TransactionStatus::Created,
            timestamps: Timestamps {
                created: Utc::now(),
                dispatched: None,
                received: None,
            },
        }
    }

    /// Transaction ID
    pub fn tx_id(&self) -> Uuid {
        self.tx_id
    }

    /// Product identifier
    pub fn product_id(&self) -> &str {
        &self.product_id
    }

    /// Manufacturer identifier
    pub fn manufacturer_id(&self) -> &str {
        &self.manufacturer_id
    }

    /// Distributor identifier
    pub fn distributor_id(&self) -> &str {
        &self.distributor_id
    }

    /// Client identifier
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Trade amount
    pub fn amount(&self) -> Option<Decimal> {
        self.amount
    }

    /// Current status
    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    /// Lifecycle timestamps
    pub fn timestamps(&self) -> &Timestamps {
        &self.timestamps
    }

    /// Distributor shipped the product
    pub fn dispatch(&mut self) -> crate::Result<()> {
        self.transition(TransactionStatus::Dispatched)?;
        self.timestamps.dispatched = Some(Utc::now());
        Ok(())
    }

    /// Client acknowledged receipt
    pub fn receive(&mut self) -> crate::Result<()> {
        self.transition(TransactionStatus::Received)?;
        self.timestamps.received = Some(Utc::now());
        Ok(())
    }

    pub(crate) fn confirm(&mut self) -> crate::Result<()> {
        self.transition(TransactionStatus::Confirmed)
    }

    pub(crate) fn reject(&mut self) -> crate::Result<()> {
        self.transition(TransactionStatus::Rejected)
    }

    fn transition(&mut self, next: TransactionStatus) -> crate::Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(crate::Error::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}

/// A participant whose balance dispute resolution can adjust
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Party {
    /// Distributor by ID
    Distributor(String),
    /// Client by ID
    Client(String),
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Party::Distributor(id) => write!(f, "distributor {}", id),
            Party::Client(id) => write!(f, "client {}", id),
        }
    }
}

/// Validator node with staked coins
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    node_id: String,
    staked_coins: Decimal,
}

impl Node {
    pub(crate) fn new(node_id: impl Into<String>, staked_coins: Decimal) -> Self {
        Self {
            node_id: node_id.into(),
            staked_coins,
        }
    }

    /// Node ID
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Staked coins
    pub fn staked_coins(&self) -> Decimal {
        self.staked_coins
    }

    /// Stake after adding `amount`, without applying it
    pub(crate) fn stake_after(&self, amount: Decimal) -> crate::Result<Decimal> {
        self.staked_coins.checked_add(amount).ok_or_else(|| {
            crate::Error::InvalidAmount(format!(
                "stake of node {} overflows when adding {}",
                self.node_id, amount
            ))
        })
    }

    pub(crate) fn add_stake(&mut self, amount: Decimal) -> crate::Result<Decimal> {
        self.staked_coins = self.stake_after(amount)?;
        Ok(self.staked_coins)
    }
}

/// Account holder with a signed balance (clients and distributors)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    id: String,
    balance: Decimal,
}

impl Account {
    pub(crate) fn new(id: impl Into<String>, deposit: Decimal) -> Self {
        Self {
            id: id.into(),
            balance: deposit,
        }
    }

    /// Account ID
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current balance, may be negative after penalties
    pub fn balance(&self) -> Decimal {
        self.balance
    }

    /// Balance after subtracting `amount`, without applying it
    pub(crate) fn balance_after_debit(&self, amount: Decimal) -> crate::Result<Decimal> {
        self.balance.checked_sub(amount).ok_or_else(|| {
            crate::Error::InvalidAmount(format!(
                "balance of {} overflows when debiting {}",
                self.id, amount
            ))
        })
    }

    pub(crate) fn debit(&mut self, amount: Decimal) -> crate::Result<Decimal> {
        self.balance = self.balance_after_debit(amount)?;
        Ok(self.balance)
    }
}

/// Client account
pub type Client = Account;

/// Distributor account
pub type Distributor = Account;

/// Manufacturer singleton
pub type Manufacturer = Account;
