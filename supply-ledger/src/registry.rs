//! Participant registry
//!
//! Holds client and distributor accounts, the manufacturer singleton and the
//! validator nodes. Registration is public; balance and stake mutation after
//! registration is crate-private and reserved to dispute resolution
//! (penalties, confirmation debits) and consensus (block reward).

use crate::types::{Account, Client, Distributor, Manufacturer, Node, Party};
use crate::{Error, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Registry of parties and validators
#[derive(Debug, Clone)]
pub struct Registry {
    manufacturer_id: String,
    manufacturer: Option<Manufacturer>,
    distributors: BTreeMap<String, Distributor>,
    clients: BTreeMap<String, Client>,
    /// Registration order is the consensus tie-break order
    nodes: Vec<Node>,
}

impl Registry {
    /// Create empty registry; `manufacturer_id` names the singleton slot
    pub fn new(manufacturer_id: impl Into<String>) -> Self {
        Self {
            manufacturer_id: manufacturer_id.into(),
            manufacturer: None,
            distributors: BTreeMap::new(),
            clients: BTreeMap::new(),
            nodes: Vec::new(),
        }
    }

    /// Fixed manufacturer identifier
    pub fn manufacturer_id(&self) -> &str {
        &self.manufacturer_id
    }

    /// Register the manufacturer singleton
    pub fn register_manufacturer(&mut self, deposit: Decimal) -> Result<()> {
        if self.manufacturer.is_some() {
            return Err(Error::RegistrationConflict(
                "manufacturer is already registered".to_string(),
            ));
        }
        self.manufacturer = Some(Account::new(self.manufacturer_id.clone(), deposit));
        tracing::info!(manufacturer_id = %self.manufacturer_id, %deposit, "Manufacturer registered");
        Ok(())
    }

    /// Register a distributor with an initial deposit
    pub fn register_distributor(&mut self, id: impl Into<String>, deposit: Decimal) -> Result<()> {
        let id = id.into();
        if self.distributors.contains_key(&id) {
            return Err(Error::RegistrationConflict(format!(
                "distributor {} is already registered",
                id
            )));
        }
        tracing::info!(distributor_id = %id, %deposit, "Distributor registered");
        self.distributors.insert(id.clone(), Account::new(id, deposit));
        Ok(())
    }

    /// Register a client with an initial deposit
    pub fn register_client(&mut self, id: impl Into<String>, deposit: Decimal) -> Result<()> {
        let id = id.into();
        if self.clients.contains_key(&id) {
            return Err(Error::RegistrationConflict(format!(
                "client {} is already registered",
                id
            )));
        }
        tracing::info!(client_id = %id, %deposit, "Client registered");
        self.clients.insert(id.clone(), Account::new(id, deposit));
        Ok(())
    }

    /// Register a validator node with its initial stake
    pub fn register_node(&mut self, id: impl Into<String>, stake: Decimal) -> Result<()> {
        let id = id.into();
        ensure_non_negative(stake, "stake")?;
        if self.node(&id).is_some() {
            return Err(Error::RegistrationConflict(format!(
                "node {} is already registered",
                id
            )));
        }
        tracing::info!(node_id = %id, %stake, "Validator node registered");
        self.nodes.push(Node::new(id, stake));
        Ok(())
    }

    /// Add stake to a registered node, returning the new total
    pub fn stake(&mut self, node_id: &str, amount: Decimal) -> Result<Decimal> {
        ensure_non_negative(amount, "stake")?;
        let node = self
            .nodes
            .iter_mut()
            .find(|n| n.node_id() == node_id)
            .ok_or_else(|| Error::UnknownParty(format!("node {}", node_id)))?;
        let total = node.add_stake(amount)?;
        tracing::info!(node_id, %amount, %total, "Stake added");
        Ok(total)
    }

    /// Manufacturer, if registered
    pub fn manufacturer(&self) -> Option<&Manufacturer> {
        self.manufacturer.as_ref()
    }

    /// Distributor by ID
    pub fn distributor(&self, id: &str) -> Option<&Distributor> {
        self.distributors.get(id)
    }

    /// Client by ID
    pub fn client(&self, id: &str) -> Option<&Client> {
        self.clients.get(id)
    }

    /// Node by ID
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.node_id() == id)
    }

    /// Nodes in registration order
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Check that a party is registered
    pub fn ensure_party(&self, party: &Party) -> Result<()> {
        self.account(party).map(|_| ())
    }

    /// Account behind a party
    pub(crate) fn account(&self, party: &Party) -> Result<&Account> {
        match party {
            Party::Distributor(id) => self.distributors.get(id),
            Party::Client(id) => self.clients.get(id),
        }
        .ok_or_else(|| Error::UnknownParty(party.to_string()))
    }

    /// Subtract `amount` from a party's balance. No floor is applied; an
    /// overflowing debit fails with `InvalidAmount` and changes nothing.
    pub(crate) fn debit(&mut self, party: &Party, amount: Decimal) -> Result<()> {
        let account = match party {
            Party::Distributor(id) => self.distributors.get_mut(id),
            Party::Client(id) => self.clients.get_mut(id),
        }
        .ok_or_else(|| Error::UnknownParty(party.to_string()))?;

        let balance = account.debit(amount)?;
        if balance < Decimal::ZERO {
            tracing::warn!(%party, %balance, "Balance went negative");
        }
        Ok(())
    }

    /// Credit a block reward to the node at `index`, returning its new stake
    pub(crate) fn credit_reward(&mut self, index: usize, reward: Decimal) -> Result<Decimal> {
        let node = self.nodes.get_mut(index).ok_or_else(|| {
            Error::InvariantViolation(format!("selected validator index {} out of range", index))
        })?;
        node.add_stake(reward)
    }

    /// Read model of every balance and stake
    pub fn balances(&self) -> BalanceSheet {
        BalanceSheet {
            manufacturer: self.manufacturer.as_ref().map(Account::balance),
            distributors: self
                .distributors
                .iter()
                .map(|(id, d)| (id.clone(), d.balance()))
                .collect(),
            clients: self
                .clients
                .iter()
                .map(|(id, c)| (id.clone(), c.balance()))
                .collect(),
            validators: self
                .nodes
                .iter()
                .map(|n| (n.node_id().to_string(), n.staked_coins()))
                .collect(),
        }
    }
}

fn ensure_non_negative(amount: Decimal, what: &str) -> Result<()> {
    if amount < Decimal::ZERO {
        return Err(Error::InvalidAmount(format!(
            "{} must not be negative, got {}",
            what, amount
        )));
    }
    Ok(())
}

/// Snapshot of balances and stakes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceSheet {
    /// Manufacturer balance, if registered
    pub manufacturer: Option<Decimal>,
    /// Distributor balances by ID
    pub distributors: BTreeMap<String, Decimal>,
    /// Client balances by ID
    pub clients: BTreeMap<String, Decimal>,
    /// Validator stakes in registration order
    pub validators: Vec<(String, Decimal)>,
}
