//! Ledger aggregate root
//!
//! [`Blockchain`] is the explicit context object for one process: it owns the
//! chain, the pending and confirmed transaction sets and the registry. All
//! mutation goes through `&mut self`, so a single owner (see
//! [`crate::actor`]) serializes every write.

use crate::block::Block;
use crate::consensus::{self, SealedRound};
use crate::dispute::{self, ResolutionOutcome};
use crate::registry::{BalanceSheet, Registry};
use crate::types::{Party, Transaction, TransactionStatus};
use crate::{Config, Error, Result};
use rust_decimal::Decimal;

/// Chain, pending set, confirmed set and registry
#[derive(Debug, Clone)]
pub struct Blockchain {
    chain: Vec<Block>,
    pending: Vec<Transaction>,
    confirmed: Vec<Transaction>,
    registry: Registry,
    block_reward: Decimal,
    penalty: Decimal,
}

impl Blockchain {
    /// Create a chain holding only the genesis block
    pub fn new(config: &Config) -> Self {
        Self {
            chain: vec![Block::genesis()],
            pending: Vec::new(),
            confirmed: Vec::new(),
            registry: Registry::new(config.manufacturer_id.clone()),
            block_reward: config.consensus.block_reward,
            penalty: config.dispute.penalty,
        }
    }

    /// Register the manufacturer singleton
    pub fn register_manufacturer(&mut self, deposit: Decimal) -> Result<()> {
        self.registry.register_manufacturer(deposit)
    }

    /// Register a distributor
    pub fn register_distributor(&mut self, id: impl Into<String>, deposit: Decimal) -> Result<()> {
        self.registry.register_distributor(id, deposit)
    }

    /// Register a client
    pub fn register_client(&mut self, id: impl Into<String>, deposit: Decimal) -> Result<()> {
        self.registry.register_client(id, deposit)
    }

    /// Register a validator node
    pub fn register_node(&mut self, id: impl Into<String>, stake: Decimal) -> Result<()> {
        self.registry.register_node(id, stake)
    }

    /// Add stake to a validator node
    pub fn stake(&mut self, node_id: &str, amount: Decimal) -> Result<Decimal> {
        self.registry.stake(node_id, amount)
    }

    /// Submit a new trade.
    ///
    /// Rejected when either party is unregistered or the distributor already
    /// has a pending transaction.
    pub fn submit(
        &mut self,
        distributor_id: &str,
        client_id: &str,
        product_id: &str,
        amount: Option<Decimal>,
    ) -> Result<Transaction> {
        self.registry
            .ensure_party(&Party::Distributor(distributor_id.to_string()))?;
        self.registry
            .ensure_party(&Party::Client(client_id.to_string()))?;

        if self.has_pending_for(distributor_id) {
            tracing::warn!(distributor_id, "Distributor already has a pending transaction");
            return Err(Error::DuplicatePendingTransaction(distributor_id.to_string()));
        }

        let tx = Transaction::new(
            self.registry.manufacturer_id(),
            distributor_id,
            client_id,
            product_id,
            amount,
        );
        tracing::info!(
            tx_id = %tx.tx_id(),
            distributor_id,
            client_id,
            product_id,
            "Transaction added to pending"
        );
        self.pending.push(tx.clone());
        Ok(tx)
    }

    fn has_pending_for(&self, distributor_id: &str) -> bool {
        self.pending
            .iter()
            .any(|tx| tx.distributor_id() == distributor_id)
    }

    /// Distributor records dispatch of its `Created` transaction
    pub fn record_dispatch(&mut self, distributor_id: &str) -> Result<Transaction> {
        let tx = self
            .pending
            .iter_mut()
            .find(|tx| {
                tx.distributor_id() == distributor_id
                    && tx.status() == TransactionStatus::Created
            })
            .ok_or_else(|| {
                Error::NoMatchingTransaction(format!(
                    "no created transaction for distributor {}",
                    distributor_id
                ))
            })?;
        tx.dispatch()?;
        tracing::info!(tx_id = %tx.tx_id(), distributor_id, client_id = tx.client_id(), "Product dispatched");
        Ok(tx.clone())
    }

    /// Client records receipt of a `Dispatched` transaction
    pub fn record_receipt(&mut self, client_id: &str) -> Result<Transaction> {
        let tx = self
            .pending
            .iter_mut()
            .find(|tx| {
                tx.client_id() == client_id && tx.status() == TransactionStatus::Dispatched
            })
            .ok_or_else(|| {
                Error::NoMatchingTransaction(format!(
                    "no dispatched transaction for client {}",
                    client_id
                ))
            })?;
        tx.receive()?;
        tracing::info!(tx_id = %tx.tx_id(), client_id, distributor_id = tx.distributor_id(), "Product received");
        Ok(tx.clone())
    }

    /// Resolve every pending transaction.
    ///
    /// The pending set is taken as a snapshot; on error it is restored as it
    /// was and no balance changes.
    pub fn resolve_disputes(&mut self) -> Result<ResolutionOutcome> {
        let snapshot = std::mem::take(&mut self.pending);
        match dispute::resolve(snapshot, &mut self.registry, self.penalty) {
            Ok(outcome) => {
                self.confirmed.extend(outcome.confirmed.iter().cloned());
                tracing::info!(
                    confirmed = outcome.confirmed.len(),
                    rejected = outcome.rejected.len(),
                    "Dispute resolution finished"
                );
                Ok(outcome)
            }
            Err((snapshot, e)) => {
                self.pending = snapshot;
                Err(e)
            }
        }
    }

    /// Run one consensus round over the confirmed set
    pub fn seal_block(&mut self) -> Result<SealedRound> {
        let round = consensus::run_round(
            &mut self.chain,
            &mut self.confirmed,
            &mut self.registry,
            self.block_reward,
        );
        if let Err(Error::NoValidatorsAvailable) = round {
            tracing::warn!("No validators available, block not sealed");
        }
        round
    }

    /// Pending transactions in submission order
    pub fn pending(&self) -> &[Transaction] {
        &self.pending
    }

    /// Confirmed transactions awaiting the next block
    pub fn confirmed(&self) -> &[Transaction] {
        &self.confirmed
    }

    /// Sealed blocks, genesis first
    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    /// Most recent block
    pub fn latest_block(&self) -> &Block {
        // The chain always starts with genesis
        &self.chain[self.chain.len() - 1]
    }

    /// Registry read access
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Balance and stake snapshot
    pub fn balances(&self) -> BalanceSheet {
        self.registry.balances()
    }

    /// Transaction between a distributor and a client: pending first, then
    /// confirmed-but-unsealed, then sealed blocks newest first
    pub fn find_transaction(&self, distributor_id: &str, client_id: &str) -> Option<&Transaction> {
        let sealed = self
            .chain
            .iter()
            .rev()
            .flat_map(|block| block.transactions().iter());
        self.pending
            .iter()
            .chain(self.confirmed.iter())
            .chain(sealed)
            .find(|tx| tx.distributor_id() == distributor_id && tx.client_id() == client_id)
    }

    /// Check linkage and integrity of every block.
    ///
    /// A failure here is fatal: the in-memory chain has been corrupted.
    pub fn verify_chain(&self) -> Result<()> {
        let genesis = self
            .chain
            .first()
            .ok_or_else(|| Error::InvariantViolation("chain has no genesis block".to_string()))?;
        if !genesis.is_genesis() {
            return Err(Error::InvariantViolation(
                "first block has a previous digest".to_string(),
            ));
        }

        for block in &self.chain {
            if !block.verify_integrity() {
                return Err(Error::InvariantViolation(format!(
                    "block {} digest does not match its contents",
                    block.height()
                )));
            }
        }

        for pair in self.chain.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            if next.previous_digest() != Some(prev.digest()) {
                tracing::error!(height = next.height(), "Broken chain linkage");
                return Err(Error::InvariantViolation(format!(
                    "block {} does not link to block {}",
                    next.height(),
                    prev.height()
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merkle;

    fn blockchain() -> Blockchain {
        let mut bc = Blockchain::new(&Config::default());
        bc.register_manufacturer(Decimal::from(10_000)).unwrap();
        bc.register_distributor("D1", Decimal::from(5_000)).unwrap();
        bc.register_distributor("D2", Decimal::from(5_000)).unwrap();
        bc.register_client("C1", Decimal::from(2_000)).unwrap();
        bc.register_client("C2", Decimal::from(2_000)).unwrap();
        bc
    }

    #[test]
    fn test_new_has_genesis() {
        let bc = Blockchain::new(&Config::default());
        assert_eq!(bc.chain().len(), 1);
        assert!(bc.latest_block().is_genesis());
        assert!(bc.verify_chain().is_ok());
    }

    #[test]
    fn test_admission_control() {
        let mut bc = blockchain();
        bc.submit("D1", "C1", "P1", Some(Decimal::from(50))).unwrap();

        let err = bc.submit("D1", "C2", "P2", Some(Decimal::from(10))).unwrap_err();
        assert!(matches!(err, Error::DuplicatePendingTransaction(ref d) if d == "D1"));
        assert_eq!(bc.pending().len(), 1);

        bc.submit("D2", "C1", "P3", Some(Decimal::from(10))).unwrap();
        assert_eq!(bc.pending().len(), 2);
    }

    #[test]
    fn test_submit_unknown_party() {
        let mut bc = blockchain();
        assert!(matches!(
            bc.submit("ghost", "C1", "P1", None),
            Err(Error::UnknownParty(_))
        ));
        assert!(matches!(
            bc.submit("D1", "ghost", "P1", None),
            Err(Error::UnknownParty(_))
        ));
        assert!(bc.pending().is_empty());
    }

    #[test]
    fn test_submitted_transaction_carries_manufacturer() {
        let mut bc = blockchain();
        let tx = bc.submit("D1", "C1", "P1", None).unwrap();
        assert_eq!(tx.manufacturer_id(), "Manufacturer_A");
        assert_eq!(tx.status(), TransactionStatus::Created);
    }

    #[test]
    fn test_dispatch_and_receipt() {
        let mut bc = blockchain();
        bc.submit("D1", "C1", "P1", Some(Decimal::from(50))).unwrap();

        assert!(matches!(
            bc.record_receipt("C1"),
            Err(Error::NoMatchingTransaction(_))
        ));

        let tx = bc.record_dispatch("D1").unwrap();
        assert_eq!(tx.status(), TransactionStatus::Dispatched);
        assert!(matches!(
            bc.record_dispatch("D1"),
            Err(Error::NoMatchingTransaction(_))
        ));

        let tx = bc.record_receipt("C1").unwrap();
        assert_eq!(tx.status(), TransactionStatus::Received);
        assert_eq!(bc.pending()[0].status(), TransactionStatus::Received);
    }

    #[test]
    fn test_resolution_case_dispatched_not_received() {
        let mut bc = blockchain();
        bc.submit("D1", "C1", "P1", Some(Decimal::from(50))).unwrap();
        bc.record_dispatch("D1").unwrap();

        bc.resolve_disputes().unwrap();

        assert!(bc.pending().is_empty());
        assert!(bc.confirmed().is_empty());
        assert_eq!(bc.balances().clients["C1"], Decimal::from(1_000));
    }

    #[test]
    fn test_resolution_case_nothing_happened() {
        let mut bc = blockchain();
        bc.submit("D1", "C1", "P1", Some(Decimal::from(50))).unwrap();

        bc.resolve_disputes().unwrap();

        assert!(bc.pending().is_empty());
        assert_eq!(bc.balances().distributors["D1"], Decimal::from(4_000));
    }

    #[test]
    fn test_resolution_case_confirmed() {
        let mut bc = blockchain();
        let tx = bc.submit("D1", "C1", "P1", Some(Decimal::from(50))).unwrap();
        bc.record_dispatch("D1").unwrap();
        bc.record_receipt("C1").unwrap();

        bc.resolve_disputes().unwrap();

        assert!(bc.pending().is_empty());
        assert_eq!(bc.confirmed().len(), 1);
        assert_eq!(bc.confirmed()[0].tx_id(), tx.tx_id());
        assert_eq!(bc.balances().clients["C1"], Decimal::from(1_950));
    }

    #[test]
    fn test_distributor_free_after_resolution() {
        let mut bc = blockchain();
        bc.submit("D1", "C1", "P1", None).unwrap();
        bc.resolve_disputes().unwrap();
        bc.submit("D1", "C1", "P2", None).unwrap();
    }

    #[test]
    fn test_seal_block_without_validators() {
        let mut bc = blockchain();
        bc.submit("D1", "C1", "P1", Some(Decimal::from(50))).unwrap();
        bc.record_dispatch("D1").unwrap();
        bc.record_receipt("C1").unwrap();
        bc.resolve_disputes().unwrap();

        assert!(matches!(bc.seal_block(), Err(Error::NoValidatorsAvailable)));
        assert_eq!(bc.confirmed().len(), 1);
        assert_eq!(bc.chain().len(), 1);

        bc.register_node("N1", Decimal::from(10)).unwrap();
        let round = bc.seal_block().unwrap();
        assert_eq!(round.block.transactions().len(), 1);
        assert!(bc.confirmed().is_empty());
        assert!(bc.verify_chain().is_ok());
    }

    #[test]
    fn test_seal_empty_confirmed_set() {
        let mut bc = blockchain();
        bc.register_node("N1", Decimal::from(10)).unwrap();
        let round = bc.seal_block().unwrap();
        assert_eq!(round.block.merkle_root(), merkle::empty_root());
        assert_eq!(round.block.previous_digest(), Some(bc.chain()[0].digest()));
    }

    #[test]
    fn test_one_reward_per_round() {
        let mut bc = blockchain();
        bc.register_node("N1", Decimal::from(10)).unwrap();
        for round in 1..=3 {
            bc.seal_block().unwrap();
            assert_eq!(
                bc.registry().node("N1").unwrap().staked_coins(),
                Decimal::from(10 + 5 * round)
            );
        }
        assert_eq!(bc.chain().len(), 4);
        assert!(bc.verify_chain().is_ok());
    }

    #[test]
    fn test_find_transaction() {
        let mut bc = blockchain();
        bc.submit("D1", "C1", "P1", Some(Decimal::from(50))).unwrap();
        bc.record_dispatch("D1").unwrap();
        bc.record_receipt("C1").unwrap();
        bc.resolve_disputes().unwrap();
        bc.submit("D1", "C2", "P2", None).unwrap();

        assert_eq!(bc.find_transaction("D1", "C2").unwrap().product_id(), "P2");
        assert_eq!(bc.find_transaction("D1", "C1").unwrap().product_id(), "P1");
        assert!(bc.find_transaction("D2", "C1").is_none());
    }

    #[test]
    fn test_unpayable_reward_leaves_chain_and_confirmed() {
        let mut bc = blockchain();
        bc.register_node("N1", Decimal::MAX).unwrap();
        bc.submit("D1", "C1", "P1", Some(Decimal::from(50))).unwrap();
        bc.record_dispatch("D1").unwrap();
        bc.record_receipt("C1").unwrap();
        bc.resolve_disputes().unwrap();

        assert!(matches!(bc.seal_block(), Err(Error::InvalidAmount(_))));
        assert_eq!(bc.chain().len(), 1);
        assert_eq!(bc.confirmed().len(), 1);
        assert_eq!(bc.registry().node("N1").unwrap().staked_coins(), Decimal::MAX);
        assert!(bc.verify_chain().is_ok());
    }

    #[test]
    fn test_overflowing_penalty_restores_pending() {
        let mut bc = blockchain();
        bc.register_distributor("D2", Decimal::MIN).unwrap();
        bc.submit("D2", "C1", "P1", Some(Decimal::from(50))).unwrap();

        assert!(matches!(bc.resolve_disputes(), Err(Error::InvalidAmount(_))));
        assert_eq!(bc.pending().len(), 1);
        assert_eq!(bc.pending()[0].status(), TransactionStatus::Created);
        assert!(bc.confirmed().is_empty());
        assert_eq!(bc.balances().distributors["D2"], Decimal::MIN);
    }

    #[test]
    fn test_find_sealed_transaction() {
        let mut bc = blockchain();
        bc.register_node("N1", Decimal::from(10)).unwrap();
        bc.submit("D1", "C1", "P1", Some(Decimal::from(50))).unwrap();
        bc.record_dispatch("D1").unwrap();
        bc.record_receipt("C1").unwrap();
        bc.resolve_disputes().unwrap();
        bc.seal_block().unwrap();

        let tx = bc.find_transaction("D1", "C1").unwrap();
        assert_eq!(tx.status(), TransactionStatus::Confirmed);
    }

    #[test]
    fn test_verify_chain_detects_broken_link() {
        let mut bc = blockchain();
        bc.register_node("N1", Decimal::from(10)).unwrap();
        bc.seal_block().unwrap();

        // Splice in a block that links to nothing on this chain
        let orphan = Block::seal(Some(&Block::genesis()), Vec::new());
        bc.chain.push(orphan);

        let err = bc.verify_chain().unwrap_err();
        assert!(!err.is_recoverable());
    }
}
