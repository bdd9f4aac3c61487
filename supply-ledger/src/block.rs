//! Block sealing
//!
//! A block is sealed once and never changes afterwards: its Merkle root is
//! derived from the owned transaction list and its digest from
//! `(timestamp, merkle_root, previous_digest)`.

use crate::merkle;
use crate::types::{Digest, Transaction};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

/// Sealed block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    height: u64,
    timestamp: DateTime<Utc>,
    transactions: Vec<Transaction>,
    previous_digest: Option<Digest>,
    merkle_root: Digest,
    digest: Digest,
}

impl Block {
    /// Genesis block: no transactions, no parent
    pub fn genesis() -> Self {
        Self::seal(None, Vec::new())
    }

    /// Seal a new block on top of `previous`
    pub fn seal(previous: Option<&Block>, transactions: Vec<Transaction>) -> Self {
        Self::seal_at(previous, transactions, Utc::now())
    }

    pub(crate) fn seal_at(
        previous: Option<&Block>,
        transactions: Vec<Transaction>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let height = previous.map_or(0, |prev| prev.height + 1);
        let previous_digest = previous.map(|prev| prev.digest);
        let merkle_root = merkle::aggregate(&transactions);
        let digest = compute_digest(&timestamp, &merkle_root, previous_digest.as_ref());

        tracing::debug!(
            height,
            tx_count = transactions.len(),
            merkle_root = %merkle_root,
            digest = %digest,
            "Sealed block"
        );

        Self {
            height,
            timestamp,
            transactions,
            previous_digest,
            merkle_root,
            digest,
        }
    }

    /// Block height (genesis is 0)
    pub fn height(&self) -> u64 {
        self.height
    }

    /// Sealing time
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Sealed transactions in order
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Parent digest, `None` for genesis
    pub fn previous_digest(&self) -> Option<Digest> {
        self.previous_digest
    }

    /// Merkle root of the sealed transactions
    pub fn merkle_root(&self) -> Digest {
        self.merkle_root
    }

    /// This block's digest
    pub fn digest(&self) -> Digest {
        self.digest
    }

    /// Check if this is the genesis block
    pub fn is_genesis(&self) -> bool {
        self.previous_digest.is_none()
    }

    /// Recompute Merkle root and digest from the block's own contents
    pub fn verify_integrity(&self) -> bool {
        let merkle_root = merkle::aggregate(&self.transactions);
        merkle_root == self.merkle_root
            && compute_digest(&self.timestamp, &merkle_root, self.previous_digest.as_ref())
                == self.digest
    }
}

/// Digest over the textual timestamp, Merkle root and parent digest.
/// Genesis hashes [`Digest::ZERO`] in place of the missing parent.
fn compute_digest(
    timestamp: &DateTime<Utc>,
    merkle_root: &Digest,
    previous_digest: Option<&Digest>,
) -> Digest {
    // Seconds followed by zero-padded subsecond nanos; equals the nanosecond
    // count for post-epoch times and stays exact outside the i64 nanos range
    let time_text = format!(
        "{}{:09}",
        timestamp.timestamp(),
        timestamp.timestamp_subsec_nanos()
    );
    let previous = previous_digest.unwrap_or(&Digest::ZERO);

    let mut hasher = Sha256::new();
    hasher.update(time_text.as_bytes());
    hasher.update(merkle_root.to_hex().as_bytes());
    hasher.update(previous.to_hex().as_bytes());
    Digest::from_bytes(hasher.finalize().into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn tx(distributor: &str) -> Transaction {
        Transaction::new("Manufacturer_A", distributor, "C1", "P1", Some(Decimal::from(50)))
    }

    #[test]
    fn test_genesis_block() {
        let genesis = Block::genesis();
        assert!(genesis.is_genesis());
        assert_eq!(genesis.height(), 0);
        assert!(genesis.transactions().is_empty());
        assert_eq!(genesis.merkle_root(), merkle::empty_root());
        assert!(genesis.verify_integrity());
    }

    #[test]
    fn test_linkage() {
        let genesis = Block::genesis();
        let next = Block::seal(Some(&genesis), vec![tx("D1")]);
        assert_eq!(next.previous_digest(), Some(genesis.digest()));
        assert_eq!(next.height(), 1);
        assert!(next.verify_integrity());
    }

    #[test]
    fn test_digest_is_deterministic() {
        let genesis = Block::genesis();
        let txs = vec![tx("D1"), tx("D2")];
        let at = Utc::now();
        let a = Block::seal_at(Some(&genesis), txs.clone(), at);
        let b = Block::seal_at(Some(&genesis), txs, at);
        assert_eq!(a.digest(), b.digest());
        assert_eq!(a.merkle_root(), b.merkle_root());
    }

    #[test]
    fn test_timestamp_feeds_digest() {
        let at = Utc::now();
        let a = Block::seal_at(None, Vec::new(), at);
        let b = Block::seal_at(None, Vec::new(), at + chrono::Duration::seconds(1));
        assert_eq!(a.merkle_root(), b.merkle_root());
        assert_ne!(a.digest(), b.digest());
    }

    #[test]
    fn test_far_future_timestamps_stay_distinct() {
        // Past the last instant representable as i64 nanoseconds
        let at = DateTime::parse_from_rfc3339("2300-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert!(at.timestamp_nanos_opt().is_none());

        let a = Block::seal_at(None, Vec::new(), at);
        let b = Block::seal_at(None, Vec::new(), at + chrono::Duration::seconds(1));
        assert_ne!(a.digest(), b.digest());
        assert!(a.verify_integrity());
    }

    #[test]
    fn test_time_text_matches_nanos_after_epoch() {
        let at = DateTime::parse_from_rfc3339("2024-03-05T09:07:01.000000042Z")
            .unwrap()
            .with_timezone(&Utc);
        let root = merkle::empty_root();

        let mut hasher = Sha256::new();
        hasher.update(at.timestamp_nanos_opt().unwrap().to_string().as_bytes());
        hasher.update(root.to_hex().as_bytes());
        hasher.update(Digest::ZERO.to_hex().as_bytes());
        let expected = Digest::from_bytes(hasher.finalize().into());

        assert_eq!(compute_digest(&at, &root, None), expected);
    }

    #[test]
    fn test_blocks_own_their_transactions() {
        let genesis = Block::genesis();
        let first = Block::seal(Some(&genesis), vec![tx("D1")]);
        let second = Block::seal(Some(&first), Vec::new());
        assert_eq!(first.transactions().len(), 1);
        assert!(second.transactions().is_empty());
        assert!(Block::genesis().transactions().is_empty());
    }

    #[test]
    fn test_tampered_block_fails_integrity() {
        let genesis = Block::genesis();
        let mut block = Block::seal(Some(&genesis), vec![tx("D1")]);
        block.transactions.push(tx("D2"));
        assert!(!block.verify_integrity());
    }
}
