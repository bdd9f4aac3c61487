//! Merkle aggregation over ordered transaction sequences
//!
//! # Design
//!
//! - Leaf = SHA-256 of the transaction's canonical bytes
//! - Parent = SHA-256 of the two children's hex renderings concatenated
//! - Odd level: last digest is paired with itself
//! - Empty sequence: SHA-256 of [`EMPTY_SENTINEL`]
//!
//! Order is significant: swapping two transactions changes the root.

use crate::canonical::transaction_bytes;
use crate::types::{Digest, Transaction};
use sha2::{Digest as _, Sha256};

/// Pre-image of the root of an empty transaction sequence
pub const EMPTY_SENTINEL: &[u8] = b"No transactions";

/// SHA-256 of arbitrary bytes
pub fn hash_bytes(data: &[u8]) -> Digest {
    let mut hasher = Sha256::new();
    hasher.update(data);
    Digest::from_bytes(hasher.finalize().into())
}

/// Hash a pair of digests (used for internal nodes)
fn hash_pair(left: &Digest, right: &Digest) -> Digest {
    let mut hasher = Sha256::new();
    hasher.update(left.to_hex().as_bytes());
    hasher.update(right.to_hex().as_bytes());
    Digest::from_bytes(hasher.finalize().into())
}

/// Leaf digest of one transaction
pub fn leaf_hash(tx: &Transaction) -> Digest {
    hash_bytes(&transaction_bytes(tx))
}

/// Root of the empty sequence
pub fn empty_root() -> Digest {
    hash_bytes(EMPTY_SENTINEL)
}

/// Merkle root of an ordered transaction sequence
pub fn aggregate(transactions: &[Transaction]) -> Digest {
    let leaves: Vec<Digest> = transactions.iter().map(leaf_hash).collect();
    root_from_leaves(&leaves)
}

/// Merkle root from precomputed leaf digests
pub fn root_from_leaves(leaves: &[Digest]) -> Digest {
    if leaves.is_empty() {
        return empty_root();
    }

    let mut current_level = leaves.to_vec();
    while current_level.len() > 1 {
        current_level = next_level(&current_level);
    }

    current_level[0]
}

fn next_level(level: &[Digest]) -> Vec<Digest> {
    level
        .chunks(2)
        .map(|pair| match pair {
            [left, right] => hash_pair(left, right),
            [single] => hash_pair(single, single),
            _ => unreachable!("chunks(2) yields one or two items"),
        })
        .collect()
}

/// Direction of sibling in Merkle tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Sibling is on the left
    Left,
    /// Sibling is on the right
    Right,
}

/// Merkle proof (path from leaf to root)
#[derive(Debug, Clone)]
pub struct MerkleProof {
    /// Leaf hash being proven
    pub leaf_hash: Digest,
    /// Sibling hashes along the path to root
    pub siblings: Vec<(Direction, Digest)>,
    /// Root hash
    pub root_hash: Digest,
}

impl MerkleProof {
    /// Verify proof against its root hash
    pub fn verify(&self) -> bool {
        let mut current_hash = self.leaf_hash;

        for (direction, sibling_hash) in &self.siblings {
            current_hash = match direction {
                Direction::Left => hash_pair(sibling_hash, &current_hash),
                Direction::Right => hash_pair(&current_hash, sibling_hash),
            };
        }

        current_hash == self.root_hash
    }
}

/// Inclusion proof for the transaction at `index`
pub fn generate_proof(transactions: &[Transaction], index: usize) -> Option<MerkleProof> {
    if index >= transactions.len() {
        return None;
    }

    let mut current_level: Vec<Digest> = transactions.iter().map(leaf_hash).collect();
    let leaf_hash = current_level[index];
    let root_hash = root_from_leaves(&current_level);
    let mut siblings = Vec::new();
    let mut current_index = index;

    while current_level.len() > 1 {
        let is_left = current_index % 2 == 0;
        let (direction, sibling_index) = if is_left {
            // No right neighbour: the node is paired with itself
            let sibling = (current_index + 1).min(current_level.len() - 1);
            (Direction::Right, sibling)
        } else {
            (Direction::Left, current_index - 1)
        };
        siblings.push((direction, current_level[sibling_index]));

        current_level = next_level(&current_level);
        current_index /= 2;
    }

    Some(MerkleProof {
        leaf_hash,
        siblings,
        root_hash,
    })
}
