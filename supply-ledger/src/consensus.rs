//! Validator selection and block rounds
//!
//! Proof of stake here is a deterministic scan: the node with the largest
//! stake seals the next block, and the earliest registered node wins ties.
//! There is no randomness and no voting.

use crate::block::Block;
use crate::registry::Registry;
use crate::types::{Node, Transaction};
use crate::{Error, Result};
use rust_decimal::Decimal;

/// Outcome of a successful consensus round
#[derive(Debug, Clone)]
pub struct SealedRound {
    /// Newly appended block
    pub block: Block,
    /// Validator that sealed it
    pub validator_id: String,
    /// Reward credited to the validator
    pub reward: Decimal,
    /// Validator stake after the reward
    pub validator_stake: Decimal,
}

/// Index of the node with the largest stake, first one on ties
pub fn select_validator(nodes: &[Node]) -> Option<usize> {
    let mut best: Option<(usize, Decimal)> = None;
    for (index, node) in nodes.iter().enumerate() {
        match best {
            Some((_, stake)) if node.staked_coins() <= stake => {}
            _ => best = Some((index, node.staked_coins())),
        }
    }
    best.map(|(index, _)| index)
}

/// Run one round: pick a validator, seal the confirmed set, pay the reward.
///
/// With no registered nodes nothing changes and `NoValidatorsAvailable` is
/// returned so the round can be retried later.
pub fn run_round(
    chain: &mut Vec<Block>,
    confirmed: &mut Vec<Transaction>,
    registry: &mut Registry,
    reward: Decimal,
) -> Result<SealedRound> {
    let index = select_validator(registry.nodes()).ok_or(Error::NoValidatorsAvailable)?;
    let previous = chain
        .last()
        .ok_or_else(|| Error::InvariantViolation("chain has no genesis block".to_string()))?;

    let validator = &registry.nodes()[index];
    let validator_id = validator.node_id().to_string();
    // Reject an unpayable reward before anything is sealed
    let validator_stake = validator.stake_after(reward)?;
    tracing::info!(%validator_id, "Validator chosen to seal block");

    let block = Block::seal(Some(previous), std::mem::take(confirmed));
    chain.push(block.clone());

    registry.credit_reward(index, reward)?;
    tracing::info!(
        %validator_id,
        %reward,
        stake = %validator_stake,
        height = block.height(),
        "Block sealed, validator rewarded"
    );

    Ok(SealedRound {
        block,
        validator_id,
        reward,
        validator_stake,
    })
}
