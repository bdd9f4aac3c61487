//! Dispute resolution
//!
//! Turns the pending set into confirmed transactions or penalties. The pass
//! works on a snapshot: every verdict is decided before any balance or status
//! is touched, and the whole pass is rejected if a verdict references a party
//! the registry does not know or a debit would overflow a balance.
//!
//! | Timestamps / status                        | Verdict                    |
//! |--------------------------------------------|----------------------------|
//! | `Dispatched`, no `received`                | penalize client            |
//! | neither `dispatched` nor `received`        | penalize distributor       |
//! | anything else                              | confirm, debit client      |

use crate::registry::Registry;
use crate::types::{Account, Party, Transaction, TransactionStatus};
use crate::{Error, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::{Entry, HashMap};
use uuid::Uuid;

/// Decision for one pending transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Distributor claims dispatch, client denies receipt
    PenalizeClient,
    /// Neither party acted
    PenalizeDistributor,
    /// Both sides agree; client pays the trade amount
    Confirm,
}

/// Classify a transaction by status and timestamps
pub fn classify(tx: &Transaction) -> Verdict {
    let ts = tx.timestamps();
    if tx.status() == TransactionStatus::Dispatched && ts.received.is_none() {
        Verdict::PenalizeClient
    } else if ts.dispatched.is_none() && ts.received.is_none() {
        Verdict::PenalizeDistributor
    } else {
        Verdict::Confirm
    }
}

/// Balance deduction applied to a party
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Penalty {
    /// Party whose balance was reduced
    pub party: Party,
    /// Deducted amount
    pub amount: Decimal,
    /// Transaction that triggered the penalty
    pub tx_id: Uuid,
}

/// Result of one resolution pass
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolutionOutcome {
    /// Transactions moved to the confirmed set, in pending order
    pub confirmed: Vec<Transaction>,
    /// Transactions dropped after a penalty
    pub rejected: Vec<Transaction>,
    /// Penalties applied
    pub penalties: Vec<Penalty>,
}

impl ResolutionOutcome {
    /// Check if the pass changed nothing
    pub fn is_empty(&self) -> bool {
        self.confirmed.is_empty() && self.rejected.is_empty()
    }
}

/// Resolve a pending snapshot against the registry.
///
/// On error the snapshot is returned untouched together with the error so the
/// caller can restore its pending set.
pub fn resolve(
    pending: Vec<Transaction>,
    registry: &mut Registry,
    penalty: Decimal,
) -> std::result::Result<ResolutionOutcome, (Vec<Transaction>, Error)> {
    let decisions: Vec<(Verdict, Party)> = pending
        .iter()
        .map(|tx| {
            let verdict = classify(tx);
            let party = match verdict {
                Verdict::PenalizeDistributor => Party::Distributor(tx.distributor_id().to_string()),
                Verdict::PenalizeClient | Verdict::Confirm => {
                    Party::Client(tx.client_id().to_string())
                }
            };
            (verdict, party)
        })
        .collect();

    if let Err(e) = validate(&pending, &decisions, registry, penalty) {
        return Err((pending, e));
    }

    // Every verdict is known to be applicable past this point
    match apply(pending.clone(), decisions, registry, penalty) {
        Ok(outcome) => Ok(outcome),
        Err(e) => Err((
            pending,
            Error::InvariantViolation(format!("dispute pass failed after validation: {}", e)),
        )),
    }
}

/// Every party exists, every transition is allowed and every debit fits,
/// replayed against projected balances in pending order
fn validate(
    pending: &[Transaction],
    decisions: &[(Verdict, Party)],
    registry: &Registry,
    penalty: Decimal,
) -> Result<()> {
    let mut projected: HashMap<&Party, Account> = HashMap::new();

    for (tx, (verdict, party)) in pending.iter().zip(decisions) {
        let account = match projected.entry(party) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(registry.account(party)?.clone()),
        };

        let target = match verdict {
            Verdict::Confirm => TransactionStatus::Confirmed,
            _ => TransactionStatus::Rejected,
        };
        if !tx.status().can_transition_to(target) {
            return Err(Error::InvalidTransition {
                from: tx.status(),
                to: target,
            });
        }

        account.debit(debit_amount(tx, *verdict, penalty))?;
    }

    Ok(())
}

fn debit_amount(tx: &Transaction, verdict: Verdict, penalty: Decimal) -> Decimal {
    match verdict {
        Verdict::PenalizeClient | Verdict::PenalizeDistributor => penalty,
        Verdict::Confirm => tx.amount().unwrap_or(Decimal::ZERO),
    }
}

fn apply(
    pending: Vec<Transaction>,
    decisions: Vec<(Verdict, Party)>,
    registry: &mut Registry,
    penalty: Decimal,
) -> Result<ResolutionOutcome> {
    let mut outcome = ResolutionOutcome::default();

    for (mut tx, (verdict, party)) in pending.into_iter().zip(decisions) {
        match verdict {
            Verdict::PenalizeClient | Verdict::PenalizeDistributor => {
                tracing::warn!(
                    tx_id = %tx.tx_id(),
                    product_id = tx.product_id(),
                    status = %tx.status(),
                    %party,
                    %penalty,
                    "Discrepancy detected, penalizing"
                );
                tx.reject()?;
                registry.debit(&party, penalty)?;
                outcome.penalties.push(Penalty {
                    party,
                    amount: penalty,
                    tx_id: tx.tx_id(),
                });
                outcome.rejected.push(tx);
            }
            Verdict::Confirm => {
                let amount = debit_amount(&tx, verdict, penalty);
                if tx.amount().is_none() {
                    tracing::warn!(tx_id = %tx.tx_id(), "Confirming transaction without amount");
                }
                tx.confirm()?;
                registry.debit(&party, amount)?;
                tracing::info!(
                    tx_id = %tx.tx_id(),
                    product_id = tx.product_id(),
                    %amount,
                    "Transaction verified and confirmed"
                );
                outcome.confirmed.push(tx);
            }
        }
    }

    Ok(outcome)
}
