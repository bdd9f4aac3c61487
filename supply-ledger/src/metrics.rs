//! Metrics collection for observability
//!
//! Prometheus metrics kept in a per-ledger registry.
//!
//! # Metrics
//!
//! - `ledger_transactions_submitted_total` - Transactions admitted to pending
//! - `ledger_admissions_rejected_total` - Submissions refused by admission control
//! - `ledger_transactions_confirmed_total` - Transactions confirmed by dispute resolution
//! - `ledger_penalties_total` - Penalties applied by dispute resolution
//! - `ledger_blocks_sealed_total` - Blocks appended to the chain
//! - `ledger_rewards_paid_total` - Validator rewards credited
//! - `ledger_pending_transactions` - Current pending set size

use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Transactions admitted to pending
    pub submitted_total: IntCounter,

    /// Submissions refused
    pub admissions_rejected_total: IntCounter,

    /// Transactions confirmed
    pub confirmed_total: IntCounter,

    /// Penalties applied
    pub penalties_total: IntCounter,

    /// Blocks sealed
    pub blocks_total: IntCounter,

    /// Rewards paid
    pub rewards_total: IntCounter,

    /// Pending set size
    pub pending: IntGauge,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("submitted_total", &self.submitted_total.get())
            .field("blocks_total", &self.blocks_total.get())
            .field("pending", &self.pending.get())
            .finish_non_exhaustive()
    }
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let submitted_total = IntCounter::new(
            "ledger_transactions_submitted_total",
            "Transactions admitted to the pending set",
        )?;
        registry.register(Box::new(submitted_total.clone()))?;

        let admissions_rejected_total = IntCounter::new(
            "ledger_admissions_rejected_total",
            "Submissions refused by admission control",
        )?;
        registry.register(Box::new(admissions_rejected_total.clone()))?;

        let confirmed_total = IntCounter::new(
            "ledger_transactions_confirmed_total",
            "Transactions confirmed by dispute resolution",
        )?;
        registry.register(Box::new(confirmed_total.clone()))?;

        let penalties_total = IntCounter::new(
            "ledger_penalties_total",
            "Penalties applied by dispute resolution",
        )?;
        registry.register(Box::new(penalties_total.clone()))?;

        let blocks_total = IntCounter::new("ledger_blocks_sealed_total", "Blocks sealed")?;
        registry.register(Box::new(blocks_total.clone()))?;

        let rewards_total = IntCounter::new("ledger_rewards_paid_total", "Validator rewards paid")?;
        registry.register(Box::new(rewards_total.clone()))?;

        let pending = IntGauge::new("ledger_pending_transactions", "Pending set size")?;
        registry.register(Box::new(pending.clone()))?;

        Ok(Self {
            submitted_total,
            admissions_rejected_total,
            confirmed_total,
            penalties_total,
            blocks_total,
            rewards_total,
            pending,
            registry,
        })
    }

    /// Record a submission attempt
    pub fn record_submission(&self, accepted: bool) {
        if accepted {
            self.submitted_total.inc();
        } else {
            self.admissions_rejected_total.inc();
        }
    }

    /// Record a dispute resolution pass
    pub fn record_resolution(&self, confirmed: usize, penalties: usize) {
        self.confirmed_total.inc_by(confirmed as u64);
        self.penalties_total.inc_by(penalties as u64);
    }

    /// Record a sealed block and its reward
    pub fn record_block_sealed(&self) {
        self.blocks_total.inc();
        self.rewards_total.inc();
    }

    /// Update pending set size
    pub fn set_pending(&self, size: usize) {
        self.pending.set(size as i64);
    }

    /// Text exposition of every metric
    pub fn gather_text(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buffer) {
            tracing::error!("Failed to encode metrics: {}", e);
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}
