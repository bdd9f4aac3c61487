//! Plain-text transaction snapshots
//!
//! Feeds external renderers (e.g. QR artifacts). The ledger only produces the
//! text; encoding it into an image is someone else's job.

use crate::types::{Transaction, TransactionStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Rendering used for timestamps, e.g. `Mon Oct 19 14:03:07 2026`
const TIME_FORMAT: &str = "%a %b %e %H:%M:%S %Y";

/// Placeholder for an event that has not happened
const NOT_AVAILABLE: &str = "N/A";

/// Human-readable view of one transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSnapshot {
    /// Manufacturer ID
    pub manufacturer: String,
    /// Distributor ID
    pub distributor: String,
    /// Client ID
    pub client: String,
    /// Status name
    pub status: TransactionStatus,
    /// Creation time
    pub created: String,
    /// Dispatch time or `N/A`
    pub dispatched: String,
    /// Receipt time or `N/A`
    pub received: String,
}

impl From<&Transaction> for TransactionSnapshot {
    fn from(tx: &Transaction) -> Self {
        let ts = tx.timestamps();
        Self {
            manufacturer: tx.manufacturer_id().to_string(),
            distributor: tx.distributor_id().to_string(),
            client: tx.client_id().to_string(),
            status: tx.status(),
            created: render_time(Some(&ts.created)),
            dispatched: render_time(ts.dispatched.as_ref()),
            received: render_time(ts.received.as_ref()),
        }
    }
}

impl TransactionSnapshot {
    /// One `Label: value` line per field
    pub fn to_text(&self) -> String {
        format!(
            "Manufacturer: {}\nDistributor: {}\nClient: {}\nStatus: {}\nCreated: {}\nDispatched: {}\nReceived: {}",
            self.manufacturer,
            self.distributor,
            self.client,
            self.status,
            self.created,
            self.dispatched,
            self.received,
        )
    }

    /// JSON rendering
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

fn render_time(ts: Option<&DateTime<Utc>>) -> String {
    match ts {
        Some(ts) => ts.format(TIME_FORMAT).to_string(),
        None => NOT_AVAILABLE.to_string(),
    }
}
