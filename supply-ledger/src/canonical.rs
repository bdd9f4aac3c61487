//! Canonical serialization for transaction hashing
//!
//! Fixed field order, length-prefixed strings, explicit presence markers for
//! optional fields. Two transactions produce the same bytes iff every field
//! matches.

use crate::types::Transaction;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Canonical serializer
#[derive(Debug, Default)]
pub struct CanonicalSerializer {
    buffer: Vec<u8>,
}

impl CanonicalSerializer {
    /// Create new serializer
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    fn write_bytes(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Write string (length-prefixed)
    fn write_string(&mut self, s: &str) {
        let bytes = s.as_bytes();
        self.write_u32(bytes.len() as u32);
        self.write_bytes(bytes);
    }

    /// Write u32 (big-endian)
    fn write_u32(&mut self, n: u32) {
        self.write_bytes(&n.to_be_bytes());
    }

    /// Write i64 (big-endian)
    fn write_i64(&mut self, n: i64) {
        self.write_bytes(&n.to_be_bytes());
    }

    /// Decimals go through their normalized string form so 50 and 50.00 agree
    fn write_option_decimal(&mut self, opt: Option<Decimal>) {
        match opt {
            Some(d) => {
                self.write_bytes(&[1]);
                self.write_string(&d.normalize().to_string());
            }
            None => self.write_bytes(&[0]),
        }
    }

    fn write_timestamp(&mut self, ts: &DateTime<Utc>) {
        self.write_i64(ts.timestamp());
        self.write_u32(ts.timestamp_subsec_nanos());
    }

    fn write_option_timestamp(&mut self, opt: Option<&DateTime<Utc>>) {
        match opt {
            Some(ts) => {
                self.write_bytes(&[1]);
                self.write_timestamp(ts);
            }
            None => self.write_bytes(&[0]),
        }
    }

    /// Serialize every transaction field in a fixed order
    pub fn write_transaction(&mut self, tx: &Transaction) {
        self.write_bytes(tx.tx_id().as_bytes());
        self.write_string(tx.product_id());
        self.write_string(tx.manufacturer_id());
        self.write_string(tx.distributor_id());
        self.write_string(tx.client_id());
        self.write_option_decimal(tx.amount());
        self.write_bytes(&[tx.status() as u8]);
        let ts = tx.timestamps();
        self.write_timestamp(&ts.created);
        self.write_option_timestamp(ts.dispatched.as_ref());
        self.write_option_timestamp(ts.received.as_ref());
    }

    /// Finalize and return bytes
    pub fn finalize(self) -> Vec<u8> {
        self.buffer
    }
}

/// Canonical bytes of a single transaction
pub fn transaction_bytes(tx: &Transaction) -> Vec<u8> {
    let mut serializer = CanonicalSerializer::new();
    serializer.write_transaction(tx);
    serializer.finalize()
}
