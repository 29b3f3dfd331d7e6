//! Content-derived transaction identity
//!
//! A transaction id is the SHA-256 of its identifying fields, so the same
//! statement row always maps to the same id no matter which file, or how
//! many files, it arrives in.

use chrono::NaiveDate;
use sha2::{Digest, Sha256};

use crate::models::{CanonicalTransaction, Transaction};

/// Field separator (ASCII unit separator); stripped from field values
const SEP: char = '\u{1f}';

/// The fields a transaction id is derived from
#[derive(Debug, Clone, Copy)]
pub struct IdentityFields<'a> {
    pub account_id: &'a str,
    pub date: NaiveDate,
    pub amount: f64,
    pub description: &'a str,
    pub balance: Option<f64>,
    pub card_number: Option<&'a str>,
    pub reference: Option<&'a str>,
}

impl<'a> IdentityFields<'a> {
    pub fn from_canonical(account_id: &'a str, tx: &'a CanonicalTransaction) -> Self {
        Self {
            account_id,
            date: tx.date,
            amount: tx.amount,
            description: &tx.description,
            balance: tx.balance,
            card_number: tx.card_number.as_deref(),
            reference: tx.reference.as_deref(),
        }
    }

    pub fn from_stored(tx: &'a Transaction) -> Self {
        Self {
            account_id: &tx.account_id,
            date: tx.date,
            amount: tx.amount,
            description: &tx.description,
            balance: tx.balance,
            card_number: tx.card_number.as_deref(),
            reference: tx.reference.as_deref(),
        }
    }

    /// Hex SHA-256 over the separator-joined fields
    pub fn id(&self) -> String {
        let fields = [
            clean(self.account_id),
            self.date.format("%Y-%m-%d").to_string(),
            money(self.amount),
            clean(self.description),
            self.balance.map(money).unwrap_or_default(),
            self.card_number.map(clean).unwrap_or_default(),
            self.reference.map(clean).unwrap_or_default(),
        ];

        let mut hasher = Sha256::new();
        for (i, field) in fields.iter().enumerate() {
            if i > 0 {
                let mut buf = [0u8; 4];
                hasher.update(SEP.encode_utf8(&mut buf).as_bytes());
            }
            hasher.update(field.as_bytes());
        }
        hex::encode(hasher.finalize())
    }
}

/// Deterministic id of a parsed transaction within an account
pub fn transaction_id(account_id: &str, tx: &CanonicalTransaction) -> String {
    IdentityFields::from_canonical(account_id, tx).id()
}

/// Hex SHA-256 of a whole file's bytes
pub fn file_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

fn clean(value: &str) -> String {
    value.replace(SEP, "")
}

/// Two-decimal rendering with negative zero folded into zero
fn money(value: f64) -> String {
    let rendered = format!("{:.2}", value);
    if rendered == "-0.00" {
        "0.00".to_string()
    } else {
        rendered
    }
}
