//! Bank of America checking/savings
//!
//! Exports open with a summary block (`Description,,Summary Amt.`) followed
//! by the transaction table:
//! `Date,Description,Amount,Running Bal.`
//! The table's first row is usually a dated "Beginning balance" line with no
//! amount. Amounts are already signed.

use tracing::debug;

use super::{Row, Table};
use crate::error::Result;
use crate::models::{CanonicalTransaction, TransactionType};

const SUMMARY_MARKERS: [&str; 4] = [
    "Beginning balance",
    "Ending balance",
    "Total credits",
    "Total debits",
];

fn is_summary_row(description: &str) -> bool {
    SUMMARY_MARKERS.iter().any(|m| description.starts_with(m))
}

pub(super) fn parse(table: &Table) -> Result<Vec<CanonicalTransaction>> {
    let mut transactions = Vec::new();

    for row in table.rows() {
        if let Some(tx) = parse_row(&row)? {
            transactions.push(tx);
        }
    }

    debug!("Parsed {} BofA checking/savings transactions", transactions.len());
    Ok(transactions)
}

fn parse_row(row: &Row<'_>) -> Result<Option<CanonicalTransaction>> {
    let Some(date) = row.date("Date") else {
        return Ok(None);
    };

    let description = row.text("Description").unwrap_or_default();
    if is_summary_row(&description) {
        return Ok(None);
    }

    // Balance-only rows carry no amount
    let Some(amount) = row.amount("Amount")? else {
        return Ok(None);
    };

    let tx_type = if description.to_lowercase().contains("transfer") {
        TransactionType::Transfer
    } else {
        TransactionType::from_amount(amount)
    };

    Ok(Some(CanonicalTransaction {
        date,
        posted_date: None,
        amount,
        tx_type,
        balance: row.amount("Running Bal.")?,
        principal_amount: None,
        interest_amount: None,
        escrow_amount: None,
        fee_amount: None,
        payment_due_date: None,
        category: None,
        card_number: None,
        reference: row.reference(),
        raw: row.raw(),
        description,
    }))
}
