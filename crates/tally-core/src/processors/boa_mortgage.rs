//! Bank of America mortgage activity
//!
//! Format: Date,Description,Type,Amount,Payment Due Date,Principal Amount,
//! Interest Paid,Escrow Amount[,Fee(s) Amount]
//!
//! Payments leave the borrower, so they are recorded as outflows. When the
//! export leaves `Amount` blank the payment is the sum of its parts.

use tracing::debug;

use super::{Row, Table};
use crate::error::Result;
use crate::models::{CanonicalTransaction, TransactionType};

pub(super) fn parse(table: &Table) -> Result<Vec<CanonicalTransaction>> {
    let mut transactions = Vec::new();

    for row in table.rows() {
        if let Some(tx) = parse_row(&row)? {
            transactions.push(tx);
        }
    }

    debug!("Parsed {} BofA mortgage transactions", transactions.len());
    Ok(transactions)
}

fn parse_row(row: &Row<'_>) -> Result<Option<CanonicalTransaction>> {
    let Some(date) = row.date("Date") else {
        return Ok(None);
    };

    let kind = row.get("Type").unwrap_or_default().to_lowercase();
    let principal = row.amount("Principal Amount")?;
    let interest = row.amount("Interest Paid")?;
    let escrow = row.amount("Escrow Amount")?;
    let fees = row.amount("Fee(s) Amount")?;

    let amount = match (kind.as_str(), row.amount("Amount")?) {
        ("payment", Some(amount)) => -amount.abs(),
        ("payment", None) => {
            let parts = [principal, interest, escrow, fees];
            if parts.iter().all(Option::is_none) {
                return Ok(None);
            }
            -parts.iter().flatten().map(|v| v.abs()).sum::<f64>()
        }
        (_, Some(amount)) => amount,
        (_, None) => return Ok(None),
    };

    let category = match kind.as_str() {
        "payment" => "payment",
        "escrow" => "escrow",
        _ => "other",
    };

    Ok(Some(CanonicalTransaction {
        date,
        posted_date: None,
        amount,
        description: row.text("Description").unwrap_or_default(),
        tx_type: TransactionType::from_amount(amount),
        balance: None,
        principal_amount: principal,
        interest_amount: interest,
        escrow_amount: escrow,
        fee_amount: fees,
        payment_due_date: row.date("Payment Due Date"),
        category: Some(category.to_string()),
        card_number: None,
        reference: row.reference(),
        raw: row.raw(),
    }))
}
