//! Capital One credit card
//!
//! Format: Transaction Date,Posted Date,Card No.,Description,Category,Debit,Credit
//! Charges appear as positive numbers in `Debit`, payments and refunds in
//! `Credit`.

use tracing::debug;

use super::{Row, Table};
use crate::error::Result;
use crate::models::{CanonicalTransaction, TransactionType};

/// Category Capital One uses for card payments
const PAYMENT_CATEGORY: &str = "Payment/Credit";

pub(super) fn parse(table: &Table) -> Result<Vec<CanonicalTransaction>> {
    let mut transactions = Vec::new();

    for row in table.rows() {
        if let Some(tx) = parse_row(&row)? {
            transactions.push(tx);
        }
    }

    debug!("Parsed {} Capital One transactions", transactions.len());
    Ok(transactions)
}

fn parse_row(row: &Row<'_>) -> Result<Option<CanonicalTransaction>> {
    let Some(date) = row.date("Transaction Date") else {
        return Ok(None);
    };

    let amount = match (row.amount("Debit")?, row.amount("Credit")?) {
        (Some(debit), _) if debit != 0.0 => -debit.abs(),
        (_, Some(credit)) => credit.abs(),
        (Some(debit), None) => -debit.abs(),
        (None, None) => return Ok(None),
    };

    let category = row.text("Category");
    let tx_type = if category
        .as_deref()
        .is_some_and(|c| c.eq_ignore_ascii_case(PAYMENT_CATEGORY))
    {
        TransactionType::Transfer
    } else {
        TransactionType::from_amount(amount)
    };

    Ok(Some(CanonicalTransaction {
        date,
        posted_date: row.date("Posted Date"),
        amount,
        description: row.text("Description").unwrap_or_default(),
        tx_type,
        balance: None,
        principal_amount: None,
        interest_amount: None,
        escrow_amount: None,
        fee_amount: None,
        payment_due_date: None,
        category,
        card_number: row.text("Card No."),
        reference: row.reference(),
        raw: row.raw(),
    }))
}
