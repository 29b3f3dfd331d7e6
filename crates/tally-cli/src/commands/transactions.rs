//! Transaction command implementations

use anyhow::Result;
use tally_core::{Database, TransactionQuery, TransactionType};

use super::{format_amount, truncate};

pub fn cmd_transactions_list(db: &Database, query: &TransactionQuery) -> Result<()> {
    let transactions = db.list_transactions(query)?;

    if transactions.is_empty() {
        println!("No transactions found. Import some with:");
        println!("  tally import --account <id> --file statement.csv");
        return Ok(());
    }

    let total = db.count_transactions(query)?;

    println!();
    println!("📝 Transactions ({} shown of {})", transactions.len(), total);
    println!("   ─────────────────────────────────────────────────────────────");

    for tx in transactions {
        let marker = if tx.tx_type == TransactionType::Transfer {
            "⇄"
        } else {
            " "
        };
        let partner = tx.partner_name.as_deref().unwrap_or("-");

        println!(
            "   {} │ {:>12} {} │ {:<40} │ {} │ {}",
            tx.date,
            format_amount(tx.amount),
            marker,
            truncate(&tx.description, 40),
            truncate(partner, 20),
            &tx.id[..12.min(tx.id.len())]
        );
    }

    Ok(())
}

pub fn cmd_summary(db: &Database, query: &TransactionQuery) -> Result<()> {
    let summary = db.get_summary(query)?;

    println!();
    println!("📊 Summary");
    println!("   ─────────────────────────────");

    match (summary.first_date, summary.last_date) {
        (Some(first), Some(last)) => println!("   Period:    {} → {}", first, last),
        _ => println!("   Period:    (no transactions)"),
    }
    println!("   Count:     {}", summary.count);
    println!("   Inflows:   ${:.2}", summary.inflows);
    println!("   Outflows:  ${:.2}", summary.outflows);
    println!("   Net:       ${:.2}", summary.inflows - summary.outflows);
    println!("   Transfers: ${:.2}", summary.transfers);

    Ok(())
}

pub fn cmd_categories(db: &Database, query: &TransactionQuery) -> Result<()> {
    let totals = db.category_totals(query)?;

    if totals.is_empty() {
        println!("No categorized transactions found.");
        return Ok(());
    }

    println!();
    println!("🏷️  Categories");
    println!("   ─────────────────────────────────────────────");

    for row in totals {
        println!(
            "   {:<30} │ {:>5} txns │ ${:>10.2}",
            truncate(&row.category, 30),
            row.count,
            row.total
        );
    }

    Ok(())
}

pub fn cmd_mortgage(db: &Database, query: &TransactionQuery) -> Result<()> {
    let totals = db.mortgage_component_totals(query)?;

    if totals.payment_count == 0 {
        println!("No mortgage payments found.");
        return Ok(());
    }

    println!();
    println!("🏠 Mortgage Payments");
    println!("   ─────────────────────────────");
    println!("   Payments:  {}", totals.payment_count);
    println!("   Principal: ${:.2}", totals.principal);
    println!("   Interest:  ${:.2}", totals.interest);
    println!("   Escrow:    ${:.2}", totals.escrow);
    println!("   Fees:      ${:.2}", totals.fees);
    println!("   Total:     ${:.2}", totals.total_paid);

    Ok(())
}
