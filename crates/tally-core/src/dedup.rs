//! Identity migration sweep
//!
//! Rows stored under an older id scheme are moved onto their canonical
//! content-derived id. Rows that turn out to be copies of an already
//! canonical row are removed, keeping any partner assignment. A stored
//! date that cannot be decoded aborts the sweep with nothing changed.

use std::collections::BTreeSet;

use rusqlite::{params, Connection};
use tracing::{debug, info};

use crate::db::{
    get_transaction_on, recompute_partner_summary, row_to_transaction, Database,
    TRANSACTION_COLUMNS,
};
use crate::error::Result;
use crate::identity::IdentityFields;
use crate::models::DedupResult;

/// Every stored column except `id`
const COPY_COLUMNS: &str = "account_id, date, posted_date, amount, description, tx_type, \
     balance, principal_amount, interest_amount, escrow_amount, category, card_number, \
     reference, partner_id, raw_data, created_at, fee_amount, payment_due_date";

/// Date columns that older rows may hold as full timestamps
const DATE_COLUMNS: [&str; 3] = ["date", "posted_date", "payment_due_date"];

impl Database {
    /// Re-key every transaction to its canonical id, removing duplicates
    ///
    /// Runs as one write unit. A second run right after finds nothing to do.
    pub fn deduplicate_transactions(&self) -> Result<DedupResult> {
        let result = self.write(|tx| {
            let normalized = normalize_stored_dates(tx)?;
            if normalized > 0 {
                debug!("Normalized {} timestamp-style dates", normalized);
            }

            let mut stmt = tx.prepare(&format!(
                "SELECT {} FROM transactions ORDER BY created_at, id",
                TRANSACTION_COLUMNS
            ))?;
            let rows = stmt
                .query_map([], row_to_transaction)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            let mut result = DedupResult {
                scanned: rows.len(),
                ..DedupResult::default()
            };
            let mut touched = BTreeSet::new();

            for row in &rows {
                let canonical = IdentityFields::from_stored(row).id();
                if canonical == row.id {
                    continue;
                }

                if let Some(partner_id) = row.partner_id {
                    touched.insert(partner_id);
                }

                match get_transaction_on(tx, &canonical)? {
                    Some(existing) => {
                        if existing.partner_id.is_none() && row.partner_id.is_some() {
                            tx.execute(
                                "UPDATE transactions SET partner_id = ? WHERE id = ?",
                                params![row.partner_id, canonical],
                            )?;
                        }
                        tx.execute("DELETE FROM transactions WHERE id = ?", params![row.id])?;
                        debug!("Removed {} (copy of {})", row.id, canonical);
                        result.removed_count += 1;
                    }
                    None => {
                        tx.execute(
                            &format!(
                                "INSERT INTO transactions (id, {cols}) SELECT ?, {cols} FROM transactions WHERE id = ?",
                                cols = COPY_COLUMNS
                            ),
                            params![canonical, row.id],
                        )?;
                        tx.execute("DELETE FROM transactions WHERE id = ?", params![row.id])?;
                        debug!("Migrated {} -> {}", row.id, canonical);
                        result.migrated_count += 1;
                    }
                }
            }

            for partner_id in touched {
                recompute_partner_summary(tx, partner_id)?;
            }

            Ok(result)
        })?;

        info!(
            "Dedup sweep: scanned {}, removed {}, migrated {}",
            result.scanned, result.removed_count, result.migrated_count
        );
        Ok(result)
    }
}

/// Cut timestamp-style dates (`2024-01-02T00:00:00.000Z`) down to the
/// written `YYYY-MM-DD` so ids and date filters see plain dates
fn normalize_stored_dates(conn: &Connection) -> Result<usize> {
    let mut changed = 0;
    for column in DATE_COLUMNS {
        changed += conn.execute(
            &format!(
                "UPDATE transactions SET {col} = substr({col}, 1, 10) \
                 WHERE length({col}) > 10 AND substr({col}, 11, 1) IN ('T', ' ')",
                col = column
            ),
            [],
        )?;
    }
    Ok(changed)
}
