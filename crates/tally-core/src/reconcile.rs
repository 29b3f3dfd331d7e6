//! Partner reconciliation
//!
//! Links transactions to partners and keeps each partner's aggregates in
//! step with the ledger. Every change recomputes the affected partners from
//! scratch inside the same write unit, so aggregates never drift.

use std::collections::BTreeSet;

use rusqlite::params;
use tracing::{debug, info};

use crate::db::{
    get_account_on, get_partner_on, get_transaction_on, insert_internal_partner,
    recompute_partner_summary, Database,
};
use crate::error::{Error, Result};
use crate::models::Partner;

/// Assigns transactions to partners and maintains partner summaries
pub struct Reconciler<'a> {
    db: &'a Database,
}

impl<'a> Reconciler<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Assign a transaction to a partner
    ///
    /// Both ids are checked before anything is written. When the transaction
    /// moves from another partner, that partner is refreshed too.
    pub fn assign_partner(&self, transaction_id: &str, partner_id: i64) -> Result<Partner> {
        self.db.write(|tx| {
            let transaction = get_transaction_on(tx, transaction_id)?
                .ok_or_else(|| Error::UnknownTransaction(transaction_id.to_string()))?;
            get_partner_on(tx, partner_id)?.ok_or(Error::UnknownPartner(partner_id))?;

            tx.execute(
                "UPDATE transactions SET partner_id = ? WHERE id = ?",
                params![partner_id, transaction_id],
            )?;

            if let Some(previous) = transaction.partner_id.filter(|p| *p != partner_id) {
                debug!(
                    "Moving {} from partner {} to {}",
                    transaction_id, previous, partner_id
                );
                recompute_partner_summary(tx, previous)?;
            }

            recompute_partner_summary(tx, partner_id)?.ok_or(Error::UnknownPartner(partner_id))
        })
    }

    /// Remove a transaction's partner
    ///
    /// Returns false when the transaction had no partner.
    pub fn clear_partner(&self, transaction_id: &str) -> Result<bool> {
        self.db.write(|tx| {
            let transaction = get_transaction_on(tx, transaction_id)?
                .ok_or_else(|| Error::UnknownTransaction(transaction_id.to_string()))?;

            let Some(previous) = transaction.partner_id else {
                return Ok(false);
            };

            tx.execute(
                "UPDATE transactions SET partner_id = NULL WHERE id = ?",
                params![transaction_id],
            )?;
            recompute_partner_summary(tx, previous)?;
            Ok(true)
        })
    }

    /// Assign many transactions to one partner atomically
    ///
    /// Any unknown id aborts the whole batch with nothing written.
    pub fn assign_partner_bulk(&self, transaction_ids: &[String], partner_id: i64) -> Result<usize> {
        let count = self.db.write(|tx| {
            get_partner_on(tx, partner_id)?.ok_or(Error::UnknownPartner(partner_id))?;

            let mut touched = BTreeSet::new();
            let mut updated = 0;

            for id in transaction_ids {
                let transaction = get_transaction_on(tx, id)?
                    .ok_or_else(|| Error::UnknownTransaction(id.clone()))?;
                if let Some(previous) = transaction.partner_id {
                    touched.insert(previous);
                }
                updated += tx.execute(
                    "UPDATE transactions SET partner_id = ? WHERE id = ?",
                    params![partner_id, id],
                )?;
            }

            touched.insert(partner_id);
            for id in touched {
                recompute_partner_summary(tx, id)?;
            }
            Ok(updated)
        })?;

        info!("Assigned {} transactions to partner {}", count, partner_id);
        Ok(count)
    }

    /// Assign unassigned transactions whose description contains a partner alias
    ///
    /// Matching is case-insensitive; when several partners match, the one
    /// with the lowest id wins. Returns the number of transactions assigned.
    pub fn match_partners_by_alias(&self) -> Result<usize> {
        let count = self.db.write(|tx| {
            let mut stmt = tx.prepare("SELECT id, aliases FROM partners ORDER BY id")?;
            let rows: Vec<(i64, String)> = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            let partners: Vec<(i64, Vec<String>)> = rows
                .into_iter()
                .map(|(id, aliases)| (id, normalize_aliases(&aliases)))
                .filter(|(_, aliases)| !aliases.is_empty())
                .collect();

            if partners.is_empty() {
                return Ok(0);
            }

            let mut stmt =
                tx.prepare("SELECT id, description FROM transactions WHERE partner_id IS NULL")?;
            let unassigned: Vec<(String, String)> = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            let mut touched = BTreeSet::new();
            let mut assigned = 0;

            for (tx_id, description) in unassigned {
                let description = description.to_lowercase();
                let matched = partners.iter().find(|(_, aliases)| {
                    aliases.iter().any(|alias| description.contains(alias.as_str()))
                });

                if let Some((partner_id, _)) = matched {
                    tx.execute(
                        "UPDATE transactions SET partner_id = ? WHERE id = ?",
                        params![partner_id, tx_id],
                    )?;
                    touched.insert(*partner_id);
                    assigned += 1;
                }
            }

            for id in touched {
                recompute_partner_summary(tx, id)?;
            }
            Ok(assigned)
        })?;

        info!("Matched {} transactions to partners by alias", count);
        Ok(count)
    }

    /// Recompute one partner's aggregates; `None` when the partner is gone
    pub fn refresh_partner_summary(&self, partner_id: i64) -> Result<Option<Partner>> {
        self.db.write(|tx| recompute_partner_summary(tx, partner_id))
    }

    /// Recompute every partner's aggregates; returns how many were refreshed
    pub fn refresh_all_partner_summaries(&self) -> Result<usize> {
        let count = self.db.write(|tx| {
            let mut stmt = tx.prepare("SELECT id FROM partners ORDER BY id")?;
            let ids: Vec<i64> = stmt
                .query_map([], |row| row.get(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            let mut refreshed = 0;
            for id in ids {
                if recompute_partner_summary(tx, id)?.is_some() {
                    refreshed += 1;
                }
            }
            Ok(refreshed)
        })?;

        info!("Refreshed {} partner summaries", count);
        Ok(count)
    }

    /// Create the internal partner for every account that lacks one
    pub fn sync_internal_account_partners(&self) -> Result<usize> {
        let created = self.db.write(|tx| {
            let mut stmt = tx.prepare(
                r#"
                SELECT id FROM accounts
                WHERE id NOT IN (SELECT account_id FROM partners WHERE account_id IS NOT NULL)
                ORDER BY id
                "#,
            )?;
            let missing: Vec<String> = stmt
                .query_map([], |row| row.get(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            for account_id in &missing {
                let account = get_account_on(tx, account_id)?
                    .ok_or_else(|| Error::UnknownAccount(account_id.clone()))?;
                insert_internal_partner(tx, &account)?;
            }
            Ok(missing.len())
        })?;

        if created > 0 {
            info!("Created {} internal account partners", created);
        }
        Ok(created)
    }
}

/// Lowercased, trimmed, non-empty aliases from the stored JSON list
fn normalize_aliases(stored: &str) -> Vec<String> {
    serde_json::from_str::<Vec<String>>(stored)
        .unwrap_or_default()
        .into_iter()
        .map(|a| a.trim().to_lowercase())
        .filter(|a| !a.is_empty())
        .collect()
}
