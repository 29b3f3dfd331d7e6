//! Partner operations

use rusqlite::{params, Connection, OptionalExtension, Row, ToSql};
use tracing::{debug, warn};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{Account, NewPartner, Partner, PartnerQuery, INTERNAL_PARTNER_TYPE};

const PARTNER_COLUMNS: &str = "id, partner_type, name, is_internal, aliases, categories, metadata, \
     account_id, transaction_count, total_debits, total_credits, net_amount, \
     last_summary_update, created_at";

fn row_to_partner(row: &Row<'_>) -> rusqlite::Result<Partner> {
    let aliases_str: String = row.get(4)?;
    let categories_str: String = row.get(5)?;
    let metadata_str: String = row.get(6)?;
    let last_update_str: Option<String> = row.get(12)?;
    let created_at_str: String = row.get(13)?;

    Ok(Partner {
        id: row.get(0)?,
        partner_type: row.get(1)?,
        name: row.get(2)?,
        is_internal: row.get(3)?,
        aliases: serde_json::from_str(&aliases_str).unwrap_or_default(),
        categories: serde_json::from_str(&categories_str).unwrap_or_default(),
        metadata: serde_json::from_str(&metadata_str).unwrap_or_else(|_| serde_json::json!({})),
        account_id: row.get(7)?,
        transaction_count: row.get(8)?,
        total_debits: row.get(9)?,
        total_credits: row.get(10)?,
        net_amount: row.get(11)?,
        last_summary_update: last_update_str.as_deref().map(parse_datetime),
        created_at: parse_datetime(&created_at_str),
    })
}

pub(crate) fn get_partner_on(conn: &Connection, id: i64) -> Result<Option<Partner>> {
    let partner = conn
        .query_row(
            &format!("SELECT {} FROM partners WHERE id = ?", PARTNER_COLUMNS),
            params![id],
            row_to_partner,
        )
        .optional()?;
    Ok(partner)
}

/// Create the internal partner standing for an account
pub(crate) fn insert_internal_partner(conn: &Connection, account: &Account) -> Result<i64> {
    let metadata = serde_json::json!({ "account_type": account.account_type.as_str() });
    conn.execute(
        "INSERT INTO partners (partner_type, name, is_internal, metadata, account_id)
         VALUES (?, ?, 1, ?, ?)",
        params![
            INTERNAL_PARTNER_TYPE,
            account.name,
            metadata.to_string(),
            account.id
        ],
    )?;
    let id = conn.last_insert_rowid();
    debug!("Created internal partner {} for account {}", id, account.id);
    Ok(id)
}

/// Recompute a partner's aggregates from the ledger
///
/// Always a full recompute, never an incremental adjustment. A missing
/// partner is a no-op returning `None`.
pub(crate) fn recompute_partner_summary(conn: &Connection, id: i64) -> Result<Option<Partner>> {
    let (count, debits, credits, net): (i64, f64, f64, f64) = conn.query_row(
        r#"
        SELECT
            COUNT(*),
            COALESCE(SUM(CASE WHEN amount < 0 THEN -amount ELSE 0 END), 0),
            COALESCE(SUM(CASE WHEN amount >= 0 THEN amount ELSE 0 END), 0),
            COALESCE(SUM(amount), 0)
        FROM transactions
        WHERE partner_id = ?
        "#,
        params![id],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
    )?;

    let updated = conn.execute(
        r#"
        UPDATE partners
        SET transaction_count = ?, total_debits = ?, total_credits = ?, net_amount = ?,
            last_summary_update = CURRENT_TIMESTAMP
        WHERE id = ?
        "#,
        params![count, debits, credits, net, id],
    )?;

    if updated == 0 {
        warn!("Partner {} not found; summary refresh skipped", id);
        return Ok(None);
    }

    get_partner_on(conn, id)
}

impl Database {
    /// Create an external partner
    pub fn create_partner(&self, new: &NewPartner) -> Result<Partner> {
        if new.name.trim().is_empty() {
            return Err(Error::InvalidData("Partner name cannot be empty".into()));
        }

        let aliases = serde_json::to_string(&new.aliases)?;
        let categories = serde_json::to_string(&new.categories)?;
        let metadata = serde_json::to_string(&new.metadata)?;

        self.write(|tx| {
            tx.execute(
                "INSERT INTO partners (partner_type, name, is_internal, aliases, categories, metadata)
                 VALUES (?, ?, 0, ?, ?, ?)",
                params![new.partner_type, new.name, aliases, categories, metadata],
            )?;
            let id = tx.last_insert_rowid();
            get_partner_on(tx, id)?.ok_or(Error::UnknownPartner(id))
        })
    }

    /// Get a partner by ID
    pub fn get_partner(&self, id: i64) -> Result<Option<Partner>> {
        let conn = self.conn()?;
        get_partner_on(&conn, id)
    }

    /// Get the internal partner linked to an account
    pub fn get_internal_partner(&self, account_id: &str) -> Result<Option<Partner>> {
        let conn = self.conn()?;
        let partner = conn
            .query_row(
                &format!(
                    "SELECT {} FROM partners WHERE account_id = ? AND is_internal = 1",
                    PARTNER_COLUMNS
                ),
                params![account_id],
                row_to_partner,
            )
            .optional()?;
        Ok(partner)
    }

    /// List partners, optionally filtered by type
    ///
    /// Internal (account) partners are left out unless asked for.
    pub fn list_partners(&self, query: &PartnerQuery) -> Result<Vec<Partner>> {
        let conn = self.conn()?;

        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(ref partner_type) = query.partner_type {
            conditions.push("partner_type = ?");
            params.push(Box::new(partner_type.clone()));
        }
        if !query.include_internal {
            conditions.push("is_internal = 0");
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let sql = format!(
            "SELECT {} FROM partners {} ORDER BY name COLLATE NOCASE, id",
            PARTNER_COLUMNS, where_clause
        );

        let mut stmt = conn.prepare(&sql)?;
        let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let partners = stmt
            .query_map(param_refs.as_slice(), row_to_partner)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(partners)
    }

    /// Replace a partner's alias list
    pub fn update_partner_aliases(&self, id: i64, aliases: &[String]) -> Result<Partner> {
        self.update_partner_json(id, "aliases", &serde_json::to_string(aliases)?)
    }

    /// Replace a partner's category list
    pub fn update_partner_categories(&self, id: i64, categories: &[String]) -> Result<Partner> {
        self.update_partner_json(id, "categories", &serde_json::to_string(categories)?)
    }

    fn update_partner_json(&self, id: i64, column: &str, value: &str) -> Result<Partner> {
        self.write(|tx| {
            let updated = tx.execute(
                &format!("UPDATE partners SET {} = ? WHERE id = ?", column),
                params![value, id],
            )?;
            if updated == 0 {
                return Err(Error::UnknownPartner(id));
            }
            get_partner_on(tx, id)?.ok_or(Error::UnknownPartner(id))
        })
    }
}
