//! Account operations

use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::info;

use super::partners::insert_internal_partner;
use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{Account, AccountType, NewAccount};
use crate::processors::Processor;

const ACCOUNT_COLUMNS: &str =
    "id, name, account_type, processor_id, processor_config, created_at, updated_at";

fn row_to_account(row: &Row<'_>) -> rusqlite::Result<Account> {
    let account_type_str: String = row.get(2)?;
    let config_str: String = row.get(4)?;
    let created_at_str: String = row.get(5)?;
    let updated_at_str: String = row.get(6)?;

    Ok(Account {
        id: row.get(0)?,
        name: row.get(1)?,
        account_type: account_type_str.parse().unwrap_or(AccountType::Checking),
        processor_id: row.get(3)?,
        processor_config: serde_json::from_str(&config_str)
            .unwrap_or_else(|_| serde_json::json!({})),
        created_at: parse_datetime(&created_at_str),
        updated_at: parse_datetime(&updated_at_str),
    })
}

pub(crate) fn get_account_on(conn: &Connection, id: &str) -> Result<Option<Account>> {
    let account = conn
        .query_row(
            &format!("SELECT {} FROM accounts WHERE id = ?", ACCOUNT_COLUMNS),
            params![id],
            row_to_account,
        )
        .optional()?;
    Ok(account)
}

impl Database {
    /// Create an account together with its internal partner
    ///
    /// The processor id must name a registered processor. When no id is
    /// given one is generated as `acc_<uuid>`.
    pub fn create_account(&self, new: &NewAccount) -> Result<Account> {
        Processor::from_id(&new.processor_id)?;

        let id = new
            .id
            .clone()
            .unwrap_or_else(|| format!("acc_{}", uuid::Uuid::new_v4().simple()));
        let config = serde_json::to_string(&new.processor_config)?;

        let account = self.write(|tx| {
            if get_account_on(tx, &id)?.is_some() {
                return Err(Error::InvalidData(format!("Account already exists: {}", id)));
            }

            tx.execute(
                "INSERT INTO accounts (id, name, account_type, processor_id, processor_config)
                 VALUES (?, ?, ?, ?, ?)",
                params![
                    id,
                    new.name,
                    new.account_type.as_str(),
                    new.processor_id,
                    config
                ],
            )?;

            let account = get_account_on(tx, &id)?
                .ok_or_else(|| Error::UnknownAccount(id.clone()))?;
            insert_internal_partner(tx, &account)?;
            Ok(account)
        })?;

        info!("Created account {} ({})", account.id, account.name);
        Ok(account)
    }

    /// Get an account by ID
    pub fn get_account(&self, id: &str) -> Result<Option<Account>> {
        let conn = self.conn()?;
        get_account_on(&conn, id)
    }

    /// List all accounts
    pub fn list_accounts(&self) -> Result<Vec<Account>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM accounts ORDER BY name, id",
            ACCOUNT_COLUMNS
        ))?;

        let accounts = stmt
            .query_map([], row_to_account)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(accounts)
    }

    /// Update an account's name and/or processor configuration
    ///
    /// Renaming also renames the account's internal partner.
    pub fn update_account(
        &self,
        id: &str,
        name: Option<&str>,
        processor_config: Option<&serde_json::Value>,
    ) -> Result<Account> {
        let config = processor_config.map(serde_json::to_string).transpose()?;

        self.write(|tx| {
            if get_account_on(tx, id)?.is_none() {
                return Err(Error::UnknownAccount(id.to_string()));
            }

            if let Some(name) = name {
                tx.execute(
                    "UPDATE accounts SET name = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
                    params![name, id],
                )?;
                tx.execute(
                    "UPDATE partners SET name = ? WHERE account_id = ? AND is_internal = 1",
                    params![name, id],
                )?;
            }

            if let Some(config) = &config {
                tx.execute(
                    "UPDATE accounts SET processor_config = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
                    params![config, id],
                )?;
            }

            get_account_on(tx, id)?.ok_or_else(|| Error::UnknownAccount(id.to_string()))
        })
    }
}
