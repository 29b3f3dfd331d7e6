//! Import record operations

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{optional_date_column, parse_datetime, Database};
use crate::error::Result;
use crate::models::ImportRecord;

const IMPORT_RECORD_COLUMNS: &str =
    "id, account_id, file_name, file_hash, imported_at, transactions_added, date_start, date_end";

fn row_to_import_record(row: &Row<'_>) -> rusqlite::Result<ImportRecord> {
    let imported_at_str: String = row.get(4)?;

    Ok(ImportRecord {
        id: row.get(0)?,
        account_id: row.get(1)?,
        file_name: row.get(2)?,
        file_hash: row.get(3)?,
        imported_at: parse_datetime(&imported_at_str),
        transactions_added: row.get(5)?,
        date_start: optional_date_column(row, 6)?,
        date_end: optional_date_column(row, 7)?,
    })
}

/// Append the provenance record for one imported file
pub(crate) fn insert_import_record(
    conn: &Connection,
    account_id: &str,
    file_name: &str,
    file_hash: &str,
    transactions_added: usize,
    date_range: Option<(NaiveDate, NaiveDate)>,
) -> Result<i64> {
    conn.execute(
        r#"
        INSERT INTO import_records (account_id, file_name, file_hash, transactions_added, date_start, date_end)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
        params![
            account_id,
            file_name,
            file_hash,
            transactions_added as i64,
            date_range.map(|(start, _)| start.to_string()),
            date_range.map(|(_, end)| end.to_string()),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

impl Database {
    /// Find the import record for a file already ingested into an account
    pub fn find_import_by_hash(
        &self,
        account_id: &str,
        file_hash: &str,
    ) -> Result<Option<ImportRecord>> {
        let conn = self.conn()?;
        let record = conn
            .query_row(
                &format!(
                    "SELECT {} FROM import_records WHERE account_id = ? AND file_hash = ?",
                    IMPORT_RECORD_COLUMNS
                ),
                params![account_id, file_hash],
                row_to_import_record,
            )
            .optional()?;
        Ok(record)
    }

    /// List import records, newest first, optionally for one account
    pub fn list_import_records(&self, account_id: Option<&str>) -> Result<Vec<ImportRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {} FROM import_records
            WHERE ?1 IS NULL OR account_id = ?1
            ORDER BY imported_at DESC, id DESC
            "#,
            IMPORT_RECORD_COLUMNS
        ))?;

        let records = stmt
            .query_map(params![account_id], row_to_import_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }
}
