//! Statement import orchestration
//!
//! Resolves an account to its processor, skips byte-identical re-imports,
//! parses, and writes new rows plus the import record as one unit.

use std::path::Path;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::db::{insert_import_record, insert_transaction_if_absent, Database};
use crate::error::{Error, Result};
use crate::identity::{file_hash, transaction_id};
use crate::models::{CanonicalTransaction, ImportOutcome};
use crate::processors::Processor;

/// Imports statement files into the ledger
pub struct Importer<'a> {
    db: &'a Database,
}

impl<'a> Importer<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Read a statement file from disk and import it
    pub fn import_file(&self, account_id: &str, path: &Path) -> Result<ImportOutcome> {
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.import_transactions(account_id, &bytes, &file_name)
    }

    /// Import raw statement bytes into an account
    ///
    /// Nothing is written unless the whole file parses. Rows whose id is
    /// already stored are counted as duplicates and left untouched.
    pub fn import_transactions(
        &self,
        account_id: &str,
        bytes: &[u8],
        file_name: &str,
    ) -> Result<ImportOutcome> {
        let account = self
            .db
            .get_account(account_id)?
            .ok_or_else(|| Error::UnknownAccount(account_id.to_string()))?;
        let processor = Processor::from_id(&account.processor_id)?;

        let hash = file_hash(bytes);
        if let Some(previous) = self.db.find_import_by_hash(account_id, &hash)? {
            warn!(
                "Skipping {}: identical to import {} ({}) for account {}",
                file_name, previous.id, previous.file_name, account_id
            );
            return Ok(skipped());
        }

        let parsed = processor.parse(bytes)?;
        debug!(
            "{} produced {} rows from {}",
            processor.id(),
            parsed.len(),
            file_name
        );

        let date_range = date_range(&parsed);

        let outcome = self.db.write(|tx| {
            // Authoritative check: another writer may have recorded this file
            // between the fast path and taking the write lock
            let already: bool = tx.query_row(
                "SELECT COUNT(*) > 0 FROM import_records WHERE account_id = ? AND file_hash = ?",
                [account_id, hash.as_str()],
                |row| row.get(0),
            )?;
            if already {
                return Ok(skipped());
            }

            let mut added = 0;
            for row in &parsed {
                let id = transaction_id(account_id, row);
                if insert_transaction_if_absent(tx, &id, account_id, row)? {
                    added += 1;
                }
            }

            let import_id =
                insert_import_record(tx, account_id, file_name, &hash, added, date_range)?;

            Ok(ImportOutcome {
                added,
                skipped: false,
                parsed: parsed.len(),
                duplicates: parsed.len() - added,
                import_id: Some(import_id),
            })
        })?;

        if outcome.skipped {
            warn!("Skipping {}: recorded by a concurrent import", file_name);
        } else {
            info!(
                "Imported {} new of {} parsed transactions from {} into {} ({} duplicates)",
                outcome.added, outcome.parsed, file_name, account_id, outcome.duplicates
            );
        }

        Ok(outcome)
    }
}

fn skipped() -> ImportOutcome {
    ImportOutcome {
        skipped: true,
        ..ImportOutcome::default()
    }
}

fn date_range(rows: &[CanonicalTransaction]) -> Option<(NaiveDate, NaiveDate)> {
    let start = rows.iter().map(|t| t.date).min()?;
    let end = rows.iter().map(|t| t.date).max()?;
    Some((start, end))
}
