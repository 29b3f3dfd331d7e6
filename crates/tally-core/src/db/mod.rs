//! Ledger store with connection pooling and migrations
//!
//! This module is organized by domain:
//! - `accounts` - Internal accounts and their processor binding
//! - `partners` - Counterparties, aliases and derived aggregates
//! - `transactions` - Ledger entries, listing and summaries
//! - `import_records` - Per-file import provenance

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::Type;
use rusqlite::{Connection, Row, TransactionBehavior};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::Result;

mod accounts;
mod import_records;
mod partners;
mod transaction_filter;
mod transactions;

pub(crate) use accounts::get_account_on;
pub(crate) use import_records::insert_import_record;
pub(crate) use partners::{get_partner_on, insert_internal_partner, recompute_partner_summary};
pub use transaction_filter::{FilterResult, TransactionQuery};
pub(crate) use transactions::{
    get_transaction_on, insert_transaction_if_absent, row_to_transaction, TRANSACTION_COLUMNS,
};

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Parse a SQLite datetime string into a DateTime<Utc>
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    // SQLite stores as "YYYY-MM-DD HH:MM:SS" format
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.and_utc())
        .unwrap_or_else(|_| Utc::now())
}

/// Calendar date of a stored date value
///
/// Dates are written as `YYYY-MM-DD`. Older rows may hold a timestamp
/// (`2024-01-02T00:00:00.000Z`, `2024-01-02 08:30:00`); those keep the
/// date as written. Anything else is `None`.
pub(crate) fn parse_date(s: &str) -> Option<NaiveDate> {
    let day = s.get(..10)?;
    let rest = s.get(10..)?;
    if !(rest.is_empty() || rest.starts_with(['T', ' '])) {
        return None;
    }
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

/// Conversion error for a stored column that does not decode
pub(crate) fn invalid_column(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

/// Read a required date column; undecodable values are errors, never defaults
pub(crate) fn date_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let value: String = row.get(idx)?;
    parse_date(&value)
        .ok_or_else(|| invalid_column(idx, format!("invalid stored date '{}'", value)))
}

/// Read a nullable date column
pub(crate) fn optional_date_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    let value: Option<String> = row.get(idx)?;
    value
        .map(|v| {
            parse_date(&v).ok_or_else(|| invalid_column(idx, format!("invalid stored date '{}'", v)))
        })
        .transpose()
}

/// Ledger database wrapper with connection pooling
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    /// Path to the database file
    db_path: PathBuf,
}

impl Database {
    /// Open the ledger under a configured data directory
    ///
    /// Creates `<data_dir>/db/` if needed.
    pub fn open(config: &Config) -> Result<Self> {
        let path = config.db_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::open_with(&path, config.pool_size, config.busy_timeout())
    }

    /// Open a database file directly with default pool settings
    pub fn open_path(path: &Path) -> Result<Self> {
        let defaults = Config::with_data_dir(".");
        Self::open_with(path, defaults.pool_size, defaults.busy_timeout())
    }

    fn open_with(path: &Path, pool_size: u32, busy_timeout: Duration) -> Result<Self> {
        // Pragmas are per-connection, so set them on every pooled connection
        let manager = SqliteConnectionManager::file(path).with_init(move |conn| {
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
            conn.busy_timeout(busy_timeout)?;
            Ok(())
        });

        let pool = Pool::builder().max_size(pool_size).build(manager)?;

        let db = Self {
            pool,
            db_path: path.to_path_buf(),
        };
        db.run_migrations()?;

        info!("Opened ledger at {}", path.display());
        Ok(db)
    }

    /// Get the path to the database file
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Create a throwaway database (for testing)
    ///
    /// Backed by a temp file rather than `:memory:` so every pooled
    /// connection sees the same data.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!(
            "tally_test_{}_{}.db",
            std::process::id(),
            id
        ));

        // Remove any leftovers from an earlier run
        for suffix in ["", "-wal", "-shm"] {
            let mut stale = path.clone().into_os_string();
            stale.push(suffix);
            let _ = std::fs::remove_file(stale);
        }

        Self::open_path(&path)
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    /// Run `f` inside one `BEGIN IMMEDIATE` transaction
    ///
    /// Commits when `f` returns Ok; any error rolls back every statement.
    /// IMMEDIATE takes the write lock up front so concurrent writers queue
    /// on `busy_timeout` instead of failing mid-unit.
    pub(crate) fn write<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&rusqlite::Transaction<'_>) -> Result<T>,
    {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Run database migrations
    ///
    /// Every step is idempotent; running this against an up-to-date file
    /// changes nothing.
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- WAL mode: readers don't block the single writer
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;

            -- Internal accounts
            CREATE TABLE IF NOT EXISTS accounts (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                account_type TEXT NOT NULL,
                processor_id TEXT NOT NULL,
                processor_config TEXT NOT NULL DEFAULT '{}',
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            -- Counterparties with derived aggregates
            CREATE TABLE IF NOT EXISTS partners (
                id INTEGER PRIMARY KEY,
                partner_type TEXT NOT NULL,
                name TEXT NOT NULL,
                is_internal INTEGER NOT NULL DEFAULT 0,
                aliases TEXT NOT NULL DEFAULT '[]',
                categories TEXT NOT NULL DEFAULT '[]',
                metadata TEXT NOT NULL DEFAULT '{}',
                transaction_count INTEGER NOT NULL DEFAULT 0,
                total_debits REAL NOT NULL DEFAULT 0,
                total_credits REAL NOT NULL DEFAULT 0,
                net_amount REAL NOT NULL DEFAULT 0,
                last_summary_update DATETIME,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_partners_type ON partners(partner_type);

            -- Ledger entries keyed by content-derived id
            CREATE TABLE IF NOT EXISTS transactions (
                id TEXT PRIMARY KEY,
                account_id TEXT NOT NULL REFERENCES accounts(id),
                date DATE NOT NULL,
                posted_date DATE,
                amount REAL NOT NULL,
                description TEXT NOT NULL,
                tx_type TEXT NOT NULL,
                balance REAL,
                principal_amount REAL,
                interest_amount REAL,
                escrow_amount REAL,
                category TEXT,
                card_number TEXT,
                partner_id INTEGER REFERENCES partners(id),
                raw_data TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_transactions_account_date ON transactions(account_id, date);
            CREATE INDEX IF NOT EXISTS idx_transactions_date ON transactions(date);
            CREATE INDEX IF NOT EXISTS idx_transactions_partner ON transactions(partner_id);

            -- One row per file ingested into an account
            CREATE TABLE IF NOT EXISTS import_records (
                id INTEGER PRIMARY KEY,
                account_id TEXT NOT NULL REFERENCES accounts(id),
                file_name TEXT NOT NULL,
                file_hash TEXT NOT NULL,
                imported_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                transactions_added INTEGER NOT NULL DEFAULT 0,
                date_start DATE,
                date_end DATE,
                UNIQUE(account_id, file_hash)
            );
            "#,
        )?;

        // Columns added after the first release
        ensure_column(&conn, "transactions", "reference", "TEXT")?;
        ensure_column(&conn, "transactions", "fee_amount", "REAL")?;
        ensure_column(&conn, "transactions", "payment_due_date", "DATE")?;
        ensure_column(
            &conn,
            "partners",
            "account_id",
            "TEXT REFERENCES accounts(id)",
        )?;

        conn.execute_batch(
            r#"
            CREATE UNIQUE INDEX IF NOT EXISTS idx_partners_account ON partners(account_id);

            DROP VIEW IF EXISTS transactions_view;
            CREATE VIEW transactions_view AS
            SELECT
                t.id,
                t.account_id,
                a.name AS account_name,
                t.date,
                t.amount,
                t.description,
                t.tx_type,
                t.partner_id,
                p.name AS partner_name,
                p.is_internal AS partner_is_internal,
                t.balance,
                t.category,
                t.card_number,
                t.principal_amount,
                t.interest_amount,
                t.escrow_amount,
                t.fee_amount
            FROM transactions t
            LEFT JOIN accounts a ON a.id = t.account_id
            LEFT JOIN partners p ON p.id = t.partner_id;
            "#,
        )?;

        Ok(())
    }
}

/// Add a column if the table does not have it yet
pub(crate) fn ensure_column(
    conn: &Connection,
    table: &str,
    column: &str,
    definition: &str,
) -> Result<bool> {
    let exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM pragma_table_info(?1) WHERE name = ?2",
        [table, column],
        |row| row.get(0),
    )?;

    if exists {
        return Ok(false);
    }

    conn.execute_batch(&format!(
        "ALTER TABLE {} ADD COLUMN {} {}",
        table, column, definition
    ))?;
    debug!("Added column {}.{}", table, column);
    Ok(true)
}
