//! Tally Core Library
//!
//! Statement import and partner reconciliation:
//! - Per-institution CSV processors producing canonical transactions
//! - Content-derived transaction identity and the dedup sweep
//! - SQLite ledger store with pooled connections and migrations
//! - Import orchestration with whole-file skip and provenance records
//! - Partner assignment with always-recomputed aggregates

pub mod config;
pub mod db;
pub mod dedup;
pub mod error;
pub mod identity;
pub mod import;
pub mod models;
pub mod processors;
pub mod reconcile;

/// Statement fixtures and seeded databases for tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::Config;
pub use db::{Database, TransactionQuery};
pub use error::{Error, Result};
pub use identity::{file_hash, transaction_id};
pub use import::Importer;
pub use models::*;
pub use processors::Processor;
pub use reconcile::Reconciler;
