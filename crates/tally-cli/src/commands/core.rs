//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the ledger
//! - `cmd_init` - Initialize the data directory
//! - `cmd_processors` - List statement processors
//! - `cmd_dedup` - Run the identity migration sweep

use anyhow::{Context, Result};
use tally_core::{Config, Database, Processor, Reconciler};

/// Open the ledger and make sure every account has its internal partner
pub fn open_db(config: &Config) -> Result<Database> {
    let db = Database::open(config).with_context(|| {
        format!("Failed to open database at {}", config.db_path().display())
    })?;
    Reconciler::new(&db)
        .sync_internal_account_partners()
        .context("Failed to sync internal account partners")?;
    Ok(db)
}

pub fn cmd_init(config: &Config) -> Result<()> {
    println!(
        "🔧 Initializing data directory at {}...",
        config.data_dir.display()
    );

    let db = open_db(config)?;
    println!("   Database: {}", db.path().display());
    println!("   Accounts: {}", db.list_accounts()?.len());

    println!("✅ Ledger initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Add an account: tally accounts add \"Checking\" -t checking -p boa_checking_savings");
    println!("  2. Import a statement: tally import --account <id> --file statement.csv");

    Ok(())
}

pub fn cmd_processors() -> Result<()> {
    println!();
    println!("🏦 Statement Processors");
    println!("   ─────────────────────────────────────────────────────────────");

    for processor in Processor::all() {
        println!("   {} - {}", processor.id(), processor.name());
        println!("      {}", processor.description());
        println!("      Columns: {}", processor.required_headers().join(", "));
    }

    Ok(())
}

pub fn cmd_dedup(db: &Database) -> Result<()> {
    println!("🧹 Checking transaction ids...");

    let result = db
        .deduplicate_transactions()
        .context("Dedup sweep failed")?;

    println!("   Scanned:  {}", result.scanned);
    println!("   Migrated: {}", result.migrated_count);
    println!("   Removed:  {}", result.removed_count);

    if result.migrated_count == 0 && result.removed_count == 0 {
        println!("✅ All transaction ids are canonical");
    } else {
        println!("✅ Dedup complete");
    }

    Ok(())
}
