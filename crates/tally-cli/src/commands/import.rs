//! Import command implementations

use std::path::Path;

use anyhow::{Context, Result};
use tally_core::{Database, Importer};

pub fn cmd_import(db: &Database, account_id: &str, file: &Path) -> Result<()> {
    println!("📥 Importing {} into {}...", file.display(), account_id);

    let outcome = Importer::new(db)
        .import_file(account_id, file)
        .with_context(|| format!("Failed to import {}", file.display()))?;

    if outcome.skipped {
        println!("   ⏭️  File already imported into this account, nothing to do");
        return Ok(());
    }

    println!("   Parsed:     {}", outcome.parsed);
    println!("   Added:      {}", outcome.added);
    println!("   Duplicates: {}", outcome.duplicates);
    println!("✅ Import complete");

    Ok(())
}

pub fn cmd_imports(db: &Database, account_id: Option<&str>) -> Result<()> {
    let records = db.list_import_records(account_id)?;

    if records.is_empty() {
        println!("No imports yet. Import a statement with:");
        println!("  tally import --account <id> --file statement.csv");
        return Ok(());
    }

    println!();
    println!("📜 Import History");
    println!("   ─────────────────────────────────────────────────────────────");

    for record in records {
        let range = match (record.date_start, record.date_end) {
            (Some(start), Some(end)) => format!("{} → {}", start, end),
            _ => "no rows".to_string(),
        };
        println!(
            "   {} │ {} │ {} │ +{} │ {}",
            record.imported_at.format("%Y-%m-%d %H:%M"),
            record.account_id,
            super::truncate(&record.file_name, 30),
            record.transactions_added,
            range
        );
    }

    Ok(())
}
