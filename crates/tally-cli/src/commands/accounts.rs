//! Account command implementations

use anyhow::{Context, Result};
use tally_core::{AccountType, Database, NewAccount};

pub fn cmd_accounts_list(db: &Database) -> Result<()> {
    let accounts = db.list_accounts()?;

    if accounts.is_empty() {
        println!("No accounts found. Add one with:");
        println!("  tally accounts add \"Checking\" -t checking -p boa_checking_savings");
        return Ok(());
    }

    println!();
    println!("📁 Accounts");
    println!("   ─────────────────────────────────────────────────────────────");

    for account in accounts {
        println!(
            "   {} │ {} ({}, {})",
            account.id, account.name, account.account_type, account.processor_id
        );
    }

    Ok(())
}

pub fn cmd_accounts_add(
    db: &Database,
    name: &str,
    account_type: &str,
    processor_id: &str,
    id: Option<&str>,
    processor_config: Option<&str>,
) -> Result<()> {
    let account_type: AccountType = account_type
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;

    let processor_config = match processor_config {
        Some(raw) => {
            let value: serde_json::Value =
                serde_json::from_str(raw).context("Processor config must be valid JSON")?;
            if !value.is_object() {
                anyhow::bail!("Processor config must be a JSON object");
            }
            value
        }
        None => serde_json::json!({}),
    };

    let account = db
        .create_account(&NewAccount {
            id: id.map(str::to_string),
            name: name.to_string(),
            account_type,
            processor_id: processor_id.to_string(),
            processor_config,
        })
        .with_context(|| format!("Failed to create account '{}'", name))?;

    println!("✅ Created account {} ({})", account.name, account.id);
    Ok(())
}

pub fn cmd_accounts_rename(db: &Database, id: &str, name: &str) -> Result<()> {
    let account = db
        .update_account(id, Some(name), None)
        .with_context(|| format!("Failed to rename account {}", id))?;

    println!("✅ Renamed account {} to {}", account.id, account.name);
    Ok(())
}
