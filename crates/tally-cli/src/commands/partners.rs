//! Partner command implementations

use anyhow::{Context, Result};
use tally_core::{Database, NewPartner, PartnerQuery, Reconciler, TransactionQuery};

use super::{format_amount, truncate};

pub fn cmd_partners_list(
    db: &Database,
    partner_type: Option<&str>,
    include_internal: bool,
) -> Result<()> {
    let partners = db.list_partners(&PartnerQuery {
        partner_type: partner_type.map(str::to_string),
        include_internal,
    })?;

    if partners.is_empty() {
        println!("No partners found. Add one with:");
        println!("  tally partners add \"Corner Coffee\" --alias \"COFFEE SHOP\"");
        return Ok(());
    }

    println!();
    println!("🤝 Partners");
    println!("   ─────────────────────────────────────────────────────────────");

    for partner in partners {
        let internal = if partner.is_internal { " (internal)" } else { "" };
        println!(
            "   [{}] {}{} │ {} │ {} txns │ net {}",
            partner.id,
            truncate(&partner.name, 30),
            internal,
            partner.partner_type,
            partner.transaction_count,
            format_amount(partner.net_amount)
        );
    }

    Ok(())
}

pub fn cmd_partners_add(
    db: &Database,
    name: &str,
    partner_type: &str,
    aliases: Vec<String>,
    categories: Vec<String>,
) -> Result<()> {
    let mut new = NewPartner::new(partner_type, name);
    new.aliases = aliases;
    new.categories = categories;

    let partner = db
        .create_partner(&new)
        .with_context(|| format!("Failed to create partner '{}'", name))?;

    println!("✅ Created partner [{}] {}", partner.id, partner.name);
    Ok(())
}

pub fn cmd_partners_show(db: &Database, id: i64) -> Result<()> {
    let partner = db
        .get_partner(id)?
        .ok_or_else(|| anyhow::anyhow!("Partner {} not found", id))?;

    println!();
    println!("🤝 {} [{}]", partner.name, partner.id);
    println!("   Type:       {}", partner.partner_type);
    if let Some(ref account_id) = partner.account_id {
        println!("   Account:    {}", account_id);
    }
    if !partner.aliases.is_empty() {
        println!("   Aliases:    {}", partner.aliases.join(", "));
    }
    if !partner.categories.is_empty() {
        println!("   Categories: {}", partner.categories.join(", "));
    }
    println!("   Count:      {}", partner.transaction_count);
    println!("   Debits:     ${:.2}", partner.total_debits);
    println!("   Credits:    ${:.2}", partner.total_credits);
    println!("   Net:        {}", format_amount(partner.net_amount));
    if let Some(updated) = partner.last_summary_update {
        println!("   Refreshed:  {}", updated.format("%Y-%m-%d %H:%M"));
    }

    let recent = db.list_transactions(&TransactionQuery::new().partner(id).page(10, 0))?;
    if !recent.is_empty() {
        println!();
        println!("   Recent transactions:");
        for tx in recent {
            println!(
                "   {} │ {:>12} │ {}",
                tx.date,
                format_amount(tx.amount),
                truncate(&tx.description, 40)
            );
        }
    }

    Ok(())
}

pub fn cmd_partners_alias(db: &Database, id: i64, aliases: &[String]) -> Result<()> {
    let partner = db
        .update_partner_aliases(id, aliases)
        .with_context(|| format!("Failed to update aliases for partner {}", id))?;

    println!(
        "✅ Aliases for {} set to: {}",
        partner.name,
        partner.aliases.join(", ")
    );
    Ok(())
}

pub fn cmd_partners_assign(db: &Database, partner_id: i64, transaction_ids: &[String]) -> Result<()> {
    let reconciler = Reconciler::new(db);

    if let [single] = transaction_ids {
        let partner = reconciler
            .assign_partner(single, partner_id)
            .with_context(|| format!("Failed to assign {} to partner {}", single, partner_id))?;
        println!(
            "✅ Assigned {} to {} ({} txns)",
            single, partner.name, partner.transaction_count
        );
        return Ok(());
    }

    let count = reconciler
        .assign_partner_bulk(transaction_ids, partner_id)
        .with_context(|| format!("Failed to assign transactions to partner {}", partner_id))?;
    println!("✅ Assigned {} transactions to partner {}", count, partner_id);
    Ok(())
}

pub fn cmd_partners_clear(db: &Database, transaction_id: &str) -> Result<()> {
    let cleared = Reconciler::new(db)
        .clear_partner(transaction_id)
        .with_context(|| format!("Failed to clear partner on {}", transaction_id))?;

    if cleared {
        println!("✅ Cleared partner on {}", transaction_id);
    } else {
        println!("   {} has no partner", transaction_id);
    }
    Ok(())
}

pub fn cmd_partners_refresh(db: &Database, id: Option<i64>) -> Result<()> {
    let reconciler = Reconciler::new(db);

    match id {
        Some(id) => match reconciler.refresh_partner_summary(id)? {
            Some(partner) => println!(
                "✅ Refreshed {}: {} txns, net {}",
                partner.name,
                partner.transaction_count,
                format_amount(partner.net_amount)
            ),
            None => println!("⚠️  Partner {} not found", id),
        },
        None => {
            let count = reconciler.refresh_all_partner_summaries()?;
            println!("✅ Refreshed {} partners", count);
        }
    }

    Ok(())
}

pub fn cmd_partners_sync(db: &Database) -> Result<()> {
    let created = Reconciler::new(db).sync_internal_account_partners()?;
    println!("✅ Created {} internal account partners", created);
    Ok(())
}

pub fn cmd_partners_match(db: &Database) -> Result<()> {
    let matched = Reconciler::new(db)
        .match_partners_by_alias()
        .context("Alias matching failed")?;
    println!("✅ Matched {} transactions by alias", matched);
    Ok(())
}
