//! Tally CLI - Statement import and partner reconciliation
//!
//! Usage:
//!   tally init                                   Initialize data directory
//!   tally accounts add NAME -t checking -p ID    Add an account
//!   tally import --account ID --file CSV         Import a statement
//!   tally partners match                         Assign partners by alias

mod cli;
mod commands;


use anyhow::{Context, Result};
use clap::Parser;
use tally_core::Config;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let config = Config::resolve(cli.config.as_deref(), cli.data_dir.as_deref())
        .context("Failed to load configuration")?;
    debug!("Data directory: {}", config.data_dir.display());

    match cli.command {
        Commands::Init => commands::cmd_init(&config),
        Commands::Processors => commands::cmd_processors(),
        Commands::Accounts { action } => {
            let db = commands::open_db(&config)?;
            match action {
                None | Some(AccountsAction::List) => commands::cmd_accounts_list(&db),
                Some(AccountsAction::Add {
                    name,
                    account_type,
                    processor,
                    id,
                    processor_config,
                }) => commands::cmd_accounts_add(
                    &db,
                    &name,
                    &account_type,
                    &processor,
                    id.as_deref(),
                    processor_config.as_deref(),
                ),
                Some(AccountsAction::Rename { id, name }) => {
                    commands::cmd_accounts_rename(&db, &id, &name)
                }
            }
        }
        Commands::Import { account, file } => {
            let db = commands::open_db(&config)?;
            commands::cmd_import(&db, &account, &file)
        }
        Commands::Imports { account } => {
            let db = commands::open_db(&config)?;
            commands::cmd_imports(&db, account.as_deref())
        }
        Commands::Transactions {
            filter,
            limit,
            offset,
        } => {
            let db = commands::open_db(&config)?;
            commands::cmd_transactions_list(&db, &filter.to_query().page(limit, offset))
        }
        Commands::Summary { filter } => {
            let db = commands::open_db(&config)?;
            commands::cmd_summary(&db, &filter.to_query())
        }
        Commands::Categories { filter } => {
            let db = commands::open_db(&config)?;
            commands::cmd_categories(&db, &filter.to_query())
        }
        Commands::Mortgage { filter } => {
            let db = commands::open_db(&config)?;
            commands::cmd_mortgage(&db, &filter.to_query())
        }
        Commands::Partners { action } => {
            let db = commands::open_db(&config)?;
            match action {
                None => commands::cmd_partners_list(&db, None, false),
                Some(PartnersAction::List {
                    partner_type,
                    internal,
                }) => commands::cmd_partners_list(&db, partner_type.as_deref(), internal),
                Some(PartnersAction::Add {
                    name,
                    partner_type,
                    aliases,
                    categories,
                }) => commands::cmd_partners_add(&db, &name, &partner_type, aliases, categories),
                Some(PartnersAction::Show { id }) => commands::cmd_partners_show(&db, id),
                Some(PartnersAction::Alias { id, aliases }) => {
                    commands::cmd_partners_alias(&db, id, &aliases)
                }
                Some(PartnersAction::Assign {
                    partner_id,
                    transaction_ids,
                }) => commands::cmd_partners_assign(&db, partner_id, &transaction_ids),
                Some(PartnersAction::Clear { transaction_id }) => {
                    commands::cmd_partners_clear(&db, &transaction_id)
                }
                Some(PartnersAction::Refresh { id }) => commands::cmd_partners_refresh(&db, id),
                Some(PartnersAction::Sync) => commands::cmd_partners_sync(&db),
                Some(PartnersAction::Match) => commands::cmd_partners_match(&db),
            }
        }
        Commands::Dedup => {
            let db = commands::open_db(&config)?;
            commands::cmd_dedup(&db)
        }
    }
}
