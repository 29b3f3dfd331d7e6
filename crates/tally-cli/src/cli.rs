//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tally_core::TransactionQuery;

/// Tally - Import bank statements and reconcile them with partners
#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Statement import and partner reconciliation", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Data directory (holds db/central.db and optional config.toml)
    #[arg(long, env = "TALLY_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Config file (defaults to <data-dir>/config.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the data directory and database
    Init,

    /// List available statement processors
    Processors,

    /// Manage accounts
    Accounts {
        #[command(subcommand)]
        action: Option<AccountsAction>,
    },

    /// Import a statement file into an account
    Import {
        /// Account ID to import into
        #[arg(short, long)]
        account: String,

        /// CSV file to import
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Show import history
    Imports {
        /// Only show imports for this account
        #[arg(short, long)]
        account: Option<String>,
    },

    /// List transactions
    Transactions {
        #[command(flatten)]
        filter: FilterArgs,

        /// Maximum rows to show
        #[arg(short, long, default_value = "20")]
        limit: i64,

        /// Rows to skip
        #[arg(long, default_value = "0")]
        offset: i64,
    },

    /// Show inflow/outflow totals
    Summary {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Show totals per category
    Categories {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Show principal, interest, escrow and fee totals over mortgage payments
    Mortgage {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Manage partners and assignments
    Partners {
        #[command(subcommand)]
        action: Option<PartnersAction>,
    },

    /// Re-key transactions to canonical ids and remove duplicates
    Dedup,
}

/// Transaction filters shared by the listing and totals commands
#[derive(Args, Default)]
pub struct FilterArgs {
    /// Start date (YYYY-MM-DD, inclusive)
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// End date (YYYY-MM-DD, inclusive)
    #[arg(long)]
    pub to: Option<NaiveDate>,

    /// Account ID (repeatable)
    #[arg(short, long = "account")]
    pub accounts: Vec<String>,

    /// Description contains (case-insensitive)
    #[arg(short, long)]
    pub search: Option<String>,

    /// Partner ID
    #[arg(short, long)]
    pub partner: Option<i64>,
}

impl FilterArgs {
    pub fn to_query(&self) -> TransactionQuery {
        TransactionQuery {
            start_date: self.from,
            end_date: self.to,
            account_ids: self.accounts.clone(),
            description_contains: self.search.clone(),
            partner_id: self.partner,
            limit: None,
            offset: None,
        }
    }
}

#[derive(Subcommand)]
pub enum AccountsAction {
    /// List all accounts
    List,

    /// Add an account
    Add {
        /// Display name
        name: String,

        /// Account type: checking, savings, credit, mortgage, investment
        #[arg(short = 't', long = "type")]
        account_type: String,

        /// Processor ID (see `tally processors`)
        #[arg(short, long)]
        processor: String,

        /// Explicit account ID (generated if omitted)
        #[arg(long)]
        id: Option<String>,

        /// Processor configuration as a JSON object
        #[arg(long)]
        processor_config: Option<String>,
    },

    /// Rename an account (and its internal partner)
    Rename {
        /// Account ID
        id: String,

        /// New name
        name: String,
    },
}

#[derive(Subcommand)]
pub enum PartnersAction {
    /// List partners
    List {
        /// Only show this partner type
        #[arg(short = 't', long = "type")]
        partner_type: Option<String>,

        /// Include internal account partners
        #[arg(long)]
        internal: bool,
    },

    /// Add a partner
    Add {
        /// Partner name
        name: String,

        /// Partner type (e.g. MERCHANT, INSTITUTION)
        #[arg(short = 't', long = "type", default_value = "MERCHANT")]
        partner_type: String,

        /// Alias matched against descriptions (repeatable)
        #[arg(long = "alias")]
        aliases: Vec<String>,

        /// Category label (repeatable)
        #[arg(long = "category")]
        categories: Vec<String>,
    },

    /// Show a partner and its aggregates
    Show {
        /// Partner ID
        id: i64,
    },

    /// Replace a partner's aliases
    Alias {
        /// Partner ID
        id: i64,

        /// New aliases
        #[arg(required = true)]
        aliases: Vec<String>,
    },

    /// Assign transactions to a partner
    Assign {
        /// Partner ID
        partner_id: i64,

        /// Transaction IDs
        #[arg(required = true)]
        transaction_ids: Vec<String>,
    },

    /// Remove a transaction's partner
    Clear {
        /// Transaction ID
        transaction_id: String,
    },

    /// Recompute partner aggregates
    Refresh {
        /// Partner ID (all partners if omitted)
        id: Option<i64>,
    },

    /// Create internal partners for accounts missing one
    Sync,

    /// Assign unassigned transactions by partner alias
    Match,
}
