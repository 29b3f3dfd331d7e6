//! Domain models for Tally

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// An internal financial account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub name: String,
    pub account_type: AccountType,
    /// Which statement processor parses this account's exports
    pub processor_id: String,
    /// Free-form processor configuration (JSON object)
    pub processor_config: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A new account to be created
#[derive(Debug, Clone)]
pub struct NewAccount {
    /// Explicit id; generated as `acc_<uuid>` when absent
    pub id: Option<String>,
    pub name: String,
    pub account_type: AccountType,
    pub processor_id: String,
    pub processor_config: serde_json::Value,
}

/// Account types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Checking,
    Savings,
    Credit,
    Mortgage,
    Investment,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Checking => "checking",
            Self::Savings => "savings",
            Self::Credit => "credit",
            Self::Mortgage => "mortgage",
            Self::Investment => "investment",
        }
    }
}

impl std::str::FromStr for AccountType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "checking" => Ok(Self::Checking),
            "savings" => Ok(Self::Savings),
            "credit" | "credit_card" => Ok(Self::Credit),
            "mortgage" => Ok(Self::Mortgage),
            "investment" => Ok(Self::Investment),
            _ => Err(format!("Unknown account type: {}", s)),
        }
    }
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Credit/debit classification of a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Credit,
    Debit,
    /// Movement between accounts; excluded from inflow/outflow totals
    Transfer,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Credit => "credit",
            Self::Debit => "debit",
            Self::Transfer => "transfer",
        }
    }

    /// Classify by sign: negative is a debit, anything else a credit
    pub fn from_amount(amount: f64) -> Self {
        if amount < 0.0 {
            Self::Debit
        } else {
            Self::Credit
        }
    }
}

impl std::str::FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "credit" => Ok(Self::Credit),
            "debit" => Ok(Self::Debit),
            "transfer" => Ok(Self::Transfer),
            _ => Err(format!("Unknown transaction type: {}", s)),
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Normalized parser output, independent of the source institution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalTransaction {
    pub date: NaiveDate,
    pub posted_date: Option<NaiveDate>,
    /// Negative = outflow, positive = inflow
    pub amount: f64,
    pub description: String,
    pub tx_type: TransactionType,
    pub balance: Option<f64>,
    pub principal_amount: Option<f64>,
    pub interest_amount: Option<f64>,
    pub escrow_amount: Option<f64>,
    /// Mortgage fees component
    pub fee_amount: Option<f64>,
    pub payment_due_date: Option<NaiveDate>,
    pub category: Option<String>,
    pub card_number: Option<String>,
    /// Statement-provided reference number, when the export has one
    pub reference: Option<String>,
    /// Original row as a JSON object (header -> cell)
    pub raw: String,
}

/// A stored ledger entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Content-derived deterministic id
    pub id: String,
    pub account_id: String,
    pub date: NaiveDate,
    pub posted_date: Option<NaiveDate>,
    pub amount: f64,
    pub description: String,
    pub tx_type: TransactionType,
    pub balance: Option<f64>,
    pub principal_amount: Option<f64>,
    pub interest_amount: Option<f64>,
    pub escrow_amount: Option<f64>,
    pub fee_amount: Option<f64>,
    pub payment_due_date: Option<NaiveDate>,
    pub category: Option<String>,
    pub card_number: Option<String>,
    pub reference: Option<String>,
    pub partner_id: Option<i64>,
    pub raw_data: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Denormalized read row from `transactions_view`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionView {
    pub id: String,
    pub account_id: String,
    pub account_name: Option<String>,
    pub date: NaiveDate,
    pub amount: f64,
    pub description: String,
    pub tx_type: TransactionType,
    pub partner_id: Option<i64>,
    pub partner_name: Option<String>,
    pub partner_is_internal: Option<bool>,
    pub balance: Option<f64>,
    pub category: Option<String>,
    pub card_number: Option<String>,
}

/// Aggregate totals over a filtered transaction set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub count: i64,
    /// Sum of positive non-transfer amounts
    pub inflows: f64,
    /// Sum of |negative| non-transfer amounts
    pub outflows: f64,
    /// Sum of |amount| over transfers
    pub transfers: f64,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
}

/// Spend per category over a filtered transaction set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: String,
    pub count: i64,
    /// Sum of |amount|
    pub total: f64,
}

/// Mortgage payment breakdown over a filtered transaction set
///
/// Only rows categorized as `payment` contribute.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MortgageTotals {
    pub payment_count: i64,
    pub principal: f64,
    pub interest: f64,
    pub escrow: f64,
    pub fees: f64,
    /// Sum of |amount| over the payments
    pub total_paid: f64,
}

/// A transaction counterparty
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Partner {
    pub id: i64,
    /// Free-form category such as MERCHANT, INSTITUTION or ACCOUNT
    pub partner_type: String,
    pub name: String,
    pub is_internal: bool,
    /// Alternate descriptions that should match to this partner
    pub aliases: Vec<String>,
    pub categories: Vec<String>,
    pub metadata: serde_json::Value,
    /// The account an internal partner stands for
    pub account_id: Option<String>,
    pub transaction_count: i64,
    pub total_debits: f64,
    pub total_credits: f64,
    pub net_amount: f64,
    pub last_summary_update: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// A new partner to be created
#[derive(Debug, Clone)]
pub struct NewPartner {
    pub partner_type: String,
    pub name: String,
    pub aliases: Vec<String>,
    pub categories: Vec<String>,
    pub metadata: serde_json::Value,
}

impl NewPartner {
    pub fn new(partner_type: &str, name: &str) -> Self {
        Self {
            partner_type: partner_type.to_string(),
            name: name.to_string(),
            aliases: Vec::new(),
            categories: Vec::new(),
            metadata: serde_json::json!({}),
        }
    }
}

/// Partner type used for account-linked internal partners
pub const INTERNAL_PARTNER_TYPE: &str = "ACCOUNT";

/// Filters for listing partners
#[derive(Debug, Clone, Default)]
pub struct PartnerQuery {
    pub partner_type: Option<String>,
    pub include_internal: bool,
}

/// Provenance of one file ingested into one account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRecord {
    pub id: i64,
    pub account_id: String,
    pub file_name: String,
    pub file_hash: String,
    pub imported_at: DateTime<Utc>,
    pub transactions_added: i64,
    pub date_start: Option<NaiveDate>,
    pub date_end: Option<NaiveDate>,
}

/// Result of importing one file
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportOutcome {
    /// Rows actually inserted
    pub added: usize,
    /// Whole file was byte-identical to an earlier import for this account
    pub skipped: bool,
    /// Rows the parser produced
    pub parsed: usize,
    /// Parsed rows whose id was already in the ledger
    pub duplicates: usize,
    /// Import record written for this file (None when skipped)
    pub import_id: Option<i64>,
}

/// Result of the identity-migration sweep
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DedupResult {
    /// Rows examined
    pub scanned: usize,
    /// Redundant copies deleted
    pub removed_count: usize,
    /// Legacy-id rows moved onto their canonical id
    pub migrated_count: usize,
}
