//! Statement processors
//!
//! Each processor turns one institution's CSV export into canonical
//! transactions. Supported formats:
//! - `boa_checking_savings`: Bank of America checking/savings
//! - `capital_one_credit`: Capital One credit card
//! - `boa_mortgage`: Bank of America mortgage

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::{Error, Result};
use crate::models::CanonicalTransaction;

mod boa_checking;
mod boa_mortgage;
mod capital_one;

/// Registered statement processors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Processor {
    BoaCheckingSavings,
    CapitalOneCredit,
    BoaMortgage,
}

impl Processor {
    /// Every registered processor, in display order
    pub fn all() -> &'static [Processor] {
        &[
            Self::BoaCheckingSavings,
            Self::CapitalOneCredit,
            Self::BoaMortgage,
        ]
    }

    /// Look up a processor by its stable id
    pub fn from_id(id: &str) -> Result<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|p| p.id() == id)
            .ok_or_else(|| Error::UnknownProcessor(id.to_string()))
    }

    pub fn id(&self) -> &'static str {
        match self {
            Self::BoaCheckingSavings => "boa_checking_savings",
            Self::CapitalOneCredit => "capital_one_credit",
            Self::BoaMortgage => "boa_mortgage",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::BoaCheckingSavings => "Bank of America Checking/Savings",
            Self::CapitalOneCredit => "Capital One Credit Card",
            Self::BoaMortgage => "Bank of America Mortgage",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::BoaCheckingSavings => {
                "Bank of America checking and savings exports (summary section is skipped)"
            }
            Self::CapitalOneCredit => "Capital One credit card exports with Debit/Credit columns",
            Self::BoaMortgage => {
                "Bank of America mortgage activity with principal/interest/escrow breakdown"
            }
        }
    }

    /// Columns that must all appear in the transaction header row
    pub fn required_headers(&self) -> &'static [&'static str] {
        match self {
            Self::BoaCheckingSavings => &["Date", "Description", "Amount", "Running Bal."],
            Self::CapitalOneCredit => &[
                "Transaction Date",
                "Posted Date",
                "Card No.",
                "Description",
                "Category",
                "Debit",
                "Credit",
            ],
            Self::BoaMortgage => &[
                "Date",
                "Description",
                "Type",
                "Amount",
                "Payment Due Date",
                "Principal Amount",
                "Interest Paid",
                "Escrow Amount",
            ],
        }
    }

    /// Whether a header row carries every column this processor needs
    pub fn is_valid_format(&self, headers: &StringRecord) -> bool {
        self.required_headers()
            .iter()
            .all(|required| headers.iter().any(|h| clean_header(h) == *required))
    }

    /// Parse raw CSV bytes into canonical transactions, in file order
    ///
    /// Fails with a format error if no header row matches or an amount
    /// cell cannot be read; nothing is returned partially.
    pub fn parse(&self, bytes: &[u8]) -> Result<Vec<CanonicalTransaction>> {
        let table = Table::read(*self, bytes)?;
        match self {
            Self::BoaCheckingSavings => boa_checking::parse(&table),
            Self::CapitalOneCredit => capital_one::parse(&table),
            Self::BoaMortgage => boa_mortgage::parse(&table),
        }
    }
}

impl std::str::FromStr for Processor {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::from_id(s).map_err(|e| e.to_string())
    }
}

impl std::fmt::Display for Processor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// A CSV export with its transaction header located
pub(crate) struct Table {
    processor: Processor,
    headers: StringRecord,
    /// Data rows after the header, with their 1-based line numbers
    rows: Vec<(u64, StringRecord)>,
}

impl Table {
    fn read(processor: Processor, bytes: &[u8]) -> Result<Self> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(bytes);

        let mut headers: Option<StringRecord> = None;
        let mut rows = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| Error::format(processor.id(), e.to_string()))?;
            if headers.is_some() {
                let line = record.position().map(|p| p.line()).unwrap_or_default();
                rows.push((line, record));
            } else if processor.is_valid_format(&record) {
                // Preamble rows (e.g. BoA's summary block) sit above this
                headers = Some(record.iter().map(clean_header).collect());
            }
        }

        let headers = headers.ok_or_else(|| {
            Error::format(
                processor.id(),
                format!(
                    "No header row with required columns: {}",
                    processor.required_headers().join(", ")
                ),
            )
        })?;

        Ok(Self {
            processor,
            headers,
            rows,
        })
    }

    fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().map(move |(line, record)| Row {
            table: self,
            line: *line,
            record,
        })
    }
}

/// One data row, addressed by column name
pub(crate) struct Row<'a> {
    table: &'a Table,
    line: u64,
    record: &'a StringRecord,
}

impl<'a> Row<'a> {
    /// Trimmed, non-empty cell for a column
    fn get(&self, column: &str) -> Option<&'a str> {
        let idx = self.table.headers.iter().position(|h| h == column)?;
        self.record.get(idx).filter(|v| !v.is_empty())
    }

    /// Cell as an owned string
    fn text(&self, column: &str) -> Option<String> {
        self.get(column).map(str::to_string)
    }

    fn date(&self, column: &str) -> Option<NaiveDate> {
        self.get(column).and_then(parse_date)
    }

    /// Currency cell; empty or `--` is absent, anything else must parse
    fn amount(&self, column: &str) -> Result<Option<f64>> {
        match self.get(column) {
            None => Ok(None),
            Some(value) => parse_amount(value).map_err(|reason| {
                Error::format(
                    self.table.processor.id(),
                    format!(
                        "Line {}: unable to parse {} amount '{}': {}",
                        self.line, column, value, reason
                    ),
                )
            }),
        }
    }

    /// Statement reference number, if the export has such a column
    fn reference(&self) -> Option<String> {
        self.text("Reference").or_else(|| self.text("Reference Number"))
    }

    /// Original row as a JSON object (header -> cell)
    fn raw(&self) -> String {
        let mut map = serde_json::Map::new();
        for (i, header) in self.table.headers.iter().enumerate() {
            if header.is_empty() {
                continue;
            }
            if let Some(value) = self.record.get(i) {
                map.insert(header.to_string(), Value::String(value.to_string()));
            }
        }
        json!(map).to_string()
    }
}

fn clean_header(h: &str) -> String {
    h.trim_start_matches('\u{feff}').trim().to_string()
}

/// Parse a statement date
fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();

    let formats = [
        "%m/%d/%Y", // 01/15/2024
        "%m/%d/%y", // 01/15/24
        "%Y-%m-%d", // 2024-01-15
        "%m-%d-%Y", // 01-15-2024
    ];

    formats
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// Parse a currency string, handling symbols, commas and parentheses
///
/// Returns `Ok(None)` for empty or `--` cells. `NaN` and infinities are
/// rejected along with anything else that is not a plain number.
fn parse_amount(s: &str) -> std::result::Result<Option<f64>, String> {
    let s = s.trim();
    if s.is_empty() || s == "--" {
        return Ok(None);
    }

    let cleaned: String = s
        .replace(['$', ',', ' '], "")
        .replace('(', "-")
        .replace(')', "");

    let value = cleaned.parse::<f64>().map_err(|e| e.to_string())?;
    if !value.is_finite() {
        return Err("not a finite number".to_string());
    }
    Ok(Some(value))
}
