//! Transaction query builder for constructing dynamic SQL
//!
//! One query value drives both listing and summaries, so the two always
//! agree on which rows they cover.

use chrono::NaiveDate;

/// Filters for listing and summarizing transactions
///
/// All filters are optional and combine with AND. Dates are inclusive.
#[derive(Debug, Clone, Default)]
pub struct TransactionQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Restrict to these accounts (empty = all accounts)
    pub account_ids: Vec<String>,
    /// Case-insensitive substring match on description
    pub description_contains: Option<String>,
    pub partner_id: Option<i64>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Result of building a query - contains SQL components and parameters
pub struct FilterResult {
    /// WHERE clause including "WHERE" keyword (empty if no conditions)
    pub where_clause: String,
    /// Parameters for the WHERE clause (boxed for rusqlite compatibility)
    pub params: Vec<Box<dyn rusqlite::ToSql>>,
}

impl TransactionQuery {
    /// Create an unfiltered query
    pub fn new() -> Self {
        Self::default()
    }

    /// Set inclusive date range bounds
    pub fn date_range(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.start_date = start;
        self.end_date = end;
        self
    }

    /// Add an account to the account filter
    pub fn account(mut self, account_id: impl Into<String>) -> Self {
        self.account_ids.push(account_id.into());
        self
    }

    /// Set description substring filter
    pub fn description_contains(mut self, text: impl Into<String>) -> Self {
        self.description_contains = Some(text.into());
        self
    }

    /// Set partner filter
    pub fn partner(mut self, partner_id: i64) -> Self {
        self.partner_id = Some(partner_id);
        self
    }

    /// Set page size and offset
    pub fn page(mut self, limit: i64, offset: i64) -> Self {
        self.limit = Some(limit);
        self.offset = Some(offset);
        self
    }

    /// Build the WHERE clause against `transactions_view` (alias `t`)
    pub fn build(&self) -> FilterResult {
        let mut conditions: Vec<String> = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(start) = self.start_date {
            conditions.push("t.date >= ?".to_string());
            params.push(Box::new(start.to_string()));
        }

        if let Some(end) = self.end_date {
            conditions.push("t.date <= ?".to_string());
            params.push(Box::new(end.to_string()));
        }

        if !self.account_ids.is_empty() {
            let placeholders: Vec<&str> = self.account_ids.iter().map(|_| "?").collect();
            conditions.push(format!("t.account_id IN ({})", placeholders.join(", ")));
            for id in &self.account_ids {
                params.push(Box::new(id.clone()));
            }
        }

        if let Some(ref text) = self.description_contains {
            if !text.trim().is_empty() {
                conditions.push("t.description LIKE ? ESCAPE '\\'".to_string());
                params.push(Box::new(format!("%{}%", escape_like(text.trim()))));
            }
        }

        if let Some(pid) = self.partner_id {
            conditions.push("t.partner_id = ?".to_string());
            params.push(Box::new(pid));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        FilterResult {
            where_clause,
            params,
        }
    }

    /// LIMIT/OFFSET clause (empty when unpaged)
    pub fn limit_clause(&self) -> String {
        match (self.limit, self.offset) {
            (Some(limit), Some(offset)) => format!("LIMIT {} OFFSET {}", limit, offset),
            (Some(limit), None) => format!("LIMIT {}", limit),
            (None, Some(offset)) => format!("LIMIT -1 OFFSET {}", offset),
            (None, None) => String::new(),
        }
    }
}

impl FilterResult {
    /// Add a parameterless condition to the WHERE clause
    pub fn and(mut self, condition: &str) -> Self {
        self.where_clause = if self.where_clause.is_empty() {
            format!("WHERE {}", condition)
        } else {
            format!("{} AND {}", self.where_clause, condition)
        };
        self
    }
}

/// Make `%`, `_` and the escape character itself match literally
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
