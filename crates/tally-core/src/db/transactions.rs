//! Transaction operations

use rusqlite::{params, Connection, OptionalExtension, Row, ToSql};

use super::transaction_filter::TransactionQuery;
use super::{date_column, invalid_column, optional_date_column, parse_datetime, Database};
use crate::error::Result;
use crate::models::{
    CanonicalTransaction, CategoryTotal, MortgageTotals, Summary, Transaction, TransactionType,
    TransactionView,
};

pub(crate) const TRANSACTION_COLUMNS: &str = "id, account_id, date, posted_date, amount, description, \
     tx_type, balance, principal_amount, interest_amount, escrow_amount, category, card_number, \
     reference, partner_id, raw_data, created_at, fee_amount, payment_due_date";

fn tx_type_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<TransactionType> {
    let value: String = row.get(idx)?;
    value.parse().map_err(|e: String| invalid_column(idx, e))
}

pub(crate) fn row_to_transaction(row: &Row<'_>) -> rusqlite::Result<Transaction> {
    let created_at_str: String = row.get(16)?;

    Ok(Transaction {
        id: row.get(0)?,
        account_id: row.get(1)?,
        date: date_column(row, 2)?,
        posted_date: optional_date_column(row, 3)?,
        amount: row.get(4)?,
        description: row.get(5)?,
        tx_type: tx_type_column(row, 6)?,
        balance: row.get(7)?,
        principal_amount: row.get(8)?,
        interest_amount: row.get(9)?,
        escrow_amount: row.get(10)?,
        category: row.get(11)?,
        card_number: row.get(12)?,
        reference: row.get(13)?,
        partner_id: row.get(14)?,
        raw_data: row.get(15)?,
        created_at: parse_datetime(&created_at_str),
        fee_amount: row.get(17)?,
        payment_due_date: optional_date_column(row, 18)?,
    })
}

fn row_to_view(row: &Row<'_>) -> rusqlite::Result<TransactionView> {
    Ok(TransactionView {
        id: row.get(0)?,
        account_id: row.get(1)?,
        account_name: row.get(2)?,
        date: date_column(row, 3)?,
        amount: row.get(4)?,
        description: row.get(5)?,
        tx_type: tx_type_column(row, 6)?,
        partner_id: row.get(7)?,
        partner_name: row.get(8)?,
        partner_is_internal: row.get(9)?,
        balance: row.get(10)?,
        category: row.get(11)?,
        card_number: row.get(12)?,
    })
}

/// Insert a parsed transaction unless its id is already stored
///
/// Returns true when a row was written.
pub(crate) fn insert_transaction_if_absent(
    conn: &Connection,
    id: &str,
    account_id: &str,
    tx: &CanonicalTransaction,
) -> Result<bool> {
    let inserted = conn.execute(
        r#"
        INSERT INTO transactions (id, account_id, date, posted_date, amount, description, tx_type,
            balance, principal_amount, interest_amount, escrow_amount, category, card_number,
            reference, raw_data, fee_amount, payment_due_date)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO NOTHING
        "#,
        params![
            id,
            account_id,
            tx.date.to_string(),
            tx.posted_date.map(|d| d.to_string()),
            tx.amount,
            tx.description,
            tx.tx_type.as_str(),
            tx.balance,
            tx.principal_amount,
            tx.interest_amount,
            tx.escrow_amount,
            tx.category,
            tx.card_number,
            tx.reference,
            tx.raw,
            tx.fee_amount,
            tx.payment_due_date.map(|d| d.to_string()),
        ],
    )?;
    Ok(inserted > 0)
}

pub(crate) fn get_transaction_on(conn: &Connection, id: &str) -> Result<Option<Transaction>> {
    let tx = conn
        .query_row(
            &format!("SELECT {} FROM transactions WHERE id = ?", TRANSACTION_COLUMNS),
            params![id],
            row_to_transaction,
        )
        .optional()?;
    Ok(tx)
}

impl Database {
    /// Get a transaction by ID
    pub fn get_transaction(&self, id: &str) -> Result<Option<Transaction>> {
        let conn = self.conn()?;
        get_transaction_on(&conn, id)
    }

    /// List transactions from the joined view, newest first
    pub fn list_transactions(&self, query: &TransactionQuery) -> Result<Vec<TransactionView>> {
        let conn = self.conn()?;
        let filter = query.build();

        let sql = format!(
            r#"
            SELECT t.id, t.account_id, t.account_name, t.date, t.amount, t.description, t.tx_type,
                   t.partner_id, t.partner_name, t.partner_is_internal, t.balance, t.category,
                   t.card_number
            FROM transactions_view t
            {}
            ORDER BY t.date DESC, t.id DESC
            {}
            "#,
            filter.where_clause,
            query.limit_clause()
        );

        let mut stmt = conn.prepare(&sql)?;
        let param_refs: Vec<&dyn ToSql> = filter.params.iter().map(|p| p.as_ref()).collect();
        let rows = stmt
            .query_map(param_refs.as_slice(), row_to_view)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    /// Count transactions matching a query (ignores paging)
    pub fn count_transactions(&self, query: &TransactionQuery) -> Result<i64> {
        let conn = self.conn()?;
        let filter = query.build();

        let sql = format!(
            "SELECT COUNT(*) FROM transactions_view t {}",
            filter.where_clause
        );
        let param_refs: Vec<&dyn ToSql> = filter.params.iter().map(|p| p.as_ref()).collect();
        let count = conn.query_row(&sql, param_refs.as_slice(), |row| row.get(0))?;
        Ok(count)
    }

    /// Aggregate totals over a query (ignores paging)
    ///
    /// Transfers are reported separately and excluded from inflows and
    /// outflows.
    pub fn get_summary(&self, query: &TransactionQuery) -> Result<Summary> {
        let conn = self.conn()?;
        let filter = query.build();

        let sql = format!(
            r#"
            SELECT
                COUNT(*),
                COALESCE(SUM(CASE WHEN t.tx_type != 'transfer' AND t.amount > 0 THEN t.amount ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN t.tx_type != 'transfer' AND t.amount < 0 THEN -t.amount ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN t.tx_type = 'transfer' THEN ABS(t.amount) ELSE 0 END), 0),
                MIN(t.date),
                MAX(t.date)
            FROM transactions_view t
            {}
            "#,
            filter.where_clause
        );

        let param_refs: Vec<&dyn ToSql> = filter.params.iter().map(|p| p.as_ref()).collect();
        let summary = conn.query_row(&sql, param_refs.as_slice(), |row| {
            Ok(Summary {
                count: row.get(0)?,
                inflows: row.get(1)?,
                outflows: row.get(2)?,
                transfers: row.get(3)?,
                first_date: optional_date_column(row, 4)?,
                last_date: optional_date_column(row, 5)?,
            })
        })?;

        Ok(summary)
    }

    /// Count and |amount| total per category, largest total first
    ///
    /// Rows without a category are left out.
    pub fn category_totals(&self, query: &TransactionQuery) -> Result<Vec<CategoryTotal>> {
        let conn = self.conn()?;
        let filter = query.build().and("t.category IS NOT NULL");

        let sql = format!(
            r#"
            SELECT t.category, COUNT(*), COALESCE(SUM(ABS(t.amount)), 0)
            FROM transactions_view t
            {}
            GROUP BY t.category
            ORDER BY 3 DESC, t.category
            "#,
            filter.where_clause
        );

        let mut stmt = conn.prepare(&sql)?;
        let param_refs: Vec<&dyn ToSql> = filter.params.iter().map(|p| p.as_ref()).collect();
        let totals = stmt
            .query_map(param_refs.as_slice(), |row| {
                Ok(CategoryTotal {
                    category: row.get(0)?,
                    count: row.get(1)?,
                    total: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(totals)
    }

    /// Principal, interest, escrow and fee totals over mortgage payments
    pub fn mortgage_component_totals(&self, query: &TransactionQuery) -> Result<MortgageTotals> {
        let conn = self.conn()?;
        let filter = query.build().and("t.category = 'payment'");

        let sql = format!(
            r#"
            SELECT
                COUNT(*),
                COALESCE(SUM(ABS(t.principal_amount)), 0),
                COALESCE(SUM(ABS(t.interest_amount)), 0),
                COALESCE(SUM(ABS(t.escrow_amount)), 0),
                COALESCE(SUM(ABS(t.fee_amount)), 0),
                COALESCE(SUM(ABS(t.amount)), 0)
            FROM transactions_view t
            {}
            "#,
            filter.where_clause
        );

        let param_refs: Vec<&dyn ToSql> = filter.params.iter().map(|p| p.as_ref()).collect();
        let totals = conn.query_row(&sql, param_refs.as_slice(), |row| {
            Ok(MortgageTotals {
                payment_count: row.get(0)?,
                principal: row.get(1)?,
                interest: row.get(2)?,
                escrow: row.get(3)?,
                fees: row.get(4)?,
                total_paid: row.get(5)?,
            })
        })?;

        Ok(totals)
    }
}
