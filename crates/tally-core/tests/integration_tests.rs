//! Integration tests for tally-core
//!
//! These tests exercise the full import → reconcile → dedup workflow.

use std::path::Path;

use chrono::NaiveDate;
use rusqlite::params;
use tally_core::{
    AccountType, Database, Error, Importer, NewAccount, NewPartner, Partner, Reconciler,
    TransactionQuery,
};

/// BoA checking export with a summary block and two real transactions
fn boa_checking_csv() -> &'static str {
    r#"Description,,Summary Amt.
Beginning balance as of 01/01/2024,,"1,000.00"
Total credits,,"2,000.00"
Total debits,,-4.50
Ending balance as of 01/31/2024,,"2,995.50"

Date,Description,Amount,Running Bal.
01/01/2024,Beginning balance as of 01/01/2024,,"1,000.00"
01/02/2024,COFFEE SHOP,-4.50,995.50
01/15/2024,PAYROLL ACME CORP,"2,000.00","2,995.50"
"#
}

fn capital_one_csv() -> &'static str {
    r#"Transaction Date,Posted Date,Card No.,Description,Category,Debit,Credit
2024-01-05,2024-01-06,1234,GROCERY MART,Merchandise,54.20,
2024-01-07,2024-01-08,1234,COFFEE SHOP DOWNTOWN,Dining,3.75,
2024-01-10,2024-01-10,1234,CAPITAL ONE MOBILE PYMT,Payment/Credit,,500.00
"#
}

/// Checking rows `first..=last`, row n dated Jan n with amount -n
fn numbered_csv(first: u32, last: u32) -> String {
    let mut csv = String::from("Date,Description,Amount,Running Bal.\n");
    for n in first..=last {
        csv.push_str(&format!(
            "01/{:02}/2024,PURCHASE {},-{}.00,{}.00\n",
            n,
            n,
            n,
            1000 - n
        ));
    }
    csv
}

fn setup() -> Database {
    let db = Database::in_memory().expect("Failed to create in-memory database");
    add_account(&db, "acc_1", "Everyday Checking", AccountType::Checking, "boa_checking_savings");
    db
}

fn add_account(db: &Database, id: &str, name: &str, account_type: AccountType, processor: &str) {
    db.create_account(&NewAccount {
        id: Some(id.to_string()),
        name: name.to_string(),
        account_type,
        processor_id: processor.to_string(),
        processor_config: serde_json::json!({}),
    })
    .expect("Failed to create account");
}

fn transaction_count(db: &Database) -> i64 {
    db.count_transactions(&TransactionQuery::new()).unwrap()
}

fn import_record_count(db: &Database) -> usize {
    db.list_import_records(None).unwrap().len()
}

fn id_for(db: &Database, description: &str) -> String {
    let rows = db
        .list_transactions(&TransactionQuery::new().description_contains(description))
        .unwrap();
    assert_eq!(rows.len(), 1, "expected one row matching {description}");
    rows[0].id.clone()
}

/// Assert a partner's stored aggregates equal a fresh sum over the ledger
fn assert_aggregates_consistent(db: &Database, partner_id: i64) -> Partner {
    let partner = db.get_partner(partner_id).unwrap().unwrap();
    let rows = db
        .list_transactions(&TransactionQuery::new().partner(partner_id))
        .unwrap();

    let debits: f64 = rows.iter().filter(|t| t.amount < 0.0).map(|t| -t.amount).sum();
    let credits: f64 = rows.iter().filter(|t| t.amount >= 0.0).map(|t| t.amount).sum();
    let net: f64 = rows.iter().map(|t| t.amount).sum();

    assert_eq!(partner.transaction_count, rows.len() as i64);
    assert!((partner.total_debits - debits).abs() < 1e-9);
    assert!((partner.total_credits - credits).abs() < 1e-9);
    assert!((partner.net_amount - net).abs() < 1e-9);
    partner
}

// =============================================================================
// Import
// =============================================================================

#[test]
fn test_checking_import_and_summary() {
    let db = setup();

    let outcome = Importer::new(&db)
        .import_transactions("acc_1", boa_checking_csv().as_bytes(), "jan.csv")
        .unwrap();
    assert_eq!(outcome.added, 2);
    assert_eq!(outcome.parsed, 2);
    assert!(!outcome.skipped);

    let summary = db
        .get_summary(&TransactionQuery::new().account("acc_1"))
        .unwrap();
    assert_eq!(summary.count, 2);
    assert!((summary.inflows - 2000.0).abs() < 1e-9);
    assert!((summary.outflows - 4.5).abs() < 1e-9);
}

#[test]
fn test_identical_file_is_skipped() {
    let db = setup();
    let importer = Importer::new(&db);

    importer
        .import_transactions("acc_1", boa_checking_csv().as_bytes(), "jan.csv")
        .unwrap();
    let second = importer
        .import_transactions("acc_1", boa_checking_csv().as_bytes(), "jan-copy.csv")
        .unwrap();

    assert!(second.skipped);
    assert_eq!(second.added, 0);
    assert_eq!(second.import_id, None);
    assert_eq!(transaction_count(&db), 2);
    assert_eq!(import_record_count(&db), 1);
}

#[test]
fn test_reencoded_file_adds_nothing() {
    let db = setup();
    let importer = Importer::new(&db);

    importer
        .import_transactions("acc_1", boa_checking_csv().as_bytes(), "jan.csv")
        .unwrap();

    // Same rows, different bytes: the fast path misses, row ids still match
    let crlf = boa_checking_csv().replace('\n', "\r\n");
    let outcome = importer
        .import_transactions("acc_1", crlf.as_bytes(), "jan-windows.csv")
        .unwrap();

    assert!(!outcome.skipped);
    assert_eq!(outcome.added, 0);
    assert_eq!(outcome.duplicates, 2);
    assert_eq!(transaction_count(&db), 2);
    assert_eq!(import_record_count(&db), 2);
}

#[test]
fn test_overlapping_statements() {
    let db = setup();
    let importer = Importer::new(&db);

    let a = importer
        .import_transactions("acc_1", numbered_csv(1, 10).as_bytes(), "a.csv")
        .unwrap();
    let b = importer
        .import_transactions("acc_1", numbered_csv(6, 15).as_bytes(), "b.csv")
        .unwrap();

    assert_eq!(a.added, 10);
    assert_eq!(b.added, 5);
    assert_eq!(b.duplicates, 5);
    assert_eq!(transaction_count(&db), 15);

    let records = db.list_import_records(Some("acc_1")).unwrap();
    let b_record = records.iter().find(|r| r.file_name == "b.csv").unwrap();
    assert_eq!(b_record.transactions_added, 5);
    assert_eq!(b_record.date_start, NaiveDate::from_ymd_opt(2024, 1, 6));
    assert_eq!(b_record.date_end, NaiveDate::from_ymd_opt(2024, 1, 15));
}

#[test]
fn test_same_rows_in_two_accounts_are_distinct() {
    let db = setup();
    add_account(&db, "acc_2", "Savings", AccountType::Savings, "boa_checking_savings");
    let importer = Importer::new(&db);

    importer
        .import_transactions("acc_1", boa_checking_csv().as_bytes(), "jan.csv")
        .unwrap();
    let outcome = importer
        .import_transactions("acc_2", boa_checking_csv().as_bytes(), "jan.csv")
        .unwrap();

    assert!(!outcome.skipped);
    assert_eq!(outcome.added, 2);
    assert_eq!(transaction_count(&db), 4);
}

#[test]
fn test_wrong_format_writes_nothing() {
    let db = setup();

    let err = Importer::new(&db)
        .import_transactions("acc_1", capital_one_csv().as_bytes(), "card.csv")
        .unwrap_err();

    match &err {
        Error::Format { processor, message } => {
            assert_eq!(processor, "boa_checking_savings");
            assert!(message.contains("Running Bal."));
        }
        other => panic!("expected format error, got {other:?}"),
    }
    assert_eq!(transaction_count(&db), 0);
    assert_eq!(import_record_count(&db), 0);
}

#[test]
fn test_bad_amount_aborts_whole_file() {
    let db = setup();
    let csv = "Date,Description,Amount,Running Bal.\n\
               01/02/2024,GOOD ROW,-1.00,99.00\n\
               01/03/2024,BAD ROW,one dollar,98.00\n";

    let err = Importer::new(&db)
        .import_transactions("acc_1", csv.as_bytes(), "bad.csv")
        .unwrap_err();
    assert!(matches!(err, Error::Format { .. }));
    assert_eq!(transaction_count(&db), 0);
    assert_eq!(import_record_count(&db), 0);
}

#[test]
fn test_store_failure_mid_import_rolls_back_everything() {
    let db = setup();
    reject_inserts_of(&db, "REJECTED ROW");
    let csv = "Date,Description,Amount,Running Bal.\n\
               01/02/2024,FIRST ROW,-1.00,99.00\n\
               01/03/2024,SECOND ROW,-2.00,97.00\n\
               01/04/2024,REJECTED ROW,-3.00,94.00\n";

    let err = Importer::new(&db)
        .import_transactions("acc_1", csv.as_bytes(), "partial.csv")
        .unwrap_err();
    assert!(err.is_store_error(), "expected store error, got {err:?}");
    assert_eq!(transaction_count(&db), 0);
    assert_eq!(import_record_count(&db), 0);

    // Nothing was recorded, so the same file imports once the store accepts it
    db.conn()
        .unwrap()
        .execute_batch("DROP TRIGGER reject_row;")
        .unwrap();
    let outcome = Importer::new(&db)
        .import_transactions("acc_1", csv.as_bytes(), "partial.csv")
        .unwrap();
    assert!(!outcome.skipped);
    assert_eq!(outcome.added, 3);
}

#[test]
fn test_unknown_account_and_processor() {
    let db = setup();

    let err = Importer::new(&db)
        .import_transactions("acc_nope", boa_checking_csv().as_bytes(), "jan.csv")
        .unwrap_err();
    assert!(matches!(err, Error::UnknownAccount(_)));

    // An account row written by an older build with a since-removed processor
    db.conn()
        .unwrap()
        .execute(
            "INSERT INTO accounts (id, name, account_type, processor_id) VALUES (?, ?, ?, ?)",
            params!["acc_old", "Old Bank", "checking", "old_bank_csv"],
        )
        .unwrap();
    let err = Importer::new(&db)
        .import_transactions("acc_old", boa_checking_csv().as_bytes(), "jan.csv")
        .unwrap_err();
    assert!(matches!(err, Error::UnknownProcessor(ref id) if id == "old_bank_csv"));
    assert_eq!(transaction_count(&db), 0);
}

#[test]
fn test_card_and_mortgage_imports() {
    let db = setup();
    add_account(&db, "acc_card", "Card", AccountType::Credit, "capital_one_credit");
    add_account(&db, "acc_home", "Mortgage", AccountType::Mortgage, "boa_mortgage");
    let importer = Importer::new(&db);

    let card = importer
        .import_transactions("acc_card", capital_one_csv().as_bytes(), "card.csv")
        .unwrap();
    assert_eq!(card.added, 3);

    let mortgage_csv = "Date,Description,Type,Amount,Payment Due Date,Principal Amount,Interest Paid,Escrow Amount\n\
                        02/01/2024,Regular Payment,Payment,\"$2,150.00\",02/01/2024,$650.00,\"$1,100.00\",$400.00\n";
    let home = importer
        .import_transactions("acc_home", mortgage_csv.as_bytes(), "home.csv")
        .unwrap();
    assert_eq!(home.added, 1);

    let payment_id = id_for(&db, "Regular Payment");
    let payment = db.get_transaction(&payment_id).unwrap().unwrap();
    assert_eq!(payment.amount, -2150.0);
    assert_eq!(payment.principal_amount, Some(650.0));
    assert_eq!(payment.interest_amount, Some(1100.0));
    assert_eq!(payment.escrow_amount, Some(400.0));

    let card_summary = db
        .get_summary(&TransactionQuery::new().account("acc_card"))
        .unwrap();
    assert!((card_summary.transfers - 500.0).abs() < 1e-9);
    assert!((card_summary.outflows - 57.95).abs() < 1e-9);
    assert_eq!(card_summary.inflows, 0.0);
}

#[test]
fn test_import_file_from_disk() {
    let db = setup();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("statement.csv");
    std::fs::write(&path, boa_checking_csv()).unwrap();

    let outcome = Importer::new(&db).import_file("acc_1", &path).unwrap();
    assert_eq!(outcome.added, 2);

    let records = db.list_import_records(Some("acc_1")).unwrap();
    assert_eq!(records[0].file_name, "statement.csv");

    let missing = Importer::new(&db).import_file("acc_1", Path::new("/nonexistent/file.csv"));
    assert!(matches!(missing, Err(Error::Io(_))));
}

#[test]
fn test_concurrent_imports_into_two_accounts() {
    let db = setup();
    add_account(&db, "acc_2", "Savings", AccountType::Savings, "boa_checking_savings");

    let handles: Vec<_> = [("acc_1", numbered_csv(1, 20)), ("acc_2", numbered_csv(5, 25))]
        .into_iter()
        .map(|(account, csv)| {
            let db = db.clone();
            std::thread::spawn(move || {
                Importer::new(&db)
                    .import_transactions(account, csv.as_bytes(), "threaded.csv")
                    .unwrap()
            })
        })
        .collect();

    let added: usize = handles
        .into_iter()
        .map(|h| h.join().expect("import thread panicked").added)
        .sum();

    assert_eq!(added, 41);
    assert_eq!(transaction_count(&db), 41);
    assert_eq!(import_record_count(&db), 2);
}

// =============================================================================
// Partner reconciliation
// =============================================================================

#[test]
fn test_assign_clear_and_reassign_keep_aggregates_consistent() {
    let db = setup();
    Importer::new(&db)
        .import_transactions("acc_1", boa_checking_csv().as_bytes(), "jan.csv")
        .unwrap();

    let coffee_shop = db
        .create_partner(&NewPartner::new("MERCHANT", "Corner Coffee"))
        .unwrap();
    let employer = db
        .create_partner(&NewPartner::new("INSTITUTION", "Acme Corp"))
        .unwrap();
    let coffee = id_for(&db, "COFFEE");
    let payroll = id_for(&db, "PAYROLL");
    let reconciler = Reconciler::new(&db);

    let p = reconciler.assign_partner(&coffee, coffee_shop.id).unwrap();
    assert_eq!(p.transaction_count, 1);
    assert!((p.total_debits - 4.5).abs() < 1e-9);
    assert!(p.last_summary_update.is_some());

    // Move payroll onto the coffee partner, then to its real partner
    reconciler.assign_partner(&payroll, coffee_shop.id).unwrap();
    let p = assert_aggregates_consistent(&db, coffee_shop.id);
    assert_eq!(p.transaction_count, 2);
    assert!((p.net_amount - 1995.5).abs() < 1e-9);

    reconciler.assign_partner(&payroll, employer.id).unwrap();
    let old = assert_aggregates_consistent(&db, coffee_shop.id);
    let new = assert_aggregates_consistent(&db, employer.id);
    assert_eq!(old.transaction_count, 1);
    assert_eq!(new.transaction_count, 1);
    assert!((new.total_credits - 2000.0).abs() < 1e-9);

    assert!(reconciler.clear_partner(&coffee).unwrap());
    assert!(!reconciler.clear_partner(&coffee).unwrap());
    let cleared = assert_aggregates_consistent(&db, coffee_shop.id);
    assert_eq!(cleared.transaction_count, 0);
    assert_eq!(cleared.net_amount, 0.0);

    let view = db
        .list_transactions(&TransactionQuery::new().partner(employer.id))
        .unwrap();
    assert_eq!(view[0].partner_name.as_deref(), Some("Acme Corp"));
    assert_eq!(view[0].partner_is_internal, Some(false));
}

#[test]
fn test_assign_validates_before_writing() {
    let db = setup();
    Importer::new(&db)
        .import_transactions("acc_1", boa_checking_csv().as_bytes(), "jan.csv")
        .unwrap();
    let partner = db
        .create_partner(&NewPartner::new("MERCHANT", "Corner Coffee"))
        .unwrap();
    let coffee = id_for(&db, "COFFEE");
    let reconciler = Reconciler::new(&db);

    let err = reconciler.assign_partner("no-such-tx", partner.id).unwrap_err();
    assert!(matches!(err, Error::UnknownTransaction(_)));

    let err = reconciler.assign_partner(&coffee, 9999).unwrap_err();
    assert!(matches!(err, Error::UnknownPartner(9999)));
    assert_eq!(db.get_transaction(&coffee).unwrap().unwrap().partner_id, None);
}

#[test]
fn test_bulk_assignment_is_atomic() {
    let db = setup();
    Importer::new(&db)
        .import_transactions("acc_1", numbered_csv(1, 5).as_bytes(), "jan.csv")
        .unwrap();
    let partner = db
        .create_partner(&NewPartner::new("MERCHANT", "Bulk Store"))
        .unwrap();
    let reconciler = Reconciler::new(&db);

    let mut ids: Vec<String> = db
        .list_transactions(&TransactionQuery::new())
        .unwrap()
        .into_iter()
        .map(|t| t.id)
        .collect();
    ids.push("missing-id".to_string());

    let err = reconciler.assign_partner_bulk(&ids, partner.id).unwrap_err();
    assert!(matches!(err, Error::UnknownTransaction(_)));
    assert_eq!(
        db.count_transactions(&TransactionQuery::new().partner(partner.id))
            .unwrap(),
        0
    );
    assert_eq!(db.get_partner(partner.id).unwrap().unwrap().transaction_count, 0);

    ids.pop();
    assert_eq!(reconciler.assign_partner_bulk(&ids, partner.id).unwrap(), 5);
    let p = assert_aggregates_consistent(&db, partner.id);
    assert!((p.total_debits - 15.0).abs() < 1e-9);
}

#[test]
fn test_match_partners_by_alias() {
    let db = setup();
    add_account(&db, "acc_card", "Card", AccountType::Credit, "capital_one_credit");
    let importer = Importer::new(&db);
    importer
        .import_transactions("acc_1", boa_checking_csv().as_bytes(), "jan.csv")
        .unwrap();
    importer
        .import_transactions("acc_card", capital_one_csv().as_bytes(), "card.csv")
        .unwrap();

    let mut coffee = NewPartner::new("MERCHANT", "Corner Coffee");
    coffee.aliases = vec!["coffee shop".to_string()];
    let coffee = db.create_partner(&coffee).unwrap();

    // Also matches "COFFEE SHOP DOWNTOWN", but the older partner wins
    let mut downtown = NewPartner::new("MERCHANT", "Downtown Cafe");
    downtown.aliases = vec!["DOWNTOWN".to_string()];
    let downtown = db.create_partner(&downtown).unwrap();

    let reconciler = Reconciler::new(&db);
    assert_eq!(reconciler.match_partners_by_alias().unwrap(), 2);

    let c = assert_aggregates_consistent(&db, coffee.id);
    assert_eq!(c.transaction_count, 2);
    let d = assert_aggregates_consistent(&db, downtown.id);
    assert_eq!(d.transaction_count, 0);

    // Already-assigned rows are left alone
    assert_eq!(reconciler.match_partners_by_alias().unwrap(), 0);
}

#[test]
fn test_refresh_summaries() {
    let db = setup();
    Importer::new(&db)
        .import_transactions("acc_1", boa_checking_csv().as_bytes(), "jan.csv")
        .unwrap();
    let partner = db
        .create_partner(&NewPartner::new("MERCHANT", "Corner Coffee"))
        .unwrap();
    let coffee = id_for(&db, "COFFEE");

    // Corrupt the stored aggregates behind the store's back
    let conn = db.conn().unwrap();
    conn.execute(
        "UPDATE transactions SET partner_id = ? WHERE id = ?",
        params![partner.id, coffee],
    )
    .unwrap();
    conn.execute(
        "UPDATE partners SET transaction_count = 42, net_amount = 1.0 WHERE id = ?",
        params![partner.id],
    )
    .unwrap();
    drop(conn);

    let reconciler = Reconciler::new(&db);
    let refreshed = reconciler.refresh_partner_summary(partner.id).unwrap().unwrap();
    assert_eq!(refreshed.transaction_count, 1);
    assert!((refreshed.net_amount + 4.5).abs() < 1e-9);

    assert!(reconciler.refresh_partner_summary(9999).unwrap().is_none());

    // One internal partner for acc_1 plus the merchant
    assert_eq!(reconciler.refresh_all_partner_summaries().unwrap(), 2);
    assert_aggregates_consistent(&db, partner.id);
}

#[test]
fn test_sync_internal_account_partners() {
    let db = setup();
    let reconciler = Reconciler::new(&db);
    assert_eq!(reconciler.sync_internal_account_partners().unwrap(), 0);

    db.conn()
        .unwrap()
        .execute(
            "INSERT INTO accounts (id, name, account_type, processor_id) VALUES (?, ?, ?, ?)",
            params!["acc_legacy", "Legacy Savings", "savings", "boa_checking_savings"],
        )
        .unwrap();

    assert_eq!(reconciler.sync_internal_account_partners().unwrap(), 1);
    assert_eq!(reconciler.sync_internal_account_partners().unwrap(), 0);

    let partner = db.get_internal_partner("acc_legacy").unwrap().unwrap();
    assert_eq!(partner.name, "Legacy Savings");
    assert!(partner.is_internal);
}

// =============================================================================
// Dedup sweep
// =============================================================================

fn insert_legacy_row(db: &Database, id: &str, description: &str, amount: f64, partner: Option<i64>) {
    insert_legacy_row_on(db, id, "2024-01-02", description, amount, partner);
}

fn insert_legacy_row_on(
    db: &Database,
    id: &str,
    date: &str,
    description: &str,
    amount: f64,
    partner: Option<i64>,
) {
    db.conn()
        .unwrap()
        .execute(
            r#"
            INSERT INTO transactions (id, account_id, date, amount, description, tx_type, balance, partner_id)
            VALUES (?, 'acc_1', ?, ?, ?, 'debit', 995.5, ?)
            "#,
            params![id, date, amount, description, partner],
        )
        .unwrap();
}

/// Make the store refuse any insert of a row with this description
fn reject_inserts_of(db: &Database, description: &str) {
    db.conn()
        .unwrap()
        .execute_batch(&format!(
            r#"
            CREATE TRIGGER reject_row BEFORE INSERT ON transactions
            WHEN NEW.description = '{}'
            BEGIN
                SELECT RAISE(ABORT, 'row rejected');
            END;
            "#,
            description
        ))
        .unwrap();
}

#[test]
fn test_dedup_migrates_legacy_id_and_keeps_partner() {
    let db = setup();
    let partner = db
        .create_partner(&NewPartner::new("MERCHANT", "Corner Coffee"))
        .unwrap();
    insert_legacy_row(&db, "legacy-123", "COFFEE SHOP", -4.5, Some(partner.id));

    let result = db.deduplicate_transactions().unwrap();
    assert_eq!(result.scanned, 1);
    assert_eq!(result.migrated_count, 1);
    assert_eq!(result.removed_count, 0);

    assert!(db.get_transaction("legacy-123").unwrap().is_none());
    let migrated_id = id_for(&db, "COFFEE SHOP");
    assert_eq!(migrated_id.len(), 64);
    let migrated = db.get_transaction(&migrated_id).unwrap().unwrap();
    assert_eq!(migrated.partner_id, Some(partner.id));
    assert_aggregates_consistent(&db, partner.id);

    // The migrated id is what an import of the same row produces
    let outcome = Importer::new(&db)
        .import_transactions("acc_1", boa_checking_csv().as_bytes(), "jan.csv")
        .unwrap();
    assert_eq!(outcome.added, 1);
    assert_eq!(outcome.duplicates, 1);

    let again = db.deduplicate_transactions().unwrap();
    assert_eq!(again.migrated_count, 0);
    assert_eq!(again.removed_count, 0);
}

#[test]
fn test_dedup_removes_copy_and_carries_partner() {
    let db = setup();
    Importer::new(&db)
        .import_transactions("acc_1", boa_checking_csv().as_bytes(), "jan.csv")
        .unwrap();
    let canonical = id_for(&db, "COFFEE SHOP");

    let partner = db
        .create_partner(&NewPartner::new("MERCHANT", "Corner Coffee"))
        .unwrap();
    insert_legacy_row(&db, "legacy-copy", "COFFEE SHOP", -4.5, Some(partner.id));
    assert_eq!(transaction_count(&db), 3);

    let result = db.deduplicate_transactions().unwrap();
    assert_eq!(result.scanned, 3);
    assert_eq!(result.removed_count, 1);
    assert_eq!(result.migrated_count, 0);

    assert_eq!(transaction_count(&db), 2);
    let kept = db.get_transaction(&canonical).unwrap().unwrap();
    assert_eq!(kept.partner_id, Some(partner.id));
    let p = assert_aggregates_consistent(&db, partner.id);
    assert_eq!(p.transaction_count, 1);
}

#[test]
fn test_dedup_keeps_rows_with_timestamp_dates_apart() {
    let db = setup();
    insert_legacy_row_on(&db, "legacy-a", "2024-01-02T00:00:00.000Z", "COFFEE SHOP", -4.5, None);
    insert_legacy_row_on(&db, "legacy-b", "2024-01-09T00:00:00.000Z", "COFFEE SHOP", -4.5, None);

    let result = db.deduplicate_transactions().unwrap();
    assert_eq!(result.scanned, 2);
    assert_eq!(result.migrated_count, 2);
    assert_eq!(result.removed_count, 0);
    assert_eq!(transaction_count(&db), 2);

    let mut dates: Vec<NaiveDate> = db
        .list_transactions(&TransactionQuery::new())
        .unwrap()
        .into_iter()
        .map(|t| t.date)
        .collect();
    dates.sort();
    assert_eq!(
        dates,
        vec![
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 9).unwrap(),
        ]
    );

    // Stored dates are plain again, so date filters and a second sweep agree
    let jan_2 = TransactionQuery::new().date_range(
        NaiveDate::from_ymd_opt(2024, 1, 2),
        NaiveDate::from_ymd_opt(2024, 1, 2),
    );
    assert_eq!(db.count_transactions(&jan_2).unwrap(), 1);
    let again = db.deduplicate_transactions().unwrap();
    assert_eq!(again.migrated_count, 0);
    assert_eq!(again.removed_count, 0);
}

#[test]
fn test_dedup_refuses_undecodable_dates() {
    let db = setup();
    insert_legacy_row_on(&db, "legacy-a", "2024-01-02", "COFFEE SHOP", -4.5, None);
    insert_legacy_row_on(&db, "legacy-b", "Jan 9th", "COFFEE SHOP", -4.5, None);

    let err = db.deduplicate_transactions().unwrap_err();
    assert!(err.is_store_error(), "expected store error, got {err:?}");

    // Neither row was touched
    assert!(db.get_transaction("legacy-a").unwrap().is_some());
    let count: i64 = db
        .conn()
        .unwrap()
        .query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 2);
}

#[test]
fn test_store_failure_mid_sweep_rolls_back_everything() {
    let db = setup();
    let partner = db
        .create_partner(&NewPartner::new("MERCHANT", "Corner Coffee"))
        .unwrap();
    insert_legacy_row(&db, "legacy-a", "COFFEE SHOP", -4.5, Some(partner.id));
    insert_legacy_row(&db, "legacy-b", "REJECTED ROW", -9.0, Some(partner.id));
    Reconciler::new(&db).refresh_partner_summary(partner.id).unwrap();
    let before = db.get_partner(partner.id).unwrap().unwrap();
    reject_inserts_of(&db, "REJECTED ROW");

    let err = db.deduplicate_transactions().unwrap_err();
    assert!(err.is_store_error(), "expected store error, got {err:?}");

    // The first row's migration was undone along with the failed one
    assert!(db.get_transaction("legacy-a").unwrap().is_some());
    assert!(db.get_transaction("legacy-b").unwrap().is_some());
    assert_eq!(transaction_count(&db), 2);
    let after = db.get_partner(partner.id).unwrap().unwrap();
    assert_eq!(after.transaction_count, before.transaction_count);
    assert_eq!(after.last_summary_update, before.last_summary_update);
}

// =============================================================================
// Statement analytics
// =============================================================================

#[test]
fn test_category_and_mortgage_totals() {
    let db = setup();
    add_account(&db, "acc_card", "Card", AccountType::Credit, "capital_one_credit");
    add_account(&db, "acc_home", "Mortgage", AccountType::Mortgage, "boa_mortgage");
    let importer = Importer::new(&db);

    importer
        .import_transactions("acc_card", capital_one_csv().as_bytes(), "card.csv")
        .unwrap();
    let mortgage_csv = "Date,Description,Type,Amount,Payment Due Date,Principal Amount,Interest Paid,Escrow Amount,Fee(s) Amount\n\
                        02/01/2024,February Payment,Payment,\"$2,150.00\",02/01/2024,$650.00,\"$1,100.00\",$400.00,--\n\
                        03/01/2024,March Payment,Payment,,03/01/2024,$655.00,\"$1,095.00\",$400.00,$25.00\n\
                        03/15/2024,County Tax,Escrow,-1200.00,,,,-1200.00,\n";
    importer
        .import_transactions("acc_home", mortgage_csv.as_bytes(), "home.csv")
        .unwrap();

    let march = db
        .get_transaction(&id_for(&db, "March Payment"))
        .unwrap()
        .unwrap();
    assert_eq!(march.fee_amount, Some(25.0));
    assert_eq!(march.payment_due_date, NaiveDate::from_ymd_opt(2024, 3, 1));
    assert_eq!(march.amount, -2175.0);

    let home = TransactionQuery::new().account("acc_home");
    let totals = db.mortgage_component_totals(&home).unwrap();
    assert_eq!(totals.payment_count, 2);
    assert!((totals.principal - 1305.0).abs() < 1e-9);
    assert!((totals.interest - 2195.0).abs() < 1e-9);
    assert!((totals.escrow - 800.0).abs() < 1e-9);
    assert!((totals.fees - 25.0).abs() < 1e-9);
    assert!((totals.total_paid - 4325.0).abs() < 1e-9);

    // Date filters narrow the payments counted
    let feb = home.clone().date_range(
        NaiveDate::from_ymd_opt(2024, 2, 1),
        NaiveDate::from_ymd_opt(2024, 2, 29),
    );
    assert_eq!(db.mortgage_component_totals(&feb).unwrap().payment_count, 1);

    let card = db
        .category_totals(&TransactionQuery::new().account("acc_card"))
        .unwrap();
    let names: Vec<&str> = card.iter().map(|c| c.category.as_str()).collect();
    assert_eq!(names, vec!["Payment/Credit", "Merchandise", "Dining"]);
    assert_eq!(card[1].count, 1);
    assert!((card[1].total - 54.2).abs() < 1e-9);

    // Checking rows carry no category and are left out
    Importer::new(&db)
        .import_transactions("acc_1", boa_checking_csv().as_bytes(), "jan.csv")
        .unwrap();
    let checking = db
        .category_totals(&TransactionQuery::new().account("acc_1"))
        .unwrap();
    assert!(checking.is_empty());
}
