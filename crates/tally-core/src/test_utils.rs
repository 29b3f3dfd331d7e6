//! Test utilities for tally-core
//!
//! Statement fixtures shaped like real exports, plus helpers for building a
//! seeded ledger.

use crate::db::Database;
use crate::error::Result;
use crate::models::{Account, AccountType, NewAccount};

/// BoA checking export: summary block, a balance-only row and two
/// transactions (coffee -4.50, payroll +2000.00)
pub const BOA_CHECKING_CSV: &str = "\
Description,,Summary Amt.
Beginning balance as of 01/01/2024,,\"1,000.00\"
Total credits,,\"2,000.00\"
Total debits,,-4.50
Ending balance as of 01/31/2024,,\"2,995.50\"

Date,Description,Amount,Running Bal.
01/01/2024,Beginning balance as of 01/01/2024,,\"1,000.00\"
01/02/2024,COFFEE SHOP,-4.50,995.50
01/15/2024,PAYROLL ACME CORP,\"2,000.00\",\"2,995.50\"
";

/// Capital One export: one charge, one card payment
pub const CAPITAL_ONE_CSV: &str = "\
Transaction Date,Posted Date,Card No.,Description,Category,Debit,Credit
2024-01-05,2024-01-06,1234,GROCERY MART,Merchandise,54.20,
2024-01-10,2024-01-10,1234,CAPITAL ONE MOBILE PYMT,Payment/Credit,,500.00
";

/// BoA mortgage export: one payment split into components
pub const BOA_MORTGAGE_CSV: &str = "\
Date,Description,Type,Amount,Payment Due Date,Principal Amount,Interest Paid,Escrow Amount
02/01/2024,Regular Payment,Payment,\"$2,150.00\",02/01/2024,$650.00,\"$1,100.00\",$400.00
";

/// A BoA checking export whose rows are numbered `first..=last`
///
/// Row `n` is dated January `n` 2024 with amount `-n` and a unique
/// description, so overlapping ranges share exactly the overlapping rows.
pub fn numbered_checking_csv(first: u32, last: u32) -> String {
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

/// Create an account bound to a processor
pub fn create_account(
    db: &Database,
    id: &str,
    name: &str,
    account_type: AccountType,
    processor_id: &str,
) -> Result<Account> {
    db.create_account(&NewAccount {
        id: Some(id.to_string()),
        name: name.to_string(),
        account_type,
        processor_id: processor_id.to_string(),
        processor_config: serde_json::json!({}),
    })
}

/// A fresh database with a BoA checking account `acc_1`
pub fn checking_db() -> Result<Database> {
    let db = Database::in_memory()?;
    create_account(
        &db,
        "acc_1",
        "Everyday Checking",
        AccountType::Checking,
        "boa_checking_savings",
    )?;
    Ok(db)
}
