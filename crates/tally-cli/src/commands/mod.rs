//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Init, processors, dedup, and shared utilities (open_db)
//! - `accounts` - Account list/add/rename
//! - `import` - Statement import and import history
//! - `transactions` - Transaction listing and summaries
//! - `partners` - Partner management and reconciliation

pub mod accounts;
pub mod core;
pub mod import;
pub mod partners;
pub mod transactions;

// Re-export command functions for main.rs
pub use accounts::*;
pub use core::*;
pub use import::*;
pub use partners::*;
pub use transactions::*;

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Colored signed amount: red for outflows, green for inflows
pub fn format_amount(amount: f64) -> String {
    if amount < 0.0 {
        format!("\x1b[31m-${:.2}\x1b[0m", amount.abs())
    } else {
        format!("\x1b[32m+${:.2}\x1b[0m", amount)
    }
}
