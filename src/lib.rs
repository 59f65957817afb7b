//! # Manufacturing Ledger
//!
//! The accounting core of a small-manufacturer ERP: double-entry journal
//! posting, balance derivation, work-order cost roll-up, and period closing.
//!
//! ## Features
//!
//! - **Double-entry journal**: balanced, atomic, append-only postings checked in integer minor units
//! - **Chart of accounts**: Asset, Liability, Equity, Revenue, and Expense accounts with unique codes
//! - **Cost roll-up**: per-work-order COGM from material issues plus overhead and labor, frozen at shipping
//! - **Period closing**: revenue and expense rolled into retained earnings, closed ranges locked
//! - **Reporting**: running balances, cash/bank book, Laba Rugi, Neraca, and trial balance
//! - **Storage abstraction**: backend-agnostic design behind the [`LedgerStorage`] trait
//!
//! ## Quick Start
//!
//! ```rust
//! use manufacturing_ledger::{Ledger, JournalLineInput};
//! use manufacturing_ledger::utils::MemoryStorage;
//! use bigdecimal::BigDecimal;
//! use chrono::NaiveDate;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let ledger = Ledger::new(MemoryStorage::new());
//! let chart = ledger.setup_standard_chart_of_accounts().await.unwrap();
//!
//! ledger
//!     .post_transaction(
//!         NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
//!         "Faktur penjualan".to_string(),
//!         vec![
//!             JournalLineInput {
//!                 account_code: "1130".to_string(),
//!                 debit: BigDecimal::from(1_000_000),
//!                 credit: BigDecimal::from(0),
//!             },
//!             JournalLineInput {
//!                 account_code: "4100".to_string(),
//!                 debit: BigDecimal::from(0),
//!                 credit: BigDecimal::from(1_000_000),
//!             },
//!         ],
//!     )
//!     .await
//!     .unwrap();
//!
//! let piutang = ledger.get_account_balance(&chart["piutang_usaha"].id, None).await.unwrap();
//! assert_eq!(piutang, BigDecimal::from(1_000_000));
//! # });
//! ```

pub mod auth;
pub mod closing;
pub mod config;
pub mod costing;
pub mod ledger;
pub mod reporting;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use auth::{Actor, Authorizer, Capability, Role, RoleAuthorizer};
pub use closing::{ClosedPeriod, PeriodCloser};
pub use config::{LedgerConfig, ReportClassification};
pub use costing::{
    CostRollupEngine, CostSnapshot, CostState, CostSummary, WorkOrder, WorkOrderCost,
    WorkOrderItem, WorkOrderStatus,
};
pub use ledger::{
    AccountManager, JournalLineInput, Ledger, RunningBalance, RunningBalanceRow,
    TransactionBuilder, TransactionManager, WriteGate,
};
pub use reporting::{
    AccountLine, BalanceSheet, FinancialReport, LedgerIntegrityReport, ProfitAndLoss,
    RunningBalanceReporter, TrialBalance, TrialBalanceLine,
};
pub use traits::*;
pub use types::*;

// Re-export posting patterns for convenience
pub use ledger::transaction::patterns;
