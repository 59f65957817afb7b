//! Core types and data structures for the ledger

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::utils::validation::to_minor_units;

/// Account types following standard accounting principles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountType {
    /// Assets - what the business owns (Kas, Persediaan, Piutang, ...)
    Asset,
    /// Liabilities - what the business owes (Hutang Usaha, Hutang Gaji, ...)
    Liability,
    /// Equity - owner's interest in the business (Modal, Laba Ditahan, ...)
    Equity,
    /// Revenue - money earned by the business
    Revenue,
    /// Expenses - costs incurred by the business, including HPP
    Expense,
}

impl AccountType {
    /// Returns the normal balance side for this account type.
    /// Assets and Expenses normally carry debit balances,
    /// Liabilities, Equity, and Revenue carry credit balances.
    pub fn normal_balance(&self) -> EntryType {
        match self {
            AccountType::Asset | AccountType::Expense => EntryType::Debit,
            AccountType::Liability | AccountType::Equity | AccountType::Revenue => {
                EntryType::Credit
            }
        }
    }

    /// Converts a raw ledger balance (debit minus credit) into the
    /// type-normalized figure shown on statements.
    pub fn normalize(&self, raw_balance: &BigDecimal) -> BigDecimal {
        match self.normal_balance() {
            EntryType::Debit => raw_balance.clone(),
            EntryType::Credit => -raw_balance.clone(),
        }
    }

    /// Whether balances of this type are rolled into retained earnings at closing
    pub fn is_nominal(&self) -> bool {
        matches!(self, AccountType::Revenue | AccountType::Expense)
    }
}

/// The two sides of a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryType {
    /// Debit side - increases Assets and Expenses
    Debit,
    /// Credit side - increases Liabilities, Equity, and Revenue
    Credit,
}

/// Chart-of-accounts entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier for the account
    pub id: String,
    /// Unique account code (e.g. "1130")
    pub code: String,
    /// Human-readable account name
    pub name: String,
    /// Type of account (Asset, Liability, etc.)
    pub account_type: AccountType,
    /// Whether the account appears in the cash/bank book
    pub is_cash_account: bool,
    /// When the account was created
    pub created_at: NaiveDateTime,
}

impl Account {
    /// Create a new account with a generated id
    pub fn new(code: String, name: String, account_type: AccountType, is_cash_account: bool) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            code,
            name,
            account_type,
            is_cash_account,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }
}

/// Single journal line. Exactly one of `debit`/`credit` is non-zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Code of the account being affected
    pub account_code: String,
    /// Debit amount (zero on credit lines)
    pub debit: BigDecimal,
    /// Credit amount (zero on debit lines)
    pub credit: BigDecimal,
    /// Optional memo for this specific line
    pub memo: Option<String>,
}

impl Entry {
    /// Create a debit line
    pub fn debit(account_code: String, amount: BigDecimal, memo: Option<String>) -> Self {
        Self {
            account_code,
            debit: amount,
            credit: BigDecimal::from(0),
            memo,
        }
    }

    /// Create a credit line
    pub fn credit(account_code: String, amount: BigDecimal, memo: Option<String>) -> Self {
        Self {
            account_code,
            debit: BigDecimal::from(0),
            credit: amount,
            memo,
        }
    }

    /// Which side this line sits on
    pub fn entry_type(&self) -> EntryType {
        if self.debit > BigDecimal::from(0) {
            EntryType::Debit
        } else {
            EntryType::Credit
        }
    }

    /// Debit minus credit
    pub fn signed_amount(&self) -> BigDecimal {
        &self.debit - &self.credit
    }

    /// The same line on the opposite side
    pub fn mirrored(&self) -> Self {
        Self {
            account_code: self.account_code.clone(),
            debit: self.credit.clone(),
            credit: self.debit.clone(),
            memo: self.memo.clone(),
        }
    }
}

/// What produced a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransactionKind {
    /// Ordinary money-moving event (receipt, invoice, payment, ...)
    Regular,
    /// Inventory consumption charged to a work order
    MaterialIssue { work_order_id: String },
    /// Mirror of an earlier transaction
    Reversal { original_id: String },
    /// Synthetic transaction rolling revenue and expense into retained earnings
    Closing { period_id: String },
}

/// Journal header with its ordered lines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique identifier for the transaction
    pub id: String,
    /// Accounting date
    pub date: NaiveDate,
    /// Description of the transaction
    pub description: String,
    /// Optional reference number (invoice number, receipt number, etc.)
    pub reference: Option<String>,
    /// What produced this transaction
    pub kind: TransactionKind,
    /// Lines that make up this transaction
    pub entries: Vec<Entry>,
    /// Additional metadata
    pub metadata: HashMap<String, String>,
    /// When the transaction was recorded
    pub created_at: NaiveDateTime,
}

impl Transaction {
    /// Create a new, empty regular transaction with a generated id
    pub fn new(date: NaiveDate, description: String, reference: Option<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            date,
            description,
            reference,
            kind: TransactionKind::Regular,
            entries: Vec::new(),
            metadata: HashMap::new(),
            created_at: chrono::Utc::now().naive_utc(),
        }
    }

    /// Add a line to the transaction
    pub fn add_entry(&mut self, entry: Entry) {
        self.entries.push(entry);
    }

    /// Calculate total debits
    pub fn total_debits(&self) -> BigDecimal {
        self.entries.iter().map(|e| &e.debit).sum()
    }

    /// Calculate total credits
    pub fn total_credits(&self) -> BigDecimal {
        self.entries.iter().map(|e| &e.credit).sum()
    }

    /// Check if the transaction is balanced (debits = credits)
    pub fn is_balanced(&self) -> bool {
        self.total_debits() == self.total_credits()
    }

    /// Whether this transaction touches the given account
    pub fn touches(&self, account_code: &str) -> bool {
        self.entries.iter().any(|e| e.account_code == account_code)
    }

    /// Validate line shape and balance, comparing amounts in integer minor units
    pub fn validate(&self, minor_unit_scale: u32) -> LedgerResult<()> {
        if self.entries.is_empty() {
            return Err(LedgerError::validation(
                "lines",
                "transaction must have at least one line",
            ));
        }

        let mut debit_units: i64 = 0;
        let mut credit_units: i64 = 0;

        for (index, entry) in self.entries.iter().enumerate() {
            let field = format!("lines[{}]", index);

            if entry.account_code.trim().is_empty() {
                return Err(LedgerError::validation(
                    format!("{}.account_code", field),
                    "account code cannot be empty",
                ));
            }

            let debit = to_minor_units(&entry.debit, minor_unit_scale)
                .map_err(|message| LedgerError::validation(format!("{}.debit", field), message))?;
            let credit = to_minor_units(&entry.credit, minor_unit_scale)
                .map_err(|message| LedgerError::validation(format!("{}.credit", field), message))?;

            if debit < 0 || credit < 0 {
                return Err(LedgerError::validation(field, "amounts cannot be negative"));
            }

            match (debit > 0, credit > 0) {
                (true, true) => {
                    return Err(LedgerError::validation(
                        field,
                        "line cannot carry both a debit and a credit",
                    ))
                }
                (false, false) => {
                    return Err(LedgerError::validation(
                        field,
                        "line must carry either a debit or a credit",
                    ))
                }
                _ => {}
            }

            debit_units = debit_units
                .checked_add(debit)
                .ok_or_else(|| LedgerError::validation("lines", "debit total overflows"))?;
            credit_units = credit_units
                .checked_add(credit)
                .ok_or_else(|| LedgerError::validation("lines", "credit total overflows"))?;
        }

        if debit_units != credit_units {
            return Err(LedgerError::validation(
                "lines",
                format!(
                    "transaction is not balanced: debits = {}, credits = {}",
                    self.total_debits(),
                    self.total_credits()
                ),
            ));
        }

        Ok(())
    }
}

/// Errors that can occur in the ledger system
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Validation error on {field}: {message}")]
    Validation { field: String, message: String },
    #[error("Account code already exists: {0}")]
    DuplicateCode(String),
    #[error("Account {0} is referenced by journal entries")]
    AccountInUse(String),
    #[error("Period locked: {date} falls on or before closed date {locked_through}")]
    PeriodLocked {
        date: NaiveDate,
        locked_through: NaiveDate,
    },
    #[error("Invalid date: {0}")]
    InvalidDate(String),
    #[error("Work order cost already finalized: {0}")]
    AlreadyFinalized(String),
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("Actor '{actor}' lacks capability {capability}")]
    Unauthorized { actor: String, capability: String },
    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
    #[error("Ledger busy: {0}")]
    Busy(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

impl LedgerError {
    /// Build a validation error for a named field
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        LedgerError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Build a not-found error
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        LedgerError::NotFound {
            entity,
            id: id.into(),
        }
    }
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()
    }

    fn amount(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn test_balanced_transaction_validates() {
        let mut txn = Transaction::new(date(), "Invoice".to_string(), None);
        txn.add_entry(Entry::debit("1130".to_string(), amount("1000000"), None));
        txn.add_entry(Entry::credit("4100".to_string(), amount("1000000"), None));
        assert!(txn.validate(2).is_ok());
    }

    #[test]
    fn test_fractional_amounts_balance_exactly() {
        let mut txn = Transaction::new(date(), "Split".to_string(), None);
        txn.add_entry(Entry::debit("6100".to_string(), amount("0.10"), None));
        txn.add_entry(Entry::debit("6100".to_string(), amount("0.20"), None));
        txn.add_entry(Entry::credit("1110".to_string(), amount("0.30"), None));
        assert!(txn.validate(2).is_ok());
    }

    #[test]
    fn test_rejects_empty_and_malformed_lines() {
        let txn = Transaction::new(date(), "Empty".to_string(), None);
        assert!(matches!(
            txn.validate(2),
            Err(LedgerError::Validation { ref field, .. }) if field == "lines"
        ));

        let mut both = Transaction::new(date(), "Both".to_string(), None);
        both.add_entry(Entry {
            account_code: "1110".to_string(),
            debit: amount("10"),
            credit: amount("10"),
            memo: None,
        });
        assert!(matches!(
            both.validate(2),
            Err(LedgerError::Validation { ref field, .. }) if field == "lines[0]"
        ));

        let mut neither = Transaction::new(date(), "Neither".to_string(), None);
        neither.add_entry(Entry::debit("1110".to_string(), amount("0"), None));
        assert!(neither.validate(2).is_err());

        let mut negative = Transaction::new(date(), "Negative".to_string(), None);
        negative.add_entry(Entry::debit("1110".to_string(), amount("-5"), None));
        negative.add_entry(Entry::credit("4100".to_string(), amount("-5"), None));
        assert!(negative.validate(2).is_err());
    }

    #[test]
    fn test_rejects_unbalanced_and_sub_minor_amounts() {
        let mut unbalanced = Transaction::new(date(), "Unbalanced".to_string(), None);
        unbalanced.add_entry(Entry::debit("1110".to_string(), amount("100"), None));
        unbalanced.add_entry(Entry::credit("4100".to_string(), amount("99.99"), None));
        assert!(unbalanced.validate(2).is_err());

        let mut too_precise = Transaction::new(date(), "Precise".to_string(), None);
        too_precise.add_entry(Entry::debit("1110".to_string(), amount("1.005"), None));
        too_precise.add_entry(Entry::credit("4100".to_string(), amount("1.005"), None));
        assert!(matches!(
            too_precise.validate(2),
            Err(LedgerError::Validation { ref field, .. }) if field == "lines[0].debit"
        ));
    }

    #[test]
    fn test_normalize_follows_normal_balance() {
        let raw = amount("-250");
        assert_eq!(AccountType::Revenue.normalize(&raw), amount("250"));
        assert_eq!(AccountType::Asset.normalize(&raw), amount("-250"));
        assert!(AccountType::Expense.is_nominal());
        assert!(!AccountType::Equity.is_nominal());
    }
}
