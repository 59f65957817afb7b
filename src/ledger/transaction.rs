//! Journal posting and retrieval

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::closing::ClosedPeriod;
use crate::ledger::gate::{WriteGate, WriteGuard};
use crate::traits::*;
use crate::types::*;
use crate::utils::validation::MAX_MINOR_UNIT_SCALE;

/// One line of a posting request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalLineInput {
    pub account_code: String,
    pub debit: BigDecimal,
    pub credit: BigDecimal,
}

impl From<JournalLineInput> for Entry {
    fn from(line: JournalLineInput) -> Self {
        Entry {
            account_code: line.account_code,
            debit: line.debit,
            credit: line.credit,
            memo: None,
        }
    }
}

/// Transaction manager: the append-only journal
#[derive(Clone)]
pub struct TransactionManager<S: LedgerStorage> {
    pub(crate) storage: S,
    pub(crate) gate: WriteGate,
    minor_unit_scale: u32,
    validator: Arc<dyn TransactionValidator>,
}

impl<S: LedgerStorage> TransactionManager<S> {
    /// Create a new transaction manager
    pub fn new(storage: S, gate: WriteGate, minor_unit_scale: u32) -> Self {
        Self {
            storage,
            gate,
            minor_unit_scale,
            validator: Arc::new(DefaultTransactionValidator { minor_unit_scale }),
        }
    }

    /// Create a new transaction manager with a validator whose rules apply
    /// on top of the double-entry checks
    pub fn with_validator(
        storage: S,
        gate: WriteGate,
        minor_unit_scale: u32,
        validator: Arc<dyn TransactionValidator>,
    ) -> Self {
        Self {
            storage,
            gate,
            minor_unit_scale,
            validator,
        }
    }

    /// Post a transaction built from request lines
    pub async fn post_lines(
        &self,
        date: NaiveDate,
        description: String,
        lines: Vec<JournalLineInput>,
    ) -> LedgerResult<String> {
        let mut transaction = Transaction::new(date, description, None);
        transaction.entries = lines.into_iter().map(Entry::from).collect();
        self.post_transaction(transaction).await
    }

    /// Validate and append a transaction with all of its lines as one unit.
    /// Only regular transactions are accepted; reversals, material issues and
    /// closing entries are written by their own operations.
    pub async fn post_transaction(&self, transaction: Transaction) -> LedgerResult<String> {
        if transaction.kind != TransactionKind::Regular {
            return Err(LedgerError::validation(
                "kind",
                "only regular transactions can be posted directly",
            ));
        }
        self.validate(&transaction)?;
        self.gate.check_fence(transaction.date)?;

        let guard = self.gate.acquire().await?;
        self.check_postable(&guard, &transaction).await?;

        let id = transaction.id.clone();
        let date = transaction.date;
        let lines = transaction.entries.len();
        self.commit_locked(&guard, WriteBatch::new().append(transaction))
            .await?;

        tracing::info!(transaction_id = %id, %date, lines, "transaction posted");
        Ok(id)
    }

    /// Append a mirror image of an earlier transaction, dated `date`
    pub async fn reverse_transaction(
        &self,
        transaction_id: &str,
        date: NaiveDate,
    ) -> LedgerResult<String> {
        self.gate.check_fence(date)?;
        let guard = self.gate.acquire().await?;

        let original = self.get_transaction_required(transaction_id).await?;
        match original.kind {
            TransactionKind::Closing { .. } => {
                return Err(LedgerError::validation(
                    "transaction_id",
                    "closing transactions are undone by reopening their period",
                ))
            }
            TransactionKind::Reversal { .. } => {
                return Err(LedgerError::validation(
                    "transaction_id",
                    "a reversal cannot itself be reversed",
                ))
            }
            _ => {}
        }

        let already_reversed = self.storage.get_transactions(None, None).await?.iter().any(|t| {
            matches!(&t.kind, TransactionKind::Reversal { original_id } if original_id == transaction_id)
        });
        if already_reversed {
            return Err(LedgerError::validation(
                "transaction_id",
                format!("transaction {} is already reversed", transaction_id),
            ));
        }

        let mut reversal = Transaction::new(
            date,
            format!("Reversal of: {}", original.description),
            original.reference.clone(),
        );
        reversal.kind = TransactionKind::Reversal {
            original_id: original.id.clone(),
        };
        reversal.entries = original.entries.iter().map(Entry::mirrored).collect();

        self.validate(&reversal)?;
        self.check_postable(&guard, &reversal).await?;

        let id = reversal.id.clone();
        self.commit_locked(&guard, WriteBatch::new().append(reversal))
            .await?;
        tracing::info!(transaction_id = %id, original_id = %transaction_id, "transaction reversed");
        Ok(id)
    }

    /// Get a transaction by ID
    pub async fn get_transaction(&self, transaction_id: &str) -> LedgerResult<Option<Transaction>> {
        self.storage.get_transaction(transaction_id).await
    }

    /// Get a transaction by ID, returning an error if not found
    pub async fn get_transaction_required(
        &self,
        transaction_id: &str,
    ) -> LedgerResult<Transaction> {
        self.storage
            .get_transaction(transaction_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("transaction", transaction_id))
    }

    /// Get transactions touching a specific account
    pub async fn get_account_transactions(
        &self,
        account_code: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> LedgerResult<Vec<Transaction>> {
        self.storage
            .get_account_transactions(account_code, start_date, end_date)
            .await
    }

    /// Get all transactions within a date range
    pub async fn get_transactions(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> LedgerResult<Vec<Transaction>> {
        self.storage.get_transactions(start_date, end_date).await
    }

    /// The most recent closed period, which bounds every posting date
    pub async fn latest_closed_period(&self) -> LedgerResult<Option<ClosedPeriod>> {
        Ok(self.storage.list_closed_periods().await?.pop())
    }

    pub(crate) fn validate(&self, transaction: &Transaction) -> LedgerResult<()> {
        transaction.validate(self.minor_unit_scale)?;
        self.validator.validate_transaction(transaction)
    }

    /// Checks that need the write lock: close fence, closed periods, and
    /// account existence
    pub(crate) async fn check_postable(
        &self,
        _guard: &WriteGuard,
        transaction: &Transaction,
    ) -> LedgerResult<()> {
        self.gate.check_fence(transaction.date)?;

        if let Some(period) = self.latest_closed_period().await? {
            if transaction.date <= period.end_date {
                return Err(LedgerError::PeriodLocked {
                    date: transaction.date,
                    locked_through: period.end_date,
                });
            }
        }

        for (index, entry) in transaction.entries.iter().enumerate() {
            if self
                .storage
                .get_account_by_code(&entry.account_code)
                .await?
                .is_none()
            {
                return Err(LedgerError::validation(
                    format!("lines[{}].account_code", index),
                    format!("unknown account code {}", entry.account_code),
                ));
            }
        }

        Ok(())
    }

    /// Apply a batch while holding the write lock
    pub(crate) async fn commit_locked(
        &self,
        _guard: &WriteGuard,
        batch: WriteBatch,
    ) -> LedgerResult<()> {
        self.storage.commit(batch).await
    }
}

/// Transaction builder for creating multi-line transactions
#[derive(Debug)]
pub struct TransactionBuilder {
    transaction: Transaction,
}

impl TransactionBuilder {
    /// Create a new transaction builder
    pub fn new(date: NaiveDate, description: String) -> Self {
        Self {
            transaction: Transaction::new(date, description, None),
        }
    }

    /// Set the reference for the transaction
    pub fn reference(mut self, reference: String) -> Self {
        self.transaction.reference = Some(reference);
        self
    }

    /// Add metadata to the transaction
    pub fn metadata(mut self, key: String, value: String) -> Self {
        self.transaction.metadata.insert(key, value);
        self
    }

    /// Add a debit line
    pub fn debit(mut self, account_code: String, amount: BigDecimal, memo: Option<String>) -> Self {
        self.transaction
            .add_entry(Entry::debit(account_code, amount, memo));
        self
    }

    /// Add a credit line
    pub fn credit(mut self, account_code: String, amount: BigDecimal, memo: Option<String>) -> Self {
        self.transaction
            .add_entry(Entry::credit(account_code, amount, memo));
        self
    }

    /// Add a custom line
    pub fn entry(mut self, entry: Entry) -> Self {
        self.transaction.add_entry(entry);
        self
    }

    /// Build the transaction. Minor-unit precision is enforced again at posting.
    pub fn build(self) -> LedgerResult<Transaction> {
        self.transaction.validate(MAX_MINOR_UNIT_SCALE)?;
        Ok(self.transaction)
    }
}

/// Common posting patterns for a manufacturing business
pub mod patterns {
    use super::*;

    /// Credit sale or cash sale: debit cash/receivables, credit revenue
    pub fn create_sales_transaction(
        date: NaiveDate,
        description: String,
        cash_or_receivables_code: String,
        revenue_code: String,
        amount: BigDecimal,
    ) -> LedgerResult<Transaction> {
        TransactionBuilder::new(date, description)
            .debit(cash_or_receivables_code, amount.clone(), None)
            .credit(revenue_code, amount, None)
            .build()
    }

    /// Expense paid: debit expense, credit cash
    pub fn create_expense_payment(
        date: NaiveDate,
        description: String,
        expense_code: String,
        cash_code: String,
        amount: BigDecimal,
    ) -> LedgerResult<Transaction> {
        TransactionBuilder::new(date, description)
            .debit(expense_code, amount.clone(), None)
            .credit(cash_code, amount, None)
            .build()
    }

    /// Raw materials received: debit inventory, credit cash/payables
    pub fn create_material_purchase(
        date: NaiveDate,
        description: String,
        inventory_code: String,
        cash_or_payables_code: String,
        amount: BigDecimal,
    ) -> LedgerResult<Transaction> {
        TransactionBuilder::new(date, description)
            .debit(
                inventory_code,
                amount.clone(),
                Some("Materials received".to_string()),
            )
            .credit(cash_or_payables_code, amount, None)
            .build()
    }

    /// Materials consumed by production: debit work in process, credit inventory
    pub fn create_material_issue(
        date: NaiveDate,
        description: String,
        work_in_process_code: String,
        inventory_code: String,
        amount: BigDecimal,
    ) -> LedgerResult<Transaction> {
        TransactionBuilder::new(date, description)
            .debit(
                work_in_process_code,
                amount.clone(),
                Some("Materials issued to production".to_string()),
            )
            .credit(inventory_code, amount, None)
            .build()
    }

    /// Owner investment: debit cash, credit capital
    pub fn create_owner_investment(
        date: NaiveDate,
        description: String,
        cash_code: String,
        equity_code: String,
        amount: BigDecimal,
    ) -> LedgerResult<Transaction> {
        TransactionBuilder::new(date, description)
            .debit(
                cash_code,
                amount.clone(),
                Some("Cash invested by owner".to_string()),
            )
            .credit(
                equity_code,
                amount,
                Some("Owner's capital contribution".to_string()),
            )
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::account::AccountManager;
    use crate::utils::memory_storage::MemoryStorage;
    use std::time::Duration;

    fn jan(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    async fn setup() -> TransactionManager<MemoryStorage> {
        let storage = MemoryStorage::new();
        let gate = WriteGate::new(Duration::from_secs(1));
        let accounts = AccountManager::new(storage.clone(), gate.clone());
        crate::ledger::account::utils::create_standard_chart(&accounts)
            .await
            .unwrap();
        TransactionManager::new(storage, gate, 2)
    }

    #[tokio::test]
    async fn test_post_lines_persists_every_line() {
        let journal = setup().await;
        let id = journal
            .post_lines(
                jan(5),
                "Invoice".to_string(),
                vec![
                    JournalLineInput {
                        account_code: "1130".to_string(),
                        debit: BigDecimal::from(1_000_000),
                        credit: BigDecimal::from(0),
                    },
                    JournalLineInput {
                        account_code: "4100".to_string(),
                        debit: BigDecimal::from(0),
                        credit: BigDecimal::from(1_000_000),
                    },
                ],
            )
            .await
            .unwrap();

        let stored = journal.get_transaction_required(&id).await.unwrap();
        assert_eq!(stored.entries.len(), 2);
        assert!(stored.is_balanced());
    }

    #[tokio::test]
    async fn test_unknown_account_rejected_without_write() {
        let journal = setup().await;
        let txn = patterns::create_sales_transaction(
            jan(5),
            "Sale".to_string(),
            "1110".to_string(),
            "4999".to_string(),
            BigDecimal::from(10),
        )
        .unwrap();

        assert!(matches!(
            journal.post_transaction(txn).await,
            Err(LedgerError::Validation { ref field, .. }) if field == "lines[1].account_code"
        ));
        assert!(journal.get_transactions(None, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reversal_mirrors_and_only_once() {
        let journal = setup().await;
        let sale = patterns::create_sales_transaction(
            jan(3),
            "Sale".to_string(),
            "1110".to_string(),
            "4100".to_string(),
            BigDecimal::from(250),
        )
        .unwrap();
        let sale_id = journal.post_transaction(sale).await.unwrap();

        let reversal_id = journal.reverse_transaction(&sale_id, jan(4)).await.unwrap();
        let reversal = journal.get_transaction_required(&reversal_id).await.unwrap();
        assert_eq!(reversal.entries[0].credit, BigDecimal::from(250));
        assert_eq!(reversal.entries[1].debit, BigDecimal::from(250));

        assert!(journal.reverse_transaction(&sale_id, jan(5)).await.is_err());
        assert!(journal.reverse_transaction(&reversal_id, jan(5)).await.is_err());
    }

    #[tokio::test]
    async fn test_internal_kinds_cannot_be_posted_directly() {
        let journal = setup().await;
        let sale = patterns::create_sales_transaction(
            jan(3),
            "Sale".to_string(),
            "1110".to_string(),
            "4100".to_string(),
            BigDecimal::from(100),
        )
        .unwrap();
        let sale_id = journal.post_transaction(sale).await.unwrap();

        let kinds = [
            TransactionKind::Closing {
                period_id: "bogus".to_string(),
            },
            TransactionKind::Reversal {
                original_id: sale_id.clone(),
            },
            TransactionKind::MaterialIssue {
                work_order_id: "wo".to_string(),
            },
        ];
        for kind in kinds {
            let mut forged = patterns::create_sales_transaction(
                jan(4),
                "Sale".to_string(),
                "1110".to_string(),
                "4100".to_string(),
                BigDecimal::from(100),
            )
            .unwrap();
            forged.kind = kind;
            assert!(matches!(
                journal.post_transaction(forged).await,
                Err(LedgerError::Validation { ref field, .. }) if field == "kind"
            ));
        }

        assert_eq!(journal.get_transactions(None, None).await.unwrap().len(), 1);
        // the sale is still reversible since no reversal was recorded for it
        journal.reverse_transaction(&sale_id, jan(5)).await.unwrap();
    }

    struct AcceptAll;

    impl TransactionValidator for AcceptAll {
        fn validate_transaction(&self, _transaction: &Transaction) -> LedgerResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_custom_validator_keeps_double_entry_rules() {
        let base = setup().await;
        let journal = TransactionManager::with_validator(
            base.storage.clone(),
            base.gate.clone(),
            2,
            Arc::new(AcceptAll),
        );

        let mut unbalanced = Transaction::new(jan(5), "Unbalanced".to_string(), None);
        unbalanced.add_entry(Entry::debit("1110".to_string(), BigDecimal::from(100), None));
        unbalanced.add_entry(Entry::credit("4100".to_string(), BigDecimal::from(90), None));
        assert!(matches!(
            journal.post_transaction(unbalanced).await,
            Err(LedgerError::Validation { .. })
        ));
        assert!(journal.get_transactions(None, None).await.unwrap().is_empty());
    }

    #[test]
    fn test_builder_rejects_unbalanced() {
        let result = TransactionBuilder::new(jan(1), "Bad".to_string())
            .debit("1110".to_string(), BigDecimal::from(10), None)
            .credit("4100".to_string(), BigDecimal::from(9), None)
            .build();
        assert!(result.is_err());
    }
}
