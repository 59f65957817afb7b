//! Traits for storage abstraction and extensibility

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::closing::ClosedPeriod;
use crate::costing::{WorkOrder, WorkOrderCost};
use crate::types::*;

/// A group of writes applied as one atomic unit.
///
/// Backends must validate the whole batch before touching any data and then
/// apply every part of it, or none.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    /// Transactions to append to the journal
    pub append_transactions: Vec<Transaction>,
    /// Ids of transactions to remove (closing events being undone)
    pub remove_transactions: Vec<String>,
    /// Closed period to insert or replace
    pub upsert_closed_period: Option<ClosedPeriod>,
    /// Id of a closed period to remove
    pub remove_closed_period: Option<String>,
    /// Work orders to insert or replace
    pub upsert_work_orders: Vec<WorkOrder>,
    /// Work-order cost records to insert or replace
    pub upsert_work_order_costs: Vec<WorkOrderCost>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(mut self, transaction: Transaction) -> Self {
        self.append_transactions.push(transaction);
        self
    }

    pub fn remove(mut self, transaction_id: String) -> Self {
        self.remove_transactions.push(transaction_id);
        self
    }

    pub fn put_closed_period(mut self, period: ClosedPeriod) -> Self {
        self.upsert_closed_period = Some(period);
        self
    }

    pub fn drop_closed_period(mut self, period_id: String) -> Self {
        self.remove_closed_period = Some(period_id);
        self
    }

    pub fn put_work_order(mut self, work_order: WorkOrder) -> Self {
        self.upsert_work_orders.push(work_order);
        self
    }

    pub fn put_work_order_cost(mut self, cost: WorkOrderCost) -> Self {
        self.upsert_work_order_costs.push(cost);
        self
    }
}

/// Storage abstraction for the ledger system
///
/// This trait allows the ledger core to work with any durable backend
/// (PostgreSQL, SQLite, in-memory, etc.). Reads may run concurrently with
/// each other and with `commit`, but must never observe a partially applied
/// batch.
#[async_trait]
pub trait LedgerStorage: Send + Sync {
    /// Save a new account
    async fn save_account(&self, account: &Account) -> LedgerResult<()>;

    /// Get an account by ID
    async fn get_account(&self, account_id: &str) -> LedgerResult<Option<Account>>;

    /// Get an account by its unique code
    async fn get_account_by_code(&self, code: &str) -> LedgerResult<Option<Account>>;

    /// List all accounts ordered by code, optionally filtered by type
    async fn list_accounts(&self, account_type: Option<AccountType>) -> LedgerResult<Vec<Account>>;

    /// Delete an account
    async fn delete_account(&self, account_id: &str) -> LedgerResult<()>;

    /// Whether any journal line references the account code
    async fn account_has_entries(&self, account_code: &str) -> LedgerResult<bool>;

    /// Get a transaction by ID
    async fn get_transaction(&self, transaction_id: &str) -> LedgerResult<Option<Transaction>>;

    /// List transactions within an inclusive date range, ordered by date and
    /// then by the order they were recorded
    async fn get_transactions(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> LedgerResult<Vec<Transaction>>;

    /// Same ordering as `get_transactions`, restricted to one account code
    async fn get_account_transactions(
        &self,
        account_code: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> LedgerResult<Vec<Transaction>>;

    /// All closed periods ordered by end date
    async fn list_closed_periods(&self) -> LedgerResult<Vec<ClosedPeriod>>;

    /// Get a work order by ID
    async fn get_work_order(&self, work_order_id: &str) -> LedgerResult<Option<WorkOrder>>;

    /// Get the cost record of a work order
    async fn get_work_order_cost(&self, work_order_id: &str)
        -> LedgerResult<Option<WorkOrderCost>>;

    /// Apply a batch atomically
    async fn commit(&self, batch: WriteBatch) -> LedgerResult<()>;
}

/// Trait for implementing custom account validation rules
pub trait AccountValidator: Send + Sync {
    /// Validate an account before saving
    fn validate_account(&self, account: &Account) -> LedgerResult<()>;
}

/// Trait for implementing custom transaction validation rules
pub trait TransactionValidator: Send + Sync {
    /// Validate a transaction before posting
    fn validate_transaction(&self, transaction: &Transaction) -> LedgerResult<()>;
}

/// Default account validator with basic rules
pub struct DefaultAccountValidator;

impl AccountValidator for DefaultAccountValidator {
    fn validate_account(&self, account: &Account) -> LedgerResult<()> {
        if account.code.trim().is_empty() {
            return Err(LedgerError::validation("code", "account code cannot be empty"));
        }

        if account.name.trim().is_empty() {
            return Err(LedgerError::validation("name", "account name cannot be empty"));
        }

        Ok(())
    }
}

/// Default transaction validator with the double-entry rules
pub struct DefaultTransactionValidator {
    pub minor_unit_scale: u32,
}

impl TransactionValidator for DefaultTransactionValidator {
    fn validate_transaction(&self, transaction: &Transaction) -> LedgerResult<()> {
        transaction.validate(self.minor_unit_scale)
    }
}
