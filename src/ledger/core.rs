//! Main ledger orchestrator exposing the service surface

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;

use crate::auth::{Actor, Authorizer, RoleAuthorizer};
use crate::closing::{ClosedPeriod, PeriodCloser};
use crate::config::LedgerConfig;
use crate::costing::{CostRollupEngine, CostSummary, WorkOrder, WorkOrderItem, WorkOrderStatus};
use crate::ledger::gate::WriteGate;
use crate::ledger::{AccountManager, JournalLineInput, RunningBalance, TransactionManager};
use crate::reporting::*;
use crate::traits::*;
use crate::types::*;

/// Main ledger system that wires the components over one storage backend.
///
/// Every method takes `&self`; wrap the ledger in an `Arc` to share it
/// between tasks. Mutations are serialized internally.
pub struct Ledger<S: LedgerStorage> {
    config: LedgerConfig,
    account_manager: AccountManager<S>,
    transaction_manager: TransactionManager<S>,
    cost_engine: CostRollupEngine<S>,
    reporter: RunningBalanceReporter<S>,
    closer: PeriodCloser<S>,
}

impl<S: LedgerStorage + Clone> Ledger<S> {
    /// Create a new ledger with default configuration and role-based authorization
    pub fn new(storage: S) -> Self {
        let config = LedgerConfig::default();
        let gate = WriteGate::new(config.write_timeout());
        let journal = TransactionManager::new(storage.clone(), gate.clone(), config.minor_unit_scale);
        let accounts = AccountManager::new(storage.clone(), gate);
        Self::assemble(storage, config, accounts, journal, Arc::new(RoleAuthorizer))
    }

    /// Create a new ledger with the given configuration
    pub fn with_config(storage: S, config: LedgerConfig) -> LedgerResult<Self> {
        Self::with_authorizer(storage, config, Arc::new(RoleAuthorizer))
    }

    /// Create a new ledger with a custom authorization collaborator
    pub fn with_authorizer(
        storage: S,
        config: LedgerConfig,
        authorizer: Arc<dyn Authorizer>,
    ) -> LedgerResult<Self> {
        config.validate()?;
        let gate = WriteGate::new(config.write_timeout());
        let journal = TransactionManager::new(storage.clone(), gate.clone(), config.minor_unit_scale);
        let accounts = AccountManager::new(storage.clone(), gate);
        Ok(Self::assemble(storage, config, accounts, journal, authorizer))
    }

    /// Create a new ledger with custom validators
    pub fn with_validators(
        storage: S,
        config: LedgerConfig,
        account_validator: Arc<dyn AccountValidator>,
        transaction_validator: Arc<dyn TransactionValidator>,
    ) -> LedgerResult<Self> {
        config.validate()?;
        let gate = WriteGate::new(config.write_timeout());
        let journal =
            TransactionManager::with_validator(
                storage.clone(),
                gate.clone(),
                config.minor_unit_scale,
                transaction_validator,
            );
        let accounts = AccountManager::with_validator(storage.clone(), gate, account_validator);
        Ok(Self::assemble(storage, config, accounts, journal, Arc::new(RoleAuthorizer)))
    }

    fn assemble(
        storage: S,
        config: LedgerConfig,
        account_manager: AccountManager<S>,
        transaction_manager: TransactionManager<S>,
        authorizer: Arc<dyn Authorizer>,
    ) -> Self {
        let reporter =
            RunningBalanceReporter::new(storage.clone(), transaction_manager.clone(), config.clone());
        let cost_engine = CostRollupEngine::new(
            storage.clone(),
            transaction_manager.clone(),
            config.minor_unit_scale,
        );
        let closer = PeriodCloser::new(
            storage,
            transaction_manager.clone(),
            reporter.clone(),
            authorizer,
            config.retained_earnings_code.clone(),
        );
        Self {
            config,
            account_manager,
            transaction_manager,
            cost_engine,
            reporter,
            closer,
        }
    }
}

impl<S: LedgerStorage> Ledger<S> {
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn journal(&self) -> &TransactionManager<S> {
        &self.transaction_manager
    }

    pub fn costing(&self) -> &CostRollupEngine<S> {
        &self.cost_engine
    }

    pub fn reports(&self) -> &RunningBalanceReporter<S> {
        &self.reporter
    }

    pub fn closing(&self) -> &PeriodCloser<S> {
        &self.closer
    }

    // Account operations
    /// Create a new account
    pub async fn create_account(
        &self,
        code: String,
        name: String,
        account_type: AccountType,
        is_cash_account: bool,
    ) -> LedgerResult<Account> {
        self.account_manager
            .create_account(code, name, account_type, is_cash_account)
            .await
    }

    /// Get an account by ID
    pub async fn get_account(&self, account_id: &str) -> LedgerResult<Option<Account>> {
        self.account_manager.get_account(account_id).await
    }

    /// Get an account by code
    pub async fn get_account_by_code(&self, code: &str) -> LedgerResult<Account> {
        self.account_manager.get_account_by_code(code).await
    }

    /// List all accounts
    pub async fn list_accounts(&self) -> LedgerResult<Vec<Account>> {
        self.account_manager.list_accounts().await
    }

    /// List accounts by type
    pub async fn list_accounts_by_type(
        &self,
        account_type: AccountType,
    ) -> LedgerResult<Vec<Account>> {
        self.account_manager
            .list_accounts_by_type(account_type)
            .await
    }

    /// Delete an account that no journal line references
    pub async fn delete_account(&self, account_id: &str) -> LedgerResult<()> {
        self.account_manager.delete_account(account_id).await
    }

    /// Setup the standard manufacturing chart of accounts
    pub async fn setup_standard_chart_of_accounts(&self) -> LedgerResult<HashMap<String, Account>> {
        crate::ledger::account::utils::create_standard_chart(&self.account_manager).await
    }

    // Journal operations
    /// Post a balanced transaction; returns its id
    pub async fn post_transaction(
        &self,
        date: NaiveDate,
        description: String,
        lines: Vec<JournalLineInput>,
    ) -> LedgerResult<String> {
        self.transaction_manager
            .post_lines(date, description, lines)
            .await
    }

    /// Post a transaction built with [`crate::ledger::TransactionBuilder`] or a pattern
    pub async fn record_transaction(&self, transaction: Transaction) -> LedgerResult<String> {
        self.transaction_manager
            .post_transaction(transaction)
            .await
    }

    /// Append a reversal of an earlier transaction
    pub async fn reverse_transaction(
        &self,
        transaction_id: &str,
        date: NaiveDate,
    ) -> LedgerResult<String> {
        self.transaction_manager
            .reverse_transaction(transaction_id, date)
            .await
    }

    /// Get a transaction by ID
    pub async fn get_transaction(&self, transaction_id: &str) -> LedgerResult<Option<Transaction>> {
        self.transaction_manager
            .get_transaction(transaction_id)
            .await
    }

    /// Get all transactions within a date range
    pub async fn get_transactions(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> LedgerResult<Vec<Transaction>> {
        self.transaction_manager
            .get_transactions(start_date, end_date)
            .await
    }

    // Balance operations
    /// Debit minus credit over the account's lines up to `as_of_date`
    pub async fn get_account_balance(
        &self,
        account_id: &str,
        as_of_date: Option<NaiveDate>,
    ) -> LedgerResult<BigDecimal> {
        let account = self.account_manager.get_account_required(account_id).await?;
        self.transaction_manager
            .account_balance(&account, as_of_date)
            .await
    }

    /// Balance signed by the account type's normal side
    pub async fn get_normalized_balance(
        &self,
        account_id: &str,
        as_of_date: Option<NaiveDate>,
    ) -> LedgerResult<BigDecimal> {
        self.reporter
            .normalized_balance(account_id, as_of_date)
            .await
    }

    /// Chronological rows with a cumulative balance, opening row first
    pub async fn get_running_balance(
        &self,
        account_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> LedgerResult<RunningBalance> {
        let account = self.account_manager.get_account_required(account_id).await?;
        self.transaction_manager
            .running_balance(&account, start_date, end_date)
            .await
    }

    /// Running balance of a cash or bank account
    pub async fn get_cash_bank_book(
        &self,
        account_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> LedgerResult<RunningBalance> {
        self.reporter
            .cash_bank_book(account_id, start_date, end_date)
            .await
    }

    // Period closing
    /// Close the books through `end_date`
    pub async fn close_book(
        &self,
        actor: &Actor,
        end_date: NaiveDate,
        period_name: &str,
    ) -> LedgerResult<ClosedPeriod> {
        self.closer.close_book(actor, end_date, period_name).await
    }

    /// Reopen the most recent closed period
    pub async fn reopen_book(&self, actor: &Actor, closed_period_id: &str) -> LedgerResult<()> {
        self.closer.reopen_book(actor, closed_period_id).await?;
        Ok(())
    }

    /// All closed periods, oldest first
    pub async fn list_closed_periods(&self) -> LedgerResult<Vec<ClosedPeriod>> {
        self.closer.list_closed_periods().await
    }

    // Work-order costing
    /// Register a work order with BOM-costed items
    pub async fn create_work_order(
        &self,
        number: String,
        items: Vec<WorkOrderItem>,
    ) -> LedgerResult<WorkOrder> {
        self.cost_engine.create_work_order(number, items).await
    }

    /// Advance a work order to its next status
    pub async fn transition_work_order(
        &self,
        work_order_id: &str,
        target: WorkOrderStatus,
    ) -> LedgerResult<WorkOrder> {
        self.cost_engine
            .transition_status(work_order_id, target)
            .await
    }

    /// Post a material issue charged to a work order
    pub async fn issue_material(
        &self,
        work_order_id: &str,
        date: NaiveDate,
        description: String,
        lines: Vec<JournalLineInput>,
    ) -> LedgerResult<String> {
        self.cost_engine
            .issue_material(work_order_id, date, description, lines)
            .await
    }

    /// Set the ongoing overhead and labor of a work order
    pub async fn upsert_work_order_cost(
        &self,
        work_order_id: &str,
        overhead_cost: BigDecimal,
        labor_cost: BigDecimal,
    ) -> LedgerResult<()> {
        self.cost_engine
            .update_cost(work_order_id, overhead_cost, labor_cost)
            .await?;
        Ok(())
    }

    /// Ship the work order and freeze its cost
    pub async fn finalize_work_order_cost(&self, work_order_id: &str) -> LedgerResult<()> {
        self.cost_engine.finalize(work_order_id).await?;
        Ok(())
    }

    /// Standard cost, actual COGM, and variance of a work order
    pub async fn get_work_order_cost_summary(&self, work_order_id: &str) -> LedgerResult<CostSummary> {
        self.cost_engine.cost_summary(work_order_id).await
    }

    // Reporting
    /// P&L and balance sheet; degrades to a zeroed report with a warning on failure
    pub async fn get_financial_report(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> FinancialReport {
        self.reporter.financial_report(start_date, end_date).await
    }

    /// P&L and balance sheet, propagating failures
    pub async fn try_financial_report(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> LedgerResult<FinancialReport> {
        self.reporter
            .try_financial_report(start_date, end_date)
            .await
    }

    /// Balance sheet as of a date
    pub async fn get_balance_sheet(&self, as_of_date: NaiveDate) -> LedgerResult<BalanceSheet> {
        self.reporter.try_balance_sheet(as_of_date).await
    }

    /// Trial balance as of a date
    pub async fn get_trial_balance(&self, as_of_date: NaiveDate) -> LedgerResult<TrialBalance> {
        self.reporter.trial_balance(as_of_date).await
    }

    /// Validate the integrity of the ledger
    pub async fn validate_integrity(
        &self,
        as_of_date: NaiveDate,
    ) -> LedgerResult<LedgerIntegrityReport> {
        self.reporter.validate_integrity(as_of_date).await
    }
}
