//! In-memory storage implementation for testing

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::closing::ClosedPeriod;
use crate::costing::{WorkOrder, WorkOrderCost};
use crate::traits::*;
use crate::types::*;

#[derive(Debug, Default)]
struct MemoryState {
    accounts: HashMap<String, Account>,
    /// Journal in the order transactions were recorded
    transactions: Vec<Transaction>,
    closed_periods: Vec<ClosedPeriod>,
    work_orders: HashMap<String, WorkOrder>,
    work_order_costs: HashMap<String, WorkOrderCost>,
}

/// In-memory storage implementation for testing and development.
///
/// Every batch is applied under a single write lock, so readers see either
/// all of a commit or none of it.
#[derive(Debug, Clone)]
pub struct MemoryStorage {
    state: Arc<RwLock<MemoryState>>,
    fail_commits: Arc<AtomicBool>,
}

impl MemoryStorage {
    /// Create a new memory storage instance
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(MemoryState::default())),
            fail_commits: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Make every following `commit` fail after validation, before any write.
    /// Used to exercise rollback paths.
    pub fn set_commit_failure(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    fn read(&self) -> LedgerResult<RwLockReadGuard<'_, MemoryState>> {
        self.state
            .read()
            .map_err(|_| LedgerError::Storage("memory store lock poisoned".to_string()))
    }

    fn write(&self) -> LedgerResult<RwLockWriteGuard<'_, MemoryState>> {
        self.state
            .write()
            .map_err(|_| LedgerError::Storage("memory store lock poisoned".to_string()))
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

fn in_range(date: NaiveDate, start_date: Option<NaiveDate>, end_date: Option<NaiveDate>) -> bool {
    start_date.is_none_or(|start| date >= start) && end_date.is_none_or(|end| date <= end)
}

fn validate_batch(state: &MemoryState, batch: &WriteBatch) -> LedgerResult<()> {
    let known_codes: HashSet<&str> = state.accounts.values().map(|a| a.code.as_str()).collect();
    let existing_ids: HashSet<&str> = state.transactions.iter().map(|t| t.id.as_str()).collect();

    let mut appended = HashSet::new();
    for transaction in &batch.append_transactions {
        if existing_ids.contains(transaction.id.as_str()) || !appended.insert(transaction.id.as_str())
        {
            return Err(LedgerError::Storage(format!(
                "duplicate transaction id {}",
                transaction.id
            )));
        }
        for entry in &transaction.entries {
            if !known_codes.contains(entry.account_code.as_str()) {
                return Err(LedgerError::not_found("account", entry.account_code.clone()));
            }
        }
    }

    for transaction_id in &batch.remove_transactions {
        if !existing_ids.contains(transaction_id.as_str()) {
            return Err(LedgerError::not_found("transaction", transaction_id.clone()));
        }
    }

    if let Some(period_id) = &batch.remove_closed_period {
        if !state.closed_periods.iter().any(|p| &p.id == period_id) {
            return Err(LedgerError::not_found("closed period", period_id.clone()));
        }
    }

    for cost in &batch.upsert_work_order_costs {
        let order_known = state.work_orders.contains_key(&cost.work_order_id)
            || batch
                .upsert_work_orders
                .iter()
                .any(|wo| wo.id == cost.work_order_id);
        if !order_known {
            return Err(LedgerError::not_found("work order", cost.work_order_id.clone()));
        }
    }

    Ok(())
}

#[async_trait]
impl LedgerStorage for MemoryStorage {
    async fn save_account(&self, account: &Account) -> LedgerResult<()> {
        let mut state = self.write()?;
        if state.accounts.values().any(|a| a.code == account.code) {
            return Err(LedgerError::DuplicateCode(account.code.clone()));
        }
        state.accounts.insert(account.id.clone(), account.clone());
        Ok(())
    }

    async fn get_account(&self, account_id: &str) -> LedgerResult<Option<Account>> {
        Ok(self.read()?.accounts.get(account_id).cloned())
    }

    async fn get_account_by_code(&self, code: &str) -> LedgerResult<Option<Account>> {
        Ok(self
            .read()?
            .accounts
            .values()
            .find(|account| account.code == code)
            .cloned())
    }

    async fn list_accounts(&self, account_type: Option<AccountType>) -> LedgerResult<Vec<Account>> {
        let state = self.read()?;
        let mut accounts: Vec<Account> = state
            .accounts
            .values()
            .filter(|account| account_type.is_none_or(|t| account.account_type == t))
            .cloned()
            .collect();
        accounts.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(accounts)
    }

    async fn delete_account(&self, account_id: &str) -> LedgerResult<()> {
        if self.write()?.accounts.remove(account_id).is_some() {
            Ok(())
        } else {
            Err(LedgerError::not_found("account", account_id))
        }
    }

    async fn account_has_entries(&self, account_code: &str) -> LedgerResult<bool> {
        Ok(self
            .read()?
            .transactions
            .iter()
            .any(|txn| txn.touches(account_code)))
    }

    async fn get_transaction(&self, transaction_id: &str) -> LedgerResult<Option<Transaction>> {
        Ok(self
            .read()?
            .transactions
            .iter()
            .find(|txn| txn.id == transaction_id)
            .cloned())
    }

    async fn get_transactions(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> LedgerResult<Vec<Transaction>> {
        let state = self.read()?;
        let mut transactions: Vec<Transaction> = state
            .transactions
            .iter()
            .filter(|txn| in_range(txn.date, start_date, end_date))
            .cloned()
            .collect();
        // stable: same-day transactions keep recording order
        transactions.sort_by_key(|txn| txn.date);
        Ok(transactions)
    }

    async fn get_account_transactions(
        &self,
        account_code: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> LedgerResult<Vec<Transaction>> {
        let state = self.read()?;
        let mut transactions: Vec<Transaction> = state
            .transactions
            .iter()
            .filter(|txn| txn.touches(account_code) && in_range(txn.date, start_date, end_date))
            .cloned()
            .collect();
        transactions.sort_by_key(|txn| txn.date);
        Ok(transactions)
    }

    async fn list_closed_periods(&self) -> LedgerResult<Vec<ClosedPeriod>> {
        let mut periods = self.read()?.closed_periods.clone();
        periods.sort_by_key(|p| p.end_date);
        Ok(periods)
    }

    async fn get_work_order(&self, work_order_id: &str) -> LedgerResult<Option<WorkOrder>> {
        Ok(self.read()?.work_orders.get(work_order_id).cloned())
    }

    async fn get_work_order_cost(
        &self,
        work_order_id: &str,
    ) -> LedgerResult<Option<WorkOrderCost>> {
        Ok(self.read()?.work_order_costs.get(work_order_id).cloned())
    }

    async fn commit(&self, batch: WriteBatch) -> LedgerResult<()> {
        let mut state = self.write()?;
        validate_batch(&state, &batch)?;

        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(LedgerError::Storage("commit rejected by backend".to_string()));
        }

        if !batch.remove_transactions.is_empty() {
            let removed: HashSet<&String> = batch.remove_transactions.iter().collect();
            state.transactions.retain(|txn| !removed.contains(&txn.id));
        }
        state.transactions.extend(batch.append_transactions);

        if let Some(period_id) = batch.remove_closed_period {
            state.closed_periods.retain(|p| p.id != period_id);
        }
        if let Some(period) = batch.upsert_closed_period {
            state.closed_periods.retain(|p| p.id != period.id);
            state.closed_periods.push(period);
        }

        for work_order in batch.upsert_work_orders {
            state.work_orders.insert(work_order.id.clone(), work_order);
        }
        for cost in batch.upsert_work_order_costs {
            state
                .work_order_costs
                .insert(cost.work_order_id.clone(), cost);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;

    fn sample_transaction(date: NaiveDate, debit_code: &str, credit_code: &str) -> Transaction {
        let mut txn = Transaction::new(date, "Sample".to_string(), None);
        txn.add_entry(Entry::debit(debit_code.to_string(), BigDecimal::from(10), None));
        txn.add_entry(Entry::credit(credit_code.to_string(), BigDecimal::from(10), None));
        txn
    }

    async fn storage_with_accounts() -> MemoryStorage {
        let storage = MemoryStorage::new();
        for (code, account_type) in [("1110", AccountType::Asset), ("4100", AccountType::Revenue)] {
            let account = Account::new(code.to_string(), code.to_string(), account_type, false);
            storage.save_account(&account).await.unwrap();
        }
        storage
    }

    #[tokio::test]
    async fn test_commit_is_all_or_nothing() {
        let storage = storage_with_accounts().await;
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

        let batch = WriteBatch::new()
            .append(sample_transaction(date, "1110", "4100"))
            .append(sample_transaction(date, "1110", "9999"));
        assert!(storage.commit(batch).await.is_err());
        assert!(storage.get_transactions(None, None).await.unwrap().is_empty());

        storage.set_commit_failure(true);
        let batch = WriteBatch::new().append(sample_transaction(date, "1110", "4100"));
        assert!(matches!(storage.commit(batch).await, Err(LedgerError::Storage(_))));
        assert!(storage.get_transactions(None, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transactions_ordered_by_date_then_recording() {
        let storage = storage_with_accounts().await;
        let jan_2 = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let jan_1 = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

        let first = sample_transaction(jan_2, "1110", "4100");
        let second = sample_transaction(jan_1, "1110", "4100");
        let third = sample_transaction(jan_2, "1110", "4100");
        let ids = [second.id.clone(), first.id.clone(), third.id.clone()];

        storage
            .commit(WriteBatch::new().append(first).append(second).append(third))
            .await
            .unwrap();

        let listed: Vec<String> = storage
            .get_account_transactions("1110", None, None)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(listed, ids);
    }

    #[tokio::test]
    async fn test_duplicate_code_rejected() {
        let storage = storage_with_accounts().await;
        let again = Account::new("1110".to_string(), "Kas".to_string(), AccountType::Asset, true);
        assert!(matches!(
            storage.save_account(&again).await,
            Err(LedgerError::DuplicateCode(_))
        ));
    }
}
