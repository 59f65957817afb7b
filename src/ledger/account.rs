//! Chart of accounts management

use std::collections::HashMap;
use std::sync::Arc;

use crate::ledger::gate::WriteGate;
use crate::traits::*;
use crate::types::*;

/// Account manager for handling chart of accounts operations
#[derive(Clone)]
pub struct AccountManager<S: LedgerStorage> {
    pub(crate) storage: S,
    gate: WriteGate,
    validator: Arc<dyn AccountValidator>,
}

impl<S: LedgerStorage> AccountManager<S> {
    /// Create a new account manager
    pub fn new(storage: S, gate: WriteGate) -> Self {
        Self {
            storage,
            gate,
            validator: Arc::new(DefaultAccountValidator),
        }
    }

    /// Create a new account manager with custom validator
    pub fn with_validator(storage: S, gate: WriteGate, validator: Arc<dyn AccountValidator>) -> Self {
        Self {
            storage,
            gate,
            validator,
        }
    }

    /// Create a new account. Fails with `DuplicateCode` if the code is taken.
    pub async fn create_account(
        &self,
        code: String,
        name: String,
        account_type: AccountType,
        is_cash_account: bool,
    ) -> LedgerResult<Account> {
        let account = Account::new(code, name, account_type, is_cash_account);
        self.validator.validate_account(&account)?;

        let _guard = self.gate.acquire().await?;

        if self.storage.get_account_by_code(&account.code).await?.is_some() {
            return Err(LedgerError::DuplicateCode(account.code));
        }

        self.storage.save_account(&account).await?;
        tracing::info!(code = %account.code, account_type = ?account.account_type, "account created");

        Ok(account)
    }

    /// Get an account by ID
    pub async fn get_account(&self, account_id: &str) -> LedgerResult<Option<Account>> {
        self.storage.get_account(account_id).await
    }

    /// Get an account by ID, returning an error if not found
    pub async fn get_account_required(&self, account_id: &str) -> LedgerResult<Account> {
        self.storage
            .get_account(account_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("account", account_id))
    }

    /// Get an account by code, returning an error if not found
    pub async fn get_account_by_code(&self, code: &str) -> LedgerResult<Account> {
        self.storage
            .get_account_by_code(code)
            .await?
            .ok_or_else(|| LedgerError::not_found("account", code))
    }

    /// List all accounts
    pub async fn list_accounts(&self) -> LedgerResult<Vec<Account>> {
        self.storage.list_accounts(None).await
    }

    /// List accounts by type
    pub async fn list_accounts_by_type(
        &self,
        account_type: AccountType,
    ) -> LedgerResult<Vec<Account>> {
        self.storage.list_accounts(Some(account_type)).await
    }

    /// Delete an account. Fails with `AccountInUse` while any journal line references it.
    pub async fn delete_account(&self, account_id: &str) -> LedgerResult<()> {
        let _guard = self.gate.acquire().await?;

        let account = self.get_account_required(account_id).await?;
        if self.storage.account_has_entries(&account.code).await? {
            return Err(LedgerError::AccountInUse(account.code));
        }

        self.storage.delete_account(account_id).await?;
        tracing::info!(code = %account.code, "account deleted");
        Ok(())
    }
}

/// Utility functions for working with accounts
pub mod utils {
    use super::*;

    /// Standard chart for a small manufacturer: (key, code, name, type, is_cash)
    const STANDARD_CHART: &[(&str, &str, &str, AccountType, bool)] = &[
        ("kas", "1110", "Kas", AccountType::Asset, true),
        ("bank", "1120", "Bank", AccountType::Asset, true),
        ("piutang_usaha", "1130", "Piutang Usaha", AccountType::Asset, false),
        ("persediaan_bahan_baku", "1140", "Persediaan Bahan Baku", AccountType::Asset, false),
        ("barang_dalam_proses", "1150", "Barang Dalam Proses", AccountType::Asset, false),
        ("persediaan_barang_jadi", "1160", "Persediaan Barang Jadi", AccountType::Asset, false),
        ("hutang_usaha", "2110", "Hutang Usaha", AccountType::Liability, false),
        ("hutang_gaji", "2120", "Hutang Gaji", AccountType::Liability, false),
        ("modal_pemilik", "3100", "Modal Pemilik", AccountType::Equity, false),
        ("laba_ditahan", "3200", "Laba Ditahan", AccountType::Equity, false),
        ("penjualan", "4100", "Penjualan", AccountType::Revenue, false),
        ("hpp", "5100", "Harga Pokok Penjualan", AccountType::Expense, false),
        ("beban_gaji", "6100", "Beban Gaji", AccountType::Expense, false),
        ("beban_sewa", "6200", "Beban Sewa", AccountType::Expense, false),
        ("pendapatan_lain", "7100", "Pendapatan Lain-lain", AccountType::Revenue, false),
        ("beban_lain", "8100", "Beban Lain-lain", AccountType::Expense, false),
    ];

    /// Create the standard chart of accounts, keyed by a short snake_case name
    pub async fn create_standard_chart<S: LedgerStorage>(
        account_manager: &AccountManager<S>,
    ) -> LedgerResult<HashMap<String, Account>> {
        let mut accounts = HashMap::new();

        for (key, code, name, account_type, is_cash) in STANDARD_CHART {
            let account = account_manager
                .create_account(code.to_string(), name.to_string(), *account_type, *is_cash)
                .await?;
            accounts.insert(key.to_string(), account);
        }

        Ok(accounts)
    }
}
