//! Statement aggregation over the journal
//!
//! Every method here is read-only. Dropping a report future part-way is safe
//! and the report can simply be requested again.

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use std::collections::HashMap;

use crate::config::LedgerConfig;
use crate::ledger::{RunningBalance, TransactionManager};
use crate::reporting::statements::*;
use crate::traits::*;
use crate::types::*;

/// Where a nominal account lands on the profit and loss statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PnlSection {
    Pendapatan,
    Hpp,
    BebanOperasional,
    PendapatanLain,
    BebanLain,
}

fn classify(account: &Account, config: &LedgerConfig) -> Option<PnlSection> {
    let prefixes = &config.classification;
    match account.account_type {
        AccountType::Revenue if account.code.starts_with(&prefixes.operating_revenue_prefix) => {
            Some(PnlSection::Pendapatan)
        }
        AccountType::Revenue => Some(PnlSection::PendapatanLain),
        AccountType::Expense if account.code.starts_with(&prefixes.cogs_prefix) => {
            Some(PnlSection::Hpp)
        }
        AccountType::Expense if account.code.starts_with(&prefixes.operating_expense_prefix) => {
            Some(PnlSection::BebanOperasional)
        }
        AccountType::Expense => Some(PnlSection::BebanLain),
        _ => None,
    }
}

/// Running balances, P&L, and balance sheet derived on demand
#[derive(Clone)]
pub struct RunningBalanceReporter<S: LedgerStorage> {
    storage: S,
    journal: TransactionManager<S>,
    config: LedgerConfig,
}

impl<S: LedgerStorage> RunningBalanceReporter<S> {
    pub fn new(storage: S, journal: TransactionManager<S>, config: LedgerConfig) -> Self {
        Self {
            storage,
            journal,
            config,
        }
    }

    /// Per-account debit/credit totals for transactions dated in
    /// `[start_date, end_date]`, one row per account ordered by code.
    /// Closing transactions are skipped unless `include_closing` is set.
    pub async fn account_activity(
        &self,
        start_date: Option<NaiveDate>,
        end_date: NaiveDate,
        include_closing: bool,
    ) -> LedgerResult<Vec<AccountActivity>> {
        let accounts = self.storage.list_accounts(None).await?;
        let transactions = self.storage.get_transactions(start_date, Some(end_date)).await?;

        let mut totals: HashMap<&str, (BigDecimal, BigDecimal)> = HashMap::new();
        for txn in &transactions {
            if !include_closing && matches!(txn.kind, TransactionKind::Closing { .. }) {
                continue;
            }
            for entry in &txn.entries {
                let (debit, credit) = totals
                    .entry(entry.account_code.as_str())
                    .or_insert_with(|| (BigDecimal::from(0), BigDecimal::from(0)));
                *debit += &entry.debit;
                *credit += &entry.credit;
            }
        }

        Ok(accounts
            .into_iter()
            .map(|account| {
                let (debit_total, credit_total) = totals
                    .remove(account.code.as_str())
                    .unwrap_or_else(|| (BigDecimal::from(0), BigDecimal::from(0)));
                AccountActivity {
                    account,
                    debit_total,
                    credit_total,
                }
            })
            .collect())
    }

    /// Revenue minus expense over the window, ignoring closing transactions
    pub async fn net_income(&self, start_date: NaiveDate, end_date: NaiveDate) -> LedgerResult<BigDecimal> {
        Ok(self.try_profit_and_loss(start_date, end_date).await?.laba_bersih)
    }

    /// Profit and loss over `[start_date, end_date]`
    pub async fn try_profit_and_loss(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> LedgerResult<ProfitAndLoss> {
        check_window(start_date, end_date)?;
        let activity = self.account_activity(Some(start_date), end_date, false).await?;

        let mut pendapatan = Vec::new();
        let mut hpp = Vec::new();
        let mut beban_operasional = Vec::new();
        let mut pendapatan_lain = Vec::new();
        let mut beban_lain = Vec::new();

        for row in &activity {
            let section = match classify(&row.account, &self.config) {
                Some(section) => section,
                None => continue,
            };
            let line = row.to_line();
            match section {
                PnlSection::Pendapatan => pendapatan.push(line),
                PnlSection::Hpp => hpp.push(line),
                PnlSection::BebanOperasional => beban_operasional.push(line),
                PnlSection::PendapatanLain => pendapatan_lain.push(line),
                PnlSection::BebanLain => beban_lain.push(line),
            }
        }

        Ok(ProfitAndLoss::from_sections(
            start_date,
            end_date,
            pendapatan,
            hpp,
            beban_operasional,
            pendapatan_lain,
            beban_lain,
        ))
    }

    /// Balance sheet as of a date. The current period starts the day after
    /// the last period closed before `as_of_date`.
    pub async fn try_balance_sheet(&self, as_of_date: NaiveDate) -> LedgerResult<BalanceSheet> {
        let period_start = self
            .storage
            .list_closed_periods()
            .await?
            .into_iter()
            .filter(|period| period.end_date < as_of_date)
            .map(|period| period.end_date.succ_opt().unwrap_or(period.end_date))
            .max();
        self.balance_sheet_for_period(period_start, as_of_date).await
    }

    /// Balance sheet at `as_of_date` with income split at `period_start`.
    /// `laba_berjalan` is the period's net income without closing entries and
    /// `laba_ditahan_awal` is every earlier earning, closed or not, so assets
    /// always equal liabilities plus equity.
    pub async fn balance_sheet_for_period(
        &self,
        period_start: Option<NaiveDate>,
        as_of_date: NaiveDate,
    ) -> LedgerResult<BalanceSheet> {
        if let Some(start_date) = period_start {
            check_window(start_date, as_of_date)?;
        }
        let activity = self.account_activity(None, as_of_date, true).await?;
        let current = self.account_activity(period_start, as_of_date, false).await?;
        let retained_earnings_code = self.config.retained_earnings_code.as_str();

        let mut aset = Vec::new();
        let mut kewajiban = Vec::new();
        let mut ekuitas = Vec::new();
        let mut earnings_to_date = BigDecimal::from(0);

        for row in &activity {
            match row.account.account_type {
                AccountType::Asset => aset.push(row.to_line()),
                AccountType::Liability => kewajiban.push(row.to_line()),
                AccountType::Equity if row.account.code == retained_earnings_code => {
                    earnings_to_date += row.normalized_balance();
                }
                AccountType::Equity => ekuitas.push(row.to_line()),
                AccountType::Revenue => earnings_to_date += row.normalized_balance(),
                AccountType::Expense => earnings_to_date -= row.normalized_balance(),
            }
        }

        let mut laba_berjalan = BigDecimal::from(0);
        for row in &current {
            match row.account.account_type {
                AccountType::Revenue => laba_berjalan += row.normalized_balance(),
                AccountType::Expense => laba_berjalan -= row.normalized_balance(),
                _ => {}
            }
        }
        let laba_ditahan_awal = earnings_to_date - &laba_berjalan;

        let total_aset = total(&aset);
        let total_kewajiban = total(&kewajiban);
        let total_ekuitas = total(&ekuitas) + &laba_ditahan_awal + &laba_berjalan;
        let is_balanced = total_aset == &total_kewajiban + &total_ekuitas;

        Ok(BalanceSheet {
            period_start,
            as_of_date,
            aset,
            kewajiban,
            ekuitas,
            total_aset,
            total_kewajiban,
            laba_ditahan_awal,
            laba_berjalan,
            total_ekuitas,
            is_balanced,
        })
    }

    /// P&L for the window and balance sheet at its end, propagating failures.
    /// The balance sheet's `laba_berjalan` equals the P&L's `laba_bersih`.
    pub async fn try_financial_report(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> LedgerResult<FinancialReport> {
        let profit_loss = self.try_profit_and_loss(start_date, end_date).await?;
        let balance_sheet = self
            .balance_sheet_for_period(Some(start_date), end_date)
            .await?;
        Ok(FinancialReport {
            profit_loss,
            balance_sheet,
            warnings: Vec::new(),
        })
    }

    /// Like [`Self::try_financial_report`], but a failure yields a zeroed
    /// report carrying the error as a warning
    pub async fn financial_report(&self, start_date: NaiveDate, end_date: NaiveDate) -> FinancialReport {
        match self.try_financial_report(start_date, end_date).await {
            Ok(report) => report,
            Err(error) => {
                tracing::warn!(%start_date, %end_date, %error, "financial report degraded");
                FinancialReport::degraded(start_date, end_date, error.to_string())
            }
        }
    }

    /// Trial balance as of a date, every account on its debit or credit side
    pub async fn trial_balance(&self, as_of_date: NaiveDate) -> LedgerResult<TrialBalance> {
        let activity = self.account_activity(None, as_of_date, true).await?;
        let zero = BigDecimal::from(0);
        let mut total_debits = BigDecimal::from(0);
        let mut total_credits = BigDecimal::from(0);
        let mut lines = Vec::with_capacity(activity.len());

        for row in activity {
            let raw = row.raw_balance();
            let line = if raw >= zero {
                total_debits += &raw;
                TrialBalanceLine {
                    account: row.account,
                    debit_balance: Some(raw),
                    credit_balance: None,
                }
            } else {
                let credit = -raw;
                total_credits += &credit;
                TrialBalanceLine {
                    account: row.account,
                    debit_balance: None,
                    credit_balance: Some(credit),
                }
            };
            lines.push(line);
        }

        let is_balanced = total_debits == total_credits;
        Ok(TrialBalance {
            as_of_date,
            lines,
            total_debits,
            total_credits,
            is_balanced,
        })
    }

    /// Cross-check the trial balance and the balance-sheet identity
    pub async fn validate_integrity(&self, as_of_date: NaiveDate) -> LedgerResult<LedgerIntegrityReport> {
        let trial_balance = self.trial_balance(as_of_date).await?;
        let balance_sheet = self.try_balance_sheet(as_of_date).await?;

        let mut issues = Vec::new();

        if !trial_balance.is_balanced {
            issues.push(format!(
                "Trial balance is not balanced: debits = {}, credits = {}",
                trial_balance.total_debits, trial_balance.total_credits
            ));
        }

        let total_liabilities_equity = &balance_sheet.total_kewajiban + &balance_sheet.total_ekuitas;

        if !balance_sheet.is_balanced {
            issues.push(format!(
                "Balance sheet is not balanced: assets = {}, liabilities + equity = {}",
                balance_sheet.total_aset, total_liabilities_equity
            ));
        }

        Ok(LedgerIntegrityReport {
            as_of_date,
            is_valid: issues.is_empty(),
            issues,
            trial_balance_total_debits: trial_balance.total_debits,
            trial_balance_total_credits: trial_balance.total_credits,
            balance_sheet_total_assets: balance_sheet.total_aset,
            balance_sheet_total_liabilities_equity: total_liabilities_equity,
        })
    }

    /// Account balance with the account type's normal sign applied, so a
    /// revenue account with credits reports a positive figure
    pub async fn normalized_balance(
        &self,
        account_id: &str,
        as_of_date: Option<NaiveDate>,
    ) -> LedgerResult<BigDecimal> {
        let account = self
            .storage
            .get_account(account_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("account", account_id))?;
        let raw = self.journal.account_balance(&account, as_of_date).await?;
        Ok(account.account_type.normalize(&raw))
    }

    /// Running balance of a cash or bank account (Buku Kas/Bank)
    pub async fn cash_bank_book(
        &self,
        account_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> LedgerResult<RunningBalance> {
        let account = self
            .storage
            .get_account(account_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("account", account_id))?;
        if !account.is_cash_account {
            return Err(LedgerError::validation(
                "account_id",
                format!("account {} is not a cash or bank account", account.code),
            ));
        }
        self.journal.running_balance(&account, start_date, end_date).await
    }
}

fn check_window(start_date: NaiveDate, end_date: NaiveDate) -> LedgerResult<()> {
    if start_date > end_date {
        return Err(LedgerError::InvalidDate(format!(
            "start date {} is after end date {}",
            start_date, end_date
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(code: &str, account_type: AccountType) -> Account {
        Account::new(code.to_string(), code.to_string(), account_type, false)
    }

    #[test]
    fn test_classification_by_prefix() {
        let config = LedgerConfig::default();
        assert_eq!(
            classify(&account("4100", AccountType::Revenue), &config),
            Some(PnlSection::Pendapatan)
        );
        assert_eq!(
            classify(&account("7100", AccountType::Revenue), &config),
            Some(PnlSection::PendapatanLain)
        );
        assert_eq!(
            classify(&account("5100", AccountType::Expense), &config),
            Some(PnlSection::Hpp)
        );
        assert_eq!(
            classify(&account("6200", AccountType::Expense), &config),
            Some(PnlSection::BebanOperasional)
        );
        assert_eq!(
            classify(&account("8100", AccountType::Expense), &config),
            Some(PnlSection::BebanLain)
        );
        assert_eq!(classify(&account("1110", AccountType::Asset), &config), None);
    }

    #[test]
    fn test_profit_and_loss_summary_chain() {
        let line = |code: &str, amount: i64| AccountLine {
            account_code: code.to_string(),
            account_name: code.to_string(),
            account_type: AccountType::Revenue,
            amount: BigDecimal::from(amount),
        };
        let date = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let pnl = ProfitAndLoss::from_sections(
            date,
            date,
            vec![line("4100", 1000)],
            vec![line("5100", 600)],
            vec![line("6100", 150)],
            vec![line("7100", 20)],
            vec![line("8100", 70)],
        );
        assert_eq!(pnl.laba_kotor, BigDecimal::from(400));
        assert_eq!(pnl.laba_usaha, BigDecimal::from(250));
        assert_eq!(pnl.laba_bersih, BigDecimal::from(200));
    }
}
