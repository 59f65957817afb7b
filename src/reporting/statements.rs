//! Report structures

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::*;

/// Debit and credit totals of one account over a window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountActivity {
    pub account: Account,
    pub debit_total: BigDecimal,
    pub credit_total: BigDecimal,
}

impl AccountActivity {
    /// Debit minus credit
    pub fn raw_balance(&self) -> BigDecimal {
        &self.debit_total - &self.credit_total
    }

    /// Balance with the account type's normal sign applied
    pub fn normalized_balance(&self) -> BigDecimal {
        self.account.account_type.normalize(&self.raw_balance())
    }

    pub fn to_line(&self) -> AccountLine {
        AccountLine {
            account_code: self.account.code.clone(),
            account_name: self.account.name.clone(),
            account_type: self.account.account_type,
            amount: self.normalized_balance(),
        }
    }
}

/// Itemized statement line, sign-normalized by account type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountLine {
    pub account_code: String,
    pub account_name: String,
    pub account_type: AccountType,
    pub amount: BigDecimal,
}

pub(crate) fn total(lines: &[AccountLine]) -> BigDecimal {
    lines.iter().map(|line| &line.amount).sum()
}

/// Profit and loss (Laba Rugi) over a date window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfitAndLoss {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub pendapatan: BigDecimal,
    pub hpp: BigDecimal,
    pub laba_kotor: BigDecimal,
    pub beban_operasional: BigDecimal,
    pub laba_usaha: BigDecimal,
    pub pendapatan_lain: BigDecimal,
    pub beban_lain: BigDecimal,
    pub laba_bersih: BigDecimal,
    pub pendapatan_detail: Vec<AccountLine>,
    pub hpp_detail: Vec<AccountLine>,
    pub beban_operasional_detail: Vec<AccountLine>,
    pub pendapatan_lain_detail: Vec<AccountLine>,
    pub beban_lain_detail: Vec<AccountLine>,
}

impl ProfitAndLoss {
    /// Derive the summary figures from the itemized sections
    pub fn from_sections(
        start_date: NaiveDate,
        end_date: NaiveDate,
        pendapatan_detail: Vec<AccountLine>,
        hpp_detail: Vec<AccountLine>,
        beban_operasional_detail: Vec<AccountLine>,
        pendapatan_lain_detail: Vec<AccountLine>,
        beban_lain_detail: Vec<AccountLine>,
    ) -> Self {
        let pendapatan = total(&pendapatan_detail);
        let hpp = total(&hpp_detail);
        let beban_operasional = total(&beban_operasional_detail);
        let pendapatan_lain = total(&pendapatan_lain_detail);
        let beban_lain = total(&beban_lain_detail);

        let laba_kotor = &pendapatan - &hpp;
        let laba_usaha = &laba_kotor - &beban_operasional;
        let laba_bersih = &laba_usaha + &pendapatan_lain - &beban_lain;

        Self {
            start_date,
            end_date,
            pendapatan,
            hpp,
            laba_kotor,
            beban_operasional,
            laba_usaha,
            pendapatan_lain,
            beban_lain,
            laba_bersih,
            pendapatan_detail,
            hpp_detail,
            beban_operasional_detail,
            pendapatan_lain_detail,
            beban_lain_detail,
        }
    }

    pub fn empty(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self::from_sections(
            start_date,
            end_date,
            Vec::new(),
            Vec::new(),
            Vec::new(),
            Vec::new(),
            Vec::new(),
        )
    }
}

/// Balance sheet (Neraca) as of a date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceSheet {
    /// First day of the period whose income is `laba_berjalan`; `None` when
    /// no earlier period was closed
    pub period_start: Option<NaiveDate>,
    pub as_of_date: NaiveDate,
    pub aset: Vec<AccountLine>,
    pub kewajiban: Vec<AccountLine>,
    /// Equity accounts other than retained earnings
    pub ekuitas: Vec<AccountLine>,
    pub total_aset: BigDecimal,
    pub total_kewajiban: BigDecimal,
    /// Earnings accumulated before `period_start`, closed or not
    pub laba_ditahan_awal: BigDecimal,
    /// Net income from `period_start` through `as_of_date`
    pub laba_berjalan: BigDecimal,
    pub total_ekuitas: BigDecimal,
    pub is_balanced: bool,
}

impl BalanceSheet {
    pub fn empty(period_start: Option<NaiveDate>, as_of_date: NaiveDate) -> Self {
        Self {
            period_start,
            as_of_date,
            aset: Vec::new(),
            kewajiban: Vec::new(),
            ekuitas: Vec::new(),
            total_aset: BigDecimal::from(0),
            total_kewajiban: BigDecimal::from(0),
            laba_ditahan_awal: BigDecimal::from(0),
            laba_berjalan: BigDecimal::from(0),
            total_ekuitas: BigDecimal::from(0),
            is_balanced: true,
        }
    }
}

/// P&L over a window plus the balance sheet at its end
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialReport {
    pub profit_loss: ProfitAndLoss,
    pub balance_sheet: BalanceSheet,
    /// Non-empty when the report was degraded to zeros
    pub warnings: Vec<String>,
}

impl FinancialReport {
    pub fn degraded(start_date: NaiveDate, end_date: NaiveDate, warning: String) -> Self {
        Self {
            profit_loss: ProfitAndLoss::empty(start_date, end_date),
            balance_sheet: BalanceSheet::empty(Some(start_date), end_date),
            warnings: vec![warning],
        }
    }

    pub fn is_degraded(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Trial balance - snapshot of all account balances at a point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialBalance {
    pub as_of_date: NaiveDate,
    pub lines: Vec<TrialBalanceLine>,
    pub total_debits: BigDecimal,
    pub total_credits: BigDecimal,
    pub is_balanced: bool,
}

/// Account balance on its debit or credit side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialBalanceLine {
    pub account: Account,
    pub debit_balance: Option<BigDecimal>,
    pub credit_balance: Option<BigDecimal>,
}

/// Report on ledger integrity and validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerIntegrityReport {
    pub as_of_date: NaiveDate,
    pub is_valid: bool,
    pub issues: Vec<String>,
    pub trial_balance_total_debits: BigDecimal,
    pub trial_balance_total_credits: BigDecimal,
    pub balance_sheet_total_assets: BigDecimal,
    pub balance_sheet_total_liabilities_equity: BigDecimal,
}
