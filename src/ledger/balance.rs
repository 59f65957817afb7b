//! Balance derivation from the journal
//!
//! Nothing stores a running "current balance"; every figure is recomputed
//! from the posted lines.

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::ledger::TransactionManager;
use crate::traits::*;
use crate::types::*;

/// Label of the synthetic first row of a running balance
pub const OPENING_BALANCE_LABEL: &str = "Saldo Awal";

/// One row of a running balance (cash/bank book)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunningBalanceRow {
    pub date: NaiveDate,
    /// `None` on the synthetic opening-balance row
    pub transaction_id: Option<String>,
    pub description: String,
    pub debit: BigDecimal,
    pub credit: BigDecimal,
    pub running_balance: BigDecimal,
}

/// Chronological movements of one account over a window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunningBalance {
    pub account_code: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub opening_balance: BigDecimal,
    pub closing_balance: BigDecimal,
    /// Opening-balance row first, then one row per journal line
    pub rows: Vec<RunningBalanceRow>,
}

/// Sum of debit minus credit over an account's lines in the given transactions
pub fn net_movement<'a, I>(transactions: I, account_code: &str) -> BigDecimal
where
    I: IntoIterator<Item = &'a Transaction>,
{
    transactions
        .into_iter()
        .flat_map(|txn| txn.entries.iter())
        .filter(|entry| entry.account_code == account_code)
        .map(|entry| entry.signed_amount())
        .sum()
}

impl<S: LedgerStorage> TransactionManager<S> {
    /// Debit minus credit over the account's lines dated on or before `as_of`
    /// (all time when `None`)
    pub async fn account_balance(
        &self,
        account: &Account,
        as_of: Option<NaiveDate>,
    ) -> LedgerResult<BigDecimal> {
        let transactions = self
            .storage
            .get_account_transactions(&account.code, None, as_of)
            .await?;
        Ok(net_movement(&transactions, &account.code))
    }

    /// Rows in `[start_date, end_date]`, seeded with the balance before `start_date`
    pub async fn running_balance(
        &self,
        account: &Account,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> LedgerResult<RunningBalance> {
        if start_date > end_date {
            return Err(LedgerError::InvalidDate(format!(
                "start date {} is after end date {}",
                start_date, end_date
            )));
        }

        // one read, so opening balance and rows come from the same snapshot
        let transactions = self
            .storage
            .get_account_transactions(&account.code, None, Some(end_date))
            .await?;
        let (before, within): (Vec<&Transaction>, Vec<&Transaction>) =
            transactions.iter().partition(|txn| txn.date < start_date);

        let opening_balance = net_movement(before, &account.code);
        let mut running_balance = opening_balance.clone();
        let mut rows = vec![RunningBalanceRow {
            date: start_date,
            transaction_id: None,
            description: OPENING_BALANCE_LABEL.to_string(),
            debit: BigDecimal::from(0),
            credit: BigDecimal::from(0),
            running_balance: opening_balance.clone(),
        }];

        for txn in within {
            for entry in txn.entries.iter().filter(|e| e.account_code == account.code) {
                running_balance += entry.signed_amount();
                rows.push(RunningBalanceRow {
                    date: txn.date,
                    transaction_id: Some(txn.id.clone()),
                    description: entry
                        .memo
                        .clone()
                        .unwrap_or_else(|| txn.description.clone()),
                    debit: entry.debit.clone(),
                    credit: entry.credit.clone(),
                    running_balance: running_balance.clone(),
                });
            }
        }

        Ok(RunningBalance {
            account_code: account.code.clone(),
            start_date,
            end_date,
            opening_balance,
            closing_balance: running_balance,
            rows,
        })
    }
}
