//! Period closing and reopening

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use std::sync::Arc;

use crate::auth::{Actor, Authorizer, Capability};
use crate::closing::ClosedPeriod;
use crate::ledger::TransactionManager;
use crate::reporting::RunningBalanceReporter;
use crate::traits::*;
use crate::types::*;

/// Closes date ranges into retained earnings and reopens the latest one.
///
/// A period is either open (no record) or closed (a `ClosedPeriod` exists);
/// closed periods chain forward in time and the latest one locks every date
/// up to its end.
#[derive(Clone)]
pub struct PeriodCloser<S: LedgerStorage> {
    storage: S,
    journal: TransactionManager<S>,
    reporter: RunningBalanceReporter<S>,
    authorizer: Arc<dyn Authorizer>,
    retained_earnings_code: String,
}

impl<S: LedgerStorage> PeriodCloser<S> {
    pub fn new(
        storage: S,
        journal: TransactionManager<S>,
        reporter: RunningBalanceReporter<S>,
        authorizer: Arc<dyn Authorizer>,
        retained_earnings_code: String,
    ) -> Self {
        Self {
            storage,
            journal,
            reporter,
            authorizer,
            retained_earnings_code,
        }
    }

    /// All closed periods, oldest first
    pub async fn list_closed_periods(&self) -> LedgerResult<Vec<ClosedPeriod>> {
        self.storage.list_closed_periods().await
    }

    pub async fn latest_closed_period(&self) -> LedgerResult<Option<ClosedPeriod>> {
        self.journal.latest_closed_period().await
    }

    /// Close every unclosed date up to `end_date`: zero each revenue and
    /// expense account into retained earnings and lock the range.
    pub async fn close_book(
        &self,
        actor: &Actor,
        end_date: NaiveDate,
        period_name: &str,
    ) -> LedgerResult<ClosedPeriod> {
        self.authorizer.authorize(actor, Capability::ClosePeriod)?;

        if period_name.trim().is_empty() {
            return Err(LedgerError::validation("period_name", "period name cannot be empty"));
        }
        self.check_after_latest(end_date).await?;

        let _fence = self.journal.gate.raise_fence(end_date)?;
        let guard = self.journal.gate.acquire().await?;

        // another close may have committed while we waited
        let latest = self.check_after_latest(end_date).await?;

        let retained_earnings = self
            .storage
            .get_account_by_code(&self.retained_earnings_code)
            .await?
            .ok_or_else(|| LedgerError::not_found("account", self.retained_earnings_code.clone()))?;
        if retained_earnings.account_type != AccountType::Equity {
            return Err(LedgerError::Config(format!(
                "retained earnings account {} must be an equity account",
                retained_earnings.code
            )));
        }

        let start_date = match &latest {
            Some(previous) => previous.end_date.succ_opt().ok_or_else(|| {
                LedgerError::InvalidDate(format!("no date follows {}", previous.end_date))
            })?,
            None => self
                .storage
                .get_transactions(None, Some(end_date))
                .await?
                .first()
                .map(|txn| txn.date)
                .unwrap_or(end_date),
        };

        let net_income = self.reporter.net_income(start_date, end_date).await?;
        let activity = self
            .reporter
            .account_activity(Some(start_date), end_date, false)
            .await?;

        let period_id = uuid::Uuid::new_v4().to_string();
        let mut closing = Transaction::new(
            end_date,
            format!("Closing entry: {}", period_name.trim()),
            None,
        );
        closing.kind = TransactionKind::Closing {
            period_id: period_id.clone(),
        };

        let zero = BigDecimal::from(0);
        for row in activity.iter().filter(|row| row.account.account_type.is_nominal()) {
            let raw = row.raw_balance();
            if raw > zero {
                closing.add_entry(Entry::credit(row.account.code.clone(), raw, None));
            } else if raw < zero {
                closing.add_entry(Entry::debit(row.account.code.clone(), -raw, None));
            }
        }
        if net_income > zero {
            closing.add_entry(Entry::credit(
                retained_earnings.code.clone(),
                net_income.clone(),
                Some("Laba bersih periode".to_string()),
            ));
        } else if net_income < zero {
            closing.add_entry(Entry::debit(
                retained_earnings.code.clone(),
                -net_income.clone(),
                Some("Rugi bersih periode".to_string()),
            ));
        }

        let mut closing_transaction_ids = Vec::new();
        let mut batch = WriteBatch::new();
        if !closing.entries.is_empty() {
            self.journal.validate(&closing)?;
            closing_transaction_ids.push(closing.id.clone());
            batch = batch.append(closing);
        }

        let period = ClosedPeriod {
            id: period_id,
            name: period_name.trim().to_string(),
            start_date,
            end_date,
            closed_at: chrono::Utc::now().naive_utc(),
            closed_by: actor.user_id.clone(),
            net_income,
            closing_transaction_ids,
        };

        self.journal
            .commit_locked(&guard, batch.put_closed_period(period.clone()))
            .await?;

        tracing::info!(
            period_id = %period.id,
            name = %period.name,
            %start_date,
            %end_date,
            net_income = %period.net_income,
            closed_by = %period.closed_by,
            "period closed"
        );
        Ok(period)
    }

    /// Undo the latest close: remove its closing transactions and its record
    pub async fn reopen_book(&self, actor: &Actor, closed_period_id: &str) -> LedgerResult<ClosedPeriod> {
        self.authorizer.authorize(actor, Capability::ReopenPeriod)?;

        let guard = self.journal.gate.acquire().await?;
        let periods = self.storage.list_closed_periods().await?;
        let period = periods
            .iter()
            .find(|p| p.id == closed_period_id)
            .cloned()
            .ok_or_else(|| LedgerError::not_found("closed period", closed_period_id))?;

        if periods.last().map(|p| p.id.as_str()) != Some(closed_period_id) {
            return Err(LedgerError::InvalidDate(format!(
                "only the most recent closed period can be reopened; {} ends {}",
                period.name, period.end_date
            )));
        }

        let mut batch = WriteBatch::new().drop_closed_period(period.id.clone());
        for transaction_id in &period.closing_transaction_ids {
            batch = batch.remove(transaction_id.clone());
        }
        self.journal.commit_locked(&guard, batch).await?;

        tracing::warn!(
            period_id = %period.id,
            name = %period.name,
            end_date = %period.end_date,
            reopened_by = %actor.user_id,
            "period reopened"
        );
        Ok(period)
    }

    async fn check_after_latest(&self, end_date: NaiveDate) -> LedgerResult<Option<ClosedPeriod>> {
        let latest = self.journal.latest_closed_period().await?;
        if let Some(previous) = &latest {
            if end_date <= previous.end_date {
                return Err(LedgerError::InvalidDate(format!(
                    "end date {} must be after the last closed date {}",
                    end_date, previous.end_date
                )));
            }
        }
        Ok(latest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Role, RoleAuthorizer};
    use crate::config::LedgerConfig;
    use crate::ledger::account::{utils::create_standard_chart, AccountManager};
    use crate::ledger::gate::WriteGate;
    use crate::ledger::JournalLineInput;
    use crate::utils::memory_storage::MemoryStorage;
    use std::time::Duration;

    struct Fixture {
        storage: MemoryStorage,
        journal: TransactionManager<MemoryStorage>,
        reporter: RunningBalanceReporter<MemoryStorage>,
        closer: PeriodCloser<MemoryStorage>,
    }

    async fn fixture() -> Fixture {
        let storage = MemoryStorage::new();
        let gate = WriteGate::new(Duration::from_secs(1));
        let accounts = AccountManager::new(storage.clone(), gate.clone());
        create_standard_chart(&accounts).await.unwrap();

        let journal = TransactionManager::new(storage.clone(), gate, 2);
        let reporter =
            RunningBalanceReporter::new(storage.clone(), journal.clone(), LedgerConfig::default());
        let closer = PeriodCloser::new(
            storage.clone(),
            journal.clone(),
            reporter.clone(),
            Arc::new(RoleAuthorizer),
            "3200".to_string(),
        );
        Fixture {
            storage,
            journal,
            reporter,
            closer,
        }
    }

    fn jan(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn feb(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, d).unwrap()
    }

    fn admin() -> Actor {
        Actor::new("sari", vec![Role::Admin])
    }

    fn line(code: &str, debit: i64, credit: i64) -> JournalLineInput {
        JournalLineInput {
            account_code: code.to_string(),
            debit: BigDecimal::from(debit),
            credit: BigDecimal::from(credit),
        }
    }

    /// Revenue 1,000,000; HPP 500,000; beban operasional 300,000
    async fn post_january(journal: &TransactionManager<MemoryStorage>) {
        journal
            .post_lines(jan(10), "Penjualan".to_string(), vec![line("1130", 1_000_000, 0), line("4100", 0, 1_000_000)])
            .await
            .unwrap();
        journal
            .post_lines(jan(12), "HPP".to_string(), vec![line("5100", 500_000, 0), line("1140", 0, 500_000)])
            .await
            .unwrap();
        journal
            .post_lines(jan(20), "Gaji".to_string(), vec![line("6100", 300_000, 0), line("1110", 0, 300_000)])
            .await
            .unwrap();
    }

    async fn balance(fx: &Fixture, code: &str) -> BigDecimal {
        let account = fx.storage.get_account_by_code(code).await.unwrap().unwrap();
        fx.journal.account_balance(&account, None).await.unwrap()
    }

    #[tokio::test]
    async fn test_close_moves_net_income_into_retained_earnings() {
        let fx = fixture().await;
        post_january(&fx.journal).await;

        let period = fx.closer.close_book(&admin(), jan(31), "Januari 2024").await.unwrap();
        assert_eq!(period.net_income, BigDecimal::from(200_000));
        assert_eq!(period.start_date, jan(10));
        assert_eq!(period.closing_transaction_ids.len(), 1);

        for code in ["4100", "5100", "6100"] {
            assert_eq!(balance(&fx, code).await, BigDecimal::from(0), "account {}", code);
        }
        assert_eq!(balance(&fx, "3200").await, BigDecimal::from(-200_000));

        // January is still the current period on its own closing date
        let sheet = fx.reporter.try_balance_sheet(jan(31)).await.unwrap();
        assert_eq!(sheet.period_start, None);
        assert_eq!(sheet.laba_ditahan_awal, BigDecimal::from(0));
        assert_eq!(sheet.laba_berjalan, BigDecimal::from(200_000));
        assert!(sheet.is_balanced);

        let sheet = fx.reporter.try_balance_sheet(feb(10)).await.unwrap();
        assert_eq!(sheet.period_start, Some(feb(1)));
        assert_eq!(sheet.laba_ditahan_awal, BigDecimal::from(200_000));
        assert_eq!(sheet.laba_berjalan, BigDecimal::from(0));
        assert!(sheet.is_balanced);
    }

    #[tokio::test]
    async fn test_closed_range_rejects_postings() {
        let fx = fixture().await;
        post_january(&fx.journal).await;
        fx.closer.close_book(&admin(), jan(31), "Januari 2024").await.unwrap();

        let result = fx
            .journal
            .post_lines(jan(15), "Terlambat".to_string(), vec![line("6200", 10, 0), line("1110", 0, 10)])
            .await;
        assert!(matches!(result, Err(LedgerError::PeriodLocked { .. })));

        fx.journal
            .post_lines(feb(1), "Sewa".to_string(), vec![line("6200", 10, 0), line("1110", 0, 10)])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_end_date_must_advance() {
        let fx = fixture().await;
        post_january(&fx.journal).await;
        fx.closer.close_book(&admin(), jan(31), "Januari 2024").await.unwrap();

        for end in [jan(31), jan(15)] {
            assert!(matches!(
                fx.closer.close_book(&admin(), end, "Ulang").await,
                Err(LedgerError::InvalidDate(_))
            ));
        }

        let february = fx.closer.close_book(&admin(), feb(29), "Februari 2024").await.unwrap();
        assert_eq!(february.start_date, feb(1));
        assert_eq!(february.net_income, BigDecimal::from(0));
        assert!(february.closing_transaction_ids.is_empty());
    }

    #[tokio::test]
    async fn test_reopen_restores_prior_state() {
        let fx = fixture().await;
        post_january(&fx.journal).await;
        let before = fx.storage.get_transactions(None, None).await.unwrap();

        let period = fx.closer.close_book(&admin(), jan(31), "Januari 2024").await.unwrap();
        let reopened = fx.closer.reopen_book(&admin(), &period.id).await.unwrap();
        assert_eq!(reopened.id, period.id);

        assert_eq!(fx.storage.get_transactions(None, None).await.unwrap(), before);
        assert!(fx.closer.list_closed_periods().await.unwrap().is_empty());
        assert_eq!(balance(&fx, "4100").await, BigDecimal::from(-1_000_000));
        assert_eq!(balance(&fx, "3200").await, BigDecimal::from(0));

        fx.journal
            .post_lines(jan(15), "Koreksi".to_string(), vec![line("6200", 10, 0), line("1110", 0, 10)])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_only_latest_period_reopens() {
        let fx = fixture().await;
        post_january(&fx.journal).await;
        let january = fx.closer.close_book(&admin(), jan(31), "Januari 2024").await.unwrap();
        fx.closer.close_book(&admin(), feb(29), "Februari 2024").await.unwrap();

        assert!(matches!(
            fx.closer.reopen_book(&admin(), &january.id).await,
            Err(LedgerError::InvalidDate(_))
        ));
        assert!(matches!(
            fx.closer.reopen_book(&admin(), "missing").await,
            Err(LedgerError::NotFound { .. })
        ));
        assert_eq!(fx.closer.list_closed_periods().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_accountant_closes_but_cannot_reopen() {
        let fx = fixture().await;
        post_january(&fx.journal).await;
        let accountant = Actor::new("dewi", vec![Role::Accountant]);

        let period = fx.closer.close_book(&accountant, jan(31), "Januari 2024").await.unwrap();
        assert_eq!(period.closed_by, "dewi");
        assert!(matches!(
            fx.closer.reopen_book(&accountant, &period.id).await,
            Err(LedgerError::Unauthorized { .. })
        ));
    }

    #[tokio::test]
    async fn test_failed_commit_leaves_period_open() {
        let fx = fixture().await;
        post_january(&fx.journal).await;

        fx.storage.set_commit_failure(true);
        assert!(matches!(
            fx.closer.close_book(&admin(), jan(31), "Januari 2024").await,
            Err(LedgerError::Storage(_))
        ));
        fx.storage.set_commit_failure(false);

        assert!(fx.closer.latest_closed_period().await.unwrap().is_none());
        assert_eq!(balance(&fx, "4100").await, BigDecimal::from(-1_000_000));
        assert_eq!(fx.storage.get_transactions(None, None).await.unwrap().len(), 3);

        // the fence came down with the failed close
        fx.journal
            .post_lines(jan(15), "Sewa".to_string(), vec![line("6200", 10, 0), line("1110", 0, 10)])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_net_loss_debits_retained_earnings() {
        let fx = fixture().await;
        fx.journal
            .post_lines(jan(5), "Sewa".to_string(), vec![line("6200", 75_000, 0), line("1110", 0, 75_000)])
            .await
            .unwrap();

        let period = fx.closer.close_book(&admin(), jan(31), "Januari 2024").await.unwrap();
        assert_eq!(period.net_income, BigDecimal::from(-75_000));
        assert_eq!(balance(&fx, "3200").await, BigDecimal::from(75_000));
        assert_eq!(balance(&fx, "6200").await, BigDecimal::from(0));
    }
}
