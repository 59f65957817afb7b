//! Work-order cost roll-up (material + overhead + labor = COGM)

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::costing::work_order::*;
use crate::ledger::{JournalLineInput, TransactionManager};
use crate::traits::*;
use crate::types::*;
use crate::utils::validation::validate_non_negative_amount;

/// Cost position of a work order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostSummary {
    pub work_order_id: String,
    pub status: WorkOrderStatus,
    pub is_final: bool,
    pub standard_cost: BigDecimal,
    pub material_cost: BigDecimal,
    pub overhead_cost: BigDecimal,
    pub labor_cost: BigDecimal,
    pub actual_cogm: BigDecimal,
    /// Actual COGM minus standard cost; zero when there is no standard cost
    pub variance: BigDecimal,
}

/// Owns work-order cost records and derives COGM from the journal
#[derive(Clone)]
pub struct CostRollupEngine<S: LedgerStorage> {
    storage: S,
    journal: TransactionManager<S>,
    minor_unit_scale: u32,
}

impl<S: LedgerStorage> CostRollupEngine<S> {
    pub fn new(storage: S, journal: TransactionManager<S>, minor_unit_scale: u32) -> Self {
        Self {
            storage,
            journal,
            minor_unit_scale,
        }
    }

    /// Register a work order in Draft with an empty cost record
    pub async fn create_work_order(
        &self,
        number: String,
        items: Vec<WorkOrderItem>,
    ) -> LedgerResult<WorkOrder> {
        if number.trim().is_empty() {
            return Err(LedgerError::validation("number", "work order number cannot be empty"));
        }
        for (index, item) in items.iter().enumerate() {
            if item.quantity <= BigDecimal::from(0) {
                return Err(LedgerError::validation(
                    format!("items[{}].quantity", index),
                    "quantity must be positive",
                ));
            }
            if item.bom_total_cost < BigDecimal::from(0) {
                return Err(LedgerError::validation(
                    format!("items[{}].bom_total_cost", index),
                    "BOM cost cannot be negative",
                ));
            }
        }

        let work_order = WorkOrder::new(number, items);
        let cost = WorkOrderCost::new(work_order.id.clone());

        let guard = self.journal.gate.acquire().await?;
        self.journal
            .commit_locked(
                &guard,
                WriteBatch::new()
                    .put_work_order(work_order.clone())
                    .put_work_order_cost(cost),
            )
            .await?;

        tracing::info!(work_order_id = %work_order.id, number = %work_order.number, "work order created");
        Ok(work_order)
    }

    pub async fn get_work_order(&self, work_order_id: &str) -> LedgerResult<WorkOrder> {
        self.storage
            .get_work_order(work_order_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("work order", work_order_id))
    }

    async fn cost_record(&self, work_order_id: &str) -> LedgerResult<WorkOrderCost> {
        Ok(self
            .storage
            .get_work_order_cost(work_order_id)
            .await?
            .unwrap_or_else(|| WorkOrderCost::new(work_order_id.to_string())))
    }

    /// Advance a work order one step. Shipping goes through [`Self::finalize`].
    pub async fn transition_status(
        &self,
        work_order_id: &str,
        target: WorkOrderStatus,
    ) -> LedgerResult<WorkOrder> {
        if target.is_terminal() {
            self.finalize(work_order_id).await?;
            return self.get_work_order(work_order_id).await;
        }

        let guard = self.journal.gate.acquire().await?;
        let mut work_order = self.get_work_order(work_order_id).await?;
        let from = work_order.status;
        work_order.transition_to(target)?;

        self.journal
            .commit_locked(&guard, WriteBatch::new().put_work_order(work_order.clone()))
            .await?;
        tracing::info!(%work_order_id, %from, to = %target, "work order status changed");
        Ok(work_order)
    }

    /// Post a material issue and link it to the work order in one commit
    pub async fn issue_material(
        &self,
        work_order_id: &str,
        date: NaiveDate,
        description: String,
        lines: Vec<JournalLineInput>,
    ) -> LedgerResult<String> {
        let mut transaction = Transaction::new(date, description, None);
        transaction.kind = TransactionKind::MaterialIssue {
            work_order_id: work_order_id.to_string(),
        };
        transaction.entries = lines.into_iter().map(Entry::from).collect();

        self.journal.validate(&transaction)?;
        self.journal.gate.check_fence(date)?;

        let guard = self.journal.gate.acquire().await?;
        let mut work_order = self.get_work_order(work_order_id).await?;
        self.journal.check_postable(&guard, &transaction).await?;

        let transaction_id = transaction.id.clone();
        work_order.material_issue_ids.push(transaction_id.clone());
        work_order.updated_at = chrono::Utc::now().naive_utc();

        self.journal
            .commit_locked(
                &guard,
                WriteBatch::new()
                    .append(transaction)
                    .put_work_order(work_order),
            )
            .await?;

        tracing::info!(%work_order_id, %transaction_id, "material issued");
        Ok(transaction_id)
    }

    /// Set the ongoing overhead and labor figures. Fails once finalized.
    pub async fn update_cost(
        &self,
        work_order_id: &str,
        overhead_cost: BigDecimal,
        labor_cost: BigDecimal,
    ) -> LedgerResult<WorkOrderCost> {
        validate_non_negative_amount("overhead_cost", &overhead_cost, self.minor_unit_scale)?;
        validate_non_negative_amount("labor_cost", &labor_cost, self.minor_unit_scale)?;

        let guard = self.journal.gate.acquire().await?;
        self.get_work_order(work_order_id).await?;
        let mut cost = self.cost_record(work_order_id).await?;
        cost.update(overhead_cost, labor_cost)?;

        self.journal
            .commit_locked(&guard, WriteBatch::new().put_work_order_cost(cost.clone()))
            .await?;
        tracing::info!(%work_order_id, overhead = %cost.overhead_cost, labor = %cost.labor_cost, "work order cost updated");
        Ok(cost)
    }

    /// Ship the work order (QC -> Terkirim) and freeze its costs, atomically
    pub async fn finalize(&self, work_order_id: &str) -> LedgerResult<WorkOrderCost> {
        let guard = self.journal.gate.acquire().await?;
        let mut work_order = self.get_work_order(work_order_id).await?;
        let mut cost = self.cost_record(work_order_id).await?;

        if cost.is_final() {
            return Err(LedgerError::AlreadyFinalized(work_order_id.to_string()));
        }
        work_order.transition_to(WorkOrderStatus::Terkirim)?;

        let material_cost = self.ongoing_material_cost(&work_order).await?;
        cost.finalize(material_cost)?;

        self.journal
            .commit_locked(
                &guard,
                WriteBatch::new()
                    .put_work_order(work_order)
                    .put_work_order_cost(cost.clone()),
            )
            .await?;

        if let Some(snapshot) = cost.snapshot() {
            tracing::info!(%work_order_id, cogm = %snapshot.total(), "work order cost finalized");
        }
        Ok(cost)
    }

    /// Σ debit over the lines of linked material issues that were not reversed
    pub async fn ongoing_material_cost(&self, work_order: &WorkOrder) -> LedgerResult<BigDecimal> {
        let mut total = BigDecimal::from(0);
        if work_order.material_issue_ids.is_empty() {
            return Ok(total);
        }

        let reversed: HashSet<String> = self
            .storage
            .get_transactions(None, None)
            .await?
            .into_iter()
            .filter_map(|txn| match txn.kind {
                TransactionKind::Reversal { original_id } => Some(original_id),
                _ => None,
            })
            .collect();

        for transaction_id in &work_order.material_issue_ids {
            if reversed.contains(transaction_id) {
                continue;
            }
            if let Some(txn) = self.storage.get_transaction(transaction_id).await? {
                total += txn.total_debits();
            }
        }
        Ok(total)
    }

    /// Standard cost, actual COGM, and variance. Final work orders report
    /// their frozen snapshot regardless of later postings.
    pub async fn cost_summary(&self, work_order_id: &str) -> LedgerResult<CostSummary> {
        let work_order = self.get_work_order(work_order_id).await?;
        let cost = self.cost_record(work_order_id).await?;
        let standard_cost = work_order.standard_cost();

        let (material_cost, overhead_cost, labor_cost) = match cost.snapshot() {
            Some(snapshot) => (
                snapshot.material_cost.clone(),
                snapshot.overhead_cost.clone(),
                snapshot.labor_cost.clone(),
            ),
            None => (
                self.ongoing_material_cost(&work_order).await?,
                cost.overhead_cost.clone(),
                cost.labor_cost.clone(),
            ),
        };

        let actual_cogm = &material_cost + &overhead_cost + &labor_cost;
        let variance = if standard_cost > BigDecimal::from(0) {
            &actual_cogm - &standard_cost
        } else {
            BigDecimal::from(0)
        };

        Ok(CostSummary {
            work_order_id: work_order.id,
            status: work_order.status,
            is_final: cost.is_final(),
            standard_cost,
            material_cost,
            overhead_cost,
            labor_cost,
            actual_cogm,
            variance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::account::{utils::create_standard_chart, AccountManager};
    use crate::ledger::gate::WriteGate;
    use crate::utils::memory_storage::MemoryStorage;
    use std::time::Duration;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, d).unwrap()
    }

    fn issue_lines(amount: i64) -> Vec<JournalLineInput> {
        vec![
            JournalLineInput {
                account_code: "1150".to_string(),
                debit: BigDecimal::from(amount),
                credit: BigDecimal::from(0),
            },
            JournalLineInput {
                account_code: "1140".to_string(),
                debit: BigDecimal::from(0),
                credit: BigDecimal::from(amount),
            },
        ]
    }

    async fn engine() -> CostRollupEngine<MemoryStorage> {
        let storage = MemoryStorage::new();
        let gate = WriteGate::new(Duration::from_secs(1));
        create_standard_chart(&AccountManager::new(storage.clone(), gate.clone()))
            .await
            .unwrap();
        let journal = TransactionManager::new(storage.clone(), gate, 2);
        CostRollupEngine::new(storage, journal, 2)
    }

    async fn order_in_qc(engine: &CostRollupEngine<MemoryStorage>) -> WorkOrder {
        let wo = engine
            .create_work_order(
                "WO-100".to_string(),
                vec![WorkOrderItem::new(
                    "Lemari".to_string(),
                    BigDecimal::from(500),
                    BigDecimal::from(2),
                )],
            )
            .await
            .unwrap();
        for status in [
            WorkOrderStatus::PendingInventory,
            WorkOrderStatus::TungguAntrian,
            WorkOrderStatus::Proses,
            WorkOrderStatus::Qc,
        ] {
            engine.transition_status(&wo.id, status).await.unwrap();
        }
        wo
    }

    #[tokio::test]
    async fn test_cogm_and_variance_from_ongoing_figures() {
        let engine = engine().await;
        let wo = order_in_qc(&engine).await;

        engine
            .issue_material(&wo.id, day(1), "Issue kayu".to_string(), issue_lines(600))
            .await
            .unwrap();
        engine
            .issue_material(&wo.id, day(2), "Issue engsel".to_string(), issue_lines(150))
            .await
            .unwrap();
        engine
            .update_cost(&wo.id, BigDecimal::from(200), BigDecimal::from(300))
            .await
            .unwrap();

        let summary = engine.cost_summary(&wo.id).await.unwrap();
        assert_eq!(summary.standard_cost, BigDecimal::from(1000));
        assert_eq!(summary.material_cost, BigDecimal::from(750));
        assert_eq!(summary.actual_cogm, BigDecimal::from(1250));
        assert_eq!(summary.variance, BigDecimal::from(250));
        assert!(!summary.is_final);
    }

    #[tokio::test]
    async fn test_finalized_cogm_ignores_later_postings() {
        let engine = engine().await;
        let wo = order_in_qc(&engine).await;
        engine
            .issue_material(&wo.id, day(1), "Issue".to_string(), issue_lines(400))
            .await
            .unwrap();
        engine
            .update_cost(&wo.id, BigDecimal::from(50), BigDecimal::from(50))
            .await
            .unwrap();

        engine.finalize(&wo.id).await.unwrap();
        engine
            .issue_material(&wo.id, day(3), "Late issue".to_string(), issue_lines(999))
            .await
            .unwrap();

        let summary = engine.cost_summary(&wo.id).await.unwrap();
        assert!(summary.is_final);
        assert_eq!(summary.status, WorkOrderStatus::Terkirim);
        assert_eq!(summary.actual_cogm, BigDecimal::from(500));

        assert!(matches!(
            engine
                .update_cost(&wo.id, BigDecimal::from(1), BigDecimal::from(1))
                .await,
            Err(LedgerError::AlreadyFinalized(_))
        ));
        assert!(matches!(
            engine.finalize(&wo.id).await,
            Err(LedgerError::AlreadyFinalized(_))
        ));
    }

    #[tokio::test]
    async fn test_finalize_requires_qc() {
        let engine = engine().await;
        let wo = engine
            .create_work_order("WO-101".to_string(), Vec::new())
            .await
            .unwrap();

        assert!(matches!(
            engine.finalize(&wo.id).await,
            Err(LedgerError::InvalidTransition { .. })
        ));
        let summary = engine.cost_summary(&wo.id).await.unwrap();
        assert!(!summary.is_final);
        assert_eq!(summary.variance, BigDecimal::from(0));
    }

    #[tokio::test]
    async fn test_negative_cost_rejected() {
        let engine = engine().await;
        let wo = engine
            .create_work_order("WO-102".to_string(), Vec::new())
            .await
            .unwrap();
        assert!(matches!(
            engine
                .update_cost(&wo.id, BigDecimal::from(-1), BigDecimal::from(0))
                .await,
            Err(LedgerError::Validation { ref field, .. }) if field == "overhead_cost"
        ));
        assert!(matches!(
            engine
                .update_cost("missing", BigDecimal::from(1), BigDecimal::from(0))
                .await,
            Err(LedgerError::NotFound { .. })
        ));
    }
}
