//! Work orders, their status pipeline, and per-order cost records

use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::*;

/// Production status pipeline. Work orders only ever move one step forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkOrderStatus {
    #[serde(rename = "Draft")]
    Draft,
    #[serde(rename = "Pending Inventory")]
    PendingInventory,
    #[serde(rename = "Tunggu Antrian")]
    TungguAntrian,
    #[serde(rename = "Proses")]
    Proses,
    #[serde(rename = "QC")]
    Qc,
    #[serde(rename = "Terkirim")]
    Terkirim,
}

impl WorkOrderStatus {
    /// The status that follows this one, if any
    pub fn next(&self) -> Option<WorkOrderStatus> {
        match self {
            WorkOrderStatus::Draft => Some(WorkOrderStatus::PendingInventory),
            WorkOrderStatus::PendingInventory => Some(WorkOrderStatus::TungguAntrian),
            WorkOrderStatus::TungguAntrian => Some(WorkOrderStatus::Proses),
            WorkOrderStatus::Proses => Some(WorkOrderStatus::Qc),
            WorkOrderStatus::Qc => Some(WorkOrderStatus::Terkirim),
            WorkOrderStatus::Terkirim => None,
        }
    }

    /// Shipped orders are terminal
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkOrderStatus::Terkirim)
    }

    pub fn can_transition_to(&self, target: WorkOrderStatus) -> bool {
        self.next() == Some(target)
    }
}

impl fmt::Display for WorkOrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            WorkOrderStatus::Draft => "Draft",
            WorkOrderStatus::PendingInventory => "Pending Inventory",
            WorkOrderStatus::TungguAntrian => "Tunggu Antrian",
            WorkOrderStatus::Proses => "Proses",
            WorkOrderStatus::Qc => "QC",
            WorkOrderStatus::Terkirim => "Terkirim",
        };
        f.write_str(label)
    }
}

/// A product line on a work order, costed from its BOM
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkOrderItem {
    pub product_name: String,
    /// Rolled-up BOM unit cost, supplied by the BOM module
    pub bom_total_cost: BigDecimal,
    pub quantity: BigDecimal,
}

impl WorkOrderItem {
    pub fn new(product_name: String, bom_total_cost: BigDecimal, quantity: BigDecimal) -> Self {
        Self {
            product_name,
            bom_total_cost,
            quantity,
        }
    }

    pub fn standard_cost(&self) -> BigDecimal {
        &self.bom_total_cost * &self.quantity
    }
}

/// A manufacturing job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkOrder {
    pub id: String,
    /// Human-facing work order number
    pub number: String,
    pub status: WorkOrderStatus,
    pub items: Vec<WorkOrderItem>,
    /// Material issue transactions charged to this order
    pub material_issue_ids: Vec<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl WorkOrder {
    pub fn new(number: String, items: Vec<WorkOrderItem>) -> Self {
        let now = chrono::Utc::now().naive_utc();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            number,
            status: WorkOrderStatus::Draft,
            items,
            material_issue_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Sum of BOM unit cost times quantity over all items
    pub fn standard_cost(&self) -> BigDecimal {
        self.items.iter().map(|item| item.standard_cost()).sum()
    }

    /// Move to the next status, rejecting skips and reversals
    pub fn transition_to(&mut self, target: WorkOrderStatus) -> LedgerResult<()> {
        if !self.status.can_transition_to(target) {
            return Err(LedgerError::InvalidTransition {
                from: self.status.to_string(),
                to: target.to_string(),
            });
        }
        self.status = target;
        self.updated_at = chrono::Utc::now().naive_utc();
        Ok(())
    }
}

/// Frozen cost figures captured at finalization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostSnapshot {
    pub material_cost: BigDecimal,
    pub overhead_cost: BigDecimal,
    pub labor_cost: BigDecimal,
    pub finalized_at: NaiveDateTime,
}

impl CostSnapshot {
    pub fn total(&self) -> BigDecimal {
        &self.material_cost + &self.overhead_cost + &self.labor_cost
    }
}

/// Draft costs are editable; final costs are frozen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CostState {
    Draft,
    Final(CostSnapshot),
}

/// Manually entered overhead and labor for a work order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkOrderCost {
    pub work_order_id: String,
    pub overhead_cost: BigDecimal,
    pub labor_cost: BigDecimal,
    pub state: CostState,
    pub updated_at: NaiveDateTime,
}

impl WorkOrderCost {
    pub fn new(work_order_id: String) -> Self {
        Self {
            work_order_id,
            overhead_cost: BigDecimal::from(0),
            labor_cost: BigDecimal::from(0),
            state: CostState::Draft,
            updated_at: chrono::Utc::now().naive_utc(),
        }
    }

    pub fn is_final(&self) -> bool {
        matches!(self.state, CostState::Final(_))
    }

    pub fn snapshot(&self) -> Option<&CostSnapshot> {
        match &self.state {
            CostState::Final(snapshot) => Some(snapshot),
            CostState::Draft => None,
        }
    }

    /// Replace the ongoing overhead and labor figures
    pub fn update(&mut self, overhead_cost: BigDecimal, labor_cost: BigDecimal) -> LedgerResult<()> {
        if self.is_final() {
            return Err(LedgerError::AlreadyFinalized(self.work_order_id.clone()));
        }
        self.overhead_cost = overhead_cost;
        self.labor_cost = labor_cost;
        self.updated_at = chrono::Utc::now().naive_utc();
        Ok(())
    }

    /// Draft -> Final, freezing the ongoing figures together with the given material cost
    pub fn finalize(&mut self, material_cost: BigDecimal) -> LedgerResult<()> {
        if self.is_final() {
            return Err(LedgerError::AlreadyFinalized(self.work_order_id.clone()));
        }
        let now = chrono::Utc::now().naive_utc();
        self.state = CostState::Final(CostSnapshot {
            material_cost,
            overhead_cost: self.overhead_cost.clone(),
            labor_cost: self.labor_cost.clone(),
            finalized_at: now,
        });
        self.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_moves_forward_one_step() {
        let mut wo = WorkOrder::new("WO-001".to_string(), Vec::new());
        assert!(wo.transition_to(WorkOrderStatus::PendingInventory).is_ok());
        assert!(matches!(
            wo.transition_to(WorkOrderStatus::Proses),
            Err(LedgerError::InvalidTransition { .. })
        ));
        assert!(wo.transition_to(WorkOrderStatus::Draft).is_err());
        assert_eq!(wo.status, WorkOrderStatus::PendingInventory);
        assert!(WorkOrderStatus::Terkirim.next().is_none());
    }

    #[test]
    fn test_standard_cost_sums_items() {
        let wo = WorkOrder::new(
            "WO-002".to_string(),
            vec![
                WorkOrderItem::new("Rak".to_string(), BigDecimal::from(150), BigDecimal::from(4)),
                WorkOrderItem::new("Meja".to_string(), BigDecimal::from(300), BigDecimal::from(2)),
            ],
        );
        assert_eq!(wo.standard_cost(), BigDecimal::from(1200));
    }

    #[test]
    fn test_cost_freezes_after_finalize() {
        let mut cost = WorkOrderCost::new("wo".to_string());
        cost.update(BigDecimal::from(100), BigDecimal::from(50)).unwrap();
        cost.finalize(BigDecimal::from(700)).unwrap();

        assert!(cost.is_final());
        assert_eq!(cost.snapshot().unwrap().total(), BigDecimal::from(850));
        assert!(matches!(
            cost.update(BigDecimal::from(1), BigDecimal::from(1)),
            Err(LedgerError::AlreadyFinalized(_))
        ));
        assert!(matches!(
            cost.finalize(BigDecimal::from(1)),
            Err(LedgerError::AlreadyFinalized(_))
        ));
    }

    #[test]
    fn test_status_serializes_with_display_names() {
        let json = serde_json::to_string(&WorkOrderStatus::TungguAntrian).unwrap();
        assert_eq!(json, "\"Tunggu Antrian\"");
    }
}
