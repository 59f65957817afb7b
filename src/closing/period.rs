//! Closed accounting periods

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// A locked date range whose revenue and expense were rolled into retained earnings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedPeriod {
    pub id: String,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub closed_at: NaiveDateTime,
    /// User that closed the period
    pub closed_by: String,
    /// Net income rolled into retained earnings
    pub net_income: BigDecimal,
    /// Closing transactions posted for this period
    pub closing_transaction_ids: Vec<String>,
}
