use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An immutable ledger entry for one generation call.
///
/// `document_id` is a weak reference: nothing cascades if the document row
/// is removed administratively.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CostRecord {
    pub id: i64,
    pub document_id: Option<i64>,
    pub provider: String,
    pub model: String,
    pub tokens: i64,
    pub cost: f64,
    pub created_at: DateTime<Utc>,
}

/// Input for appending a cost record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordCostInput {
    pub document_id: Option<i64>,
    pub provider: String,
    pub model: String,
    pub tokens: i64,
    pub cost: f64,
}

/// Spend for a single UTC day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyCost {
    /// `YYYY-MM-DD`
    pub date: String,
    pub cost: f64,
    pub tokens: i64,
    pub requests: i64,
}

/// Aggregated spend over the last `period_days` days.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CostSummary {
    pub period_days: u32,
    pub total_cost: f64,
    pub total_tokens: i64,
    pub requests: i64,
    pub avg_cost_per_document: f64,
    /// Newest day first.
    pub daily_breakdown: Vec<DailyCost>,
}

/// How close month-to-date spend is to the configured budget.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BudgetAlert {
    Ok,
    Info,
    Warning,
    Critical,
}

impl BudgetAlert {
    /// Thresholds: 50% info, 80% warning, 90% critical.
    pub fn for_utilization(percent: f64) -> Self {
        if percent >= 90.0 {
            Self::Critical
        } else if percent >= 80.0 {
            Self::Warning
        } else if percent >= 50.0 {
            Self::Info
        } else {
            Self::Ok
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BudgetStatus {
    pub monthly_budget: f64,
    pub month_to_date: f64,
    pub remaining: f64,
    /// Percent of the budget spent, may exceed 100.
    pub utilization: f64,
    pub alert: BudgetAlert,
}

impl BudgetStatus {
    pub fn new(monthly_budget: f64, month_to_date: f64) -> Self {
        let utilization = if monthly_budget > 0.0 {
            month_to_date / monthly_budget * 100.0
        } else {
            100.0
        };
        Self {
            monthly_budget,
            month_to_date,
            remaining: (monthly_budget - month_to_date).max(0.0),
            utilization,
            alert: BudgetAlert::for_utilization(utilization),
        }
    }
}
