use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::dashboard::{DashboardType, TimePeriod};
use crate::domain::deal::NormalizedDeal;
use crate::domain::metrics::DashboardMetrics;
use crate::domain::types::{FinanceManagerId, SalespersonId};

/// Query parameters accepted by the dashboard service.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardQuery {
    pub time_period: TimePeriod,
    /// Keep deals flagged inactive.
    pub include_inactive: bool,
    /// Ignored for salespeople, who only ever see their own deals.
    pub salesperson_id: Option<SalespersonId>,
    pub finance_manager_id: Option<FinanceManagerId>,
    /// Reference date for the time window; today when absent.
    pub as_of: Option<NaiveDate>,
}

impl DashboardQuery {
    pub fn new(time_period: TimePeriod) -> Self {
        Self {
            time_period,
            ..Default::default()
        }
    }
}

/// Envelope returned for every dashboard request, successful or not.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardData {
    pub dashboard_type: DashboardType,
    pub deals: Vec<NormalizedDeal>,
    pub metrics: DashboardMetrics,
    pub processing_time_ms: f64,
    pub last_updated: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub security_validated: bool,
}

impl DashboardData {
    /// Zeroed envelope carrying `error`, stamped with `now`.
    pub fn fallback(
        dashboard_type: DashboardType,
        error: impl Into<String>,
        processing_time_ms: f64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            dashboard_type,
            deals: Vec::new(),
            metrics: DashboardMetrics::zeroed(),
            processing_time_ms,
            last_updated: now,
            error: Some(error.into()),
            security_validated: false,
        }
    }
}
