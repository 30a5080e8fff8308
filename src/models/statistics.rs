//! Dashboard statistics shapes.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Revenue booked in one calendar month.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyRevenue {
    /// First day of the month
    pub month: NaiveDate,
    pub revenue: f64,
    pub service_count: u32,
}

/// Headline numbers for the admin dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardOverview {
    pub total_users: usize,
    pub active_users: usize,
    pub users_by_role: BTreeMap<String, usize>,
    pub total_campaigns: usize,
    pub active_campaigns: usize,
    pub total_roles: usize,
    pub total_revenue: f64,
    pub current_month_revenue: f64,
    pub generated_at: DateTime<Utc>,
}

/// Query parameters for the revenue series.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<NaiveDate>,
}
