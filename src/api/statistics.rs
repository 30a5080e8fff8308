//! Dashboard statistics endpoints.

use std::sync::Arc;

use axum::extract::{Query, State};

use super::{success, ApiResult};
use crate::models::{DashboardOverview, MonthlyRevenue, RevenueQuery};
use crate::service::StatisticsService;

/// GET /api/statistics/overview
pub async fn get_overview(
    State(service): State<Arc<StatisticsService>>,
) -> ApiResult<DashboardOverview> {
    success(service.overview().await?)
}

/// GET /api/statistics/revenue?from=&to=
pub async fn get_revenue(
    State(service): State<Arc<StatisticsService>>,
    Query(query): Query<RevenueQuery>,
) -> ApiResult<Vec<MonthlyRevenue>> {
    success(service.revenue(query).await?)
}
