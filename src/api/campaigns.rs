//! Campaign status endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};

use super::{success, ApiResult};
use crate::models::{BulkIdsRequest, Campaign};
use crate::service::ResourceService;

type Campaigns = State<Arc<ResourceService<Campaign>>>;

/// PATCH /api/campaigns/{id}/activate
pub async fn activate_campaign(
    State(service): Campaigns,
    Path(id): Path<i64>,
) -> ApiResult<Campaign> {
    success(service.activate(id).await?)
}

/// PATCH /api/campaigns/{id}/deactivate
pub async fn deactivate_campaign(
    State(service): Campaigns,
    Path(id): Path<i64>,
) -> ApiResult<Campaign> {
    success(service.deactivate(id).await?)
}

/// POST /api/campaigns/bulk/activate
pub async fn bulk_activate_campaigns(
    State(service): Campaigns,
    Json(request): Json<BulkIdsRequest<i64>>,
) -> ApiResult<()> {
    service.bulk_activate(request.ids).await?;
    success(())
}

/// POST /api/campaigns/bulk/deactivate
pub async fn bulk_deactivate_campaigns(
    State(service): Campaigns,
    Json(request): Json<BulkIdsRequest<i64>>,
) -> ApiResult<()> {
    service.bulk_deactivate(request.ids).await?;
    success(())
}
