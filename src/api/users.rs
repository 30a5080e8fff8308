//! User status endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};

use super::{success, ApiResult};
use crate::models::{BulkIdsRequest, SetUserStatusRequest, User};
use crate::service::ResourceService;

type Users = State<Arc<ResourceService<User>>>;

/// PATCH /api/users/{id}/status
pub async fn set_user_status(
    State(service): Users,
    Path(id): Path<String>,
    Json(request): Json<SetUserStatusRequest>,
) -> ApiResult<User> {
    success(service.set_status(id, request.status).await?)
}

/// POST /api/users/bulk/activate
pub async fn bulk_activate_users(
    State(service): Users,
    Json(request): Json<BulkIdsRequest<String>>,
) -> ApiResult<()> {
    service.bulk_activate(request.ids).await?;
    success(())
}

/// POST /api/users/bulk/deactivate
pub async fn bulk_deactivate_users(
    State(service): Users,
    Json(request): Json<BulkIdsRequest<String>>,
) -> ApiResult<()> {
    service.bulk_deactivate(request.ids).await?;
    success(())
}
