//! Handlers shared by every resource.
//!
//! Each handler is generic over the resource and is registered once per
//! resource in the router, e.g. `get(api::list::<Role>)`.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};

use super::{success, ApiResult};
use crate::errors::AppError;
use crate::models::{BulkIdsRequest, BulkUpdateRequest, PageResult};
use crate::service::{ExportQuery, Resource, ResourceService};

/// GET /api/{resource} - Filtered, paginated list.
pub async fn list<R: Resource>(
    State(service): State<Arc<ResourceService<R>>>,
    Query(filter): Query<R::Filter>,
) -> ApiResult<PageResult<R>> {
    success(service.list(filter).await?)
}

/// GET /api/{resource}/{id}
pub async fn get<R: Resource>(
    State(service): State<Arc<ResourceService<R>>>,
    Path(id): Path<R::Id>,
) -> ApiResult<R> {
    success(service.get(id).await?)
}

/// POST /api/{resource}
pub async fn create<R: Resource>(
    State(service): State<Arc<ResourceService<R>>>,
    Json(request): Json<R::Create>,
) -> ApiResult<R> {
    success(service.create(request).await?)
}

/// PUT /api/{resource}/{id} - Partial update.
pub async fn update<R: Resource>(
    State(service): State<Arc<ResourceService<R>>>,
    Path(id): Path<R::Id>,
    Json(request): Json<R::Patch>,
) -> ApiResult<R> {
    success(service.update(id, request).await?)
}

/// DELETE /api/{resource}/{id}
pub async fn delete<R: Resource>(
    State(service): State<Arc<ResourceService<R>>>,
    Path(id): Path<R::Id>,
) -> ApiResult<()> {
    service.delete(id).await?;
    success(())
}

/// POST /api/{resource}/bulk/update
pub async fn bulk_update<R: Resource>(
    State(service): State<Arc<ResourceService<R>>>,
    Json(request): Json<BulkUpdateRequest<R::Id, R::Patch>>,
) -> ApiResult<()> {
    service.bulk_update(request.ids, request.data).await?;
    success(())
}

/// POST /api/{resource}/bulk/delete
pub async fn bulk_delete<R: Resource>(
    State(service): State<Arc<ResourceService<R>>>,
    Json(request): Json<BulkIdsRequest<R::Id>>,
) -> ApiResult<()> {
    service.bulk_delete(request.ids).await?;
    success(())
}

/// GET /api/{resource}/export?format=csv|json - Raw file download.
pub async fn export<R: Resource>(
    State(service): State<Arc<ResourceService<R>>>,
    Query(filter): Query<R::Filter>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, AppError> {
    let export = service.export(filter, query.format).await?;

    let headers = [
        (header::CONTENT_TYPE, export.content_type),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", export.file_name),
        ),
    ];
    Ok((headers, export.bytes).into_response())
}

/// DELETE /api/{resource}/cache - Drop the local fallback dataset.
pub async fn clear_cache<R: Resource>(
    State(service): State<Arc<ResourceService<R>>>,
) -> ApiResult<()> {
    service.clear_cache().await?;
    tracing::info!("Cleared fallback store for {}", R::NAME);
    success(())
}
