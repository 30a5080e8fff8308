use super::{success, ApiResult};
use crate::models::PERMISSIONS;

/// GET /api/roles/permissions - Permissions a role can grant.
pub async fn list_permissions() -> ApiResult<&'static [&'static str]> {
    success(PERMISSIONS)
}
