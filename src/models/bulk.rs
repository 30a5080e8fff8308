//! Request bodies for bulk operations.

use serde::{Deserialize, Serialize};

/// Ids targeted by a bulk status change or bulk delete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkIdsRequest<I> {
    pub ids: Vec<I>,
}

/// Ids plus the partial record applied to each of them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkUpdateRequest<I, P> {
    pub ids: Vec<I>,
    pub data: P,
}
