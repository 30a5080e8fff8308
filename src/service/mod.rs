//! Resilient resource services.
//!
//! [`ResourceService`] is one generic engine instantiated per resource. Every
//! operation first tries the remote API; operations with a local fallback
//! replay the same semantics against the resource's [`FallbackStore`] when
//! the remote call fails. Bulk operations are remote-only.

mod export;
mod query;
mod statistics;

pub use export::*;
pub use query::*;
pub use statistics::*;

use std::fmt::Display;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::config::Persistence;
use crate::errors::AppError;
use crate::models::{BulkIdsRequest, BulkUpdateRequest, PageResult};
use crate::remote::{RemoteClient, NO_QUERY};
use crate::store::{FallbackStore, KeyValueStore, Seeded};

/// Fields a partial update never overwrites.
const PROTECTED_FIELDS: &[&str] = &["id", "createdAt", "updatedAt"];

/// Identifier type of a resource.
pub trait RecordId:
    Clone + PartialEq + Display + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Identifier for a record created locally.
    fn next<'a, I>(existing: I) -> Result<Self, AppError>
    where
        I: Iterator<Item = &'a Self>,
        Self: 'a;
}

impl RecordId for i64 {
    fn next<'a, I>(existing: I) -> Result<Self, AppError>
    where
        I: Iterator<Item = &'a Self>,
    {
        existing
            .copied()
            .max()
            .unwrap_or(0)
            .checked_add(1)
            .ok_or_else(|| AppError::Internal("Local id space exhausted".to_string()))
    }
}

impl RecordId for String {
    /// Time-ordered, so locally created ids sort by creation time.
    fn next<'a, I>(_existing: I) -> Result<Self, AppError>
    where
        I: Iterator<Item = &'a Self>,
    {
        Ok(uuid::Uuid::now_v7().to_string())
    }
}

/// Predicates of a resource's list filter.
pub trait RecordFilter<R>:
    Clone + Default + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Free-text search term.
    fn search(&self) -> Option<&str>;

    /// Inclusive bounds on the resource's filter timestamp.
    fn date_range(&self) -> (Option<NaiveDate>, Option<NaiveDate>);

    /// Requested `(page, limit)`.
    fn pagination(&self) -> (Option<u32>, Option<u32>);

    /// Equality predicates over enumerated fields.
    fn matches(&self, record: &R) -> bool;
}

/// Binding of one remote resource to the generic engine.
pub trait Resource: Seeded {
    type Id: RecordId;
    type Create: Serialize + DeserializeOwned + Send + Sync + 'static;
    type Patch: Serialize + DeserializeOwned + Send + Sync + 'static;
    type Filter: RecordFilter<Self>;

    /// Path segment on the remote API, also the storage namespace.
    const NAME: &'static str;
    /// Human-readable name used in error messages.
    const LABEL: &'static str;
    /// Column order of CSV exports.
    const CSV_COLUMNS: &'static [&'static str];

    fn id(&self) -> &Self::Id;

    /// Record created locally from `data`, stamped with `now`.
    fn build(id: Self::Id, data: Self::Create, now: DateTime<Utc>) -> Self;

    fn touch(&mut self, now: DateTime<Utc>);

    /// Text fields covered by the search term.
    fn search_fields(&self) -> Vec<&str>;

    /// Timestamp the date range applies to.
    fn filter_timestamp(&self) -> DateTime<Utc>;

    /// One CSV row, in `CSV_COLUMNS` order.
    fn csv_row(&self) -> Vec<String>;

    fn validate_create(_data: &Self::Create) -> Result<(), AppError> {
        Ok(())
    }

    fn validate_patch(_patch: &Self::Patch) -> Result<(), AppError> {
        Ok(())
    }

    /// Rules on the whole record, checked after a create or a merged update.
    fn validate(&self) -> Result<(), AppError> {
        Ok(())
    }

    /// Uniqueness rule against the other records of the store.
    fn check_unique(&self, _records: &[Self]) -> Result<(), AppError> {
        Ok(())
    }

    /// Guard rule evaluated before a local delete.
    fn check_delete(&self) -> Result<(), AppError> {
        Ok(())
    }
}

pub fn not_found<R: Resource>(id: &R::Id) -> AppError {
    AppError::NotFound(format!("{} {} not found", R::LABEL, id))
}

/// Overlay the fields present in `patch` on `record`.
pub fn merge_shallow<R, P>(record: &R, patch: &P) -> Result<R, AppError>
where
    R: Serialize + DeserializeOwned,
    P: Serialize,
{
    let mut merged = serde_json::to_value(record)?;
    let changes = serde_json::to_value(patch)?;

    if let (Value::Object(fields), Value::Object(changes)) = (&mut merged, changes) {
        for (key, value) in changes {
            if PROTECTED_FIELDS.contains(&key.as_str()) || value.is_null() {
                continue;
            }
            fields.insert(key, value);
        }
    }

    Ok(serde_json::from_value(merged)?)
}

/// CRUD, list, bulk and export operations over one resource.
pub struct ResourceService<R: Resource> {
    remote: RemoteClient,
    store: FallbackStore<R>,
}

impl<R: Resource> ResourceService<R> {
    pub fn new(
        remote: RemoteClient,
        storage: Arc<dyn KeyValueStore>,
        persistence: Persistence,
    ) -> Self {
        Self {
            remote,
            store: FallbackStore::new(storage, R::NAME, persistence, |record: &R| {
                record.id().to_string()
            }),
        }
    }

    fn item_path(id: &R::Id) -> String {
        format!("{}/{}", R::NAME, id)
    }

    /// Filtered, paginated records.
    pub async fn list(&self, filter: R::Filter) -> Result<PageResult<R>, AppError> {
        let criteria = ListCriteria::from_filter::<R>(&filter)?;

        let outcome = self.remote.get(R::NAME, &filter).await;
        let (filter, criteria) = (&filter, &criteria);
        outcome
            .or_fallback(R::NAME, "list", move || async move {
                Ok(self
                    .store
                    .read(|records| page_records(records, filter, criteria))
                    .await)
            })
            .await
    }

    pub async fn get(&self, id: R::Id) -> Result<R, AppError> {
        let outcome = self
            .remote
            .get(&Self::item_path(&id), NO_QUERY)
            .await;
        outcome
            .or_fallback(R::NAME, "get", || self.find_local(id))
            .await
    }

    pub async fn create(&self, data: R::Create) -> Result<R, AppError> {
        R::validate_create(&data)?;

        let outcome = self.remote.post(R::NAME, &data).await;
        outcome
            .or_fallback(R::NAME, "create", || self.create_local(data))
            .await
    }

    pub async fn update(&self, id: R::Id, patch: R::Patch) -> Result<R, AppError> {
        R::validate_patch(&patch)?;

        let outcome = self.remote.put(&Self::item_path(&id), &patch).await;
        outcome
            .or_fallback(R::NAME, "update", || self.update_local(id, patch))
            .await
    }

    /// Patch-style status operation: `PATCH <resource>/<id>/<action>`.
    ///
    /// Falls back to the same local merge as [`ResourceService::update`].
    pub async fn apply_action(
        &self,
        id: R::Id,
        action: &str,
        patch: R::Patch,
    ) -> Result<R, AppError> {
        R::validate_patch(&patch)?;

        let path = format!("{}/{}", Self::item_path(&id), action);
        let outcome = self.remote.patch(&path, &patch).await;
        outcome
            .or_fallback(R::NAME, action, || self.update_local(id, patch))
            .await
    }

    pub async fn delete(&self, id: R::Id) -> Result<(), AppError> {
        let outcome = self.remote.delete(&Self::item_path(&id)).await;
        outcome
            .or_fallback(R::NAME, "delete", || self.delete_local(id))
            .await
    }

    pub async fn bulk_update(&self, ids: Vec<R::Id>, patch: R::Patch) -> Result<(), AppError> {
        ensure_ids(&ids)?;
        R::validate_patch(&patch)?;

        let body = BulkUpdateRequest { ids, data: patch };
        self.remote
            .post_empty(&format!("{}/bulk/update", R::NAME), &body)
            .await
            .into_result(R::NAME, "bulk update")
    }

    pub async fn bulk_delete(&self, ids: Vec<R::Id>) -> Result<(), AppError> {
        self.bulk_action("delete", ids).await
    }

    /// Remote-only `POST <resource>/bulk/<action>` with an id list.
    pub async fn bulk_action(&self, action: &str, ids: Vec<R::Id>) -> Result<(), AppError> {
        ensure_ids(&ids)?;

        let body = BulkIdsRequest { ids };
        self.remote
            .post_empty(&format!("{}/bulk/{}", R::NAME, action), &body)
            .await
            .into_result(R::NAME, &format!("bulk {}", action))
    }

    /// Every record matching `filter`, pagination ignored, as CSV or JSON.
    pub async fn export(
        &self,
        filter: R::Filter,
        format: ExportFormat,
    ) -> Result<Export, AppError> {
        let criteria = ListCriteria::from_filter::<R>(&filter)?;

        let outcome = self
            .remote
            .get_raw(
                &format!("{}/export", R::NAME),
                &filter,
                &[("format", format.as_str())],
            )
            .await
            .map(|body| Export {
                content_type: body.content_type,
                file_name: export_file_name::<R>(format),
                bytes: body.bytes,
            });

        let (filter, criteria) = (&filter, &criteria);
        outcome
            .or_fallback(R::NAME, "export", move || async move {
                let records = self
                    .store
                    .read(|records| filter_records(records, filter, criteria))
                    .await;
                render::<R>(&records, format)
            })
            .await
    }

    /// Drop the local dataset.
    pub async fn clear_cache(&self) -> Result<(), AppError> {
        self.store.clear().await
    }

    /// Full local dataset, used to derive fallback statistics.
    pub async fn local_records(&self) -> Vec<R> {
        self.store.snapshot().await
    }

    async fn find_local(&self, id: R::Id) -> Result<R, AppError> {
        self.store
            .read(|records| records.iter().find(|r| r.id() == &id).cloned())
            .await
            .ok_or_else(|| not_found::<R>(&id))
    }

    async fn create_local(&self, data: R::Create) -> Result<R, AppError> {
        self.store
            .mutate(move |records| {
                let id = <R::Id as RecordId>::next(records.iter().map(R::id))?;
                let record = R::build(id, data, Utc::now());
                record.validate()?;
                record.check_unique(records)?;

                records.insert(0, record.clone());
                Ok(record)
            })
            .await
    }

    async fn update_local(&self, id: R::Id, patch: R::Patch) -> Result<R, AppError> {
        self.store
            .mutate(move |records| {
                let position = records
                    .iter()
                    .position(|r| r.id() == &id)
                    .ok_or_else(|| not_found::<R>(&id))?;

                let mut merged = merge_shallow(&records[position], &patch)?;
                merged.touch(Utc::now());
                merged.validate()?;
                merged.check_unique(records)?;

                records[position] = merged.clone();
                Ok(merged)
            })
            .await
    }

    async fn delete_local(&self, id: R::Id) -> Result<(), AppError> {
        self.store
            .mutate(move |records| {
                if let Some(position) = records.iter().position(|r| r.id() == &id) {
                    records[position].check_delete()?;
                    records.remove(position);
                }
                Ok(())
            })
            .await
    }
}

fn ensure_ids<I>(ids: &[I]) -> Result<(), AppError> {
    if ids.is_empty() {
        return Err(AppError::Validation("No ids provided".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Role, UpdateRoleRequest, UpdateUserRequest, User};
    use chrono::TimeZone;

    fn sample_role() -> Role {
        let at = Utc.with_ymd_and_hms(2024, 1, 10, 8, 0, 0).unwrap();
        Role {
            id: 3,
            name: "Technician".into(),
            description: "Workshop staff".into(),
            permissions: vec!["basic_access".into()],
            users: 4,
            is_default: false,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_merge_shallow_overlays_present_fields_only() {
        let role = sample_role();
        let patch = UpdateRoleRequest {
            description: Some("Senior workshop staff".into()),
            ..UpdateRoleRequest::default()
        };

        let merged = merge_shallow(&role, &patch).unwrap();
        assert_eq!(merged.description, "Senior workshop staff");
        assert_eq!(merged.name, role.name);
        assert_eq!(merged.permissions, role.permissions);
        assert_eq!(merged.users, role.users);
    }

    #[test]
    fn test_merge_shallow_never_overwrites_identity() {
        let role = sample_role();
        let patch = serde_json::json!({
            "id": 99,
            "createdAt": "2030-01-01T00:00:00Z",
            "name": "Lead"
        });

        let merged: Role = merge_shallow(&role, &patch).unwrap();
        assert_eq!(merged.id, 3);
        assert_eq!(merged.created_at, role.created_at);
        assert_eq!(merged.name, "Lead");
    }

    #[test]
    fn test_numeric_ids_continue_after_maximum() {
        let ids = [4_i64, 11, 7];
        assert_eq!(i64::next(ids.iter()).unwrap(), 12);
        assert_eq!(i64::next(std::iter::empty()).unwrap(), 1);
    }

    #[test]
    fn test_numeric_id_overflow_is_an_error() {
        let ids = [5_i64, i64::MAX];
        assert!(matches!(i64::next(ids.iter()), Err(AppError::Internal(_))));
    }

    #[test]
    fn test_string_ids_are_unique() {
        let existing: Vec<String> = Vec::new();
        let a = String::next(existing.iter()).unwrap();
        let b = String::next(existing.iter()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_merge_shallow_null_keeps_optional_field() {
        let user = User::seed().remove(0);
        assert!(user.phone.is_some());

        let patch = UpdateUserRequest {
            phone: None,
            name: Some("Anna K.".into()),
            ..UpdateUserRequest::default()
        };
        let merged = merge_shallow(&user, &patch).unwrap();
        assert_eq!(merged.phone, user.phone);
        assert_eq!(merged.name, "Anna K.");

        let explicit_null = serde_json::json!({ "phone": null });
        let merged: User = merge_shallow(&user, &explicit_null).unwrap();
        assert_eq!(merged.phone, user.phone);
    }
}
