use chrono::{DateTime, NaiveDate, Utc};

use super::{required, seed_time};
use crate::errors::AppError;
use crate::models::{CreateRoleRequest, Role, RoleFilter, UpdateRoleRequest};
use crate::service::{RecordFilter, Resource};
use crate::store::Seeded;

fn role(
    id: i64,
    name: &str,
    description: &str,
    permissions: &[&str],
    users: u32,
    is_default: bool,
    created_at: DateTime<Utc>,
) -> Role {
    Role {
        id,
        name: name.to_string(),
        description: description.to_string(),
        permissions: permissions.iter().map(|p| p.to_string()).collect(),
        users,
        is_default,
        created_at,
        updated_at: created_at,
    }
}

impl Seeded for Role {
    fn seed() -> Vec<Self> {
        vec![
            role(
                1,
                "Administrator",
                "Full access to the garage management system",
                crate::models::PERMISSIONS,
                2,
                true,
                seed_time(2023, 1, 2, 9),
            ),
            role(
                2,
                "Manager",
                "Runs daily workshop operations and reporting",
                &[
                    "basic_access",
                    "manage_users",
                    "manage_campaigns",
                    "manage_inventory",
                    "manage_appointments",
                    "view_reports",
                    "view_statistics",
                ],
                3,
                false,
                seed_time(2023, 1, 2, 9),
            ),
            role(
                3,
                "Technician",
                "Workshop staff performing repairs and maintenance",
                &["basic_access", "perform_services", "update_service_status"],
                8,
                false,
                seed_time(2023, 1, 3, 9),
            ),
            role(
                4,
                "Customer",
                "Vehicle owners booking services online",
                &["basic_access", "book_appointments", "view_own_vehicles"],
                120,
                true,
                seed_time(2023, 1, 3, 9),
            ),
            role(
                5,
                "Receptionist",
                "Front desk handling bookings and workshop check-in",
                &["basic_access", "manage_appointments"],
                2,
                false,
                seed_time(2023, 6, 12, 10),
            ),
            role(
                6,
                "Parts Clerk",
                "Keeps workshop inventory stocked",
                &["basic_access", "manage_inventory"],
                0,
                false,
                seed_time(2024, 2, 19, 14),
            ),
        ]
    }
}

impl RecordFilter<Role> for RoleFilter {
    fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }

    fn date_range(&self) -> (Option<NaiveDate>, Option<NaiveDate>) {
        (self.date_from, self.date_to)
    }

    fn pagination(&self) -> (Option<u32>, Option<u32>) {
        (self.page, self.limit)
    }

    fn matches(&self, record: &Role) -> bool {
        self.is_default
            .map_or(true, |is_default| record.is_default == is_default)
            && self
                .permission
                .as_deref()
                .map_or(true, |permission| {
                    record.permissions.iter().any(|p| p == permission)
                })
    }
}

fn normalized_name(name: &str) -> String {
    name.trim().to_lowercase()
}

impl Resource for Role {
    type Id = i64;
    type Create = CreateRoleRequest;
    type Patch = UpdateRoleRequest;
    type Filter = RoleFilter;

    const NAME: &'static str = "roles";
    const LABEL: &'static str = "Role";
    const CSV_COLUMNS: &'static [&'static str] = &[
        "id",
        "name",
        "description",
        "permissions",
        "users",
        "isDefault",
        "createdAt",
        "updatedAt",
    ];

    fn id(&self) -> &i64 {
        &self.id
    }

    /// New roles start unassigned and are never default.
    fn build(id: i64, data: CreateRoleRequest, now: DateTime<Utc>) -> Self {
        Role {
            id,
            name: data.name.trim().to_string(),
            description: data.description,
            permissions: data.permissions,
            users: 0,
            is_default: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![self.name.as_str(), self.description.as_str()]
    }

    fn filter_timestamp(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn csv_row(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.name.clone(),
            self.description.clone(),
            self.permissions.join(";"),
            self.users.to_string(),
            self.is_default.to_string(),
            self.created_at.to_rfc3339(),
            self.updated_at.to_rfc3339(),
        ]
    }

    fn validate_create(data: &CreateRoleRequest) -> Result<(), AppError> {
        required(&data.name, "Role name")
    }

    fn validate_patch(patch: &UpdateRoleRequest) -> Result<(), AppError> {
        match &patch.name {
            Some(name) => required(name, "Role name"),
            None => Ok(()),
        }
    }

    /// Names are unique ignoring case and surrounding whitespace.
    fn check_unique(&self, records: &[Self]) -> Result<(), AppError> {
        let name = normalized_name(&self.name);
        let taken = records
            .iter()
            .any(|other| other.id != self.id && normalized_name(&other.name) == name);

        if taken {
            return Err(AppError::Conflict(format!(
                "Role name '{}' already exists",
                self.name.trim()
            )));
        }
        Ok(())
    }

    fn check_delete(&self) -> Result<(), AppError> {
        if self.is_default {
            return Err(AppError::PreconditionFailed(format!(
                "Role '{}' is a default role and cannot be deleted",
                self.name
            )));
        }
        if self.users > 0 {
            return Err(AppError::PreconditionFailed(format!(
                "Role '{}' is assigned to {} user(s) and cannot be deleted",
                self.name, self.users
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find(id: i64) -> Role {
        Role::seed().into_iter().find(|r| r.id == id).unwrap()
    }

    #[test]
    fn test_duplicate_name_conflicts_ignoring_case() {
        let seed = Role::seed();
        let candidate = Role::build(
            7,
            CreateRoleRequest {
                name: "  manager ".into(),
                description: String::new(),
                permissions: vec![],
            },
            Utc::now(),
        );

        assert!(matches!(
            candidate.check_unique(&seed),
            Err(AppError::Conflict(_))
        ));
    }

    #[test]
    fn test_record_does_not_conflict_with_itself() {
        let seed = Role::seed();
        assert!(find(2).check_unique(&seed).is_ok());
    }

    #[test]
    fn test_delete_guards() {
        assert!(matches!(
            find(3).check_delete(),
            Err(AppError::PreconditionFailed(_))
        ));
        assert!(matches!(
            find(1).check_delete(),
            Err(AppError::PreconditionFailed(_))
        ));
        assert!(find(6).check_delete().is_ok());
    }

    #[test]
    fn test_permission_filter() {
        let filter = RoleFilter {
            permission: Some("manage_inventory".into()),
            ..RoleFilter::default()
        };
        let ids: Vec<i64> = Role::seed()
            .into_iter()
            .filter(|r| filter.matches(r))
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![1, 2, 6]);
    }

    #[test]
    fn test_blank_name_is_rejected() {
        let patch = UpdateRoleRequest {
            name: Some("   ".into()),
            ..UpdateRoleRequest::default()
        };
        assert!(Role::validate_patch(&patch).is_err());
    }
}
