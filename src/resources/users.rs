use chrono::{DateTime, NaiveDate, Utc};

use super::{optional_timestamp, required, seed_time};
use crate::errors::AppError;
use crate::models::{
    CreateUserRequest, UpdateUserRequest, User, UserFilter, UserRole, UserStatus,
};
use crate::service::{RecordFilter, Resource, ResourceService};
use crate::store::Seeded;

type SeedTime = (i32, u32, u32, u32);

/// One row of the seed table; ids are `usr_001` onwards in row order.
struct SeedUser {
    name: &'static str,
    email: &'static str,
    phone: Option<&'static str>,
    role: UserRole,
    status: UserStatus,
    last_login: Option<SeedTime>,
    created_at: SeedTime,
}

const SEED: &[SeedUser] = &[
    SeedUser {
        name: "Anna Kowalska",
        email: "anna.kowalska@garage.example",
        phone: Some("+48 501 200 301"),
        role: UserRole::Admin,
        status: UserStatus::Active,
        last_login: Some((2024, 9, 30, 8)),
        created_at: (2023, 1, 5, 9),
    },
    SeedUser {
        name: "Marek Nowak",
        email: "marek.nowak@garage.example",
        phone: Some("+48 501 200 302"),
        role: UserRole::Manager,
        status: UserStatus::Active,
        last_login: Some((2024, 9, 29, 17)),
        created_at: (2023, 2, 14, 9),
    },
    SeedUser {
        name: "Piotr Zielinski",
        email: "piotr.zielinski@garage.example",
        phone: Some("+48 501 200 303"),
        role: UserRole::Technician,
        status: UserStatus::Active,
        last_login: Some((2024, 9, 30, 7)),
        created_at: (2023, 3, 1, 9),
    },
    SeedUser {
        name: "Katarzyna Wojcik",
        email: "k.wojcik@garage.example",
        phone: None,
        role: UserRole::Technician,
        status: UserStatus::Inactive,
        last_login: Some((2024, 5, 2, 16)),
        created_at: (2023, 4, 18, 9),
    },
    SeedUser {
        name: "Tomasz Lewandowski",
        email: "tomasz.l@garage.example",
        phone: Some("+48 501 200 305"),
        role: UserRole::Technician,
        status: UserStatus::Active,
        last_login: Some((2024, 9, 28, 12)),
        created_at: (2023, 7, 3, 9),
    },
    SeedUser {
        name: "Ewa Kaminska",
        email: "ewa.kaminska@mail.example",
        phone: Some("+48 600 111 222"),
        role: UserRole::Customer,
        status: UserStatus::Active,
        last_login: Some((2024, 8, 14, 19)),
        created_at: (2023, 9, 21, 18),
    },
    SeedUser {
        name: "Jan Wisniewski",
        email: "jan.wisniewski@mail.example",
        phone: None,
        role: UserRole::Customer,
        status: UserStatus::Active,
        last_login: None,
        created_at: (2023, 11, 8, 12),
    },
    SeedUser {
        name: "Magdalena Dabrowska",
        email: "magda.d@mail.example",
        phone: Some("+48 600 333 444"),
        role: UserRole::Customer,
        status: UserStatus::Suspended,
        last_login: Some((2024, 2, 11, 10)),
        created_at: (2024, 1, 15, 15),
    },
    SeedUser {
        name: "Krzysztof Mazur",
        email: "k.mazur@mail.example",
        phone: Some("+48 600 555 666"),
        role: UserRole::Customer,
        status: UserStatus::Active,
        last_login: Some((2024, 9, 1, 9)),
        created_at: (2024, 3, 22, 11),
    },
    SeedUser {
        name: "Agnieszka Krawczyk",
        email: "agnieszka.k@mail.example",
        phone: None,
        role: UserRole::Customer,
        status: UserStatus::Inactive,
        last_login: None,
        created_at: (2024, 5, 30, 14),
    },
    SeedUser {
        name: "Pawel Grabowski",
        email: "pawel.grabowski@garage.example",
        phone: Some("+48 501 200 311"),
        role: UserRole::Manager,
        status: UserStatus::Active,
        last_login: Some((2024, 9, 27, 8)),
        created_at: (2024, 6, 10, 9),
    },
    SeedUser {
        name: "Zofia Pawlak",
        email: "zofia.pawlak@mail.example",
        phone: Some("+48 600 777 888"),
        role: UserRole::Customer,
        status: UserStatus::Active,
        last_login: Some((2024, 9, 15, 20)),
        created_at: (2024, 8, 2, 16),
    },
];

fn at((year, month, day, hour): SeedTime) -> DateTime<Utc> {
    seed_time(year, month, day, hour)
}

impl Seeded for User {
    fn seed() -> Vec<Self> {
        SEED.iter()
            .enumerate()
            .map(|(index, row)| {
                let created_at = at(row.created_at);
                let last_login = row.last_login.map(at);
                User {
                    id: format!("usr_{:03}", index + 1),
                    name: row.name.to_string(),
                    email: row.email.to_string(),
                    phone: row.phone.map(str::to_string),
                    role: row.role,
                    status: row.status,
                    last_login,
                    created_at,
                    updated_at: last_login.unwrap_or(created_at),
                }
            })
            .collect()
    }
}

impl RecordFilter<User> for UserFilter {
    fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }

    fn date_range(&self) -> (Option<NaiveDate>, Option<NaiveDate>) {
        (self.date_from, self.date_to)
    }

    fn pagination(&self) -> (Option<u32>, Option<u32>) {
        (self.page, self.limit)
    }

    fn matches(&self, record: &User) -> bool {
        self.role.map_or(true, |role| record.role == role)
            && self.status.map_or(true, |status| record.status == status)
    }
}

fn validate_email(email: &str) -> Result<(), AppError> {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(AppError::Validation(format!(
            "'{}' is not a valid email address",
            email
        ))),
    }
}

impl Resource for User {
    type Id = String;
    type Create = CreateUserRequest;
    type Patch = UpdateUserRequest;
    type Filter = UserFilter;

    const NAME: &'static str = "users";
    const LABEL: &'static str = "User";
    const CSV_COLUMNS: &'static [&'static str] = &[
        "id",
        "name",
        "email",
        "phone",
        "role",
        "status",
        "lastLogin",
        "createdAt",
        "updatedAt",
    ];

    fn id(&self) -> &String {
        &self.id
    }

    fn build(id: String, data: CreateUserRequest, now: DateTime<Utc>) -> Self {
        User {
            id,
            name: data.name.trim().to_string(),
            email: data.email.trim().to_string(),
            phone: data.phone,
            role: data.role,
            status: data.status,
            last_login: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.name.as_str(), self.email.as_str()];
        if let Some(phone) = &self.phone {
            fields.push(phone);
        }
        fields
    }

    fn filter_timestamp(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn csv_row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.name.clone(),
            self.email.clone(),
            self.phone.clone().unwrap_or_default(),
            self.role.as_str().to_string(),
            self.status.as_str().to_string(),
            optional_timestamp(self.last_login),
            self.created_at.to_rfc3339(),
            self.updated_at.to_rfc3339(),
        ]
    }

    fn validate_create(data: &CreateUserRequest) -> Result<(), AppError> {
        required(&data.name, "User name")?;
        validate_email(&data.email)
    }

    fn validate_patch(patch: &UpdateUserRequest) -> Result<(), AppError> {
        if let Some(name) = &patch.name {
            required(name, "User name")?;
        }
        if let Some(email) = &patch.email {
            validate_email(email)?;
        }
        Ok(())
    }

    fn check_unique(&self, records: &[Self]) -> Result<(), AppError> {
        let email = self.email.trim().to_lowercase();
        let taken = records
            .iter()
            .any(|other| other.id != self.id && other.email.trim().to_lowercase() == email);

        if taken {
            return Err(AppError::Conflict(format!(
                "Email '{}' is already registered",
                self.email.trim()
            )));
        }
        Ok(())
    }
}

impl ResourceService<User> {
    pub async fn set_status(&self, id: String, status: UserStatus) -> Result<User, AppError> {
        self.apply_action(id, "status", UpdateUserRequest::status(status))
            .await
    }

    pub async fn bulk_activate(&self, ids: Vec<String>) -> Result<(), AppError> {
        self.bulk_action("activate", ids).await
    }

    pub async fn bulk_deactivate(&self, ids: Vec<String>) -> Result<(), AppError> {
        self.bulk_action("deactivate", ids).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_covers_phone() {
        let seed = User::seed();
        let hit = seed
            .iter()
            .find(|u| u.search_fields().iter().any(|f| f.contains("600 333")))
            .unwrap();
        assert_eq!(hit.id, "usr_008");
    }

    #[test]
    fn test_email_uniqueness_ignores_case() {
        let seed = User::seed();
        let candidate = User::build(
            "usr_new".into(),
            CreateUserRequest {
                name: "Someone".into(),
                email: "ANNA.KOWALSKA@garage.example".into(),
                phone: None,
                role: UserRole::Customer,
                status: UserStatus::Active,
            },
            Utc::now(),
        );
        assert!(matches!(
            candidate.check_unique(&seed),
            Err(AppError::Conflict(_))
        ));
    }

    #[test]
    fn test_invalid_email_is_rejected() {
        for email in ["", "no-at-sign", "@garage.example", "user@"] {
            let patch = UpdateUserRequest {
                email: Some(email.into()),
                ..UpdateUserRequest::default()
            };
            assert!(User::validate_patch(&patch).is_err(), "{}", email);
        }
    }

    #[test]
    fn test_role_and_status_filter() {
        let filter = UserFilter {
            role: Some(UserRole::Technician),
            status: Some(UserStatus::Active),
            ..UserFilter::default()
        };
        let ids: Vec<String> = User::seed()
            .into_iter()
            .filter(|u| filter.matches(u))
            .map(|u| u.id)
            .collect();
        assert_eq!(ids, vec!["usr_003", "usr_005"]);
    }
}
