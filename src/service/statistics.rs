//! Dashboard statistics.
//!
//! The fallback overview is derived from the other resources' fallback
//! stores, so it stays consistent with what the local lists show.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};

use super::ResourceService;
use crate::config::Persistence;
use crate::errors::AppError;
use crate::models::{
    Campaign, DashboardOverview, DateRange, MonthlyRevenue, RevenueQuery, Role, User, UserStatus,
};
use crate::remote::{RemoteClient, NO_QUERY};
use crate::store::{FallbackStore, KeyValueStore, Seeded};

const NAME: &str = "statistics";

impl Seeded for MonthlyRevenue {
    fn seed() -> Vec<Self> {
        const REVENUE: [(u32, f64, u32); 12] = [
            (1, 18_450.0, 142),
            (2, 17_020.5, 131),
            (3, 21_310.0, 165),
            (4, 23_875.25, 181),
            (5, 25_040.0, 190),
            (6, 27_960.75, 204),
            (7, 26_115.0, 199),
            (8, 24_380.0, 186),
            (9, 22_905.5, 172),
            (10, 24_760.0, 183),
            (11, 28_430.0, 211),
            (12, 31_205.0, 228),
        ];

        REVENUE
            .iter()
            .filter_map(|&(month, revenue, service_count)| {
                NaiveDate::from_ymd_opt(2024, month, 1).map(|month| MonthlyRevenue {
                    month,
                    revenue,
                    service_count,
                })
            })
            .collect()
    }
}

pub struct StatisticsService {
    remote: RemoteClient,
    revenue: FallbackStore<MonthlyRevenue>,
    campaigns: Arc<ResourceService<Campaign>>,
    roles: Arc<ResourceService<Role>>,
    users: Arc<ResourceService<User>>,
}

impl StatisticsService {
    pub fn new(
        remote: RemoteClient,
        storage: Arc<dyn KeyValueStore>,
        persistence: Persistence,
        campaigns: Arc<ResourceService<Campaign>>,
        roles: Arc<ResourceService<Role>>,
        users: Arc<ResourceService<User>>,
    ) -> Self {
        Self {
            remote,
            revenue: FallbackStore::new(storage, NAME, persistence, |entry: &MonthlyRevenue| {
                entry.month.to_string()
            }),
            campaigns,
            roles,
            users,
        }
    }

    pub async fn overview(&self) -> Result<DashboardOverview, AppError> {
        let outcome = self
            .remote
            .get(&format!("{}/overview", NAME), NO_QUERY)
            .await;
        outcome
            .or_fallback(NAME, "overview", || self.local_overview())
            .await
    }

    /// Monthly revenue, optionally bounded by inclusive months.
    pub async fn revenue(&self, query: RevenueQuery) -> Result<Vec<MonthlyRevenue>, AppError> {
        let range = DateRange::new(query.from, query.to)?;

        let outcome = self
            .remote
            .get(&format!("{}/revenue", NAME), &query)
            .await;
        let range = &range;
        outcome
            .or_fallback(NAME, "revenue", move || async move {
                Ok(self
                    .revenue
                    .read(|months| {
                        months
                            .iter()
                            .filter(|entry| month_in_range(entry.month, range))
                            .cloned()
                            .collect::<Vec<_>>()
                    })
                    .await)
            })
            .await
    }

    async fn local_overview(&self) -> Result<DashboardOverview, AppError> {
        let users = self.users.local_records().await;
        let campaigns = self.campaigns.local_records().await;
        let roles = self.roles.local_records().await;
        let months = self.revenue.snapshot().await;

        let mut users_by_role = BTreeMap::new();
        for user in &users {
            *users_by_role
                .entry(user.role.as_str().to_string())
                .or_insert(0) += 1;
        }

        let current_month_revenue = months
            .iter()
            .max_by_key(|entry| entry.month)
            .map(|entry| entry.revenue)
            .unwrap_or(0.0);

        Ok(DashboardOverview {
            total_users: users.len(),
            active_users: users
                .iter()
                .filter(|u| u.status == UserStatus::Active)
                .count(),
            users_by_role,
            total_campaigns: campaigns.len(),
            active_campaigns: campaigns.iter().filter(|c| c.is_active).count(),
            total_roles: roles.len(),
            total_revenue: months.iter().map(|entry| entry.revenue).sum(),
            current_month_revenue,
            generated_at: Utc::now(),
        })
    }
}

/// Months are matched by overlap: a bound inside a month includes that month.
fn month_in_range(month: NaiveDate, range: &DateRange) -> bool {
    let month_end = month
        .checked_add_months(chrono::Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(month);

    range.from.map_or(true, |from| month_end >= from) && range.to.map_or(true, |to| month <= to)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revenue_seed_covers_a_year() {
        let seed = MonthlyRevenue::seed();
        assert_eq!(seed.len(), 12);
        assert!(seed.windows(2).all(|w| w[0].month < w[1].month));
    }

    #[test]
    fn test_month_range_matches_by_overlap() {
        let march = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 3, 15),
            NaiveDate::from_ymd_opt(2024, 3, 20),
        )
        .unwrap();

        assert!(month_in_range(march, &range));
        assert!(!month_in_range(
            NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
            &range
        ));
        assert!(!month_in_range(
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            &range
        ));
    }
}
