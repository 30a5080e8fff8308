use chrono::{DateTime, NaiveDate, Utc};

use super::{required, seed_time};
use crate::errors::AppError;
use crate::models::{
    Campaign, CampaignFilter, CreateCampaignRequest, DiscountType, UpdateCampaignRequest,
};
use crate::service::{RecordFilter, Resource, ResourceService};
use crate::store::Seeded;

/// One row of the seed table; ids follow the row order.
struct SeedCampaign {
    name: &'static str,
    description: &'static str,
    discount_type: DiscountType,
    discount_value: f64,
    start: (i32, u32, u32),
    end: (i32, u32, u32),
    is_active: bool,
    applicable_services: &'static [&'static str],
    usage_count: u32,
    max_usage: Option<u32>,
}

const SEED: &[SeedCampaign] = &[
    SeedCampaign {
        name: "Spring Oil Change Special",
        description: "Discount on full synthetic oil change service",
        discount_type: DiscountType::Percentage,
        discount_value: 15.0,
        start: (2024, 3, 1),
        end: (2024, 4, 30),
        is_active: true,
        applicable_services: &["oil_change"],
        usage_count: 86,
        max_usage: Some(200),
    },
    SeedCampaign {
        name: "Brake Safety Week",
        description: "Flat discount on brake pad and disc replacement",
        discount_type: DiscountType::Fixed,
        discount_value: 40.0,
        start: (2024, 4, 8),
        end: (2024, 4, 14),
        is_active: true,
        applicable_services: &["brake_service"],
        usage_count: 23,
        max_usage: None,
    },
    SeedCampaign {
        name: "Summer AC Check",
        description: "Air conditioning inspection and recharge service",
        discount_type: DiscountType::Percentage,
        discount_value: 20.0,
        start: (2024, 6, 1),
        end: (2024, 8, 31),
        is_active: true,
        applicable_services: &["ac_service"],
        usage_count: 57,
        max_usage: None,
    },
    SeedCampaign {
        name: "Tire Rotation Bundle",
        description: "Rotation and balancing for all four tires",
        discount_type: DiscountType::Fixed,
        discount_value: 25.0,
        start: (2024, 5, 1),
        end: (2024, 5, 31),
        is_active: false,
        applicable_services: &["tire_rotation", "wheel_balancing"],
        usage_count: 41,
        max_usage: Some(100),
    },
    SeedCampaign {
        name: "Loyalty Customer Reward",
        description: "Year-round discount for returning customers",
        discount_type: DiscountType::Percentage,
        discount_value: 10.0,
        start: (2024, 1, 1),
        end: (2024, 12, 31),
        is_active: true,
        applicable_services: &[],
        usage_count: 312,
        max_usage: None,
    },
    SeedCampaign {
        name: "Winter Readiness Package",
        description: "Battery, antifreeze and wiper check before winter",
        discount_type: DiscountType::Percentage,
        discount_value: 18.0,
        start: (2024, 11, 1),
        end: (2025, 1, 31),
        is_active: true,
        applicable_services: &["battery_check", "coolant_service"],
        usage_count: 12,
        max_usage: None,
    },
    SeedCampaign {
        name: "New Customer Welcome",
        description: "Fixed discount on the first visit",
        discount_type: DiscountType::Fixed,
        discount_value: 30.0,
        start: (2024, 2, 1),
        end: (2024, 12, 31),
        is_active: true,
        applicable_services: &[],
        usage_count: 64,
        max_usage: None,
    },
    SeedCampaign {
        name: "Battery Replacement Deal",
        description: "Discount on new batteries including fitting",
        discount_type: DiscountType::Percentage,
        discount_value: 12.0,
        start: (2024, 9, 1),
        end: (2024, 9, 30),
        is_active: false,
        applicable_services: &["battery_replacement"],
        usage_count: 19,
        max_usage: Some(50),
    },
    SeedCampaign {
        name: "Black Friday Service Sale",
        description: "Storewide discount on every service",
        discount_type: DiscountType::Percentage,
        discount_value: 25.0,
        start: (2024, 11, 29),
        end: (2024, 12, 2),
        is_active: false,
        applicable_services: &[],
        usage_count: 0,
        max_usage: None,
    },
    SeedCampaign {
        name: "Fleet Maintenance Discount",
        description: "Contract pricing for business fleets",
        discount_type: DiscountType::Percentage,
        discount_value: 8.0,
        start: (2024, 7, 15),
        end: (2025, 7, 14),
        is_active: true,
        applicable_services: &["oil_change", "brake_service", "tire_rotation"],
        usage_count: 9,
        max_usage: None,
    },
    SeedCampaign {
        name: "Detailing Weekend",
        description: "Interior and exterior detailing at a flat discount",
        discount_type: DiscountType::Fixed,
        discount_value: 50.0,
        start: (2024, 8, 10),
        end: (2024, 8, 11),
        is_active: false,
        applicable_services: &["detailing"],
        usage_count: 15,
        max_usage: Some(30),
    },
    SeedCampaign {
        name: "Diagnostic Check Promo",
        description: "Half price on engine diagnostic service",
        discount_type: DiscountType::Percentage,
        discount_value: 50.0,
        start: (2024, 3, 15),
        end: (2024, 3, 31),
        is_active: true,
        applicable_services: &["diagnostics"],
        usage_count: 38,
        max_usage: None,
    },
];

impl Seeded for Campaign {
    fn seed() -> Vec<Self> {
        SEED.iter()
            .zip(1..)
            .map(|(row, id)| {
                let (year, month, day) = row.start;
                let start_date = seed_time(year, month, day, 8);
                let (year, month, day) = row.end;
                let created_at = start_date - chrono::Duration::days(14);
                Campaign {
                    id,
                    name: row.name.to_string(),
                    description: row.description.to_string(),
                    discount_type: row.discount_type,
                    discount_value: row.discount_value,
                    start_date,
                    end_date: seed_time(year, month, day, 18),
                    is_active: row.is_active,
                    applicable_services: row
                        .applicable_services
                        .iter()
                        .map(|s| s.to_string())
                        .collect(),
                    usage_count: row.usage_count,
                    max_usage: row.max_usage,
                    created_at,
                    updated_at: created_at,
                }
            })
            .collect()
    }
}

impl RecordFilter<Campaign> for CampaignFilter {
    fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }

    fn date_range(&self) -> (Option<NaiveDate>, Option<NaiveDate>) {
        (self.date_from, self.date_to)
    }

    fn pagination(&self) -> (Option<u32>, Option<u32>) {
        (self.page, self.limit)
    }

    fn matches(&self, record: &Campaign) -> bool {
        self.is_active.map_or(true, |active| record.is_active == active)
            && self
                .discount_type
                .map_or(true, |kind| record.discount_type == kind)
    }
}

fn validate_amount(value: f64) -> Result<(), AppError> {
    if !value.is_finite() || value < 0.0 {
        return Err(AppError::Validation(
            "discountValue must be a non-negative number".to_string(),
        ));
    }
    Ok(())
}

fn validate_discount(discount_type: DiscountType, value: f64) -> Result<(), AppError> {
    validate_amount(value)?;
    if discount_type == DiscountType::Percentage && value > 100.0 {
        return Err(AppError::Validation(
            "Percentage discount cannot exceed 100".to_string(),
        ));
    }
    Ok(())
}

fn validate_dates(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), AppError> {
    if end < start {
        return Err(AppError::Validation(
            "endDate must not be before startDate".to_string(),
        ));
    }
    Ok(())
}

impl Resource for Campaign {
    type Id = i64;
    type Create = CreateCampaignRequest;
    type Patch = UpdateCampaignRequest;
    type Filter = CampaignFilter;

    const NAME: &'static str = "campaigns";
    const LABEL: &'static str = "Campaign";
    const CSV_COLUMNS: &'static [&'static str] = &[
        "id",
        "name",
        "description",
        "discountType",
        "discountValue",
        "startDate",
        "endDate",
        "isActive",
        "applicableServices",
        "usageCount",
        "maxUsage",
        "createdAt",
        "updatedAt",
    ];

    fn id(&self) -> &i64 {
        &self.id
    }

    fn build(id: i64, data: CreateCampaignRequest, now: DateTime<Utc>) -> Self {
        Campaign {
            id,
            name: data.name.trim().to_string(),
            description: data.description,
            discount_type: data.discount_type,
            discount_value: data.discount_value,
            start_date: data.start_date,
            end_date: data.end_date,
            is_active: data.is_active,
            applicable_services: data.applicable_services,
            usage_count: 0,
            max_usage: data.max_usage,
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
        self.start_date
    }

    fn csv_row(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.name.clone(),
            self.description.clone(),
            self.discount_type.as_str().to_string(),
            self.discount_value.to_string(),
            self.start_date.to_rfc3339(),
            self.end_date.to_rfc3339(),
            self.is_active.to_string(),
            self.applicable_services.join(";"),
            self.usage_count.to_string(),
            self.max_usage.map(|m| m.to_string()).unwrap_or_default(),
            self.created_at.to_rfc3339(),
            self.updated_at.to_rfc3339(),
        ]
    }

    fn validate_create(data: &CreateCampaignRequest) -> Result<(), AppError> {
        required(&data.name, "Campaign name")?;
        validate_discount(data.discount_type, data.discount_value)?;
        validate_dates(data.start_date, data.end_date)
    }

    /// Shape checks only; the discount cap and date order depend on the
    /// stored record and are checked by `validate` after the merge.
    fn validate_patch(patch: &UpdateCampaignRequest) -> Result<(), AppError> {
        if let Some(name) = &patch.name {
            required(name, "Campaign name")?;
        }
        match patch.discount_value {
            Some(value) => validate_amount(value),
            None => Ok(()),
        }
    }

    fn validate(&self) -> Result<(), AppError> {
        required(&self.name, "Campaign name")?;
        validate_discount(self.discount_type, self.discount_value)?;
        validate_dates(self.start_date, self.end_date)
    }
}

impl ResourceService<Campaign> {
    pub async fn activate(&self, id: i64) -> Result<Campaign, AppError> {
        self.apply_action(id, "activate", UpdateCampaignRequest::active(true))
            .await
    }

    pub async fn deactivate(&self, id: i64) -> Result<Campaign, AppError> {
        self.apply_action(id, "deactivate", UpdateCampaignRequest::active(false))
            .await
    }

    pub async fn bulk_activate(&self, ids: Vec<i64>) -> Result<(), AppError> {
        self.bulk_action("activate", ids).await
    }

    pub async fn bulk_deactivate(&self, ids: Vec<i64>) -> Result<(), AppError> {
        self.bulk_action("deactivate", ids).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn create_request() -> CreateCampaignRequest {
        CreateCampaignRequest {
            name: "Autumn Tune-Up".into(),
            description: String::new(),
            discount_type: DiscountType::Percentage,
            discount_value: 10.0,
            start_date: seed_time(2024, 10, 1, 8),
            end_date: seed_time(2024, 10, 31, 18),
            is_active: true,
            applicable_services: vec![],
            max_usage: None,
        }
    }

    #[test]
    fn test_seed_ids_are_unique() {
        let seed = Campaign::seed();
        let ids: HashSet<i64> = seed.iter().map(|c| c.id).collect();
        assert_eq!(ids.len(), seed.len());
        assert_eq!(seed.len(), 12);
    }

    #[test]
    fn test_percentage_over_hundred_is_rejected() {
        let mut request = create_request();
        request.discount_value = 120.0;
        assert!(matches!(
            Campaign::validate_create(&request),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_end_before_start_is_rejected() {
        let mut request = create_request();
        request.end_date = seed_time(2024, 9, 1, 8);
        assert!(Campaign::validate_create(&request).is_err());
    }

    #[test]
    fn test_merged_percentage_over_hundred_is_rejected() {
        let patch = UpdateCampaignRequest {
            discount_value: Some(150.0),
            ..UpdateCampaignRequest::default()
        };
        assert!(Campaign::validate_patch(&patch).is_ok());

        let mut campaign = Campaign::seed().remove(0);
        assert_eq!(campaign.discount_type, DiscountType::Percentage);
        campaign.discount_value = 150.0;
        assert!(matches!(campaign.validate(), Err(AppError::Validation(_))));

        campaign.discount_type = DiscountType::Fixed;
        assert!(campaign.validate().is_ok());
    }

    #[test]
    fn test_merged_end_before_start_is_rejected() {
        let mut campaign = Campaign::seed().remove(1);
        assert!(campaign.validate().is_ok());

        campaign.end_date = seed_time(2020, 1, 1, 0);
        assert!(matches!(campaign.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_negative_patch_value_is_rejected() {
        let patch = UpdateCampaignRequest {
            discount_value: Some(-5.0),
            ..UpdateCampaignRequest::default()
        };
        assert!(Campaign::validate_patch(&patch).is_err());
    }

    #[test]
    fn test_seed_records_are_valid() {
        for campaign in Campaign::seed() {
            assert!(campaign.validate().is_ok(), "{}", campaign.name);
        }
    }

    #[test]
    fn test_build_stamps_timestamps_and_resets_usage() {
        let now = seed_time(2024, 9, 20, 10);
        let campaign = Campaign::build(13, create_request(), now);
        assert_eq!(campaign.id, 13);
        assert_eq!(campaign.usage_count, 0);
        assert_eq!(campaign.created_at, now);
        assert_eq!(campaign.updated_at, now);
    }
}
