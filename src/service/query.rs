//! Local list pipeline: search, equality, date range, then pagination.
//!
//! Pure functions of the dataset and the filter; the same inputs always
//! produce the same page, in dataset order.

use super::{RecordFilter, Resource};
use crate::errors::AppError;
use crate::models::{DateRange, PageRequest, PageResult};

/// Validated, normalized form of a resource filter.
#[derive(Debug, Clone, PartialEq)]
pub struct ListCriteria {
    /// Lowercased search term; `None` when absent or blank
    pub search: Option<String>,
    pub range: DateRange,
    pub page: PageRequest,
}

impl ListCriteria {
    pub fn from_filter<R: Resource>(filter: &R::Filter) -> Result<Self, AppError> {
        let (page, limit) = filter.pagination();
        let (from, to) = filter.date_range();

        let search = filter
            .search()
            .map(|term| term.trim().to_lowercase())
            .filter(|term| !term.is_empty());

        Ok(Self {
            search,
            range: DateRange::new(from, to)?,
            page: PageRequest::from_parts(page, limit)?,
        })
    }
}

/// Records matching every non-pagination predicate, in dataset order.
pub fn filter_records<R: Resource>(
    records: &[R],
    filter: &R::Filter,
    criteria: &ListCriteria,
) -> Vec<R> {
    records
        .iter()
        .filter(|record| match criteria.search.as_deref() {
            Some(term) => matches_search(*record, term),
            None => true,
        })
        .filter(|record| filter.matches(record))
        .filter(|record| {
            criteria.range.is_unbounded() || criteria.range.contains(record.filter_timestamp())
        })
        .cloned()
        .collect()
}

/// The requested page of the filtered records.
pub fn page_records<R: Resource>(
    records: &[R],
    filter: &R::Filter,
    criteria: &ListCriteria,
) -> PageResult<R> {
    PageResult::paginate(filter_records(records, filter, criteria), criteria.page)
}

/// Case-insensitive substring match, OR across the record's text fields.
fn matches_search<R: Resource>(record: &R, term: &str) -> bool {
    record
        .search_fields()
        .iter()
        .any(|field| field.to_lowercase().contains(term))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Campaign, CampaignFilter, DiscountType, Role, RoleFilter};
    use crate::store::Seeded;
    use chrono::NaiveDate;

    fn criteria_for<R: Resource>(filter: &R::Filter) -> ListCriteria {
        ListCriteria::from_filter::<R>(filter).unwrap()
    }

    #[test]
    fn test_empty_filter_returns_first_page_of_seed() {
        let seed = Campaign::seed();
        let filter = CampaignFilter::default();

        let page = page_records(&seed, &filter, &criteria_for::<Campaign>(&filter));

        assert_eq!(page.total, seed.len());
        assert_eq!(page.page, 1);
        assert_eq!(page.limit, 10);
        assert_eq!(page.items, seed[..10].to_vec());
        assert_eq!(page.total_pages, seed.len().div_ceil(10) as u32);
    }

    #[test]
    fn test_page_size_matches_remaining_records() {
        let seed = Campaign::seed();
        for limit in 1..=7u32 {
            for page in 1..=6u32 {
                let filter = CampaignFilter {
                    page: Some(page),
                    limit: Some(limit),
                    ..CampaignFilter::default()
                };
                let result = page_records(&seed, &filter, &criteria_for::<Campaign>(&filter));

                let skipped = ((page - 1) * limit) as usize;
                let expected = (limit as usize).min(result.total.saturating_sub(skipped));
                assert_eq!(result.items.len(), expected, "page {} limit {}", page, limit);
                assert_eq!(result.total, seed.len());
            }
        }
    }

    #[test]
    fn test_search_is_case_insensitive_across_fields() {
        let seed = Role::seed();
        let filter = RoleFilter {
            search: Some("  WORKSHOP ".into()),
            ..RoleFilter::default()
        };

        let matched = filter_records(&seed, &filter, &criteria_for::<Role>(&filter));

        assert!(!matched.is_empty());
        assert!(matched.iter().all(|role| {
            role.name.to_lowercase().contains("workshop")
                || role.description.to_lowercase().contains("workshop")
        }));
    }

    #[test]
    fn test_blank_search_does_not_filter() {
        let seed = Role::seed();
        let filter = RoleFilter {
            search: Some("   ".into()),
            ..RoleFilter::default()
        };
        assert_eq!(
            filter_records(&seed, &filter, &criteria_for::<Role>(&filter)).len(),
            seed.len()
        );
    }

    #[test]
    fn test_equality_and_date_filters_combine() {
        let seed = Campaign::seed();
        let filter = CampaignFilter {
            is_active: Some(true),
            discount_type: Some(DiscountType::Percentage),
            date_from: NaiveDate::from_ymd_opt(2024, 3, 1),
            date_to: NaiveDate::from_ymd_opt(2024, 8, 31),
            ..CampaignFilter::default()
        };

        let matched = filter_records(&seed, &filter, &criteria_for::<Campaign>(&filter));
        let expected: Vec<Campaign> = seed
            .iter()
            .filter(|c| c.is_active && c.discount_type == DiscountType::Percentage)
            .filter(|c| {
                let day = c.start_date.date_naive();
                day >= NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
                    && day <= NaiveDate::from_ymd_opt(2024, 8, 31).unwrap()
            })
            .cloned()
            .collect();

        assert!(!expected.is_empty());
        assert_eq!(matched, expected);
    }

    #[test]
    fn test_filtering_is_repeatable() {
        let seed = Campaign::seed();
        let filter = CampaignFilter {
            search: Some("service".into()),
            limit: Some(3),
            ..CampaignFilter::default()
        };
        let criteria = criteria_for::<Campaign>(&filter);

        assert_eq!(
            page_records(&seed, &filter, &criteria),
            page_records(&seed, &filter, &criteria)
        );
    }

    #[test]
    fn test_invalid_pagination_is_rejected() {
        let filter = CampaignFilter {
            limit: Some(0),
            ..CampaignFilter::default()
        };
        assert!(matches!(
            ListCriteria::from_filter::<Campaign>(&filter),
            Err(AppError::Validation(_))
        ));
    }
}
