//! Typed filter criteria for the paged lists
//!
//! Each list has its own option struct. Unset fields are omitted from the
//! query string, and [`Filters::to_query`] always emits pairs in the same
//! order so equal filters produce equal requests.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{ApiError, ApiResult};
use crate::types::{Job, JobStatus, Portfolio, RecordId};

/// Behaviour shared by every filter option struct
pub trait Filters: Clone + Default + PartialEq + fmt::Debug + Send + Sync {
    /// Query pairs sent with the list request
    fn to_query(&self) -> Vec<(String, String)>;

    /// Reject combinations the API would refuse
    fn validate(&self) -> ApiResult<()> {
        Ok(())
    }

    fn is_empty(&self) -> bool {
        self.to_query().is_empty()
    }
}

/// Client-side check applied to fetched records
///
/// Servers occasionally ignore a filter parameter; lists drop records that
/// fail this predicate so the visible result always honours the filter.
pub trait Matches<T> {
    fn matches(&self, _item: &T) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobSortKey {
    CreatedAt,
    Budget,
    Deadline,
}

impl JobSortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobSortKey::CreatedAt => "created_at",
            JobSortKey::Budget => "budget",
            JobSortKey::Deadline => "deadline",
        }
    }
}

impl FromStr for JobSortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "created_at" | "newest" => Ok(JobSortKey::CreatedAt),
            "budget" => Ok(JobSortKey::Budget),
            "deadline" => Ok(JobSortKey::Deadline),
            _ => Err(format!(
                "Invalid sort key: '{}'. Valid options: created_at, budget, deadline",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FundiSortKey {
    Rating,
    HourlyRate,
    ReviewCount,
}

impl FundiSortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            FundiSortKey::Rating => "rating",
            FundiSortKey::HourlyRate => "hourly_rate",
            FundiSortKey::ReviewCount => "review_count",
        }
    }
}

impl FromStr for FundiSortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rating" => Ok(FundiSortKey::Rating),
            "hourly_rate" | "rate" => Ok(FundiSortKey::HourlyRate),
            "review_count" | "reviews" => Ok(FundiSortKey::ReviewCount),
            _ => Err(format!(
                "Invalid sort key: '{}'. Valid options: rating, hourly_rate, review_count",
                s
            )),
        }
    }
}

/// Sort key plus direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort<K> {
    pub key: K,
    pub direction: SortDirection,
}

impl<K> Sort<K> {
    pub fn asc(key: K) -> Self {
        Self {
            key,
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(key: K) -> Self {
        Self {
            key,
            direction: SortDirection::Desc,
        }
    }
}

fn push_text(query: &mut Vec<(String, String)>, key: &str, value: &Option<String>) {
    if let Some(value) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        query.push((key.to_string(), value.to_string()));
    }
}

fn push_value<V: ToString>(query: &mut Vec<(String, String)>, key: &str, value: Option<V>) {
    if let Some(value) = value {
        query.push((key.to_string(), value.to_string()));
    }
}

fn check_budget_range(min: Option<f64>, max: Option<f64>) -> ApiResult<()> {
    for bound in [min, max].into_iter().flatten() {
        if bound < 0.0 || !bound.is_finite() {
            return Err(ApiError::InvalidRequest(format!(
                "Budget must be a positive amount (got {})",
                bound
            )));
        }
    }
    if let (Some(min), Some(max)) = (min, max) {
        if min > max {
            return Err(ApiError::InvalidRequest(format!(
                "Minimum budget ({}) is greater than maximum budget ({})",
                min, max
            )));
        }
    }
    Ok(())
}

// ============================================================================
// Jobs
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobFilters {
    pub search: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub status: Option<JobStatus>,
    pub budget_min: Option<f64>,
    pub budget_max: Option<f64>,
    pub sort: Option<Sort<JobSortKey>>,
}

impl Filters for JobFilters {
    fn to_query(&self) -> Vec<(String, String)> {
        let mut query = Vec::new();
        push_text(&mut query, "search", &self.search);
        push_text(&mut query, "category", &self.category);
        push_text(&mut query, "location", &self.location);
        push_value(&mut query, "status", self.status.map(|s| s.as_str()));
        push_value(&mut query, "budget_min", self.budget_min);
        push_value(&mut query, "budget_max", self.budget_max);
        if let Some(sort) = self.sort {
            query.push(("sort_by".to_string(), sort.key.as_str().to_string()));
            query.push(("sort_order".to_string(), sort.direction.as_str().to_string()));
        }
        query
    }

    fn validate(&self) -> ApiResult<()> {
        check_budget_range(self.budget_min, self.budget_max)
    }
}

impl Matches<Job> for JobFilters {
    fn matches(&self, job: &Job) -> bool {
        self.status.map_or(true, |status| job.status == status)
    }
}

// ============================================================================
// Fundis
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FundiFilters {
    pub search: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub skills: BTreeSet<String>,
    pub min_rating: Option<f32>,
    pub available: Option<bool>,
    pub verified: Option<bool>,
    pub sort: Option<Sort<FundiSortKey>>,
}

impl Filters for FundiFilters {
    fn to_query(&self) -> Vec<(String, String)> {
        let mut query = Vec::new();
        push_text(&mut query, "search", &self.search);
        push_text(&mut query, "category", &self.category);
        push_text(&mut query, "location", &self.location);
        if !self.skills.is_empty() {
            let skills: Vec<&str> = self.skills.iter().map(String::as_str).collect();
            query.push(("skills".to_string(), skills.join(",")));
        }
        push_value(&mut query, "min_rating", self.min_rating);
        push_value(&mut query, "is_available", self.available);
        push_value(&mut query, "is_verified", self.verified);
        if let Some(sort) = self.sort {
            query.push(("sort_by".to_string(), sort.key.as_str().to_string()));
            query.push(("sort_order".to_string(), sort.direction.as_str().to_string()));
        }
        query
    }

    fn validate(&self) -> ApiResult<()> {
        if let Some(rating) = self.min_rating {
            if !(0.0..=5.0).contains(&rating) {
                return Err(ApiError::InvalidRequest(format!(
                    "Minimum rating must be between 0 and 5 (got {})",
                    rating
                )));
            }
        }
        Ok(())
    }
}

impl Matches<crate::types::Fundi> for FundiFilters {}

// ============================================================================
// Portfolios
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PortfolioFilters {
    pub fundi_id: Option<RecordId>,
    pub category: Option<String>,
    pub search: Option<String>,
}

impl Filters for PortfolioFilters {
    fn to_query(&self) -> Vec<(String, String)> {
        let mut query = Vec::new();
        push_value(&mut query, "fundi_id", self.fundi_id.as_ref());
        push_text(&mut query, "category", &self.category);
        push_text(&mut query, "search", &self.search);
        query
    }
}

impl Matches<Portfolio> for PortfolioFilters {
    fn matches(&self, item: &Portfolio) -> bool {
        let category_ok = match self.category.as_deref().map(str::trim) {
            Some(wanted) if !wanted.is_empty() => item
                .category
                .as_deref()
                .is_some_and(|category| category.trim().eq_ignore_ascii_case(wanted)),
            _ => true,
        };
        let fundi_ok = self
            .fundi_id
            .as_ref()
            .map_or(true, |fundi_id| &item.fundi_id == fundi_id);
        category_ok && fundi_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn portfolio(category: Option<&str>) -> Portfolio {
        Portfolio {
            id: RecordId::new("1"),
            fundi_id: RecordId::new("9"),
            title: "Work".to_string(),
            description: String::new(),
            category: category.map(str::to_string),
            media_urls: Vec::new(),
            cost: None,
            duration_days: None,
            location: None,
            completed_at: None,
            created_at: None,
        }
    }

    #[test]
    fn test_default_filters_are_empty() {
        assert!(JobFilters::default().is_empty());
        assert!(FundiFilters::default().is_empty());
        assert!(PortfolioFilters::default().is_empty());
    }

    #[test]
    fn test_job_filters_query_order_and_omission() {
        let filters = JobFilters {
            search: Some("  sink ".to_string()),
            category: Some(String::new()),
            status: Some(JobStatus::Open),
            budget_max: Some(5000.0),
            sort: Some(Sort::asc(JobSortKey::Deadline)),
            ..Default::default()
        };

        assert_eq!(
            filters.to_query(),
            vec![
                ("search".to_string(), "sink".to_string()),
                ("status".to_string(), "open".to_string()),
                ("budget_max".to_string(), "5000".to_string()),
                ("sort_by".to_string(), "deadline".to_string()),
                ("sort_order".to_string(), "asc".to_string()),
            ]
        );
    }

    #[test]
    fn test_job_filters_reject_inverted_budget() {
        let filters = JobFilters {
            budget_min: Some(500.0),
            budget_max: Some(100.0),
            ..Default::default()
        };
        let err = filters.validate().unwrap_err();
        assert!(matches!(err, ApiError::InvalidRequest(_)));
        assert!(err.to_string().contains("greater than"));
    }

    #[test]
    fn test_job_filters_reject_negative_budget() {
        let filters = JobFilters {
            budget_min: Some(-1.0),
            ..Default::default()
        };
        assert!(filters.validate().is_err());
    }

    #[test]
    fn test_fundi_filters_skills_are_sorted_and_joined() {
        let mut filters = FundiFilters::default();
        filters.skills.insert("wiring".to_string());
        filters.skills.insert("solar".to_string());
        filters.verified = Some(true);

        assert_eq!(
            filters.to_query(),
            vec![
                ("skills".to_string(), "solar,wiring".to_string()),
                ("is_verified".to_string(), "true".to_string()),
            ]
        );
    }

    #[test]
    fn test_fundi_filters_rating_range() {
        let filters = FundiFilters {
            min_rating: Some(5.5),
            ..Default::default()
        };
        assert!(filters.validate().is_err());

        let filters = FundiFilters {
            min_rating: Some(4.0),
            ..Default::default()
        };
        assert!(filters.validate().is_ok());
    }

    #[test]
    fn test_portfolio_category_match_is_case_insensitive() {
        let filters = PortfolioFilters {
            category: Some("Plumbing".to_string()),
            ..Default::default()
        };

        assert!(filters.matches(&portfolio(Some("plumbing"))));
        assert!(filters.matches(&portfolio(Some("PLUMBING"))));
        assert!(!filters.matches(&portfolio(Some("Electrical"))));
        assert!(!filters.matches(&portfolio(None)));
    }

    #[test]
    fn test_unset_portfolio_filter_matches_everything() {
        let filters = PortfolioFilters::default();
        assert!(filters.matches(&portfolio(None)));
        assert!(filters.matches(&portfolio(Some("Tiling"))));
    }

    #[test]
    fn test_sort_key_parsing() {
        assert_eq!("budget".parse::<JobSortKey>().unwrap(), JobSortKey::Budget);
        assert_eq!("reviews".parse::<FundiSortKey>().unwrap(), FundiSortKey::ReviewCount);
        assert!("price".parse::<JobSortKey>().is_err());
    }
}
