//! Core record types for the Fundi marketplace
//!
//! These mirror the JSON bodies returned by the marketplace API. Decoding is
//! lenient where the API is known to be inconsistent (ids arrive as numbers
//! or strings, fundis arrive embedded or as bare ids) so that callers only
//! ever see one shape.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ============================================================================
// Identifiers
// ============================================================================

/// Identifier of a marketplace record
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<u64> for RecordId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl Serialize for RecordId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Int(i64),
            Text(String),
        }

        match RawId::deserialize(deserializer)? {
            RawId::Int(n) => Ok(RecordId(n.to_string())),
            RawId::Text(s) => Ok(RecordId(s)),
        }
    }
}

// ============================================================================
// Jobs
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Open,
    InProgress,
    Completed,
    Cancelled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Open => "open",
            JobStatus::InProgress => "in_progress",
            JobStatus::Completed => "completed",
            JobStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Cancelled)
    }

    /// Status changes a job owner may request
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Open, JobStatus::InProgress)
                | (JobStatus::Open, JobStatus::Cancelled)
                | (JobStatus::InProgress, JobStatus::Completed)
                | (JobStatus::InProgress, JobStatus::Cancelled)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "open" => Ok(JobStatus::Open),
            "in_progress" => Ok(JobStatus::InProgress),
            "completed" => Ok(JobStatus::Completed),
            "cancelled" | "canceled" => Ok(JobStatus::Cancelled),
            _ => Err(format!(
                "Invalid job status: '{}'. Valid options: open, in_progress, completed, cancelled",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BudgetType {
    #[default]
    Fixed,
    Hourly,
    Negotiable,
}

/// Customer who posted a job
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CustomerRef {
    pub id: RecordId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    pub id: RecordId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub budget: Option<f64>,
    #[serde(default)]
    pub budget_type: BudgetType,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
    pub status: JobStatus,
    #[serde(default)]
    pub customer: Option<CustomerRef>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default, alias = "hasApplied")]
    pub has_applied: bool,
    #[serde(default)]
    pub applications_count: u32,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn is_open(&self) -> bool {
        self.status == JobStatus::Open
    }
}

// ============================================================================
// Applications
// ============================================================================

/// Cost breakdown a fundi proposes for a job
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct BudgetBreakdown {
    #[serde(default)]
    pub labor: f64,
    #[serde(default)]
    pub materials: f64,
    #[serde(default)]
    pub transport: f64,
}

impl BudgetBreakdown {
    pub fn new(labor: f64, materials: f64, transport: f64) -> Self {
        Self {
            labor,
            materials,
            transport,
        }
    }

    pub fn total(&self) -> f64 {
        self.labor + self.materials + self.transport
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    Accepted,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobApplication {
    pub id: RecordId,
    pub job_id: RecordId,
    /// Filled from `fundi` during decoding when the payload omits it
    #[serde(default)]
    pub fundi_id: RecordId,
    #[serde(default)]
    pub fundi: Option<FundiRef>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub proposed_budget: BudgetBreakdown,
    #[serde(default)]
    pub estimated_days: u32,
    pub status: ApplicationStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl JobApplication {
    /// Fill `fundi_id` from the embedded fundi reference when absent
    pub fn normalized(mut self) -> Self {
        if self.fundi_id.is_empty() {
            if let Some(fundi) = &self.fundi {
                self.fundi_id = fundi.id().clone();
            }
        }
        self
    }
}

// ============================================================================
// Fundis and portfolios
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Fundi {
    pub id: RecordId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub rating: Option<f32>,
    #[serde(default)]
    pub review_count: u32,
    #[serde(default)]
    pub hourly_rate: Option<f64>,
    #[serde(default)]
    pub is_available: bool,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub media: Vec<String>,
}

/// A fundi as embedded in another record
///
/// The API sends either the full profile object or only the id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FundiRef {
    Profile(Box<Fundi>),
    Id(RecordId),
}

impl FundiRef {
    pub fn id(&self) -> &RecordId {
        match self {
            FundiRef::Profile(fundi) => &fundi.id,
            FundiRef::Id(id) => id,
        }
    }

    pub fn profile(&self) -> Option<&Fundi> {
        match self {
            FundiRef::Profile(fundi) => Some(fundi),
            FundiRef::Id(_) => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Portfolio {
    pub id: RecordId,
    pub fundi_id: RecordId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, alias = "images")]
    pub media_urls: Vec<String>,
    #[serde(default)]
    pub cost: Option<f64>,
    #[serde(default)]
    pub duration_days: Option<u32>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    pub id: RecordId,
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
}

// ============================================================================
// Pagination
// ============================================================================

/// One page of a server-side list
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub current_page: u32,
    pub total_pages: u32,
    pub total: Option<u64>,
    pub per_page: u32,
}

impl<T> Page<T> {
    pub fn has_more(&self) -> bool {
        self.current_page < self.total_pages
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            current_page: self.current_page,
            total_pages: self.total_pages,
            total: self.total,
            per_page: self.per_page,
        }
    }
}
