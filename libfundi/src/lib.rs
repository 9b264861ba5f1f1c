//! Fundi - client core for the Fundi trades marketplace
//!
//! Typed records, a service layer over the marketplace REST API, and the
//! paged list containers that drive browsing of jobs, fundis and
//! portfolios.

pub mod api;
pub mod application;
pub mod config;
pub mod error;
pub mod filters;
pub mod logging;
pub mod paged_list;
pub mod service;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use error::{ApiError, ApiResult, FundiError, Result};
pub use paged_list::{LoadOutcome, PagedList};
pub use service::Marketplace;
pub use types::{Fundi, Job, JobApplication, JobStatus, Page, Portfolio, RecordId};
