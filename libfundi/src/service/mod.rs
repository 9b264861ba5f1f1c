//! Service layer for the Fundi marketplace
//!
//! Every operation builds one request from typed parameters, sends it
//! through the shared [`Transport`], and maps the response envelope to a
//! typed record. Failures come back as [`ApiError`] values; nothing is
//! retried.
//!
//! # Architecture
//!
//! [`Marketplace`] is the entry point and hands out the sub-services:
//!
//! - `JobService`: browse, post and update jobs, apply for a job
//! - `ApplicationService`: list and decide applications
//! - `FundiService`: browse fundis, edit a profile
//! - `PortfolioService`: portfolio item CRUD
//! - `CategoryService`: trade categories
//! - `EventBus`: list and application progress events
//!
//! # Example
//!
//! ```no_run
//! use libfundi::Marketplace;
//! use libfundi::filters::JobFilters;
//!
//! # async fn example() -> libfundi::Result<()> {
//! let marketplace = Marketplace::new()?;
//!
//! let page = marketplace.jobs().list(&JobFilters::default(), 1, 20).await?;
//! println!("{} of {} pages", page.current_page, page.total_pages);
//! # Ok(())
//! # }
//! ```

pub mod applications;
pub mod categories;
pub mod events;
pub mod fundis;
pub mod jobs;
pub mod portfolios;

use std::sync::Arc;

use self::applications::ApplicationService;
use self::categories::CategoryService;
use self::events::{EventBus, EventReceiver};
use self::fundis::FundiService;
use self::jobs::JobService;
use self::portfolios::PortfolioService;
use crate::api::envelope::{unwrap_envelope, Envelope};
use crate::api::http::HttpTransport;
use crate::api::{ApiRequest, Transport};
use crate::config::{Config, PagingConfig};
use crate::error::{ApiError, ApiResult, Result};
use crate::filters::{FundiFilters, JobFilters, PortfolioFilters};
use crate::paged_list::PagedList;
use crate::types::{Fundi, Job, Portfolio, RecordId};

/// Send one request and strip the response envelope
pub(crate) async fn call(transport: &dyn Transport, request: ApiRequest) -> ApiResult<Envelope> {
    let method = request.method.as_str();
    let path = request.path.clone();
    tracing::debug!(transport = transport.name(), "{} {}", method, path);

    match transport.send(request).await.and_then(unwrap_envelope) {
        Ok(envelope) => Ok(envelope),
        Err(e) => {
            tracing::warn!(transport = transport.name(), "{} {} failed: {}", method, path, e);
            Err(e)
        }
    }
}

/// Reject empty ids before they end up in a request path
pub(crate) fn require_id<'a>(id: &'a RecordId, what: &str) -> ApiResult<&'a str> {
    let id = id.as_str().trim();
    if id.is_empty() {
        return Err(ApiError::InvalidRequest(format!("{} id is required", what)));
    }
    // Ids become a single path segment
    if id.chars().any(|c| matches!(c, '/' | '?' | '#' | '%' | '\\') || c.is_whitespace() || c.is_control()) {
        return Err(ApiError::InvalidRequest(format!("Invalid {} id '{}'", what.to_lowercase(), id)));
    }
    Ok(id)
}

pub(crate) fn require_text(value: &str, what: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        return Err(ApiError::InvalidRequest(format!("{} cannot be empty", what)));
    }
    Ok(())
}

/// Main service facade
///
/// All sub-services share one transport and one event bus.
pub struct Marketplace {
    transport: Arc<dyn Transport>,
    paging: PagingConfig,
    jobs: JobService,
    applications: ApplicationService,
    fundis: FundiService,
    portfolios: PortfolioService,
    categories: CategoryService,
    event_bus: EventBus,
}

impl Marketplace {
    /// Create a marketplace client from the default configuration file
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded or the HTTP
    /// client cannot be built.
    pub fn new() -> Result<Self> {
        let config = Config::load()?;
        Self::from_config(&config)
    }

    /// Create a marketplace client talking HTTP to `config.api.base_url`
    pub fn from_config(config: &Config) -> Result<Self> {
        let transport = HttpTransport::new(&config.api)?;
        Ok(Self::with_transport(
            Arc::new(transport),
            config.paging.clone(),
        ))
    }

    /// Create a marketplace client over any transport
    ///
    /// Used with [`MockTransport`](crate::api::mock::MockTransport) in tests.
    pub fn with_transport(transport: Arc<dyn Transport>, paging: PagingConfig) -> Self {
        let event_bus = EventBus::new(100);

        let jobs = JobService::new(Arc::clone(&transport), event_bus.clone());
        let applications = ApplicationService::new(Arc::clone(&transport), event_bus.clone());
        let fundis = FundiService::new(Arc::clone(&transport));
        let portfolios = PortfolioService::new(Arc::clone(&transport));
        let categories = CategoryService::new(Arc::clone(&transport));

        Self {
            transport,
            paging,
            jobs,
            applications,
            fundis,
            portfolios,
            categories,
            event_bus,
        }
    }

    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    pub fn paging(&self) -> &PagingConfig {
        &self.paging
    }

    pub fn jobs(&self) -> &JobService {
        &self.jobs
    }

    pub fn applications(&self) -> &ApplicationService {
        &self.applications
    }

    pub fn fundis(&self) -> &FundiService {
        &self.fundis
    }

    pub fn portfolios(&self) -> &PortfolioService {
        &self.portfolios
    }

    pub fn categories(&self) -> &CategoryService {
        &self.categories
    }

    /// A fresh paged list of jobs, wired to the event bus
    pub fn job_list(&self) -> PagedList<Job, JobFilters> {
        PagedList::new("jobs", Arc::new(self.jobs.clone()), self.paging.page_size)
            .with_events(self.event_bus.clone())
            .with_load_more_threshold(self.paging.load_more_threshold)
    }

    pub fn fundi_list(&self) -> PagedList<Fundi, FundiFilters> {
        PagedList::new("fundis", Arc::new(self.fundis.clone()), self.paging.page_size)
            .with_events(self.event_bus.clone())
            .with_load_more_threshold(self.paging.load_more_threshold)
    }

    pub fn portfolio_list(&self) -> PagedList<Portfolio, PortfolioFilters> {
        PagedList::new(
            "portfolios",
            Arc::new(self.portfolios.clone()),
            self.paging.page_size,
        )
        .with_events(self.event_bus.clone())
        .with_load_more_threshold(self.paging.load_more_threshold)
    }

    /// Subscribe to service events
    ///
    /// # Example
    ///
    /// ```no_run
    /// use libfundi::Marketplace;
    ///
    /// # async fn example() -> libfundi::Result<()> {
    /// let marketplace = Marketplace::new()?;
    /// let mut events = marketplace.subscribe();
    ///
    /// tokio::spawn(async move {
    ///     while let Ok(event) = events.recv().await {
    ///         println!("Event: {:?}", event);
    ///     }
    /// });
    /// # Ok(())
    /// # }
    /// ```
    pub fn subscribe(&self) -> EventReceiver {
        self.event_bus.subscribe()
    }
}
