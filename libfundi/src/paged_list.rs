//! Paged list state with filters
//!
//! A [`PagedList`] owns the records a screen shows for one server-side list
//! (jobs, fundis, portfolios), along with the page counter, the total page
//! count reported by the server, and the filters the records were fetched
//! with. It is the only thing that mutates that state.
//!
//! # Re-entrancy
//!
//! At most one request is in flight per list. Any operation started while
//! another is running returns [`LoadOutcome::Busy`] without touching the
//! network. The state lock is never held across an await, so a list can be
//! shared between tasks behind an `Arc`.
//!
//! If an in-flight operation is dropped (its screen went away) the busy flag
//! is released and a pending `load_more` page increment is rolled back.
//!
//! # Example
//!
//! ```no_run
//! use libfundi::Marketplace;
//! use libfundi::filters::JobFilters;
//!
//! # async fn example(marketplace: Marketplace) {
//! let jobs = marketplace.job_list();
//!
//! jobs.load(JobFilters::default(), true).await;
//! while jobs.has_more() {
//!     jobs.load_more().await;
//! }
//! println!("{} jobs", jobs.len());
//! # }
//! ```

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::error::{ApiError, ApiResult};
use crate::filters::{Filters, Matches};
use crate::service::events::{Event, EventBus};
use crate::types::Page;

/// Something that can fetch one page of `T` for filters `F`
#[async_trait]
pub trait PageSource<T, F>: Send + Sync {
    async fn fetch_page(&self, filters: &F, page: u32, per_page: u32) -> ApiResult<Page<T>>;
}

/// Result of a list operation
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// The request succeeded; `count` records were added
    Loaded { count: usize },
    /// Another operation is in flight; nothing was requested
    Busy,
    /// There is no further page; nothing was requested
    Exhausted,
    /// The request failed; its user-facing message is also stored
    Failed(ApiError),
}

impl LoadOutcome {
    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadOutcome::Loaded { .. })
    }

    /// The failure, if the operation failed
    pub fn error(&self) -> Option<&ApiError> {
        match self {
            LoadOutcome::Failed(error) => Some(error),
            _ => None,
        }
    }
}

/// Published state of a list
#[derive(Debug, Clone, PartialEq)]
pub struct ListState<T, F> {
    pub items: Vec<T>,
    pub current_page: u32,
    pub total_pages: u32,
    /// Filters of the most recent request
    pub filters: F,
    /// Filters the held records were fetched with
    pub loaded_filters: Option<F>,
    pub loading: bool,
    pub loading_more: bool,
    pub error: Option<String>,
}

impl<T, F: PartialEq> ListState<T, F> {
    fn new(filters: F) -> Self {
        Self {
            items: Vec::new(),
            current_page: 1,
            total_pages: 0,
            filters,
            loaded_filters: None,
            loading: false,
            loading_more: false,
            error: None,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.loading || self.loading_more
    }

    pub fn has_more(&self) -> bool {
        self.loaded_filters.as_ref() == Some(&self.filters) && self.current_page < self.total_pages
    }
}

pub struct PagedList<T, F> {
    name: String,
    source: Arc<dyn PageSource<T, F>>,
    per_page: u32,
    load_more_threshold: usize,
    state: Mutex<ListState<T, F>>,
    events: Option<EventBus>,
}

/// Releases the busy flag if the owning future is dropped mid-request
struct InFlight<'a, T, F: PartialEq> {
    state: &'a Mutex<ListState<T, F>>,
    rollback_page: Option<u32>,
    done: bool,
}

impl<T, F: PartialEq> Drop for InFlight<'_, T, F> {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        let mut state = lock(self.state);
        state.loading = false;
        state.loading_more = false;
        if let Some(page) = self.rollback_page {
            state.current_page = page;
        }
        tracing::debug!("List request cancelled before completion");
    }
}

fn lock<T, F>(state: &Mutex<ListState<T, F>>) -> MutexGuard<'_, ListState<T, F>> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<T, F> PagedList<T, F>
where
    T: Clone + Send,
    F: Filters + Matches<T>,
{
    pub fn new(name: impl Into<String>, source: Arc<dyn PageSource<T, F>>, per_page: u32) -> Self {
        Self {
            name: name.into(),
            source,
            per_page: per_page.max(1),
            load_more_threshold: 3,
            state: Mutex::new(ListState::new(F::default())),
            events: None,
        }
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_load_more_threshold(mut self, threshold: usize) -> Self {
        self.load_more_threshold = threshold;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn emit(&self, event: Event) {
        if let Some(events) = &self.events {
            events.emit(event);
        }
    }

    /// Load a page with `filters`
    ///
    /// With `refresh` the first page replaces the records. Without it the
    /// current page is fetched and appended; if `filters` differ from the
    /// ones the records were fetched with, the call behaves as a refresh.
    /// On failure the records and page counters are left as they were.
    pub async fn load(&self, filters: F, refresh: bool) -> LoadOutcome {
        let (page, refresh) = {
            let mut state = lock(&self.state);
            if state.is_busy() {
                return LoadOutcome::Busy;
            }
            let refresh = refresh || state.loaded_filters.as_ref() != Some(&filters);
            let page = if refresh { 1 } else { state.current_page.max(1) };
            state.filters = filters.clone();
            state.loading = true;
            state.error = None;
            (page, refresh)
        };

        let mut in_flight = InFlight {
            state: &self.state,
            rollback_page: None,
            done: false,
        };

        tracing::debug!(list = %self.name, page, refresh, "Loading list");
        self.emit(Event::ListLoading {
            list: self.name.clone(),
            page,
            refresh,
        });

        let result = match filters.validate() {
            Ok(()) => self.source.fetch_page(&filters, page, self.per_page).await,
            Err(e) => Err(e),
        };
        in_flight.done = true;

        let (outcome, event) = {
            let mut state = lock(&self.state);
            state.loading = false;
            match result {
                Ok(fetched) => {
                    let items: Vec<T> = fetched
                        .items
                        .into_iter()
                        .filter(|item| filters.matches(item))
                        .collect();
                    let count = items.len();
                    if refresh {
                        state.items = items;
                    } else {
                        state.items.extend(items);
                    }
                    state.current_page = page;
                    state.total_pages = fetched.total_pages;
                    state.loaded_filters = Some(filters);
                    (
                        LoadOutcome::Loaded { count },
                        Event::ListLoaded {
                            list: self.name.clone(),
                            page,
                            total_pages: state.total_pages,
                            items: state.items.len(),
                        },
                    )
                }
                Err(e) => {
                    let message = e.user_message();
                    tracing::warn!(list = %self.name, page, "List load failed: {}", e);
                    state.error = Some(message.clone());
                    (
                        LoadOutcome::Failed(e),
                        Event::ListFailed {
                            list: self.name.clone(),
                            page,
                            message,
                        },
                    )
                }
            }
        };

        self.emit(event);
        outcome
    }

    /// Fetch and append the next page
    ///
    /// Does nothing when another operation is in flight or the last page
    /// has been reached. A failed request puts the page counter back.
    pub async fn load_more(&self) -> LoadOutcome {
        let (page, filters) = {
            let mut state = lock(&self.state);
            if state.is_busy() {
                return LoadOutcome::Busy;
            }
            if !state.has_more() {
                return LoadOutcome::Exhausted;
            }
            state.current_page += 1;
            state.loading_more = true;
            state.error = None;
            (state.current_page, state.filters.clone())
        };

        let mut in_flight = InFlight {
            state: &self.state,
            rollback_page: Some(page - 1),
            done: false,
        };

        tracing::debug!(list = %self.name, page, "Loading next page");
        self.emit(Event::ListLoading {
            list: self.name.clone(),
            page,
            refresh: false,
        });

        let result = self.source.fetch_page(&filters, page, self.per_page).await;
        in_flight.done = true;

        let (outcome, event) = {
            let mut state = lock(&self.state);
            state.loading_more = false;
            match result {
                Ok(fetched) => {
                    let items: Vec<T> = fetched
                        .items
                        .into_iter()
                        .filter(|item| filters.matches(item))
                        .collect();
                    let count = items.len();
                    state.items.extend(items);
                    state.total_pages = fetched.total_pages;
                    (
                        LoadOutcome::Loaded { count },
                        Event::ListLoaded {
                            list: self.name.clone(),
                            page,
                            total_pages: state.total_pages,
                            items: state.items.len(),
                        },
                    )
                }
                Err(e) => {
                    let message = e.user_message();
                    tracing::warn!(list = %self.name, page, "Loading next page failed: {}", e);
                    state.current_page = page - 1;
                    state.error = Some(message.clone());
                    (
                        LoadOutcome::Failed(e),
                        Event::ListFailed {
                            list: self.name.clone(),
                            page,
                            message,
                        },
                    )
                }
            }
        };

        self.emit(event);
        outcome
    }

    /// Reload the first page with the current filters
    pub async fn refresh(&self) -> LoadOutcome {
        let filters = self.filters();
        self.load(filters, true).await
    }

    /// Re-run the last request after a failure
    pub async fn retry(&self) -> LoadOutcome {
        self.refresh().await
    }

    pub async fn apply_filters(&self, filters: F) -> LoadOutcome {
        self.load(filters, true).await
    }

    pub async fn clear_filters(&self) -> LoadOutcome {
        self.load(F::default(), true).await
    }

    pub fn snapshot(&self) -> ListState<T, F> {
        lock(&self.state).clone()
    }

    pub fn items(&self) -> Vec<T> {
        lock(&self.state).items.clone()
    }

    pub fn len(&self) -> usize {
        lock(&self.state).items.len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.state).items.is_empty()
    }

    pub fn current_page(&self) -> u32 {
        lock(&self.state).current_page
    }

    pub fn total_pages(&self) -> u32 {
        lock(&self.state).total_pages
    }

    pub fn filters(&self) -> F {
        lock(&self.state).filters.clone()
    }

    pub fn error(&self) -> Option<String> {
        lock(&self.state).error.clone()
    }

    pub fn is_busy(&self) -> bool {
        lock(&self.state).is_busy()
    }

    pub fn has_more(&self) -> bool {
        lock(&self.state).has_more()
    }

    /// Whether `index` is within `threshold` records of the end
    pub fn is_near_end(&self, index: usize, threshold: usize) -> bool {
        let len = self.len();
        len > 0 && index.saturating_add(threshold) >= len
    }

    /// Whether showing record `index` should trigger [`load_more`](Self::load_more)
    pub fn should_load_more(&self, index: usize) -> bool {
        let state = lock(&self.state);
        let len = state.items.len();
        !state.is_busy()
            && state.has_more()
            && len > 0
            && index.saturating_add(self.load_more_threshold) >= len
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, Default, PartialEq)]
    struct EvenOnly(bool);

    impl Filters for EvenOnly {
        fn to_query(&self) -> Vec<(String, String)> {
            if self.0 {
                vec![("even".to_string(), "true".to_string())]
            } else {
                Vec::new()
            }
        }
    }

    impl Matches<u32> for EvenOnly {
        fn matches(&self, item: &u32) -> bool {
            !self.0 || item % 2 == 0
        }
    }

    /// Serves 1..=total split into pages, ignoring the filter server-side
    struct Numbers {
        total: u32,
        calls: AtomicUsize,
        fail_page: Option<u32>,
    }

    #[async_trait]
    impl PageSource<u32, EvenOnly> for Numbers {
        async fn fetch_page(&self, _filters: &EvenOnly, page: u32, per_page: u32) -> ApiResult<Page<u32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_page == Some(page) {
                return Err(ApiError::Network("connection reset".to_string()));
            }
            let start = (page - 1) * per_page + 1;
            let end = (page * per_page).min(self.total);
            Ok(Page {
                items: (start..=end).collect(),
                current_page: page,
                total_pages: self.total.div_ceil(per_page),
                total: Some(u64::from(self.total)),
                per_page,
            })
        }
    }

    fn list(total: u32, fail_page: Option<u32>) -> (PagedList<u32, EvenOnly>, Arc<Numbers>) {
        let source = Arc::new(Numbers {
            total,
            calls: AtomicUsize::new(0),
            fail_page,
        });
        let list = PagedList::new("numbers", source.clone() as Arc<dyn PageSource<u32, EvenOnly>>, 4);
        (list, source)
    }

    #[tokio::test]
    async fn test_initial_state() {
        let (list, source) = list(10, None);
        assert!(list.is_empty());
        assert_eq!(list.current_page(), 1);
        assert_eq!(list.total_pages(), 0);
        assert!(!list.has_more());
        assert_eq!(list.load_more().await, LoadOutcome::Exhausted);
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_load_then_load_more_appends() {
        let (list, _) = list(10, None);

        assert_eq!(list.load(EvenOnly(false), true).await, LoadOutcome::Loaded { count: 4 });
        assert_eq!(list.items(), vec![1, 2, 3, 4]);
        assert_eq!(list.total_pages(), 3);

        assert!(list.load_more().await.is_loaded());
        assert!(list.load_more().await.is_loaded());
        assert_eq!(list.items(), (1..=10).collect::<Vec<_>>());
        assert_eq!(list.current_page(), 3);
        assert_eq!(list.load_more().await, LoadOutcome::Exhausted);
    }

    #[tokio::test]
    async fn test_non_refresh_load_with_new_filters_replaces() {
        let (list, _) = list(10, None);
        list.load(EvenOnly(false), true).await;
        list.load_more().await;

        list.load(EvenOnly(true), false).await;
        assert_eq!(list.items(), vec![2, 4]);
        assert_eq!(list.current_page(), 1);
    }

    #[tokio::test]
    async fn test_local_filter_drops_non_matching() {
        let (list, _) = list(10, None);
        let outcome = list.apply_filters(EvenOnly(true)).await;
        assert_eq!(outcome, LoadOutcome::Loaded { count: 2 });
        assert!(list.items().iter().all(|n| n % 2 == 0));
    }

    #[tokio::test]
    async fn test_failed_load_more_rolls_back_page() {
        let (list, _) = list(10, Some(2));
        list.load(EvenOnly(false), true).await;

        let outcome = list.load_more().await;
        assert!(matches!(outcome, LoadOutcome::Failed(_)));
        assert_eq!(list.current_page(), 1);
        assert_eq!(list.items(), vec![1, 2, 3, 4]);
        assert!(list.error().is_some());
        assert!(!list.is_busy());
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_records() {
        let (list, _) = list(10, Some(1));
        let outcome = list.load(EvenOnly(false), true).await;
        assert!(matches!(outcome, LoadOutcome::Failed(_)));
        assert!(list.is_empty());
        assert!(!list.has_more());
    }

    #[tokio::test]
    async fn test_near_end_threshold() {
        let (list, _) = list(10, None);
        list.load(EvenOnly(false), true).await;

        assert!(!list.is_near_end(0, 2));
        assert!(list.is_near_end(2, 2));
        assert!(list.should_load_more(3));
        assert!(!list.should_load_more(0));

        assert!(list.is_near_end(usize::MAX, usize::MAX));
        assert!(list.should_load_more(usize::MAX));
    }
}
