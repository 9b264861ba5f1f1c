//! In-process transport for tests
//!
//! `MockTransport` answers requests from registered routes instead of the
//! network. Routes match on method and exact path; the handler sees the full
//! request (query and body) so tests can serve different pages, inject
//! failures, or assert on payloads. Every request is recorded.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::time::sleep;

use crate::api::{ApiRequest, Method, Transport};
use crate::error::{ApiError, ApiResult};

type Handler = Arc<dyn Fn(&ApiRequest) -> ApiResult<Value> + Send + Sync>;

/// Configurable transport that never touches the network
#[derive(Clone, Default)]
pub struct MockTransport {
    routes: Arc<Mutex<HashMap<(Method, String), Handler>>>,
    calls: Arc<Mutex<Vec<ApiRequest>>>,
    delay: Duration,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every response (simulates network latency)
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Serve a handler for `method path`
    pub fn route<F>(&self, method: Method, path: &str, handler: F) -> &Self
    where
        F: Fn(&ApiRequest) -> ApiResult<Value> + Send + Sync + 'static,
    {
        lock(&self.routes).insert((method, path.to_string()), Arc::new(handler));
        self
    }

    /// Always answer `method path` with the given body
    pub fn respond(&self, method: Method, path: &str, body: Value) -> &Self {
        self.route(method, path, move |_| Ok(body.clone()))
    }

    /// Always fail `method path` with the given error
    pub fn fail(&self, method: Method, path: &str, error: ApiError) -> &Self {
        self.route(method, path, move |_| Err(error.clone()))
    }

    /// All requests received so far, oldest first
    pub fn calls(&self) -> Vec<ApiRequest> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Number of requests received for `method path`
    pub fn calls_to(&self, method: Method, path: &str) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|call| call.method == method && call.path == path)
            .count()
    }

    pub fn last_call(&self) -> Option<ApiRequest> {
        lock(&self.calls).last().cloned()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: ApiRequest) -> ApiResult<Value> {
        lock(&self.calls).push(request.clone());

        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }

        let handler = lock(&self.routes)
            .get(&(request.method, request.path.clone()))
            .cloned();

        match handler {
            Some(handler) => handler(&request),
            None => Err(ApiError::NotFound(format!(
                "No mock route for {} {}",
                request.method.as_str(),
                request.path
            ))),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
