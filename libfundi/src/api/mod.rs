//! Transport abstraction over the marketplace REST API
//!
//! Services never talk to an HTTP client directly. They build an
//! [`ApiRequest`] and hand it to a [`Transport`], which performs exactly one
//! round trip and returns the decoded JSON body. Envelope handling and
//! record mapping happen in [`envelope`], so a transport only has to deal
//! with the wire.
//!
//! # Examples
//!
//! ```no_run
//! use libfundi::api::{ApiRequest, Transport, http::HttpTransport};
//! use libfundi::config::ApiConfig;
//!
//! # async fn example() -> libfundi::Result<()> {
//! let config = ApiConfig {
//!     base_url: "https://api.fundi.example/v1".to_string(),
//!     token: None,
//!     request_timeout: None,
//!     user_agent: None,
//! };
//!
//! let transport = HttpTransport::new(&config)?;
//! let body = transport.send(ApiRequest::get("/categories")).await?;
//! println!("{}", body);
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::error::{ApiError, ApiResult};

pub mod envelope;
pub mod http;

// Available in all builds so integration tests and downstream crates can
// drive services without a server
pub mod mock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

/// A single API call
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the configured base URL, with a leading slash
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::Patch, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query.extend(query);
        self
    }

    pub fn with_page(mut self, page: u32, per_page: u32) -> Self {
        self.query.push(("page".to_string(), page.to_string()));
        self.query.push(("per_page".to_string(), per_page.to_string()));
        self
    }

    /// Attach a JSON body built from a typed payload
    pub fn with_json<T: Serialize>(mut self, payload: &T) -> ApiResult<Self> {
        let body = serde_json::to_value(payload)
            .map_err(|e| ApiError::InvalidRequest(format!("Failed to encode request body: {}", e)))?;
        self.body = Some(body);
        Ok(self)
    }

    /// Value of a query parameter, if present
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// One round trip to the marketplace API
///
/// Implementations must perform exactly one request per call and never
/// retry. Non-2xx statuses and undecodable bodies are reported as
/// [`ApiError`] values, never as panics.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the request and return the JSON body
    ///
    /// An empty response body is returned as `Value::Null`.
    async fn send(&self, request: ApiRequest) -> ApiResult<Value>;

    /// Short name used in logs (e.g. "http", "mock")
    fn name(&self) -> &str;
}
