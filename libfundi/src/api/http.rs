//! reqwest-backed transport

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use crate::api::{ApiRequest, Method, Transport};
use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult, ConfigError, Result};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_USER_AGENT: &str = concat!("libfundi/", env!("CARGO_PKG_VERSION"));

/// Transport that talks to the marketplace over HTTPS
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    token: Option<SecretString>,
}

impl HttpTransport {
    /// Build a transport from the `[api]` config section
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the timeout cannot be parsed or the
    /// HTTP client cannot be constructed.
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let timeout = config.timeout()?.unwrap_or(DEFAULT_TIMEOUT);
        let user_agent = config
            .user_agent
            .clone()
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                field: "api".to_string(),
                reason: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    fn url_for(&self, path: &str) -> String {
        build_url(&self.base_url, path)
    }
}

/// Join the base URL and a request path with exactly one slash
pub fn build_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Map a non-2xx status and its body to an [`ApiError`]
///
/// The server's `message` field is preferred when the body is JSON.
pub fn map_status(status: u16, body: &str) -> ApiError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("message")
                .or_else(|| value.get("error"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_default();

    match status {
        401 | 403 => ApiError::Unauthorized(if message.is_empty() {
            format!("server returned {}", status)
        } else {
            message
        }),
        404 => ApiError::NotFound(if message.is_empty() {
            "The requested record".to_string()
        } else {
            message
        }),
        _ => ApiError::Status { status, message },
    }
}

fn map_transport_error(error: reqwest::Error) -> ApiError {
    if error.is_timeout() {
        ApiError::Network(format!("request timed out: {}", error))
    } else if error.is_decode() {
        ApiError::Parse(error.to_string())
    } else {
        ApiError::Network(error.to_string())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> ApiResult<Value> {
        let url = self.url_for(&request.path);
        let request_id = uuid::Uuid::new_v4().to_string();

        tracing::debug!(
            request_id = %request_id,
            method = request.method.as_str(),
            url = %url,
            "Sending API request"
        );

        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self
            .client
            .request(method, &url)
            .header("Accept", "application/json")
            .header("X-Request-Id", &request_id);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token.expose_secret());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(map_transport_error)?;
        let status = response.status();
        let text = response.text().await.map_err(map_transport_error)?;

        if !status.is_success() {
            let error = map_status(status.as_u16(), &text);
            tracing::debug!(
                request_id = %request_id,
                status = status.as_u16(),
                "API request failed: {}",
                error
            );
            return Err(error);
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&text)
            .map_err(|e| ApiError::Parse(format!("response body is not valid JSON: {}", e)))
    }

    fn name(&self) -> &str {
        "http"
    }
}
