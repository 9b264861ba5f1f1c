//! Error types for the Fundi client core

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FundiError>;

/// Result type returned by every service call
pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Error, Debug)]
pub enum FundiError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl FundiError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            FundiError::InvalidInput(_) => 3,
            FundiError::Api(ApiError::InvalidRequest(_)) => 3,
            FundiError::Api(ApiError::Unauthorized(_)) => 2,
            FundiError::Api(_) => 1,
            FundiError::Config(_) => 1,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Failures surfaced by the API boundary
///
/// Every transport, status and decoding problem is normalized into one of
/// these variants before it reaches a caller. The variants carry enough
/// context for logs; [`ApiError::user_message`] renders the text a user
/// should see.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Not authorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Server returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    /// Message suitable for showing next to a retry button
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Network(_) => {
                "Could not reach the server. Check your connection and try again.".to_string()
            }
            ApiError::Unauthorized(_) => {
                "Your session has expired. Please sign in again.".to_string()
            }
            ApiError::NotFound(what) => format!("{} could not be found.", what),
            ApiError::Status { status, message } if message.is_empty() => {
                format!("The server could not complete the request ({}).", status)
            }
            ApiError::Status { message, .. } => message.clone(),
            ApiError::Rejected(message) => message.clone(),
            ApiError::Parse(_) => {
                "Received an unexpected response from the server.".to_string()
            }
            ApiError::InvalidRequest(message) => message.clone(),
        }
    }

    /// Whether retrying the same call could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Network(_) => true,
            ApiError::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_invalid_input() {
        let error = FundiError::InvalidInput("Empty title".to_string());
        assert_eq!(error.exit_code(), 3);
    }

    #[test]
    fn test_exit_code_invalid_request_matches_invalid_input() {
        let error = FundiError::Api(ApiError::InvalidRequest("budget".to_string()));
        assert_eq!(error.exit_code(), 3);
    }

    #[test]
    fn test_exit_code_unauthorized() {
        let error = FundiError::Api(ApiError::Unauthorized("token expired".to_string()));
        assert_eq!(error.exit_code(), 2);
    }

    #[test]
    fn test_exit_code_other_api_errors() {
        let errors = [
            ApiError::Network("refused".to_string()),
            ApiError::NotFound("Job 7".to_string()),
            ApiError::Status {
                status: 500,
                message: String::new(),
            },
            ApiError::Rejected("closed".to_string()),
            ApiError::Parse("missing field".to_string()),
        ];

        for error in errors {
            assert_eq!(FundiError::Api(error).exit_code(), 1);
        }
    }

    #[test]
    fn test_exit_code_config_error() {
        let error = FundiError::Config(ConfigError::MissingField("api.base_url".to_string()));
        assert_eq!(error.exit_code(), 1);
    }

    #[test]
    fn test_error_message_formatting() {
        let error = FundiError::Api(ApiError::Rejected("Job is closed".to_string()));
        assert_eq!(error.to_string(), "API error: Request rejected: Job is closed");

        let error = FundiError::Config(ConfigError::InvalidValue {
            field: "paging.page_size".to_string(),
            reason: "must be between 1 and 100".to_string(),
        });
        assert_eq!(
            error.to_string(),
            "Configuration error: Invalid value for paging.page_size: must be between 1 and 100"
        );
    }

    #[test]
    fn test_user_message_hides_transport_detail() {
        let error = ApiError::Network("tcp connect error: Connection refused (os error 111)".to_string());
        let message = error.user_message();
        assert!(!message.contains("os error"));
        assert!(message.contains("connection"));
    }

    #[test]
    fn test_user_message_passes_server_message_through() {
        let error = ApiError::Rejected("You have already applied to this job".to_string());
        assert_eq!(error.user_message(), "You have already applied to this job");

        let error = ApiError::Status {
            status: 422,
            message: "Deadline must be in the future".to_string(),
        };
        assert_eq!(error.user_message(), "Deadline must be in the future");
    }

    #[test]
    fn test_user_message_status_without_body() {
        let error = ApiError::Status {
            status: 503,
            message: String::new(),
        };
        assert!(error.user_message().contains("503"));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(ApiError::Network("timeout".to_string()).is_retryable());
        assert!(ApiError::Status { status: 502, message: String::new() }.is_retryable());
        assert!(!ApiError::Status { status: 422, message: String::new() }.is_retryable());
        assert!(!ApiError::Unauthorized("x".to_string()).is_retryable());
        assert!(!ApiError::Parse("x".to_string()).is_retryable());
    }

    #[test]
    fn test_api_error_clone_and_eq() {
        let original = ApiError::NotFound("Portfolio 3".to_string());
        assert_eq!(original.clone(), original);
    }
}
