use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::models::ConfigError;

/// Main error type for promptbatch
///
/// Only errors that stop the whole run end up here. Failures of a single
/// input file are [`TaskError`]s and are recorded in the run summary instead.
#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("API client error: {0}")]
    Api(#[from] ApiError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Init failed: {0}")]
    Init(String),
}

/// Errors related to the completion API
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("HTTP error: {status} - {message}")]
    Status { status: u16, message: String },

    #[error("Request timeout after {0:?}")]
    Timeout(Duration),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl ApiError {
    /// Check if the service rejected the credential
    pub fn is_auth(&self) -> bool {
        matches!(self, ApiError::Status { status: 401 | 403, .. })
    }

    pub fn is_rate_limit(&self) -> bool {
        matches!(self, ApiError::Status { status: 429, .. })
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout(Duration::ZERO)
        } else if let Some(status) = err.status() {
            ApiError::Status {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else if err.is_decode() {
            ApiError::MalformedResponse(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

/// Failure of a single input file
#[derive(Error, Debug)]
pub enum TaskError {
    #[error("Failed to read input {0}: {1}")]
    Read(PathBuf, std::io::Error),

    #[error("Input file is empty: {0}")]
    EmptyInput(PathBuf),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Failed to write output {0}: {1}")]
    Write(PathBuf, std::io::Error),

    #[error("Output {output} is already produced by {claimed_by}")]
    OutputCollision { output: PathBuf, claimed_by: PathBuf },

    #[error("Task panicked: {0}")]
    Panicked(String),
}

impl TaskError {
    /// Advice for failures the user can act on before the next run
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            TaskError::Api(api) if api.is_auth() => Some("check OPENAI_API_KEY or openai.api_key"),
            TaskError::Api(api) if api.is_rate_limit() => Some("rate limited; lower --max_concurrent"),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, BatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_classification() {
        let auth = ApiError::Status {
            status: 401,
            message: "Incorrect API key".to_string(),
        };
        assert!(auth.is_auth());
        assert!(!auth.is_rate_limit());

        let limited = ApiError::Status {
            status: 429,
            message: "Rate limit reached".to_string(),
        };
        assert!(limited.is_rate_limit());
        assert!(!ApiError::Timeout(Duration::from_secs(30)).is_auth());
    }

    #[test]
    fn test_error_display() {
        let err = ApiError::Status {
            status: 500,
            message: "server error".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP error: 500 - server error");
        assert_eq!(
            ApiError::Timeout(Duration::from_secs(30)).to_string(),
            "Request timeout after 30s"
        );

        let task = TaskError::from(ApiError::Network("refused".to_string()));
        assert_eq!(task.to_string(), "API error: Network error: refused");
    }

    #[test]
    fn test_task_error_hint() {
        let auth = TaskError::from(ApiError::Status {
            status: 403,
            message: "forbidden".to_string(),
        });
        assert!(auth.hint().unwrap().contains("OPENAI_API_KEY"));

        let limited = TaskError::from(ApiError::Status {
            status: 429,
            message: "slow down".to_string(),
        });
        assert!(limited.hint().unwrap().contains("max_concurrent"));

        assert!(TaskError::from(ApiError::Network("reset".to_string())).hint().is_none());
        assert!(TaskError::EmptyInput(PathBuf::from("a.txt")).hint().is_none());
    }

    #[test]
    fn test_config_error_wraps() {
        let err = BatchError::from(ConfigError::NoPrompt);
        assert_eq!(err.to_string(), "Configuration error: No prompt specified");
    }
}
