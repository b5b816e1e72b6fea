//! Error types for completion requests.

use thiserror::Error;

/// Error raised by a [`crate::StreamObserver`] callback.
pub type ObserverError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while requesting a completion.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// Transport-level HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status
    #[error("API returned {status}: {body}")]
    Api { status: u16, body: String },

    /// A response body or stream chunk could not be decoded
    #[error("Failed to decode response: {message}")]
    Decode {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// The response contained no choices
    #[error("Response contained no message")]
    EmptyResponse,

    /// No model configured
    #[error("No model configured (set `model` in config.yaml or the file's front matter)")]
    MissingModel,

    /// Front matter overrides have the wrong shape
    #[error("Invalid completion settings: {0}")]
    InvalidSettings(#[source] serde_yaml::Error),

    /// A stream observer failed
    #[error("Stream handler failed: {0}")]
    Observer(#[source] ObserverError),
}

impl CompletionError {
    /// Whether retrying the same request could succeed.
    ///
    /// Client errors other than timeouts and rate limits won't change on retry,
    /// and neither will configuration problems.
    pub fn is_retryable(&self) -> bool {
        match self {
            CompletionError::Http(err) => match err.status() {
                Some(status) => is_retryable_status(status.as_u16()),
                None => true,
            },
            CompletionError::Api { status, .. } => is_retryable_status(*status),
            CompletionError::Decode { .. } | CompletionError::EmptyResponse => true,
            CompletionError::MissingModel
            | CompletionError::InvalidSettings(_)
            | CompletionError::Observer(_) => false,
        }
    }
}

fn is_retryable_status(code: u16) -> bool {
    !(400..500).contains(&code) || code == 408 || code == 429
}

/// Result type for completion operations.
pub type CompletionResult<T> = Result<T, CompletionError>;
