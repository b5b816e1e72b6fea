//! Error types for transcript operations.

use thiserror::Error;

/// Errors that can occur when reading or writing transcripts.
#[derive(Debug, Error)]
pub enum TranscriptError {
    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Front matter is present but isn't a YAML mapping
    #[error("Malformed config: {message}")]
    MalformedConfig {
        message: String,
        #[source]
        source: Option<serde_yaml::Error>,
    },

    /// Config could not be written back as YAML
    #[error("Failed to encode config: {0}")]
    ConfigEncode(#[source] serde_yaml::Error),
}

/// Problems that make a transcript unusable as a completion request.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Nothing left to send once trailing blank messages are dropped
    #[error("Transcript has no messages with content")]
    NoMessages,

    /// Only a system prompt, nothing for the model to answer
    #[error("Transcript has no user message")]
    NoUserMessage,
}

/// Result type for transcript operations.
pub type TranscriptResult<T> = Result<T, TranscriptError>;
