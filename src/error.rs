//! Error types for the storage, LLM, collector and query layers.
//!
//! Each layer owns one enum. Recoverable conditions (a missing document, a
//! single failed translation) are handled where they occur; what reaches
//! these types is meant to be propagated.

use thiserror::Error;

/// Failures raised by [`crate::store::ContentStore`].
#[derive(Error, Debug)]
pub enum StoreError {
    /// Underlying filesystem failure (permission denied, disk full, ...).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A service name that cannot be used as a single directory component.
    #[error("invalid service name: {0:?}")]
    InvalidService(String),

    /// Structured sidecar could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failures raised by the LLM collaborator.
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("LLM API key is not configured")]
    MissingApiKey,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("LLM API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("LLM API returned no choices")]
    EmptyResponse,
}

/// Failures that end a collector run.
///
/// Per-item fetch and LLM failures never show up here; they are logged and
/// the item is skipped or falls back.
#[derive(Error, Debug)]
pub enum CollectorError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("parse failed: {0}")]
    Parse(String),

    #[error("storage failed: {0}")]
    Store(#[from] StoreError),
}

/// Failures raised by [`crate::query::QueryFacade`].
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Source '{0}' not found")]
    UnknownSource(String),

    #[error("Invalid date format: {0}")]
    InvalidDate(String),

    #[error("No content available. Please run the services first.")]
    NoContent,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failures raised while publishing a social post.
#[derive(Error, Debug)]
pub enum PostError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("post rejected with {status}: {body}")]
    Status { status: u16, body: String },
}
