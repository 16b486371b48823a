//! Error types for earnings document operations.
//!
//! This module defines [`EarningsError`] which covers the failures that can occur
//! while talking to a source, caching candidates, or reading a fetched document.
//!
//! Two conditions are deliberately *not* errors: a document whose period cannot be
//! inferred carries an unknown label, and a document whose content cannot be
//! inspected yields an unverified outcome.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur during earnings document operations.
#[derive(Error, Debug)]
pub enum EarningsError {
    /// Network-related errors (connection failures, HTTP status, etc.).
    #[error("Network error: {0}")]
    Network(String),

    /// Rate limit exceeded by a source.
    #[error("Rate limited by {source_id}: retry after {retry_after:?}")]
    RateLimited {
        /// The source that rate limited the request.
        source_id: String,
        /// Suggested time to wait before retrying.
        retry_after: Option<Duration>,
    },

    /// A source did not answer within its time budget.
    #[error("Source {source_id} timed out after {after:?}")]
    Timeout {
        /// The source that timed out.
        source_id: String,
        /// The budget that was exceeded.
        after: Duration,
    },

    /// The requested company was not found.
    #[error("Company not found: {0}")]
    CompanyNotFound(String),

    /// Error parsing data returned by a source.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A fetched document could not be read.
    #[error("Unreadable document: {0}")]
    Document(String),

    /// Error interacting with the cache.
    #[error("Cache error: {0}")]
    Cache(String),

    /// No source is configured for the request.
    #[error("Source not configured: {0}")]
    SourceNotConfigured(String),

    /// An invalid parameter was provided.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The requested feature is not supported.
    #[error("Feature not supported: {0}")]
    NotSupported(String),

    /// Any other error.
    #[error("{0}")]
    Other(String),
}

/// Result type alias using [`EarningsError`].
pub type Result<T> = std::result::Result<T, EarningsError>;
