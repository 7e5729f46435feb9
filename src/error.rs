//! Unified error type for stashbridge.
//!
//! All failures funnel into [`Error`], which carries enough context for API
//! handlers to derive an HTTP status code via [`Error::http_status`]. Provider
//! operations never surface these to Plex — they degrade to empty responses —
//! but the admin API reports them directly.

use std::fmt;

/// Unified error type covering all failure modes in stashbridge.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested entity could not be found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "stash", "scene").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// A conflicting resource already exists.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Request data failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A Stash request exceeded its deadline.
    #[error("Stash request timed out after {0:?}")]
    SourceTimeout(std::time::Duration),

    /// A Stash backend returned a non-2xx status or GraphQL-level errors.
    #[error("Stash protocol error: {0}")]
    SourceProtocol(String),

    /// Configuration is malformed or inconsistent.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::NotFound { .. } => 404,
            Error::Conflict(_) => 409,
            Error::Validation(_) => 400,
            Error::SourceTimeout(_) => 504,
            Error::SourceProtocol(_) => 502,
            Error::Config(_) => 500,
            Error::Internal(_) => 500,
        }
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
