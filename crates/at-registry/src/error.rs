//! Error types for document resolution.

use at_pipeline::ScratchError;

/// Error resolving, validating or fetching a document.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// Registry has no usable record for the document.
    #[error("{0}")]
    DocumentNotFound(String),

    /// Revision history walk did not settle.
    #[error("Can not resolve {name} on datatracker: revision history is cyclic or deeper than {limit}")]
    WalkTooDeep {
        /// Name the walk started from.
        name: String,
        /// Hop limit.
        limit: usize,
    },

    /// Neither a draft nor an RFC name.
    #[error("Can not determine draft/rfc: {0}")]
    UnknownName(String),

    /// URL rejected before any network access.
    #[error("{0}")]
    InvalidUrl(String),

    /// Fetching a document failed.
    #[error("{0}")]
    Download(String),

    /// HTTP request failed (network error, timeout, etc).
    #[error("HTTP request failed: {0}")]
    Http(#[from] ureq::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Scratch storage error.
    #[error(transparent)]
    Scratch(#[from] ScratchError),
}

/// API key verification failure.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No key, or a blank one.
    #[error("API key is missing")]
    Missing,

    /// Registry rejected the key.
    #[error("API key is invalid")]
    Invalid,

    /// Verification endpoint unreachable.
    #[error("HTTP request failed: {0}")]
    Http(#[from] ureq::Error),
}
