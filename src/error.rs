//! Error types for the cache layer
//!
//! Provides unified error handling using thiserror.

use std::fmt;

use thiserror::Error;
use tower::BoxError;

// == Body Accessor ==
/// Body read forms that a materialized response cannot serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyAccessor {
    /// Raw byte buffer
    Bytes,
    /// Binary large object
    Blob,
    /// Multipart / urlencoded form data
    FormData,
}

impl fmt::Display for BodyAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BodyAccessor::Bytes => "bytes",
            BodyAccessor::Blob => "blob",
            BodyAccessor::FormData => "form data",
        };
        f.write_str(name)
    }
}

// == Cache Error Enum ==
/// Unified error type for the cache layer.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The request cannot be read as a cacheable request
    #[error("Invalid request argument supplied: {0}")]
    InvalidArgument(String),

    /// A binary accessor was called on a text-buffered response
    #[error("simple-cache middleware cannot be used with {0} response bodies")]
    UnsupportedBodyAccess(BodyAccessor),

    /// The downstream stage failed, or its body could not be drained
    #[error("Downstream failure: {0}")]
    Downstream(#[source] BoxError),

    /// The buffered body is not valid JSON for the requested type
    #[error("Response body is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

// == Result Type Alias ==
/// Convenience Result type for the cache layer.
pub type Result<T> = std::result::Result<T, CacheError>;
