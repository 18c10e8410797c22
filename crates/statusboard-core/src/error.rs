//! Error types for the core pipeline
//!
//! Two families live here:
//! - Field-level extraction errors, which are always absorbed by the
//!   extractor and turn into an empty value
//! - Remote reference resolution errors, reported by [`RefResolver`]
//!   implementations and likewise degraded to an empty value
//!
//! Transport and configuration failures belong to the crates that talk to
//! the outside world.
//!
//! [`RefResolver`]: crate::extract::RefResolver

use crate::extract::RemoteRef;

/// Errors while reading a single typed field out of an upstream record
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    /// Field entry is not a JSON object with the expected keys
    #[error("malformed field entry: {0}")]
    MalformedField(String),

    /// Field value is present but lacks the nested key its type requires
    #[error("field '{key}' of type '{field_type}' has no '{expected}'")]
    MissingNested {
        key: String,
        field_type: String,
        expected: &'static str,
    },

    /// Record is not a JSON object
    #[error("record is not an object")]
    NotAnObject,
}

impl ExtractError {
    /// Create missing-nested error for a field
    pub fn missing_nested(
        key: impl Into<String>,
        field_type: impl Into<String>,
        expected: &'static str,
    ) -> Self {
        Self::MissingNested {
            key: key.into(),
            field_type: field_type.into(),
            expected,
        }
    }
}

/// Errors while resolving an embed or file reference against the source
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// Source does not support remote lookups (e.g. a flat feed)
    #[error("remote resolution not supported for {0}")]
    Unsupported(RemoteRef),

    /// Lookup request failed
    #[error("lookup of {reference} failed: {message}")]
    LookupFailed { reference: RemoteRef, message: String },

    /// Lookup succeeded but the response carried no usable URL
    #[error("no url in response for {0}")]
    NoUrl(RemoteRef),
}

impl ResolveError {
    /// Create lookup failure for a reference
    pub fn lookup_failed(reference: RemoteRef, message: impl Into<String>) -> Self {
        Self::LookupFailed {
            reference,
            message: message.into(),
        }
    }
}

/// Result type alias for reference resolution
pub type ResolveResult<T> = Result<T, ResolveError>;
