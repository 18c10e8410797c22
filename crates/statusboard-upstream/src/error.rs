//! Error types for upstream access
//!
//! Every variant carries the upstream's own error text where there is one,
//! so the operator sees what the service actually said.

/// Errors talking to the upstream service
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// HTTP client could not be built
    #[error("http client setup failed: {0}")]
    Client(String),

    /// Request could not be sent or the body could not be read
    #[error("{stage} request failed: {message}")]
    Request { stage: &'static str, message: String },

    /// Upstream answered with a non-success status
    #[error("{stage} returned {status}: {body}")]
    Status {
        stage: &'static str,
        status: u16,
        body: String,
    },

    /// Authentication succeeded but no access token came back
    #[error("login succeeded but the response has no access_token")]
    MissingToken,

    /// Body is not valid JSON
    #[error("{stage} response is not valid JSON: {message}")]
    Decode { stage: &'static str, message: String },

    /// Body is JSON but not the expected shape
    #[error("{stage} response has unexpected shape: {message}")]
    UnexpectedShape { stage: &'static str, message: String },
}

impl UpstreamError {
    /// Create request error for a stage
    pub fn request(stage: &'static str, source: &reqwest::Error) -> Self {
        Self::Request {
            stage,
            message: source.to_string(),
        }
    }

    /// Create status error for a stage
    pub fn status(stage: &'static str, status: reqwest::StatusCode, body: impl Into<String>) -> Self {
        Self::Status {
            stage,
            status: status.as_u16(),
            body: body.into(),
        }
    }

    /// Create decode error for a stage
    pub fn decode(stage: &'static str, source: &serde_json::Error) -> Self {
        Self::Decode {
            stage,
            message: source.to_string(),
        }
    }

    /// Create shape error for a stage
    pub fn unexpected_shape(stage: &'static str, message: impl Into<String>) -> Self {
        Self::UnexpectedShape {
            stage,
            message: message.into(),
        }
    }
}

/// Result type alias for upstream operations
pub type UpstreamResult<T> = Result<T, UpstreamError>;
