//! Upstream source abstraction
//!
//! A source knows how to fetch one payload and which resolver turns its
//! remote references into URLs. The resolver may carry per-fetch state
//! (an access token), so it comes back with the payload.

use crate::error::{UpstreamError, UpstreamResult};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde_json::Value;
use statusboard_core::{NoRemoteResolver, Payload, RefResolver};
use std::fmt;
use std::time::Duration;

/// Payload plus the resolver valid for it
pub struct Fetched {
    /// Upstream data
    pub payload: Payload,
    /// Resolver for remote references inside `payload`
    pub resolver: Box<dyn RefResolver>,
}

impl Fetched {
    /// Payload without remote references
    #[must_use]
    pub fn without_remote(payload: Payload) -> Self {
        Self {
            payload,
            resolver: Box::new(NoRemoteResolver),
        }
    }
}

impl fmt::Debug for Fetched {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fetched")
            .field("payload_len", &self.payload.len())
            .finish_non_exhaustive()
    }
}

/// Where the dashboard's records come from
#[async_trait]
pub trait UpstreamSource: Send + Sync {
    /// Stable identity, used as the cache key
    fn identity(&self) -> String;

    /// Fetch one payload
    async fn fetch(&self) -> UpstreamResult<Fetched>;
}

/// Build the shared HTTP client
///
/// # Errors
/// `UpstreamError::Client` if the TLS backend cannot be initialised.
pub fn http_client(timeout: Duration) -> UpstreamResult<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("statusboard/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| UpstreamError::Client(e.to_string()))
}

/// Check status and decode a JSON body
pub(crate) async fn read_json(response: Response, stage: &'static str) -> UpstreamResult<Value> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| UpstreamError::request(stage, &e))?;
    if !status.is_success() {
        return Err(UpstreamError::status(stage, status, text));
    }
    serde_json::from_str(&text).map_err(|e| UpstreamError::decode(stage, &e))
}
