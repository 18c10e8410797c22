//! Pre-flattened JSON feed
//!
//! One GET returning an array of objects whose keys map straight to
//! columns.

use crate::error::{UpstreamError, UpstreamResult};
use crate::source::{read_json, Fetched, UpstreamSource};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use statusboard_core::Payload;
use tracing::debug;

const STAGE: &str = "feed";

/// Feed source
#[derive(Debug, Clone)]
pub struct FeedSource {
    url: String,
    http: Client,
}

impl FeedSource {
    /// Create feed source
    #[must_use]
    pub fn new(url: impl Into<String>, http: Client) -> Self {
        Self {
            url: url.into(),
            http,
        }
    }

    /// Feed URL
    #[inline]
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl UpstreamSource for FeedSource {
    fn identity(&self) -> String {
        format!("feed:{}", self.url)
    }

    async fn fetch(&self) -> UpstreamResult<Fetched> {
        let response = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(|e| UpstreamError::request(STAGE, &e))?;
        let body = read_json(response, STAGE).await?;

        let Value::Array(entries) = body else {
            return Err(UpstreamError::unexpected_shape(STAGE, "expected a JSON array"));
        };
        debug!(entries = entries.len(), "feed fetched");
        Ok(Fetched::without_remote(Payload::flat(&entries)))
    }
}
