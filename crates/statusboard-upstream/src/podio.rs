//! Podio API client
//!
//! Three steps per fetch:
//! 1. app-grant token exchange (`POST /oauth/token`)
//! 2. paged item listing (`GET /item/app/{app_id}/?limit=&offset=`)
//! 3. embed / file lookups, driven later by the extractor through
//!    [`PodioResolver`]

use crate::error::{UpstreamError, UpstreamResult};
use crate::source::{read_json, Fetched, UpstreamSource};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use statusboard_core::{Payload, RefResolver, RemoteRef, ResolveError, ResolveResult};
use std::fmt;
use tracing::{debug, info};

/// Production API base URL
pub const DEFAULT_API_BASE: &str = "https://api.podio.com";

/// Items requested per listing page
pub const PAGE_SIZE: usize = 500;

/// Upper bound on listing pages per fetch
pub const MAX_PAGES: usize = 40;

/// App-grant credentials
#[derive(Clone, PartialEq, Eq)]
pub struct PodioCredentials {
    /// OAuth client id
    pub client_id: String,
    /// OAuth client secret
    pub client_secret: String,
    /// App id
    pub app_id: String,
    /// App token
    pub app_token: String,
}

impl fmt::Debug for PodioCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PodioCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("app_id", &self.app_id)
            .field("app_token", &"<redacted>")
            .finish()
    }
}

/// Podio app source
#[derive(Debug, Clone)]
pub struct PodioSource {
    credentials: PodioCredentials,
    http: Client,
    api_base: String,
    page_size: usize,
}

impl PodioSource {
    /// Create source against the production API
    #[must_use]
    pub fn new(credentials: PodioCredentials, http: Client) -> Self {
        Self {
            credentials,
            http,
            api_base: DEFAULT_API_BASE.to_string(),
            page_size: PAGE_SIZE,
        }
    }

    /// With a different API base URL
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// With a different page size
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Exchange app credentials for an access token
    ///
    /// # Errors
    /// - `UpstreamError::Status` on a non-2xx login response
    /// - `UpstreamError::MissingToken` if the response lacks `access_token`
    pub async fn authenticate(&self) -> UpstreamResult<String> {
        const STAGE: &str = "login";
        let form = [
            ("grant_type", "app"),
            ("app_id", self.credentials.app_id.as_str()),
            ("app_token", self.credentials.app_token.as_str()),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
        ];
        let response = self
            .http
            .post(format!("{}/oauth/token", self.api_base))
            .form(&form)
            .send()
            .await
            .map_err(|e| UpstreamError::request(STAGE, &e))?;
        let body = read_json(response, STAGE).await?;

        body.get("access_token")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .ok_or(UpstreamError::MissingToken)
    }

    /// List every item of the app
    ///
    /// # Errors
    /// `UpstreamError::Status` on a non-2xx page.
    pub async fn list_items(&self, token: &str) -> UpstreamResult<Vec<Value>> {
        const STAGE: &str = "item listing";
        let url = format!("{}/item/app/{}/", self.api_base, self.credentials.app_id);
        let mut items: Vec<Value> = Vec::new();

        for page in 0..MAX_PAGES {
            let offset = page * self.page_size;
            let response = self
                .http
                .get(&url)
                .bearer_auth(token)
                .query(&[("limit", self.page_size), ("offset", offset)])
                .send()
                .await
                .map_err(|e| UpstreamError::request(STAGE, &e))?;
            let body = read_json(response, STAGE).await?;

            let total = body
                .get("filtered")
                .or_else(|| body.get("total"))
                .and_then(Value::as_u64)
                .and_then(|t| usize::try_from(t).ok());
            let page_items = match body.get("items") {
                Some(Value::Array(page_items)) => page_items.clone(),
                None | Some(Value::Null) => Vec::new(),
                Some(_) => {
                    return Err(UpstreamError::unexpected_shape(STAGE, "items is not an array"))
                }
            };

            let received = page_items.len();
            items.extend(page_items);
            debug!(page, received, total = ?total, "item page fetched");

            if received < self.page_size || total.is_some_and(|t| items.len() >= t) {
                break;
            }
        }
        Ok(items)
    }

    /// Resolver bound to an access token
    #[must_use]
    pub fn resolver(&self, token: impl Into<String>) -> PodioResolver {
        PodioResolver {
            http: self.http.clone(),
            api_base: self.api_base.clone(),
            token: token.into(),
        }
    }
}

#[async_trait]
impl UpstreamSource for PodioSource {
    fn identity(&self) -> String {
        format!("podio:app/{}", self.credentials.app_id)
    }

    async fn fetch(&self) -> UpstreamResult<Fetched> {
        let token = self.authenticate().await?;
        let items = self.list_items(&token).await?;
        info!(items = items.len(), app_id = %self.credentials.app_id, "podio items fetched");
        Ok(Fetched {
            payload: Payload::records(&items),
            resolver: Box::new(self.resolver(token)),
        })
    }
}

/// Embed and file lookups with a bearer token
#[derive(Clone)]
pub struct PodioResolver {
    http: Client,
    api_base: String,
    token: String,
}

impl fmt::Debug for PodioResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PodioResolver")
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl RefResolver for PodioResolver {
    async fn resolve(&self, reference: RemoteRef) -> ResolveResult<String> {
        let (url, keys): (String, &[&str]) = match reference {
            RemoteRef::Embed(id) => (
                format!("{}/embed/{id}", self.api_base),
                &["resolved_url", "original_url", "url"],
            ),
            RemoteRef::File(id) => (format!("{}/file/{id}", self.api_base), &["link"]),
        };

        let response = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| ResolveError::lookup_failed(reference, e.to_string()))?;
        let body = read_json(response, "lookup")
            .await
            .map_err(|e| ResolveError::lookup_failed(reference, e.to_string()))?;

        keys.iter()
            .filter_map(|k| body.get(*k).and_then(Value::as_str))
            .map(str::trim)
            .find(|s| !s.is_empty())
            .map(str::to_string)
            .ok_or(ResolveError::NoUrl(reference))
    }
}
