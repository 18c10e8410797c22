//! Configuration
//!
//! A TOML file (optional) with environment variables layered on top.
//! [`AppConfig::validate`] reports every missing required key in one error,
//! before anything talks to the upstream.
//!
//! ```toml
//! access_password = "..."
//!
//! [source]
//! kind = "podio"          # or "feed"; inferred from feed_url when omitted
//! client_id = "..."
//! client_secret = "..."
//! app_id = "..."
//! app_token = "..."
//!
//! [cache]
//! ttl_seconds = 600       # clamped to 600..=1200
//!
//! [http]
//! timeout_seconds = 30
//! resolve_workers = 8
//!
//! [server]
//! host = "127.0.0.1"
//! port = 8080
//! ```

use reqwest::Client;
use serde::Deserialize;
use statusboard_core::extract::DEFAULT_RESOLVE_WORKERS;
use statusboard_upstream::podio::DEFAULT_API_BASE;
use statusboard_upstream::{FeedSource, PodioCredentials, PodioSource, UpstreamSource};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Shortest allowed snapshot lifetime
pub const MIN_TTL_SECONDS: u64 = 600;

/// Longest allowed snapshot lifetime
pub const MAX_TTL_SECONDS: u64 = 1200;

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "STATUSBOARD_CONFIG";

/// Errors loading or validating configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Config file is not valid TOML for this schema
    #[error("failed to parse config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// Required keys are absent
    #[error("missing configuration: {}", .0.join(", "))]
    Missing(Vec<String>),
}

/// Result type alias for configuration
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Which upstream shape to read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Pre-flattened JSON feed
    Feed,
    /// Podio app via the REST API
    Podio,
}

/// Top-level configuration
#[derive(Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Shared dashboard password
    #[serde(default)]
    pub access_password: String,
    /// Upstream connection
    #[serde(default)]
    pub source: SourceConfig,
    /// Snapshot cache
    #[serde(default)]
    pub cache: CacheConfig,
    /// Outbound HTTP
    #[serde(default)]
    pub http: HttpConfig,
    /// Listener
    #[serde(default)]
    pub server: ServerConfig,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("access_password", &redacted(&self.access_password))
            .field("source", &self.source)
            .field("cache", &self.cache)
            .field("http", &self.http)
            .field("server", &self.server)
            .finish()
    }
}

/// Upstream connection parameters
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    /// Explicit source kind
    #[serde(default)]
    pub kind: Option<SourceKind>,
    /// Feed URL
    #[serde(default)]
    pub feed_url: String,
    /// Podio OAuth client id
    #[serde(default)]
    pub client_id: String,
    /// Podio OAuth client secret
    #[serde(default)]
    pub client_secret: String,
    /// Podio app id
    #[serde(default)]
    pub app_id: String,
    /// Podio app token
    #[serde(default)]
    pub app_token: String,
    /// Podio API base URL
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: None,
            feed_url: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            app_id: String::new(),
            app_token: String::new(),
            api_base: default_api_base(),
        }
    }
}

impl fmt::Debug for SourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceConfig")
            .field("kind", &self.kind())
            .field("feed_url", &self.feed_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &redacted(&self.client_secret))
            .field("app_id", &self.app_id)
            .field("app_token", &redacted(&self.app_token))
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl SourceConfig {
    /// Effective kind: explicit, else feed when a feed URL is set
    #[must_use]
    pub fn kind(&self) -> SourceKind {
        match self.kind {
            Some(kind) => kind,
            None if !self.feed_url.trim().is_empty() => SourceKind::Feed,
            None => SourceKind::Podio,
        }
    }

    /// Build the upstream source this section describes
    #[must_use]
    pub fn build(&self, http: Client) -> Arc<dyn UpstreamSource> {
        match self.kind() {
            SourceKind::Feed => Arc::new(FeedSource::new(self.feed_url.trim(), http)),
            SourceKind::Podio => {
                let credentials = PodioCredentials {
                    client_id: self.client_id.clone(),
                    client_secret: self.client_secret.clone(),
                    app_id: self.app_id.clone(),
                    app_token: self.app_token.clone(),
                };
                Arc::new(PodioSource::new(credentials, http).with_api_base(&self.api_base))
            }
        }
    }
}

/// Snapshot cache settings
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Snapshot lifetime in seconds
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_ttl_seconds(),
        }
    }
}

impl CacheConfig {
    /// Snapshot lifetime, clamped to the allowed window
    #[must_use]
    pub fn ttl(&self) -> Duration {
        let clamped = self.ttl_seconds.clamp(MIN_TTL_SECONDS, MAX_TTL_SECONDS);
        if clamped != self.ttl_seconds {
            warn!(
                configured = self.ttl_seconds,
                effective = clamped,
                "cache ttl outside allowed window"
            );
        }
        Duration::from_secs(clamped)
    }
}

/// Outbound HTTP settings
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpConfig {
    /// Whole-request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: f64,
    /// Remote lookups in flight per refresh
    #[serde(default = "default_resolve_workers")]
    pub resolve_workers: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout_seconds(),
            resolve_workers: default_resolve_workers(),
        }
    }
}

impl HttpConfig {
    /// Request timeout
    #[must_use]
    pub fn timeout(&self) -> Duration {
        if self.timeout_seconds.is_finite() && self.timeout_seconds > 0.0 {
            Duration::from_secs_f64(self.timeout_seconds)
        } else {
            Duration::from_secs_f64(default_timeout_seconds())
        }
    }
}

/// Listener settings
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Bind host
    #[serde(default = "default_host")]
    pub host: String,
    /// Bind port
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_ttl_seconds() -> u64 {
    MIN_TTL_SECONDS
}

fn default_timeout_seconds() -> f64 {
    30.0
}

fn default_resolve_workers() -> usize {
    DEFAULT_RESOLVE_WORKERS
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn redacted(secret: &str) -> &'static str {
    if secret.is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    }
}

impl AppConfig {
    /// Parse TOML text
    ///
    /// # Errors
    /// `toml::de::Error` on syntax errors or unknown keys.
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Read and parse a config file
    ///
    /// # Errors
    /// `ConfigError::Read` or `ConfigError::Parse`.
    pub fn load_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// File (if any) with process environment layered on top
    ///
    /// # Errors
    /// `ConfigError::Read` or `ConfigError::Parse` for the file.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let base = match path {
            Some(path) => Self::load_file(path)?,
            None => Self::default(),
        };
        Ok(base.with_env_overrides(|key| std::env::var(key).ok()))
    }

    /// Apply environment overrides; empty values are ignored
    #[must_use]
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let overrides: [(&str, &mut String); 6] = [
            ("LOGIN_KODE", &mut self.access_password),
            ("FEED_URL", &mut self.source.feed_url),
            ("PODIO_CLIENT_ID", &mut self.source.client_id),
            ("PODIO_CLIENT_SECRET", &mut self.source.client_secret),
            ("PODIO_APP_ID", &mut self.source.app_id),
            ("PODIO_APP_TOKEN", &mut self.source.app_token),
        ];
        for (key, slot) in overrides {
            if let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) {
                *slot = value;
            }
        }
        self
    }

    /// Check every required key for the selected source
    ///
    /// # Errors
    /// `ConfigError::Missing` listing each absent key.
    pub fn validate(&self) -> ConfigResult<()> {
        let mut missing = Vec::new();
        let mut require = |value: &str, name: &str| {
            if value.trim().is_empty() {
                missing.push(name.to_string());
            }
        };

        require(&self.access_password, "access_password (LOGIN_KODE)");
        match self.source.kind() {
            SourceKind::Feed => require(&self.source.feed_url, "source.feed_url (FEED_URL)"),
            SourceKind::Podio => {
                require(&self.source.client_id, "source.client_id (PODIO_CLIENT_ID)");
                require(
                    &self.source.client_secret,
                    "source.client_secret (PODIO_CLIENT_SECRET)",
                );
                require(&self.source.app_id, "source.app_id (PODIO_APP_ID)");
                require(&self.source.app_token, "source.app_token (PODIO_APP_TOKEN)");
            }
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Missing(missing))
        }
    }
}
