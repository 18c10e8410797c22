//! Statusboard Server
//!
//! The operator-facing side of the dashboard:
//!
//! - [`config`]: TOML + environment configuration, validated up front
//! - [`gate`]: shared-password check and session store
//! - [`render`]: HTML for the login form and the dashboard table
//! - [`routes`]: warp filters tying gate, cache and renderer together

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod config;
pub mod gate;
pub mod render;
pub mod routes;

pub use config::{AppConfig, ConfigError, ConfigResult, SourceKind};
pub use gate::{check_password, AccessContext, SessionStore, SESSION_COOKIE};
pub use routes::{routes, AppState};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
