//! Statusboard Upstream
//!
//! Everything between the dashboard and the service that owns the data:
//!
//! - [`FeedSource`]: one GET of a pre-flattened JSON feed
//! - [`PodioSource`]: token exchange, paged item listing, embed/file lookups
//! - [`Refresher`]: fetch + pipeline → [`Snapshot`](statusboard_core::Snapshot)
//! - [`SnapshotCache`]: time-bounded snapshot reuse across requests

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod cache;
pub mod error;
pub mod feed;
pub mod podio;
pub mod refresh;
pub mod source;

pub use cache::{CacheStats, SnapshotCache, DEFAULT_TTL};
pub use error::{UpstreamError, UpstreamResult};
pub use feed::FeedSource;
pub use podio::{PodioCredentials, PodioResolver, PodioSource};
pub use refresh::Refresher;
pub use source::{http_client, Fetched, UpstreamSource};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
