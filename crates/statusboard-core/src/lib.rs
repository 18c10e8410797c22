//! Statusboard Core
//!
//! Turns upstream workflow records into the canonical table the dashboard
//! renders.
//!
//! # Stages
//!
//! - **Extract**: typed upstream fields → flat key/value rows, with deferred
//!   remote resolution of embed and file references
//! - **Normalize**: legacy key renames, required columns, whitespace cleanup
//! - **Derive**: responsible party, staleness, highlight category
//! - **Query**: free-text search and flag filters over a shared table
//!
//! # Example
//!
//! ```rust,ignore
//! use statusboard_core::{NoRemoteResolver, Payload, Pipeline, Query, RowFilter};
//!
//! # async fn example(feed: Vec<serde_json::Value>) {
//! let now = chrono::Local::now().naive_local();
//! let table = Pipeline::new()
//!     .run(Payload::flat(&feed), &NoRemoteResolver, now)
//!     .await;
//!
//! let view = Query::new("bager", RowFilter::Stale).apply(&table);
//! println!("{} rows", view.len());
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod derive;
pub mod error;
pub mod extract;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod query;

// Re-exports for convenience
pub use derive::{clean_name, parse_leading_date, resolve_owner, StalenessRule};
pub use error::{ExtractError, ResolveError, ResolveResult};
pub use extract::{
    extract, extract_field, Extraction, Extractor, FieldValue, NoRemoteResolver, RefResolver,
    RemoteRef, ResolutionCache,
};
pub use model::{Column, FieldType, FlatRow, Highlight, NormalizedRow, RawField, RawRecord, Table};
pub use normalize::normalize;
pub use pipeline::{build_table, Payload, Pipeline, Snapshot};
pub use query::{filter_by_flag, search, Query, RowFilter, TableView};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the pipeline
    pub use crate::model::{Column, Highlight, NormalizedRow, Table};
    pub use crate::pipeline::{Payload, Pipeline, Snapshot};
    pub use crate::query::{Query, RowFilter, TableView};
}
