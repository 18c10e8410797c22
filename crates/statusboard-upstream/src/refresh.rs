//! One refresh cycle: fetch, run the pipeline, wrap in a snapshot
//!
//! Upstream failures never escape as errors. They become a failed
//! [`Snapshot`] carrying the upstream's error text and an empty table.

use crate::source::UpstreamSource;
use chrono::{Local, NaiveDateTime};
use statusboard_core::{Pipeline, Snapshot};
use tracing::{error, info};

/// Runs refresh cycles with a fixed pipeline
#[derive(Debug, Clone, Default)]
pub struct Refresher {
    pipeline: Pipeline,
}

impl Refresher {
    /// Create refresher
    #[inline]
    #[must_use]
    pub fn new(pipeline: Pipeline) -> Self {
        Self { pipeline }
    }

    /// Refresh against the local wall clock
    pub async fn refresh(&self, source: &dyn UpstreamSource) -> Snapshot {
        self.refresh_at(source, Local::now().naive_local()).await
    }

    /// Refresh with an explicit evaluation time for staleness
    pub async fn refresh_at(&self, source: &dyn UpstreamSource, now: NaiveDateTime) -> Snapshot {
        let identity = source.identity();
        match source.fetch().await {
            Ok(fetched) => {
                let table = self
                    .pipeline
                    .run(fetched.payload, fetched.resolver.as_ref(), now)
                    .await;
                info!(source = %identity, rows = table.len(), "refresh complete");
                Snapshot::ok(identity, table)
            }
            Err(e) => {
                error!(source = %identity, error = %e, "refresh failed");
                Snapshot::failed(identity, e.to_string())
            }
        }
    }
}
