//! Pipeline glue
//!
//! ```text
//! Payload ─┬─ Flat rows ───────────────────────────┐
//!          └─ Records → Extractor (+ per-run cache) ┴→ normalize → derive → Table
//! ```

use crate::derive::{derive_with, StalenessRule};
use crate::extract::{extract_flat, Extractor, RefResolver, ResolutionCache, DEFAULT_RESOLVE_WORKERS};
use crate::model::{FlatRow, RawRecord, Table};
use crate::normalize::normalize;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Upstream data in one of the two supported shapes
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Pre-flattened feed rows
    Flat(Vec<FlatRow>),
    /// Typed upstream items
    Records(Vec<RawRecord>),
}

impl Payload {
    /// Build a flat payload from feed objects; non-objects are skipped
    #[must_use]
    pub fn flat(values: &[Value]) -> Self {
        let rows = values
            .iter()
            .filter_map(|v| match v.as_object() {
                Some(obj) => Some(extract_flat(obj)),
                None => {
                    debug!("skipping non-object feed entry");
                    None
                }
            })
            .collect();
        Self::Flat(rows)
    }

    /// Build a record payload from upstream items; non-objects are skipped
    #[must_use]
    pub fn records(values: &[Value]) -> Self {
        let records = values
            .iter()
            .filter_map(|v| match RawRecord::from_value(v) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(error = %e, "skipping unreadable item");
                    None
                }
            })
            .collect();
        Self::Records(records)
    }

    /// Number of rows or records
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Flat(rows) => rows.len(),
            Self::Records(records) => records.len(),
        }
    }

    /// True if the payload carries nothing
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Extraction, normalization and derivation with fixed settings
#[derive(Debug, Clone)]
pub struct Pipeline {
    workers: usize,
    rule: StalenessRule,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self {
            workers: DEFAULT_RESOLVE_WORKERS,
            rule: StalenessRule::default(),
        }
    }
}

impl Pipeline {
    /// Create pipeline with default settings
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With maximum remote lookups in flight
    #[inline]
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// With a staleness rule
    #[inline]
    #[must_use]
    pub fn with_staleness_rule(mut self, rule: StalenessRule) -> Self {
        self.rule = rule;
        self
    }

    /// Run the whole pipeline over one payload
    ///
    /// Remote references are resolved through a cache created for this
    /// call and dropped when it returns.
    pub async fn run(
        &self,
        payload: Payload,
        resolver: &dyn RefResolver,
        now: NaiveDateTime,
    ) -> Table {
        let started = Instant::now();
        let cache = ResolutionCache::new();
        let rows = match payload {
            Payload::Flat(rows) => rows,
            Payload::Records(records) => {
                Extractor::new(resolver, &cache)
                    .with_workers(self.workers)
                    .extract_all(&records)
                    .await
            }
        };

        let table = self.build(rows, now);
        info!(
            rows = table.len(),
            lookups = cache.lookups(),
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "pipeline run complete"
        );
        table
    }

    /// Normalize and derive already-extracted rows
    #[must_use]
    pub fn build(&self, rows: Vec<FlatRow>, now: NaiveDateTime) -> Table {
        derive_with(normalize(rows), now, &self.rule)
    }
}

/// Normalize and derive with default settings
#[must_use]
pub fn build_table(rows: Vec<FlatRow>, now: NaiveDateTime) -> Table {
    Pipeline::default().build(rows, now)
}

/// Result of one refresh cycle
///
/// A failed refresh still produces a snapshot: an empty table plus the
/// upstream error text for the operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Source identity the table was built from
    pub source: String,
    /// Normalized, derived table
    pub table: Table,
    /// When the refresh finished
    pub fetched_at: DateTime<Utc>,
    /// Upstream error text, if the refresh failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Snapshot {
    /// Successful snapshot
    #[must_use]
    pub fn ok(source: impl Into<String>, table: Table) -> Self {
        Self {
            source: source.into(),
            table,
            fetched_at: Utc::now(),
            error: None,
        }
    }

    /// Failed snapshot with an empty table
    #[must_use]
    pub fn failed(source: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            table: Table::empty(),
            fetched_at: Utc::now(),
            error: Some(error.into()),
        }
    }

    /// True if the refresh failed
    #[inline]
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}
