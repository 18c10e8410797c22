//! Snapshot cache using moka
//!
//! Holds the last successful snapshot per source identity for a bounded
//! time-to-live.
//!
//! - Concurrent misses for the same source share one refresh
//! - Failed snapshots are returned to the caller but never stored, so the
//!   next request retries the upstream

use crate::refresh::Refresher;
use crate::source::UpstreamSource;
use moka::future::Cache;
use statusboard_core::Snapshot;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Default time-to-live for a snapshot
pub const DEFAULT_TTL: Duration = Duration::from_secs(600);

/// Statistics for cache monitoring
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    /// Number of entries in cache
    pub entry_count: u64,
}

/// Source identity → last good snapshot
#[derive(Debug, Clone)]
pub struct SnapshotCache {
    inner: Cache<String, Arc<Snapshot>>,
    refresher: Refresher,
    ttl: Duration,
}

impl SnapshotCache {
    /// Create cache with a time-to-live
    #[must_use]
    pub fn with_ttl(refresher: Refresher, ttl: Duration) -> Self {
        Self {
            inner: Cache::builder().max_capacity(64).time_to_live(ttl).build(),
            refresher,
            ttl,
        }
    }

    /// Configured time-to-live
    #[inline]
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached snapshot for a source, if still fresh
    #[inline]
    pub async fn get(&self, source: &dyn UpstreamSource) -> Option<Arc<Snapshot>> {
        self.inner.get(&source.identity()).await
    }

    /// Cached snapshot, refreshing on a miss
    pub async fn get_or_refresh(&self, source: &dyn UpstreamSource) -> Arc<Snapshot> {
        let key = source.identity();
        let refresher = &self.refresher;
        let result = self
            .inner
            .try_get_with(key.clone(), async move {
                debug!(source = %key, "snapshot cache miss");
                let snapshot = refresher.refresh(source).await;
                if snapshot.is_failed() {
                    Err(snapshot)
                } else {
                    Ok(Arc::new(snapshot))
                }
            })
            .await;

        match result {
            Ok(snapshot) | Err(snapshot) => snapshot,
        }
    }

    /// Drop the snapshot for a source
    #[inline]
    pub async fn invalidate(&self, source: &dyn UpstreamSource) {
        self.inner.invalidate(&source.identity()).await;
    }

    /// Get cache statistics
    pub async fn stats(&self) -> CacheStats {
        self.inner.run_pending_tasks().await;
        CacheStats {
            entry_count: self.inner.entry_count(),
        }
    }
}

impl Default for SnapshotCache {
    fn default() -> Self {
        Self::with_ttl(Refresher::default(), DEFAULT_TTL)
    }
}
