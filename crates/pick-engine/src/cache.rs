//! Time-based result memoization.
//!
//! One slot per pipeline, replaced wholesale by the next successful
//! computation after expiry. A failed refresh leaves the slot untouched.
//! Concurrent refreshes are not coalesced: two callers that both observe an
//! expired slot will both recompute and the last writer wins.

use analysis_core::{AnalysisError, Clock};
use chrono::{DateTime, Duration, Utc};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Cached value with the time it was produced
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<T> {
    pub data: T,
    pub fetched_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    pub fn new(data: T, fetched_at: DateTime<Utc>) -> Self {
        Self { data, fetched_at }
    }

    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.fetched_at < ttl
    }
}

pub struct ResultCache<T> {
    slot: RwLock<Option<CacheEntry<T>>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<T: Clone + Send + Sync> ResultCache<T> {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            slot: RwLock::new(None),
            ttl,
            clock,
        }
    }

    /// Cached data if present and younger than the TTL
    pub async fn get_fresh(&self) -> Option<T> {
        let now = self.clock.now();
        self.slot
            .read()
            .await
            .as_ref()
            .filter(|entry| entry.is_fresh(now, self.ttl))
            .map(|entry| entry.data.clone())
    }

    /// Whatever is in the slot, fresh or not
    pub async fn peek(&self) -> Option<CacheEntry<T>> {
        self.slot.read().await.clone()
    }

    pub async fn store(&self, data: T) {
        let entry = CacheEntry::new(data, self.clock.now());
        *self.slot.write().await = Some(entry);
    }

    /// Serve fresh data, otherwise run `refresh` and cache its result.
    ///
    /// Errors from `refresh` are returned as-is and never touch the slot.
    pub async fn get_or_refresh<F, Fut>(&self, refresh: F) -> Result<T, AnalysisError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, AnalysisError>>,
    {
        if let Some(data) = self.get_fresh().await {
            tracing::debug!("Serving cached result");
            return Ok(data);
        }

        let data = refresh().await?;
        self.store(data.clone()).await;
        Ok(data)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}
