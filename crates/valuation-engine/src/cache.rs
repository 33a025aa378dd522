//! Report cache keyed by valuation request

use async_trait::async_trait;
use cached::{Cached, TimedCache};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::domain::ValuationRequest;
use crate::engine::ValuationReport;

/// Storage for finished valuation reports
///
/// Implementations decide expiry; a `get` must only return live entries and
/// must never trigger a computation.
#[async_trait]
pub trait ValuationCache: Send + Sync {
    async fn get(&self, key: &ValuationRequest) -> Option<Arc<ValuationReport>>;

    /// Insert or overwrite, restarting the entry's lifetime
    async fn put(&self, key: ValuationRequest, report: Arc<ValuationReport>);

    async fn invalidate(&self, key: &ValuationRequest);

    async fn clear(&self);

    /// Number of live entries
    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// In-memory cache with a fixed time-to-live per entry
///
/// Clones share the same underlying store.
#[derive(Clone)]
pub struct TimedValuationCache {
    cache: Arc<RwLock<TimedCache<ValuationRequest, Arc<ValuationReport>>>>,
}

impl TimedValuationCache {
    /// Create a new cache with specified TTL
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Arc::new(RwLock::new(TimedCache::with_lifespan(ttl))),
        }
    }
}

#[async_trait]
impl ValuationCache for TimedValuationCache {
    async fn get(&self, key: &ValuationRequest) -> Option<Arc<ValuationReport>> {
        // Expired entries are evicted on lookup, so this needs the write lock.
        let mut cache = self.cache.write().await;
        let hit = cache.cache_get(key).cloned();
        if hit.is_some() {
            tracing::debug!("Cache hit for key: {}", key);
        } else {
            tracing::debug!("Cache miss for key: {}", key);
        }
        hit
    }

    async fn put(&self, key: ValuationRequest, report: Arc<ValuationReport>) {
        let mut cache = self.cache.write().await;
        let _ = cache.cache_set(key, report);
    }

    async fn invalidate(&self, key: &ValuationRequest) {
        let mut cache = self.cache.write().await;
        let _ = cache.cache_remove(key);
    }

    async fn clear(&self) {
        let mut cache = self.cache.write().await;
        cache.cache_clear();
    }

    async fn len(&self) -> usize {
        let mut cache = self.cache.write().await;
        cache.flush();
        cache.cache_size()
    }
}
