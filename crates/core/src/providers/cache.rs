//! Flat time-based cache for provider listings

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::error::Result;

/// Cached listing with fetch-time tracking
struct CachedListing<T> {
    records: Arc<Vec<T>>,
    fetched_at: Instant,
}

impl<T> CachedListing<T> {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() < ttl
    }
}

/// Single-flight cache for one listing
///
/// The slot lock is held while a refresh runs, so concurrent callers that
/// find the listing stale wait for the one in-flight fetch instead of
/// issuing their own.
pub struct TtlCache<T> {
    name: &'static str,
    ttl: Duration,
    slot: Mutex<Option<CachedListing<T>>>,
}

impl<T> TtlCache<T> {
    pub fn new(name: &'static str, ttl: Duration) -> Self {
        Self {
            name,
            ttl,
            slot: Mutex::new(None),
        }
    }

    /// Cached records if fresh, else the result of `refresh`
    ///
    /// A failed refresh leaves the previous contents in place.
    pub async fn get_or_refresh<F, Fut>(&self, refresh: F) -> Result<Arc<Vec<T>>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<T>>>,
    {
        let mut slot = self.slot.lock().await;

        if let Some(cached) = slot.as_ref() {
            if cached.is_fresh(self.ttl) {
                debug!(cache = self.name, "Cache hit");
                return Ok(cached.records.clone());
            }
        }

        debug!(cache = self.name, "Cache miss, refreshing");
        let records = Arc::new(refresh().await?);
        *slot = Some(CachedListing {
            records: records.clone(),
            fetched_at: Instant::now(),
        });
        Ok(records)
    }

    #[cfg(test)]
    pub async fn invalidate(&self) {
        *self.slot.lock().await = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FarahError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const DAY: Duration = Duration::from_secs(86_400);

    async fn load(cache: &TtlCache<u32>, calls: &AtomicUsize) -> Arc<Vec<u32>> {
        cache
            .get_or_refresh(|| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(vec![1, 2, 3])
            })
            .await
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_within_ttl_then_refetch() {
        let cache = TtlCache::new("test", DAY);
        let calls = AtomicUsize::new(0);

        load(&cache, &calls).await;
        tokio::time::advance(DAY - Duration::from_secs(1)).await;
        load(&cache, &calls).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(1)).await;
        let records = load(&cache, &calls).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(*records, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_concurrent_refresh_is_single_flight() {
        let cache = TtlCache::new("test", DAY);
        let counter = AtomicUsize::new(0);
        let calls = &counter;

        let slow = || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            Ok(vec![7])
        };
        let (a, b) = tokio::join!(cache.get_or_refresh(slow), cache.get_or_refresh(slow));
        assert_eq!(*a.unwrap(), vec![7]);
        assert_eq!(*b.unwrap(), vec![7]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_refresh_not_cached() {
        let cache: TtlCache<u32> = TtlCache::new("test", DAY);
        let err = cache
            .get_or_refresh(|| async { Err(FarahError::transport("test", "down")) })
            .await;
        assert!(err.is_err());

        let calls = AtomicUsize::new(0);
        load(&cache, &calls).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let cache = TtlCache::new("test", DAY);
        let calls = AtomicUsize::new(0);
        load(&cache, &calls).await;
        cache.invalidate().await;
        load(&cache, &calls).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
