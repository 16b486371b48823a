//! In-memory cache implementation.

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use earnings_core::{CacheKey, CandidateCache, CandidateDocument, Result};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

/// Cache entry with timestamp for TTL-based invalidation.
#[derive(Debug, Clone)]
struct CacheEntry<T> {
    data: T,
    cached_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    fn is_stale(&self, ttl: Duration) -> bool {
        let age = Utc::now().signed_duration_since(self.cached_at);
        age > TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX)
    }
}

/// Simple in-memory cache for testing and development.
///
/// Entries live in a `RwLock`-protected `HashMap` and are lost when the cache
/// is dropped. Candidate lists are cloned on get/put operations.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    candidates: RwLock<HashMap<CacheKey, CacheEntry<Vec<CandidateDocument>>>>,
}

impl InMemoryCache {
    /// Create a new empty in-memory cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached candidate lists.
    pub async fn len(&self) -> usize {
        self.candidates.read().await.len()
    }

    /// Returns true if nothing is cached.
    pub async fn is_empty(&self) -> bool {
        self.candidates.read().await.is_empty()
    }
}

#[async_trait]
impl CandidateCache for InMemoryCache {
    #[instrument(skip(self), fields(key = %key))]
    async fn get_candidates(&self, key: &CacheKey) -> Result<Option<Vec<CandidateDocument>>> {
        let cache = self.candidates.read().await;
        match cache.get(key) {
            Some(entry) => {
                debug!(count = entry.data.len(), "Cache hit for candidates");
                Ok(Some(entry.data.clone()))
            }
            None => {
                debug!("Cache miss for candidates");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, candidates), fields(key = %key, count = candidates.len()))]
    async fn put_candidates(&self, key: &CacheKey, candidates: &[CandidateDocument]) -> Result<()> {
        let mut cache = self.candidates.write().await;
        cache.insert(key.clone(), CacheEntry::new(candidates.to_vec()));
        debug!("Cached {} candidates", candidates.len());
        Ok(())
    }

    #[instrument(skip(self))]
    async fn invalidate_stale(&self, ttl: Duration) -> Result<usize> {
        let mut cache = self.candidates.write().await;
        let before = cache.len();
        cache.retain(|_, entry| !entry.is_stale(ttl));
        let removed = before - cache.len();

        if removed > 0 {
            debug!("Invalidated {} stale cache entries", removed);
        }
        Ok(removed)
    }

    #[instrument(skip(self))]
    async fn clear(&self) -> Result<()> {
        self.candidates.write().await.clear();
        debug!("Cleared all cache entries");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use earnings_core::{DocType, DocTypeFilter, FiscalYear, Quarter, QuarterLabel};

    fn sample() -> Vec<CandidateDocument> {
        vec![
            CandidateDocument::new("Infosys", DocType::Transcript, "https://x/1.pdf", "bse")
                .with_label(QuarterLabel::new(Quarter::Q2, FiscalYear::Fy(26))),
        ]
    }

    #[tokio::test]
    async fn test_memory_cache_roundtrip() {
        let cache = InMemoryCache::new();
        let key = CacheKey::new("bse", "Infosys Ltd", 4, &DocTypeFilter::all());

        // Initially no data
        assert!(cache.get_candidates(&key).await.unwrap().is_none());

        cache.put_candidates(&key, &sample()).await.unwrap();

        // Same company under a different suffix hits the same entry
        let alias = CacheKey::new("bse", "Infosys Limited", 4, &DocTypeFilter::all());
        let result = cache.get_candidates(&alias).await.unwrap();
        assert_eq!(result, Some(sample()));

        // A different filter is a different entry
        let narrow = CacheKey::new("bse", "Infosys", 4, &DocTypeFilter::only([DocType::Pnl]));
        assert!(cache.get_candidates(&narrow).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_cache_invalidate_stale() {
        let cache = InMemoryCache::new();
        let key = CacheKey::new("bse", "Infosys", 4, &DocTypeFilter::all());
        cache.put_candidates(&key, &sample()).await.unwrap();

        assert_eq!(cache.invalidate_stale(Duration::from_secs(3600)).await.unwrap(), 0);

        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(cache.invalidate_stale(Duration::ZERO).await.unwrap(), 1);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_memory_cache_clear() {
        let cache = InMemoryCache::new();
        let key = CacheKey::new("edgar", "Apple", 2, &DocTypeFilter::all());
        cache.put_candidates(&key, &sample()).await.unwrap();
        assert_eq!(cache.len().await, 1);

        cache.clear().await.unwrap();
        assert!(cache.get_candidates(&key).await.unwrap().is_none());
    }
}
