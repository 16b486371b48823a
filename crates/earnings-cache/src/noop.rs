//! No-op cache implementation.

use async_trait::async_trait;
use earnings_core::{CacheKey, CandidateCache, CandidateDocument, Result};
use std::time::Duration;
use tracing::trace;

/// A no-op cache that doesn't store anything.
///
/// `get_candidates` always returns `Ok(None)` and `put_candidates` returns `Ok(())`.
/// Useful for disabling caching or testing code paths without cache hits.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

impl NoopCache {
    /// Create a new no-op cache.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CandidateCache for NoopCache {
    async fn get_candidates(&self, _key: &CacheKey) -> Result<Option<Vec<CandidateDocument>>> {
        trace!("NoopCache: get_candidates called, returning None");
        Ok(None)
    }

    async fn put_candidates(&self, _key: &CacheKey, _candidates: &[CandidateDocument]) -> Result<()> {
        trace!("NoopCache: put_candidates called, doing nothing");
        Ok(())
    }

    async fn invalidate_stale(&self, _ttl: Duration) -> Result<usize> {
        trace!("NoopCache: invalidate_stale called, returning 0");
        Ok(0)
    }

    async fn clear(&self) -> Result<()> {
        trace!("NoopCache: clear called, doing nothing");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use earnings_core::{DocType, DocTypeFilter};

    #[tokio::test]
    async fn test_noop_cache_stores_nothing() {
        let cache = NoopCache::new();
        let key = CacheKey::new("bse", "TCS", 4, &DocTypeFilter::all());
        let docs = [CandidateDocument::new("TCS", DocType::Pnl, "https://x/1.pdf", "bse")];

        assert!(cache.put_candidates(&key, &docs).await.is_ok());
        assert!(cache.get_candidates(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_noop_cache_management() {
        let cache = NoopCache::new();

        let removed = cache
            .invalidate_stale(Duration::from_secs(3600))
            .await
            .unwrap();
        assert_eq!(removed, 0);
        assert!(cache.clear().await.is_ok());
    }
}
