//! Cache trait for storing fetched candidate lists.
//!
//! This module defines the [`CandidateCache`] trait that provides a unified interface
//! for caching what each source returned for a company, so repeated resolutions do
//! not hit the network.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    reconcile::normalize_company_name,
    types::{CandidateDocument, DocTypeFilter},
};

/// Identifies one source's answer to one fetch request.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    /// Source identifier.
    pub source: String,
    /// Normalized company name.
    pub company: String,
    /// Number of quarters requested.
    pub count: usize,
    /// Document types requested, in [`DocTypeFilter::cache_key`] form.
    pub filter: String,
}

impl CacheKey {
    /// Builds a key, normalizing the company name.
    #[must_use]
    pub fn new(source: &str, company: &str, count: usize, filter: &DocTypeFilter) -> Self {
        Self {
            source: source.to_string(),
            company: normalize_company_name(company),
            count,
            filter: filter.cache_key(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.source, self.company, self.count, self.filter
        )
    }
}

/// Trait for caching candidate documents per source.
///
/// Implementations can store data in various backends (SQLite, in-memory, etc.)
/// to avoid repeated source calls.
#[async_trait]
pub trait CandidateCache: Send + Sync {
    /// Retrieves a cached candidate list.
    ///
    /// Returns `Ok(Some(candidates))` if cached, `Ok(None)` if not cached.
    async fn get_candidates(&self, key: &CacheKey) -> Result<Option<Vec<CandidateDocument>>>;

    /// Stores a candidate list, replacing any previous entry.
    async fn put_candidates(&self, key: &CacheKey, candidates: &[CandidateDocument]) -> Result<()>;

    /// Removes cache entries older than the specified TTL.
    ///
    /// Returns the number of entries invalidated.
    async fn invalidate_stale(&self, ttl: Duration) -> Result<usize>;

    /// Clears all cached data.
    async fn clear(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DocType;

    #[test]
    fn test_key_normalizes_company() {
        let filter = DocTypeFilter::only([DocType::Transcript]);
        let a = CacheKey::new("bse", "Infosys Ltd", 4, &filter);
        let b = CacheKey::new("bse", "infosys  limited", 4, &filter);
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "bse:infosys:4:transcript");
    }
}
