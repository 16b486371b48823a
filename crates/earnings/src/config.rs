//! Resolver configuration.

use std::time::Duration;

use earnings_core::DocTypeFilter;
use earnings_core::verify::DEFAULT_MAX_PAGES;

/// Default number of most recent quarters resolved.
pub const DEFAULT_COUNT: usize = 5;

/// Settings for one [`EarningsResolver`](crate::EarningsResolver).
///
/// Read-only once the resolver is built. Every concurrent operation shares it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Quarters returned by [`resolve_default`](crate::EarningsResolver::resolve_default).
    pub count: usize,
    /// Sources queried at the same time.
    pub max_concurrent_sources: usize,
    /// Time allowed for one source to answer; a slower source contributes nothing.
    pub source_timeout: Duration,
    /// Leading pages read when verifying a document.
    pub verify_max_pages: usize,
    /// Documents fetched and verified at the same time.
    pub max_concurrent_verifications: usize,
    /// Time allowed for one document download during verification.
    pub fetch_timeout: Duration,
    /// Document types requested from every source.
    pub doc_types: DocTypeFilter,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            count: DEFAULT_COUNT,
            max_concurrent_sources: 4,
            source_timeout: Duration::from_secs(60),
            verify_max_pages: DEFAULT_MAX_PAGES,
            max_concurrent_verifications: 4,
            fetch_timeout: Duration::from_secs(60),
            doc_types: DocTypeFilter::all(),
        }
    }
}

impl ResolverConfig {
    /// Sets the default number of quarters.
    #[must_use]
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    /// Sets how many sources are queried at once. Zero is treated as one.
    #[must_use]
    pub fn with_max_concurrent_sources(mut self, n: usize) -> Self {
        self.max_concurrent_sources = n;
        self
    }

    /// Sets the per-source timeout.
    #[must_use]
    pub fn with_source_timeout(mut self, timeout: Duration) -> Self {
        self.source_timeout = timeout;
        self
    }

    /// Sets how many leading pages verification reads.
    #[must_use]
    pub fn with_verify_max_pages(mut self, pages: usize) -> Self {
        self.verify_max_pages = pages;
        self
    }

    /// Sets how many documents are verified at once. Zero is treated as one.
    #[must_use]
    pub fn with_max_concurrent_verifications(mut self, n: usize) -> Self {
        self.max_concurrent_verifications = n;
        self
    }

    /// Sets the per-download timeout used during verification.
    #[must_use]
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Sets the document types requested from sources.
    #[must_use]
    pub fn with_doc_types(mut self, doc_types: DocTypeFilter) -> Self {
        self.doc_types = doc_types;
        self
    }
}
