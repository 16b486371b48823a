//! Source registry for querying many document sources with graceful degradation.

use std::sync::Arc;

use futures::{StreamExt, stream};
use tokio::time::timeout;
use tracing::{debug, warn};

use earnings_core::{
    CacheKey, CandidateCache, CandidateDocument, CompanyInfo, EarningsError, FilingSource,
    FiscalConvention, PriorityTable, Region, Result,
};

use crate::config::ResolverConfig;

/// A region with the sources registered for it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegionInfo {
    /// The region.
    pub region: Region,
    /// Its fiscal-year convention.
    pub convention: FiscalConvention,
    /// Ids of the registered sources covering it, in registration order.
    pub sources: Vec<String>,
}

/// Registry of document sources.
///
/// Unlike a fallback chain, every matching source is queried: each contributes
/// candidates and reconciliation decides which survive. A source that fails or
/// times out contributes nothing and never fails the whole request.
///
/// # Example
///
/// ```rust,ignore
/// use earnings::{SourceRegistry, ResolverConfig, Region};
///
/// let registry = SourceRegistry::new()
///     .with_edgar("MyApp/1.0 (contact@example.com)")?
///     .with_bse()?;
///
/// let candidates = registry
///     .fetch_candidates("Infosys", Some(Region::India), 4, &ResolverConfig::default())
///     .await?;
/// ```
#[derive(Default)]
pub struct SourceRegistry {
    sources: Vec<Arc<dyn FilingSource>>,
    priorities: PriorityTable,
    cache: Option<Arc<dyn CandidateCache>>,
}

impl std::fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceRegistry")
            .field(
                "sources",
                &self.sources.iter().map(|s| s.id()).collect::<Vec<_>>(),
            )
            .field("priorities", &self.priorities)
            .field("cache", &self.cache.as_ref().map(|_| "configured"))
            .finish()
    }
}

impl SourceRegistry {
    /// Create a new empty registry with the default priority table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new registry with a cache.
    #[must_use]
    pub fn with_cache(cache: Arc<dyn CandidateCache>) -> Self {
        Self {
            cache: Some(cache),
            ..Default::default()
        }
    }

    /// Set the cache for this registry.
    #[must_use]
    pub fn set_cache(mut self, cache: Arc<dyn CandidateCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Replace the priority table.
    ///
    /// Sources registered afterwards still add their tier for ids the table
    /// does not list.
    #[must_use]
    pub fn with_priorities(mut self, priorities: PriorityTable) -> Self {
        self.priorities = priorities;
        for source in &self.sources {
            priorities_insert(&mut self.priorities, source.as_ref());
        }
        self
    }

    /// Register a source.
    ///
    /// A source whose id is already registered replaces the earlier one.
    pub fn register(&mut self, source: Arc<dyn FilingSource>) {
        debug!(
            source = source.id(),
            region = %source.region(),
            tier = %source.tier(),
            "Registering source"
        );
        priorities_insert(&mut self.priorities, source.as_ref());
        if let Some(existing) = self.sources.iter_mut().find(|s| s.id() == source.id()) {
            warn!(source = source.id(), "Source already registered, replacing it");
            *existing = source;
        } else {
            self.sources.push(source);
        }
    }

    /// Register a source, builder style.
    #[must_use]
    pub fn with_source(mut self, source: Arc<dyn FilingSource>) -> Self {
        self.register(source);
        self
    }

    /// Returns the priority table used for reconciliation.
    #[must_use]
    pub fn priorities(&self) -> &PriorityTable {
        &self.priorities
    }

    /// Returns the configured cache, if any.
    #[must_use]
    pub fn cache(&self) -> Option<&Arc<dyn CandidateCache>> {
        self.cache.as_ref()
    }

    /// Returns the source registered under `id`.
    #[must_use]
    pub fn source(&self, id: &str) -> Option<&Arc<dyn FilingSource>> {
        self.sources.iter().find(|s| s.id() == id)
    }

    /// Returns the sources covering `region`, or all of them when `region` is `None`.
    #[must_use]
    pub fn sources_for(&self, region: Option<Region>) -> Vec<Arc<dyn FilingSource>> {
        self.sources
            .iter()
            .filter(|s| region.is_none_or(|r| s.region() == r))
            .cloned()
            .collect()
    }

    /// Number of registered sources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Returns `true` when no source is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Lists the regions that have at least one registered source.
    #[must_use]
    pub fn available_regions(&self) -> Vec<RegionInfo> {
        Region::ALL
            .iter()
            .filter_map(|&region| {
                let sources: Vec<String> = self
                    .sources
                    .iter()
                    .filter(|s| s.region() == region)
                    .map(|s| s.id().to_string())
                    .collect();
                (!sources.is_empty()).then(|| RegionInfo {
                    region,
                    convention: region.fiscal_convention(),
                    sources,
                })
            })
            .collect()
    }

    /// Searches every matching source for a company.
    ///
    /// Sources are queried concurrently, at most `config.max_concurrent_sources`
    /// at a time, each bounded by `config.source_timeout`. Returns each source's
    /// hit in registration order. Sources that fail or time out are logged and
    /// skipped.
    pub async fn search_company(
        &self,
        query: &str,
        region: Option<Region>,
        config: &ResolverConfig,
    ) -> Vec<CompanyInfo> {
        let sources = self.sources_for(region);
        let results: Vec<Option<CompanyInfo>> = stream::iter(sources)
            .map(|source| async move {
                match timeout(config.source_timeout, source.search_company(query)).await {
                    Ok(Ok(hit)) => hit,
                    Ok(Err(e)) => {
                        warn!(source = source.id(), error = %e, "Company search failed, skipping source");
                        None
                    }
                    Err(_) => {
                        let e = EarningsError::Timeout {
                            source_id: source.id().to_string(),
                            after: config.source_timeout,
                        };
                        warn!(source = source.id(), error = %e, "Company search timed out, skipping source");
                        None
                    }
                }
            })
            .buffered(config.max_concurrent_sources.max(1))
            .collect()
            .await;
        results.into_iter().flatten().collect()
    }

    /// Fetches candidates for a company from every matching source.
    ///
    /// Sources are queried concurrently, at most `config.max_concurrent_sources`
    /// at a time, each bounded by `config.source_timeout`. Results come back in
    /// registration order regardless of which source answered first.
    ///
    /// # Errors
    /// Returns [`EarningsError::SourceNotConfigured`] when no registered source
    /// covers `region`. Failures of individual sources are never errors.
    pub async fn fetch_candidates(
        &self,
        company: &str,
        region: Option<Region>,
        count: usize,
        config: &ResolverConfig,
    ) -> Result<Vec<CandidateDocument>> {
        let sources = self.sources_for(region);
        if sources.is_empty() {
            return Err(EarningsError::SourceNotConfigured(match region {
                Some(r) => format!("No sources registered for region {}", r),
                None => "No sources registered".to_string(),
            }));
        }

        let per_source: Vec<Vec<CandidateDocument>> = stream::iter(sources)
            .map(|source| self.fetch_from_source(source, company, count, config))
            .buffered(config.max_concurrent_sources.max(1))
            .collect()
            .await;

        Ok(per_source.into_iter().flatten().collect())
    }

    async fn fetch_from_source(
        &self,
        source: Arc<dyn FilingSource>,
        company: &str,
        count: usize,
        config: &ResolverConfig,
    ) -> Vec<CandidateDocument> {
        let id = source.id();
        let key = CacheKey::new(id, company, count, &config.doc_types);

        // Check cache first
        if let Some(cache) = &self.cache {
            match cache.get_candidates(&key).await {
                Ok(Some(cached)) => {
                    debug!(source = id, company, "Cache hit for candidates");
                    return cached;
                }
                Ok(None) => debug!(source = id, company, "Cache miss for candidates"),
                Err(e) => warn!(source = id, error = %e, "Cache lookup failed"),
            }
        }

        debug!(source = id, company, count, "Fetching candidates");
        let fetched = timeout(
            config.source_timeout,
            source.fetch_documents(company, count, &config.doc_types),
        )
        .await;

        let candidates: Vec<CandidateDocument> = match fetched {
            Ok(Ok(docs)) => docs
                .into_iter()
                .filter(|d| config.doc_types.allows(d.doc_type))
                .collect(),
            Ok(Err(EarningsError::CompanyNotFound(name))) => {
                debug!(source = id, company = %name, "Company not listed by source");
                return Vec::new();
            }
            Ok(Err(e)) => {
                warn!(source = id, error = %e, "Source failed, continuing without it");
                return Vec::new();
            }
            Err(_) => {
                let e = EarningsError::Timeout {
                    source_id: id.to_string(),
                    after: config.source_timeout,
                };
                warn!(source = id, error = %e, "Source timed out, continuing without it");
                return Vec::new();
            }
        };

        debug!(source = id, candidates = candidates.len(), "Source answered");

        // Cache the result
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.put_candidates(&key, &candidates).await {
                warn!(source = id, error = %e, "Failed to cache candidates");
            }
        }

        candidates
    }

    // Builder methods for easy setup with specific sources

    /// Add the SEC EDGAR source.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    #[cfg(feature = "edgar")]
    pub fn with_edgar(self, user_agent: &str) -> Result<Self> {
        let source = earnings_edgar::EdgarSource::new(user_agent)?;
        Ok(self.with_source(Arc::new(source)))
    }

    /// Add the BSE India source.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    #[cfg(feature = "bse")]
    pub fn with_bse(self) -> Result<Self> {
        let source = earnings_bse::BseSource::new()?;
        Ok(self.with_source(Arc::new(source)))
    }
}

fn priorities_insert(table: &mut PriorityTable, source: &dyn FilingSource) {
    table.insert_if_absent(source.id(), source.tier());
}
