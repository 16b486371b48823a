//! Source traits for discovering earnings documents.
//!
//! This module defines the capability interface every provider adapter implements:
//!
//! - [`DocumentSource`] - Base trait with identity and region metadata
//! - [`FilingSource`] - Company search and candidate document discovery
//! - [`DocumentFetcher`] - Downloads a document's bytes for content verification
//!
//! The reconciler and registry depend only on these traits, never on a concrete
//! adapter. Any session or rate-limit state is owned by the adapter instance.

use std::fmt::{self, Debug};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    region::Region,
    types::{CandidateDocument, CompanyInfo, DocTypeFilter},
};

/// Trust tier of a source, used as its default reconciliation priority.
///
/// Lower values win identity ties.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceTier {
    /// Exchange or regulator filing systems.
    Official = 0,
    /// Aggregator sites republishing filings.
    Aggregator = 1,
    /// Company investor-relations pages.
    CompanyIr = 2,
}

impl SourceTier {
    /// Returns the priority number of this tier.
    #[must_use]
    pub const fn priority(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for SourceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Official => "official",
            Self::Aggregator => "aggregator",
            Self::CompanyIr => "company_ir",
        };
        f.write_str(s)
    }
}

/// Base trait for all document sources.
///
/// All sources must implement this trait to describe themselves to the registry.
pub trait DocumentSource: Send + Sync + Debug {
    /// Stable identifier used for provenance and priority lookups (e.g., "bse").
    fn id(&self) -> &str;

    /// Returns the name of this source (e.g., "BSE India").
    fn name(&self) -> &str;

    /// Returns a description of this source.
    fn description(&self) -> &str;

    /// Returns the region this source covers.
    fn region(&self) -> Region;

    /// Returns the trust tier of this source.
    fn tier(&self) -> SourceTier;
}

/// Source of candidate earnings documents.
///
/// Results are best effort. Implementations should label each candidate with the
/// quarter it most likely describes, but may leave the label unknown.
#[async_trait]
pub trait FilingSource: DocumentSource {
    /// Looks up a company by name or ticker.
    ///
    /// Returns `Ok(None)` when the source does not list the company.
    async fn search_company(&self, query: &str) -> Result<Option<CompanyInfo>>;

    /// Fetches candidate documents for a company.
    ///
    /// # Arguments
    ///
    /// * `company` - Company name or ticker as given by the caller
    /// * `count` - Number of most recent quarters wanted
    /// * `filter` - Document types to emit; other types must be skipped
    async fn fetch_documents(
        &self,
        company: &str,
        count: usize,
        filter: &DocTypeFilter,
    ) -> Result<Vec<CandidateDocument>>;
}

/// Downloads document bytes.
#[async_trait]
pub trait DocumentFetcher: Send + Sync + Debug {
    /// Fetches the document at `url`.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}
