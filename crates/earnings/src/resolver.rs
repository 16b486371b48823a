//! End-to-end resolution: fan out to sources, reconcile, verify.

use std::sync::Arc;

use futures::{StreamExt, stream};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use earnings_core::{
    CanonicalDocument, CompanyInfo, ContentVerifier, DocumentFetcher, EarningsError, LabelAudit, Reconciler,
    Reconciliation, Region, Result, VerificationOutcome, VerifiedDocument, apply_outcome,
    limit_by_quarter,
};

use crate::config::ResolverConfig;
use crate::registry::SourceRegistry;

/// Resolves companies to canonical earnings documents.
///
/// Holds the registry, configuration and verification collaborators. All of it
/// is read-only during a resolution, so one resolver can serve concurrent calls.
#[derive(Debug)]
pub struct EarningsResolver {
    registry: SourceRegistry,
    config: ResolverConfig,
    verifier: Option<ContentVerifier>,
    fetcher: Option<Arc<dyn DocumentFetcher>>,
}

impl EarningsResolver {
    /// Creates a resolver with default configuration.
    ///
    /// With the `pdf` feature, documents are verified as PDFs.
    #[must_use]
    pub fn new(registry: SourceRegistry) -> Self {
        #[cfg(feature = "pdf")]
        let verifier = Some(ContentVerifier::pdf());
        #[cfg(not(feature = "pdf"))]
        let verifier = None;

        Self {
            registry,
            config: ResolverConfig::default(),
            verifier,
            fetcher: None,
        }
    }

    /// Sets the configuration.
    #[must_use]
    pub fn with_config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the content verifier.
    #[must_use]
    pub fn with_verifier(mut self, verifier: ContentVerifier) -> Self {
        self.verifier = Some(verifier);
        self
    }

    /// Sets the fetcher used by [`verify_all`](Self::verify_all).
    #[must_use]
    pub fn with_fetcher(mut self, fetcher: Arc<dyn DocumentFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Returns the source registry.
    #[must_use]
    pub const fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Searches every source covering `region` for a company, using this
    /// resolver's concurrency and timeout settings.
    pub async fn search_company(&self, query: &str, region: Option<Region>) -> Vec<CompanyInfo> {
        self.registry.search_company(query, region, &self.config).await
    }

    /// Resolves a company to the canonical documents of its `count` most recent
    /// quarters.
    ///
    /// Documents are ordered newest quarter first; undated documents come last and
    /// only appear while fewer than `count` dated quarters were found. An empty
    /// result means no documents were found, which is not an error.
    ///
    /// # Errors
    /// Returns an error for an empty company name or when no source covers `region`.
    pub async fn resolve(
        &self,
        company: &str,
        region: Option<Region>,
        count: usize,
    ) -> Result<Vec<CanonicalDocument>> {
        Ok(self.resolve_with_report(company, region, count).await?.documents)
    }

    /// Like [`resolve`](Self::resolve) with the configured default count.
    ///
    /// # Errors
    /// See [`resolve`](Self::resolve).
    pub async fn resolve_default(
        &self,
        company: &str,
        region: Option<Region>,
    ) -> Result<Vec<CanonicalDocument>> {
        self.resolve(company, region, self.config.count).await
    }

    /// Resolves a company and also reports the equal-priority conflicts that
    /// reconciliation settled by first-seen order.
    ///
    /// # Errors
    /// See [`resolve`](Self::resolve).
    pub async fn resolve_with_report(
        &self,
        company: &str,
        region: Option<Region>,
        count: usize,
    ) -> Result<Reconciliation> {
        if company.trim().is_empty() {
            return Err(EarningsError::InvalidParameter("Empty company name".to_string()));
        }

        let candidates = self
            .registry
            .fetch_candidates(company, region, count, &self.config)
            .await?;
        let fetched = candidates.len();

        let mut reconciliation =
            Reconciler::new(self.registry.priorities().clone()).reconcile(candidates);
        reconciliation.documents = limit_by_quarter(reconciliation.documents, count);

        if reconciliation.documents.is_empty() {
            info!(company, region = ?region, "No documents found");
        } else {
            debug!(
                company,
                candidates = fetched,
                documents = reconciliation.documents.len(),
                conflicts = reconciliation.conflicts.len(),
                "Resolved documents"
            );
        }
        Ok(reconciliation)
    }

    /// Verifies a document against its downloaded bytes and applies any
    /// correction.
    ///
    /// Never fails: unreadable bytes keep the label and report it unverified.
    pub async fn apply_verification(
        &self,
        document: CanonicalDocument,
        bytes: Vec<u8>,
    ) -> VerifiedDocument {
        let mut document = document;
        let outcome = self.inspect(&document, bytes).await;
        let audit = apply_outcome(&mut document, outcome);
        VerifiedDocument { document, audit }
    }

    /// Downloads and verifies documents.
    ///
    /// Downloads run concurrently, at most `max_concurrent_verifications` at a
    /// time, each bounded by `fetch_timeout`. Every outcome is gathered before any
    /// label is changed. Output order matches input order; a document that could
    /// not be downloaded keeps its label and is reported unverified.
    ///
    /// # Errors
    /// Returns [`EarningsError::SourceNotConfigured`] when no fetcher is set.
    pub async fn verify_all(&self, documents: Vec<CanonicalDocument>) -> Result<Vec<VerifiedDocument>> {
        let fetcher = self.fetcher.as_ref().ok_or_else(|| {
            EarningsError::SourceNotConfigured("No document fetcher configured".to_string())
        })?;

        let outcomes: Vec<Option<VerificationOutcome>> = stream::iter(&documents)
            .map(|document| async move {
                match timeout(self.config.fetch_timeout, fetcher.fetch(&document.url)).await {
                    Ok(Ok(bytes)) => Some(self.inspect(document, bytes).await),
                    Ok(Err(e)) => {
                        warn!(url = %document.url, error = %e, "Document download failed, label left unverified");
                        None
                    }
                    Err(_) => {
                        warn!(
                            url = %document.url,
                            timeout_ms = self.config.fetch_timeout.as_millis() as u64,
                            "Document download timed out, label left unverified"
                        );
                        None
                    }
                }
            })
            .buffered(self.config.max_concurrent_verifications.max(1))
            .collect()
            .await;

        Ok(documents
            .into_iter()
            .zip(outcomes)
            .map(|(mut document, outcome)| {
                let audit = match outcome {
                    Some(outcome) => apply_outcome(&mut document, outcome),
                    None => LabelAudit::unverified(document.label()),
                };
                VerifiedDocument { document, audit }
            })
            .collect())
    }

    /// Runs content inspection off the async runtime.
    async fn inspect(&self, document: &CanonicalDocument, bytes: Vec<u8>) -> VerificationOutcome {
        let Some(verifier) = self.verifier_for(document) else {
            debug!(url = %document.url, "No content verifier configured");
            return VerificationOutcome::unverified();
        };

        let label = document.label();
        match tokio::task::spawn_blocking(move || verifier.verify(&label, &bytes)).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(url = %document.url, error = %e, "Content verification task failed");
                VerificationOutcome::unverified()
            }
        }
    }

    /// The verifier, set to the convention of the region the document's source covers.
    fn verifier_for(&self, document: &CanonicalDocument) -> Option<ContentVerifier> {
        let verifier = self
            .verifier
            .clone()?
            .with_max_pages(self.config.verify_max_pages);
        Some(match self.registry.source(&document.source) {
            Some(source) => verifier.with_convention(source.region().fiscal_convention()),
            None => verifier,
        })
    }
}
