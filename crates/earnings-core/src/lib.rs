#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/earnings/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core traits and types for earnings document resolution.
//!
//! This crate provides the building blocks for turning weakly labelled documents
//! from many sources into one canonical catalog per company:
//!
//! - [`fiscal`] - Release-date and quarter-token mapping per fiscal convention
//! - [`LabelResolver`](resolver::LabelResolver) - Per-document quarter labels
//! - [`rules`] - Per-region classification of raw source metadata
//! - [`Reconciler`](reconcile::Reconciler) - Two-pass deduplication by source priority
//! - [`ContentVerifier`](verify::ContentVerifier) - Label correction from document content
//! - [`FilingSource`](source::FilingSource) - Capability implemented by source adapters
//! - [`CandidateCache`](cache::CandidateCache) - Caching abstraction

/// Cache trait and keys for storing fetched candidates.
pub mod cache;
/// Error types for earnings operations.
pub mod error;
pub mod fiscal;
/// Quarter, fiscal year and label definitions.
pub mod period;
pub mod reconcile;
/// Regions and fiscal-year conventions.
pub mod region;
pub mod resolver;
pub mod rules;
/// Source traits for discovering and downloading documents.
pub mod source;
/// Request throttling for source adapters.
pub mod throttle;
/// Core document types (CandidateDocument, DocType, etc.).
pub mod types;
pub mod verify;

// Re-export commonly used items at crate root
pub use cache::{CacheKey, CandidateCache};
pub use error::{EarningsError, Result};
pub use fiscal::{
    CALENDAR_RELEASE_TABLE, OFFSET_RELEASE_TABLE, ReleaseTable, find_quarter_tokens,
    infer_from_date, infer_from_text, infer_release_month,
};
pub use period::{FiscalYear, Quarter, QuarterLabel};
pub use reconcile::{
    ConflictStage, IdentityConflict, PriorityTable, Reconciler, Reconciliation,
    UNKNOWN_SOURCE_PRIORITY, limit_by_quarter, normalize_company_name, normalize_url, reconcile,
};
pub use region::{FiscalConvention, Region};
pub use resolver::{LabelOrigin, LabelResolver, ResolvedLabel};
pub use source::{DocumentFetcher, DocumentSource, FilingSource, SourceTier};
pub use throttle::RateLimiter;
pub use types::{CandidateDocument, CanonicalDocument, CompanyInfo, DocType, DocTypeFilter};
#[cfg(feature = "pdf")]
pub use verify::PdfTextExtractor;
pub use verify::{
    ContentVerifier, LabelAudit, LabelCorrection, PageTextExtractor, VerificationOutcome,
    VerifiedDocument, apply_outcome, majority_label,
};
