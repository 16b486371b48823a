#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/earnings/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Canonical earnings documents resolved across filing sources.
//!
//! This crate re-exports the core types and source implementations, and
//! provides a [`SourceRegistry`] for querying many sources at once and an
//! [`EarningsResolver`] that reconciles their answers into one catalog.
//!
//! # Features
//!
//! - `edgar` - SEC EDGAR source for US filings
//! - `bse` - BSE India source for Indian filings
//! - `cache-sqlite` - SQLite-based candidate caching
//! - `pdf` - PDF content verification
//!
//! # Example
//!
//! ```rust,ignore
//! use earnings::{EarningsResolver, HttpFetcher, Region, SourceRegistry};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> earnings::Result<()> {
//!     let registry = SourceRegistry::new().with_bse()?;
//!     let resolver = EarningsResolver::new(registry)
//!         .with_fetcher(Arc::new(HttpFetcher::new("MyApp/1.0 (contact@example.com)")?));
//!
//!     let documents = resolver.resolve("TCS", Some(Region::India), 4).await?;
//!     for verified in resolver.verify_all(documents).await? {
//!         if let Some(correction) = &verified.audit.correction {
//!             println!("{} -> {}", correction.from_file_name, correction.to_file_name);
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

// Core types and traits
pub use earnings_core::*;

// Cache implementations
#[cfg(feature = "cache-sqlite")]
pub use earnings_cache::SqliteCache;
pub use earnings_cache::{InMemoryCache, NoopCache};

// Sources
#[cfg(feature = "bse")]
pub use earnings_bse::BseSource;
#[cfg(feature = "edgar")]
pub use earnings_edgar::EdgarSource;

mod config;
mod fetch;
mod registry;
mod resolver;

pub use config::{DEFAULT_COUNT, ResolverConfig};
pub use fetch::{DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY, HttpFetcher};
pub use registry::{RegionInfo, SourceRegistry};
pub use resolver::EarningsResolver;
