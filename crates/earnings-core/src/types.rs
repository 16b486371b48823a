//! Core data types for earnings documents.
//!
//! This module defines the fundamental data structures:
//!
//! - [`DocType`] - Kind of earnings document
//! - [`DocTypeFilter`] - Set of document kinds a caller wants
//! - [`CandidateDocument`] - A document as reported by one source
//! - [`CanonicalDocument`] - A document that survived reconciliation
//! - [`CompanyInfo`] - Company reference information returned by a source search

use std::collections::BTreeSet;
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EarningsError;
use crate::period::{FiscalYear, Quarter, QuarterLabel};
use crate::region::Region;

/// Maximum length of the company part of a generated file name.
const MAX_FILE_COMPANY_LEN: usize = 50;

/// Kind of earnings document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocType {
    /// Earnings call transcript.
    Transcript,
    /// Investor presentation.
    Presentation,
    /// Press release.
    PressRelease,
    /// Balance sheet.
    BalanceSheet,
    /// Profit and loss statement (quarterly financial results).
    Pnl,
    /// Cash flow statement.
    CashFlow,
    /// Annual report.
    AnnualReport,
}

impl DocType {
    /// All document types.
    pub const ALL: [Self; 7] = [
        Self::Transcript,
        Self::Presentation,
        Self::PressRelease,
        Self::BalanceSheet,
        Self::Pnl,
        Self::CashFlow,
        Self::AnnualReport,
    ];

    /// Returns the snake_case identifier of this type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Transcript => "transcript",
            Self::Presentation => "presentation",
            Self::PressRelease => "press_release",
            Self::BalanceSheet => "balance_sheet",
            Self::Pnl => "pnl",
            Self::CashFlow => "cash_flow",
            Self::AnnualReport => "annual_report",
        }
    }
}

impl fmt::Display for DocType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocType {
    type Err = EarningsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| EarningsError::Parse(format!("Unknown document type: {s}")))
    }
}

/// Set of document types a caller wants a source to emit.
///
/// Defaults to every type.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocTypeFilter {
    types: BTreeSet<DocType>,
}

impl DocTypeFilter {
    /// A filter allowing every document type.
    #[must_use]
    pub fn all() -> Self {
        Self {
            types: DocType::ALL.into_iter().collect(),
        }
    }

    /// A filter allowing only the given types.
    #[must_use]
    pub fn only(types: impl IntoIterator<Item = DocType>) -> Self {
        Self {
            types: types.into_iter().collect(),
        }
    }

    /// Removes a type from the filter.
    #[must_use]
    pub fn without(mut self, doc_type: DocType) -> Self {
        self.types.remove(&doc_type);
        self
    }

    /// Returns true if documents of this type should be emitted.
    #[must_use]
    pub fn allows(&self, doc_type: DocType) -> bool {
        self.types.contains(&doc_type)
    }

    /// Returns true if no type is allowed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Iterates the allowed types in a stable order.
    pub fn iter(&self) -> impl Iterator<Item = DocType> + '_ {
        self.types.iter().copied()
    }

    /// Stable string form used in cache keys, e.g. `"pnl,transcript"`.
    #[must_use]
    pub fn cache_key(&self) -> String {
        self.iter().map(|t| t.as_str()).collect::<Vec<_>>().join(",")
    }
}

impl Default for DocTypeFilter {
    fn default() -> Self {
        Self::all()
    }
}

/// A document as reported by a single source.
///
/// `quarter` and `fiscal_year` are a best guess and may be unknown; sources
/// populate as many fields as they can.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateDocument {
    /// Company name as reported by the source (not normalized).
    pub company: String,
    /// Fiscal quarter, `FY` for annual filings.
    pub quarter: Quarter,
    /// Fiscal year in the region's convention.
    pub fiscal_year: FiscalYear,
    /// Kind of document.
    pub doc_type: DocType,
    /// Fetch location.
    pub url: String,
    /// Identifier of the source that reported this document.
    pub source: String,
    /// Publication time, when the source knows it.
    pub filing_date: Option<DateTime<Utc>>,
}

impl CandidateDocument {
    /// Creates a candidate with an unknown label and no filing date.
    #[must_use]
    pub fn new(
        company: impl Into<String>,
        doc_type: DocType,
        url: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            company: company.into(),
            quarter: Quarter::Unknown,
            fiscal_year: FiscalYear::Unknown,
            doc_type,
            url: url.into(),
            source: source.into(),
            filing_date: None,
        }
    }

    /// Sets the quarter label.
    #[must_use]
    pub fn with_label(mut self, label: QuarterLabel) -> Self {
        self.quarter = label.quarter;
        self.fiscal_year = label.fiscal_year;
        self
    }

    /// Sets the filing date.
    #[must_use]
    pub fn with_filing_date(mut self, filing_date: DateTime<Utc>) -> Self {
        self.filing_date = Some(filing_date);
        self
    }

    /// Returns the current quarter label.
    #[must_use]
    pub const fn label(&self) -> QuarterLabel {
        QuarterLabel::new(self.quarter, self.fiscal_year)
    }

    /// Overwrites the quarter label.
    pub fn set_label(&mut self, label: QuarterLabel) {
        self.quarter = label.quarter;
        self.fiscal_year = label.fiscal_year;
    }

    /// File name a downloaded copy of this document is stored under,
    /// e.g. `Tata_Consultancy_Services_Q2FY26_transcript.pdf`.
    #[must_use]
    pub fn file_name(&self) -> String {
        let year = self.fiscal_year.to_string();
        format!(
            "{}_{}{}_{}{}",
            safe_company(&self.company),
            self.quarter,
            year,
            self.doc_type,
            extension_for(&self.url)
        )
    }
}

fn safe_company(company: &str) -> String {
    company
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '_' | '-') || c.is_whitespace())
        .map(|c| if c == ' ' { '_' } else { c })
        .take(MAX_FILE_COMPANY_LEN)
        .collect()
}

fn extension_for(url: &str) -> &'static str {
    let lower = url.to_ascii_lowercase();
    if lower.contains(".pptx") || lower.contains(".ppt") {
        ".pptx"
    } else if lower.contains(".mp3") || lower.contains(".wav") {
        ".mp3"
    } else {
        ".pdf"
    }
}

/// A document that survived reconciliation.
///
/// Same shape as [`CandidateDocument`]. Within one reconciled set no two canonical
/// documents share an identity key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalDocument(CandidateDocument);

impl CanonicalDocument {
    /// Promotes a candidate. Only the reconciler and verifier should call this.
    #[must_use]
    pub(crate) const fn from_candidate(candidate: CandidateDocument) -> Self {
        Self(candidate)
    }

    /// Returns the underlying document.
    #[must_use]
    pub fn into_inner(self) -> CandidateDocument {
        self.0
    }

    /// Replaces the label in place after content verification.
    pub(crate) fn relabel(&mut self, label: QuarterLabel) {
        self.0.set_label(label);
    }
}

impl Deref for CanonicalDocument {
    type Target = CandidateDocument;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<CandidateDocument> for CanonicalDocument {
    fn as_ref(&self) -> &CandidateDocument {
        &self.0
    }
}

impl AsRef<Self> for CandidateDocument {
    fn as_ref(&self) -> &Self {
        self
    }
}

/// Company reference information returned by a source search.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyInfo {
    /// Company name as the source lists it.
    pub name: String,
    /// Identifier of the source that found the company.
    pub source: String,
    /// Region the company files in.
    pub region: Region,
    /// Source-specific identifier (CIK, scrip code, ...).
    pub identifier: Option<String>,
    /// Trading ticker.
    pub ticker: Option<String>,
    /// Landing page on the source.
    pub url: Option<String>,
}

impl CompanyInfo {
    /// Creates company info with just a name.
    #[must_use]
    pub fn new(name: impl Into<String>, source: impl Into<String>, region: Region) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            region,
            identifier: None,
            ticker: None,
            url: None,
        }
    }

    /// Sets the source-specific identifier.
    #[must_use]
    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    /// Sets the ticker.
    #[must_use]
    pub fn with_ticker(mut self, ticker: impl Into<String>) -> Self {
        self.ticker = Some(ticker.into());
        self
    }

    /// Sets the landing page URL.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doc_type_serde_and_parse() {
        let json = serde_json::to_string(&DocType::PressRelease).unwrap();
        assert_eq!(json, "\"press_release\"");
        assert_eq!("cash_flow".parse::<DocType>().unwrap(), DocType::CashFlow);
        assert!("memo".parse::<DocType>().is_err());
    }

    #[test]
    fn test_filter() {
        let filter = DocTypeFilter::all().without(DocType::AnnualReport);
        assert!(filter.allows(DocType::Transcript));
        assert!(!filter.allows(DocType::AnnualReport));

        let only = DocTypeFilter::only([DocType::Transcript, DocType::Pnl]);
        assert_eq!(only.cache_key(), "transcript,pnl");
        assert!(DocTypeFilter::only([]).is_empty());
    }

    #[test]
    fn test_file_name() {
        let doc = CandidateDocument::new(
            "Tata Consultancy Services Ltd.",
            DocType::Transcript,
            "https://example.com/call.pdf",
            "bse",
        )
        .with_label(QuarterLabel::new(Quarter::Q2, FiscalYear::Fy(26)));
        assert_eq!(
            doc.file_name(),
            "Tata_Consultancy_Services_Ltd_Q2FY26_transcript.pdf"
        );

        let deck = CandidateDocument::new("M&M", DocType::Presentation, "https://x/deck.PPT", "ir");
        assert_eq!(deck.file_name(), "MM_Unknown_presentation.pptx");
    }

    #[test]
    fn test_file_name_truncates_company() {
        let long = "A".repeat(80);
        let doc = CandidateDocument::new(long, DocType::Pnl, "https://x/y", "bse");
        assert!(doc.file_name().starts_with(&format!("{}_", "A".repeat(50))));
    }

    #[test]
    fn test_canonical_is_transparent() {
        let doc = CandidateDocument::new("ACME", DocType::Pnl, "https://x/y.pdf", "edgar");
        let canonical = CanonicalDocument::from_candidate(doc.clone());
        assert_eq!(canonical.url, doc.url);
        assert_eq!(
            serde_json::to_value(&canonical).unwrap(),
            serde_json::to_value(&doc).unwrap()
        );
    }
}
