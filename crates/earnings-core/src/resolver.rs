//! Per-document quarter label resolution.
//!
//! [`LabelResolver`] combines the signals available for one candidate document, in
//! strict order of trust:
//!
//! 1. an explicit quarter token in the surrounding text (headline, anchor text, subcategory)
//! 2. an explicit quarter token in the URL or file name
//! 3. the filing date, mapped through the region's release table
//! 4. a textual release month in the surrounding text (e.g. `"Nov 2025"`)
//!
//! When none is available the label is unknown, which is not an error.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::fiscal::{infer_from_date, infer_from_text, infer_release_month};
use crate::period::QuarterLabel;
use crate::region::{FiscalConvention, Region};
use crate::types::CandidateDocument;

/// Which signal decided a label.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelOrigin {
    /// Explicit token in the surrounding text.
    Context,
    /// Explicit token in the URL or file name.
    Url,
    /// Filing date mapped through the release table.
    FilingDate,
    /// Month-year written in the surrounding text.
    ContextDate,
    /// No signal was available.
    None,
}

impl fmt::Display for LabelOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Context => "context",
            Self::Url => "url",
            Self::FilingDate => "filing_date",
            Self::ContextDate => "context_date",
            Self::None => "none",
        };
        f.write_str(s)
    }
}

/// A resolved label together with the signal that produced it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolvedLabel {
    /// The best-guess label.
    pub label: QuarterLabel,
    /// Where it came from.
    pub origin: LabelOrigin,
}

/// Assigns best-guess quarter labels to candidate documents.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LabelResolver {
    convention: FiscalConvention,
}

impl LabelResolver {
    /// Creates a resolver for a fiscal convention.
    #[must_use]
    pub const fn new(convention: FiscalConvention) -> Self {
        Self { convention }
    }

    /// Creates a resolver for a region's convention.
    #[must_use]
    pub const fn for_region(region: Region) -> Self {
        Self::new(region.fiscal_convention())
    }

    /// Returns the convention this resolver applies.
    #[must_use]
    pub const fn convention(&self) -> FiscalConvention {
        self.convention
    }

    /// Resolves a label from the available signals.
    #[must_use]
    pub fn resolve(
        &self,
        context: Option<&str>,
        url: &str,
        filing_date: Option<DateTime<Utc>>,
    ) -> ResolvedLabel {
        let resolved = self.first_signal(context, url, filing_date);
        trace!(
            label = %resolved.label,
            origin = %resolved.origin,
            url,
            "Resolved quarter label"
        );
        resolved
    }

    fn first_signal(
        &self,
        context: Option<&str>,
        url: &str,
        filing_date: Option<DateTime<Utc>>,
    ) -> ResolvedLabel {
        if let Some(label) = context.and_then(infer_from_text) {
            return self.from_text(label, LabelOrigin::Context);
        }
        if let Some(label) = infer_from_text(&decode_url(url)) {
            return self.from_text(label, LabelOrigin::Url);
        }
        if let Some(date) = filing_date {
            return ResolvedLabel {
                label: infer_from_date(&date, self.convention),
                origin: LabelOrigin::FilingDate,
            };
        }
        if let Some(month) = context.and_then(infer_release_month) {
            return ResolvedLabel {
                label: infer_from_date(&month, self.convention),
                origin: LabelOrigin::ContextDate,
            };
        }
        ResolvedLabel {
            label: QuarterLabel::unknown(),
            origin: LabelOrigin::None,
        }
    }

    const fn from_text(&self, label: QuarterLabel, origin: LabelOrigin) -> ResolvedLabel {
        ResolvedLabel {
            label: QuarterLabel::new(label.quarter, self.convention.normalize_year(label.fiscal_year)),
            origin,
        }
    }

    /// Resolves and stores the label of a candidate from its own URL and filing date.
    pub fn apply(&self, document: &mut CandidateDocument, context: Option<&str>) -> LabelOrigin {
        let resolved = self.resolve(context, &document.url, document.filing_date);
        document.set_label(resolved.label);
        resolved.origin
    }
}

/// Decodes percent escapes and `+` so file-name tokens like `Q3%20FY26` are readable.
///
/// Malformed escapes are kept as written.
fn decode_url(url: &str) -> String {
    let spaced = url.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::period::{FiscalYear, Quarter};
    use crate::types::DocType;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 10, 0, 0).unwrap()
    }

    #[test]
    fn test_context_outranks_everything() {
        let resolver = LabelResolver::new(FiscalConvention::Offset);
        let got = resolver.resolve(
            Some("Transcript of Q2 FY26 earnings call"),
            "https://x/Q1FY25.pdf",
            Some(at(2025, 1, 20)),
        );
        assert_eq!(got.origin, LabelOrigin::Context);
        assert_eq!(got.label, QuarterLabel::new(Quarter::Q2, FiscalYear::Fy(26)));
    }

    #[test]
    fn test_url_outranks_date() {
        let resolver = LabelResolver::new(FiscalConvention::Offset);
        let got = resolver.resolve(
            Some("Earnings call transcript"),
            "https://x/docs/TCS%20Q1%20FY25.pdf",
            Some(at(2025, 1, 20)),
        );
        assert_eq!(got.origin, LabelOrigin::Url);
        assert_eq!(got.label, QuarterLabel::new(Quarter::Q1, FiscalYear::Fy(25)));
    }

    #[test]
    fn test_date_fallback() {
        let resolver = LabelResolver::for_region(Region::India);
        let got = resolver.resolve(None, "https://x/abc.pdf", Some(at(2025, 7, 18)));
        assert_eq!(got.origin, LabelOrigin::FilingDate);
        assert_eq!(got.label, QuarterLabel::new(Quarter::Q1, FiscalYear::Fy(26)));
    }

    #[test]
    fn test_context_month_fallback() {
        let resolver = LabelResolver::for_region(Region::India);
        let got = resolver.resolve(Some("Transcript Nov 2025"), "https://x/abc.pdf", None);
        assert_eq!(got.origin, LabelOrigin::ContextDate);
        assert_eq!(got.label, QuarterLabel::new(Quarter::Q2, FiscalYear::Fy(26)));
    }

    #[test]
    fn test_no_signal_is_unknown() {
        let resolver = LabelResolver::for_region(Region::Us);
        let got = resolver.resolve(None, "https://x/abc.pdf", None);
        assert_eq!(got.origin, LabelOrigin::None);
        assert_eq!(got.label, QuarterLabel::unknown());
    }

    #[test]
    fn test_calendar_region_renders_text_year() {
        let resolver = LabelResolver::for_region(Region::Us);
        let got = resolver.resolve(Some("Q3 2024 earnings call"), "https://x/a.pdf", None);
        assert_eq!(
            got.label,
            QuarterLabel::new(Quarter::Q3, FiscalYear::Calendar(2024))
        );
    }

    #[test]
    fn test_apply_sets_label() {
        let resolver = LabelResolver::for_region(Region::India);
        let mut doc = CandidateDocument::new("TCS", DocType::Pnl, "https://x/y.pdf", "bse")
            .with_filing_date(at(2025, 10, 9));
        let origin = resolver.apply(&mut doc, None);
        assert_eq!(origin, LabelOrigin::FilingDate);
        assert_eq!(doc.label().to_string(), "Q2 FY26");
    }

    #[test]
    fn test_decode_url() {
        assert_eq!(decode_url("a%20b+c%2"), "a b c%2");
        assert_eq!(decode_url("%zz"), "%zz");
        assert_eq!(decode_url("Q3%2BFY26%20call"), "Q3+FY26 call");
        // Not UTF-8 once decoded: left encoded.
        assert_eq!(decode_url("Q1+FY26%FF"), "Q1 FY26%FF");
    }
}
