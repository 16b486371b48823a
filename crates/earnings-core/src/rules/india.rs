//! Indian exchange announcements.
//!
//! Exchange announcements carry a subcategory (e.g. "Financial Results"), a
//! category and a free-text headline. The subcategory is mapped exactly first, then
//! the headline is matched against keywords, and finally any announcement whose
//! category mentions results is treated as a quarterly P&L.

use crate::types::DocType;

const SUBCATEGORY_TYPES: &[(&str, DocType)] = &[
    ("financial results", DocType::Pnl),
    ("quarterly financial results", DocType::Pnl),
    ("unaudited financial results", DocType::Pnl),
    ("audited financial results", DocType::Pnl),
    ("standalone financial results", DocType::Pnl),
    ("consolidated financial results", DocType::Pnl),
    ("half yearly results", DocType::Pnl),
    ("annual audited results", DocType::AnnualReport),
    ("investor presentation", DocType::Presentation),
    ("press release", DocType::PressRelease),
    ("transcript", DocType::Transcript),
    ("earnings call transcript", DocType::Transcript),
    ("outcome of board meeting", DocType::PressRelease),
];

// Checked in order; the first match wins.
const KEYWORD_TYPES: &[(&[&str], DocType)] = &[
    (&["transcript"], DocType::Transcript),
    (&["presentation", "investor ppt"], DocType::Presentation),
    (&["press release"], DocType::PressRelease),
    (&["balance sheet", "statement of financial position"], DocType::BalanceSheet),
    (
        &["profit and loss", "profit & loss", "income statement", "financial result"],
        DocType::Pnl,
    ),
    (&["cash flow", "cashflow"], DocType::CashFlow),
    (&["annual report", "integrated report"], DocType::AnnualReport),
];

/// Maps an exact announcement subcategory to a document type.
#[must_use]
pub fn doc_type_for_subcategory(subcategory: &str) -> Option<DocType> {
    let wanted = subcategory.trim().to_lowercase();
    SUBCATEGORY_TYPES
        .iter()
        .find(|(name, _)| *name == wanted)
        .map(|(_, doc_type)| *doc_type)
}

/// Classifies free text (usually a headline) by keyword.
#[must_use]
pub fn classify_by_keywords(text: &str) -> Option<DocType> {
    let lower = text.to_lowercase();
    KEYWORD_TYPES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(_, doc_type)| *doc_type)
}

/// Classifies an exchange announcement.
///
/// Returns `None` for announcements that are not earnings documents.
#[must_use]
pub fn classify_announcement(subcategory: &str, category: &str, headline: &str) -> Option<DocType> {
    doc_type_for_subcategory(subcategory)
        .or_else(|| classify_by_keywords(headline))
        .or_else(|| {
            category
                .to_lowercase()
                .contains("result")
                .then_some(DocType::Pnl)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subcategory_exact() {
        assert_eq!(doc_type_for_subcategory("Financial Results"), Some(DocType::Pnl));
        assert_eq!(
            doc_type_for_subcategory(" Annual Audited Results "),
            Some(DocType::AnnualReport)
        );
        assert_eq!(
            doc_type_for_subcategory("Outcome of Board Meeting"),
            Some(DocType::PressRelease)
        );
        assert_eq!(doc_type_for_subcategory("Financial Results Update"), None);
    }

    #[test]
    fn test_keyword_order() {
        assert_eq!(
            classify_by_keywords("Transcript of the investor presentation call"),
            Some(DocType::Transcript)
        );
        assert_eq!(
            classify_by_keywords("Investor PPT for Q2"),
            Some(DocType::Presentation)
        );
        assert_eq!(
            classify_by_keywords("Statement of Financial Position"),
            Some(DocType::BalanceSheet)
        );
        assert_eq!(classify_by_keywords("Cashflow statement"), Some(DocType::CashFlow));
        assert_eq!(
            classify_by_keywords("Integrated Report 2024-25"),
            Some(DocType::AnnualReport)
        );
        assert_eq!(classify_by_keywords("Change in directors"), None);
    }

    #[test]
    fn test_announcement_fallbacks() {
        assert_eq!(
            classify_announcement("Analyst / Investor Meet", "Company Update", "Earnings call transcript"),
            Some(DocType::Transcript)
        );
        assert_eq!(
            classify_announcement("Others", "Result", "Intimation under Reg 30"),
            Some(DocType::Pnl)
        );
        assert_eq!(
            classify_announcement("Others", "Company Update", "Change in directors"),
            None
        );
    }
}
