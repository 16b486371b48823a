//! US SEC form rules.
//!
//! Quarterly reports (10-Q) stand in for the P&L, annual reports (10-K) are labelled
//! with the full fiscal year they cover, and current reports (8-K) carry earnings
//! press releases. Other forms are not earnings documents.

use chrono::{Datelike, NaiveDate};

use crate::period::{FiscalYear, Quarter, QuarterLabel};
use crate::types::DocType;

/// Maps an SEC form type to a document type.
#[must_use]
pub fn doc_type_for_form(form: &str) -> Option<DocType> {
    match form.trim().to_ascii_uppercase().as_str() {
        "10-Q" => Some(DocType::Pnl),
        "10-K" => Some(DocType::AnnualReport),
        "8-K" => Some(DocType::PressRelease),
        _ => None,
    }
}

/// Label of an annual report: `FY` and the year its report period ends in.
///
/// Without a report period the fiscal year is assumed to have ended in the
/// calendar year before the filing.
#[must_use]
pub fn annual_label(report_date: Option<NaiveDate>, filing_date: NaiveDate) -> QuarterLabel {
    let year = report_date.map_or(filing_date.year() - 1, |d| d.year());
    QuarterLabel::new(Quarter::FullYear, FiscalYear::calendar(year))
}
