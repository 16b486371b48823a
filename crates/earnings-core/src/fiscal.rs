//! Fiscal calendar mapping.
//!
//! Maps a filing's release date to the quarter it reports on, and reads explicit
//! quarter tokens such as `Q3 FY26`, `Q3FY2026` or `Q3 FY'26` out of free text.
//!
//! Filings are published weeks after the period they describe, so the month of
//! publication is not the month of the quarter. Each [`FiscalConvention`] owns a
//! [`ReleaseTable`] that encodes the typical reporting lag as plain data, one entry
//! per release month.

use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;

use crate::period::{FiscalYear, Quarter, QuarterLabel};
use crate::region::FiscalConvention;

/// Maps a release month to the quarter it reports on and the fiscal-year offset
/// relative to the release's calendar year.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReleaseTable {
    entries: [(Quarter, i32); 12],
}

impl ReleaseTable {
    /// Creates a table from twelve `(quarter, year offset)` entries, January first.
    #[must_use]
    pub const fn new(entries: [(Quarter, i32); 12]) -> Self {
        Self { entries }
    }

    /// Looks up the owning quarter and year offset for a release month (1-12).
    #[must_use]
    pub fn lookup(&self, month: u32) -> Option<(Quarter, i32)> {
        let index = usize::try_from(month.checked_sub(1)?).ok()?;
        self.entries.get(index).copied()
    }

    /// Iterates `(month, quarter, offset)` for every entry.
    pub fn iter(&self) -> impl Iterator<Item = (u32, Quarter, i32)> + '_ {
        (1u32..).zip(self.entries.iter()).map(|(m, (q, o))| (m, *q, *o))
    }
}

/// Release table for April–March fiscal years (India, Japan).
///
/// Results for the quarter ending June are released June–August and belong to the
/// fiscal year ending the following March. This is the table the exchange-filing
/// scrapers used; the aggregator and IR-page scrapers used a variant that moved
/// May, August and November one quarter later. Only this table is applied.
pub const OFFSET_RELEASE_TABLE: ReleaseTable = ReleaseTable::new([
    (Quarter::Q3, 0), // Jan
    (Quarter::Q3, 0), // Feb
    (Quarter::Q4, 0), // Mar
    (Quarter::Q4, 0), // Apr
    (Quarter::Q4, 0), // May
    (Quarter::Q1, 1), // Jun
    (Quarter::Q1, 1), // Jul
    (Quarter::Q1, 1), // Aug
    (Quarter::Q2, 1), // Sep
    (Quarter::Q2, 1), // Oct
    (Quarter::Q2, 1), // Nov
    (Quarter::Q3, 1), // Dec
]);

/// Release table for calendar fiscal years (US, Korea, China).
///
/// A filing released in a calendar quarter reports the previous one, so January–March
/// releases belong to Q4 of the prior year.
pub const CALENDAR_RELEASE_TABLE: ReleaseTable = ReleaseTable::new([
    (Quarter::Q4, -1), // Jan
    (Quarter::Q4, -1), // Feb
    (Quarter::Q4, -1), // Mar
    (Quarter::Q1, 0),  // Apr
    (Quarter::Q1, 0),  // May
    (Quarter::Q1, 0),  // Jun
    (Quarter::Q2, 0),  // Jul
    (Quarter::Q2, 0),  // Aug
    (Quarter::Q2, 0),  // Sep
    (Quarter::Q3, 0),  // Oct
    (Quarter::Q3, 0),  // Nov
    (Quarter::Q3, 0),  // Dec
]);

static QUARTER_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)Q([1-4])[\s_\-]*(?:FY[\s_\-]*)?['’"]?(\d{2,4})"#)
        .expect("quarter token pattern is valid")
});

static MONTH_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)\b(jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?",
        r"|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)\.?[\s,\-]+(\d{4})\b"
    ))
    .expect("month-year pattern is valid")
});

/// Infers the owning quarter of a filing from its release date.
///
/// Pure function of `(month, year, convention)`.
#[must_use]
pub fn infer_from_date(release: &impl Datelike, convention: FiscalConvention) -> QuarterLabel {
    match convention.release_table().lookup(release.month()) {
        Some((quarter, offset)) => {
            QuarterLabel::new(quarter, convention.fiscal_year(release.year() + offset))
        }
        None => QuarterLabel::unknown(),
    }
}

/// Reads the first explicit quarter token from free text.
///
/// Author-asserted tokens are treated as ground truth. Four-digit years are
/// reduced to their last two digits, so `Q3FY2026`, `Q3 FY26` and `Q3 FY'26` all
/// yield `("Q3", "FY26")`.
#[must_use]
pub fn infer_from_text(text: &str) -> Option<QuarterLabel> {
    quarter_tokens(text).next()
}

/// Returns every explicit quarter token in `text`, in order of appearance.
#[must_use]
pub fn find_quarter_tokens(text: &str) -> Vec<QuarterLabel> {
    quarter_tokens(text).collect()
}

fn quarter_tokens(text: &str) -> impl Iterator<Item = QuarterLabel> + '_ {
    QUARTER_TOKEN.captures_iter(text).filter_map(move |caps| {
        let whole = caps.get(0)?;
        let year = caps.get(2)?;

        // "SEQ1 2024" is not a quarter token; "_Q1" and "(Q1" are.
        if text[..whole.start()]
            .chars()
            .next_back()
            .is_some_and(char::is_alphabetic)
        {
            return None;
        }
        // Two or four digits exactly; a longer run was cut short by the pattern.
        if !matches!(year.len(), 2 | 4)
            || text[year.end()..]
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_digit())
        {
            return None;
        }

        let quarter = Quarter::from_number(caps.get(1)?.as_str().parse().ok()?)?;
        let year: i32 = year.as_str().parse().ok()?;
        Some(QuarterLabel::new(quarter, FiscalYear::fy(year)))
    })
}

/// Reads a release month written as text, e.g. `"Nov 2025"` or `"February, 2024"`.
///
/// Aggregator pages often show when a document was published without a machine
/// readable date; the result can be fed to [`infer_from_date`].
#[must_use]
pub fn infer_release_month(text: &str) -> Option<NaiveDate> {
    let caps = MONTH_YEAR.captures(text)?;
    let name = caps.get(1)?.as_str().to_ascii_lowercase();
    let month = match name.get(..3)? {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    let year = caps.get(2)?.as_str().parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(q: Quarter, y: FiscalYear) -> QuarterLabel {
        QuarterLabel::new(q, y)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_token_variants_normalize() {
        let expected = label(Quarter::Q3, FiscalYear::Fy(26));
        for text in ["Q3 FY26", "Q3FY2026", "Q3 FY'26", "q3fy26", "Q3 FY 26", "Q3-FY26"] {
            assert_eq!(infer_from_text(text), Some(expected), "text: {text}");
        }
    }

    #[test]
    fn test_token_in_filenames_and_headlines() {
        assert_eq!(
            infer_from_text("https://example.com/files/Results_Q2FY25_Transcript.pdf"),
            Some(label(Quarter::Q2, FiscalYear::Fy(25)))
        );
        assert_eq!(
            infer_from_text("Transcript of earnings call for Q4 2024 results"),
            Some(label(Quarter::Q4, FiscalYear::Fy(24)))
        );
    }

    #[test]
    fn test_token_rejections() {
        assert_eq!(infer_from_text("Board meeting outcome"), None);
        assert_eq!(infer_from_text("SEQ1 2024"), None);
        assert_eq!(infer_from_text("Q5 FY26"), None);
        assert_eq!(infer_from_text("Q1 FY262"), None);
        assert_eq!(infer_from_text("Q1 202612"), None);
    }

    #[test]
    fn test_find_all_tokens() {
        let found = find_quarter_tokens("Q2 FY26 revenue grew versus Q2 FY25; Q2FY26 margin");
        assert_eq!(
            found,
            vec![
                label(Quarter::Q2, FiscalYear::Fy(26)),
                label(Quarter::Q2, FiscalYear::Fy(25)),
                label(Quarter::Q2, FiscalYear::Fy(26)),
            ]
        );
    }

    #[test]
    fn test_offset_table_entries() {
        let conv = FiscalConvention::Offset;
        let cases = [
            (1, "Q3", "FY25"),
            (2, "Q3", "FY25"),
            (3, "Q4", "FY25"),
            (4, "Q4", "FY25"),
            (5, "Q4", "FY25"),
            (6, "Q1", "FY26"),
            (7, "Q1", "FY26"),
            (8, "Q1", "FY26"),
            (9, "Q2", "FY26"),
            (10, "Q2", "FY26"),
            (11, "Q2", "FY26"),
            (12, "Q3", "FY26"),
        ];
        for (month, q, y) in cases {
            let got = infer_from_date(&date(2025, month, 15), conv);
            assert_eq!(got.quarter.as_str(), q, "month {month}");
            assert_eq!(got.fiscal_year.to_string(), y, "month {month}");
        }
    }

    #[test]
    fn test_calendar_table_entries() {
        let conv = FiscalConvention::Calendar;
        let cases = [
            (1, "Q4", "2024"),
            (3, "Q4", "2024"),
            (4, "Q1", "2025"),
            (6, "Q1", "2025"),
            (7, "Q2", "2025"),
            (9, "Q2", "2025"),
            (10, "Q3", "2025"),
            (12, "Q3", "2025"),
        ];
        for (month, q, y) in cases {
            let got = infer_from_date(&date(2025, month, 1), conv);
            assert_eq!(got.quarter.as_str(), q, "month {month}");
            assert_eq!(got.fiscal_year.to_string(), y, "month {month}");
        }
    }

    #[test]
    fn test_date_inference_is_pure() {
        for (month, quarter, offset) in OFFSET_RELEASE_TABLE.iter() {
            let a = infer_from_date(&date(2030, month, 1), FiscalConvention::Offset);
            let b = infer_from_date(&date(2030, month, 28), FiscalConvention::Offset);
            assert_eq!(a, b);
            assert_eq!(a.quarter, quarter);
            assert_eq!(a.fiscal_year, FiscalYear::fy(2030 + offset));
        }
        assert_eq!(OFFSET_RELEASE_TABLE.lookup(0), None);
        assert_eq!(OFFSET_RELEASE_TABLE.lookup(13), None);
    }

    #[test]
    fn test_release_month_from_text() {
        assert_eq!(infer_release_month("Transcript Nov 2025"), Some(date(2025, 11, 1)));
        assert_eq!(infer_release_month("February, 2024 call"), Some(date(2024, 2, 1)));
        assert_eq!(infer_release_month("no date here"), None);
        assert_eq!(infer_release_month("Decision 2024"), None);
    }
}
