//! Reporting period definitions.
//!
//! This module defines [`Quarter`] and [`FiscalYear`], and the [`QuarterLabel`] pair
//! that identifies which reporting period a document describes.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EarningsError;

/// Fiscal quarter of a document, or the full fiscal year for annual filings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Quarter {
    /// First fiscal quarter.
    Q1,
    /// Second fiscal quarter.
    Q2,
    /// Third fiscal quarter.
    Q3,
    /// Fourth fiscal quarter.
    Q4,
    /// Full fiscal year (annual filings).
    #[serde(rename = "FY")]
    FullYear,
    /// No period signal was available.
    #[default]
    Unknown,
}

impl Quarter {
    /// Returns the quarter for a number in `1..=4`.
    #[must_use]
    pub const fn from_number(n: u32) -> Option<Self> {
        match n {
            1 => Some(Self::Q1),
            2 => Some(Self::Q2),
            3 => Some(Self::Q3),
            4 => Some(Self::Q4),
            _ => None,
        }
    }

    /// Returns the quarter number (1-4), or `None` for full-year and unknown.
    #[must_use]
    pub const fn number(&self) -> Option<u8> {
        match self {
            Self::Q1 => Some(1),
            Self::Q2 => Some(2),
            Self::Q3 => Some(3),
            Self::Q4 => Some(4),
            Self::FullYear | Self::Unknown => None,
        }
    }

    /// Position of this quarter within its fiscal year for recency ordering.
    ///
    /// The full year closes the year, so it ranks after Q4.
    #[must_use]
    pub const fn rank(&self) -> u8 {
        match self {
            Self::Q1 => 1,
            Self::Q2 => 2,
            Self::Q3 => 3,
            Self::Q4 => 4,
            Self::FullYear => 5,
            Self::Unknown => 0,
        }
    }

    /// Returns true unless this is [`Quarter::Unknown`].
    #[must_use]
    pub const fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// Returns the canonical string form (`"Q1"`..`"Q4"`, `"FY"`, `"Unknown"`).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Q1 => "Q1",
            Self::Q2 => "Q2",
            Self::Q3 => "Q3",
            Self::Q4 => "Q4",
            Self::FullYear => "FY",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Quarter {
    type Err = EarningsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "Q1" => Ok(Self::Q1),
            "Q2" => Ok(Self::Q2),
            "Q3" => Ok(Self::Q3),
            "Q4" => Ok(Self::Q4),
            "FY" => Ok(Self::FullYear),
            "" | "UNKNOWN" => Ok(Self::Unknown),
            other => Err(EarningsError::Parse(format!("Invalid quarter: {other}"))),
        }
    }
}

/// Fiscal year of a document.
///
/// Offset-convention regions (India, Japan) label years as `FY<yy>`; calendar-convention
/// regions use the four-digit calendar year. Serialized as that same string, with
/// the empty string for an unknown year.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FiscalYear {
    /// Two-digit fiscal year, e.g. `FY26`.
    Fy(u8),
    /// Four-digit calendar year, e.g. `2025`.
    Calendar(i32),
    /// No year signal was available.
    #[default]
    Unknown,
}

impl FiscalYear {
    /// Creates an `FY<yy>` year from any year number, keeping its last two digits.
    #[must_use]
    pub const fn fy(year: i32) -> Self {
        Self::Fy(year.rem_euclid(100) as u8)
    }

    /// Creates a calendar year.
    #[must_use]
    pub const fn calendar(year: i32) -> Self {
        Self::Calendar(year)
    }

    /// Returns true unless this is [`FiscalYear::Unknown`].
    #[must_use]
    pub const fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// Returns a four-digit year usable for ordering, or `None` when unknown.
    ///
    /// Two-digit fiscal years are placed in the 2000s.
    #[must_use]
    pub const fn sort_year(&self) -> Option<i32> {
        match self {
            Self::Fy(yy) => Some(2000 + *yy as i32),
            Self::Calendar(year) => Some(*year),
            Self::Unknown => None,
        }
    }
}

impl fmt::Display for FiscalYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fy(yy) => write!(f, "FY{yy:02}"),
            Self::Calendar(year) => write!(f, "{year}"),
            Self::Unknown => Ok(()),
        }
    }
}

impl FromStr for FiscalYear {
    type Err = EarningsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Ok(Self::Unknown);
        }

        let invalid = || EarningsError::Parse(format!("Invalid fiscal year: {trimmed}"));
        let upper = trimmed.to_ascii_uppercase();
        if let Some(digits) = upper.strip_prefix("FY") {
            let digits = digits.trim_start_matches(['\'', ' ']);
            return match digits.len() {
                2 | 4 => digits.parse::<i32>().map(Self::fy).map_err(|_| invalid()),
                _ => Err(invalid()),
            };
        }

        if upper.len() == 4 {
            return upper.parse::<i32>().map(Self::Calendar).map_err(|_| invalid());
        }
        Err(invalid())
    }
}

impl TryFrom<String> for FiscalYear {
    type Error = EarningsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FiscalYear> for String {
    fn from(value: FiscalYear) -> Self {
        value.to_string()
    }
}

/// The `(quarter, fiscal_year)` pair identifying a document's reporting period.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuarterLabel {
    /// Fiscal quarter.
    pub quarter: Quarter,
    /// Fiscal year.
    pub fiscal_year: FiscalYear,
}

impl QuarterLabel {
    /// Creates a label from its parts.
    #[must_use]
    pub const fn new(quarter: Quarter, fiscal_year: FiscalYear) -> Self {
        Self {
            quarter,
            fiscal_year,
        }
    }

    /// The label used when no signal was available: `("Unknown", "")`.
    #[must_use]
    pub const fn unknown() -> Self {
        Self::new(Quarter::Unknown, FiscalYear::Unknown)
    }

    /// Returns true when both the quarter and the year are known.
    #[must_use]
    pub const fn is_known(&self) -> bool {
        self.quarter.is_known() && self.fiscal_year.is_known()
    }

    /// Ordering key for recency, `None` for labels that cannot be dated.
    #[must_use]
    pub const fn recency_key(&self) -> Option<(i32, u8)> {
        if !self.quarter.is_known() {
            return None;
        }
        match self.fiscal_year.sort_year() {
            Some(year) => Some((year, self.quarter.rank())),
            None => None,
        }
    }

    /// Compares two labels so that the most recent sorts first.
    ///
    /// Labels that cannot be dated always sort after dated ones; among themselves
    /// they fall back to their string form so the order stays total.
    #[must_use]
    pub fn cmp_recency(&self, other: &Self) -> Ordering {
        match (self.recency_key(), other.recency_key()) {
            (Some(a), Some(b)) => b.cmp(&a),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.to_string().cmp(&other.to_string()),
        }
    }
}

impl fmt::Display for QuarterLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.quarter, self.fiscal_year) {
            (Quarter::Unknown, FiscalYear::Unknown) => f.write_str("Unknown"),
            (quarter, FiscalYear::Unknown) => write!(f, "{quarter}"),
            (quarter, year) => write!(f, "{quarter} {year}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quarter_parse_and_display() {
        assert_eq!("q3".parse::<Quarter>().unwrap(), Quarter::Q3);
        assert_eq!("FY".parse::<Quarter>().unwrap(), Quarter::FullYear);
        assert_eq!("".parse::<Quarter>().unwrap(), Quarter::Unknown);
        assert!("Q5".parse::<Quarter>().is_err());
        assert_eq!(Quarter::FullYear.to_string(), "FY");
    }

    #[test]
    fn test_fiscal_year_forms() {
        assert_eq!("FY26".parse::<FiscalYear>().unwrap(), FiscalYear::Fy(26));
        assert_eq!("FY2026".parse::<FiscalYear>().unwrap(), FiscalYear::Fy(26));
        assert_eq!("2025".parse::<FiscalYear>().unwrap(), FiscalYear::Calendar(2025));
        assert_eq!("".parse::<FiscalYear>().unwrap(), FiscalYear::Unknown);
        assert!("FY2".parse::<FiscalYear>().is_err());

        assert_eq!(FiscalYear::Fy(5).to_string(), "FY05");
        assert_eq!(FiscalYear::fy(2100).to_string(), "FY00");
        assert_eq!(FiscalYear::Unknown.to_string(), "");
    }

    #[test]
    fn test_fiscal_year_serde_as_string() {
        let json = serde_json::to_string(&FiscalYear::Fy(26)).unwrap();
        assert_eq!(json, "\"FY26\"");
        let year: FiscalYear = serde_json::from_str("\"2024\"").unwrap();
        assert_eq!(year, FiscalYear::Calendar(2024));
    }

    #[test]
    fn test_full_year_ranks_after_q4() {
        let q4 = QuarterLabel::new(Quarter::Q4, FiscalYear::Calendar(2024));
        let fy = QuarterLabel::new(Quarter::FullYear, FiscalYear::Calendar(2024));
        assert_eq!(fy.cmp_recency(&q4), Ordering::Less);
    }

    #[test]
    fn test_unknown_sorts_last() {
        let old = QuarterLabel::new(Quarter::Q1, FiscalYear::Fy(10));
        let unknown = QuarterLabel::unknown();
        let half_known = QuarterLabel::new(Quarter::Q2, FiscalYear::Unknown);

        assert_eq!(old.cmp_recency(&unknown), Ordering::Less);
        assert_eq!(unknown.cmp_recency(&old), Ordering::Greater);
        assert_eq!(old.cmp_recency(&half_known), Ordering::Less);
        assert!(!half_known.is_known());
    }

    #[test]
    fn test_label_display() {
        assert_eq!(
            QuarterLabel::new(Quarter::Q3, FiscalYear::Fy(26)).to_string(),
            "Q3 FY26"
        );
        assert_eq!(QuarterLabel::unknown().to_string(), "Unknown");
    }
}
