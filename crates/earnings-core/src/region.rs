//! Regions and their fiscal-year conventions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EarningsError;
use crate::fiscal::{CALENDAR_RELEASE_TABLE, OFFSET_RELEASE_TABLE, ReleaseTable};
use crate::period::FiscalYear;

/// Market region a company files in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    /// India (BSE, NSE, aggregators, company IR pages).
    India,
    /// United States (SEC EDGAR).
    Us,
    /// Japan (TDnet).
    Japan,
    /// South Korea (DART).
    Korea,
    /// China (CNINFO).
    China,
}

impl Region {
    /// All supported regions.
    pub const ALL: [Self; 5] = [Self::India, Self::Us, Self::Japan, Self::Korea, Self::China];

    /// Returns the fiscal-year convention companies in this region follow.
    #[must_use]
    pub const fn fiscal_convention(&self) -> FiscalConvention {
        match self {
            Self::India | Self::Japan => FiscalConvention::Offset,
            Self::Us | Self::Korea | Self::China => FiscalConvention::Calendar,
        }
    }

    /// Returns the lowercase identifier of this region.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::India => "india",
            Self::Us => "us",
            Self::Japan => "japan",
            Self::Korea => "korea",
            Self::China => "china",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Region {
    type Err = EarningsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "india" | "in" => Ok(Self::India),
            "us" | "usa" => Ok(Self::Us),
            "japan" | "jp" => Ok(Self::Japan),
            "korea" | "kr" => Ok(Self::Korea),
            "china" | "cn" => Ok(Self::China),
            other => Err(EarningsError::InvalidParameter(format!(
                "Unknown region: {other}"
            ))),
        }
    }
}

/// When a region's fiscal year starts, relative to the calendar.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FiscalConvention {
    /// January to December; quarters follow the calendar.
    Calendar,
    /// April to March; the fiscal year is named after the calendar year it ends in.
    Offset,
}

impl FiscalConvention {
    /// Release-month table used to infer a filing's owning quarter.
    #[must_use]
    pub const fn release_table(&self) -> &'static ReleaseTable {
        match self {
            Self::Calendar => &CALENDAR_RELEASE_TABLE,
            Self::Offset => &OFFSET_RELEASE_TABLE,
        }
    }

    /// Formats a fiscal year number the way this convention labels it.
    #[must_use]
    pub const fn fiscal_year(&self, year: i32) -> FiscalYear {
        match self {
            Self::Calendar => FiscalYear::calendar(year),
            Self::Offset => FiscalYear::fy(year),
        }
    }

    /// Re-renders a year parsed from text in this convention's format.
    ///
    /// Text tokens are always read as `FY<yy>`; calendar regions label years with
    /// four digits instead.
    #[must_use]
    pub const fn normalize_year(&self, year: FiscalYear) -> FiscalYear {
        match (self, year) {
            (Self::Calendar, FiscalYear::Fy(yy)) => FiscalYear::Calendar(2000 + yy as i32),
            (_, other) => other,
        }
    }

    /// Returns the lowercase identifier of this convention.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Calendar => "calendar",
            Self::Offset => "offset",
        }
    }
}
