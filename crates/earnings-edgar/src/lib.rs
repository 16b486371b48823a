#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/earnings/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! SEC EDGAR source adapter.
//!
//! This crate provides:
//!
//! - CIK (Central Index Key) lookup from a ticker or company name
//! - Recent submissions from the EDGAR submissions API
//! - Mapping of `10-Q`, `10-K` and `8-K` filings to labelled candidate documents
//!
//! EDGAR carries regulatory filings only; it has no earnings call transcripts or
//! investor presentations.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use earnings_core::{
    rules::us::{annual_label, doc_type_for_form},
    CandidateDocument, CompanyInfo, DocType, DocTypeFilter, DocumentSource, EarningsError,
    FilingSource, FiscalConvention, LabelResolver, RateLimiter, Region, Result, SourceTier,
    limit_by_quarter, normalize_company_name,
};
use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::sync::{Mutex, OnceCell};
use tracing::debug;

/// Source identifier used for provenance and priority lookups.
pub const SOURCE_ID: &str = "edgar";

/// SEC EDGAR API base URL
const EDGAR_BASE_URL: &str = "https://data.sec.gov";

/// SEC company tickers URL
const COMPANY_TICKERS_URL: &str = "https://www.sec.gov/files/company_tickers.json";

/// Filing archive base URL
const ARCHIVES_BASE_URL: &str = "https://www.sec.gov/Archives/edgar/data";

/// Default rate limit: 10 requests per second (SEC requirement)
const DEFAULT_RATE_LIMIT: Duration = Duration::from_millis(100);

/// Default request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Partial name matches shorter than this are ignored.
const MIN_PARTIAL_MATCH_LEN: usize = 3;

/// Fuzzy name matching needs at least this many characters.
const MIN_FUZZY_MATCH_LEN: usize = 5;

/// Similarity a fuzzy match needs to be taken as the company.
const FUZZY_MATCH_THRESHOLD: f64 = 0.88;

/// Similarity a name needs to be offered as a suggestion.
const SUGGESTION_THRESHOLD: f64 = 0.7;

/// SEC EDGAR document source.
///
/// Looks companies up in the SEC ticker map (loaded once, on first use) and lists
/// their recent filings. Implements rate limiting per SEC requirements
/// (max 10 requests/second).
#[derive(Debug)]
pub struct EdgarSource {
    client: reqwest::Client,
    rate_limiter: Arc<Mutex<RateLimiter>>,
    tickers: OnceCell<TickerIndex>,
}

impl EdgarSource {
    /// Create a new EDGAR source with the specified user agent.
    ///
    /// The SEC requires identifying user agent headers. Format should be:
    /// "AppName/Version (contact@email.com)"
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    ///
    /// # Example
    /// ```
    /// use earnings_edgar::EdgarSource;
    ///
    /// let source = EdgarSource::new("MyApp/1.0 (contact@example.com)").unwrap();
    /// ```
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| EarningsError::Network(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self::with_client(client))
    }

    /// Create a new EDGAR source with a custom HTTP client.
    ///
    /// The client must already carry an identifying user agent.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            rate_limiter: Arc::new(Mutex::new(RateLimiter::new(DEFAULT_RATE_LIMIT))),
            tickers: OnceCell::new(),
        }
    }

    /// Look up a company by ticker or name.
    ///
    /// Tries an exact ticker match, then an exact normalized-name match, then a
    /// partial name match, then the closest name by Jaro-Winkler similarity.
    pub async fn find_company(&self, query: &str) -> Result<Option<TickerEntry>> {
        if query.trim().is_empty() {
            return Err(EarningsError::InvalidParameter("Empty company query".to_string()));
        }

        let index = self
            .tickers
            .get_or_try_init(|| self.load_ticker_index())
            .await?;

        let found = index.find(query).cloned();
        match &found {
            Some(entry) => debug!(query, cik = %entry.cik_padded(), ticker = %entry.ticker, "Found CIK"),
            None => debug!(query, "Company not in SEC ticker map"),
        }
        Ok(found)
    }

    /// Companies whose names resemble `query`, best match first, with their
    /// Jaro-Winkler similarity.
    ///
    /// # Errors
    /// Returns an error if the SEC ticker map cannot be loaded.
    pub async fn suggest_companies(&self, query: &str, limit: usize) -> Result<Vec<(TickerEntry, f64)>> {
        let index = self
            .tickers
            .get_or_try_init(|| self.load_ticker_index())
            .await?;
        Ok(index.suggest(query, limit))
    }

    async fn load_ticker_index(&self) -> Result<TickerIndex> {
        debug!("Fetching company tickers from SEC");
        let raw: HashMap<String, CompanyTickerInfo> =
            self.get_json(COMPANY_TICKERS_URL, "company tickers").await?;
        let index = TickerIndex::from_raw(raw);
        debug!(companies = index.entries.len(), "Loaded SEC ticker map");
        Ok(index)
    }

    /// Fetch company submissions/filings metadata.
    async fn fetch_company_submissions(&self, cik: u64) -> Result<CompanySubmissions> {
        let url = format!("{}/submissions/CIK{:0>10}.json", EDGAR_BASE_URL, cik);
        self.get_json(&url, "submissions").await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, what: &str) -> Result<T> {
        // Rate limit
        self.rate_limiter.lock().await.wait().await;

        debug!("Fetching {} from {}", what, url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| EarningsError::Network(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(EarningsError::RateLimited {
                source_id: SOURCE_ID.to_string(),
                retry_after,
            });
        }
        if !status.is_success() {
            return Err(EarningsError::Network(format!(
                "Failed to fetch {}: HTTP {}",
                what, status
            )));
        }

        response
            .json()
            .await
            .map_err(|e| EarningsError::Parse(format!("Failed to parse {}: {}", what, e)))
    }
}

impl DocumentSource for EdgarSource {
    fn id(&self) -> &str {
        SOURCE_ID
    }

    fn name(&self) -> &str {
        "SEC EDGAR"
    }

    fn description(&self) -> &str {
        "SEC EDGAR filings: 10-Q quarterly reports, 10-K annual reports and 8-K press releases"
    }

    fn region(&self) -> Region {
        Region::Us
    }

    fn tier(&self) -> SourceTier {
        SourceTier::Official
    }
}

#[async_trait]
impl FilingSource for EdgarSource {
    async fn search_company(&self, query: &str) -> Result<Option<CompanyInfo>> {
        Ok(self.find_company(query).await?.map(|entry| entry.to_company_info()))
    }

    async fn fetch_documents(
        &self,
        company: &str,
        count: usize,
        filter: &DocTypeFilter,
    ) -> Result<Vec<CandidateDocument>> {
        let entry = self
            .find_company(company)
            .await?
            .ok_or_else(|| EarningsError::CompanyNotFound(company.to_string()))?;

        let submissions = self.fetch_company_submissions(entry.cik).await?;
        let candidates = candidates_from_submissions(&submissions, entry.cik, count, filter);
        debug!(
            company = %submissions.name,
            candidates = candidates.len(),
            "Collected EDGAR candidates"
        );
        Ok(candidates)
    }
}

// =============================================================================
// Ticker map
// =============================================================================

/// A company listed in the SEC ticker map.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TickerEntry {
    /// Central Index Key.
    pub cik: u64,
    /// Ticker symbol, upper case.
    pub ticker: String,
    /// Registered company name.
    pub title: String,
    normalized: String,
}

impl TickerEntry {
    /// CIK zero-padded to 10 digits, as the EDGAR APIs expect.
    #[must_use]
    pub fn cik_padded(&self) -> String {
        format!("{:0>10}", self.cik)
    }

    fn to_company_info(&self) -> CompanyInfo {
        let cik = self.cik_padded();
        let url = format!(
            "https://www.sec.gov/cgi-bin/browse-edgar?action=getcompany&CIK={cik}&type=10-&dateb=&owner=include&count=40"
        );
        CompanyInfo::new(&self.title, SOURCE_ID, Region::Us)
            .with_identifier(cik)
            .with_ticker(&self.ticker)
            .with_url(url)
    }
}

#[derive(Debug, Default)]
struct TickerIndex {
    entries: Vec<TickerEntry>,
    by_ticker: HashMap<String, usize>,
    by_name: HashMap<String, usize>,
}

impl TickerIndex {
    fn from_raw(raw: HashMap<String, CompanyTickerInfo>) -> Self {
        // Keys are positions in the SEC file; keep that order so partial matches
        // prefer the larger, earlier-listed companies.
        let mut rows: Vec<(u64, CompanyTickerInfo)> = raw
            .into_iter()
            .map(|(k, v)| (k.parse().unwrap_or(u64::MAX), v))
            .collect();
        rows.sort_by_key(|(pos, info)| (*pos, info.cik_str));

        let mut index = Self::default();
        for (_, info) in rows {
            let entry = TickerEntry {
                cik: info.cik_str,
                ticker: info.ticker.to_uppercase(),
                normalized: normalize_company_name(&info.title),
                title: info.title,
            };
            let i = index.entries.len();
            index.by_ticker.entry(entry.ticker.clone()).or_insert(i);
            if !entry.normalized.is_empty() {
                index.by_name.entry(entry.normalized.clone()).or_insert(i);
            }
            index.entries.push(entry);
        }
        index
    }

    fn find(&self, query: &str) -> Option<&TickerEntry> {
        let ticker = query.trim().to_uppercase();
        if let Some(&i) = self.by_ticker.get(&ticker) {
            return self.entries.get(i);
        }

        let normalized = normalize_company_name(query);
        if normalized.is_empty() {
            return None;
        }
        if let Some(&i) = self.by_name.get(&normalized) {
            return self.entries.get(i);
        }

        if let Some(entry) = self.entries.iter().find(|e| {
            e.normalized.len() >= MIN_PARTIAL_MATCH_LEN
                && (e.normalized.contains(&normalized) || normalized.contains(&e.normalized))
        }) {
            return Some(entry);
        }

        // Fuzzy tier, for misspellings
        if normalized.len() < MIN_FUZZY_MATCH_LEN {
            return None;
        }
        self.scored(&normalized, FUZZY_MATCH_THRESHOLD)
            .into_iter()
            .next()
            .map(|(entry, score)| {
                debug!(query, title = %entry.title, score, "Fuzzy company match");
                entry
            })
    }

    /// Entries whose normalized name scores at least `threshold`, best first.
    fn scored(&self, normalized: &str, threshold: f64) -> Vec<(&TickerEntry, f64)> {
        let mut hits: Vec<(&TickerEntry, f64)> = self
            .entries
            .iter()
            .map(|e| (e, strsim::jaro_winkler(normalized, &e.normalized)))
            .filter(|(_, score)| *score >= threshold)
            .collect();
        // Stable: equal scores keep file order.
        hits.sort_by(|a, b| b.1.total_cmp(&a.1));
        hits
    }

    fn suggest(&self, query: &str, limit: usize) -> Vec<(TickerEntry, f64)> {
        let normalized = normalize_company_name(query);
        if normalized.is_empty() {
            return Vec::new();
        }
        self.scored(&normalized, SUGGESTION_THRESHOLD)
            .into_iter()
            .take(limit)
            .map(|(e, score)| (e.clone(), score))
            .collect()
    }
}

// =============================================================================
// Submissions
// =============================================================================

/// Turns recent submissions into labelled candidates, limited to the `count`
/// most recent quarters.
///
/// Quarterly reports and current reports are labelled from their filing date
/// in the calendar convention; annual reports are labelled `FY` with the year
/// their report period ends in.
fn candidates_from_submissions(
    submissions: &CompanySubmissions,
    cik: u64,
    count: usize,
    filter: &DocTypeFilter,
) -> Vec<CandidateDocument> {
    let resolver = LabelResolver::new(FiscalConvention::Calendar);
    let recent = &submissions.filings.recent;

    let mut candidates = Vec::new();
    for (i, form) in recent.form.iter().enumerate() {
        let Some(doc_type) = doc_type_for_form(form) else {
            continue;
        };
        if !filter.allows(doc_type) {
            continue;
        }

        let (Some(accession), Some(primary_doc)) =
            (recent.accession_number.get(i), recent.primary_document.get(i))
        else {
            continue;
        };
        if accession.is_empty() || primary_doc.is_empty() {
            continue;
        }
        let Some(filed) = recent.filing_date.get(i).and_then(|d| parse_date(d)) else {
            continue;
        };

        let url = format!(
            "{}/{}/{}/{}",
            ARCHIVES_BASE_URL,
            cik,
            accession.replace('-', ""),
            primary_doc
        );
        let mut candidate = CandidateDocument::new(&submissions.name, doc_type, url, SOURCE_ID)
            .with_filing_date(filed.and_time(NaiveTime::MIN).and_utc());

        if doc_type == DocType::AnnualReport {
            let report = recent.report_date.get(i).and_then(|d| parse_date(d));
            candidate.set_label(annual_label(report, filed));
        } else {
            resolver.apply(&mut candidate, None);
        }
        candidates.push(candidate);
    }

    limit_by_quarter(candidates, count)
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

// =============================================================================
// SEC API Response Types
// =============================================================================

/// Company ticker information from SEC JSON.
#[derive(Debug, Deserialize)]
struct CompanyTickerInfo {
    /// CIK as a number (SEC returns this as an integer)
    cik_str: u64,
    /// Ticker symbol
    ticker: String,
    /// Company name
    title: String,
}

/// Company submissions/filings metadata.
#[derive(Debug, Deserialize)]
struct CompanySubmissions {
    /// Company name
    name: String,
    /// Filing history
    #[serde(default)]
    filings: Filings,
}

#[derive(Debug, Default, Deserialize)]
struct Filings {
    #[serde(default)]
    recent: RecentFilings,
}

/// Column-oriented list of the most recent filings; index `i` of every
/// vector describes the same filing.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecentFilings {
    #[serde(default)]
    accession_number: Vec<String>,
    #[serde(default)]
    filing_date: Vec<String>,
    #[serde(default)]
    report_date: Vec<String>,
    #[serde(default)]
    form: Vec<String>,
    #[serde(default)]
    primary_document: Vec<String>,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use earnings_core::{FiscalYear, Quarter, QuarterLabel};
    use serde_json::json;

    fn submissions() -> CompanySubmissions {
        serde_json::from_value(json!({
            "cik": "320193",
            "name": "Apple Inc.",
            "tickers": ["AAPL"],
            "filings": {
                "recent": {
                    "accessionNumber": [
                        "0000320193-25-000008",
                        "0000320193-25-000007",
                        "0000320193-24-000123",
                        "0000320193-24-000120",
                        "0000320193-24-000081",
                        "0000320193-24-000070",
                        "0000320193-24-000069"
                    ],
                    "filingDate": [
                        "2025-01-31",
                        "2025-01-30",
                        "2024-11-01",
                        "2024-10-31",
                        "2024-08-02",
                        "2024-05-03",
                        "2024-05-02"
                    ],
                    "reportDate": [
                        "2024-12-28",
                        "2025-01-30",
                        "2024-09-28",
                        "2024-10-31",
                        "2024-06-29",
                        "",
                        "2024-05-02"
                    ],
                    "form": ["10-Q", "8-K", "10-K", "8-K", "10-Q", "4", "8-K"],
                    "primaryDocument": [
                        "aapl-20241228.htm",
                        "aapl-20250130.htm",
                        "aapl-20240928.htm",
                        "aapl-20241031.htm",
                        "aapl-20240629.htm",
                        "xslF345X05/wk-form4.xml",
                        "aapl-20240502.htm"
                    ]
                }
            }
        }))
        .unwrap()
    }

    fn ticker_index() -> TickerIndex {
        let raw: HashMap<String, CompanyTickerInfo> = serde_json::from_value(json!({
            "0": {"cik_str": 320193, "ticker": "AAPL", "title": "Apple Inc."},
            "1": {"cik_str": 789019, "ticker": "MSFT", "title": "MICROSOFT CORP"},
            "2": {"cik_str": 1018724, "ticker": "AMZN", "title": "AMAZON COM INC"}
        }))
        .unwrap();
        TickerIndex::from_raw(raw)
    }

    #[test]
    fn test_source_traits() {
        let source = EdgarSource::new("Test/1.0 (test@example.com)").unwrap();

        assert_eq!(source.id(), "edgar");
        assert_eq!(source.name(), "SEC EDGAR");
        assert!(!source.description().is_empty());
        assert_eq!(source.region(), Region::Us);
        assert_eq!(source.tier(), SourceTier::Official);
    }

    #[test]
    fn test_ticker_lookup() {
        let index = ticker_index();
        assert_eq!(index.find("aapl").map(|e| e.cik), Some(320193));
        assert_eq!(index.find("Microsoft Corporation").map(|e| e.cik), Some(789019));
        assert_eq!(index.find("Amazon").map(|e| e.ticker.as_str()), Some("AMZN"));
        assert!(index.find("Tata Consultancy Services").is_none());
    }

    #[test]
    fn test_misspelled_name_matches_fuzzily() {
        let index = ticker_index();
        assert_eq!(index.find("Microsfot Corp").map(|e| e.ticker.as_str()), Some("MSFT"));
        // Too short to trust a fuzzy score.
        assert!(index.find("Aple").is_none());
    }

    #[test]
    fn test_suggestions_ranked() {
        let index = ticker_index();
        let suggestions = index.suggest("Amazon Corp", 3);
        assert_eq!(suggestions[0].0.ticker, "AMZN");
        assert!(suggestions.windows(2).all(|w| w[0].1 >= w[1].1));
        assert!(index.suggest("Tata Consultancy Services", 3).is_empty());
        assert!(index.suggest("Inc.", 3).is_empty());
    }

    #[test]
    fn test_company_info() {
        let index = ticker_index();
        let info = index.find("AAPL").unwrap().to_company_info();
        assert_eq!(info.name, "Apple Inc.");
        assert_eq!(info.identifier.as_deref(), Some("0000320193"));
        assert_eq!(info.ticker.as_deref(), Some("AAPL"));
        assert_eq!(info.region, Region::Us);
    }

    #[test]
    fn test_cik_padding() {
        let entry = ticker_index().find("AAPL").cloned().unwrap();
        assert_eq!(entry.cik_padded(), "0000320193");
        assert_eq!(entry.cik_padded().len(), 10);
    }

    #[test]
    fn test_candidates_from_submissions() {
        let docs = candidates_from_submissions(&submissions(), 320193, 10, &DocTypeFilter::all());

        // Form 4 is not an earnings document.
        assert_eq!(docs.len(), 6);
        assert!(docs.iter().all(|d| d.source == "edgar" && d.company == "Apple Inc."));

        let q = &docs[0];
        assert_eq!(q.doc_type, DocType::Pnl);
        assert_eq!(
            q.url,
            "https://www.sec.gov/Archives/edgar/data/320193/000032019325000008/aapl-20241228.htm"
        );
        // Released in January: Q4 of the prior calendar year.
        assert_eq!(q.label(), QuarterLabel::new(Quarter::Q4, FiscalYear::Calendar(2024)));

        let annual = docs.iter().find(|d| d.doc_type == DocType::AnnualReport).unwrap();
        assert_eq!(annual.label().to_string(), "FY 2024");

        let august = docs.iter().find(|d| d.url.ends_with("aapl-20240629.htm")).unwrap();
        assert_eq!(august.label(), QuarterLabel::new(Quarter::Q2, FiscalYear::Calendar(2024)));
        assert!(august.filing_date.is_some());
    }

    #[test]
    fn test_candidates_respect_filter() {
        let filter = DocTypeFilter::only([DocType::PressRelease]);
        let docs = candidates_from_submissions(&submissions(), 320193, 10, &filter);
        assert_eq!(docs.len(), 3);
        assert!(docs.iter().all(|d| d.doc_type == DocType::PressRelease));

        let filter = DocTypeFilter::only([DocType::Transcript]);
        assert!(candidates_from_submissions(&submissions(), 320193, 10, &filter).is_empty());
    }

    #[test]
    fn test_candidates_limited_by_quarter() {
        let docs = candidates_from_submissions(&submissions(), 320193, 2, &DocTypeFilter::all());
        let mut labels: Vec<_> = docs.iter().map(|d| d.label()).collect();
        labels.dedup();
        // FY 2024 ranks above Q4 2024, which ranks above Q3 2024.
        assert_eq!(
            labels,
            vec![
                QuarterLabel::new(Quarter::Q4, FiscalYear::Calendar(2024)),
                QuarterLabel::new(Quarter::FullYear, FiscalYear::Calendar(2024)),
            ]
        );
    }

    #[test]
    fn test_missing_columns_are_skipped() {
        let submissions: CompanySubmissions = serde_json::from_value(json!({
            "name": "Tiny Corp",
            "filings": {"recent": {
                "form": ["10-Q", "10-Q"],
                "filingDate": ["2024-08-01", "not a date"],
                "accessionNumber": ["0000000001-24-000001", "0000000001-24-000002"],
                "primaryDocument": ["tiny.htm"]
            }}
        }))
        .unwrap();
        let docs = candidates_from_submissions(&submissions, 1, 4, &DocTypeFilter::all());
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].url, "https://www.sec.gov/Archives/edgar/data/1/000000000124000001/tiny.htm");
    }
}
