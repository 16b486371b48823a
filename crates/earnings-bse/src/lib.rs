#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/earnings/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! BSE India source adapter.
//!
//! This crate provides:
//!
//! - Scrip code lookup through the BSE smart search
//! - Paginated "Result" announcements for a scrip
//! - Classification of announcements into document types and quarter labels

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Days, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use earnings_core::{
    rules::india::classify_announcement,
    CandidateDocument, CompanyInfo, DocTypeFilter, DocumentSource, EarningsError, FilingSource,
    LabelResolver, RateLimiter, Region, Result, SourceTier, limit_by_quarter,
    normalize_company_name,
};
use regex::Regex;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, ORIGIN, REFERER};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Source identifier used for provenance and priority lookups.
pub const SOURCE_ID: &str = "bse";

/// BSE API base URL
const API_BASE_URL: &str = "https://api.bseindia.com/BseIndiaAPI/api";

/// Attachment archive base URL
const PDF_BASE_URL: &str = "https://www.bseindia.com/xml-data/corpfiling/AttachHis";

/// Public site, sent as origin and referer
const SITE_URL: &str = "https://www.bseindia.com";

/// User agent for HTTP requests.
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";

/// Default rate limit: roughly 7 requests per second.
const DEFAULT_RATE_LIMIT: Duration = Duration::from_millis(150);

/// Default request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default cap on announcement pages fetched per company.
pub const DEFAULT_MAX_PAGES: u32 = 20;

/// Rows per announcement page.
const ROWS_PER_PAGE: u64 = 25;

/// Announcements are searched back this many days per requested quarter, plus
/// [`LOOKBACK_SLACK_DAYS`].
const LOOKBACK_DAYS_PER_QUARTER: u64 = 92;
const LOOKBACK_SLACK_DAYS: u64 = 180;

static HTML_NAME_THEN_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<[^>]*?>\s*([A-Za-z][A-Za-z0-9 &.'\-]+?)\s*</[^>]*>.*?(\d{6})")
        .expect("valid regex")
});

static HTML_CODE_THEN_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)(\d{6}).*?<[^>]*?>\s*([A-Za-z][A-Za-z0-9 &.'\-]+?)\s*</[^>]*>")
        .expect("valid regex")
});

static SCRIP_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{6})\b").expect("valid regex"));

/// BSE India document source.
///
/// All requests, including every page of an announcement listing, go through one
/// rate limiter and are therefore serialized.
#[derive(Debug)]
pub struct BseSource {
    client: reqwest::Client,
    rate_limiter: Arc<Mutex<RateLimiter>>,
    max_pages: u32,
}

impl BseSource {
    /// Create a new BSE source with default settings.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new() -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ORIGIN, HeaderValue::from_static(SITE_URL));
        headers.insert(REFERER, HeaderValue::from_static("https://www.bseindia.com/"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/plain, */*"));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| EarningsError::Network(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self::with_client(client))
    }

    /// Create a new BSE source with a custom HTTP client.
    ///
    /// BSE rejects requests without its own origin and referer headers, so the
    /// client should send them by default.
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            rate_limiter: Arc::new(Mutex::new(RateLimiter::new(DEFAULT_RATE_LIMIT))),
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    /// Sets the minimum interval between requests.
    #[must_use]
    pub fn with_rate_limit(mut self, min_interval: Duration) -> Self {
        self.rate_limiter = Arc::new(Mutex::new(RateLimiter::new(min_interval)));
        self
    }

    /// Sets the cap on announcement pages fetched per company.
    #[must_use]
    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Look up a company's scrip code.
    ///
    /// Searches with the normalized name first, then with the query as given.
    async fn find_scrip(&self, query: &str) -> Result<Option<ScripMatch>> {
        if query.trim().is_empty() {
            return Err(EarningsError::InvalidParameter("Empty company query".to_string()));
        }

        let normalized = normalize_company_name(query);
        if let Some(found) = self.search_scrip(&normalized).await? {
            return Ok(Some(found));
        }
        if normalized != query.trim() {
            return self.search_scrip(query.trim()).await;
        }
        Ok(None)
    }

    async fn search_scrip(&self, text: &str) -> Result<Option<ScripMatch>> {
        let url = format!("{}/PeerSmartSearch/w", API_BASE_URL);
        let body = self
            .get_text(&url, &[("Type", "SS".to_string()), ("text", text.to_string())])
            .await?;

        let found = parse_search_results(&body).into_iter().next();
        match &found {
            Some(m) => debug!(query = text, scrip = %m.code, name = %m.name, "Found BSE scrip"),
            None => debug!(query = text, "No BSE scrip found"),
        }
        Ok(found)
    }

    /// Fetch one page of "Result" announcements.
    async fn fetch_announcements(
        &self,
        scrip: &str,
        from: &str,
        to: &str,
        page: u32,
    ) -> Result<AnnouncementPage> {
        let url = format!("{}/AnnSubCategoryGetData/w", API_BASE_URL);
        let body = self
            .get_text(
                &url,
                &[
                    ("pageno", page.to_string()),
                    ("strCat", "Result".to_string()),
                    ("subcategory", "-1".to_string()),
                    ("strPrevDate", from.to_string()),
                    ("strToDate", to.to_string()),
                    ("strSearch", "P".to_string()),
                    ("strscrip", scrip.to_string()),
                    ("strType", "C".to_string()),
                ],
            )
            .await?;

        serde_json::from_str(&body)
            .map_err(|e| EarningsError::Parse(format!("Failed to parse announcements: {}", e)))
    }

    async fn get_text(&self, url: &str, params: &[(&str, String)]) -> Result<String> {
        // Rate limit
        self.rate_limiter.lock().await.wait().await;

        debug!("Fetching {}", url);
        let response = self
            .client
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(|e| EarningsError::Network(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(EarningsError::RateLimited {
                source_id: SOURCE_ID.to_string(),
                retry_after: None,
            });
        }
        if !status.is_success() {
            return Err(EarningsError::Network(format!("BSE request failed: HTTP {}", status)));
        }

        response
            .text()
            .await
            .map_err(|e| EarningsError::Network(e.to_string()))
    }
}

impl DocumentSource for BseSource {
    fn id(&self) -> &str {
        SOURCE_ID
    }

    fn name(&self) -> &str {
        "BSE India"
    }

    fn description(&self) -> &str {
        "BSE corporate announcements: financial results, investor presentations, transcripts and press releases"
    }

    fn region(&self) -> Region {
        Region::India
    }

    fn tier(&self) -> SourceTier {
        SourceTier::Official
    }
}

#[async_trait]
impl FilingSource for BseSource {
    async fn search_company(&self, query: &str) -> Result<Option<CompanyInfo>> {
        let Some(scrip) = self.find_scrip(query).await? else {
            return Ok(None);
        };
        let name = if scrip.name.is_empty() {
            query.trim().to_string()
        } else {
            scrip.name
        };
        Ok(Some(
            CompanyInfo::new(name, SOURCE_ID, Region::India)
                .with_url(format!("{}/stock-share-price/-/-/{}", SITE_URL, scrip.code))
                .with_identifier(scrip.code),
        ))
    }

    async fn fetch_documents(
        &self,
        company: &str,
        count: usize,
        filter: &DocTypeFilter,
    ) -> Result<Vec<CandidateDocument>> {
        let scrip = self
            .find_scrip(company)
            .await?
            .ok_or_else(|| EarningsError::CompanyNotFound(company.to_string()))?;
        let name = if scrip.name.is_empty() {
            company.trim()
        } else {
            scrip.name.as_str()
        };

        let (from, to) = date_range(Utc::now().date_naive(), count);
        let mut candidates = Vec::new();

        for page in 1..=self.max_pages {
            let data = match self.fetch_announcements(&scrip.code, &from, &to, page).await {
                Ok(data) => data,
                Err(e) if page == 1 => return Err(e),
                Err(e) => {
                    warn!(source = SOURCE_ID, page, error = %e, "Announcement page failed, keeping earlier pages");
                    break;
                }
            };
            if data.table.is_empty() {
                break;
            }

            candidates.extend(
                data.table
                    .iter()
                    .filter_map(|row| parse_announcement(row, name, filter)),
            );

            if !has_more_pages(data.table1.first(), page) {
                break;
            }
        }

        debug!(
            company = name,
            scrip = %scrip.code,
            candidates = candidates.len(),
            "Collected BSE candidates"
        );
        Ok(limit_by_quarter(candidates, count))
    }
}

// =============================================================================
// Parsing
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
struct ScripMatch {
    code: String,
    name: String,
}

/// Parses the smart-search response.
///
/// The endpoint answers with a JSON list on some deployments and an HTML
/// fragment on others.
fn parse_search_results(text: &str) -> Vec<ScripMatch> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }

    if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(text) {
        return items.iter().filter_map(scrip_from_json).collect();
    }

    let name_then_code: Vec<ScripMatch> = HTML_NAME_THEN_CODE
        .captures_iter(text)
        .map(|c| ScripMatch {
            code: c[2].to_string(),
            name: c[1].trim().to_string(),
        })
        .collect();
    if !name_then_code.is_empty() {
        return name_then_code;
    }

    let code_then_name: Vec<ScripMatch> = HTML_CODE_THEN_NAME
        .captures_iter(text)
        .map(|c| ScripMatch {
            code: c[1].to_string(),
            name: c[2].trim().to_string(),
        })
        .collect();
    if !code_then_name.is_empty() {
        return code_then_name;
    }

    SCRIP_CODE
        .captures(text)
        .map(|c| ScripMatch {
            code: c[1].to_string(),
            name: String::new(),
        })
        .into_iter()
        .collect()
}

fn scrip_from_json(item: &Value) -> Option<ScripMatch> {
    let field = |keys: &[&str]| {
        keys.iter().find_map(|k| match item.get(*k)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    };
    Some(ScripMatch {
        code: field(&["scrip_cd", "SCRIP_CD", "scripcode"])?,
        name: field(&["scrip_name", "SCRIP_NAME", "company"])?,
    })
}

/// Returns the `(from, to)` announcement window as `YYYYMMDD` strings.
fn date_range(today: NaiveDate, count: usize) -> (String, String) {
    let days = u64::try_from(count)
        .unwrap_or(u64::MAX)
        .saturating_mul(LOOKBACK_DAYS_PER_QUARTER)
        .saturating_add(LOOKBACK_SLACK_DAYS);
    let from = today.checked_sub_days(Days::new(days)).unwrap_or(NaiveDate::MIN);
    (
        from.format("%Y%m%d").to_string(),
        today.format("%Y%m%d").to_string(),
    )
}

fn has_more_pages(info: Option<&PageInfo>, page: u32) -> bool {
    let page = u64::from(page);
    match info {
        Some(PageInfo {
            total_pages: Some(pages),
            ..
        }) => page < *pages,
        Some(PageInfo {
            row_count: Some(rows),
            ..
        }) => page * ROWS_PER_PAGE < *rows,
        _ => false,
    }
}

/// Turns one announcement row into a candidate, or `None` when it has no
/// attachment, is not an earnings document, or is filtered out.
fn parse_announcement(
    row: &Announcement,
    company: &str,
    filter: &DocTypeFilter,
) -> Option<CandidateDocument> {
    let attachment = row.attachment.as_deref().map(str::trim).unwrap_or_default();
    if attachment.is_empty() {
        return None;
    }

    let subject = row.subject.as_deref().unwrap_or_default();
    let headline = row.headline.as_deref().unwrap_or_default();
    let doc_type = classify_announcement(
        row.subcategory.as_deref().unwrap_or_default(),
        row.category.as_deref().unwrap_or_default(),
        &format!("{} {}", subject, headline),
    )?;
    if !filter.allows(doc_type) {
        return None;
    }

    let url = format!("{}/{}", PDF_BASE_URL, attachment);
    let mut candidate = CandidateDocument::new(company, doc_type, url, SOURCE_ID);
    if let Some(filed) = row
        .dissemination_time
        .as_deref()
        .and_then(parse_datetime)
        .or_else(|| row.news_date.as_deref().and_then(parse_datetime))
    {
        candidate = candidate.with_filing_date(filed);
    }

    let context = if subject.trim().is_empty() { headline } else { subject };
    LabelResolver::for_region(Region::India).apply(&mut candidate, Some(context));
    Some(candidate)
}

/// Parses the timestamp formats BSE uses, e.g. `2025-10-09T17:32:15.39`.
fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y%m%d%H%M%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y%m%d")
        .ok()
        .or_else(|| s.get(..10).and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()))
        .map(|d| d.and_time(NaiveTime::MIN).and_utc())
}

// =============================================================================
// BSE API Response Types
// =============================================================================

/// One page of the announcements API.
#[derive(Debug, Default, Deserialize)]
struct AnnouncementPage {
    #[serde(rename = "Table", default)]
    table: Vec<Announcement>,
    #[serde(rename = "Table1", default)]
    table1: Vec<PageInfo>,
}

/// A corporate announcement.
#[derive(Debug, Default, Deserialize)]
struct Announcement {
    #[serde(rename = "NEWSSUB", default)]
    subject: Option<String>,
    #[serde(rename = "HEADLINE", default)]
    headline: Option<String>,
    #[serde(rename = "SUBCATNAME", default)]
    subcategory: Option<String>,
    #[serde(rename = "CATEGORYNAME", default)]
    category: Option<String>,
    #[serde(rename = "ATTACHMENTNAME", default)]
    attachment: Option<String>,
    #[serde(rename = "DT_TM", default)]
    dissemination_time: Option<String>,
    #[serde(rename = "NEWS_DT", default)]
    news_date: Option<String>,
}

/// Pagination metadata. Deployments report either a page count or a row count.
#[derive(Debug, Default, Deserialize)]
struct PageInfo {
    #[serde(rename = "TotalPageCnt", default)]
    total_pages: Option<u64>,
    #[serde(rename = "ROWCNT", default)]
    row_count: Option<u64>,
}

// =============================================================================
// Tests
// =============================================================================
