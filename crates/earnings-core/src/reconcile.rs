//! Identity reconciliation.
//!
//! Sources overlap: an aggregator links the same exchange filing the exchange adapter
//! already returned, and a company's IR page republishes the transcript under a
//! different URL and a slightly different company name. [`Reconciler`] collapses
//! these into one [`CanonicalDocument`] per real-world filing in two passes:
//!
//! 1. **URL pass.** Candidates whose normalized URLs match are the same file.
//! 2. **Identity pass.** Survivors are grouped by normalized company, quarter, fiscal
//!    year and document type.
//!
//! In both passes the candidate from the source with the lowest priority number is
//! kept. Equal priorities keep the first-seen candidate and are reported as
//! [`IdentityConflict`]s. Output order depends only on the documents themselves
//! (recency, then document type, company and URL), never on arrival order.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::period::QuarterLabel;
use crate::source::SourceTier;
use crate::types::{CandidateDocument, CanonicalDocument, DocType};

/// Priority of a source missing from the table.
pub const UNKNOWN_SOURCE_PRIORITY: u8 = 99;

const CORPORATE_SUFFIXES: &[&str] = &[
    "ltd",
    "limited",
    "inc",
    "corp",
    "corporation",
    "co",
    "company",
    "plc",
    "nv",
    "sa",
    "ag",
    "se",
    "holdings",
    "group",
    "international",
    "intl",
];

/// Normalizes a company name for identity comparison.
///
/// Strips trailing corporate suffixes ("Ltd", "Inc", "Holdings", ...) repeatedly,
/// lowercases, and collapses whitespace. A name made only of suffixes keeps its
/// first word.
#[must_use]
pub fn normalize_company_name(name: &str) -> String {
    let mut words: Vec<&str> = name.split_whitespace().collect();
    while words.len() > 1 {
        let last = words[words.len() - 1]
            .trim_end_matches(['.', ','])
            .to_lowercase();
        if !CORPORATE_SUFFIXES.contains(&last.as_str()) {
            break;
        }
        words.pop();
    }
    words
        .iter()
        .enumerate()
        .map(|(i, w)| {
            let w = if i + 1 == words.len() {
                w.trim_end_matches(',')
            } else {
                w
            };
            w.to_lowercase()
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalizes a URL for exact-file comparison: trimmed, case-folded, trailing
/// slashes removed.
#[must_use]
pub fn normalize_url(url: &str) -> String {
    url.trim().to_lowercase().trim_end_matches('/').to_string()
}

/// Read-only mapping from source id to reconciliation priority.
///
/// Lower numbers win.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PriorityTable {
    priorities: HashMap<String, u8>,
}

impl PriorityTable {
    /// An empty table; every source gets [`UNKNOWN_SOURCE_PRIORITY`].
    #[must_use]
    pub fn empty() -> Self {
        Self {
            priorities: HashMap::new(),
        }
    }

    /// Sets a source's priority.
    #[must_use]
    pub fn with(mut self, source: impl Into<String>, priority: u8) -> Self {
        self.insert(source, priority);
        self
    }

    /// Sets a source's priority.
    pub fn insert(&mut self, source: impl Into<String>, priority: u8) {
        self.priorities.insert(source.into(), priority);
    }

    /// Sets a source's priority from its tier unless the table already has one.
    pub fn insert_if_absent(&mut self, source: &str, tier: SourceTier) {
        self.priorities
            .entry(source.to_string())
            .or_insert_with(|| tier.priority());
    }

    /// Returns a source's priority.
    #[must_use]
    pub fn get(&self, source: &str) -> u8 {
        self.priorities
            .get(source)
            .copied()
            .unwrap_or(UNKNOWN_SOURCE_PRIORITY)
    }
}

impl Default for PriorityTable {
    fn default() -> Self {
        [
            ("bse", 0),
            ("nse", 0),
            ("edgar", 0),
            ("tdnet", 0),
            ("dart", 0),
            ("cninfo", 0),
            ("screener", 1),
            ("trendlyne", 1),
            ("tijori", 1),
            ("company_ir", 2),
        ]
        .into_iter()
        .fold(Self::empty(), |table, (source, priority)| {
            table.with(source, priority)
        })
    }
}

/// Reconciliation pass that detected a conflict.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictStage {
    /// Same file, equal priority, different metadata.
    Url,
    /// Same company, period and type, equal priority, different files.
    Identity,
}

impl fmt::Display for ConflictStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Url => "url",
            Self::Identity => "identity",
        })
    }
}

/// Two equal-priority candidates for one identity; the first seen was kept.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityConflict {
    /// Pass that found the conflict.
    pub stage: ConflictStage,
    /// Shared identity key.
    pub key: String,
    /// Candidate that survived.
    pub kept: CandidateDocument,
    /// Candidate that was dropped.
    pub dropped: CandidateDocument,
}

/// Output of a reconciliation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciliation {
    /// Canonical documents, most recent first.
    pub documents: Vec<CanonicalDocument>,
    /// Equal-priority conflicts resolved by first-seen order.
    pub conflicts: Vec<IdentityConflict>,
}

/// Merges candidate documents into a canonical set.
#[derive(Clone, Debug, Default)]
pub struct Reconciler {
    priorities: PriorityTable,
    aliases: HashMap<String, String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct IdentityKey {
    company: String,
    label: QuarterLabel,
    doc_type: DocType,
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}|{}", self.company, self.label, self.doc_type)
    }
}

impl Reconciler {
    /// Creates a reconciler with a priority table.
    #[must_use]
    pub fn new(priorities: PriorityTable) -> Self {
        Self {
            priorities,
            aliases: HashMap::new(),
        }
    }

    /// Declares that two company names denote the same company.
    #[must_use]
    pub fn with_alias(mut self, alias: &str, canonical: &str) -> Self {
        let (alias, canonical) = (normalize_company_name(alias), normalize_company_name(canonical));
        if !alias.is_empty() && alias != canonical {
            self.aliases.insert(alias, canonical);
        }
        self
    }

    /// Returns the priority table.
    #[must_use]
    pub const fn priorities(&self) -> &PriorityTable {
        &self.priorities
    }

    /// Reconciles candidates into a canonical set.
    #[must_use]
    pub fn reconcile(&self, candidates: impl IntoIterator<Item = CandidateDocument>) -> Reconciliation {
        let mut conflicts = Vec::new();
        let by_url = self.collapse_urls(candidates, &mut conflicts);
        let survivors = self.collapse_identities(by_url, &mut conflicts);

        let company_keys = self.company_keys(&survivors);
        let mut documents: Vec<CanonicalDocument> = survivors
            .into_iter()
            .map(CanonicalDocument::from_candidate)
            .collect();
        documents.sort_by(|a, b| canonical_order(a, b, &company_keys));

        Reconciliation {
            documents,
            conflicts,
        }
    }

    fn priority(&self, candidate: &CandidateDocument) -> u8 {
        self.priorities.get(&candidate.source)
    }

    fn collapse_urls(
        &self,
        candidates: impl IntoIterator<Item = CandidateDocument>,
        conflicts: &mut Vec<IdentityConflict>,
    ) -> Vec<CandidateDocument> {
        let mut kept: Vec<CandidateDocument> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for candidate in candidates {
            let key = normalize_url(&candidate.url);
            let Some(&i) = index.get(&key) else {
                index.insert(key, kept.len());
                kept.push(candidate);
                continue;
            };
            let existing = &kept[i];
            match self.priority(&candidate).cmp(&self.priority(existing)) {
                Ordering::Less => {
                    debug!(
                        url = %key,
                        kept = %candidate.source,
                        dropped = %existing.source,
                        "Same file from a higher-priority source"
                    );
                    kept[i] = candidate;
                }
                Ordering::Equal if describes_differently(existing, &candidate) => {
                    debug!(
                        url = %key,
                        kept = %existing.label(),
                        dropped = %candidate.label(),
                        "Equal-priority conflict on one file, keeping first seen"
                    );
                    conflicts.push(IdentityConflict {
                        stage: ConflictStage::Url,
                        key,
                        kept: existing.clone(),
                        dropped: candidate,
                    });
                }
                _ => {}
            }
        }
        kept
    }

    fn collapse_identities(
        &self,
        candidates: Vec<CandidateDocument>,
        conflicts: &mut Vec<IdentityConflict>,
    ) -> Vec<CandidateDocument> {
        let company_keys = self.company_keys(&candidates);
        let mut kept: Vec<CandidateDocument> = Vec::new();
        let mut index: HashMap<IdentityKey, usize> = HashMap::new();

        for candidate in candidates {
            // Without a full label there is no identity beyond the URL.
            if !candidate.label().is_known() {
                kept.push(candidate);
                continue;
            }
            let key = IdentityKey {
                company: company_key(&company_keys, &candidate.company),
                label: candidate.label(),
                doc_type: candidate.doc_type,
            };
            let Some(&i) = index.get(&key) else {
                index.insert(key, kept.len());
                kept.push(candidate);
                continue;
            };
            let existing = &kept[i];
            match self.priority(&candidate).cmp(&self.priority(existing)) {
                Ordering::Less => {
                    debug!(
                        identity = %key,
                        kept = %candidate.url,
                        dropped = %existing.url,
                        "Same filing from a higher-priority source"
                    );
                    kept[i] = candidate;
                }
                Ordering::Equal => {
                    debug!(
                        identity = %key,
                        kept = %existing.url,
                        dropped = %candidate.url,
                        "Equal-priority identity conflict, keeping first seen"
                    );
                    conflicts.push(IdentityConflict {
                        stage: ConflictStage::Identity,
                        key: key.to_string(),
                        kept: existing.clone(),
                        dropped: candidate,
                    });
                }
                Ordering::Greater => {}
            }
        }
        kept
    }

    /// Maps every normalized company name in `candidates` to its identity key.
    ///
    /// Explicit aliases apply first. A single-word name that spells the initials of
    /// exactly one multi-word name in the same set is treated as that name's
    /// abbreviation ("TCS" for "Tata Consultancy Services").
    fn company_keys(&self, candidates: &[CandidateDocument]) -> HashMap<String, String> {
        let names: BTreeSet<String> = candidates
            .iter()
            .map(|c| {
                let normalized = normalize_company_name(&c.company);
                self.aliases.get(&normalized).cloned().unwrap_or(normalized)
            })
            .collect();

        let mut by_initials: BTreeMap<String, HashSet<&str>> = BTreeMap::new();
        for name in names.iter().filter(|n| n.split_whitespace().count() > 1) {
            let initials: String = name
                .split_whitespace()
                .filter_map(|w| w.chars().next())
                .collect();
            by_initials.entry(initials).or_default().insert(name.as_str());
        }

        let mut keys: HashMap<String, String> = HashMap::new();
        for candidate in candidates {
            let normalized = normalize_company_name(&candidate.company);
            let aliased = self.aliases.get(&normalized).cloned().unwrap_or_else(|| normalized.clone());
            let key = match by_initials.get(&aliased) {
                Some(expansions) if expansions.len() == 1 && !aliased.contains(' ') => expansions
                    .iter()
                    .next()
                    .map_or(aliased.clone(), |s| (*s).to_string()),
                _ => aliased,
            };
            keys.insert(normalized, key);
        }
        keys
    }
}

fn company_key(keys: &HashMap<String, String>, company: &str) -> String {
    let normalized = normalize_company_name(company);
    keys.get(&normalized).cloned().unwrap_or(normalized)
}

fn describes_differently(a: &CandidateDocument, b: &CandidateDocument) -> bool {
    a.label() != b.label()
        || a.doc_type != b.doc_type
        || normalize_company_name(&a.company) != normalize_company_name(&b.company)
}

fn canonical_order(
    a: &CanonicalDocument,
    b: &CanonicalDocument,
    company_keys: &HashMap<String, String>,
) -> Ordering {
    a.label()
        .cmp_recency(&b.label())
        .then_with(|| a.doc_type.cmp(&b.doc_type))
        .then_with(|| company_key(company_keys, &a.company).cmp(&company_key(company_keys, &b.company)))
        .then_with(|| normalize_url(&a.url).cmp(&normalize_url(&b.url)))
        .then_with(|| a.source.cmp(&b.source))
}

/// Reconciles candidates with a priority table and returns the canonical documents.
#[must_use]
pub fn reconcile(
    candidates: impl IntoIterator<Item = CandidateDocument>,
    priorities: &PriorityTable,
) -> Vec<CanonicalDocument> {
    Reconciler::new(priorities.clone())
        .reconcile(candidates)
        .documents
}

/// Keeps only documents from the `count` most recent quarter labels.
///
/// Dated labels are taken newest first. Labels that cannot be dated are only kept
/// while fewer than `count` groups have been selected. Input order is preserved.
#[must_use]
pub fn limit_by_quarter<D: AsRef<CandidateDocument>>(documents: Vec<D>, count: usize) -> Vec<D> {
    let mut labels: Vec<QuarterLabel> = documents
        .iter()
        .map(|d| d.as_ref().label())
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    labels.sort_by(|a, b| a.cmp_recency(b).then_with(|| a.to_string().cmp(&b.to_string())));
    labels.truncate(count);

    let selected: HashSet<QuarterLabel> = labels.into_iter().collect();
    documents
        .into_iter()
        .filter(|d| selected.contains(&d.as_ref().label()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::period::{FiscalYear, Quarter};

    fn candidate(
        company: &str,
        quarter: Quarter,
        year: FiscalYear,
        doc_type: DocType,
        url: &str,
        source: &str,
    ) -> CandidateDocument {
        CandidateDocument::new(company, doc_type, url, source)
            .with_label(QuarterLabel::new(quarter, year))
    }

    fn fy(yy: u8) -> FiscalYear {
        FiscalYear::Fy(yy)
    }

    #[test]
    fn test_normalize_company_name() {
        assert_eq!(normalize_company_name("TCS Ltd"), "tcs");
        assert_eq!(normalize_company_name("Infosys Limited"), "infosys");
        assert_eq!(normalize_company_name("  Apple,  Inc. "), "apple");
        assert_eq!(normalize_company_name("Aditya Birla Group Holdings"), "aditya birla");
        assert_eq!(normalize_company_name("Group"), "group");
        assert_eq!(normalize_company_name("Coca Cola Co"), "coca cola");
    }

    #[test]
    fn test_normalize_url() {
        assert_eq!(normalize_url("HTTPS://X.com/A.pdf//"), "https://x.com/a.pdf");
    }

    #[test]
    fn test_priority_defaults() {
        let table = PriorityTable::default();
        assert_eq!(table.get("bse"), 0);
        assert_eq!(table.get("screener"), 1);
        assert_eq!(table.get("company_ir"), 2);
        assert_eq!(table.get("mystery"), UNKNOWN_SOURCE_PRIORITY);

        let mut table = table;
        table.insert_if_absent("bse", SourceTier::CompanyIr);
        table.insert_if_absent("tdnet_mirror", SourceTier::Aggregator);
        assert_eq!(table.get("bse"), 0);
        assert_eq!(table.get("tdnet_mirror"), 1);
    }

    #[test]
    fn test_same_url_keeps_official_source() {
        let url = "https://www.bseindia.com/xml-data/corpfiling/AttachHis/abc.pdf";
        let docs = reconcile(
            [
                candidate("TCS", Quarter::Q2, fy(26), DocType::Transcript, &format!("{url}/"), "screener"),
                candidate("TCS", Quarter::Q2, fy(26), DocType::Transcript, url, "bse"),
            ],
            &PriorityTable::default(),
        );
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].source, "bse");
    }

    #[test]
    fn test_logical_identity_collapses_across_names() {
        let docs = reconcile(
            [
                candidate(
                    "Tata Consultancy Services",
                    Quarter::Q2,
                    fy(26),
                    DocType::Transcript,
                    "https://tcs.com/ir/q2.pdf",
                    "company_ir",
                ),
                candidate(
                    "TCS Ltd",
                    Quarter::Q2,
                    fy(26),
                    DocType::Transcript,
                    "https://screener.in/tcs/q2.pdf",
                    "screener",
                ),
            ],
            &PriorityTable::default(),
        );
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].source, "screener");
    }

    #[test]
    fn test_explicit_alias() {
        let reconciler = Reconciler::default().with_alias("AAPL", "Apple Inc.");
        let out = reconciler.reconcile([
            candidate("AAPL", Quarter::Q1, FiscalYear::Calendar(2025), DocType::Pnl, "https://a/1", "screener"),
            candidate("APPLE INC", Quarter::Q1, FiscalYear::Calendar(2025), DocType::Pnl, "https://b/2", "edgar"),
        ]);
        assert_eq!(out.documents.len(), 1);
        assert_eq!(out.documents[0].source, "edgar");
    }

    #[test]
    fn test_equal_priority_keeps_first_and_reports() {
        let out = Reconciler::default().reconcile([
            candidate("Infosys", Quarter::Q1, fy(26), DocType::Pnl, "https://a/1.pdf", "bse"),
            candidate("Infosys Ltd", Quarter::Q1, fy(26), DocType::Pnl, "https://a/2.pdf", "nse"),
        ]);
        assert_eq!(out.documents.len(), 1);
        assert_eq!(out.documents[0].url, "https://a/1.pdf");
        assert_eq!(out.conflicts.len(), 1);
        assert_eq!(out.conflicts[0].stage, ConflictStage::Identity);
        assert_eq!(out.conflicts[0].dropped.url, "https://a/2.pdf");
    }

    #[test]
    fn test_url_conflict_reported() {
        let out = Reconciler::default().reconcile([
            candidate("Infosys", Quarter::Q1, fy(26), DocType::Pnl, "https://a/1.pdf", "bse"),
            candidate("Infosys", Quarter::Q2, fy(26), DocType::Pnl, "https://a/1.pdf", "nse"),
        ]);
        assert_eq!(out.documents.len(), 1);
        assert_eq!(out.documents[0].quarter, Quarter::Q1);
        assert_eq!(out.conflicts[0].stage, ConflictStage::Url);
    }

    #[test]
    fn test_unknown_labels_only_collapse_by_url() {
        let docs = reconcile(
            [
                CandidateDocument::new("Infosys", DocType::Transcript, "https://a/x.pdf", "screener"),
                CandidateDocument::new("Infosys", DocType::Transcript, "https://a/y.pdf", "screener"),
                candidate("Infosys", Quarter::Q4, fy(25), DocType::Transcript, "https://a/z.pdf", "bse"),
            ],
            &PriorityTable::default(),
        );
        assert_eq!(docs.len(), 3);
        assert_eq!(docs[0].quarter, Quarter::Q4);
        assert!(!docs[2].label().is_known());
    }

    #[test]
    fn test_permutation_invariant() {
        let input = vec![
            candidate("TCS", Quarter::Q1, fy(26), DocType::Transcript, "https://bse/1.pdf", "bse"),
            candidate("TCS Ltd", Quarter::Q1, fy(26), DocType::Transcript, "https://ir/1.pdf", "company_ir"),
            candidate("TCS", Quarter::Q4, fy(25), DocType::Pnl, "https://bse/2.pdf", "bse"),
            candidate("TCS", Quarter::Q4, fy(25), DocType::Pnl, "https://BSE/2.pdf/", "screener"),
            candidate("TCS", Quarter::Q2, fy(26), DocType::Presentation, "https://scr/3.pdf", "screener"),
            CandidateDocument::new("TCS", DocType::PressRelease, "https://ir/4.pdf", "company_ir"),
        ];
        let expected = reconcile(input.clone(), &PriorityTable::default());

        let mut reversed = input.clone();
        reversed.reverse();
        let mut rotated = input;
        rotated.rotate_left(2);

        assert_eq!(reconcile(reversed, &PriorityTable::default()), expected);
        assert_eq!(reconcile(rotated, &PriorityTable::default()), expected);
        assert_eq!(expected.len(), 4);
        assert_eq!(expected[0].quarter, Quarter::Q2);
    }

    #[test]
    fn test_limit_by_quarter() {
        let docs = vec![
            candidate("X", Quarter::Q2, fy(26), DocType::Pnl, "u1", "bse"),
            candidate("X", Quarter::Q2, fy(26), DocType::Transcript, "u2", "bse"),
            candidate("X", Quarter::Q1, fy(26), DocType::Pnl, "u3", "bse"),
            candidate("X", Quarter::Q4, fy(25), DocType::Pnl, "u4", "bse"),
            CandidateDocument::new("X", DocType::Pnl, "u5", "bse"),
        ];

        let two = limit_by_quarter(docs.clone(), 2);
        assert_eq!(two.len(), 3);
        assert!(two.iter().all(|d| d.fiscal_year == fy(26)));

        let four = limit_by_quarter(docs.clone(), 4);
        assert_eq!(four.len(), 5);

        let three = limit_by_quarter(docs, 3);
        assert!(three.iter().all(|d| d.label().is_known()));
    }
}
