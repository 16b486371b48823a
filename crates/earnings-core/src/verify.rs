//! Content-based label verification.
//!
//! Date-derived labels are heuristic. Once a document has been downloaded,
//! [`ContentVerifier`] reads its first pages, collects every explicit quarter token,
//! and takes the most frequent one as the document's real period. A single stray
//! comparison ("versus Q2 FY25") cannot outvote the quarter the document is about.
//!
//! Verification fails open: a document without tokens, or one that cannot be read
//! at all, keeps its label and is reported as unverified.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;
use crate::fiscal::find_quarter_tokens;
use crate::period::{FiscalYear, Quarter, QuarterLabel};
use crate::region::FiscalConvention;
use crate::types::{CandidateDocument, CanonicalDocument};

/// Default number of leading pages inspected.
pub const DEFAULT_MAX_PAGES: usize = 3;

/// Extracts plain text per page from document bytes.
pub trait PageTextExtractor: Send + Sync + Debug {
    /// Returns the text of at most `max_pages` leading pages.
    ///
    /// Returns an error when the bytes are not a readable document.
    fn extract_pages(&self, bytes: &[u8], max_pages: usize) -> Result<Vec<String>>;
}

/// PDF text extraction backed by `pdf-extract`.
#[cfg(feature = "pdf")]
#[derive(Clone, Copy, Debug, Default)]
pub struct PdfTextExtractor;

#[cfg(feature = "pdf")]
impl PageTextExtractor for PdfTextExtractor {
    /// Loads the object table, then renders only the leading `max_pages` pages.
    ///
    /// A page that cannot be rendered is skipped; later pages are never parsed.
    fn extract_pages(&self, bytes: &[u8], max_pages: usize) -> Result<Vec<String>> {
        use std::panic::{AssertUnwindSafe, catch_unwind};

        use crate::error::EarningsError;

        // The parser panics on some malformed inputs.
        let mut doc = catch_unwind(|| pdf_extract::Document::load_mem(bytes))
            .map_err(|_| EarningsError::Document("PDF parser panicked".to_string()))?
            .map_err(|e| EarningsError::Document(e.to_string()))?;
        if doc.is_encrypted() {
            doc.decrypt("")
                .map_err(|e| EarningsError::Document(format!("Encrypted PDF: {e}")))?;
        }

        let mut pages = Vec::new();
        for page in doc.get_pages().into_keys().take(max_pages) {
            let mut text = String::new();
            let rendered = catch_unwind(AssertUnwindSafe(|| {
                let mut output = pdf_extract::PlainTextOutput::new(&mut text);
                pdf_extract::output_doc_page(&doc, &mut output, page)
            }));
            match rendered {
                Ok(Ok(())) => pages.push(text),
                Ok(Err(e)) => debug!(page, error = %e, "PDF page unreadable, skipped"),
                Err(_) => debug!(page, "PDF page parser panicked, skipped"),
            }
        }
        Ok(pages)
    }
}

/// Result of inspecting a document's content.
///
/// Does not change the document until applied.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationOutcome {
    /// An explicit quarter token was found.
    pub verified: bool,
    /// The detected label differs from the current one.
    pub corrected: bool,
    /// The majority label found in the content.
    pub detected_label: Option<QuarterLabel>,
}

impl VerificationOutcome {
    /// Outcome for a document without usable evidence.
    #[must_use]
    pub const fn unverified() -> Self {
        Self {
            verified: false,
            corrected: false,
            detected_label: None,
        }
    }
}

/// A label change applied to a document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelCorrection {
    /// Label before verification.
    pub from: QuarterLabel,
    /// Label after verification.
    pub to: QuarterLabel,
    /// File name under the old label.
    pub from_file_name: String,
    /// File name under the new label; a saved copy should be renamed to this.
    pub to_file_name: String,
}

/// Audit record attached to a verified document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelAudit {
    /// Label before verification.
    pub original_label: QuarterLabel,
    /// Label after verification, when it changed.
    pub corrected_label: Option<QuarterLabel>,
    /// An explicit quarter token was found in the content.
    pub verified: bool,
    /// Old and new file names, when the label changed.
    pub correction: Option<LabelCorrection>,
}

impl LabelAudit {
    /// Audit for a document whose content was never inspected.
    #[must_use]
    pub const fn unverified(original_label: QuarterLabel) -> Self {
        Self {
            original_label,
            corrected_label: None,
            verified: false,
            correction: None,
        }
    }
}

/// A canonical document with its verification audit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedDocument {
    /// The document, relabelled if the content disagreed.
    pub document: CanonicalDocument,
    /// What verification found.
    pub audit: LabelAudit,
}

/// Returns the most frequent label; ties go to the one seen first.
#[must_use]
pub fn majority_label(labels: &[QuarterLabel]) -> Option<QuarterLabel> {
    let mut counts: HashMap<QuarterLabel, (usize, usize)> = HashMap::new();
    for (position, label) in labels.iter().enumerate() {
        counts.entry(*label).or_insert((0, position)).0 += 1;
    }
    counts
        .into_iter()
        .max_by(|(_, (count_a, first_a)), (_, (count_b, first_b))| {
            count_a.cmp(count_b).then_with(|| first_b.cmp(first_a))
        })
        .map(|(label, _)| label)
}

/// Verifies and corrects document labels from their content.
#[derive(Clone, Debug)]
pub struct ContentVerifier {
    extractor: Arc<dyn PageTextExtractor>,
    max_pages: usize,
    convention: FiscalConvention,
}

impl ContentVerifier {
    /// Creates a verifier reading [`DEFAULT_MAX_PAGES`] pages.
    #[must_use]
    pub fn new(extractor: Arc<dyn PageTextExtractor>) -> Self {
        Self {
            extractor,
            max_pages: DEFAULT_MAX_PAGES,
            convention: FiscalConvention::Offset,
        }
    }

    /// Creates a verifier for PDF documents.
    #[cfg(feature = "pdf")]
    #[must_use]
    pub fn pdf() -> Self {
        Self::new(Arc::new(PdfTextExtractor))
    }

    /// Sets how many leading pages are read.
    #[must_use]
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Sets the convention used for documents whose year form is unknown.
    #[must_use]
    pub fn with_convention(mut self, convention: FiscalConvention) -> Self {
        self.convention = convention;
        self
    }

    /// Returns how many leading pages are read.
    #[must_use]
    pub const fn max_pages(&self) -> usize {
        self.max_pages
    }

    /// Checks a label against document bytes.
    ///
    /// Never fails: unreadable bytes produce an unverified outcome.
    #[must_use]
    pub fn verify(&self, label: &QuarterLabel, bytes: &[u8]) -> VerificationOutcome {
        match self.extractor.extract_pages(bytes, self.max_pages) {
            Ok(pages) => self.verify_pages(label, &pages),
            Err(e) => {
                debug!(error = %e, label = %label, "Document unreadable, label left unverified");
                VerificationOutcome::unverified()
            }
        }
    }

    /// Checks a label against already extracted page texts.
    #[must_use]
    pub fn verify_pages<S: AsRef<str>>(&self, label: &QuarterLabel, pages: &[S]) -> VerificationOutcome {
        let convention = self.convention_for(label);
        let found: Vec<QuarterLabel> = pages
            .iter()
            .take(self.max_pages)
            .flat_map(|page| find_quarter_tokens(page.as_ref()))
            .map(|l| QuarterLabel::new(l.quarter, convention.normalize_year(l.fiscal_year)))
            .collect();

        let Some(detected) = majority_label(&found) else {
            debug!(label = %label, "No quarter token in document, label left unverified");
            return VerificationOutcome::unverified();
        };
        // Annual documents discuss every quarter; only their year is checked.
        let detected = if label.quarter == Quarter::FullYear {
            QuarterLabel::new(Quarter::FullYear, detected.fiscal_year)
        } else {
            detected
        };

        VerificationOutcome {
            verified: true,
            corrected: detected != *label,
            detected_label: Some(detected),
        }
    }

    fn convention_for(&self, label: &QuarterLabel) -> FiscalConvention {
        match label.fiscal_year {
            FiscalYear::Fy(_) => FiscalConvention::Offset,
            FiscalYear::Calendar(_) => FiscalConvention::Calendar,
            FiscalYear::Unknown => self.convention,
        }
    }

    /// Verifies a canonical document and applies any correction in place.
    ///
    /// Every correction is logged with the old and new label and file name.
    #[must_use]
    pub fn apply(&self, mut document: CanonicalDocument, bytes: &[u8]) -> VerifiedDocument {
        let outcome = self.verify(&document.label(), bytes);
        let audit = apply_outcome(&mut document, outcome);
        VerifiedDocument { document, audit }
    }
}

/// Applies a verification outcome to a document and returns its audit record.
pub fn apply_outcome(document: &mut CanonicalDocument, outcome: VerificationOutcome) -> LabelAudit {
    let original_label = document.label();
    let detected = match outcome.detected_label {
        Some(detected) if outcome.corrected => detected,
        _ => {
            if !outcome.verified {
                debug!(
                    company = %document.company,
                    label = %original_label,
                    doc_type = %document.doc_type,
                    "Unverified document"
                );
            }
            return LabelAudit {
                original_label,
                corrected_label: None,
                verified: outcome.verified,
                correction: None,
            };
        }
    };

    let from_file_name = document.file_name();
    document.relabel(detected);
    let to_file_name = document.file_name();
    info!(
        company = %document.company,
        doc_type = %document.doc_type,
        from = %original_label,
        to = %detected,
        from_file = %from_file_name,
        to_file = %to_file_name,
        "Quarter label corrected from document content"
    );

    LabelAudit {
        original_label,
        corrected_label: Some(detected),
        verified: true,
        correction: Some(LabelCorrection {
            from: original_label,
            to: detected,
            from_file_name,
            to_file_name,
        }),
    }
}

/// Relabels a candidate from a verification outcome, for callers working before
/// reconciliation.
pub fn apply_to_candidate(candidate: &mut CandidateDocument, outcome: &VerificationOutcome) {
    if let (true, Some(detected)) = (outcome.corrected, outcome.detected_label) {
        candidate.set_label(detected);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EarningsError;
    use crate::reconcile::{PriorityTable, reconcile};
    use crate::types::DocType;

    /// Treats the bytes as UTF-8 with pages separated by form feeds.
    #[derive(Debug)]
    struct FakeExtractor;

    impl PageTextExtractor for FakeExtractor {
        fn extract_pages(&self, bytes: &[u8], max_pages: usize) -> Result<Vec<String>> {
            let text = std::str::from_utf8(bytes)
                .map_err(|e| EarningsError::Document(e.to_string()))?;
            Ok(text.split('\x0c').take(max_pages).map(str::to_string).collect())
        }
    }

    fn verifier() -> ContentVerifier {
        ContentVerifier::new(Arc::new(FakeExtractor))
    }

    fn label(q: Quarter, y: FiscalYear) -> QuarterLabel {
        QuarterLabel::new(q, y)
    }

    fn canonical(l: QuarterLabel) -> CanonicalDocument {
        let doc = CandidateDocument::new("Infosys Ltd", DocType::Transcript, "https://x/t.pdf", "bse")
            .with_label(l);
        reconcile([doc], &PriorityTable::default()).remove(0)
    }

    #[test]
    fn test_majority_vote() {
        let q2 = label(Quarter::Q2, FiscalYear::Fy(26));
        let q1 = label(Quarter::Q1, FiscalYear::Fy(26));
        assert_eq!(majority_label(&[q2, q2, q1]), Some(q2));
        assert_eq!(majority_label(&[q1, q2]), Some(q1));
        assert_eq!(majority_label(&[q1, q2, q2, q1]), Some(q1));
        assert_eq!(majority_label(&[]), None);
    }

    #[test]
    fn test_verified_and_matching() {
        let current = label(Quarter::Q2, FiscalYear::Fy(26));
        let out = verifier().verify(&current, b"Q2 FY26 Earnings Call\x0cversus Q2 FY25");
        assert!(out.verified);
        assert!(!out.corrected);
        assert_eq!(out.detected_label, Some(current));
    }

    #[test]
    fn test_correction_by_mode() {
        let current = label(Quarter::Q1, FiscalYear::Fy(26));
        let text = b"Q2 FY26 results\x0cIn Q2FY26 revenue grew\x0cQ1 FY26 comparison";
        let out = verifier().verify(&current, text);
        assert!(out.verified && out.corrected);
        assert_eq!(out.detected_label, Some(label(Quarter::Q2, FiscalYear::Fy(26))));
    }

    #[test]
    fn test_only_leading_pages_are_read() {
        let current = label(Quarter::Q1, FiscalYear::Fy(26));
        let text = b"cover\x0cQ1 FY26\x0cagenda\x0cQ3 FY24\x0cQ3 FY24";
        let out = verifier().verify(&current, text);
        assert!(!out.corrected);
    }

    #[test]
    fn test_no_tokens_fails_open() {
        let current = label(Quarter::Q1, FiscalYear::Fy(26));
        let out = verifier().verify(&current, b"Welcome to the call");
        assert_eq!(out, VerificationOutcome::unverified());
    }

    #[test]
    fn test_unreadable_bytes_fail_open() {
        let current = label(Quarter::Q1, FiscalYear::Fy(26));
        let out = verifier().verify(&current, &[0xff, 0xfe, 0x00]);
        assert_eq!(out, VerificationOutcome::unverified());
    }

    #[test]
    fn test_calendar_year_labels_compare_in_kind() {
        let current = label(Quarter::Q3, FiscalYear::Calendar(2024));
        let out = verifier().verify(&current, b"Third quarter Q3 2024 results");
        assert!(out.verified);
        assert!(!out.corrected);
    }

    #[test]
    fn test_annual_only_checks_year() {
        let current = label(Quarter::FullYear, FiscalYear::Calendar(2024));
        let out = verifier().verify(&current, b"Q4 2024 and Q3 2024 and Q4 2024");
        assert!(!out.corrected);

        let out = verifier().verify(&current, b"Q4 2023 and Q4 2023");
        assert!(out.corrected);
        assert_eq!(
            out.detected_label,
            Some(label(Quarter::FullYear, FiscalYear::Calendar(2023)))
        );
    }

    #[test]
    fn test_apply_reports_file_names_and_is_stable() {
        let bytes = b"Q2 FY26 Earnings Conference Call";
        let verifier = verifier();

        let first = verifier.apply(canonical(label(Quarter::Q1, FiscalYear::Fy(26))), bytes);
        assert_eq!(first.document.label(), label(Quarter::Q2, FiscalYear::Fy(26)));
        let correction = first.audit.correction.clone().unwrap();
        assert_eq!(correction.from_file_name, "Infosys_Ltd_Q1FY26_transcript.pdf");
        assert_eq!(correction.to_file_name, "Infosys_Ltd_Q2FY26_transcript.pdf");
        assert_eq!(first.audit.original_label, label(Quarter::Q1, FiscalYear::Fy(26)));

        let again = verifier.apply(first.document, bytes);
        assert!(again.audit.verified);
        assert!(again.audit.corrected_label.is_none());
    }

    #[test]
    fn test_apply_to_candidate() {
        let mut doc = CandidateDocument::new("X", DocType::Pnl, "https://x/y.pdf", "bse");
        let outcome = verifier().verify(&doc.label(), b"Q4 FY25");
        apply_to_candidate(&mut doc, &outcome);
        assert_eq!(doc.label(), label(Quarter::Q4, FiscalYear::Fy(25)));
    }

    #[cfg(feature = "pdf")]
    #[test]
    fn test_pdf_extractor_rejects_garbage() {
        let out = ContentVerifier::pdf().verify(
            &label(Quarter::Q1, FiscalYear::Fy(26)),
            b"definitely not a pdf",
        );
        assert_eq!(out, VerificationOutcome::unverified());
    }

    /// Builds a PDF whose pages each show one line of text. A `None` entry is a
    /// broken page: no media box anywhere in its tree and an unparsable stream.
    #[cfg(feature = "pdf")]
    fn pdf_with_pages(pages: &[Option<&str>]) -> Vec<u8> {
        use pdf_extract::{Dictionary, Document, Object, Stream};

        fn name(n: &str) -> Object {
            Object::Name(n.as_bytes().to_vec())
        }

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut font = Dictionary::new();
        font.set("Type", name("Font"));
        font.set("Subtype", name("Type1"));
        font.set("BaseFont", name("Helvetica"));
        let font_id = doc.add_object(font);
        let mut fonts = Dictionary::new();
        fonts.set("F1", font_id);
        let mut resources = Dictionary::new();
        resources.set("Font", fonts);
        let resources_id = doc.add_object(resources);

        let mut kids = Vec::new();
        for page in pages {
            let content = match page {
                Some(text) => format!("BT /F1 12 Tf 72 720 Td ({text}) Tj ET").into_bytes(),
                None => b"BT /F1 12 Tf ((( 72 Td ] ET <<".to_vec(),
            };
            let content_id = doc.add_object(Stream::new(Dictionary::new(), content));

            let mut dict = Dictionary::new();
            dict.set("Type", name("Page"));
            dict.set("Parent", pages_id);
            dict.set("Contents", content_id);
            dict.set("Resources", resources_id);
            if page.is_some() {
                let media_box: Vec<Object> = [0, 0, 612, 792].into_iter().map(Object::Integer).collect();
                dict.set("MediaBox", media_box);
            }
            kids.push(Object::from(doc.add_object(dict)));
        }

        let mut tree = Dictionary::new();
        tree.set("Type", name("Pages"));
        tree.set("Count", pages.len() as i64);
        tree.set("Kids", kids);
        doc.objects.insert(pages_id, Object::Dictionary(tree));

        let mut catalog = Dictionary::new();
        catalog.set("Type", name("Catalog"));
        catalog.set("Pages", pages_id);
        let catalog_id = doc.add_object(catalog);
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[cfg(feature = "pdf")]
    #[test]
    fn test_pdf_extractor_reads_leading_pages_only() {
        let bytes = pdf_with_pages(&[
            Some("Q2 FY26 results"),
            Some("Q2 FY26 segment review"),
            Some("Compared with Q2 FY25"),
            Some("Q4 FY24 appendix"),
            Some("Q4 FY24 appendix"),
            Some("Q4 FY24 appendix"),
        ]);

        let pages = PdfTextExtractor.extract_pages(&bytes, 3).unwrap();
        assert_eq!(pages.len(), 3);
        assert!(pages[0].contains("Q2 FY26"));
        assert!(pages.iter().all(|p| !p.contains("FY24")));
    }

    #[cfg(feature = "pdf")]
    #[test]
    fn test_pdf_broken_late_page_does_not_matter() {
        let bytes = pdf_with_pages(&[
            Some("Q2 FY26 results"),
            Some("Q2 FY26 outlook"),
            Some("Q1 FY26 base"),
            None,
        ]);
        let current = label(Quarter::Q1, FiscalYear::Fy(26));

        let leading = ContentVerifier::pdf().verify(&current, &bytes);
        assert!(leading.verified);
        assert_eq!(leading.detected_label, Some(label(Quarter::Q2, FiscalYear::Fy(26))));

        // Asked for every page, the broken one is skipped rather than failing the file.
        let all = ContentVerifier::pdf().with_max_pages(10).verify(&current, &bytes);
        assert_eq!(all, leading);
    }
}
