//! Text extraction from library documents.
//!
//! Strategies are tried in a fixed order, each only when the previous one
//! produced no usable text: a live viewer first (it already has pages
//! decoded), then the host's full-text search index. Extraction is never
//! silently empty; when everything fails the user gets told to open the
//! document in a viewer and retry.

use std::sync::Arc;

use shared::error::ChatError;
use shared::host::{HostDocumentStore, ViewerBridge};
use shared::types::DocumentRef;

/// Text shorter than this after trimming is treated as "no usable text"
/// and the next strategy is tried.
const MIN_USABLE_CHARS: usize = 50;

/// Fixed 4-characters-per-token heuristic. Not a real tokenizer.
pub const CHARS_PER_TOKEN: usize = 4;

/// Per-document token ceiling applied before concatenation.
pub const DEFAULT_MAX_DOC_TOKENS: usize = 100_000;

const TRUNCATION_MARKER: &str = "\n\n[Content truncated due to length]";

/// Best-effort plain text for one document. Never mutated once computed.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub document_id: String,
    pub text: String,
    /// 0 when the source strategy does not know (full-text index).
    pub page_count: u32,
}

/// Result of a multi-document extraction pass.
#[derive(Debug, Clone)]
pub struct CombinedExtraction {
    pub text: String,
    /// Documents that actually yielded text; failures are embedded inline
    /// and do not count.
    pub extracted_count: usize,
}

#[derive(Debug, Clone, Copy)]
enum Strategy {
    OpenViewer,
    FullTextIndex,
}

impl Strategy {
    const ORDER: [Strategy; 2] = [Strategy::OpenViewer, Strategy::FullTextIndex];

    fn name(&self) -> &'static str {
        match self {
            Strategy::OpenViewer => "open viewer",
            Strategy::FullTextIndex => "full-text index",
        }
    }
}

pub struct TextExtractor {
    docs: Arc<dyn HostDocumentStore>,
    viewer: Arc<dyn ViewerBridge>,
}

impl TextExtractor {
    pub fn new(docs: Arc<dyn HostDocumentStore>, viewer: Arc<dyn ViewerBridge>) -> Self {
        Self { docs, viewer }
    }

    /// Extract text for one document, trying each strategy in order.
    pub fn extract(&self, document_id: &str) -> Result<Extraction, ChatError> {
        for strategy in Strategy::ORDER {
            match self.try_strategy(strategy, document_id) {
                Ok(Some(extraction)) => {
                    tracing::debug!(
                        strategy = strategy.name(),
                        document_id,
                        chars = extraction.text.len(),
                        "extraction succeeded"
                    );
                    return Ok(extraction);
                }
                Ok(None) => {
                    tracing::debug!(strategy = strategy.name(), document_id, "no usable text");
                }
                Err(e) => {
                    tracing::debug!(
                        strategy = strategy.name(),
                        document_id,
                        "strategy failed: {e:#}"
                    );
                }
            }
        }

        let title = self.docs.title(document_id);
        Err(ChatError::ExtractionFailed(format!(
            "no text available for \"{title}\" - open the document in a viewer and try again"
        )))
    }

    fn try_strategy(
        &self,
        strategy: Strategy,
        document_id: &str,
    ) -> anyhow::Result<Option<Extraction>> {
        match strategy {
            Strategy::OpenViewer => Ok(self.from_viewer(document_id)),
            Strategy::FullTextIndex => self.from_index(document_id),
        }
    }

    /// Concatenated page text from a live viewer, blank line between
    /// pages. Pages that fail to read are logged and skipped.
    fn from_viewer(&self, document_id: &str) -> Option<Extraction> {
        let handle = self.viewer.open_viewer(document_id)?;
        let mut pages = Vec::new();
        for (index, page) in self.viewer.read_pages_text(&handle).into_iter().enumerate() {
            match page {
                Ok(text) => pages.push(text),
                Err(e) => {
                    tracing::warn!(document_id, page = index + 1, "page read failed: {e:#}");
                }
            }
        }
        let text = pages.join("\n\n");
        usable(&text).then(|| Extraction {
            document_id: document_id.to_string(),
            text,
            page_count: handle.page_count,
        })
    }

    /// The host's full-text cache artifact. A missing index entry triggers
    /// non-forced indexing, then one re-read.
    fn from_index(&self, document_id: &str) -> anyhow::Result<Option<Extraction>> {
        let cached = match self.docs.fulltext_cache(document_id)? {
            Some(text) => Some(text),
            None => {
                self.docs.request_index(document_id)?;
                self.docs.fulltext_cache(document_id)?
            }
        };
        Ok(cached.filter(|text| usable(text)).map(|text| Extraction {
            document_id: document_id.to_string(),
            text,
            page_count: 0,
        }))
    }

    /// Extract every document in order, truncating each to the same fixed
    /// token ceiling before concatenation so one oversized document cannot
    /// starve the others. Failures become inline markers; one bad document
    /// never aborts the batch.
    pub fn extract_many(
        &self,
        documents: &[DocumentRef],
        max_doc_tokens: usize,
    ) -> CombinedExtraction {
        let mut combined = String::new();
        let mut extracted_count = 0;

        for doc in documents {
            combined.push_str(&format!("=== PAPER: {} ===\n\n", doc.title));
            match self.extract(&doc.document_id) {
                Ok(extraction) => {
                    combined.push_str(&truncate(&extraction.text, max_doc_tokens));
                    extracted_count += 1;
                }
                Err(e) => {
                    tracing::warn!(document_id = %doc.document_id, "extraction failed: {e}");
                    combined.push_str(&format!("Error Reading Paper: {}", doc.title));
                }
            }
            combined.push_str("\n\n");
        }

        CombinedExtraction {
            text: combined,
            extracted_count,
        }
    }
}

fn usable(text: &str) -> bool {
    text.trim().chars().count() > MIN_USABLE_CHARS
}

/// `ceil(len / 4)`.
pub fn estimate_tokens(text: &str) -> usize {
    text.len().div_ceil(CHARS_PER_TOKEN)
}

/// Hard cut at the token budget with a visible marker. Unchanged when the
/// estimate is already within budget.
pub fn truncate(text: &str, max_tokens: usize) -> String {
    if estimate_tokens(text) <= max_tokens {
        return text.to_string();
    }
    let mut cut = max_tokens * CHARS_PER_TOKEN;
    while cut > 0 && !text.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}{}", &text[..cut], TRUNCATION_MARKER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Result};
    use parking_lot::RwLock;
    use shared::host::{DocumentHandle, ViewerHandle};
    use std::collections::HashMap;

    fn long_text(tag: &str) -> String {
        format!("{tag}: ").repeat(20)
    }

    #[derive(Default)]
    struct FakeHost {
        fulltext: RwLock<HashMap<String, String>>,
        /// Entries materialized only after an index request.
        pending: RwLock<HashMap<String, String>>,
        index_requests: RwLock<Vec<String>>,
    }

    impl HostDocumentStore for FakeHost {
        fn resolve(&self, document_id: &str) -> Result<DocumentHandle> {
            Ok(DocumentHandle {
                document_id: document_id.to_string(),
                path: None,
            })
        }

        fn title(&self, document_id: &str) -> String {
            format!("Title of {document_id}")
        }

        fn is_pdf_like(&self, _handle: &DocumentHandle) -> bool {
            true
        }

        fn attachments(&self, _handle: &DocumentHandle) -> Vec<String> {
            Vec::new()
        }

        fn fulltext_cache(&self, document_id: &str) -> Result<Option<String>> {
            Ok(self.fulltext.read().get(document_id).cloned())
        }

        fn request_index(&self, document_id: &str) -> Result<()> {
            self.index_requests.write().push(document_id.to_string());
            if let Some(text) = self.pending.write().remove(document_id) {
                self.fulltext.write().insert(document_id.to_string(), text);
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeViewer {
        pages: HashMap<String, Vec<Result<String, String>>>,
    }

    impl ViewerBridge for FakeViewer {
        fn open_viewer(&self, document_id: &str) -> Option<ViewerHandle> {
            self.pages.get(document_id).map(|pages| ViewerHandle {
                document_id: document_id.to_string(),
                page_count: pages.len() as u32,
            })
        }

        fn read_pages_text(&self, viewer: &ViewerHandle) -> Vec<Result<String>> {
            self.pages
                .get(&viewer.document_id)
                .map(|pages| {
                    pages
                        .iter()
                        .map(|p| p.clone().map_err(|e| anyhow!(e)))
                        .collect()
                })
                .unwrap_or_default()
        }

        fn navigate(&self, _document_id: &str, _page: u32) -> bool {
            false
        }

        fn open_externally(&self, _document_id: &str, _page: u32) -> Result<()> {
            Ok(())
        }
    }

    fn doc(id: &str) -> DocumentRef {
        DocumentRef {
            document_id: id.to_string(),
            title: format!("Title of {id}"),
            has_extractable_text: true,
        }
    }

    #[test]
    fn viewer_strategy_joins_pages_and_skips_failures() {
        let mut viewer = FakeViewer::default();
        viewer.pages.insert(
            "doc1".to_string(),
            vec![
                Ok(long_text("page one")),
                Err("decode error".to_string()),
                Ok(long_text("page three")),
            ],
        );
        let extractor = TextExtractor::new(Arc::new(FakeHost::default()), Arc::new(viewer));

        let extraction = extractor.extract("doc1").unwrap();
        assert_eq!(extraction.page_count, 3);
        assert!(extraction.text.contains("page one"));
        assert!(extraction.text.contains("\n\n"));
        assert!(!extraction.text.contains("decode error"));
    }

    #[test]
    fn falls_back_to_index_when_no_viewer() {
        let host = FakeHost::default();
        host.fulltext
            .write()
            .insert("doc1".to_string(), long_text("indexed"));
        let extractor = TextExtractor::new(Arc::new(host), Arc::new(FakeViewer::default()));

        let extraction = extractor.extract("doc1").unwrap();
        assert!(extraction.text.contains("indexed"));
        assert_eq!(extraction.page_count, 0);
    }

    #[test]
    fn missing_index_entry_triggers_indexing_then_rereads() {
        let host = FakeHost::default();
        host.pending
            .write()
            .insert("doc1".to_string(), long_text("freshly indexed"));
        let host = Arc::new(host);
        let extractor = TextExtractor::new(host.clone(), Arc::new(FakeViewer::default()));

        let extraction = extractor.extract("doc1").unwrap();
        assert!(extraction.text.contains("freshly indexed"));
        assert_eq!(host.index_requests.read().as_slice(), ["doc1"]);
    }

    #[test]
    fn all_strategies_failing_is_an_error_with_guidance() {
        let extractor =
            TextExtractor::new(Arc::new(FakeHost::default()), Arc::new(FakeViewer::default()));
        let err = extractor.extract("doc1").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Title of doc1"));
        assert!(message.contains("open the document in a viewer"));
    }

    #[test]
    fn short_viewer_text_falls_through_to_index() {
        let mut viewer = FakeViewer::default();
        viewer
            .pages
            .insert("doc1".to_string(), vec![Ok("too short".to_string())]);
        let host = FakeHost::default();
        host.fulltext
            .write()
            .insert("doc1".to_string(), long_text("index wins"));
        let extractor = TextExtractor::new(Arc::new(host), Arc::new(viewer));

        assert!(extractor.extract("doc1").unwrap().text.contains("index wins"));
    }

    #[test]
    fn extract_many_continues_past_failures() {
        let host = FakeHost::default();
        host.fulltext
            .write()
            .insert("good".to_string(), long_text("good text"));
        let extractor = TextExtractor::new(Arc::new(host), Arc::new(FakeViewer::default()));

        let combined =
            extractor.extract_many(&[doc("good"), doc("bad")], DEFAULT_MAX_DOC_TOKENS);
        assert_eq!(combined.extracted_count, 1);
        assert!(combined.text.contains("=== PAPER: Title of good ==="));
        assert!(combined.text.contains("=== PAPER: Title of bad ==="));
        assert!(combined.text.contains("Error Reading Paper: Title of bad"));
    }

    #[test]
    fn extract_many_truncates_per_document() {
        let host = FakeHost::default();
        host.fulltext
            .write()
            .insert("big".to_string(), "x".repeat(4000));
        host.fulltext
            .write()
            .insert("small".to_string(), long_text("small doc"));
        let extractor = TextExtractor::new(Arc::new(host), Arc::new(FakeViewer::default()));

        // 100-token ceiling = 400 chars per document.
        let combined = extractor.extract_many(&[doc("big"), doc("small")], 100);
        assert_eq!(combined.extracted_count, 2);
        assert!(combined.text.contains(TRUNCATION_MARKER.trim()));
        assert!(combined.text.contains("small doc"));
    }

    #[test]
    fn truncate_is_a_no_op_below_budget() {
        let text = "short enough";
        assert_eq!(truncate(text, estimate_tokens(text)), text);
    }

    #[test]
    fn truncate_hard_cuts_with_marker() {
        let text = "a".repeat(1000);
        let out = truncate(&text, 10);
        assert!(out.starts_with(&"a".repeat(40)));
        assert!(out.ends_with(TRUNCATION_MARKER));
        assert_eq!(out.len(), 40 + TRUNCATION_MARKER.len());
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let text = "é".repeat(100); // 2 bytes per char
        let out = truncate(&text, 10);
        assert!(out.ends_with(TRUNCATION_MARKER));
    }

    #[test]
    fn token_estimate_rounds_up() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abc"), 1);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
    }
}
