//! Page-reference parsing for model output.
//!
//! Answers cite pages as "page 5" or "pages 10-12"; this module pulls those
//! out for navigation and rebuilds the text as clickable spans. One pattern
//! covers both forms: the keyword is matched with an optional trailing "s",
//! so the plural form rides on the singular pattern with a dash range.

use std::sync::OnceLock;

use regex::Regex;
use shared::host::ViewerBridge;

fn page_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\bpages?\s+(\d+)(?:\s*-\s*(\d+))?").expect("page pattern compiles")
    })
}

/// All page numbers mentioned in `text`, deduplicated and ascending.
/// Range mentions contribute every page in the range, inclusive. No
/// validation against an actual page count happens here; "page 0" comes
/// back as 0 and navigation deals with it.
pub fn extract_references(text: &str) -> Vec<u32> {
    let mut pages = Vec::new();
    for caps in page_pattern().captures_iter(text) {
        let Some(start) = caps.get(1).and_then(|m| m.as_str().parse::<u32>().ok()) else {
            continue;
        };
        match caps.get(2).and_then(|m| m.as_str().parse::<u32>().ok()) {
            Some(end) if end >= start => pages.extend(start..=end),
            Some(end) => {
                // Reversed range: keep both endpoints as literal mentions.
                pages.push(start);
                pages.push(end);
            }
            None => pages.push(start),
        }
    }
    pages.sort_unstable();
    pages.dedup();
    pages
}

/// A fragment of linkified text: either a verbatim span or a clickable
/// page link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextSpan {
    Plain(String),
    PageLink {
        document_id: String,
        page: u32,
        label: String,
    },
}

/// Rebuild `text` as a list of spans where every page mention is a link
/// into `document_id`. Non-matched spans are reproduced byte-identical in
/// their original order. A single-page mention becomes one link labeled
/// with the matched text; a range becomes "pages " plus a link per
/// endpoint joined by "-".
pub fn linkify(text: &str, document_id: &str) -> Vec<TextSpan> {
    let mut spans = Vec::new();
    let mut cursor = 0;

    for caps in page_pattern().captures_iter(text) {
        let whole = caps.get(0).expect("match group 0");
        if whole.start() > cursor {
            spans.push(TextSpan::Plain(text[cursor..whole.start()].to_string()));
        }
        cursor = whole.end();

        let Some(start) = caps.get(1).and_then(|m| m.as_str().parse::<u32>().ok()) else {
            spans.push(TextSpan::Plain(whole.as_str().to_string()));
            continue;
        };

        match caps.get(2).and_then(|m| m.as_str().parse::<u32>().ok()) {
            Some(end) => {
                spans.push(TextSpan::Plain("pages ".to_string()));
                spans.push(TextSpan::PageLink {
                    document_id: document_id.to_string(),
                    page: start,
                    label: start.to_string(),
                });
                spans.push(TextSpan::Plain("-".to_string()));
                spans.push(TextSpan::PageLink {
                    document_id: document_id.to_string(),
                    page: end,
                    label: end.to_string(),
                });
            }
            None => {
                spans.push(TextSpan::PageLink {
                    document_id: document_id.to_string(),
                    page: start,
                    label: whole.as_str().to_string(),
                });
            }
        }
    }

    if cursor < text.len() {
        spans.push(TextSpan::Plain(text[cursor..].to_string()));
    }
    spans
}

/// Drive the viewer to a clicked link. Plain spans are not clickable.
pub fn follow_link(span: &TextSpan, viewer: &dyn ViewerBridge) -> bool {
    match span {
        TextSpan::PageLink {
            document_id, page, ..
        } => viewer.navigate(document_id, *page),
        TextSpan::Plain(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_singles_and_ranges() {
        let refs = extract_references("Findings are on page 5 and also pages 10-12.");
        assert_eq!(refs, vec![5, 10, 11, 12]);
    }

    #[test]
    fn plural_keyword_with_range_is_accepted() {
        // The plural form is matched by the singular pattern plus a dash
        // range; pinned here on purpose.
        assert_eq!(extract_references("see pages 5-7"), vec![5, 6, 7]);
    }

    #[test]
    fn case_insensitive_and_parenthesized() {
        assert_eq!(extract_references("Results (Page 12), see PAGE 3"), vec![3, 12]);
    }

    #[test]
    fn duplicates_collapse_and_sort() {
        assert_eq!(
            extract_references("page 9, page 2, pages 8-9, page 2"),
            vec![2, 8, 9]
        );
    }

    #[test]
    fn page_zero_is_extracted_verbatim() {
        assert_eq!(extract_references("weirdly cites page 0"), vec![0]);
    }

    #[test]
    fn no_mentions_means_empty() {
        assert!(extract_references("no citations here").is_empty());
        assert!(extract_references("pager 5 is not a page mention").is_empty());
    }

    #[test]
    fn extraction_is_idempotent_over_its_own_output() {
        let refs = extract_references("page 5 and pages 10-12");
        let rendered = format!("{refs:?}");
        assert!(extract_references(&rendered).is_empty());
    }

    #[test]
    fn linkify_preserves_unmatched_spans() {
        let text = "Intro. See page 5 for methods; conclusion follows.";
        let spans = linkify(text, "doc1");
        assert_eq!(
            spans,
            vec![
                TextSpan::Plain("Intro. See ".to_string()),
                TextSpan::PageLink {
                    document_id: "doc1".to_string(),
                    page: 5,
                    label: "page 5".to_string(),
                },
                TextSpan::Plain(" for methods; conclusion follows.".to_string()),
            ]
        );
    }

    #[test]
    fn linkify_expands_ranges_into_two_links() {
        let spans = linkify("see pages 10-12 there", "doc1");
        let links: Vec<u32> = spans
            .iter()
            .filter_map(|s| match s {
                TextSpan::PageLink { page, .. } => Some(*page),
                _ => None,
            })
            .collect();
        assert_eq!(links, vec![10, 12]);
        assert_eq!(spans.first(), Some(&TextSpan::Plain("see ".to_string())));
        assert_eq!(spans.last(), Some(&TextSpan::Plain(" there".to_string())));
    }
}
