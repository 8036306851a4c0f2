//! # Result Assembly Module
//!
//! ## Purpose
//! Maps raw search-engine hits into the API result schema: an
//! order-preserving projection with highlight-or-fallback snippet logic.
//!
//! ## Input/Output Specification
//! - **Input**: Parsed hits from the Elasticsearch gateway
//! - **Output**: API result entries in engine relevance order
//! - **Invariant**: No re-sorting, deduplication, or re-ranking; no field
//!   is ever null

use crate::elastic::SearchHit;
use serde::Serialize;

/// Length of the fallback snippet taken from the raw abstract, in
/// characters (safe for CJK text).
const SNIPPET_CHARS: usize = 200;
const SNIPPET_SUFFIX: &str = "...";

/// One entry of the API search response
#[derive(Debug, Clone, Serialize)]
pub struct CaseResult {
    /// External case identifier, empty when the corpus entry had none
    #[serde(rename = "ajId")]
    pub aj_id: String,
    /// Document identifier used for detail lookup and evaluation
    #[serde(rename = "docId")]
    pub doc_id: String,
    /// Display title: highlighted fragment when present, else stored title
    pub title: String,
    /// Display snippet: highlighted abstract fragment or truncated fallback
    pub abstract_snippet: String,
    /// Full stored abstract
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    /// Full stored case text
    pub content: String,
    /// Court analysis section
    pub analysis: String,
    /// Judgment result section
    pub result: String,
    /// Engine-assigned relevance score, passed through unmodified
    pub score: f64,
    /// Topic tags assigned at index time
    pub tags: Vec<String>,
}

/// Project raw hits into API result entries, preserving engine order.
pub fn assemble(hits: Vec<SearchHit>) -> Vec<CaseResult> {
    hits.into_iter().map(assemble_hit).collect()
}

fn assemble_hit(hit: SearchHit) -> CaseResult {
    let title = first_highlight(&hit, "title").unwrap_or_else(|| hit.source.title.clone());
    let abstract_snippet = first_highlight(&hit, "abstract")
        .unwrap_or_else(|| truncate_chars(&hit.source.abstract_text, SNIPPET_CHARS));

    CaseResult {
        aj_id: hit.source.aj_id.clone().unwrap_or_default(),
        doc_id: hit.doc_id,
        title,
        abstract_snippet,
        abstract_text: hit.source.abstract_text,
        content: hit.source.content,
        analysis: hit.source.analysis,
        result: hit.source.result,
        score: hit.score.unwrap_or(0.0),
        tags: hit.source.tags,
    }
}

fn first_highlight(hit: &SearchHit, field: &str) -> Option<String> {
    hit.highlight
        .as_ref()
        .and_then(|fragments| fragments.get(field))
        .and_then(|fragments| fragments.first())
        .cloned()
}

/// Truncate to at most `max_chars` characters and append the suffix.
/// Character-based so multi-byte text never splits mid-codepoint.
fn truncate_chars(text: &str, max_chars: usize) -> String {
    let truncated: String = text.chars().take(max_chars).collect();
    format!("{}{}", truncated, SNIPPET_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StoredCase;
    use std::collections::HashMap;

    fn hit(doc_id: &str, score: f64) -> SearchHit {
        SearchHit {
            doc_id: doc_id.to_string(),
            score: Some(score),
            source: StoredCase {
                aj_id: Some(format!("aj-{}", doc_id)),
                title: format!("title of {}", doc_id),
                abstract_text: "案件摘要".to_string(),
                content: "判决书全文".to_string(),
                analysis: "分析".to_string(),
                result: "结果".to_string(),
                tags: vec!["合同纠纷".to_string()],
            },
            highlight: None,
        }
    }

    #[test]
    fn test_preserves_engine_order() {
        // Deliberately not score-sorted; the assembler must not reorder
        let hits = vec![hit("b", 1.0), hit("a", 9.0), hit("c", 4.0)];
        let results = assemble(hits);
        let order: Vec<&str> = results.iter().map(|r| r.doc_id.as_str()).collect();
        assert_eq!(order, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_highlighted_title_preferred() {
        let mut h = hit("doc_1", 2.0);
        let mut fragments = HashMap::new();
        fragments.insert(
            "title".to_string(),
            vec!["<em>合同纠纷</em>案件".to_string()],
        );
        h.highlight = Some(fragments);

        let result = assemble(vec![h]).remove(0);
        assert_eq!(result.title, "<em>合同纠纷</em>案件");
    }

    #[test]
    fn test_snippet_falls_back_to_truncated_abstract() {
        let mut h = hit("doc_1", 2.0);
        h.source.abstract_text = "摘".repeat(300);
        h.highlight = None;

        let result = assemble(vec![h]).remove(0);
        assert_eq!(result.abstract_snippet.chars().count(), 200 + 3);
        assert!(result.abstract_snippet.ends_with("..."));
    }

    #[test]
    fn test_highlighted_snippet_preferred() {
        let mut h = hit("doc_1", 2.0);
        let mut fragments = HashMap::new();
        fragments.insert(
            "abstract".to_string(),
            vec!["含<em>违约</em>的摘要".to_string()],
        );
        h.highlight = Some(fragments);

        let result = assemble(vec![h]).remove(0);
        assert_eq!(result.abstract_snippet, "含<em>违约</em>的摘要");
        // Full abstract still carried unmodified
        assert_eq!(result.abstract_text, "案件摘要");
    }

    #[test]
    fn test_missing_fields_never_null() {
        let h = SearchHit {
            doc_id: "bare".to_string(),
            score: None,
            source: StoredCase::default(),
            highlight: None,
        };

        let result = assemble(vec![h]).remove(0);
        assert_eq!(result.aj_id, "");
        assert_eq!(result.title, "");
        assert_eq!(result.abstract_text, "");
        assert_eq!(result.content, "");
        assert_eq!(result.score, 0.0);
        assert!(result.tags.is_empty());

        let json = serde_json::to_value(&result).unwrap();
        assert!(json.as_object().unwrap().values().all(|v| !v.is_null()));
    }

    #[test]
    fn test_score_passed_through() {
        let result = assemble(vec![hit("doc_1", 7.25)]).remove(0);
        assert_eq!(result.score, 7.25);
    }

    #[test]
    fn test_response_field_names() {
        let json = serde_json::to_value(assemble(vec![hit("doc_1", 1.0)]).remove(0)).unwrap();
        assert!(json.get("ajId").is_some());
        assert!(json.get("docId").is_some());
        assert!(json.get("abstract_snippet").is_some());
        assert!(json.get("abstract").is_some());
    }
}
