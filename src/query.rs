//! # Query Construction Module
//!
//! ## Purpose
//! Builds structured Elasticsearch request bodies from user input: a
//! field-weighted multi-match query for keyword search, and a
//! more-like-this query seeded by an uploaded case for similarity search.
//!
//! ## Input/Output Specification
//! - **Input**: Free query text plus optional tag filters, or a seed case;
//!   pagination parameters
//! - **Output**: JSON query bodies ready for the `_search` endpoint
//! - **Ordering**: Results sorted by relevance score, descending
//!
//! ## Key Features
//! - Best-matching-field semantics with title > abstract > content weights
//! - Automatic fuzziness and a relaxed minimum-should-match threshold
//! - Tokenization pinned to the same fine-grained analyzer used at indexing
//! - Score-neutral tag filtering
//! - Shared highlighting contract for both search modes

use serde::Deserialize;
use serde_json::{json, Value};

/// Field weights: a title match outranks an abstract match outranks a
/// content match, best field wins.
const KEYWORD_FIELDS: [&str; 3] = ["title^3", "abstract^2", "content"];

/// Similarity search runs unweighted across the same three fields.
const SIMILARITY_FIELDS: [&str; 3] = ["title", "abstract", "content"];

/// Query-time analyzer; must match the indexing analyzer for token
/// compatibility.
const QUERY_ANALYZER: &str = "ik_max_word";

/// Fraction of query terms that must match in keyword search.
const KEYWORD_MIN_SHOULD_MATCH: &str = "70%";

/// Similarity search is inherently fuzzier and surfaces more candidates.
const SIMILARITY_MIN_SHOULD_MATCH: &str = "30%";
const SIMILARITY_MIN_TERM_FREQ: u32 = 1;
const SIMILARITY_MIN_DOC_FREQ: u32 = 1;
const SIMILARITY_MAX_QUERY_TERMS: u32 = 25;

/// Snippet fragment size for abstract/content highlights, in characters.
const HIGHLIGHT_FRAGMENT_SIZE: u32 = 200;
const HIGHLIGHT_PRE_TAG: &str = "<em>";
const HIGHLIGHT_POST_TAG: &str = "</em>";

/// Validated pagination window. Page and size are clamped to at least 1
/// so the offset arithmetic is always well-defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page: u64,
    size: u64,
}

impl Pagination {
    pub fn new(page: u64, size: u64) -> Self {
        Self {
            page: page.max(1),
            size: size.max(1),
        }
    }

    /// Zero-based offset of the first hit in the requested page.
    /// Page and size arrive unbounded from the request; saturate rather
    /// than overflow on absurd values (the engine rejects them anyway).
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.size)
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self { page: 1, size: 10 }
    }
}

/// Optional post-relevance filters attached to a keyword search.
/// Unknown filter keys in the request body are ignored by deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchFilters {
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

impl SearchFilters {
    fn tag_terms(&self) -> Option<&[String]> {
        match &self.tags {
            Some(tags) if !tags.is_empty() => Some(tags),
            _ => None,
        }
    }
}

/// Text fields of an uploaded case used as a similarity seed.
/// Upload field names differ from the index schema and are mapped here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SimilaritySeed {
    /// Title-like field of the uploaded case
    #[serde(rename = "ajName", default)]
    pub title: String,
    /// Abstract-like field
    #[serde(rename = "ajjbqk", default)]
    pub abstract_text: String,
    /// Full-text field
    #[serde(rename = "qw", default)]
    pub content: String,
}

impl SimilaritySeed {
    /// A seed with no usable text cannot drive a similarity search
    pub fn is_empty(&self) -> bool {
        self.title.is_empty() && self.abstract_text.is_empty() && self.content.is_empty()
    }

    /// Single like-text blob concatenating the three seed fields
    pub fn like_text(&self) -> String {
        format!("{} {} {}", self.title, self.abstract_text, self.content)
    }
}

/// Build the request body for a keyword search.
///
/// Empty query text is handled upstream by the serving layer, which
/// short-circuits with an empty result set before any engine call.
pub fn build_keyword_query(text: &str, pagination: &Pagination, filters: &SearchFilters) -> Value {
    let mut filter_clauses: Vec<Value> = Vec::new();
    if let Some(tags) = filters.tag_terms() {
        // Keyword sub-field: exact match, does not affect the score
        filter_clauses.push(json!({ "terms": { "tags.keyword": tags } }));
    }

    json!({
        "from": pagination.offset(),
        "size": pagination.size(),
        "query": {
            "bool": {
                "must": [
                    {
                        "multi_match": {
                            "query": text,
                            "fields": KEYWORD_FIELDS,
                            "type": "best_fields",
                            "fuzziness": "AUTO",
                            "minimum_should_match": KEYWORD_MIN_SHOULD_MATCH,
                            "analyzer": QUERY_ANALYZER,
                        }
                    }
                ],
                "filter": filter_clauses,
            }
        },
        "highlight": highlight_spec(),
        "sort": [ { "_score": { "order": "desc" } } ],
    })
}

/// Build the request body for a similarity (more-like-this) search.
///
/// The caller must reject an all-empty seed before building; no tag
/// filtering applies in this mode.
pub fn build_similarity_query(seed: &SimilaritySeed, pagination: &Pagination) -> Value {
    json!({
        "from": pagination.offset(),
        "size": pagination.size(),
        "query": {
            "more_like_this": {
                "fields": SIMILARITY_FIELDS,
                "like": [seed.like_text()],
                "min_term_freq": SIMILARITY_MIN_TERM_FREQ,
                "max_query_terms": SIMILARITY_MAX_QUERY_TERMS,
                "min_doc_freq": SIMILARITY_MIN_DOC_FREQ,
                "minimum_should_match": SIMILARITY_MIN_SHOULD_MATCH,
            }
        },
        "highlight": highlight_spec(),
    })
}

/// Highlighting contract shared by both search modes: whole-field title
/// highlight, single ~200-character fragments for abstract and content,
/// HTML-safe encoding around the markers.
fn highlight_spec() -> Value {
    json!({
        "fields": {
            "title": {
                "pre_tags": [HIGHLIGHT_PRE_TAG],
                "post_tags": [HIGHLIGHT_POST_TAG],
            },
            "abstract": {
                "fragment_size": HIGHLIGHT_FRAGMENT_SIZE,
                "number_of_fragments": 1,
                "pre_tags": [HIGHLIGHT_PRE_TAG],
                "post_tags": [HIGHLIGHT_POST_TAG],
            },
            "content": {
                "fragment_size": HIGHLIGHT_FRAGMENT_SIZE,
                "number_of_fragments": 1,
                "pre_tags": [HIGHLIGHT_PRE_TAG],
                "post_tags": [HIGHLIGHT_POST_TAG],
            },
        },
        "encoder": "html",
    })
}
