//! # Legal Case Search Service
//!
//! ## Overview
//! This library implements a thin search service over an Elasticsearch index
//! of judicial case documents: an HTTP API that translates free-text queries
//! (or uploaded seed cases) into structured search requests, plus an offline
//! indexing pipeline that loads a raw case corpus into the index enriched
//! with heuristic topic tags.
//!
//! ## Architecture
//! The system is composed of several key modules:
//! - `elastic`: Elasticsearch gateway (connection handling, retries, wire types)
//! - `tags`: Rule-based topic tagging used at index time
//! - `query`: Structured query construction (keyword and similarity search)
//! - `results`: Mapping of raw search hits into the API result schema
//! - `indexer`: Offline corpus indexing and ID-mapping construction
//! - `mappings`: The persisted ajId <-> docId mapping artifact
//! - `api`: REST API endpoints
//! - `config`: Configuration management and settings
//! - `errors`: Centralized error handling and types
//!
//! ## Input/Output Specification
//! - **Input**: Case corpus files (JSON), search queries (text), seed uploads
//! - **Output**: Ranked search results with highlighted snippets and tags

// Core modules
pub mod api;
pub mod config;
pub mod elastic;
pub mod errors;
pub mod indexer;
pub mod mappings;
pub mod query;
pub mod results;
pub mod tags;

// Re-exports for convenience
pub use config::Config;
pub use errors::{Result, SearchError};

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The `_source` shape of an indexed case document.
///
/// Field names follow the index schema exactly; every field defaults so a
/// partially stored document never surfaces `null` downstream.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StoredCase {
    /// External case identifier (absent for some corpus entries)
    #[serde(rename = "ajId", default)]
    pub aj_id: Option<String>,
    /// Case title
    #[serde(default)]
    pub title: String,
    /// Case abstract
    #[serde(rename = "abstract", default)]
    pub abstract_text: String,
    /// Full case text
    #[serde(default)]
    pub content: String,
    /// Court analysis section
    #[serde(default)]
    pub analysis: String,
    /// Judgment result section
    #[serde(default)]
    pub result: String,
    /// Topic tags assigned at index time (at most three)
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A case document as staged for indexing: the immutable document id
/// (derived from the source filename stem) plus the stored fields.
#[derive(Debug, Clone)]
pub struct CaseDocument {
    pub doc_id: String,
    pub fields: StoredCase,
}

/// Application state shared across request handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::Config>,
    pub gateway: Arc<elastic::ElasticGateway>,
    pub mappings: Arc<mappings::IdMappings>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_case_defaults_on_missing_fields() {
        let case: StoredCase = serde_json::from_str(r#"{"title": "合同纠纷案件"}"#).unwrap();
        assert_eq!(case.title, "合同纠纷案件");
        assert_eq!(case.aj_id, None);
        assert_eq!(case.abstract_text, "");
        assert!(case.tags.is_empty());
    }

    #[test]
    fn test_stored_case_round_trip() {
        let case = StoredCase {
            aj_id: Some("aj-42".to_string()),
            title: "X".to_string(),
            abstract_text: "Y".to_string(),
            content: "Z".to_string(),
            analysis: "A".to_string(),
            result: "R".to_string(),
            tags: vec!["合同纠纷".to_string()],
        };

        let json = serde_json::to_value(&case).unwrap();
        assert_eq!(json["ajId"], "aj-42");
        assert_eq!(json["abstract"], "Y");

        let back: StoredCase = serde_json::from_value(json).unwrap();
        assert_eq!(back, case);
    }
}
