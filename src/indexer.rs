//! # Corpus Indexing Module
//!
//! ## Purpose
//! Offline pipeline loading a raw case corpus into the search index:
//! schema creation, field extraction, topic tagging, batched bulk
//! submission, and ID-mapping construction.
//!
//! ## Input/Output Specification
//! - **Input**: Corpus root directory (one level of subdirectories, each
//!   holding per-case JSON files)
//! - **Output**: Rebuilt index plus the persisted ID-mapping artifact;
//!   returns the number of documents indexed
//! - **Failure policy**: A malformed case file is logged and skipped; it
//!   never aborts the batch or the run
//!
//! ## Key Features
//! - Destructive full rebuild (drop and recreate), idempotent per run
//! - Deterministic document ids derived from source filename stems
//! - Bounded memory via fixed-size bulk batches

use crate::config::IndexingConfig;
use crate::elastic::ElasticGateway;
use crate::errors::{Result, SearchError};
use crate::mappings::IdMappings;
use crate::tags::extract_tags;
use crate::{CaseDocument, StoredCase};
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::Path;
use tracing::{info, warn};

/// Raw per-case file shape as found in the corpus
#[derive(Debug, Deserialize)]
struct RawCase {
    #[serde(rename = "ajId", default)]
    aj_id: Option<String>,
    /// Case title
    #[serde(rename = "ajName", default)]
    aj_name: String,
    /// Case abstract
    #[serde(default)]
    ajjbqk: String,
    /// Full judgment text
    #[serde(default)]
    qw: String,
    /// Court analysis section
    #[serde(default)]
    cpfxgc: String,
    /// Judgment result section
    #[serde(default)]
    pjjg: String,
}

/// Index schema: exact-match keyword fields, full-text fields with the
/// fine-grained Chinese analyzer, and tags with a keyword sub-field for
/// score-neutral filtering.
fn index_schema() -> Value {
    json!({
        "settings": {
            "analysis": {
                "analyzer": {
                    "ik_smart_analyzer": { "type": "custom", "tokenizer": "ik_smart" },
                    "ik_max_word_analyzer": { "type": "custom", "tokenizer": "ik_max_word" },
                }
            }
        },
        "mappings": {
            "properties": {
                "ajId": { "type": "keyword" },
                "title": { "type": "text", "analyzer": "ik_max_word_analyzer" },
                "abstract": { "type": "text", "analyzer": "ik_max_word_analyzer" },
                "content": { "type": "text", "analyzer": "ik_max_word_analyzer" },
                "analysis": { "type": "keyword" },
                "result": { "type": "keyword" },
                "tags": {
                    "type": "text",
                    "fields": {
                        "keyword": { "type": "keyword", "ignore_above": 256 }
                    }
                },
            }
        }
    })
}

/// Rebuild the index from the corpus under `source_dir` and persist the
/// ID-mapping artifact. Returns the number of documents indexed.
///
/// Destructive whole-index rebuild; must not run concurrently with itself
/// or with traffic expecting index stability.
pub async fn index_corpus(
    gateway: &ElasticGateway,
    source_dir: &Path,
    config: &IndexingConfig,
) -> Result<usize> {
    info!(?source_dir, "Rebuilding index from corpus");

    gateway.delete_index().await?;
    gateway.create_index(&index_schema()).await?;

    let mut batch: Vec<CaseDocument> = Vec::with_capacity(config.batch_size);
    let mut mappings = IdMappings::default();
    let mut indexed = 0usize;

    for file_path in corpus_files(source_dir)? {
        let document = match load_case(&file_path) {
            Ok(document) => document,
            Err(e) => {
                warn!(file = ?file_path, error = %e, "Skipping malformed case file");
                continue;
            }
        };

        if let Some(aj_id) = &document.fields.aj_id {
            mappings.insert(aj_id.clone(), document.doc_id.clone());
        }

        batch.push(document);
        indexed += 1;

        if batch.len() >= config.batch_size {
            gateway.bulk_index(&batch).await?;
            batch.clear();
        }
    }

    // Flush the partial final batch
    gateway.bulk_index(&batch).await?;

    mappings.save(&config.mappings_path)?;
    info!(indexed, mappings = mappings.len(), "Corpus indexing finished");

    Ok(indexed)
}

/// Enumerate case files: one level of subdirectories, JSON files only.
/// Order is directory-iteration order; document ids make the result
/// independent of it.
fn corpus_files(source_dir: &Path) -> Result<Vec<std::path::PathBuf>> {
    let mut files = Vec::new();

    for entry in std::fs::read_dir(source_dir).map_err(|e| SearchError::Config {
        message: format!("Cannot read corpus directory {:?}: {}", source_dir, e),
    })? {
        let subdir = entry?.path();
        if !subdir.is_dir() {
            continue;
        }

        for file_entry in std::fs::read_dir(&subdir)? {
            let file_path = file_entry?.path();
            if file_path.extension().and_then(|ext| ext.to_str()) == Some("json") {
                files.push(file_path);
            }
        }
    }

    Ok(files)
}

/// Parse one case file into an indexable document. The document id is the
/// filename stem, unique and immutable across runs.
fn load_case(file_path: &Path) -> Result<CaseDocument> {
    let doc_id = file_path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .ok_or_else(|| SearchError::IndexingFailure {
            file: file_path.display().to_string(),
            details: "Filename is not valid UTF-8".to_string(),
        })?
        .to_string();

    let content = std::fs::read_to_string(file_path)?;
    let raw: RawCase =
        serde_json::from_str(&content).map_err(|e| SearchError::IndexingFailure {
            file: file_path.display().to_string(),
            details: e.to_string(),
        })?;

    let tags = extract_tags(&raw.aj_name, &raw.ajjbqk);

    Ok(CaseDocument {
        doc_id,
        fields: StoredCase {
            aj_id: raw.aj_id,
            title: raw.aj_name,
            abstract_text: raw.ajjbqk,
            content: raw.qw,
            analysis: raw.cpfxgc,
            result: raw.pjjg,
            tags,
        },
    })
}
