//! # ID Mapping Module
//!
//! ## Purpose
//! Bidirectional mapping between external case identifiers (`ajId`) and
//! index document identifiers (`docId`). Built once by the offline indexer
//! and loaded read-only by the server at startup.
//!
//! ## Input/Output Specification
//! - **Input**: (ajId, docId) pairs collected during corpus traversal
//! - **Output**: JSON artifact with `doc2id` and `id2doc` maps
//! - **Degradation**: A missing artifact yields empty mappings, not a crash

use crate::errors::{Result, SearchError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

/// The persisted mapping artifact. The two maps are consistent inverses
/// wherever both sides are defined.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdMappings {
    /// ajId -> docId
    pub doc2id: HashMap<String, String>,
    /// docId -> ajId
    pub id2doc: HashMap<String, String>,
}

impl IdMappings {
    /// Record one pair in both directions
    pub fn insert(&mut self, aj_id: String, doc_id: String) {
        self.doc2id.insert(aj_id.clone(), doc_id.clone());
        self.id2doc.insert(doc_id, aj_id);
    }

    pub fn len(&self) -> usize {
        self.id2doc.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id2doc.is_empty()
    }

    /// Resolve an external case id to its document id
    pub fn doc_id_for(&self, aj_id: &str) -> Option<&str> {
        self.doc2id.get(aj_id).map(String::as_str)
    }

    /// Resolve a document id to its external case id
    pub fn aj_id_for(&self, doc_id: &str) -> Option<&str> {
        self.id2doc.get(doc_id).map(String::as_str)
    }

    /// Persist the artifact as JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content)?;
        info!(path = ?path.as_ref(), entries = self.len(), "ID mappings saved");
        Ok(())
    }

    /// Load the artifact. Absence degrades to empty mappings; a present
    /// but corrupt file is a configuration error.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            warn!(
                ?path,
                "ID mapping file not found; similarity lookups by ajId degrade"
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let mappings: Self = serde_json::from_str(&content).map_err(|e| SearchError::Config {
            message: format!("Corrupt ID mapping file {:?}: {}", path, e),
        })?;

        info!(?path, entries = mappings.len(), "ID mappings loaded");
        Ok(mappings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_keeps_directions_consistent() {
        let mut mappings = IdMappings::default();
        mappings.insert("aj-1".to_string(), "doc_1".to_string());
        mappings.insert("aj-2".to_string(), "doc_2".to_string());

        assert_eq!(mappings.doc_id_for("aj-1"), Some("doc_1"));
        assert_eq!(mappings.aj_id_for("doc_1"), Some("aj-1"));
        for (aj_id, doc_id) in &mappings.doc2id {
            assert_eq!(mappings.id2doc.get(doc_id), Some(aj_id));
        }
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("id_mappings.json");

        let mut mappings = IdMappings::default();
        mappings.insert("aj-9".to_string(), "doc_9".to_string());
        mappings.save(&path).unwrap();

        let loaded = IdMappings::load(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.doc_id_for("aj-9"), Some("doc_9"));
    }

    #[test]
    fn test_missing_file_degrades_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = IdMappings::load(dir.path().join("absent.json")).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("id_mappings.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(IdMappings::load(&path).is_err());
    }
}
