//! # Error Handling Module
//!
//! ## Purpose
//! Centralized error handling for the case search service, covering the
//! Elasticsearch gateway, the offline indexer, and the HTTP API surface.
//!
//! ## Input/Output Specification
//! - **Input**: Error conditions from gateway, indexer, and API components
//! - **Output**: Structured error types with context, mapped to HTTP statuses
//! - **Error Categories**: Connection, Input, NotFound, Upstream, Indexing, Config
//!
//! ## Key Features
//! - One error enum shared by every component
//! - Automatic conversion from common library errors
//! - HTTP status mapping for the serving boundary
//! - Recoverability classification for the gateway retry loop

use thiserror::Error;

/// Result type used throughout the application
pub type Result<T> = std::result::Result<T, SearchError>;

/// Error types for the case search service
#[derive(Debug, Error)]
pub enum SearchError {
    /// Elasticsearch is unreachable or the ping failed
    #[error("Elasticsearch connection failed: {details}")]
    ConnectionFailure { details: String },

    /// Invalid request body, upload, or query parameters
    #[error("Invalid request: {details}")]
    MalformedInput { details: String },

    /// A document id that does not exist in the index
    #[error("Document '{doc_id}' not found")]
    NotFound { doc_id: String },

    /// Elasticsearch rejected or errored on a well-formed query
    #[error("Search engine error ({status}): {details}")]
    UpstreamQueryFailure { status: u16, details: String },

    /// A single corrupt source file during offline indexing
    #[error("Failed to index {file}: {details}")]
    IndexingFailure { file: String, details: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Network-level errors talking to Elasticsearch
    #[error("Network error: {details}")]
    NetworkError { details: String },

    /// Internal system errors
    #[error("Internal error: {message}")]
    Internal { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization failed: {message}")]
    SerializationFailed { message: String },
}

impl SearchError {
    /// Check if the error is transient (the gateway may retry)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SearchError::ConnectionFailure { .. } | SearchError::NetworkError { .. }
        )
    }

    /// Get error category for metrics and logging
    pub fn category(&self) -> &'static str {
        match self {
            SearchError::ConnectionFailure { .. } | SearchError::NetworkError { .. } => {
                "connection"
            }
            SearchError::MalformedInput { .. } => "input",
            SearchError::NotFound { .. } => "not_found",
            SearchError::UpstreamQueryFailure { .. } => "upstream",
            SearchError::IndexingFailure { .. } => "indexing",
            SearchError::Config { .. } => "configuration",
            SearchError::Internal { .. } | SearchError::SerializationFailed { .. } => "generic",
        }
    }

    /// HTTP status code used when the error reaches the serving boundary
    pub fn http_status(&self) -> u16 {
        match self {
            SearchError::ConnectionFailure { .. } => 503,
            SearchError::MalformedInput { .. } => 400,
            SearchError::NotFound { .. } => 404,
            _ => 500,
        }
    }
}

// Conversion from common error types
impl From<std::io::Error> for SearchError {
    fn from(err: std::io::Error) -> Self {
        SearchError::Internal {
            message: format!("IO error: {}", err),
        }
    }
}

impl From<serde_json::Error> for SearchError {
    fn from(err: serde_json::Error) -> Self {
        SearchError::SerializationFailed {
            message: format!("JSON serialization error: {}", err),
        }
    }
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        SearchError::NetworkError {
            details: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_mapping() {
        let conn = SearchError::ConnectionFailure {
            details: "refused".to_string(),
        };
        assert_eq!(conn.http_status(), 503);

        let input = SearchError::MalformedInput {
            details: "empty seed".to_string(),
        };
        assert_eq!(input.http_status(), 400);

        let missing = SearchError::NotFound {
            doc_id: "doc_1".to_string(),
        };
        assert_eq!(missing.http_status(), 404);

        let upstream = SearchError::UpstreamQueryFailure {
            status: 400,
            details: "mapping mismatch".to_string(),
        };
        assert_eq!(upstream.http_status(), 500);
    }

    #[test]
    fn test_recoverable_classification() {
        assert!(SearchError::NetworkError {
            details: "timeout".to_string()
        }
        .is_recoverable());
        assert!(!SearchError::NotFound {
            doc_id: "x".to_string()
        }
        .is_recoverable());
    }
}
