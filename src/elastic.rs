//! # Elasticsearch Gateway Module
//!
//! ## Purpose
//! Thin HTTP client over the Elasticsearch REST API: query execution,
//! single-document fetch, and bulk indexing, with connection management.
//!
//! ## Input/Output Specification
//! - **Input**: Structured query bodies, document ids, bulk actions
//! - **Output**: Parsed search responses (hits, totals, highlights)
//! - **Failure**: Connection failures surface as `ConnectionFailure`;
//!   engine rejections as `UpstreamQueryFailure`
//!
//! ## Key Features
//! - Lazily verified connection: the cluster is pinged on first use and
//!   re-pinged after any detected connection failure
//! - Bounded request timeout with automatic retries on transient failures
//! - Index lifecycle operations for the offline indexer (drop, create, bulk)

use crate::config::ElasticsearchConfig;
use crate::errors::{Result, SearchError};
use crate::{CaseDocument, StoredCase};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Gateway to the Elasticsearch cluster.
///
/// Shared process-wide behind an `Arc`; the readiness flag is the only
/// mutable state. A broken connection is treated the same as "not yet
/// initialized": the next call re-runs the ping instead of reusing a dead
/// handle.
pub struct ElasticGateway {
    config: ElasticsearchConfig,
    client: Client,
    ready: RwLock<bool>,
}

/// One matched document returned by the engine
#[derive(Debug, Clone, Deserialize)]
pub struct SearchHit {
    /// Document identifier assigned at index time
    #[serde(rename = "_id")]
    pub doc_id: String,
    /// Engine-assigned relevance score
    #[serde(rename = "_score", default)]
    pub score: Option<f64>,
    /// Stored fields
    #[serde(rename = "_source", default)]
    pub source: StoredCase,
    /// Highlighted fragments per field, when the query matched there
    #[serde(default)]
    pub highlight: Option<HashMap<String, Vec<String>>>,
}

/// Parsed outcome of a search round trip
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub hits: Vec<SearchHit>,
    pub total: u64,
}

#[derive(Debug, Deserialize)]
struct SearchResponseBody {
    hits: HitsEnvelope,
}

#[derive(Debug, Deserialize)]
struct HitsEnvelope {
    total: TotalHits,
    hits: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct TotalHits {
    value: u64,
}

#[derive(Debug, Deserialize)]
struct GetResponseBody {
    found: bool,
    #[serde(rename = "_source", default)]
    source: Option<StoredCase>,
}

#[derive(Debug, Deserialize)]
struct BulkResponseBody {
    errors: bool,
    #[serde(default)]
    items: Vec<Value>,
}

impl ElasticGateway {
    /// Create a gateway. Does not contact the cluster yet; the first
    /// operation triggers the ping.
    pub fn new(config: ElasticsearchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .user_agent("case-search/0.1")
            .build()
            .map_err(|e| SearchError::NetworkError {
                details: e.to_string(),
            })?;

        Ok(Self {
            config,
            client,
            ready: RwLock::new(false),
        })
    }

    /// Ping the cluster root endpoint
    pub async fn ping(&self) -> Result<()> {
        let response = self
            .client
            .get(&self.config.url)
            .send()
            .await
            .map_err(|e| SearchError::ConnectionFailure {
                details: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(SearchError::ConnectionFailure {
                details: format!("Ping returned HTTP {}", response.status()),
            });
        }

        Ok(())
    }

    /// Verify the connection, pinging lazily on first use or after a
    /// detected failure
    async fn ensure_ready(&self) -> Result<()> {
        if *self.ready.read().await {
            return Ok(());
        }

        let mut ready = self.ready.write().await;
        if *ready {
            return Ok(());
        }

        self.ping().await?;
        info!("Elasticsearch connection established at {}", self.config.url);
        *ready = true;
        Ok(())
    }

    /// Drop the readiness flag so the next call re-establishes the
    /// connection instead of reusing a dead handle
    async fn mark_broken(&self) {
        *self.ready.write().await = false;
    }

    /// Execute a search request against the configured index
    pub async fn search(&self, body: &Value) -> Result<SearchOutcome> {
        self.ensure_ready().await?;

        let url = format!("{}/{}/_search", self.config.url, self.config.index);
        let response = self
            .send_with_retries(|| self.client.post(&url).json(body))
            .await?;

        let status = response.status();
        if !status.is_success() {
            let details = response.text().await.unwrap_or_default();
            return Err(SearchError::UpstreamQueryFailure {
                status: status.as_u16(),
                details,
            });
        }

        let parsed: SearchResponseBody =
            response
                .json()
                .await
                .map_err(|e| SearchError::UpstreamQueryFailure {
                    status: status.as_u16(),
                    details: format!("Unparseable search response: {}", e),
                })?;

        debug!(
            total = parsed.hits.total.value,
            returned = parsed.hits.hits.len(),
            "Search round trip completed"
        );

        Ok(SearchOutcome {
            total: parsed.hits.total.value,
            hits: parsed.hits.hits,
        })
    }

    /// Fetch a single stored document by id
    pub async fn get_document(&self, doc_id: &str) -> Result<StoredCase> {
        self.ensure_ready().await?;

        let url = format!("{}/{}/_doc/{}", self.config.url, self.config.index, doc_id);
        let response = self.send_with_retries(|| self.client.get(&url)).await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(SearchError::NotFound {
                doc_id: doc_id.to_string(),
            });
        }

        let status = response.status();
        if !status.is_success() {
            let details = response.text().await.unwrap_or_default();
            return Err(SearchError::UpstreamQueryFailure {
                status: status.as_u16(),
                details,
            });
        }

        let parsed: GetResponseBody = response.json().await.map_err(|e| {
            SearchError::UpstreamQueryFailure {
                status: status.as_u16(),
                details: format!("Unparseable document response: {}", e),
            }
        })?;

        match (parsed.found, parsed.source) {
            (true, Some(source)) => Ok(source),
            _ => Err(SearchError::NotFound {
                doc_id: doc_id.to_string(),
            }),
        }
    }

    /// Delete the index; a missing index is not an error
    pub async fn delete_index(&self) -> Result<()> {
        self.ensure_ready().await?;

        let url = format!("{}/{}", self.config.url, self.config.index);
        let response = self.send_with_retries(|| self.client.delete(&url)).await?;

        let status = response.status();
        if !status.is_success() && status != StatusCode::NOT_FOUND {
            let details = response.text().await.unwrap_or_default();
            return Err(SearchError::UpstreamQueryFailure {
                status: status.as_u16(),
                details,
            });
        }

        Ok(())
    }

    /// Create the index with the given settings and mappings
    pub async fn create_index(&self, schema: &Value) -> Result<()> {
        self.ensure_ready().await?;

        let url = format!("{}/{}", self.config.url, self.config.index);
        let response = self
            .send_with_retries(|| self.client.put(&url).json(schema))
            .await?;

        let status = response.status();
        if !status.is_success() {
            let details = response.text().await.unwrap_or_default();
            return Err(SearchError::UpstreamQueryFailure {
                status: status.as_u16(),
                details,
            });
        }

        info!("Index '{}' created", self.config.index);
        Ok(())
    }

    /// Submit a batch of documents through the bulk API.
    ///
    /// Per-item failures are logged and reported; they do not identify
    /// which other items in the batch succeeded.
    pub async fn bulk_index(&self, documents: &[CaseDocument]) -> Result<()> {
        if documents.is_empty() {
            return Ok(());
        }

        self.ensure_ready().await?;

        let mut body = String::new();
        for doc in documents {
            let action = serde_json::json!({
                "index": { "_index": self.config.index, "_id": doc.doc_id }
            });
            body.push_str(&action.to_string());
            body.push('\n');
            body.push_str(&serde_json::to_string(&doc.fields)?);
            body.push('\n');
        }

        let url = format!("{}/_bulk", self.config.url);
        let response = self
            .send_with_retries(|| {
                self.client
                    .post(&url)
                    .header("Content-Type", "application/x-ndjson")
                    .body(body.clone())
            })
            .await?;

        let status = response.status();
        if !status.is_success() {
            let details = response.text().await.unwrap_or_default();
            return Err(SearchError::UpstreamQueryFailure {
                status: status.as_u16(),
                details,
            });
        }

        let parsed: BulkResponseBody =
            response
                .json()
                .await
                .map_err(|e| SearchError::UpstreamQueryFailure {
                    status: status.as_u16(),
                    details: format!("Unparseable bulk response: {}", e),
                })?;

        if parsed.errors {
            for item in &parsed.items {
                if item["index"]["error"].is_object() {
                    warn!(
                        doc_id = %item["index"]["_id"],
                        error = %item["index"]["error"],
                        "Bulk item failed"
                    );
                }
            }
            return Err(SearchError::UpstreamQueryFailure {
                status: status.as_u16(),
                details: "Bulk request reported item-level errors".to_string(),
            });
        }

        debug!(count = documents.len(), "Bulk batch submitted");
        Ok(())
    }

    /// Send a request, retrying transient failures. Connection-level
    /// errors drop the readiness flag before surfacing.
    async fn send_with_retries<F>(&self, build: F) -> Result<reqwest::Response>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let mut attempt: u32 = 0;
        loop {
            match build().send().await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    let transient =
                        e.is_connect() || (e.is_timeout() && self.config.retry_on_timeout);
                    if transient && attempt < self.config.max_retries {
                        attempt += 1;
                        warn!(
                            attempt,
                            max = self.config.max_retries,
                            error = %e,
                            "Transient Elasticsearch failure, retrying"
                        );
                        continue;
                    }

                    if e.is_connect() {
                        self.mark_broken().await;
                        return Err(SearchError::ConnectionFailure {
                            details: e.to_string(),
                        });
                    }
                    return Err(SearchError::NetworkError {
                        details: e.to_string(),
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn gateway_for(server: &MockServer) -> ElasticGateway {
        let mut config = Config::default().elasticsearch;
        config.url = server.uri();
        config.max_retries = 0;
        ElasticGateway::new(config).unwrap()
    }

    async fn mount_ping(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"tagline": "ok"})))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_search_parses_hits_and_total() {
        let server = MockServer::start().await;
        mount_ping(&server).await;

        Mock::given(method("POST"))
            .and(path("/legal_documents/_search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "hits": {
                    "total": { "value": 2, "relation": "eq" },
                    "hits": [
                        {
                            "_id": "doc_1",
                            "_score": 3.5,
                            "_source": { "title": "合同纠纷案件" },
                            "highlight": { "title": ["<em>合同纠纷</em>案件"] }
                        },
                        { "_id": "doc_2", "_score": 1.2, "_source": {} }
                    ]
                }
            })))
            .mount(&server)
            .await;

        let gateway = gateway_for(&server);
        let outcome = gateway.search(&json!({"query": {}})).await.unwrap();

        assert_eq!(outcome.total, 2);
        assert_eq!(outcome.hits.len(), 2);
        assert_eq!(outcome.hits[0].doc_id, "doc_1");
        assert_eq!(outcome.hits[0].score, Some(3.5));
        assert_eq!(
            outcome.hits[0].highlight.as_ref().unwrap()["title"][0],
            "<em>合同纠纷</em>案件"
        );
        assert_eq!(outcome.hits[1].source.title, "");
    }

    #[tokio::test]
    async fn test_search_rejection_is_upstream_failure() {
        let server = MockServer::start().await;
        mount_ping(&server).await;

        Mock::given(method("POST"))
            .and(path("/legal_documents/_search"))
            .respond_with(
                ResponseTemplate::new(400).set_body_string("unknown field [titel]"),
            )
            .mount(&server)
            .await;

        let gateway = gateway_for(&server);
        let err = gateway.search(&json!({})).await.unwrap_err();
        match err {
            SearchError::UpstreamQueryFailure { status, details } => {
                assert_eq!(status, 400);
                assert!(details.contains("titel"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_get_document_not_found() {
        let server = MockServer::start().await;
        mount_ping(&server).await;

        Mock::given(method("GET"))
            .and(path("/legal_documents/_doc/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"found": false})))
            .mount(&server)
            .await;

        let gateway = gateway_for(&server);
        let err = gateway.get_document("missing").await.unwrap_err();
        assert!(matches!(err, SearchError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_get_document_returns_stored_fields() {
        let server = MockServer::start().await;
        mount_ping(&server).await;

        Mock::given(method("GET"))
            .and(path("/legal_documents/_doc/doc_9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "found": true,
                "_source": { "title": "X", "abstract": "Y", "content": "Z" }
            })))
            .mount(&server)
            .await;

        let gateway = gateway_for(&server);
        let case = gateway.get_document("doc_9").await.unwrap();
        assert_eq!(case.title, "X");
        assert_eq!(case.abstract_text, "Y");
        assert_eq!(case.content, "Z");
    }

    #[tokio::test]
    async fn test_unreachable_cluster_is_connection_failure() {
        // Reserved port with nothing listening
        let mut config = Config::default().elasticsearch;
        config.url = "http://127.0.0.1:1".to_string();
        config.request_timeout_seconds = 1;
        config.max_retries = 0;

        let gateway = ElasticGateway::new(config).unwrap();
        let err = gateway.search(&json!({})).await.unwrap_err();
        assert!(matches!(err, SearchError::ConnectionFailure { .. }));
    }

    #[tokio::test]
    async fn test_delete_index_tolerates_missing_index() {
        let server = MockServer::start().await;
        mount_ping(&server).await;

        Mock::given(method("DELETE"))
            .and(path("/legal_documents"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let gateway = gateway_for(&server);
        assert!(gateway.delete_index().await.is_ok());
    }
}
