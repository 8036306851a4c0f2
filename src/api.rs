//! # API Server Module
//!
//! ## Purpose
//! REST API surface of the case search service: keyword search, similarity
//! search seeded by an uploaded case file, and single-document retrieval.
//!
//! ## Input/Output Specification
//! - **Input**: HTTP requests with search queries, filters, uploaded seeds
//! - **Output**: JSON responses with ranked results and totals
//! - **Endpoints**: `/search`, `/upload_similar_cases`, `/document/{id}`, `/`
//!
//! ## Key Features
//! - CORS support for web frontends
//! - Structured JSON error responses; no failure terminates the process
//! - Empty queries short-circuit without touching the search engine

use crate::errors::SearchError;
use crate::query::{
    build_keyword_query, build_similarity_query, Pagination, SearchFilters, SimilaritySeed,
};
use crate::results::{assemble, CaseResult};
use actix_cors::Cors;
use actix_multipart::Multipart;
use actix_web::error::{InternalError, JsonPayloadError};
use actix_web::http::StatusCode;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer, Result as ActixResult};
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// Pagination defaults when the request omits page or size
const DEFAULT_PAGE: u64 = 1;
const DEFAULT_SIZE: u64 = 10;

/// Application wrapper owning the HTTP server lifecycle
pub struct ApiServer {
    app_state: crate::AppState,
}

/// Keyword search request payload
#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub page: Option<u64>,
    pub size: Option<u64>,
    #[serde(default)]
    pub filters: Option<SearchFilters>,
}

/// Pagination query parameters for the upload endpoint
#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub page: Option<u64>,
    pub size: Option<u64>,
}

/// Search response payload shared by both search modes
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<CaseResult>,
    pub total: u64,
}

impl ApiServer {
    pub fn new(app_state: crate::AppState) -> Self {
        Self { app_state }
    }

    /// Run the API server until it stops or fails
    pub async fn run(self) -> crate::Result<()> {
        let bind_addr = format!(
            "{}:{}",
            self.app_state.config.server.host, self.app_state.config.server.port
        );
        let enable_cors = self.app_state.config.server.enable_cors;
        let app_state = self.app_state;

        info!("Starting API server on {}", bind_addr);

        // Build and bind in their own statement: the `HttpServer` factory
        // holds non-Send state, only the bound `Server` may cross an await
        let server = HttpServer::new(move || {
            let cors = if enable_cors {
                Cors::permissive()
            } else {
                Cors::default()
            };

            App::new()
                .wrap(cors)
                .app_data(web::Data::new(app_state.clone()))
                .app_data(web::JsonConfig::default().error_handler(json_error_handler))
                .route("/search", web::post().to(search_handler))
                .route(
                    "/upload_similar_cases",
                    web::post().to(upload_similar_handler),
                )
                .route("/document/{doc_id}", web::get().to(document_handler))
                .route("/", web::get().to(index_handler))
        })
        .bind(&bind_addr)
        .map_err(|e| SearchError::Internal {
            message: format!("Failed to bind server to {}: {}", bind_addr, e),
        })?
        .run();

        server.await.map_err(|e| SearchError::Internal {
            message: format!("Server error: {}", e),
        })?;

        Ok(())
    }
}

/// Map JSON body extraction failures through the structured error shape
/// instead of actix's plain-text default
fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let response = error_response(&SearchError::MalformedInput {
        details: err.to_string(),
    });
    InternalError::from_response(err, response).into()
}

/// Convert a service error into a structured JSON error response
fn error_response(err: &SearchError) -> HttpResponse {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        error!(category = err.category(), "Request failed: {}", err);
    } else {
        warn!(category = err.category(), "Request rejected: {}", err);
    }
    HttpResponse::build(status).json(serde_json::json!({ "error": err.to_string() }))
}

/// Keyword search endpoint handler
async fn search_handler(
    app_state: web::Data<crate::AppState>,
    request: web::Json<SearchRequest>,
) -> ActixResult<HttpResponse> {
    let request = request.into_inner();

    // Empty query: stable empty result, no engine round trip
    if request.query.is_empty() {
        return Ok(HttpResponse::Ok().json(SearchResponse {
            results: Vec::new(),
            total: 0,
        }));
    }

    let pagination = Pagination::new(
        request.page.unwrap_or(DEFAULT_PAGE),
        request.size.unwrap_or(DEFAULT_SIZE),
    );
    let filters = request.filters.unwrap_or_default();
    let body = build_keyword_query(&request.query, &pagination, &filters);

    info!(query = %request.query, "Executing keyword search");

    match app_state.gateway.search(&body).await {
        Ok(outcome) => {
            info!(total = outcome.total, query = %request.query, "Keyword search completed");
            Ok(HttpResponse::Ok().json(SearchResponse {
                total: outcome.total,
                results: assemble(outcome.hits),
            }))
        }
        Err(e) => Ok(error_response(&e)),
    }
}

/// Similarity search endpoint handler: multipart upload of a JSON seed case
async fn upload_similar_handler(
    app_state: web::Data<crate::AppState>,
    payload: Multipart,
    params: web::Query<PageParams>,
) -> ActixResult<HttpResponse> {
    let seed = match read_seed_upload(payload).await {
        Ok(seed) => seed,
        Err(e) => return Ok(error_response(&e)),
    };

    if seed.is_empty() {
        return Ok(error_response(&SearchError::MalformedInput {
            details: "Uploaded file contains none of the similarity fields 'ajName', 'ajjbqk', 'qw'"
                .to_string(),
        }));
    }

    let pagination = Pagination::new(
        params.page.unwrap_or(DEFAULT_PAGE),
        params.size.unwrap_or(DEFAULT_SIZE),
    );
    let body = build_similarity_query(&seed, &pagination);

    info!(title = %seed.title, "Executing similarity search from uploaded case");

    match app_state.gateway.search(&body).await {
        Ok(outcome) => {
            info!(total = outcome.total, "Similarity search completed");
            Ok(HttpResponse::Ok().json(SearchResponse {
                total: outcome.total,
                results: assemble(outcome.hits),
            }))
        }
        Err(e) => Ok(error_response(&e)),
    }
}

/// Read the uploaded multipart file and parse it as a similarity seed
async fn read_seed_upload(mut payload: Multipart) -> crate::Result<SimilaritySeed> {
    let mut file_bytes: Option<Vec<u8>> = None;

    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|e| SearchError::MalformedInput {
            details: format!("Invalid multipart payload: {}", e),
        })?
    {
        if field.name() != "file" {
            continue;
        }

        let mut data = Vec::new();
        while let Some(chunk) =
            field
                .try_next()
                .await
                .map_err(|e| SearchError::MalformedInput {
                    details: format!("Failed to read uploaded file: {}", e),
                })?
        {
            data.extend_from_slice(&chunk);
        }
        file_bytes = Some(data);
    }

    let data = file_bytes.ok_or_else(|| SearchError::MalformedInput {
        details: "No file part in request".to_string(),
    })?;

    serde_json::from_slice(&data).map_err(|e| SearchError::MalformedInput {
        details: format!("Uploaded file is not valid JSON: {}", e),
    })
}

/// Single-document retrieval endpoint handler
async fn document_handler(
    app_state: web::Data<crate::AppState>,
    doc_id: web::Path<String>,
) -> ActixResult<HttpResponse> {
    match app_state.gateway.get_document(&doc_id).await {
        Ok(case) => Ok(HttpResponse::Ok().json(case)),
        Err(e) => Ok(error_response(&e)),
    }
}

/// Liveness marker
async fn index_handler() -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body("司法搜索引擎后端 API 运行中！"))
}
