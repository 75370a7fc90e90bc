//! JSON HTTP API over the [`DataService`] façade.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/sources` | List registered sources |
//! | `POST` | `/sources` | Register a source |
//! | `GET`  | `/sources/{id}` | One source |
//! | `POST` | `/sources/refresh` | Refresh every source |
//! | `POST` | `/sources/{id}/status` | Set `maintenance` or `disconnected` |
//! | `POST` | `/sources/{id}/reconnect` | Re-test stored credentials |
//! | `GET`  | `/sources/{id}/schemas` | Recorded schemas |
//! | `GET`  | `/sources/{id}/schemas/export` | Schema export document |
//! | `POST` | `/sources/{id}/query` | Execute a query |
//! | `POST` | `/sources/{id}/optimize` | Advisory query rewrite |
//! | `GET`  | `/sources/{id}/quality` | Quality report |
//! | `POST` | `/connections/test` | Test credentials |
//! | `GET`  | `/samples/{kind}` | Sample queries for a kind |
//! | `POST` | `/ask` | Natural-language question |
//! | `GET`  | `/insights` | Insight feed |
//! | `GET`  | `/dashboard` | Dashboard summary |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "data source not found: 42" } }
//! ```
//!
//! | Code | Status |
//! |------|--------|
//! | `not_found` | 404 |
//! | `validation`, `invalid_query` | 400 |
//! | `connection`, `authentication`, `backend` | 502 |
//! | `timeout` | 504 |
//! | `internal` | 500 |
//!
//! Credentials are redacted in every response body.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use datasynergy_core::models::{
    ConnectionCredentials, ConnectionTestResult, DashboardSummary, DataSource, DataSourceKind,
    Insight, OptimizedQuery, QualityReport, QueryResult, Schema, SchemaExport, SourceDraft,
    SourceStatus,
};
use datasynergy_core::ServiceError;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::nl::NlAnswer;
use crate::registry::RefreshSummary;
use crate::service::DataService;

type AppState = Arc<DataService>;

/// Builds the service from `config` and serves it on `[server].bind`.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let service = Arc::new(DataService::from_config(config)?);
    serve(service, &config.server.bind).await
}

/// Serves an already built service. Runs until the process is terminated.
pub async fn serve(service: Arc<DataService>, bind_addr: &str) -> anyhow::Result<()> {
    let app = router(service);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    println!("DataSynergy server listening on http://{}", bind_addr);
    tracing::info!(bind = bind_addr, "server started");
    axum::serve(listener, app).await?;

    Ok(())
}

pub fn router(service: Arc<DataService>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/sources", get(handle_list_sources).post(handle_add_source))
        .route("/sources/refresh", post(handle_refresh))
        .route("/sources/{id}", get(handle_get_source))
        .route("/sources/{id}/status", post(handle_set_status))
        .route("/sources/{id}/reconnect", post(handle_reconnect))
        .route("/sources/{id}/schemas", get(handle_schemas))
        .route("/sources/{id}/schemas/export", get(handle_export_schema))
        .route("/sources/{id}/query", post(handle_query))
        .route("/sources/{id}/optimize", post(handle_optimize))
        .route("/sources/{id}/quality", get(handle_quality))
        .route("/connections/test", post(handle_test_connection))
        .route("/samples/{kind}", get(handle_samples))
        .route("/ask", post(handle_ask))
        .route("/insights", get(handle_insights))
        .route("/dashboard", get(handle_dashboard))
        .layer(cors)
        .with_state(service)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        let status = match &err {
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Validation(_) | ServiceError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            ServiceError::Connection { .. }
            | ServiceError::Authentication(_)
            | ServiceError::Backend { .. } => StatusCode::BAD_GATEWAY,
            ServiceError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(code = err.code(), error = %err, "request failed");
        }
        AppError {
            status,
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        ServiceError::validation(rejection.body_text()).into()
    }
}

type ApiResult<T> = Result<Json<T>, AppError>;

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ Sources ============

#[derive(Serialize)]
struct SourceListResponse {
    sources: Vec<DataSource>,
}

async fn handle_list_sources(State(service): State<AppState>) -> ApiResult<SourceListResponse> {
    let sources = service
        .list_sources()
        .await?
        .iter()
        .map(|s| s.redacted())
        .collect();
    Ok(Json(SourceListResponse { sources }))
}

async fn handle_get_source(
    State(service): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<DataSource> {
    Ok(Json(service.get_source(&id).await?.redacted()))
}

async fn handle_add_source(
    State(service): State<AppState>,
    body: Result<Json<SourceDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<DataSource>), AppError> {
    let Json(draft) = body?;
    let source = service.add_source(draft).await?;
    Ok((StatusCode::CREATED, Json(source.redacted())))
}

async fn handle_refresh(State(service): State<AppState>) -> ApiResult<RefreshSummary> {
    Ok(Json(service.refresh_all().await?))
}

#[derive(Deserialize)]
struct StatusRequest {
    status: String,
    #[serde(default)]
    message: Option<String>,
}

async fn handle_set_status(
    State(service): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<StatusRequest>, JsonRejection>,
) -> ApiResult<DataSource> {
    let Json(req) = body?;
    let status: SourceStatus = req.status.parse()?;
    let source = service.set_status(&id, status, req.message).await?;
    Ok(Json(source.redacted()))
}

async fn handle_reconnect(
    State(service): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ConnectionTestResult> {
    Ok(Json(service.reconnect(&id).await?))
}

// ============ Schemas ============

#[derive(Serialize)]
struct SchemaListResponse {
    schemas: Vec<Schema>,
}

async fn handle_schemas(
    State(service): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<SchemaListResponse> {
    let schemas = service.get_schemas(&id).await?;
    Ok(Json(SchemaListResponse { schemas }))
}

async fn handle_export_schema(
    State(service): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<SchemaExport> {
    Ok(Json(service.export_schema(&id).await?))
}

// ============ Queries ============

#[derive(Deserialize)]
struct QueryRequest {
    query: String,
}

async fn handle_query(
    State(service): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<QueryRequest>, JsonRejection>,
) -> ApiResult<QueryResult> {
    let Json(req) = body?;
    Ok(Json(service.execute_query(&id, &req.query).await?))
}

async fn handle_optimize(
    State(service): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<QueryRequest>, JsonRejection>,
) -> ApiResult<OptimizedQuery> {
    let Json(req) = body?;
    Ok(Json(service.optimize_query(&req.query, Some(&id)).await))
}

async fn handle_quality(
    State(service): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<QualityReport> {
    Ok(Json(service.analyze_quality(&id).await?))
}

#[derive(Deserialize)]
struct TestConnectionRequest {
    kind: String,
    #[serde(default)]
    credentials: ConnectionCredentials,
}

async fn handle_test_connection(
    State(service): State<AppState>,
    body: Result<Json<TestConnectionRequest>, JsonRejection>,
) -> ApiResult<ConnectionTestResult> {
    let Json(req) = body?;
    let kind: DataSourceKind = req.kind.parse()?;
    Ok(Json(service.test_connection(&req.credentials, kind).await))
}

#[derive(Serialize)]
struct SamplesResponse {
    kind: DataSourceKind,
    queries: Vec<&'static str>,
}

async fn handle_samples(
    State(service): State<AppState>,
    Path(kind): Path<String>,
) -> ApiResult<SamplesResponse> {
    let kind: DataSourceKind = kind.parse()?;
    Ok(Json(SamplesResponse {
        kind,
        queries: service.sample_queries(kind),
    }))
}

// ============ POST /ask ============

async fn handle_ask(
    State(service): State<AppState>,
    body: Result<Json<QueryRequest>, JsonRejection>,
) -> ApiResult<NlAnswer> {
    let Json(req) = body?;
    Ok(Json(service.ask(&req.query).await?))
}

// ============ Insights ============

#[derive(Serialize)]
struct InsightListResponse {
    insights: Vec<Insight>,
}

async fn handle_insights(State(service): State<AppState>) -> Json<InsightListResponse> {
    Json(InsightListResponse {
        insights: service.insights().to_vec(),
    })
}

async fn handle_dashboard(State(service): State<AppState>) -> ApiResult<DashboardSummary> {
    Ok(Json(service.dashboard().await?))
}
