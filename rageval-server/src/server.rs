use std::{net::SocketAddr, str::FromStr, sync::Arc};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    response::{Html, IntoResponse},
    routing::{get, post},
};
use rageval_rag::{ModelSelection, RagComparison, SourceDocument};
use serde_json::{Map, Value, json};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{debug, info};

use crate::{
    error::{ApiError, MISSING_FILES, MISSING_QUERY},
    extract::extract_document_blocking,
};

const DEFAULT_UPLOAD_LIMIT: usize = 50 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub comparison: Arc<RagComparison>,
    pub upload_limit: usize,
}

impl AppState {
    pub fn new(comparison: RagComparison) -> Self {
        Self { comparison: Arc::new(comparison), upload_limit: DEFAULT_UPLOAD_LIMIT }
    }

    pub fn with_upload_limit(mut self, bytes: usize) -> Self {
        self.upload_limit = bytes;
        self
    }
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9000,
            max_upload_bytes: DEFAULT_UPLOAD_LIMIT,
        }
    }
}

impl ServerConfig {
    /// Defaults overlaid with `RAGEVAL_HOST`, `RAGEVAL_PORT` and `RAGEVAL_MAX_UPLOAD_MB`.
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = Self::default();
        if let Ok(host) = std::env::var("RAGEVAL_HOST") {
            config.host = host;
        }
        if let Ok(port) = std::env::var("RAGEVAL_PORT") {
            config.port = port.parse().with_context(|| format!("invalid RAGEVAL_PORT '{port}'"))?;
        }
        if let Ok(mb) = std::env::var("RAGEVAL_MAX_UPLOAD_MB") {
            let mb: usize =
                mb.parse().with_context(|| format!("invalid RAGEVAL_MAX_UPLOAD_MB '{mb}'"))?;
            config.max_upload_bytes = mb * 1024 * 1024;
        }
        Ok(config)
    }
}

pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let body_limit = DefaultBodyLimit::max(state.upload_limit);

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/{model}", post(compare))
        .with_state(state)
        .layer(body_limit)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

pub async fn run_server(config: ServerConfig, state: AppState) -> anyhow::Result<()> {
    let app = app_router(state.with_upload_limit(config.max_upload_bytes));
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| "invalid host/port for rageval-server")?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("rageval-server listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn index() -> impl IntoResponse {
    Html(include_str!("../ui/index.html"))
}

async fn health() -> impl IntoResponse {
    Json(json!({"status":"ok","service":"rageval-server"}))
}

/// Form fields of one comparison request.
#[derive(Debug, Default)]
struct Upload {
    documents: Vec<SourceDocument>,
    query: Option<String>,
}

async fn read_upload(mut multipart: Multipart) -> Result<Upload, ApiError> {
    let mut upload = Upload::default();
    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some("files") => {
                let name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await?;
                if bytes.is_empty() {
                    debug!(file = %name, "ignoring empty upload");
                    continue;
                }
                upload.documents.push(extract_document_blocking(name, content_type, bytes).await?);
            }
            Some("query") => upload.query = Some(field.text().await?),
            other => debug!(field = ?other, "ignoring unknown form field"),
        }
    }
    Ok(upload)
}

/// `POST /api/{model}`: index the uploads and answer the query with the selected strategies.
async fn compare(
    Path(model): Path<String>,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<Map<String, Value>>, ApiError> {
    let selection =
        ModelSelection::from_str(&model).map_err(|_| ApiError::UnknownModel(model))?;
    let upload = read_upload(multipart).await?;

    if upload.documents.is_empty() {
        return Err(ApiError::BadRequest(MISSING_FILES.to_string()));
    }
    let query = match upload.query {
        Some(query) if !query.trim().is_empty() => query,
        _ => return Err(ApiError::BadRequest(MISSING_QUERY.to_string())),
    };
    if upload.documents.iter().all(|doc| doc.text.trim().is_empty()) {
        return Err(ApiError::BadRequest("no text could be extracted from the uploads".into()));
    }

    info!(
        model = selection.wire_name(),
        files = upload.documents.len(),
        "comparison requested"
    );
    let report = state.comparison.run(&upload.documents, query.trim(), selection).await?;
    Ok(Json(report.response_body(selection)))
}
