//! HTTP surface of the analyzer: JSON text analysis, document upload, health and the optional
//! static frontend.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::{multipart::Multipart, rejection::JsonRejection, DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use report_analyzer_core::{
    extract_text, AnalysisReport, DocumentKind, ReportAnalyzer, MIN_TEXT_CHARS,
};
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, services::ServeDir};
use tracing::{error, info, warn};

use crate::config::ServerConfig;

const SERVICE_NAME: &str = "medical-report-analyzer";
const MAX_FILENAME_CHARS: usize = 100;

#[derive(Clone)]
struct AppState {
    analyzer: Arc<ReportAnalyzer>,
}

/// Build the application router around a shared analyzer.
pub fn router(analyzer: Arc<ReportAnalyzer>, config: &ServerConfig) -> Router {
    let mut app = Router::new()
        .route("/api/health", get(health))
        .route("/api/analyze", post(analyze_text))
        .route("/api/upload", post(upload_report));
    if let Some(dir) = &config.static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }
    app.layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(CorsLayer::permissive())
        .with_state(AppState { analyzer })
}

/// Bind `config.addr` and serve until Ctrl-C.
pub async fn serve(config: &ServerConfig, analyzer: Arc<ReportAnalyzer>) -> Result<()> {
    let models_loaded = analyzer.has_summarizer();
    let app = router(analyzer, config);
    let listener = tokio::net::TcpListener::bind(&config.addr)
        .await
        .with_context(|| format!("failed to bind TCP listener on {}", config.addr))?;
    info!(addr = %config.addr, models_loaded, "report analyzer listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server terminated unexpectedly")?;
    info!("server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    models_loaded: bool,
}

#[derive(Deserialize)]
struct AnalyzeRequest {
    text: String,
}

#[derive(Serialize)]
struct AnalyzeResponse {
    success: bool,
    analysis: AnalysisReport,
}

#[derive(Serialize)]
struct UploadResponse {
    success: bool,
    filename: String,
    analysis: AnalysisReport,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Error returned to HTTP clients as `{"error": message}`.
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: SERVICE_NAME,
        models_loaded: state.analyzer.has_summarizer(),
    })
}

async fn analyze_text(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let Ok(Json(request)) = payload else {
        return Err(ApiError::bad_request("No text provided"));
    };
    let analysis = state
        .analyzer
        .analyze(&request.text)
        .await
        .map_err(|err| ApiError::bad_request(err.to_string()))?;
    Ok(Json(AnalyzeResponse {
        success: true,
        analysis,
    }))
}

async fn upload_report(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(|err| ApiError {
        status: err.status(),
        message: err.body_text(),
    })? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(|err| ApiError {
            status: err.status(),
            message: err.body_text(),
        })?;
        upload = Some((filename, bytes));
    }

    let Some((original_name, bytes)) = upload else {
        return Err(ApiError::bad_request("No file provided"));
    };
    if original_name.is_empty() {
        return Err(ApiError::bad_request("No file selected"));
    }
    let Some(kind) = DocumentKind::from_filename(&original_name) else {
        return Err(ApiError::bad_request(
            "Invalid file type. Only PDF and TXT files are allowed",
        ));
    };
    let filename = sanitize_filename(&original_name);
    info!(%filename, ?kind, size = bytes.len(), "report uploaded");

    let text = tokio::task::spawn_blocking(move || extract_text(&bytes, kind))
        .await
        .map_err(|err| {
            error!(error = %err, "text extraction task failed");
            ApiError::internal(err.to_string())
        })?;
    if text.trim().chars().count() < MIN_TEXT_CHARS {
        warn!(%filename, "no meaningful text extracted");
        return Err(ApiError::bad_request(
            "Could not extract meaningful text from file",
        ));
    }

    let analysis = state
        .analyzer
        .analyze(&text)
        .await
        .map_err(|err| ApiError::bad_request(err.to_string()))?;
    Ok(Json(UploadResponse {
        success: true,
        filename,
        analysis,
    }))
}

/// Reduce a client-supplied filename to a safe basename.
fn sanitize_filename(name: &str) -> String {
    let mapped: String = name
        .chars()
        .filter(|&c| c != '/' && c != '\\' && c != '\0')
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let sanitized: String = mapped
        .replace("..", "")
        .chars()
        .take(MAX_FILENAME_CHARS)
        .collect();
    if sanitized.is_empty() {
        "document".to_string()
    } else {
        sanitized
    }
}
