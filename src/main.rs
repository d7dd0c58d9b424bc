//! Bulk property import service.
//!
//! Thin HTTP surface over the import pipeline: upload a spreadsheet export
//! for validation, review the partition, then post the reviewed records
//! back for the actual import.

mod config;
mod image_resolver;
mod importer;
mod normalizer;
mod property;
mod sheet_parser;
mod store;
mod validator;

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use config::ImporterConfig;
use image_resolver::ImageResolver;
use property::{FailedImport, ParsedProperty, RowErrors};
use std::sync::Arc;
use store::{MemoryStore, PropertyStore};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    store: Arc<dyn PropertyStore>,
    resolver: Arc<ImageResolver>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "listing_importer=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ImporterConfig::from_env();
    info!(
        "Media dir: {:?}, served at {}",
        config.media_dir(),
        config.media_prefix
    );

    let resolver = ImageResolver::new(
        config.media_dir(),
        config.media_prefix.clone(),
        config.http_timeout,
    )?;

    let state = AppState {
        store: Arc::new(MemoryStore::new()),
        resolver: Arc::new(resolver),
    };

    // Build router
    let app = Router::new()
        .route("/health", get(health))
        .route("/api/import/validate", post(validate_upload))
        .route("/api/import", post(run_import))
        .layer(DefaultBodyLimit::max(25 * 1024 * 1024)) // 25MB
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("Server listening on http://{}", config.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

#[derive(serde::Serialize)]
struct ValidateResponse {
    total: usize,
    valid: Vec<ParsedProperty>,
    errors: Vec<RowErrors>,
}

/// Upload a spreadsheet export and get back the validation partition for
/// operator review. An undecodable file is the one fatal, batch-level error.
async fn validate_upload(
    mut multipart: Multipart,
) -> Result<Json<ValidateResponse>, (StatusCode, String)> {
    let mut filename = String::new();
    let mut file_data = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("Multipart error: {}", e)))?
    {
        if field.name() == Some("file") {
            filename = field.file_name().unwrap_or("listings.csv").to_string();
            file_data = field
                .bytes()
                .await
                .map_err(|e| (StatusCode::BAD_REQUEST, format!("Failed to read file: {}", e)))?
                .to_vec();
            break;
        }
    }

    if file_data.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "No file uploaded".to_string()));
    }

    info!("Received file: {} ({} bytes)", filename, file_data.len());

    let rows = sheet_parser::parse_rows(&filename, &file_data)
        .map_err(|e| (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))?;

    let parsed = normalizer::normalize_rows(&rows, &filename);
    let outcome = validator::validate_properties(parsed);

    info!(
        "Validated {}: {} importable, {} errored",
        filename,
        outcome.valid.len(),
        outcome.errors.len()
    );

    Ok(Json(ValidateResponse {
        total: outcome.valid.len() + outcome.errors.len(),
        valid: outcome.valid,
        errors: outcome.errors,
    }))
}

#[derive(serde::Deserialize)]
struct ImportRequest {
    properties: Vec<ParsedProperty>,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct ImportSummary {
    total: usize,
    success: usize,
    failed: usize,
    success_ids: Vec<String>,
    errors: Vec<FailedImport>,
}

#[derive(serde::Serialize)]
struct ImportResponse {
    message: String,
    results: ImportSummary,
}

/// Import a reviewed batch. Always answers with the full accounting;
/// per-record failures are in the body, never an HTTP error.
async fn run_import(
    State(state): State<AppState>,
    Json(request): Json<ImportRequest>,
) -> Json<ImportResponse> {
    let result =
        importer::import_properties(state.store.as_ref(), &state.resolver, request.properties)
            .await;

    let message = format!(
        "Imported {} of {} properties",
        result.success.len(),
        result.total
    );

    Json(ImportResponse {
        message,
        results: ImportSummary {
            total: result.total,
            success: result.success.len(),
            failed: result.failed.len(),
            success_ids: result.success,
            errors: result.failed,
        },
    })
}
