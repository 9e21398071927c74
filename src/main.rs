mod config;
mod directory;
mod export;
mod http;
mod inventory;
mod metrics;
mod models;
mod submit;

use axum::{
    Json, Router,
    extract::{
        DefaultBodyLimit, Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::{HeaderMap, StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use config::{ConfigError, Settings};
use directory::SkuDirectories;
use export::{ExportError, JIOMART_FILE_NAME};
use inventory::{
    CsvError, FlipkartRecord, Marketplace, ParsedInventory, ShopifyRecord, ShopifyStore,
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use models::{ApiError, ExportRequest, SubmissionRequest, SubmissionResponse};
use reqwest::Client;
use serde_json::{Value, json};
use std::{
    collections::HashMap,
    net::SocketAddr,
    path::PathBuf,
    sync::Arc,
    time::Instant,
};
use submit::{FlipkartSubmitter, ShopifySubmitter, SubmissionReport};
use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};
use uuid::Uuid;

const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        error!(target = "inventory.api", "server crashed: {err:?}");
        std::process::exit(1);
    }
}

async fn run() -> eyre::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let directories = SkuDirectories::from_env().await?;
    if let Some(path) = file_to_parse(std::env::args().skip(1)) {
        let parsed = parse_file(&path, &directories).await?;
        println!("{}", serde_json::to_string_pretty(&parsed)?);
        return Ok(());
    }

    let settings = Settings::from_env();
    let http = http::build_client(http::HttpSettings::from_env());
    let prometheus_handle = PrometheusBuilder::new().install_recorder()?;
    let app = build_router(AppState::new(settings, directories, http, prometheus_handle));

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(8000);
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    info!(target = "inventory.api", "listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

/// `parse <file>` projects a CSV from disk instead of starting the server.
fn file_to_parse(mut args: impl Iterator<Item = String>) -> Option<PathBuf> {
    match (args.next().as_deref(), args.next()) {
        (Some("parse"), Some(path)) => Some(PathBuf::from(path)),
        _ => None,
    }
}

async fn parse_file(
    path: &std::path::Path,
    directories: &SkuDirectories,
) -> Result<ParsedInventory, CsvError> {
    let rows = inventory::read_file(path).await?;
    let parsed = inventory::project(&rows, directories);
    info!(
        target = "inventory.csv",
        file = %path.display(),
        rows = rows.len(),
        records = parsed.len(),
        "file projected"
    );
    Ok(parsed)
}

#[derive(Clone)]
struct AppState {
    settings: Arc<Settings>,
    directories: Arc<SkuDirectories>,
    http: Client,
    /// One lock per live marketplace; a held lock means a submission is
    /// in flight.
    gates: Arc<HashMap<Marketplace, Mutex<()>>>,
    openapi: Arc<Value>,
    prometheus_handle: PrometheusHandle,
}

impl AppState {
    fn new(
        settings: Settings,
        directories: SkuDirectories,
        http: Client,
        prometheus_handle: PrometheusHandle,
    ) -> Self {
        let openapi = serde_yaml::from_str(include_str!("../docs/openapi.yaml"))
            .unwrap_or_else(|_| json!({"openapi": "3.0.3"}));
        Self {
            settings: Arc::new(settings),
            directories: Arc::new(directories),
            http,
            gates: Arc::new(
                Marketplace::LIVE
                    .into_iter()
                    .map(|marketplace| (marketplace, Mutex::new(())))
                    .collect(),
            ),
            openapi: Arc::new(openapi),
            prometheus_handle,
        }
    }

    fn claim(&self, marketplace: Marketplace) -> Result<MutexGuard<'_, ()>, AppError> {
        self.gates
            .get(&marketplace)
            .and_then(|gate| gate.try_lock().ok())
            .ok_or(AppError::Busy(marketplace))
    }
}

fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_headers(Any)
        .allow_methods(Any)
        .allow_origin(Any);

    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics_endpoint))
        .route("/openapi.json", get(openapi_json))
        .route("/docs", get(swagger_ui))
        .route("/inventory/parse", post(parse_inventory))
        .route("/inventory/flipkart", post(submit_flipkart))
        .route("/inventory/shopify/{store}", post(submit_shopify))
        .route("/inventory/jiomart/export", post(export_jiomart))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(body_limit_from_env()))
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
    }))
}

async fn openapi_json(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    if let Ok(key) = std::env::var("OPENAPI_KEY") {
        let presented = headers
            .get("X-Docs-Key")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if presented != key {
            return Err(AppError::Unauthorized);
        }
    }
    Ok(Json((*state.openapi).clone()))
}

async fn swagger_ui() -> Html<&'static str> {
    Html(
        r#"<!doctype html>
<html>
<head>
  <meta charset='utf-8'/>
  <title>Inventory Sync API Docs</title>
  <link rel="stylesheet" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css" />
</head>
<body>
  <div id="swagger-ui"></div>
  <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
  <script>
    window.onload = () => {
      window.ui = SwaggerUIBundle({ url: '/openapi.json', dom_id: '#swagger-ui' });
    };
  </script>
</body>
</html>"#,
    )
}

fn body_limit_from_env() -> usize {
    std::env::var("REQUEST_MAX_BYTES")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(5 * 1024 * 1024)
}

async fn metrics_endpoint(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Ok(secret) = std::env::var("METRICS_KEY") {
        let presented = headers
            .get("X-Metrics-Key")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if presented != secret {
            return AppError::Unauthorized.into_response();
        }
    }
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.prometheus_handle.render(),
    )
        .into_response()
}

/// Splits an uploaded CSV into one record list per marketplace.
///
/// - Method: `POST`
/// - Path: `/inventory/parse`
/// - Body: raw CSV text
/// - Response: `ParsedInventory`
async fn parse_inventory(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<ParsedInventory>, AppError> {
    crate::metrics::inc_requests("/inventory/parse");
    let rows = inventory::parse_rows(&body)?;
    let parsed = inventory::project(&rows, &state.directories);
    info!(
        target = "inventory.csv",
        rows = rows.len(),
        flipkart = parsed.flipkart.len(),
        ptfs = parsed.shopify.len(),
        vitashop = parsed.vitashop.len(),
        naturtint = parsed.naturtint.len(),
        jiomart = parsed.jiomart.len(),
        "upload projected"
    );
    Ok(Json(parsed))
}

/// Pushes Flipkart quantities in batches.
///
/// - Method: `POST`
/// - Path: `/inventory/flipkart`
/// - Body: `{ inventory: FlipkartRecord[], updateMrp }`
/// - Response: `{ status, summary }`
async fn submit_flipkart(
    State(state): State<AppState>,
    payload: Result<Json<SubmissionRequest<FlipkartRecord>>, JsonRejection>,
) -> Result<Json<SubmissionResponse>, AppError> {
    crate::metrics::inc_requests("/inventory/flipkart");
    let Json(request) = payload?;
    let credentials = state.settings.flipkart.credentials()?;
    let _gate = state.claim(Marketplace::Flipkart)?;

    let submission_id = Uuid::new_v4();
    info!(
        target = "inventory.api",
        %submission_id,
        marketplace = "flipkart",
        records = request.inventory.len(),
        "submission started"
    );
    let started = Instant::now();
    let submitter =
        FlipkartSubmitter::new(state.http.clone(), credentials, state.settings.flipkart.delay);
    let report = submitter.submit(&request.inventory).await;
    Ok(Json(finish(submission_id, Marketplace::Flipkart, started, &report)))
}

/// Pushes quantities, and prices when `updateMrp` is set, to one Shopify
/// store (`ptfs`, `vitashop` or `naturtint`).
async fn submit_shopify(
    State(state): State<AppState>,
    store: Result<Path<ShopifyStore>, PathRejection>,
    payload: Result<Json<SubmissionRequest<ShopifyRecord>>, JsonRejection>,
) -> Result<Json<SubmissionResponse>, AppError> {
    crate::metrics::inc_requests("/inventory/shopify");
    let Path(store) = store?;
    let Json(request) = payload?;
    let settings = state.settings.shopify(store);
    let credentials = settings.credentials()?;
    let marketplace = Marketplace::from(store);
    let _gate = state.claim(marketplace)?;

    let submission_id = Uuid::new_v4();
    info!(
        target = "inventory.api",
        %submission_id,
        marketplace = store.name(),
        records = request.inventory.len(),
        update_mrp = request.update_mrp,
        "submission started"
    );
    let started = Instant::now();
    let submitter = ShopifySubmitter::new(
        state.http.clone(),
        store,
        credentials,
        state.directories.clone(),
        settings.delay,
    );
    let report = submitter.submit(&request.inventory, request.update_mrp).await;
    Ok(Json(finish(submission_id, marketplace, started, &report)))
}

/// Builds the JioMart bulk-upload workbook.
///
/// - Method: `POST`
/// - Path: `/inventory/jiomart/export`
/// - Body: `{ inventory: JiomartRecord[] }`
/// - Response: XLSX attachment
async fn export_jiomart(
    payload: Result<Json<ExportRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    crate::metrics::inc_requests("/inventory/jiomart/export");
    let Json(request) = payload?;
    let rows = export::format_jiomart(&request.inventory)?;
    let bytes = export::write_workbook(&rows)?;
    let disposition = format!("attachment; filename=\"{JIOMART_FILE_NAME}\"");
    Ok((
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE),
            (header::CONTENT_DISPOSITION, disposition.as_str()),
        ],
        bytes,
    )
        .into_response())
}

fn finish(
    submission_id: Uuid,
    marketplace: Marketplace,
    started: Instant,
    report: &SubmissionReport,
) -> SubmissionResponse {
    let elapsed_ms = started.elapsed().as_millis();
    crate::metrics::submission_finished(
        marketplace,
        report.sku_count(),
        report.failed(),
        elapsed_ms,
    );
    info!(
        target = "inventory.api",
        %submission_id,
        marketplace = marketplace.as_str(),
        records = report.len(),
        total = report.sku_count(),
        succeeded = report.succeeded(),
        failed = report.failed(),
        elapsed_ms = elapsed_ms as u64,
        "submission finished"
    );
    SubmissionResponse::new(
        submission_id,
        marketplace,
        report,
        u64::try_from(elapsed_ms).unwrap_or(u64::MAX),
    )
}

#[derive(Debug, Error)]
enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Csv(#[from] CsvError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error("{0}")]
    Body(String),
    #[error("a {} submission is already running", .0.as_str())]
    Busy(Marketplace),
    #[error("unauthorized")]
    Unauthorized,
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Body(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::Body(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind) = match &self {
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "configuration"),
            AppError::Csv(_) => (StatusCode::BAD_REQUEST, "csv"),
            AppError::Export(ExportError::NothingToExport) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "export")
            }
            AppError::Export(ExportError::Xlsx(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "export")
            }
            AppError::Body(_) => (StatusCode::BAD_REQUEST, "invalid_body"),
            AppError::Busy(_) => (StatusCode::CONFLICT, "busy"),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
        };
        if status.is_server_error() {
            error!(target = "inventory.api", error = %self, kind, "request failed");
        } else {
            warn!(target = "inventory.api", error = %self, kind, "request rejected");
        }
        let payload = ApiError {
            error: kind.to_string(),
            detail: Some(self.to_string()),
        };
        (status, Json(payload)).into_response()
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));
    let _ = fmt().with_env_filter(filter).try_init();
}
