//! HTTP endpoint server using Axum

use axum::{
    extract::{Path, Query, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn, Level};

use crate::config::AppConfig;
use crate::core::bootstrap::{build_scheduler, connect_sources};
use crate::core::scheduler::{RefreshScheduler, RefreshSchedule, TriggerOutcome};
use crate::db::PriceDatabase;
use crate::metrics::Metrics;
use crate::models::indicators::{MacdCrossover, RsiSignal};
use crate::presentation::{render_html, Filter, SortKey, SortOrder, TableQuery};

#[derive(Clone)]
pub struct AppState {
    pub scheduler: Arc<RefreshScheduler>,
    pub metrics: Arc<Metrics>,
    pub start_time: Arc<Instant>,
    pub database: Option<Arc<PriceDatabase>>,
}

/// Error body is always `{"error": "..."}`
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadRequest(msg) => write!(f, "bad_request: {msg}"),
            Self::NotFound(msg) => write!(f, "not_found: {msg}"),
            Self::Conflict(msg) => write!(f, "conflict: {msg}"),
            Self::Internal(msg) => write!(f, "internal_error: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let uptime_seconds = state.start_time.elapsed().as_secs();
    let database_connected = match &state.database {
        Some(db) => {
            let up = db.is_connected().await;
            state.metrics.database_connected.set(if up { 1.0 } else { 0.0 });
            Some(up)
        }
        None => None,
    };
    let scheduler = state.scheduler.status();
    let snapshot = state.scheduler.snapshot();

    Json(json!({
        "status": "healthy",
        "uptime_seconds": uptime_seconds,
        "service": "stockwatch",
        "scheduler": scheduler,
        "snapshot": {
            "cycle": snapshot.cycle,
            "symbols": snapshot.results.len(),
            "errors": snapshot.error_count(),
            "generated_at": snapshot.generated_at,
        },
        "database_connected": database_connected,
    }))
}

pub async fn metrics_handler(State(state): State<AppState>) -> Result<String, ApiError> {
    state
        .metrics
        .export()
        .map_err(|e| ApiError::Internal(format!("failed to encode metrics: {}", e)))
}

/// Middleware to track HTTP request metrics
async fn metrics_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    state.metrics.http_requests_in_flight.inc();
    let response = next.run(request).await;
    let status = response.status();
    let duration = start.elapsed();
    state.metrics.http_requests_in_flight.dec();

    state.metrics.http_requests_total.inc();
    state
        .metrics
        .http_request_duration_seconds
        .observe(duration.as_secs_f64());

    if status.is_server_error() {
        tracing::error!(
            method = %method,
            path = %path,
            status = %status,
            duration_ms = duration.as_millis(),
            "HTTP request error"
        );
    }

    response
}

/// Query string shared by the JSON and HTML table views
#[derive(Debug, Default, Deserialize)]
pub struct TableParams {
    sort_by: Option<String>,
    sort_order: Option<String>,
    rsi: Option<String>,
    crossover: Option<String>,
}

fn parse_param<T: FromStr<Err = String>>(raw: Option<&str>) -> Result<Option<T>, ApiError> {
    match raw.map(str::trim) {
        None | Some("") | Some("all") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(ApiError::BadRequest),
    }
}

impl TableParams {
    pub fn to_query(&self) -> Result<TableQuery, ApiError> {
        let sort_key: Option<SortKey> = parse_param(self.sort_by.as_deref())?;
        let sort_order: Option<SortOrder> = parse_param(self.sort_order.as_deref())?;
        let filter = Filter {
            rsi: parse_param::<RsiSignal>(self.rsi.as_deref())?,
            crossover: parse_param::<MacdCrossover>(self.crossover.as_deref())?,
        };
        Ok(TableQuery::sorted_by(sort_key.unwrap_or_default(), sort_order.unwrap_or_default())
            .with_filter(filter))
    }
}

async fn list_stocks(
    State(state): State<AppState>,
    Query(params): Query<TableParams>,
) -> Result<Json<Value>, ApiError> {
    let query = params.to_query()?;
    let snapshot = state.scheduler.snapshot();
    let rows = query.apply(&snapshot.results);

    Ok(Json(json!({
        "stocks": rows,
        "timestamp": snapshot.generated_at,
        "cycle": snapshot.cycle,
        "state": state.scheduler.status().state,
    })))
}

async fn get_stock(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let symbol = state.scheduler.pipeline().format().qualify(&symbol);
    let snapshot = state.scheduler.snapshot();
    let row = snapshot
        .get(&symbol)
        .ok_or_else(|| ApiError::NotFound(format!("Stock {} not found", symbol)))?;
    Ok(Json(json!(row)))
}

async fn trigger_refresh(State(state): State<AppState>) -> Result<Response, ApiError> {
    match state.scheduler.request_refresh() {
        TriggerOutcome::Accepted => Ok((
            StatusCode::ACCEPTED,
            Json(json!({ "accepted": true, "outcome": TriggerOutcome::Accepted })),
        )
            .into_response()),
        TriggerOutcome::Dropped => Err(ApiError::Conflict(
            "a refresh is already in flight".to_string(),
        )),
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AutoRefreshRequest {
    pub enabled: bool,
}

async fn set_auto_refresh(
    State(state): State<AppState>,
    Json(request): Json<AutoRefreshRequest>,
) -> Json<Value> {
    state.scheduler.set_auto_refresh(request.enabled);
    Json(json!({ "auto_refresh": state.scheduler.auto_refresh() }))
}

async fn index(
    State(state): State<AppState>,
    Query(params): Query<TableParams>,
) -> Result<Html<String>, ApiError> {
    let query = params.to_query()?;
    let snapshot = state.scheduler.snapshot();
    let rows = query.apply(&snapshot.results);
    let refresh_seconds = match state.scheduler.schedule() {
        RefreshSchedule::Interval(interval) if state.scheduler.auto_refresh() => {
            Some(interval.as_secs().max(1))
        }
        _ => None,
    };
    let generated_at = snapshot.generated_at.format("%Y-%m-%d %H:%M:%S UTC").to_string();
    Ok(Html(render_html(
        &rows,
        state.scheduler.pipeline().format().suffix(),
        &generated_at,
        refresh_seconds,
    )))
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .route("/api/stocks", get(list_stocks))
        .route("/api/stock/{symbol}", get(get_stock))
        .route("/api/refresh", post(trigger_refresh))
        .route("/api/auto-refresh", post(set_auto_refresh))
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::DEBUG))
                        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                        .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
                )
                .layer(axum::middleware::from_fn_with_state(
                    state.clone(),
                    metrics_middleware,
                ))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Wire sources, start the scheduler and serve until the listener fails.
pub async fn start_server(config: AppConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let metrics = Arc::new(Metrics::new()?);
    let start_time = Arc::new(Instant::now());

    let sources = connect_sources(&config).await?;
    if let Some(db) = &sources.database {
        let up = db.is_connected().await;
        metrics.database_connected.set(if up { 1.0 } else { 0.0 });
        if !up {
            warn!("Price database not connected, cycles will retry");
        }
    }

    let scheduler = Arc::new(build_scheduler(&config, &sources, Some(metrics.clone()))?);
    scheduler.start().await;

    let state = AppState {
        scheduler: scheduler.clone(),
        metrics,
        start_time,
        database: sources.database.clone(),
    };
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;

    info!(port = config.port, "HTTP server listening on port {}", config.port);
    info!(
        "Metrics endpoint available at http://0.0.0.0:{}/metrics",
        config.port
    );
    let served = axum::serve(listener, app).await;
    scheduler.stop().await;
    served?;

    Ok(())
}
