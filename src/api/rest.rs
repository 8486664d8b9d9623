// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// All endpoints live under `/api/v1/` and are public: the dashboard is a
// read-only view over a third-party price feed.
//
// Failed analyses answer with `{ "error": ..., "hint": ... }` and are also
// appended to the recent error log served by `/api/v1/errors`.
//
// CORS is configured permissively so any local frontend can call the API.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Json, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::analysis::{self, AnalysisReport, AnalysisRequest};
use crate::app_state::AppState;
use crate::error::{AnalysisError, MarketDataError};
use crate::types::Period;

// =============================================================================
// Router construction
// =============================================================================

/// Build the full REST API router with CORS, request tracing and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/periods", get(periods))
        .route("/api/v1/popular", get(popular))
        .route("/api/v1/analyze", get(analyze_ticker))
        .route("/api/v1/errors", get(recent_errors))
        // ── Middleware & State ───────────────────────────────────────
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Error responses
// =============================================================================

/// A failed analysis rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub AnalysisError);

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            AnalysisError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AnalysisError::MarketData(MarketDataError::Empty { .. }) => StatusCode::NOT_FOUND,
            AnalysisError::MarketData(MarketDataError::MalformedRow { .. }) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AnalysisError::MarketData(MarketDataError::Provider(_)) => StatusCode::BAD_GATEWAY,
        }
    }

    fn code(&self) -> &'static str {
        match &self.0 {
            AnalysisError::InvalidRequest(_) => "invalid_request",
            AnalysisError::MarketData(MarketDataError::Empty { .. }) => "empty_result",
            AnalysisError::MarketData(MarketDataError::MalformedRow { .. }) => "malformed_row",
            AnalysisError::MarketData(MarketDataError::Provider(_)) => "provider_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.0.to_string(),
            "code": self.code(),
            "hint": self.0.hint(),
        });
        (self.status(), Json(body)).into_response()
    }
}

// =============================================================================
// Health
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    analyses_served: u64,
    server_time: i64,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: state.uptime_secs(),
        analyses_served: state.analyses_served(),
        server_time: chrono::Utc::now().timestamp_millis(),
    })
}

// =============================================================================
// Sidebar data
// =============================================================================

async fn periods(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "periods": Period::ALL,
        "default": state.config.default_period,
    }))
}

async fn popular(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.config.popular_stocks.clone())
}

// =============================================================================
// Analysis
// =============================================================================

#[derive(Debug, Deserialize)]
struct AnalyzeQuery {
    #[serde(default)]
    ticker: Option<String>,
    #[serde(default)]
    period: Option<String>,
}

async fn analyze_ticker(
    State(state): State<Arc<AppState>>,
    query: Result<Query<AnalyzeQuery>, QueryRejection>,
) -> Result<Json<AnalysisReport>, ApiError> {
    // A malformed query string goes through the same error body and log.
    let query = query
        .map(|Query(query)| query)
        .map_err(|rejection| AnalysisError::InvalidRequest(rejection.body_text()));
    let ticker = query
        .as_ref()
        .ok()
        .and_then(|q| q.ticker.clone())
        .unwrap_or_default();

    match run_analysis(&state, query).await {
        Ok(report) => {
            let served = state.record_analysis();
            info!(
                ticker = %report.ticker,
                period = %report.period,
                bars = report.bar_count,
                served,
                "report served"
            );
            Ok(Json(report))
        }
        Err(e) => {
            let err = ApiError(e);
            warn!(
                ticker = %ticker,
                code = err.code(),
                error = %err.0,
                "analysis failed"
            );
            state.push_error(err.0.to_string(), Some(err.code().to_string()));
            Err(err)
        }
    }
}

async fn run_analysis(
    state: &AppState,
    query: Result<AnalyzeQuery, AnalysisError>,
) -> Result<AnalysisReport, AnalysisError> {
    let query = query?;
    let request = AnalysisRequest::parse(
        query.ticker.as_deref(),
        query.period.as_deref(),
        state.config.default_period,
    )?;
    analysis::analyze(state.source.as_ref(), &request, &state.config.indicators).await
}

// =============================================================================
// Error log
// =============================================================================

async fn recent_errors(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.recent_errors())
}
