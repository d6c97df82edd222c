//! REST API endpoints.
//!
//! Axum-based HTTP API serving daily, weekly, monthly and tabular reports,
//! leaderboards and per-entity transaction listings.

pub mod routes;
pub mod state;

use std::future::Future;
use std::time::Duration;

use axum::{
    http::{HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::error;

use crate::models::{EntityAllowlist, TimeWindow, WindowError};
use crate::parse_day;
use crate::report::ReportError;
use state::AppState;

/// API error types.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Report timed out after {0:?}")]
    Timeout(Duration),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ReportError> for ApiError {
    fn from(e: ReportError) -> Self {
        match e {
            ReportError::InvalidWindow(_) | ReportError::InvalidRequest(_) => {
                ApiError::BadRequest(e.to_string())
            }
            ReportError::Store(inner) => {
                error!(error = %inner, "Report failed");
                ApiError::Internal(inner.to_string())
            }
        }
    }
}

impl From<WindowError> for ApiError {
    fn from(e: WindowError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "TIMEOUT"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Pagination parameters.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 50,
        }
    }
}

impl Pagination {
    pub fn new(page: Option<u32>, page_size: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            page_size: page_size.unwrap_or(50).clamp(1, 100),
        }
    }

    /// Items to skip. Saturates for pages past any real result set.
    pub fn offset(&self) -> usize {
        (self.page as usize - 1).saturating_mul(self.page_size as usize)
    }
}

/// Pagination metadata in responses.
#[derive(Debug, Serialize)]
pub struct PaginationMeta {
    pub page: u32,
    pub page_size: u32,
    pub total_items: usize,
    pub total_pages: usize,
    pub has_next: bool,
    pub has_prev: bool,
}

impl PaginationMeta {
    pub fn new(pagination: &Pagination, total_items: usize) -> Self {
        let total_pages = total_items.div_ceil(pagination.page_size as usize);
        Self {
            page: pagination.page,
            page_size: pagination.page_size,
            total_items,
            total_pages,
            has_next: (pagination.page as usize) < total_pages,
            has_prev: pagination.page > 1,
        }
    }
}

// ── Request helpers ─────────────────────────────────────────────

/// Run a report future under the configured deadline.
pub async fn with_deadline<T, F>(limit: Duration, fut: F) -> Result<T, ApiError>
where
    F: Future<Output = Result<T, ReportError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result.map_err(ApiError::from),
        Err(_) => Err(ApiError::Timeout(limit)),
    }
}

/// Parse a required `YYYY-MM-DD` query parameter.
pub fn require_day(name: &str, value: Option<&str>) -> Result<NaiveDate, ApiError> {
    let raw = value.ok_or_else(|| ApiError::BadRequest(format!("Missing '{}' parameter", name)))?;
    parse_day(raw).ok_or_else(|| {
        ApiError::BadRequest(format!(
            "Invalid '{}' date (expected YYYY-MM-DD): {}",
            name, raw
        ))
    })
}

/// Comma-separated entity ids; empty means no restriction.
pub fn parse_allowlist(value: Option<&str>) -> Option<EntityAllowlist> {
    let ids: EntityAllowlist = value?
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    (!ids.is_empty()).then_some(ids)
}

/// An explicit `from`/`to` pair wins over a named range. With neither,
/// the last 30 days are used.
pub fn resolve_window(
    range: Option<&str>,
    from: Option<&str>,
    to: Option<&str>,
    today: NaiveDate,
) -> Result<TimeWindow, ApiError> {
    match (from, to) {
        (Some(_), Some(_)) => {
            let first = require_day("from", from)?;
            let last = require_day("to", to)?;
            Ok(TimeWindow::days_between(first, last)?)
        }
        (None, None) => Ok(TimeWindow::predefined(
            range.unwrap_or("last_30_days"),
            today,
        )?),
        _ => Err(ApiError::BadRequest(
            "'from' and 'to' must be given together".to_string(),
        )),
    }
}

fn cors_layer(origin: &str) -> CorsLayer {
    match origin.parse::<HeaderValue>() {
        Ok(value) if origin != "*" => CorsLayer::new()
            .allow_origin(value)
            .allow_methods([Method::GET]),
        _ => CorsLayer::permissive(),
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.cors_origin);

    Router::new()
        .route("/health", get(routes::health))
        .route("/api/reports/daily", get(routes::reports::daily))
        .route(
            "/api/reports/daily/enhanced",
            get(routes::reports::enhanced_daily),
        )
        .route("/api/reports/weekly", get(routes::reports::weekly))
        .route("/api/reports/monthly", get(routes::reports::monthly))
        .route("/api/reports/table", get(routes::reports::data_table))
        .route(
            "/api/leaderboards/:kind",
            get(routes::leaderboards::top_entities),
        )
        .route(
            "/api/entities/:entity_id/transactions",
            get(routes::transactions::entity_transactions),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
