use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::api::state::AppState;
use crate::api::{parse_allowlist, require_day, with_deadline, ApiError};
use crate::models::{DailyReport, DataTable, EnhancedDailyReport, MonthlyReport, WeeklyReport};

#[derive(Debug, Deserialize)]
pub struct DayParams {
    pub date: Option<String>,
}

pub async fn daily(
    State(state): State<AppState>,
    Query(params): Query<DayParams>,
) -> Result<Json<DailyReport>, ApiError> {
    let date = require_day("date", params.date.as_deref())?;
    let report = with_deadline(state.report_timeout, state.engine.daily(date)).await?;
    Ok(Json(report))
}

pub async fn enhanced_daily(
    State(state): State<AppState>,
    Query(params): Query<DayParams>,
) -> Result<Json<EnhancedDailyReport>, ApiError> {
    let date = require_day("date", params.date.as_deref())?;
    let report = with_deadline(state.report_timeout, state.engine.enhanced_daily(date)).await?;
    Ok(Json(report))
}

#[derive(Debug, Deserialize)]
pub struct WeeklyParams {
    pub week_start: Option<String>,
    /// Comma-separated entity ids
    pub entities: Option<String>,
}

pub async fn weekly(
    State(state): State<AppState>,
    Query(params): Query<WeeklyParams>,
) -> Result<Json<WeeklyReport>, ApiError> {
    let week_start = require_day("week_start", params.week_start.as_deref())?;
    let allowlist = parse_allowlist(params.entities.as_deref());
    let report = with_deadline(
        state.report_timeout,
        state.engine.weekly(week_start, allowlist.as_ref()),
    )
    .await?;
    Ok(Json(report))
}

#[derive(Debug, Deserialize)]
pub struct MonthlyParams {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

pub async fn monthly(
    State(state): State<AppState>,
    Query(params): Query<MonthlyParams>,
) -> Result<Json<MonthlyReport>, ApiError> {
    let (Some(year), Some(month)) = (params.year, params.month) else {
        return Err(ApiError::BadRequest(
            "Both 'year' and 'month' are required".to_string(),
        ));
    };
    let report = with_deadline(state.report_timeout, state.engine.monthly(year, month)).await?;
    Ok(Json(report))
}

#[derive(Debug, Deserialize)]
pub struct TableParams {
    pub from: Option<String>,
    pub to: Option<String>,
    pub entities: Option<String>,
}

pub async fn data_table(
    State(state): State<AppState>,
    Query(params): Query<TableParams>,
) -> Result<Json<DataTable>, ApiError> {
    let from = require_day("from", params.from.as_deref())?;
    let to = require_day("to", params.to.as_deref())?;
    let allowlist = parse_allowlist(params.entities.as_deref());
    let table = with_deadline(
        state.report_timeout,
        state.engine.data_table(from, to, allowlist.as_ref()),
    )
    .await?;
    Ok(Json(table))
}
