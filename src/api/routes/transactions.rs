use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::api::state::AppState;
use crate::api::{resolve_window, with_deadline, ApiError, Pagination, PaginationMeta};
use crate::models::{ActivityRecord, RecordStatus, RecordType};
use crate::report::TransactionQuery;

#[derive(Debug, Deserialize)]
pub struct TransactionParams {
    #[serde(rename = "type")]
    pub record_type: Option<String>,
    pub status: Option<String>,
    pub game_id: Option<String>,
    pub range: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct TransactionsResponse {
    pub entity_id: String,
    pub transactions: Vec<ActivityRecord>,
    pub pagination: PaginationMeta,
}

pub async fn entity_transactions(
    State(state): State<AppState>,
    Path(entity_id): Path<String>,
    Query(params): Query<TransactionParams>,
) -> Result<Json<TransactionsResponse>, ApiError> {
    let record_type = params
        .record_type
        .as_deref()
        .map(str::parse::<RecordType>)
        .transpose()
        .map_err(ApiError::BadRequest)?;
    let status = params
        .status
        .as_deref()
        .map(str::parse::<RecordStatus>)
        .transpose()
        .map_err(ApiError::BadRequest)?;
    let window = resolve_window(
        params.range.as_deref(),
        params.from.as_deref(),
        params.to.as_deref(),
        Utc::now().date_naive(),
    )?;
    let pagination = Pagination::new(params.page, params.page_size);

    let query = TransactionQuery {
        window,
        record_type,
        status,
        game_id: params.game_id.filter(|g| !g.is_empty()),
        offset: pagination.offset(),
        limit: pagination.page_size as usize,
    };

    let page = with_deadline(
        state.report_timeout,
        state.engine.entity_transactions(&entity_id, &query),
    )
    .await?;

    Ok(Json(TransactionsResponse {
        entity_id,
        transactions: page.transactions,
        pagination: PaginationMeta::new(&pagination, page.total),
    }))
}
