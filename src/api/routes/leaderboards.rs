use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use crate::api::state::AppState;
use crate::api::{resolve_window, with_deadline, ApiError};
use crate::models::{Leaderboard, LeaderboardKind};

#[derive(Debug, Deserialize)]
pub struct LeaderboardParams {
    /// Named range such as `last_week`; ignored when `from`/`to` are given
    pub range: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub limit: Option<usize>,
}

pub async fn top_entities(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Query(params): Query<LeaderboardParams>,
) -> Result<Json<Leaderboard>, ApiError> {
    let kind: LeaderboardKind = kind.parse().map_err(ApiError::BadRequest)?;
    let window = resolve_window(
        params.range.as_deref(),
        params.from.as_deref(),
        params.to.as_deref(),
        Utc::now().date_naive(),
    )?;
    let limit = params.limit.unwrap_or(10);

    let board = with_deadline(
        state.report_timeout,
        state.engine.top_entities(kind, &window, limit),
    )
    .await?;
    Ok(Json(board))
}

#[cfg(test)]
mod tests {
    use crate::api::build_router;
    use crate::api::routes::test_support::{get_json, state_of};
    use crate::models::{ActivityRecord, RecordType};
    use axum::http::StatusCode;
    use chrono::{DateTime, TimeZone, Utc};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn ts(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, d, 12, 0, 0).unwrap()
    }

    fn bet(id: &str, entity: &str, game: &str, amount: Decimal) -> ActivityRecord {
        ActivityRecord::new(id, entity, RecordType::Bet, amount, ts(10)).with_game(game, game)
    }

    #[tokio::test]
    async fn test_top_games() {
        let app = build_router(state_of(vec![
            bet("1", "u1", "dice", dec!(10)),
            bet("2", "u2", "crash", dec!(40)),
            bet("3", "u3", "slots", dec!(25)),
        ]));
        let (status, json) = get_json(
            app,
            "/api/leaderboards/games?from=2025-03-10&to=2025-03-10&limit=2",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["kind"], "games");
        let entries = json["entries"].as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["entity_id"], "crash");
        assert_eq!(entries[0]["rank"], 1);
        assert_eq!(entries[1]["entity_id"], "slots");
    }

    #[tokio::test]
    async fn test_top_players() {
        let app = build_router(state_of(vec![
            bet("1", "u1", "dice", dec!(10)),
            bet("2", "u2", "dice", dec!(30)),
        ]));
        let (status, json) = get_json(
            app,
            "/api/leaderboards/players?from=2025-03-01&to=2025-03-31",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["kind"], "players");
        assert_eq!(json["entries"][0]["entity_id"], "u2");
        assert_eq!(json["entries"][0]["total_bets"], "30");
    }

    #[tokio::test]
    async fn test_leaderboard_bad_requests() {
        let app = build_router(state_of(Vec::new()));

        let (status, _) = get_json(app.clone(), "/api/leaderboards/providers").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = get_json(app.clone(), "/api/leaderboards/games?limit=0").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = get_json(app.clone(), "/api/leaderboards/games?range=forever").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, json) = get_json(app, "/api/leaderboards/games?range=last_week").await;
        assert_eq!(status, StatusCode::OK);
        assert!(json["entries"].as_array().unwrap().is_empty());
    }
}
