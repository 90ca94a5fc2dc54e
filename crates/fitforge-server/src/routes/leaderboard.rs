//! `GET /leaderboard/{scope}` (SPEC_FULL.md §5 surfaced leaderboard route).

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use fitforge_core::leaderboard::LeaderboardScope;
use fitforge_error::http::ErrorEnvelope;

use crate::state::AppState;

fn parse_scope(raw: &str) -> Option<LeaderboardScope> {
    match raw {
        "daily" => Some(LeaderboardScope::Daily),
        "weekly" => Some(LeaderboardScope::Weekly),
        _ => None,
    }
}

pub async fn get_leaderboard(State(state): State<AppState>, Path(scope): Path<String>) -> impl IntoResponse {
    let Some(scope) = parse_scope(&scope) else {
        return (StatusCode::NOT_FOUND, Json(ErrorEnvelope::new("NOT_FOUND", "unknown leaderboard scope")))
            .into_response();
    };

    let persistence = state.persistence.clone();
    let result = state
        .leaderboard
        .get_or_recompute(scope, move || async move {
            persistence
                .leaderboard_scores(scope)
                .await
                .map_err(|e| fitforge_error::CoreError::PersistenceFailed { message: e.to_string() })
        })
        .await;

    match result {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(error) => error.into_response(),
    }
}
