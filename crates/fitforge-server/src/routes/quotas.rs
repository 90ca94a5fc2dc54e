//! Quota endpoints: `GET /quotas`, `GET /quotas/{kind}`,
//! `DELETE /quotas/{kind}` (SPEC_FULL.md §5 admin reset route).

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use fitforge_core::quota::QuotaKind;
use fitforge_error::http::ErrorEnvelope;

use crate::state::AppState;

fn parse_kind(raw: &str) -> Option<QuotaKind> {
    QuotaKind::all().into_iter().find(|kind| kind.as_str() == raw)
}

/// Identifies the caller from the `X-User-Id` header. A production
/// deployment would replace this with whatever auth middleware the rest of
/// the stack uses (out of scope per spec §1/§6); this crate only needs
/// *some* user identity to key quota and cache lookups by.
fn user_id(headers: &HeaderMap) -> Result<String, (StatusCode, Json<ErrorEnvelope>)> {
    headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .ok_or_else(|| {
            (
                StatusCode::UNAUTHORIZED,
                Json(ErrorEnvelope::new("UNAUTHENTICATED", "missing X-User-Id header")),
            )
        })
}

pub async fn list_quotas(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let user_id = match user_id(&headers) {
        Ok(id) => id,
        Err(response) => return response.into_response(),
    };

    Json(state.quota.all_usage(&user_id).await).into_response()
}

pub async fn get_quota(State(state): State<AppState>, headers: HeaderMap, Path(kind): Path<String>) -> impl IntoResponse {
    let user_id = match user_id(&headers) {
        Ok(id) => id,
        Err(response) => return response.into_response(),
    };

    let Some(kind) = parse_kind(&kind) else {
        return (StatusCode::NOT_FOUND, Json(ErrorEnvelope::new("NOT_FOUND", "unknown quota kind"))).into_response();
    };

    Json(state.quota.usage(kind, &user_id).await).into_response()
}

/// Admin-only override: clears the caller's current window for `kind`.
/// Authorization is assumed to be enforced by upstream middleware, same as
/// the user-identity header above.
pub async fn reset_quota(State(state): State<AppState>, headers: HeaderMap, Path(kind): Path<String>) -> impl IntoResponse {
    let user_id = match user_id(&headers) {
        Ok(id) => id,
        Err(response) => return response.into_response(),
    };

    let Some(kind) = parse_kind(&kind) else {
        return (StatusCode::NOT_FOUND, Json(ErrorEnvelope::new("NOT_FOUND", "unknown quota kind"))).into_response();
    };

    match state.quota.reset(kind, &user_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error.into_response(),
    }
}
