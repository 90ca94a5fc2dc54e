pub mod health;
pub mod leaderboard;
pub mod quotas;

use axum::routing::{delete, get};
use axum::Router;

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::liveness))
        .route("/ready", get(health::readiness))
        .route("/quotas", get(quotas::list_quotas))
        .route("/quotas/{kind}", get(quotas::get_quota))
        .route("/quotas/{kind}", delete(quotas::reset_quota))
        .route("/leaderboard/{scope}", get(leaderboard::get_leaderboard))
        .with_state(state)
}
