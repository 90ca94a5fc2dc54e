//! `IntoResponse` mapping for [`CoreError`] (spec §6.5 / §7).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::CoreError;

/// Error envelope shape required by spec §6.5.
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorEnvelope {
    /// Builds an envelope for request-layer failures (auth, routing) that
    /// never reach `CoreError` — it owns the HTTP surface, not the
    /// orchestration taxonomy.
    #[must_use]
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self { code, message: message.into(), details: None }
    }
}

impl IntoResponse for CoreError {
    fn into_response(self) -> Response {
        let code = self.code();

        let status = match &self {
            Self::QuotaExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::ModelUnavailable { .. } | Self::UpstreamUnavailable { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::ModelMalformed { .. } => StatusCode::BAD_GATEWAY,
            Self::PersistenceFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            // CACHE_DEGRADED never reaches a client (spec §7 propagation policy);
            // mapped defensively in case a caller mishandles it.
            Self::CacheDegraded { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
            Self::ValidationFailed { .. } => StatusCode::BAD_REQUEST,
        };

        let details = match &self {
            Self::QuotaExceeded { usage } => serde_json::to_value(usage).ok(),
            _ => None,
        };

        let body = ErrorEnvelope {
            code,
            message: self.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}
