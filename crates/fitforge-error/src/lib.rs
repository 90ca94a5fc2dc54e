//! Shared error taxonomy for the FitForge orchestration core.
//!
//! Every operation-layer failure surfaces as a [`CoreError`] variant. This
//! crate owns the taxonomy and its HTTP mapping so that `fitforge-core` and
//! `fitforge-server` agree on exactly one set of error codes.

pub mod config;
pub mod http;

pub use config::ConfigError;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// Usage snapshot for a quota kind, echoed back on `QUOTA_EXCEEDED`.
///
/// Kept here (rather than in `fitforge-core`) because the error envelope
/// embeds it directly — see §6.2 / §7 of the orchestration spec.
#[derive(Debug, Clone, Serialize)]
pub struct QuotaUsage {
    #[serde(rename = "type")]
    pub kind: String,
    pub limit: u32,
    pub used: u32,
    pub remaining: u32,
    #[serde(rename = "periodStart")]
    pub period_start: DateTime<Utc>,
    #[serde(rename = "periodEnd")]
    pub period_end: DateTime<Utc>,
    #[serde(rename = "resetsAt")]
    pub resets_at: DateTime<Utc>,
    pub exceeded: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub degraded: bool,
}

/// The full error taxonomy (spec §7).
///
/// `CACHE_DEGRADED` deliberately has no HTTP mapping path that reaches a
/// client — it is recorded and swallowed at the orchestration layer, never
/// constructed by a handler directly returning a response body.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    #[error("quota exceeded")]
    QuotaExceeded { usage: QuotaUsage },

    #[error("chat model unavailable: {message}")]
    ModelUnavailable { message: String },

    #[error("chat model returned unparseable output: {message}")]
    ModelMalformed { message: String },

    #[error("upstream catalog unavailable: {message}")]
    UpstreamUnavailable { message: String },

    #[error("persistence failed: {message}")]
    PersistenceFailed { message: String },

    #[error("cache degraded: {message}")]
    CacheDegraded { message: String },

    #[error("operation deadline exceeded")]
    DeadlineExceeded,

    #[error("validation failed: {message}")]
    ValidationFailed { message: String },
}

impl CoreError {
    /// Stable taxonomy code, used both in the JSON envelope and in logs.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::QuotaExceeded { .. } => "QUOTA_EXCEEDED",
            Self::ModelUnavailable { .. } => "MODEL_UNAVAILABLE",
            Self::ModelMalformed { .. } => "MODEL_MALFORMED",
            Self::UpstreamUnavailable { .. } => "UPSTREAM_UNAVAILABLE",
            Self::PersistenceFailed { .. } => "PERSISTENCE_FAILED",
            Self::CacheDegraded { .. } => "CACHE_DEGRADED",
            Self::DeadlineExceeded => "DEADLINE_EXCEEDED",
            Self::ValidationFailed { .. } => "VALIDATION_FAILED",
        }
    }

    /// Whether this failure is eligible for a configured fallback producer
    /// (spec §4.5 stage 8, §7 propagation policy).
    #[must_use]
    pub fn allows_fallback(&self) -> bool {
        matches!(
            self,
            Self::ModelUnavailable { .. } | Self::ModelMalformed { .. } | Self::UpstreamUnavailable { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
