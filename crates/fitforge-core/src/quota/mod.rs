//! Per-user AI-operation quota engine (spec §4.3).

pub mod engine;
pub mod kind;

pub use engine::{BackendFailurePolicy, QuotaConfig, QuotaEngine};
pub use kind::{QuotaKind, ResetCadence};
