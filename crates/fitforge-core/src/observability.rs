//! `ObservabilityHooks` (spec §4.7): counters, timers, and structured log
//! fields emitted by every component.
//!
//! Grounded in the teacher's split between a no-op recorder and a
//! metrics-backed one (`fraiseql-observers::metrics`): a default
//! implementation is free, and a real exporter is opt-in via the `metrics`
//! feature so this crate never forces a Prometheus dependency on callers who
//! don't need it.

use std::time::Duration;

/// Outcome of a cache access, used as the `hit` label on `cache.access`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    Hit,
    Miss,
    Degraded,
}

impl CacheOutcome {
    #[must_use]
    pub const fn as_label(self) -> &'static str {
        match self {
            Self::Hit => "true",
            Self::Miss => "false",
            Self::Degraded => "degraded",
        }
    }
}

/// Source an `Artifact` was produced from (spec §3 `Artifact.source`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactSource {
    Cache,
    Model,
    Fallback,
    External,
}

impl ArtifactSource {
    #[must_use]
    pub const fn as_label(self) -> &'static str {
        match self {
            Self::Cache => "cache",
            Self::Model => "model",
            Self::Fallback => "fallback",
            Self::External => "external",
        }
    }
}

/// Every counter/timer/log field named in spec §4.7, as trait methods so a
/// component never has to know whether metrics export is compiled in.
pub trait ObservabilityHooks: Send + Sync {
    fn cache_access(&self, namespace: &str, outcome: CacheOutcome);

    fn cache_op_duration(&self, namespace: &str, op: &str, duration: Duration);

    fn quota_consumed(&self, kind: &str, exceeded: bool);

    fn quota_exceeded(&self, kind: &str);

    fn operation_completed(&self, kind: &str, source: ArtifactSource, outcome: &str);

    fn operation_duration(&self, kind: &str, source: ArtifactSource, duration: Duration);

    fn model_call_duration(&self, kind: &str, duration: Duration);
}

/// No-op recorder; the default when no exporter is wired up.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHooks;

impl ObservabilityHooks for NoopHooks {
    fn cache_access(&self, _namespace: &str, _outcome: CacheOutcome) {}
    fn cache_op_duration(&self, _namespace: &str, _op: &str, _duration: Duration) {}
    fn quota_consumed(&self, _kind: &str, _exceeded: bool) {}
    fn quota_exceeded(&self, _kind: &str) {}
    fn operation_completed(&self, _kind: &str, _source: ArtifactSource, _outcome: &str) {}
    fn operation_duration(&self, _kind: &str, _source: ArtifactSource, _duration: Duration) {}
    fn model_call_duration(&self, _kind: &str, _duration: Duration) {}
}

/// `tracing`-backed recorder: every hook becomes a structured `tracing::info!`
/// event, tagged so a metrics exporter can scrape it (teacher pattern:
/// `fraiseql-server::metrics` reads its counters off tracing spans). When the
/// `metrics` feature is enabled, the same call also feeds the `metrics` crate
/// macros so a Prometheus exporter can be attached at the composition root.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingHooks;

impl ObservabilityHooks for TracingHooks {
    fn cache_access(&self, namespace: &str, outcome: CacheOutcome) {
        tracing::info!(
            counter = "cache.access",
            namespace,
            hit = outcome.as_label(),
            "cache access"
        );
        #[cfg(feature = "metrics")]
        metrics::counter!("cache_access_total", "namespace" => namespace.to_string(), "hit" => outcome.as_label())
            .increment(1);
    }

    fn cache_op_duration(&self, namespace: &str, op: &str, duration: Duration) {
        tracing::debug!(
            timer = "cache.op.duration",
            namespace,
            op,
            micros = duration.as_micros() as u64,
            "cache op duration"
        );
        #[cfg(feature = "metrics")]
        metrics::histogram!("cache_op_duration_seconds", "namespace" => namespace.to_string(), "op" => op.to_string())
            .record(duration.as_secs_f64());
    }

    fn quota_consumed(&self, kind: &str, exceeded: bool) {
        tracing::info!(counter = "quota.consumed", quota_kind = kind, exceeded, "quota consumed");
        #[cfg(feature = "metrics")]
        metrics::counter!("quota_consumed_total", "kind" => kind.to_string(), "exceeded" => exceeded.to_string())
            .increment(1);
    }

    fn quota_exceeded(&self, kind: &str) {
        tracing::warn!(counter = "quota.exceeded", quota_kind = kind, "quota exceeded");
        #[cfg(feature = "metrics")]
        metrics::counter!("quota_exceeded_total", "kind" => kind.to_string()).increment(1);
    }

    fn operation_completed(&self, kind: &str, source: ArtifactSource, outcome: &str) {
        tracing::info!(
            counter = "operation.completed",
            operation_kind = kind,
            source = source.as_label(),
            outcome,
            "operation completed"
        );
        #[cfg(feature = "metrics")]
        metrics::counter!("operation_completed_total", "kind" => kind.to_string(), "source" => source.as_label(), "outcome" => outcome.to_string())
            .increment(1);
    }

    fn operation_duration(&self, kind: &str, source: ArtifactSource, duration: Duration) {
        tracing::debug!(
            timer = "operation.duration",
            operation_kind = kind,
            source = source.as_label(),
            millis = duration.as_millis() as u64,
            "operation duration"
        );
        #[cfg(feature = "metrics")]
        metrics::histogram!("operation_duration_seconds", "kind" => kind.to_string(), "source" => source.as_label())
            .record(duration.as_secs_f64());
    }

    fn model_call_duration(&self, kind: &str, duration: Duration) {
        tracing::debug!(
            timer = "model.call.duration",
            operation_kind = kind,
            millis = duration.as_millis() as u64,
            "model call duration"
        );
        #[cfg(feature = "metrics")]
        metrics::histogram!("model_call_duration_seconds", "kind" => kind.to_string())
            .record(duration.as_secs_f64());
    }
}
