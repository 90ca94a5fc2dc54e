//! `QuotaEngine` (spec §4.3): per-user, per-kind AI-operation quotas on
//! calendar-aligned reset windows.
//!
//! Grounded in the teacher's atomic-counter discipline
//! (`fraiseql-observers::dedup` never holds a lock across an async call);
//! here the equivalent invariant is that quota consumption never holds a
//! lock across the `KVStore` round trip — the backing store's own `INCRBY`
//! atomicity is what makes concurrent consumption safe, with a bounded
//! retry loop standing in for optimistic-concurrency compensation when an
//! increment overshoots the limit.

use std::sync::Arc;

use chrono_tz::Tz;
use fitforge_error::{CoreError, QuotaUsage};

use crate::clock::Clock;
use crate::collaborators::KVStore;
use crate::observability::ObservabilityHooks;

use super::kind::QuotaKind;

const MAX_CAS_RETRIES: u32 = 8;

/// What to do when the backing `KVStore` is unreachable during a consume
/// attempt (spec §4.3 open question, resolved in DESIGN.md).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendFailurePolicy {
    /// Let the operation proceed uncounted; a user may briefly exceed quota
    /// while the store is down, but a degraded cache never blocks product
    /// usage outright.
    Allow,
    /// Reject the operation; a user never exceeds quota but a degraded
    /// store makes the feature briefly unavailable.
    Deny,
}

#[derive(Debug, Clone)]
pub struct QuotaConfig {
    pub backend_failure_policy: BackendFailurePolicy,
    /// Timezone calendar windows are aligned to. Spec §4.3 doesn't say
    /// whether windows use UTC or the user's local zone; DESIGN.md records
    /// the decision to align to this single configured zone rather than a
    /// per-user one, since per-user timezone isn't part of any collaborator
    /// interface in scope.
    pub timezone: Tz,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            backend_failure_policy: BackendFailurePolicy::Allow,
            timezone: chrono_tz::UTC,
        }
    }
}

pub struct QuotaEngine {
    store: Arc<dyn KVStore>,
    clock: Arc<dyn Clock>,
    hooks: Arc<dyn ObservabilityHooks>,
    config: QuotaConfig,
}

impl QuotaEngine {
    #[must_use]
    pub fn new(
        store: Arc<dyn KVStore>,
        clock: Arc<dyn Clock>,
        hooks: Arc<dyn ObservabilityHooks>,
        config: QuotaConfig,
    ) -> Self {
        Self { store, clock, hooks, config }
    }

    fn key(kind: QuotaKind, user_id: &str, window_start: chrono::DateTime<chrono::Utc>) -> String {
        format!("quota:{}:{}:{}", kind.as_str(), user_id, window_start.timestamp())
    }

    /// Current usage for one quota kind, without consuming anything. Spec
    /// §4.3: `check` always returns a best-effort answer — a backend failure
    /// never blocks the caller, it just comes back marked `degraded`.
    pub async fn usage(&self, kind: QuotaKind, user_id: &str) -> QuotaUsage {
        let now = self.clock.now();
        let (window_start, window_end) = kind.window_containing(now, self.config.timezone);
        let key = Self::key(kind, user_id, window_start);

        match self.store.get(&key).await {
            Ok(Some(bytes)) => {
                let used = std::str::from_utf8(&bytes).ok().and_then(|s| s.parse::<u32>().ok()).unwrap_or(0);
                self.usage_snapshot(kind, used, window_start, window_end)
            }
            Ok(None) => self.usage_snapshot(kind, 0, window_start, window_end),
            Err(_) => {
                tracing::warn!(quota_kind = kind.as_str(), "quota store unreachable during check, reporting degraded");
                let mut usage = self.usage_snapshot(kind, 0, window_start, window_end);
                usage.degraded = true;
                usage
            }
        }
    }

    /// Usage for every quota kind.
    pub async fn all_usage(&self, user_id: &str) -> Vec<QuotaUsage> {
        let mut out = Vec::with_capacity(3);
        for kind in QuotaKind::all() {
            out.push(self.usage(kind, user_id).await);
        }
        out
    }

    /// Attempts to consume one unit of `kind` for `user_id`. Returns the
    /// resulting usage on success, or `CoreError::QuotaExceeded` with the
    /// usage snapshot at the moment of rejection.
    pub async fn consume(&self, kind: QuotaKind, user_id: &str) -> Result<QuotaUsage, CoreError> {
        let now = self.clock.now();
        let (window_start, window_end) = kind.window_containing(now, self.config.timezone);
        let key = Self::key(kind, user_id, window_start);
        let limit = kind.default_limit();

        for _ in 0..MAX_CAS_RETRIES {
            let incremented = match self.store.incr_by(&key, 1).await {
                Ok(value) => value,
                Err(_) => {
                    return match self.config.backend_failure_policy {
                        BackendFailurePolicy::Allow => {
                            Ok(self.usage_snapshot(kind, 0, window_start, window_end))
                        }
                        BackendFailurePolicy::Deny => {
                            Err(CoreError::CacheDegraded { message: "quota store unreachable".into() })
                        }
                    };
                }
            };

            if incremented == 1 {
                // first write in this window establishes the TTL; grace past
                // window_end so a clock skew between this node and the
                // KVStore never expires the counter before the window closes
                let window_ttl = (window_end - now + chrono::Duration::hours(1))
                    .to_std()
                    .unwrap_or(std::time::Duration::ZERO);
                let _ = self.store.expire(&key, window_ttl).await;
            }

            let used = u32::try_from(incremented).unwrap_or(u32::MAX);
            if used > limit {
                // compensate: roll back our own overshoot, don't just leave the counter inflated
                let _ = self.store.incr_by(&key, -1).await;
                let usage = self.usage_snapshot(kind, limit, window_start, window_end);
                self.hooks.quota_consumed(kind.as_str(), true);
                self.hooks.quota_exceeded(kind.as_str());
                return Err(CoreError::QuotaExceeded { usage });
            }

            self.hooks.quota_consumed(kind.as_str(), false);
            return Ok(self.usage_snapshot(kind, used, window_start, window_end));
        }

        Err(CoreError::CacheDegraded { message: "quota counter contention exceeded retry budget".into() })
    }

    /// Admin override: clears the current window's counter for `kind`.
    pub async fn reset(&self, kind: QuotaKind, user_id: &str) -> Result<(), CoreError> {
        let now = self.clock.now();
        let (window_start, _) = kind.window_containing(now, self.config.timezone);
        let key = Self::key(kind, user_id, window_start);
        self.store
            .del(&key)
            .await
            .map_err(|e| CoreError::CacheDegraded { message: e.to_string() })
    }

    fn usage_snapshot(
        &self,
        kind: QuotaKind,
        used: u32,
        window_start: chrono::DateTime<chrono::Utc>,
        window_end: chrono::DateTime<chrono::Utc>,
    ) -> QuotaUsage {
        let limit = kind.default_limit();
        QuotaUsage {
            kind: kind.as_str().to_string(),
            limit,
            used,
            remaining: limit.saturating_sub(used),
            period_start: window_start,
            period_end: window_end,
            resets_at: window_end,
            exceeded: used >= limit,
            degraded: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::observability::NoopHooks;
    use crate::testing::InMemoryKvStore;

    fn engine(now: chrono::DateTime<chrono::Utc>) -> QuotaEngine {
        QuotaEngine::new(
            Arc::new(InMemoryKvStore::new()),
            Arc::new(ManualClock::new(now)),
            Arc::new(NoopHooks),
            QuotaConfig::default(),
        )
    }

    #[tokio::test]
    async fn consume_up_to_limit_then_rejects() {
        let e = engine(chrono::Utc::now());
        for _ in 0..QuotaKind::PoseAnalysis.default_limit() {
            assert!(e.consume(QuotaKind::PoseAnalysis, "u1").await.is_ok());
        }
        let err = e.consume(QuotaKind::PoseAnalysis, "u1").await.unwrap_err();
        assert!(matches!(err, CoreError::QuotaExceeded { .. }));
    }

    #[tokio::test]
    async fn reset_clears_the_window() {
        let e = engine(chrono::Utc::now());
        e.consume(QuotaKind::AiRecipeGeneration, "u1").await.unwrap();
        e.reset(QuotaKind::AiRecipeGeneration, "u1").await.unwrap();
        let usage = e.usage(QuotaKind::AiRecipeGeneration, "u1").await;
        assert_eq!(usage.used, 0);
    }

    #[tokio::test]
    async fn separate_users_have_independent_quotas() {
        let e = engine(chrono::Utc::now());
        e.consume(QuotaKind::AiNutritionAdvice, "u1").await.unwrap();
        let usage = e.usage(QuotaKind::AiNutritionAdvice, "u2").await;
        assert_eq!(usage.used, 0);
    }

    #[tokio::test]
    async fn check_against_an_unreachable_store_reports_degraded_rather_than_erroring() {
        let store = Arc::new(InMemoryKvStore::new());
        store.fail_next_get();
        let e = QuotaEngine::new(store, Arc::new(ManualClock::new(chrono::Utc::now())), Arc::new(NoopHooks), QuotaConfig::default());

        let usage = e.usage(QuotaKind::PoseAnalysis, "u1").await;
        assert!(usage.degraded);
        assert!(!usage.exceeded);
    }
}
