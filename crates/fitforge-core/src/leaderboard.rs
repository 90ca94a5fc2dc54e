//! `LeaderboardSnapshotStore` (spec §4.6): periodically recomputed,
//! dense-ranked leaderboard snapshots.
//!
//! Combines the same two building blocks as
//! [`crate::orchestration::pipeline::OrchestratedOperation`] — a cache-aside
//! read path and single-flight-coalesced recomputation — but without a
//! quota stage, since recompute is triggered by freshness expiry rather than
//! per-user request volume.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use fitforge_error::CoreError;
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::observability::ObservabilityHooks;
use crate::singleflight::SingleFlightCoordinator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaderboardScope {
    Daily,
    Weekly,
}

impl LeaderboardScope {
    /// spec §4.6: daily snapshots are considered fresh for 5 minutes, weekly
    /// for 15 — a weekly ranking moves slowly enough that a coarser
    /// freshness window doesn't feel stale to users.
    #[must_use]
    pub const fn freshness(self) -> Duration {
        match self {
            Self::Daily => Duration::from_secs(5 * 60),
            Self::Weekly => Duration::from_secs(15 * 60),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
        }
    }
}

/// spec §3 `LeaderboardSnapshot.entries` row: `{ user_id, display_name,
/// score, streak, position }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub user_id: String,
    pub display_name: String,
    pub score: f64,
    pub streak: u32,
    pub position: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardSnapshot {
    pub scope: LeaderboardScope,
    pub generated_at: DateTime<Utc>,
    pub entries: Vec<LeaderboardEntry>,
}

/// Assigns dense positions (ties share a position; the next distinct score
/// takes `position + 1`, never skipping the way standard competition ranking
/// does) to `(user_id, display_name, score, streak, streak_start_epoch_day)`
/// rows.
///
/// Sort order is score descending, then streak start ascending (the user
/// who has held their current streak longer is listed first among equal
/// scores), then user id ascending so the ordering is fully deterministic.
/// Only `score` participates in position assignment — the tie-break fields
/// only decide display order within a shared position.
#[must_use]
pub fn dense_rank(mut scores: Vec<(String, String, f64, u32, i64)>) -> Vec<LeaderboardEntry> {
    scores.sort_by(|a, b| {
        b.2.partial_cmp(&a.2)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.4.cmp(&b.4))
            .then_with(|| a.0.cmp(&b.0))
    });

    let mut entries = Vec::with_capacity(scores.len());
    let mut position = 0u32;
    let mut previous_score: Option<f64> = None;

    for (user_id, display_name, score, streak, _streak_start) in scores {
        if previous_score != Some(score) {
            position += 1;
            previous_score = Some(score);
        }
        entries.push(LeaderboardEntry { user_id, display_name, score, streak, position });
    }

    entries
}

pub struct LeaderboardSnapshotStore {
    snapshots: tokio::sync::Mutex<std::collections::HashMap<LeaderboardScope, LeaderboardSnapshot>>,
    singleflight: Arc<SingleFlightCoordinator<LeaderboardSnapshot, CoreError>>,
    clock: Arc<dyn Clock>,
    hooks: Arc<dyn ObservabilityHooks>,
}

impl LeaderboardSnapshotStore {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, hooks: Arc<dyn ObservabilityHooks>) -> Self {
        Self {
            snapshots: tokio::sync::Mutex::new(std::collections::HashMap::new()),
            singleflight: Arc::new(SingleFlightCoordinator::default()),
            clock,
            hooks,
        }
    }

    /// Returns the cached snapshot for `scope` if still within its freshness
    /// window; otherwise recomputes it via `producer`, coalescing concurrent
    /// callers through single-flight so a freshness-expiry storm triggers
    /// exactly one recomputation.
    pub async fn get_or_recompute<F, Fut>(
        &self,
        scope: LeaderboardScope,
        producer: F,
    ) -> Result<LeaderboardSnapshot, CoreError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<Vec<(String, String, f64, u32, i64)>, CoreError>>,
    {
        let now = self.clock.now();
        if let Some(snapshot) = self.snapshots.lock().await.get(&scope) {
            if now.signed_duration_since(snapshot.generated_at).to_std().unwrap_or(Duration::MAX) < scope.freshness()
            {
                return Ok(snapshot.clone());
            }
        }

        let key = format!("leaderboard:{}", scope.as_str());
        let (outcome, _was_leader) = self
            .singleflight
            .execute(&key, move || async move {
                let scores = producer().await?;
                Ok(LeaderboardSnapshot { scope, generated_at: now, entries: dense_rank(scores) })
            })
            .await;

        let snapshot = match outcome {
            Ok(result) => (*result).clone()?,
            Err(_) => return Err(CoreError::DeadlineExceeded),
        };

        self.snapshots.lock().await.insert(scope, snapshot.clone());
        self.hooks.operation_completed("leaderboard_recompute", crate::observability::ArtifactSource::Model, "ok");
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::observability::NoopHooks;

    #[test]
    fn dense_rank_gives_ties_the_same_position_without_skipping() {
        let entries = dense_rank(vec![
            ("a".into(), "Alice".into(), 100.0, 3, 10),
            ("b".into(), "Bob".into(), 100.0, 7, 5),
            ("c".into(), "Cara".into(), 90.0, 1, 0),
            ("d".into(), "Dana".into(), 80.0, 0, 0),
        ]);

        let positions: Vec<u32> = entries.iter().map(|e| e.position).collect();
        assert_eq!(positions, vec![1, 1, 2, 3]);

        let ids: Vec<&str> = entries.iter().map(|e| e.user_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c", "d"], "tied scores break by streak_start ascending");
    }

    #[tokio::test]
    async fn recompute_is_skipped_while_snapshot_is_fresh() {
        let clock = Arc::new(ManualClock::new(chrono::Utc::now()));
        let store = LeaderboardSnapshotStore::new(clock.clone(), Arc::new(NoopHooks));
        let calls = Arc::new(std::sync::atomic::AtomicU32::new(0));

        for _ in 0..3 {
            let calls = calls.clone();
            store
                .get_or_recompute(LeaderboardScope::Daily, move || async move {
                    calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                    Ok(vec![("u1".into(), "User One".into(), 10.0, 2, 0)])
                })
                .await
                .unwrap();
        }

        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn recompute_runs_again_after_freshness_window_expires() {
        let clock = Arc::new(ManualClock::new(chrono::Utc::now()));
        let store = LeaderboardSnapshotStore::new(clock.clone(), Arc::new(NoopHooks));

        store
            .get_or_recompute(LeaderboardScope::Daily, || async { Ok(vec![("u1".into(), "User One".into(), 10.0, 2, 0)]) })
            .await
            .unwrap();

        clock.advance(chrono::Duration::minutes(6));

        let calls = Arc::new(std::sync::atomic::AtomicU32::new(0));
        let calls2 = calls.clone();
        store
            .get_or_recompute(LeaderboardScope::Daily, move || async move {
                calls2.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                Ok(vec![("u1".into(), "User One".into(), 20.0, 3, 0)])
            })
            .await
            .unwrap();

        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
