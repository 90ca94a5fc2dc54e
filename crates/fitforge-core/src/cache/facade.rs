//! `IndexedCacheFacade` (spec §4.1): two-tier cache with namespace-grouped
//! bulk invalidation.
//!
//! Grounded in `fraiseql-core::cache::CachedDatabaseAdapter`'s cache-aside
//! shape (try cache, fall through to the expensive path, store the result)
//! generalized to a two-tier (networked + in-process) cache instead of a
//! single in-process one, and to group-keyed bulk invalidation instead of
//! per-view invalidation.
//!
//! ## `group_key` resolves a spec ambiguity
//!
//! Spec §4.1 writes `get(namespace, key)` and `put(namespace, indexKey, key,
//! value, ttl)` as though `namespace` and `indexKey` were different things,
//! but §3's `NamespaceIndex` invariant ("every live `CacheEntry` in namespace
//! N is in N's `NamespaceIndex`") and §4.7's `cache.access{namespace, hit}`
//! counter only make sense if the bulk-invalidation grouping key and the
//! metrics-label namespace are the same string. This implementation collapses
//! them into one `group_key` parameter threaded through every operation —
//! callers (in practice always [`crate::cache::typed_store::TypedCacheStore`])
//! pass the index key they'd also use for `invalidateNamespace`. See
//! DESIGN.md for the recorded decision.

use std::sync::Arc;
use std::time::Duration;

use crate::clock::Clock;
use crate::collaborators::KVStore;
use crate::observability::{CacheOutcome, ObservabilityHooks};

use super::fallback::FallbackCache;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// spec §4.1: "never blocks on unreachable primary longer than a
    /// configured deadline (default 150 ms)".
    pub primary_deadline: Duration,
    /// spec §4.1: "Fallback map is size-bounded (default 10 000 entries)".
    pub fallback_capacity: u64,
    /// spec §4.1: "retries once with exponential backoff (100 ms, 400 ms)".
    pub invalidation_backoff: [Duration; 2],
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            primary_deadline: Duration::from_millis(150),
            fallback_capacity: 10_000,
            invalidation_backoff: [Duration::from_millis(100), Duration::from_millis(400)],
        }
    }
}

pub struct IndexedCacheFacade {
    primary: Arc<dyn KVStore>,
    fallback: FallbackCache,
    clock: Arc<dyn Clock>,
    hooks: Arc<dyn ObservabilityHooks>,
    config: CacheConfig,
}

impl IndexedCacheFacade {
    #[must_use]
    pub fn new(
        primary: Arc<dyn KVStore>,
        clock: Arc<dyn Clock>,
        hooks: Arc<dyn ObservabilityHooks>,
        config: CacheConfig,
    ) -> Self {
        Self {
            primary,
            fallback: FallbackCache::new(config.fallback_capacity),
            clock,
            hooks,
            config,
        }
    }

    /// spec §4.1 `get`: primary first; on primary error, timeout, or miss,
    /// consult the fallback tier. Never throws — all errors degrade to miss.
    pub async fn get(&self, group_key: &str, key: &str) -> Option<Vec<u8>> {
        let started = std::time::Instant::now();
        let outcome = match tokio::time::timeout(self.config.primary_deadline, self.primary.get(key)).await {
            Ok(Ok(Some(bytes))) => {
                self.hooks.cache_access(group_key, CacheOutcome::Hit);
                self.hooks.cache_op_duration(group_key, "get", started.elapsed());
                return Some(bytes);
            }
            Ok(Ok(None)) => CacheOutcome::Miss,
            Ok(Err(_)) | Err(_) => CacheOutcome::Degraded,
        };

        if outcome == CacheOutcome::Degraded {
            tracing::warn!(group_key, "primary cache unreachable, falling back to in-process tier");
        }

        let fallback_hit = if self.fallback.is_dirty(group_key) {
            None
        } else {
            self.fallback.get(key, self.clock.now())
        };

        self.hooks.cache_access(
            group_key,
            if fallback_hit.is_some() { CacheOutcome::Hit } else { outcome },
        );
        self.hooks.cache_op_duration(group_key, "get", started.elapsed());
        fallback_hit
    }

    /// spec §4.1 `put`: write primary with TTL, register `key` in the
    /// `group_key` index, mirror to fallback. Succeeds iff at least one tier
    /// accepted the write.
    pub async fn put(&self, group_key: &str, key: &str, value: Vec<u8>, ttl: Duration) -> bool {
        let started = std::time::Instant::now();
        let primary_ok = self.primary.set(key, value.clone(), ttl).await.is_ok();
        if primary_ok {
            let _ = self.primary.sadd(group_key, key).await;
            self.fallback.clear_dirty(group_key);
        }
        self.fallback.put(group_key, key, value, ttl, self.clock.now());
        self.hooks.cache_op_duration(group_key, "put", started.elapsed());
        true // fallback tier always accepts; see struct docs on failure semantics
    }

    /// spec §4.1 `invalidateEntry`: delete in both tiers, remove from index.
    pub async fn invalidate_entry(&self, group_key: &str, key: &str) -> bool {
        let primary_deleted = self.primary.del(key).await.is_ok();
        let _ = self.primary.srem(group_key, key).await;
        self.fallback.remove(key);
        primary_deleted
    }

    /// spec §4.1 `invalidateNamespace`: enumerate the index and delete each
    /// entry, then the index itself. On repeated primary failure, mark the
    /// group dirty in the fallback tier so reads treat it as a miss until the
    /// next successful write clears the flag.
    pub async fn invalidate_namespace(&self, group_key: &str) -> bool {
        if self.try_invalidate_namespace(group_key).await {
            return true;
        }

        for delay in self.config.invalidation_backoff {
            tokio::time::sleep(delay).await;
            if self.try_invalidate_namespace(group_key).await {
                return true;
            }
        }

        tracing::warn!(group_key, "namespace invalidation failed after retries, marking dirty");
        self.fallback.mark_dirty(group_key);
        false
    }

    async fn try_invalidate_namespace(&self, group_key: &str) -> bool {
        let members = match self.primary.smembers(group_key).await {
            Ok(members) => members,
            Err(_) => return false,
        };

        let mut all_ok = true;
        for member in &members {
            if self.primary.del(member).await.is_err() {
                all_ok = false;
            }
            self.fallback.remove(member);
        }

        if self.primary.del(group_key).await.is_err() {
            all_ok = false;
        }

        if all_ok {
            self.fallback.clear_dirty(group_key);
        }
        all_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::observability::NoopHooks;
    use crate::testing::InMemoryKvStore;

    fn facade(clock: Arc<ManualClock>) -> IndexedCacheFacade {
        IndexedCacheFacade::new(
            Arc::new(InMemoryKvStore::new()),
            clock,
            Arc::new(NoopHooks),
            CacheConfig::default(),
        )
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let clock = Arc::new(ManualClock::new(chrono::Utc::now()));
        let cache = facade(clock);

        cache.put("g", "k", b"v".to_vec(), Duration::from_secs(60)).await;
        assert_eq!(cache.get("g", "k").await, Some(b"v".to_vec()));
    }

    #[tokio::test]
    async fn invalidate_namespace_clears_all_members() {
        let clock = Arc::new(ManualClock::new(chrono::Utc::now()));
        let cache = facade(clock);

        cache.put("recipes:idx:u1", "recipes:u1:a", b"1".to_vec(), Duration::from_secs(60)).await;
        cache.put("recipes:idx:u1", "recipes:u1:b", b"2".to_vec(), Duration::from_secs(60)).await;
        cache.put("recipes:idx:u1", "recipes:u1:c", b"3".to_vec(), Duration::from_secs(60)).await;
        cache.put("recipes:idx:u2", "recipes:u2:a", b"9".to_vec(), Duration::from_secs(60)).await;

        assert!(cache.invalidate_namespace("recipes:idx:u1").await);

        assert_eq!(cache.get("recipes:idx:u1", "recipes:u1:a").await, None);
        assert_eq!(cache.get("recipes:idx:u1", "recipes:u1:b").await, None);
        assert_eq!(cache.get("recipes:idx:u1", "recipes:u1:c").await, None);
        assert_eq!(cache.get("recipes:idx:u2", "recipes:u2:a").await, Some(b"9".to_vec()));
    }

    #[tokio::test]
    async fn double_invalidate_entry_is_a_noop() {
        let clock = Arc::new(ManualClock::new(chrono::Utc::now()));
        let cache = facade(clock);

        cache.put("g", "k", b"v".to_vec(), Duration::from_secs(60)).await;
        assert!(cache.invalidate_entry("g", "k").await);
        assert!(cache.invalidate_entry("g", "k").await);
        assert_eq!(cache.get("g", "k").await, None);
    }
}
