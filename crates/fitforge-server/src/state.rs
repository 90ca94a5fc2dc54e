//! Composition root: wires the `fitforge-core` building blocks against real
//! collaborators and holds the `axum` handlers' shared [`AppState`].

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use fitforge_core::cache::{CacheConfig, IndexedCacheFacade};
use fitforge_core::clock::{Clock, SystemClock};
use fitforge_core::collaborators::{ChatModel, ExternalCatalog, KVStore, PersistenceStore};
use fitforge_core::leaderboard::LeaderboardSnapshotStore;
use fitforge_core::observability::{ObservabilityHooks, TracingHooks};
use fitforge_core::orchestration::Artifact;
use fitforge_core::quota::{QuotaConfig, QuotaEngine};

use crate::config::RuntimeConfig;
use crate::redis_store::RedisKvStore;
use crate::shutdown::ShutdownHandler;

/// Everything an HTTP handler needs, cloned cheaply (every field is an
/// `Arc`) into each request's `State<AppState>` extractor.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<IndexedCacheFacade>,
    pub quota: Arc<QuotaEngine>,
    pub leaderboard: Arc<LeaderboardSnapshotStore>,
    pub persistence: Arc<dyn PersistenceStore>,
    pub chat_model: Arc<dyn ChatModel>,
    pub catalog: Arc<dyn ExternalCatalog>,
    pub clock: Arc<dyn Clock>,
    pub hooks: Arc<dyn ObservabilityHooks>,
    pub shutdown: ShutdownHandler,
}

impl AppState {
    /// Builds production state against a real Redis connection. The
    /// `PersistenceStore`/`ChatModel`/`ExternalCatalog` collaborators are
    /// injected rather than constructed here — per spec §1/§6 their
    /// concrete implementations (Postgres, a vendor LLM client, a
    /// recipe/video API client) are out of this crate's scope.
    pub async fn connect(
        config: &RuntimeConfig,
        persistence: Arc<dyn PersistenceStore>,
        chat_model: Arc<dyn ChatModel>,
        catalog: Arc<dyn ExternalCatalog>,
    ) -> anyhow::Result<Self> {
        let kv: Arc<dyn KVStore> = Arc::new(RedisKvStore::connect(&config.redis.url).await?);
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let hooks: Arc<dyn ObservabilityHooks> = Arc::new(TracingHooks);

        let cache_config = CacheConfig {
            primary_deadline: Duration::from_millis(config.cache.primary_deadline_ms),
            fallback_capacity: config.cache.fallback_capacity,
            ..CacheConfig::default()
        };
        let cache = Arc::new(IndexedCacheFacade::new(kv.clone(), clock.clone(), hooks.clone(), cache_config));

        let timezone = chrono_tz::Tz::from_str(&config.quotas.timezone)
            .map_err(|_| anyhow::anyhow!("invalid quotas.timezone: {}", config.quotas.timezone))?;
        let quota_config = QuotaConfig { backend_failure_policy: config.quotas.backend_failure_policy.into(), timezone };
        let quota = Arc::new(QuotaEngine::new(kv, clock.clone(), hooks.clone(), quota_config));

        let leaderboard = Arc::new(LeaderboardSnapshotStore::new(clock.clone(), hooks.clone()));

        Ok(Self {
            cache,
            quota,
            leaderboard,
            persistence,
            chat_model,
            catalog,
            clock,
            hooks,
            shutdown: ShutdownHandler::new(),
        })
    }

    /// One [`fitforge_core::cache::TypedCacheStore`] per artifact feature,
    /// built fresh for each orchestrated operation call site rather than
    /// stored on `AppState` — the generic type parameter is fixed to
    /// [`Artifact`] so one alias covers every feature.
    #[must_use]
    pub fn typed_cache(&self, feature: &str) -> Arc<fitforge_core::cache::TypedCacheStore<Artifact>> {
        Arc::new(fitforge_core::cache::TypedCacheStore::new(self.cache.clone(), feature.to_string()))
    }
}
