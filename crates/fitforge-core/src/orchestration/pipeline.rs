//! `OrchestratedOperation` (spec §4.5): the cache-aside pipeline every
//! AI-backed feature (recipe generation, nutrition advice, pose analysis,
//! recipe search) runs through.
//!
//! Stages: fingerprint the request, check the typed cache, check quota
//! (without consuming), coalesce concurrent identical calls through
//! single-flight, invoke the feature's [`OperationProducer`] (a `ChatModel`
//! or `ExternalCatalog` hook — stage 5 leader only), consume quota only
//! after a valid artifact comes back, persist and cache it, and — on a
//! failure eligible per [`fitforge_error::CoreError::allows_fallback`] and a
//! configured fallback producer — synthesize a degraded `source=fallback`
//! artifact instead of failing the request outright.
//!
//! Grounded in `fraiseql-core::cache::adapter::CachedDatabaseAdapter`'s
//! cache-aside shape (try cache, else run the expensive path and store its
//! result), generalized with the quota and single-flight stages this
//! system's AI operations additionally need.

use std::sync::Arc;
use std::time::Duration;

use fitforge_error::CoreError;
use uuid::Uuid;

use crate::clock::Clock;
use crate::collaborators::PersistenceStore;
use crate::observability::{ArtifactSource, ObservabilityHooks};
use crate::quota::{QuotaEngine, QuotaKind};
use crate::singleflight::SingleFlightCoordinator;
use crate::cache::TypedCacheStore;

use super::artifact::Artifact;
use super::fingerprint::OperationFingerprint;
use super::producer::OperationProducer;

pub use CoreError as OrchestrationError;

/// A deterministic, synchronous template artifact synthesized when stage 5
/// fails and no real result can be produced (spec §4.5 stage 8).
pub type FallbackProducer = dyn Fn() -> serde_json::Value + Send + Sync;

/// One request into an [`OrchestratedOperation`].
pub struct OrchestrationRequest<'a> {
    pub user_id: String,
    pub operation_kind: String,
    pub quota_kind: QuotaKind,
    /// Fields that participate in the fingerprint, e.g. `[("diet", "vegan"),
    /// ("meals", "3")]`. Order doesn't matter; see [`OperationFingerprint`].
    pub inputs: Vec<(&'a str, &'a str)>,
    /// spec §4.5 stage 1: folded into the fingerprint so a profile edit
    /// naturally misses the cache.
    pub profile_revision: &'a str,
    /// Stage 5 hook: what to call to produce the artifact payload. A
    /// `ChatModelProducer` for the generation/advice/analysis features, a
    /// `CatalogProducer` for search.
    pub producer: Arc<dyn OperationProducer>,
    /// Stage 8 hook: synthesizes a degraded artifact when `producer` fails
    /// with a fallback-eligible error. `None` means such failures surface as
    /// errors instead.
    pub fallback_producer: Option<Arc<FallbackProducer>>,
    pub ttl: Duration,
}

pub struct OrchestratedOperation {
    cache: Arc<TypedCacheStore<Artifact>>,
    quota: Arc<QuotaEngine>,
    singleflight: Arc<SingleFlightCoordinator<Artifact, CoreError>>,
    persistence: Arc<dyn PersistenceStore>,
    clock: Arc<dyn Clock>,
    hooks: Arc<dyn ObservabilityHooks>,
}

impl OrchestratedOperation {
    #[must_use]
    pub fn new(
        cache: Arc<TypedCacheStore<Artifact>>,
        quota: Arc<QuotaEngine>,
        singleflight: Arc<SingleFlightCoordinator<Artifact, CoreError>>,
        persistence: Arc<dyn PersistenceStore>,
        clock: Arc<dyn Clock>,
        hooks: Arc<dyn ObservabilityHooks>,
    ) -> Self {
        Self { cache, quota, singleflight, persistence, clock, hooks }
    }

    pub async fn execute(&self, request: OrchestrationRequest<'_>) -> Result<Artifact, CoreError> {
        let started = std::time::Instant::now();
        let fingerprint = OperationFingerprint::compute(
            &request.user_id,
            &request.operation_kind,
            request.profile_revision,
            &request.inputs,
        );

        // stage 2: a cached fallback artifact does not short-circuit —
        // every subsequent call retries the real producer until one succeeds
        if let Some(artifact) = self.cache.get(&request.user_id, &[&fingerprint]).await {
            if artifact.source != ArtifactSource::Fallback {
                self.hooks.operation_completed(&request.operation_kind, ArtifactSource::Cache, "hit");
                self.hooks.operation_duration(&request.operation_kind, ArtifactSource::Cache, started.elapsed());
                return Ok(artifact);
            }
        }

        // stage 3: check only, never consumes — exceeding quota rejects
        // before the model is ever called
        let usage = self.quota.usage(request.quota_kind, &request.user_id).await;
        if usage.exceeded {
            return Err(CoreError::QuotaExceeded { usage });
        }

        match self.run_coalesced(&request, &fingerprint).await {
            Ok(artifact) => {
                self.hooks.operation_completed(&request.operation_kind, artifact.source, "ok");
                self.hooks.operation_duration(&request.operation_kind, artifact.source, started.elapsed());
                Ok(artifact)
            }
            Err(error) if error.allows_fallback() => {
                let Some(fallback_producer) = &request.fallback_producer else {
                    tracing::warn!(
                        operation_kind = %request.operation_kind,
                        error = %error,
                        "orchestrated operation degraded, no fallback producer configured"
                    );
                    return Err(error);
                };

                tracing::warn!(
                    operation_kind = %request.operation_kind,
                    error = %error,
                    "orchestrated operation degraded, emitting fallback artifact"
                );
                let artifact = self.emit_fallback(&request, &fingerprint, fallback_producer.as_ref()).await?;
                self.hooks.operation_completed(&request.operation_kind, artifact.source, "fallback");
                self.hooks.operation_duration(&request.operation_kind, artifact.source, started.elapsed());
                Ok(artifact)
            }
            Err(error) => Err(error),
        }
    }

    /// Stage 4-7: single-flight coalesced model invocation, quota consume
    /// (only after a valid artifact exists), persist, and cache.
    async fn run_coalesced(&self, request: &OrchestrationRequest<'_>, fingerprint: &str) -> Result<Artifact, CoreError> {
        let user_id = request.user_id.clone();
        let operation_kind = request.operation_kind.clone();
        let quota_kind = request.quota_kind;
        let ttl = request.ttl;
        let fingerprint_owned = fingerprint.to_string();
        let producer = request.producer.clone();

        let quota = self.quota.clone();
        let persistence = self.persistence.clone();
        let cache = self.cache.clone();
        let clock = self.clock.clone();
        let hooks = self.hooks.clone();

        let (outcome, was_leader) = self
            .singleflight
            .execute(fingerprint, move || async move {
                let model_started = std::time::Instant::now();
                let payload = producer.produce().await?;
                hooks.model_call_duration(&operation_kind, model_started.elapsed());

                let artifact = Artifact::new(
                    Uuid::new_v4().to_string(),
                    user_id.clone(),
                    operation_kind.clone(),
                    fingerprint_owned.clone(),
                    clock.now(),
                    ArtifactSource::Model,
                    payload,
                );

                // stage 6: quota is consumed iff the model produced a valid
                // artifact, never before
                match quota.consume(quota_kind, &user_id).await {
                    Ok(_) => {}
                    Err(CoreError::QuotaExceeded { .. }) => {
                        // raced with another session between the stage-3
                        // check and here; the caller already paid with
                        // latency, so return the artifact anyway, just skip
                        // persist/cache (spec §4.5 stage 6 rationale)
                        return Ok(artifact);
                    }
                    Err(other) => return Err(other),
                }

                // stage 7: persist first so cache never references an
                // un-persisted id
                persistence
                    .save_artifact(&artifact)
                    .await
                    .map_err(|e| CoreError::PersistenceFailed { message: e.to_string() })?;

                cache.put(&user_id, &[&fingerprint_owned], &artifact, ttl).await;

                Ok(artifact)
            })
            .await;

        let artifact_result = match outcome {
            Ok(result) => result,
            Err(source) => {
                // single-flight waiting failed (timeout or leader dropped its
                // result); collapse onto the existing deadline taxonomy
                // rather than inventing a new error variant for it.
                tracing::warn!(error = %source, "single-flight coordination failed");
                return Err(CoreError::DeadlineExceeded);
            }
        };

        if !was_leader {
            tracing::debug!(fingerprint = %fingerprint, "single-flight follower reused in-flight result");
        }

        (*artifact_result).clone()
    }

    /// Stage 8: synthesize, persist, and cache (at a quarter of the normal
    /// TTL) a degraded artifact. Quota is never consumed for a fallback.
    async fn emit_fallback(
        &self,
        request: &OrchestrationRequest<'_>,
        fingerprint: &str,
        producer: &FallbackProducer,
    ) -> Result<Artifact, CoreError> {
        let payload = producer();
        let artifact = Artifact::new(
            Uuid::new_v4().to_string(),
            request.user_id.clone(),
            request.operation_kind.clone(),
            fingerprint.to_string(),
            self.clock.now(),
            ArtifactSource::Fallback,
            payload,
        );

        self.persistence
            .save_artifact(&artifact)
            .await
            .map_err(|e| CoreError::PersistenceFailed { message: e.to_string() })?;

        self.cache.put(&request.user_id, &[fingerprint], &artifact, request.ttl / 4).await;

        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheConfig, IndexedCacheFacade};
    use crate::clock::ManualClock;
    use crate::collaborators::{ChatModel, ModelError, PersistenceError};
    use crate::observability::NoopHooks;
    use crate::orchestration::producer::ChatModelProducer;
    use crate::quota::QuotaConfig;
    use crate::testing::InMemoryKvStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FakeModel {
        calls: AtomicU32,
        response: String,
    }

    #[async_trait]
    impl ChatModel for FakeModel {
        async fn complete(&self, _prompt: &str, _max_tokens: u32, _temperature: f32) -> Result<String, ModelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.response.clone())
        }
    }

    struct FailingModel;

    #[async_trait]
    impl ChatModel for FailingModel {
        async fn complete(&self, _prompt: &str, _max_tokens: u32, _temperature: f32) -> Result<String, ModelError> {
            Err(ModelError::Unavailable("down".into()))
        }
    }

    struct FakePersistence;

    #[async_trait]
    impl PersistenceStore for FakePersistence {
        async fn save_artifact(&self, _artifact: &Artifact) -> Result<(), PersistenceError> {
            Ok(())
        }
        async fn load_artifact(&self, _id: &str) -> Result<Option<Artifact>, PersistenceError> {
            Ok(None)
        }
        async fn leaderboard_scores(
            &self,
            _scope: crate::leaderboard::LeaderboardScope,
        ) -> Result<Vec<(String, String, f64, u32, i64)>, PersistenceError> {
            Ok(Vec::new())
        }
    }

    fn producer(model: Arc<dyn ChatModel>) -> Arc<dyn OperationProducer> {
        Arc::new(ChatModelProducer { model, prompt: "make a recipe".into(), max_tokens: 256, temperature: 0.7 })
    }

    fn operation() -> OrchestratedOperation {
        let clock = Arc::new(ManualClock::new(chrono::Utc::now()));
        let kv = Arc::new(InMemoryKvStore::new());
        let hooks = Arc::new(NoopHooks);

        let facade = Arc::new(IndexedCacheFacade::new(kv.clone(), clock.clone(), hooks.clone(), CacheConfig::default()));
        let cache = Arc::new(TypedCacheStore::new(facade, "recipes"));
        let quota = Arc::new(QuotaEngine::new(kv, clock.clone(), hooks.clone(), QuotaConfig::default()));
        let singleflight = Arc::new(SingleFlightCoordinator::default());

        OrchestratedOperation::new(cache, quota, singleflight, Arc::new(FakePersistence), clock, hooks)
    }

    fn request(producer: Arc<dyn OperationProducer>) -> OrchestrationRequest<'static> {
        OrchestrationRequest {
            user_id: "u1".into(),
            operation_kind: "recipe_generation".into(),
            quota_kind: QuotaKind::AiRecipeGeneration,
            inputs: vec![("diet", "vegan")],
            profile_revision: "rev1",
            producer,
            fallback_producer: None,
            ttl: Duration::from_secs(3600),
        }
    }

    #[tokio::test]
    async fn first_call_invokes_model_second_call_hits_cache() {
        let model = Arc::new(FakeModel { calls: AtomicU32::new(0), response: r#"{"title":"Oats"}"#.into() });
        let op = operation();

        let first = op.execute(request(producer(model.clone()))).await.unwrap();
        assert_eq!(first.payload["title"], "Oats");
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);

        let second = op.execute(request(producer(model.clone()))).await.unwrap();
        assert_eq!(second.payload["title"], "Oats");
        assert_eq!(model.calls.load(Ordering::SeqCst), 1, "second call should be served from cache");
    }

    #[tokio::test]
    async fn malformed_model_output_surfaces_as_model_malformed() {
        let model = Arc::new(FakeModel { calls: AtomicU32::new(0), response: "not json at all".into() });
        let op = operation();

        let err = op.execute(request(producer(model))).await.unwrap_err();
        assert!(matches!(err, CoreError::ModelMalformed { .. }));
    }

    #[tokio::test]
    async fn exhausting_quota_rejects_before_calling_the_model() {
        let model = Arc::new(FakeModel { calls: AtomicU32::new(0), response: r#"{"title":"Oats"}"#.into() });
        let op = operation();

        let labels: Vec<String> = (0..QuotaKind::AiRecipeGeneration.default_limit())
            .map(|i| i.to_string())
            .collect();
        for label in &labels {
            let mut req = request(producer(model.clone()));
            req.inputs = vec![("meal_number", label.as_str())];
            // distinct fingerprint per call so cache doesn't short-circuit quota consumption
            let _ = op.execute(req).await;
        }

        let mut req = request(producer(model.clone()));
        req.inputs = vec![("meal_number", "overflow")];
        let err = op.execute(req).await.unwrap_err();
        assert!(matches!(err, CoreError::QuotaExceeded { .. }));
        assert_eq!(
            model.calls.load(Ordering::SeqCst),
            QuotaKind::AiRecipeGeneration.default_limit(),
            "the model must not be called once quota is already exhausted"
        );
    }

    #[tokio::test]
    async fn model_failure_without_fallback_producer_surfaces_the_error() {
        let op = operation();
        let mut req = request(producer(Arc::new(FailingModel)));
        req.fallback_producer = None;

        let err = op.execute(req).await.unwrap_err();
        assert!(matches!(err, CoreError::ModelUnavailable { .. }));
    }

    #[tokio::test]
    async fn model_failure_with_fallback_producer_returns_a_fallback_artifact() {
        let op = operation();
        let mut req = request(producer(Arc::new(FailingModel)));
        req.fallback_producer = Some(Arc::new(|| serde_json::json!({"title": "Default Oats"})));

        let artifact = op.execute(req).await.unwrap();
        assert_eq!(artifact.source, ArtifactSource::Fallback);
        assert_eq!(artifact.payload["title"], "Default Oats");
    }

    #[tokio::test]
    async fn fallback_artifacts_do_not_consume_quota() {
        let op = operation();
        let mut req = request(producer(Arc::new(FailingModel)));
        req.fallback_producer = Some(Arc::new(|| serde_json::json!({"title": "Default Oats"})));

        op.execute(req).await.unwrap();

        let usage = op.quota.usage(QuotaKind::AiRecipeGeneration, "u1").await;
        assert_eq!(usage.used, 0);
    }
}
