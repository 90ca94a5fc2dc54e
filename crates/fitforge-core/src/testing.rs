//! In-memory test doubles for every external collaborator trait.
//!
//! Grounded in the teacher's in-memory adapter fakes used across
//! `fraiseql-core`'s own test modules: a `Mutex`-guarded `HashMap` standing
//! in for whatever networked backend the trait abstracts, so unit tests never
//! need a real Redis/Postgres/LLM endpoint.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::collaborators::{
    CatalogError, CatalogItem, ChatModel, ExternalCatalog, KVStore, KvError, ModelError, PersistenceError,
    PersistenceStore,
};
use crate::leaderboard::LeaderboardScope;
use crate::orchestration::artifact::Artifact;

pub use crate::clock::ManualClock;

/// In-process stand-in for a Redis-backed [`KVStore`]. TTLs are accepted but
/// not enforced here — expiry behavior for the cache is exercised against
/// [`crate::cache::fallback::FallbackCache`] directly, which does enforce it
/// against an injected clock.
#[derive(Default)]
pub struct InMemoryKvStore {
    values: Mutex<HashMap<String, Vec<u8>>>,
    sets: Mutex<HashMap<String, Vec<String>>>,
    fail_next_get: std::sync::atomic::AtomicBool,
}

impl InMemoryKvStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next [`KVStore::get`] call return `Unreachable`, to exercise
    /// backend-failure handling without a real networked store.
    pub fn fail_next_get(&self) {
        self.fail_next_get.store(true, std::sync::atomic::Ordering::SeqCst);
    }
}

#[async_trait]
impl KVStore for InMemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KvError> {
        if self.fail_next_get.swap(false, std::sync::atomic::Ordering::SeqCst) {
            return Err(KvError::Unreachable("simulated failure".into()));
        }
        Ok(self.values.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Vec<u8>, _ttl: Duration) -> Result<(), KvError> {
        self.values.lock().unwrap().insert(key.to_string(), value);
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), KvError> {
        self.values.lock().unwrap().remove(key);
        Ok(())
    }

    async fn incr_by(&self, key: &str, delta: i64) -> Result<i64, KvError> {
        let mut values = self.values.lock().unwrap();
        let current = values
            .get(key)
            .and_then(|bytes| std::str::from_utf8(bytes).ok())
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(0);
        let updated = current + delta;
        values.insert(key.to_string(), updated.to_string().into_bytes());
        Ok(updated)
    }

    async fn expire(&self, _key: &str, _ttl: Duration) -> Result<(), KvError> {
        Ok(())
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<(), KvError> {
        let mut sets = self.sets.lock().unwrap();
        let members = sets.entry(key.to_string()).or_default();
        if !members.iter().any(|m| m == member) {
            members.push(member.to_string());
        }
        Ok(())
    }

    async fn srem(&self, key: &str, member: &str) -> Result<(), KvError> {
        if let Some(members) = self.sets.lock().unwrap().get_mut(key) {
            members.retain(|m| m != member);
        }
        Ok(())
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>, KvError> {
        Ok(self.sets.lock().unwrap().get(key).cloned().unwrap_or_default())
    }
}

/// In-process stand-in for the relational [`PersistenceStore`].
#[derive(Default)]
pub struct InMemoryPersistenceStore {
    artifacts: Mutex<HashMap<String, Artifact>>,
}

impl InMemoryPersistenceStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PersistenceStore for InMemoryPersistenceStore {
    async fn save_artifact(&self, artifact: &Artifact) -> Result<(), PersistenceError> {
        self.artifacts.lock().unwrap().insert(artifact.id.clone(), artifact.clone());
        Ok(())
    }

    async fn load_artifact(&self, id: &str) -> Result<Option<Artifact>, PersistenceError> {
        Ok(self.artifacts.lock().unwrap().get(id).cloned())
    }

    async fn leaderboard_scores(
        &self,
        _scope: LeaderboardScope,
    ) -> Result<Vec<(String, String, f64, u32, i64)>, PersistenceError> {
        Ok(Vec::new())
    }
}

/// Scripted [`ChatModel`] fake: returns a fixed response, or a configured
/// error, regardless of the prompt.
pub struct FakeChatModel {
    response: Result<String, ModelError>,
}

impl FakeChatModel {
    #[must_use]
    pub fn responding_with(response: impl Into<String>) -> Self {
        Self { response: Ok(response.into()) }
    }

    #[must_use]
    pub fn failing_with(error: ModelError) -> Self {
        Self { response: Err(error) }
    }
}

#[async_trait]
impl ChatModel for FakeChatModel {
    async fn complete(&self, _prompt: &str, _max_tokens: u32, _temperature: f32) -> Result<String, ModelError> {
        match &self.response {
            Ok(text) => Ok(text.clone()),
            Err(ModelError::Timeout) => Err(ModelError::Timeout),
            Err(ModelError::Unavailable(message)) => Err(ModelError::Unavailable(message.clone())),
            Err(ModelError::Rejected(message)) => Err(ModelError::Rejected(message.clone())),
        }
    }
}

/// Scripted [`ExternalCatalog`] fake.
pub struct FakeExternalCatalog {
    items: Vec<CatalogItem>,
}

impl FakeExternalCatalog {
    #[must_use]
    pub fn with_items(items: Vec<CatalogItem>) -> Self {
        Self { items }
    }
}

#[async_trait]
impl ExternalCatalog for FakeExternalCatalog {
    async fn search(&self, _query: &str, limit: u32) -> Result<Vec<CatalogItem>, CatalogError> {
        Ok(self.items.iter().take(limit as usize).cloned().collect())
    }
}
