//! External collaborator interfaces (spec §1, §6.4).
//!
//! These traits are the only way the orchestration core talks to the
//! relational store, the chat model, the third-party catalog, and the
//! networked key-value store. Concrete production implementations (Postgres,
//! a vendor LLM client, a recipe/video API client, Redis) are out of scope
//! per spec §1/§6 — this crate ships only the trait boundary plus in-memory
//! test doubles (see [`crate::testing`]).

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::leaderboard::LeaderboardScope;
use crate::orchestration::artifact::Artifact;

/// Transactional read/write of domain entities (spec §1: `PersistenceStore`).
#[async_trait]
pub trait PersistenceStore: Send + Sync {
    async fn save_artifact(&self, artifact: &Artifact) -> Result<(), PersistenceError>;

    async fn load_artifact(&self, id: &str) -> Result<Option<Artifact>, PersistenceError>;

    /// Raw `(user_id, display_name, score, streak, streak_start_epoch_day)`
    /// rows for a leaderboard scope, ranked by
    /// [`crate::leaderboard::LeaderboardSnapshotStore`] (spec §4.6: dense
    /// rank by score desc, streak-start asc, user_id asc; spec §3:
    /// `LeaderboardSnapshot.entries` carries `display_name` and `streak`
    /// alongside the ranking).
    async fn leaderboard_scores(
        &self,
        scope: LeaderboardScope,
    ) -> Result<Vec<(String, String, f64, u32, i64)>, PersistenceError>;
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("persistence backend unavailable: {0}")]
    Unavailable(String),
    #[error("persistence write conflict: {0}")]
    Conflict(String),
}

/// LLM chat completion (spec §1: `ChatModel.complete(prompt, maxTokens, temperature)`).
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, ModelError>;
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model call timed out")]
    Timeout,
    #[error("model backend unavailable: {0}")]
    Unavailable(String),
    #[error("model returned an error: {0}")]
    Rejected(String),
}

/// Third-party recipe/video metadata lookup (spec §1: `ExternalCatalog`).
#[async_trait]
pub trait ExternalCatalog: Send + Sync {
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<CatalogItem>, CatalogError>;
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CatalogItem {
    pub id: String,
    pub title: String,
    pub url: String,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog backend unavailable: {0}")]
    Unavailable(String),
    #[error("catalog request rejected: {0}")]
    Rejected(String),
}

/// Networked string -> bytes map with TTL and atomic INCR (spec §6.4).
///
/// A production implementation backs this with Redis (`GET`/`SET`/`DEL`/
/// `INCRBY`/`EXPIRE`/`SADD`/`SREM`/`SMEMBERS` map directly onto the Redis
/// commands named in spec §6.4); this crate only defines the contract, so
/// `IndexedCacheFacade` and `QuotaEngine` stay testable without a real Redis.
#[async_trait]
pub trait KVStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KvError>;

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), KvError>;

    async fn del(&self, key: &str) -> Result<(), KvError>;

    /// Atomic increment-by; returns the value after applying `delta`.
    async fn incr_by(&self, key: &str, delta: i64) -> Result<i64, KvError>;

    /// Idempotent: setting a TTL on a key that has none behaves the same as
    /// setting it twice.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), KvError>;

    async fn sadd(&self, key: &str, member: &str) -> Result<(), KvError>;

    async fn srem(&self, key: &str, member: &str) -> Result<(), KvError>;

    async fn smembers(&self, key: &str) -> Result<Vec<String>, KvError>;
}

#[derive(Debug, Error)]
pub enum KvError {
    #[error("kv store unreachable: {0}")]
    Unreachable(String),
    #[error("kv op timed out after {0:?}")]
    Timeout(Duration),
}
