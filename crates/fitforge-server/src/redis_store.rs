//! Redis-backed [`fitforge_core::collaborators::KVStore`] (SPEC_FULL.md §2:
//! "a concrete `KVStore` wired against Redis").
//!
//! Uses `redis::aio::ConnectionManager`, the same choice the teacher makes
//! for its optional rate-limiting backend — auto-reconnecting, cheap to
//! clone, safe to share across the whole process behind one `Arc`.

use std::time::Duration;

use async_trait::async_trait;
use fitforge_core::collaborators::{KVStore, KvError};
use redis::{aio::ConnectionManager, AsyncCommands};

pub struct RedisKvStore {
    manager: ConnectionManager,
}

impl RedisKvStore {
    pub async fn connect(url: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(url)?;
        let manager = client.get_connection_manager().await?;
        Ok(Self { manager })
    }
}

#[async_trait]
impl KVStore for RedisKvStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KvError> {
        let mut conn = self.manager.clone();
        conn.get(key).await.map_err(|e| KvError::Unreachable(e.to_string()))
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), KvError> {
        let mut conn = self.manager.clone();
        let seconds = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(key, value, seconds)
            .await
            .map_err(|e| KvError::Unreachable(e.to_string()))
    }

    async fn del(&self, key: &str) -> Result<(), KvError> {
        let mut conn = self.manager.clone();
        conn.del::<_, ()>(key).await.map_err(|e| KvError::Unreachable(e.to_string()))
    }

    async fn incr_by(&self, key: &str, delta: i64) -> Result<i64, KvError> {
        let mut conn = self.manager.clone();
        conn.incr(key, delta).await.map_err(|e| KvError::Unreachable(e.to_string()))
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), KvError> {
        let mut conn = self.manager.clone();
        let seconds = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        conn.expire::<_, ()>(key, seconds).await.map_err(|e| KvError::Unreachable(e.to_string()))
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<(), KvError> {
        let mut conn = self.manager.clone();
        conn.sadd::<_, _, ()>(key, member).await.map_err(|e| KvError::Unreachable(e.to_string()))
    }

    async fn srem(&self, key: &str, member: &str) -> Result<(), KvError> {
        let mut conn = self.manager.clone();
        conn.srem::<_, _, ()>(key, member).await.map_err(|e| KvError::Unreachable(e.to_string()))
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>, KvError> {
        let mut conn = self.manager.clone();
        conn.smembers(key).await.map_err(|e| KvError::Unreachable(e.to_string()))
    }
}
