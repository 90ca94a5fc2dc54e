//! `TypedCacheStore<T>` (spec §4.2): a typed veneer over
//! [`crate::cache::facade::IndexedCacheFacade`] that serializes/deserializes
//! `T` as JSON and speaks in `(feature, user_id)` index keys rather than raw
//! bytes and group-key strings.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::facade::IndexedCacheFacade;
use super::key::{entry_key, index_key};

pub struct TypedCacheStore<T> {
    facade: Arc<IndexedCacheFacade>,
    feature: String,
    _marker: PhantomData<T>,
}

impl<T> TypedCacheStore<T>
where
    T: Serialize + DeserializeOwned,
{
    #[must_use]
    pub fn new(facade: Arc<IndexedCacheFacade>, feature: impl Into<String>) -> Self {
        Self { facade, feature: feature.into(), _marker: PhantomData }
    }

    /// Reads `T` cached for `user_id` under `discriminators` (e.g. a
    /// fingerprint), deserializing on a hit. A deserialization failure is
    /// treated as a miss rather than propagated — a stale/incompatible
    /// on-disk shape should never break reads after a payload format change —
    /// but the offending entry is also invalidated so it doesn't keep
    /// failing to decode on every subsequent read.
    pub async fn get(&self, user_id: &str, discriminators: &[&str]) -> Option<T> {
        let group = index_key(&self.feature, user_id);
        let key = entry_key(&self.feature, discriminators);
        let bytes = self.facade.get(&group, &key).await?;
        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(_) => {
                self.facade.invalidate_entry(&group, &key).await;
                None
            }
        }
    }

    pub async fn put(&self, user_id: &str, discriminators: &[&str], value: &T, ttl: Duration) -> bool {
        let Ok(bytes) = serde_json::to_vec(value) else {
            return false;
        };
        let group = index_key(&self.feature, user_id);
        let key = entry_key(&self.feature, discriminators);
        self.facade.put(&group, &key, bytes, ttl).await
    }

    pub async fn invalidate(&self, user_id: &str, discriminators: &[&str]) -> bool {
        let group = index_key(&self.feature, user_id);
        let key = entry_key(&self.feature, discriminators);
        self.facade.invalidate_entry(&group, &key).await
    }

    /// Drops every cached entry for `user_id` in this feature's namespace —
    /// spec §4.1 bulk invalidation surfaced at the typed layer.
    pub async fn invalidate_all(&self, user_id: &str) -> bool {
        let group = index_key(&self.feature, user_id);
        self.facade.invalidate_namespace(&group).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::facade::CacheConfig;
    use crate::clock::ManualClock;
    use crate::observability::NoopHooks;
    use crate::testing::InMemoryKvStore;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Plan {
        title: String,
    }

    fn store() -> TypedCacheStore<Plan> {
        let facade = Arc::new(IndexedCacheFacade::new(
            Arc::new(InMemoryKvStore::new()),
            Arc::new(ManualClock::new(chrono::Utc::now())),
            Arc::new(NoopHooks),
            CacheConfig::default(),
        ));
        TypedCacheStore::new(facade, "recipes")
    }

    #[tokio::test]
    async fn round_trips_a_typed_value() {
        let store = store();
        let plan = Plan { title: "Oats".into() };
        assert!(store.put("u1", &["fp1"], &plan, Duration::from_secs(60)).await);
        assert_eq!(store.get("u1", &["fp1"]).await, Some(plan));
    }

    #[tokio::test]
    async fn invalidate_all_clears_every_fingerprint_for_the_user() {
        let store = store();
        let plan = Plan { title: "Oats".into() };
        store.put("u1", &["fp1"], &plan, Duration::from_secs(60)).await;
        store.put("u1", &["fp2"], &plan, Duration::from_secs(60)).await;

        assert!(store.invalidate_all("u1").await);

        assert_eq!(store.get("u1", &["fp1"]).await, None);
        assert_eq!(store.get("u1", &["fp2"]).await, None);
    }
}
