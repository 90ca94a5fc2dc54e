//! Bounded in-process fallback tier (spec §4.1: "bounded in-process map").
//!
//! Backed by `moka` for LRU-style capacity eviction (the teacher's
//! `fraiseql-core::cache::result` module reaches for an LRU crate for the
//! same reason: bound memory without a background reaper). TTL is re-checked
//! against the facade's injected [`crate::clock::Clock`] on every read rather
//! than moka's own wall-clock TTL, so `ManualClock`-driven tests can cross a
//! TTL boundary deterministically.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use dashmap::DashSet;

#[derive(Clone)]
struct FallbackEntry {
    value: Vec<u8>,
    stored_at: DateTime<Utc>,
    ttl: StdDuration,
    group_key: String,
}

/// Size-bounded, TTL-aware fallback cache used when the primary `KVStore` is
/// unreachable or slow.
pub struct FallbackCache {
    entries: moka::sync::Cache<String, FallbackEntry>,
    dirty_groups: Arc<DashSet<String>>,
}

impl FallbackCache {
    #[must_use]
    pub fn new(capacity: u64) -> Self {
        Self {
            entries: moka::sync::Cache::builder().max_capacity(capacity).build(),
            dirty_groups: Arc::new(DashSet::new()),
        }
    }

    pub fn put(&self, group_key: &str, key: &str, value: Vec<u8>, ttl: StdDuration, now: DateTime<Utc>) {
        self.entries.insert(
            key.to_string(),
            FallbackEntry {
                value,
                stored_at: now,
                ttl,
                group_key: group_key.to_string(),
            },
        );
    }

    pub fn get(&self, key: &str, now: DateTime<Utc>) -> Option<Vec<u8>> {
        let entry = self.entries.get(key)?;
        let age = now.signed_duration_since(entry.stored_at);
        if age < chrono::Duration::zero() {
            // clock moved backwards (shouldn't happen with ManualClock misuse); treat as fresh
        }
        if age.to_std().map(|a| a >= entry.ttl).unwrap_or(false) {
            self.entries.invalidate(key);
            return None;
        }
        if self.dirty_groups.contains(&entry.group_key) {
            return None;
        }
        Some(entry.value)
    }

    pub fn remove(&self, key: &str) {
        self.entries.invalidate(&key.to_string());
    }

    pub fn mark_dirty(&self, group_key: &str) {
        self.dirty_groups.insert(group_key.to_string());
    }

    pub fn clear_dirty(&self, group_key: &str) {
        self.dirty_groups.remove(group_key);
    }

    pub fn is_dirty(&self, group_key: &str) -> bool {
        self.dirty_groups.contains(group_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn expires_entries_past_ttl() {
        let cache = FallbackCache::new(100);
        let t0 = Utc::now();
        cache.put("g", "k", b"v".to_vec(), Duration::from_secs(10), t0);

        assert_eq!(cache.get("k", t0 + chrono::Duration::seconds(5)), Some(b"v".to_vec()));
        assert_eq!(cache.get("k", t0 + chrono::Duration::seconds(11)), None);
    }

    #[test]
    fn dirty_group_masks_reads() {
        let cache = FallbackCache::new(100);
        let t0 = Utc::now();
        cache.put("g", "k", b"v".to_vec(), Duration::from_secs(60), t0);
        assert_eq!(cache.get("k", t0), Some(b"v".to_vec()));

        cache.mark_dirty("g");
        assert_eq!(cache.get("k", t0), None);

        cache.clear_dirty("g");
        assert_eq!(cache.get("k", t0), Some(b"v".to_vec()));
    }
}
