//! `OperationFingerprint` (spec §4.5): stable identity for "has this exact
//! request already been served" cache lookups and single-flight coalescing.
//!
//! Grounded in the teacher's query-hashing precedent in
//! `fraiseql-core::cache::result` (normalize, then hash, so semantically
//! identical inputs collide on the same key regardless of incidental
//! formatting differences).

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

/// Ordered, normalized identity of one operation invocation: who asked, what
/// kind of operation, and with which inputs.
///
/// Inputs are normalized before hashing so that key order, surrounding
/// whitespace, and casing of non-semantic string values never produce
/// different fingerprints for what is, for caching and quota purposes, the
/// same request.
pub struct OperationFingerprint;

impl OperationFingerprint {
    /// `inputs` should be the operation's request fields as `(key, value)`
    /// pairs; values are normalized with [`normalize_value`] before hashing.
    ///
    /// `profile_revision` is folded in so that editing the user's profile
    /// naturally invalidates every fingerprint derived from it — the cache
    /// and single-flight coordinator see a profile edit as a different
    /// request, never a stale hit, with no explicit invalidation call needed.
    #[must_use]
    pub fn compute(user_id: &str, operation_kind: &str, profile_revision: &str, inputs: &[(&str, &str)]) -> String {
        let mut sorted: BTreeMap<&str, String> = BTreeMap::new();
        for (key, value) in inputs {
            sorted.insert(key, normalize_value(value));
        }

        let mut hasher = Sha256::new();
        hasher.update(user_id.as_bytes());
        hasher.update(b"\0");
        hasher.update(operation_kind.as_bytes());
        hasher.update(b"\0");
        hasher.update(profile_revision.as_bytes());
        for (key, value) in &sorted {
            hasher.update(b"\0");
            hasher.update(key.as_bytes());
            hasher.update(b"=");
            hasher.update(value.as_bytes());
        }

        hex::encode(hasher.finalize())
    }
}

/// Collapses internal whitespace runs to a single space, trims the ends, and
/// lower-cases the result — inputs are free-text-ish (prompts, preferences)
/// where casing and spacing carry no operational meaning.
fn normalize_value(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_inputs_different_order_collide() {
        let a = OperationFingerprint::compute("u1", "recipe_generation", "rev1", &[("diet", "vegan"), ("meals", "3")]);
        let b = OperationFingerprint::compute("u1", "recipe_generation", "rev1", &[("meals", "3"), ("diet", "vegan")]);
        assert_eq!(a, b);
    }

    #[test]
    fn whitespace_and_case_are_normalized() {
        let a = OperationFingerprint::compute("u1", "nutrition_advice", "rev1", &[("goal", "Lose Weight")]);
        let b = OperationFingerprint::compute("u1", "nutrition_advice", "rev1", &[("goal", "  lose   weight ")]);
        assert_eq!(a, b);
    }

    #[test]
    fn different_users_never_collide() {
        let a = OperationFingerprint::compute("u1", "recipe_generation", "rev1", &[("diet", "vegan")]);
        let b = OperationFingerprint::compute("u2", "recipe_generation", "rev1", &[("diet", "vegan")]);
        assert_ne!(a, b);
    }

    #[test]
    fn profile_revision_change_misses_cache() {
        let a = OperationFingerprint::compute("u1", "recipe_generation", "rev1", &[("diet", "vegan")]);
        let b = OperationFingerprint::compute("u1", "recipe_generation", "rev2", &[("diet", "vegan")]);
        assert_ne!(a, b, "a profile edit must change the fingerprint so the cache naturally misses");
    }
}
