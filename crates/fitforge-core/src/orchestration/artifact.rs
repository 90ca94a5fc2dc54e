//! `Artifact` (spec §3): the payload an [`crate::orchestration::pipeline::OrchestratedOperation`]
//! produces, caches, and persists — a meal plan, a nutrition insight, a pose
//! analysis, or a recipe search result, wrapped in common provenance fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::observability::ArtifactSource;

/// Provenance-wrapped result of one orchestrated operation.
///
/// `payload` is left as opaque JSON rather than a closed enum of concrete
/// shapes: spec §1 lists four operation kinds (recipe generation, nutrition
/// advice, pose analysis, recipe search) but leaves their concrete result
/// schemas undefined, so this crate carries them as `serde_json::Value` and
/// lets the caller (an `OrchestratedOperation<T>`'s `validate` hook, or the
/// HTTP layer) interpret `payload` against whatever schema that operation
/// kind expects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub id: String,
    pub user_id: String,
    pub operation_kind: String,
    pub fingerprint: String,
    pub produced_at: DateTime<Utc>,
    pub source: ArtifactSource,
    pub payload: serde_json::Value,
    /// spec §4.5 edge case: set when the model's response didn't validate
    /// against the expected schema and a degraded/partial artifact was
    /// substituted instead of failing the whole operation.
    pub advisory_mismatch: bool,
}

impl Artifact {
    #[must_use]
    pub fn new(
        id: String,
        user_id: String,
        operation_kind: String,
        fingerprint: String,
        produced_at: DateTime<Utc>,
        source: ArtifactSource,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id,
            user_id,
            operation_kind,
            fingerprint,
            produced_at,
            source,
            payload,
            advisory_mismatch: false,
        }
    }

    #[must_use]
    pub fn with_advisory_mismatch(mut self, mismatch: bool) -> Self {
        self.advisory_mismatch = mismatch;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_advisory_mismatch_sets_flag() {
        let artifact = Artifact::new(
            "a1".into(),
            "u1".into(),
            "recipe_generation".into(),
            "fp".into(),
            Utc::now(),
            ArtifactSource::Model,
            serde_json::json!({"title": "Oats"}),
        )
        .with_advisory_mismatch(true);

        assert!(artifact.advisory_mismatch);
    }
}
