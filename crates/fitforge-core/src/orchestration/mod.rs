//! Cache-aside orchestration pipeline (spec §4.5).

pub mod artifact;
pub mod fingerprint;
pub mod parsing;
pub mod pipeline;
pub mod producer;

pub use artifact::Artifact;
pub use fingerprint::OperationFingerprint;
pub use pipeline::{OrchestratedOperation, OrchestrationError, OrchestrationRequest};
pub use producer::{CatalogProducer, ChatModelProducer, OperationProducer};
