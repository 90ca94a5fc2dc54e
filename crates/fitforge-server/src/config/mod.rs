//! TOML-backed runtime configuration (SPEC_FULL.md §3 Configuration).
//!
//! Grounded in `fraiseql-server::config::RuntimeConfig`: a single struct
//! deserialized from TOML with `#[serde(default)]` sections so a minimal
//! file (just `[server]` and `[redis]`) is enough to boot, and everything
//! else falls back to documented defaults.

pub mod loader;

use std::collections::HashMap;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeConfig {
    pub server: ServerConfig,
    pub redis: RedisConfig,

    #[serde(default)]
    pub quotas: QuotaSettings,

    #[serde(default)]
    pub cache: CacheSettings,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_port() -> u16 {
    8080
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_shutdown_timeout_secs() -> u64 {
    30
}
fn default_request_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

/// Per-kind quota overrides and the calendar/failure-mode policy they run
/// under (spec §4.3).
#[derive(Debug, Clone, Deserialize)]
pub struct QuotaSettings {
    #[serde(default = "default_timezone")]
    pub timezone: String,

    #[serde(default = "default_backend_failure_policy")]
    pub backend_failure_policy: BackendFailurePolicyConfig,

    /// Overrides keyed by `QuotaKind::as_str()`, e.g. `AI_RECIPE_GENERATION = 15`.
    #[serde(default)]
    pub limit_overrides: HashMap<String, u32>,
}

impl Default for QuotaSettings {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            backend_failure_policy: default_backend_failure_policy(),
            limit_overrides: HashMap::new(),
        }
    }
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_backend_failure_policy() -> BackendFailurePolicyConfig {
    BackendFailurePolicyConfig::Allow
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendFailurePolicyConfig {
    Allow,
    Deny,
}

impl From<BackendFailurePolicyConfig> for fitforge_core::quota::BackendFailurePolicy {
    fn from(value: BackendFailurePolicyConfig) -> Self {
        match value {
            BackendFailurePolicyConfig::Allow => Self::Allow,
            BackendFailurePolicyConfig::Deny => Self::Deny,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_ttl_secs")]
    pub default_ttl_secs: u64,

    #[serde(default = "default_fallback_capacity")]
    pub fallback_capacity: u64,

    #[serde(default = "default_primary_deadline_ms")]
    pub primary_deadline_ms: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            default_ttl_secs: default_ttl_secs(),
            fallback_capacity: default_fallback_capacity(),
            primary_deadline_ms: default_primary_deadline_ms(),
        }
    }
}

fn default_ttl_secs() -> u64 {
    3600
}
fn default_fallback_capacity() -> u64 {
    10_000
}
fn default_primary_deadline_ms() -> u64 {
    150
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), json: false }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_toml_fills_in_defaults() {
        let toml = r#"
            [server]
            port = 9000

            [redis]
            url = "redis://localhost:6379"
        "#;

        let config: RuntimeConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.cache.default_ttl_secs, 3600);
        assert_eq!(config.quotas.timezone, "UTC");
        assert_eq!(config.quotas.backend_failure_policy, BackendFailurePolicyConfig::Allow);
    }

    #[test]
    fn quota_overrides_parse() {
        let toml = r#"
            [server]
            [redis]
            url = "redis://localhost:6379"

            [quotas]
            timezone = "America/New_York"
            backend_failure_policy = "allow"

            [quotas.limit_overrides]
            AI_RECIPE_GENERATION = 15
        "#;

        let config: RuntimeConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.quotas.timezone, "America/New_York");
        assert_eq!(config.quotas.backend_failure_policy, BackendFailurePolicyConfig::Allow);
        assert_eq!(config.quotas.limit_overrides.get("AI_RECIPE_GENERATION"), Some(&15));
    }
}
