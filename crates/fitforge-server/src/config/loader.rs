//! Config discovery (spec SPEC_FULL.md §3): `FITFORGE_CONFIG` env var, then
//! `./fitforge.toml`, then the user config directory, mirroring
//! `fraiseql-server::config::loader::RuntimeConfig::load`.

use std::env;
use std::path::Path;

use fitforge_error::ConfigError;

use super::RuntimeConfig;

impl RuntimeConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::ReadError { path: path.to_path_buf(), source })?;

        let config: RuntimeConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = env::var("FITFORGE_CONFIG") {
            return Self::from_file(path);
        }

        let local_config = Path::new("./fitforge.toml");
        if local_config.exists() {
            return Self::from_file(local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("fitforge/config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Err(ConfigError::NotFound)
    }

    pub fn load_with_path(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::from_file(p),
            None => Self::load(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_file_reads_and_parses_toml() {
        let dir = std::env::temp_dir().join(format!("fitforge-config-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(
            &path,
            r#"
                [server]
                port = 7000

                [redis]
                url = "redis://localhost:6379"
            "#,
        )
        .unwrap();

        let config = RuntimeConfig::from_file(&path).unwrap();
        assert_eq!(config.server.port, 7000);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = RuntimeConfig::from_file("/nonexistent/fitforge.toml").unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
    }
}
