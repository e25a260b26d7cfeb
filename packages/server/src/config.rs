use std::path::PathBuf;

use common::{EngineConfig, SandboxConfig};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use worker::LanguageSpec;

/// Default config file location, without extension.
const DEFAULT_CONFIG_PATH: &str = "config/config";

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors: CorsConfig,
    /// Upper bound on `wait_ms` for long-polling status requests. Default: 30000.
    #[serde(default = "default_max_wait_ms")]
    pub max_wait_ms: u64,
}

fn default_max_wait_ms() -> u64 {
    30_000
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CatalogConfig {
    /// TOML file with `[[problems]]`; the built-in set is used when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub sandbox: SandboxConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    /// Toolchain overrides and additions, keyed by `id`.
    #[serde(default)]
    pub languages: Vec<LanguageSpec>,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("CODEPREP_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
        Self::load_from(&path)
    }

    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.cors.allow_origins", Vec::<String>::new())?
            .set_default("server.cors.max_age", 3600)?
            // Load from config/config.toml
            .add_source(File::with_name(path).required(false))
            // Override from environment (e.g., CODEPREP__ENGINE__POOL_SIZE=8)
            .add_source(Environment::with_prefix("CODEPREP").separator("__"))
            .build()?;

        let config: Self = s.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.pool_size == 0 {
            return Err(ConfigError::Message(
                "engine.pool_size must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
