//! `nestforge-config` — NestForge runtime configuration management.
//!
//! Provides the typed config schema, YAML/JSON loading, and `${ENV_VAR}`
//! substitution over string leaves.

pub mod env;
pub mod schema;

pub use env::{resolve_env_vars, resolve_env_vars_with, MissingEnvVarError};
pub use schema::{
    AnnounceTargetConfig, ChannelsConfig, GatewayConfig, LoggingConfig, NestForgeConfig,
    SeaTalkChannelConfig, SessionConfig,
};

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::Path;

/// Load a config file, apply env substitution, and deserialize it.
///
/// YAML is assumed unless the file ends in `.json`. A missing file yields
/// the default (empty) config.
pub async fn load_config(path: &Path) -> Result<NestForgeConfig> {
    if !path.exists() {
        return Ok(NestForgeConfig::default());
    }
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read config file {}", path.display()))?;

    let value: Value = if path.extension().is_some_and(|ext| ext == "json") {
        serde_json::from_str(&raw).context("failed to parse config JSON")?
    } else {
        serde_yaml::from_str(&raw).context("failed to parse config YAML")?
    };

    let value = resolve_env_vars(&value).context("failed to resolve env vars in config")?;
    let config: NestForgeConfig =
        serde_json::from_value(value).context("failed to deserialize config")?;
    Ok(config)
}
