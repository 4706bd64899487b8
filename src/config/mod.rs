// src/config/mod.rs
mod models;

pub use models::*;

use anyhow::{Context, Result};
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

/// Prefix for environment overrides, e.g. `HBRELAY_MONITOR__MODE=blocking`.
pub const ENV_PREFIX: &str = "HBRELAY";

/// Resolve the process configuration.
///
/// An explicit path must exist. Without one, `config.yaml` is read when
/// present and built-in defaults are used otherwise. Environment overrides
/// apply in every case.
pub async fn load(path: Option<&Path>) -> Result<Config> {
    let base = match path {
        Some(path) => read_config_file(path).await?,
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            read_config_file(DEFAULT_CONFIG_PATH).await?
        }
        None => Config::default(),
    };

    let config = with_env_overrides(&base, ENV_PREFIX)?;
    config.validate()?;
    Ok(config)
}

/// Load configuration from a file (YAML or JSON)
pub async fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let config = read_config_file(path).await?;
    config.validate()?;
    Ok(config)
}

async fn read_config_file<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file {}", path.display()))?;

    let config: Config = match path.extension().and_then(|s| s.to_str()) {
        Some("yaml") | Some("yml") => {
            serde_yaml::from_str(&contents).context("Failed to parse YAML config")?
        }
        _ => serde_json::from_str(&contents).context("Failed to parse JSON config")?,
    };

    Ok(config)
}

/// Layer `<prefix>_SECTION__FIELD` environment variables over `base`.
pub fn with_env_overrides(base: &Config, prefix: &str) -> Result<Config> {
    let layered = ::config::Config::builder()
        .add_source(::config::Config::try_from(base).context("Failed to seed config layers")?)
        .add_source(
            ::config::Environment::with_prefix(prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Failed to apply environment overrides")?;

    layered
        .try_deserialize::<Config>()
        .context("Invalid configuration after environment overrides")
}
