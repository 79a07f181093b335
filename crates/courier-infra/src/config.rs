//! Configuration loading for Courier.
//!
//! Reads `config.toml` from the data directory (`~/.courier/` in production)
//! and deserializes it into [`EngineConfig`]. Falls back to sensible defaults
//! when the file is missing or malformed. The bot token is resolved
//! separately: the `COURIER_BOT_TOKEN` env var wins over the config file.

use std::path::{Path, PathBuf};

use courier_types::config::EngineConfig;
use secrecy::SecretString;

/// Env var holding the bot token; overrides the config file.
pub const TOKEN_ENV_VAR: &str = "COURIER_BOT_TOKEN";

/// Resolve the data directory: `COURIER_DATA_DIR` env var, falling back to
/// `~/.courier`.
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("COURIER_DATA_DIR") {
        return PathBuf::from(dir);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".courier")
}

/// Load engine configuration from `{data_dir}/config.toml`.
///
/// A missing file is normal (first run) and yields [`EngineConfig::default()`];
/// an unreadable or malformed file yields the defaults too, with a warning,
/// so a typo in the config never keeps the bot from starting.
pub async fn load_engine_config(data_dir: &Path) -> EngineConfig {
    let path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("no config.toml at {}, running on defaults", path.display());
            return EngineConfig::default();
        }
        Err(err) => {
            tracing::warn!("could not read {}: {err}, running on defaults", path.display());
            return EngineConfig::default();
        }
    };

    match toml::from_str::<EngineConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!("could not parse {}: {err}, running on defaults", path.display());
            EngineConfig::default()
        }
    }
}

/// Resolve the bot token: env var first, config file second.
///
/// `None` means no credential anywhere -- a fatal startup condition for the
/// bot (the caller logs and refuses to run).
pub fn resolve_bot_token(config: &EngineConfig) -> Option<SecretString> {
    match std::env::var(TOKEN_ENV_VAR) {
        Ok(token) if !token.trim().is_empty() => return Some(SecretString::from(token)),
        _ => {}
    }
    config
        .bot_token
        .as_deref()
        .filter(|token| !token.trim().is_empty())
        .map(SecretString::from)
}
