use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use sha2::{Digest, Sha256};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Load configuration from file with environment variable overrides.
///
/// Nested keys are separated by a double underscore, so
/// `DATAMOVER_TRANSFER__MAX_WAIT_SECS=900` overrides `transfer.max_wait_secs`.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed("DATAMOVER_").split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(config)
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Short SHA-256 fingerprint of the resolved configuration, for logs.
pub fn config_fingerprint(config: &Config) -> String {
    let json = serde_json::to_string(config).unwrap_or_default();
    let digest = format!("{:x}", Sha256::digest(json.as_bytes()));
    digest[..16].to_string()
}
