use std::path::Path;

use crate::config::schema::{default_config_path, Config};
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../../../schema/config-v1.json");

/// Environment variable that overrides the configured API key.
pub const API_KEY_ENV: &str = "DELFIN_API_KEY";

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut config = load_config_from_str(&content)?;
    apply_env_overrides(&mut config);
    Ok(config)
}

/// Loads the config at `path` (or the default location). A missing file
/// yields the defaults.
pub fn load_config_or_default(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => default_config_path(),
    };

    match path {
        Some(p) if p.exists() => load_config(&p),
        _ => {
            log::debug!("No config file found, using defaults");
            let mut config = Config::default();
            apply_env_overrides(&mut config);
            Ok(config)
        }
    }
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let config: Config = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

fn apply_env_overrides(config: &mut Config) {
    if let Ok(key) = std::env::var(API_KEY_ENV) {
        let key = key.trim();
        if !key.is_empty() {
            config.api_key = Some(key.to_string());
        }
    }
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();
    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    if config.request_timeout_secs == 0 || config.connect_timeout_secs == 0 {
        return Err(ConfigError::Validation {
            message: "Timeouts must be positive".to_string(),
        });
    }

    match reqwest::Url::parse(&config.endpoint) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        _ => {
            return Err(ConfigError::Validation {
                message: format!("Endpoint must be an absolute http(s) URL: {}", config.endpoint),
            })
        }
    }

    Ok(())
}
