//! API key resolution for the inference endpoint.
//!
//! The key lives in the `settings` table so the user can change it at
//! runtime. Resolution order:
//!
//! 1. **Saved setting** (`gemini_api_key`)
//! 2. **Configured default** (`apiKey` in the config file, or `DELFIN_API_KEY`)
//! 3. **Build-time default** (`DELFIN_DEFAULT_API_KEY` at compile time)
//!
//! A key found through a fallback is saved back, so the user sees and can
//! edit it afterwards.

use secrecy::SecretString;

use crate::db::{settings_repo, Database, DatabaseError};

/// Settings key under which the API key is stored.
pub const API_KEY_SETTING: &str = "gemini_api_key";

const COMPILED_DEFAULT_KEY: Option<&str> = option_env!("DELFIN_DEFAULT_API_KEY");

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("No API key configured; set one with `delfin config set-key <key>`")]
    Missing,

    #[error("Por favor, ingresa una API key válida")]
    Empty,

    #[error("Failed to access stored credentials: {0}")]
    Storage(#[from] DatabaseError),
}

/// Resolves the API key to use for extraction. `configured` is the
/// `apiKey` config option.
pub fn resolve_api_key(
    db: &Database,
    configured: Option<&str>,
) -> Result<SecretString, CredentialError> {
    resolve_with_fallbacks(db, &[configured, COMPILED_DEFAULT_KEY])
}

fn resolve_with_fallbacks(
    db: &Database,
    fallbacks: &[Option<&str>],
) -> Result<SecretString, CredentialError> {
    if let Some(saved) = settings_repo::get(db, API_KEY_SETTING)? {
        if !saved.trim().is_empty() {
            return Ok(SecretString::from(saved));
        }
    }

    let fallback = fallbacks
        .iter()
        .flatten()
        .map(|k| k.trim())
        .find(|k| !k.is_empty());

    match fallback {
        Some(key) => {
            log::info!("Persisting default API key to settings");
            settings_repo::set(db, API_KEY_SETTING, key)?;
            Ok(SecretString::from(key.to_string()))
        }
        None => Err(CredentialError::Missing),
    }
}

/// Saves a user-supplied API key. Surrounding whitespace is dropped; an
/// empty key is rejected.
pub fn save_api_key(db: &Database, key: &str) -> Result<(), CredentialError> {
    let key = key.trim();
    if key.is_empty() {
        return Err(CredentialError::Empty);
    }
    settings_repo::set(db, API_KEY_SETTING, key)?;
    Ok(())
}

/// Returns the saved key, if any, without applying fallbacks.
pub fn stored_api_key(db: &Database) -> Result<Option<SecretString>, CredentialError> {
    Ok(settings_repo::get(db, API_KEY_SETTING)?
        .filter(|k| !k.trim().is_empty())
        .map(SecretString::from))
}
