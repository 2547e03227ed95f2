//! `load_config` module: builds a [`SyncConfig`] from the process environment.
//!
//! Recognised variables:
//! - `OBJECT_STORE_BUCKET`: bucket name, also used as the dataset name
//! - `DOCUMENT_API_BASE_URL`: knowledge-base API root
//! - `DOCUMENT_API_KEY`: bearer credential
//!
//! All three are required. An empty value counts as missing.

use tracing::{error, info};

use crate::config::SyncConfig;
use crate::error::ConfigError;

pub const BUCKET_VAR: &str = "OBJECT_STORE_BUCKET";
pub const BASE_URL_VAR: &str = "DOCUMENT_API_BASE_URL";
pub const API_KEY_VAR: &str = "DOCUMENT_API_KEY";

fn required_var(name: &str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => {
            info!(var = name, "Environment variable found");
            Ok(value)
        }
        Ok(_) => {
            error!(var = name, "Environment variable is empty");
            Err(ConfigError::MissingEnvVar(name.to_string()))
        }
        Err(e) => {
            error!(error = ?e, var = name, "Environment variable not set");
            Err(ConfigError::MissingEnvVar(name.to_string()))
        }
    }
}

/// Read the configuration from the environment. Callers that want `.env`
/// support load it beforehand.
pub fn load_config() -> Result<SyncConfig, ConfigError> {
    let bucket = required_var(BUCKET_VAR)?;
    let api_base_url = required_var(BASE_URL_VAR)?;
    let api_key = required_var(API_KEY_VAR)?;

    let config = SyncConfig::new(bucket, api_base_url, api_key);
    config.trace_loaded();
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn set_all() {
        std::env::set_var(BUCKET_VAR, "team-docs");
        std::env::set_var(BASE_URL_VAR, "https://kb.example.com/v1");
        std::env::set_var(API_KEY_VAR, "dataset-key");
    }

    fn clear_all() {
        std::env::remove_var(BUCKET_VAR);
        std::env::remove_var(BASE_URL_VAR);
        std::env::remove_var(API_KEY_VAR);
    }

    #[test]
    #[serial]
    fn loads_all_variables() {
        set_all();

        let config = load_config().expect("config should load");
        assert_eq!(config.bucket(), "team-docs");
        assert_eq!(config.api_base_url(), "https://kb.example.com/v1");
        assert_eq!(config.api_key(), "dataset-key");

        clear_all();
    }

    #[test]
    #[serial]
    fn missing_key_is_reported_by_name() {
        set_all();
        std::env::remove_var(API_KEY_VAR);

        match load_config() {
            Err(ConfigError::MissingEnvVar(var)) => assert_eq!(var, API_KEY_VAR),
            other => panic!("expected missing {API_KEY_VAR}, got {other:?}"),
        }

        clear_all();
    }

    #[test]
    #[serial]
    fn empty_bucket_counts_as_missing() {
        set_all();
        std::env::set_var(BUCKET_VAR, "  ");

        match load_config() {
            Err(ConfigError::MissingEnvVar(var)) => assert_eq!(var, BUCKET_VAR),
            other => panic!("expected missing {BUCKET_VAR}, got {other:?}"),
        }

        clear_all();
    }
}
