//! Runtime configuration from environment variables
//!
//! Environment variables:
//! - `KUPO_URL` - Kupo indexer base URL (required unless running from the local cache)
//! - `DMTR_API_KEY` - API key sent as `dmtr-api-key` (optional)
//! - `REWARDS_DB_PATH` (default: data/rewards.db)
//! - `REWARDS_TABLE` (default: rewards_by_stake)
//! - `POLICY_CACHE_DIR` (default: policy)
//! - `DEBUG_DIR` (default: debug)
//! - `INDEXER_TIMEOUT_SECS` (default: 60)

use std::env;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub kupo_url: Option<String>,
    pub dmtr_api_key: Option<String>,
    pub db_path: String,
    pub rewards_table: String,
    pub policy_cache_dir: String,
    pub debug_dir: String,
    pub indexer_timeout: Duration,
}

impl RuntimeConfig {
    /// Load configuration from environment variables
    ///
    /// `require_indexer` is false for `--local` runs, which never call Kupo.
    pub fn from_env(require_indexer: bool) -> Result<Self, ConfigError> {
        let kupo_url = env::var("KUPO_URL").ok().filter(|s| !s.is_empty());

        match &kupo_url {
            Some(url) if !url.starts_with("http://") && !url.starts_with("https://") => {
                return Err(ConfigError::InvalidValue(
                    "KUPO_URL must start with http:// or https://".to_string(),
                ));
            }
            None if require_indexer => {
                return Err(ConfigError::MissingVariable("KUPO_URL".to_string()));
            }
            _ => {}
        }

        let dmtr_api_key = env::var("DMTR_API_KEY").ok().filter(|s| !s.is_empty());

        let rewards_table =
            env::var("REWARDS_TABLE").unwrap_or_else(|_| "rewards_by_stake".to_string());
        if crate::snapshot::db::validate_table_name(&rewards_table).is_err() {
            return Err(ConfigError::InvalidValue(format!(
                "REWARDS_TABLE '{}' is not a valid table name",
                rewards_table
            )));
        }

        let indexer_timeout_secs = match env::var("INDEXER_TIMEOUT_SECS") {
            Ok(s) => s.parse::<u64>().map_err(|_| {
                ConfigError::InvalidValue(format!("INDEXER_TIMEOUT_SECS '{}' is not a number", s))
            })?,
            Err(_) => 60,
        };

        Ok(Self {
            kupo_url,
            dmtr_api_key,
            db_path: env::var("REWARDS_DB_PATH").unwrap_or_else(|_| "data/rewards.db".to_string()),
            rewards_table,
            policy_cache_dir: env::var("POLICY_CACHE_DIR").unwrap_or_else(|_| "policy".to_string()),
            debug_dir: env::var("DEBUG_DIR").unwrap_or_else(|_| "debug".to_string()),
            indexer_timeout: Duration::from_secs(indexer_timeout_secs),
        })
    }
}
