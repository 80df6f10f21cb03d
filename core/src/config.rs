//! Process-wide configuration: cache root, store path, object-store
//! endpoint, and scheduler tuning knobs, loaded once at startup and passed
//! to every component via explicit dependencies (no ambient globals).
//!
//! Layered the way the teacher's `Settings::init` does it: a TOML file
//! source, overridden by `SETLIST_`-prefixed environment variables.

use std::path::PathBuf;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize, Default, PartialEq)]
pub struct Settings {
    #[serde(default)]
    pub scheduler: SchedulerSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub engine: EngineSettings,
    #[serde(default)]
    pub object_store: ObjectStoreSettings,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct SchedulerSettings {
    pub max_concurrent_lrc: usize,
    pub analyze_timeout_seconds: u64,
    pub lrc_timeout_seconds: u64,
    pub retention_days: u64,
    pub job_store_path: PathBuf,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            max_concurrent_lrc: 2,
            analyze_timeout_seconds: 600,
            lrc_timeout_seconds: 300,
            retention_days: 7,
            job_store_path: PathBuf::from("setlist-jobs.db"),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheSettings {
    pub root: PathBuf,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            root: PathBuf::from("cache"),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineSettings {
    pub output_sample_rate: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            output_sample_rate: 44100,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct ObjectStoreSettings {
    pub endpoint: Option<String>,
}

impl Settings {
    /// Load settings from a config file and `SETLIST_`-prefixed environment
    /// variables; the environment always wins for an overlapping key.
    ///
    /// # Errors
    /// Returns a [`ConfigError`] if the file is missing or malformed.
    pub fn init(config_path: PathBuf) -> Result<Self, ConfigError> {
        let built = Config::builder()
            .add_source(File::from(config_path).required(false))
            .add_source(Environment::with_prefix("SETLIST").separator("__"))
            .build()?;
        built.try_deserialize()
    }
}

/// Credentials and bearer token required at process startup. Their absence
/// is a startup-time `ConfigError`, never a per-call error, per the
/// external-interfaces "Environment" contract.
#[derive(Clone, Debug, PartialEq)]
pub struct EnvCredentials {
    pub object_store_access_key: String,
    pub object_store_secret_key: String,
    pub job_api_bearer_token: String,
    pub llm_endpoint: Option<String>,
    pub llm_api_key: Option<String>,
    pub llm_model: Option<String>,
}

impl EnvCredentials {
    /// # Errors
    /// Returns a [`ConfigError::NotFound`] naming the first missing
    /// required variable.
    pub fn from_env() -> Result<Self, ConfigError> {
        let required = |name: &str| {
            std::env::var(name).map_err(|_| ConfigError::NotFound(name.to_owned()))
        };
        Ok(Self {
            object_store_access_key: required("SETLIST_OBJECT_STORE_ACCESS_KEY")?,
            object_store_secret_key: required("SETLIST_OBJECT_STORE_SECRET_KEY")?,
            job_api_bearer_token: required("SETLIST_JOB_API_TOKEN")?,
            llm_endpoint: std::env::var("SETLIST_LLM_ENDPOINT").ok(),
            llm_api_key: std::env::var("SETLIST_LLM_API_KEY").ok(),
            llm_model: std::env::var("SETLIST_LLM_MODEL").ok(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let s = Settings::default();
        assert_eq!(s.scheduler.max_concurrent_lrc, 2);
        assert_eq!(s.engine.output_sample_rate, 44100);
        assert_eq!(s.scheduler.retention_days, 7);
    }
}
