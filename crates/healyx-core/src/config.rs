//! Backend configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Storage bucket patient files are uploaded to.
pub const DEFAULT_STORAGE_BUCKET: &str = "patient-files";

/// HTTP timeout when none is configured.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const ENV_URL: &str = "HEALYX_BACKEND_URL";
pub const ENV_ANON_KEY: &str = "HEALYX_ANON_KEY";
pub const ENV_STORAGE_BUCKET: &str = "HEALYX_STORAGE_BUCKET";
pub const ENV_TIMEOUT_SECS: &str = "HEALYX_TIMEOUT_SECS";

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing configuration value: {0}")]
    Missing(&'static str),

    #[error("Invalid configuration value for {key}: {value}")]
    Invalid { key: &'static str, value: String },

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Json(#[from] serde_json::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Where the hosted backend lives and how to talk to it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackendConfig {
    /// Project URL, e.g. "https://abc.supabase.co"
    pub url: String,
    /// Public anonymous API key
    pub anon_key: String,
    #[serde(default = "default_bucket")]
    pub storage_bucket: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_bucket() -> String {
    DEFAULT_STORAGE_BUCKET.to_string()
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl BackendConfig {
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            anon_key: anon_key.into(),
            storage_bucket: default_bucket(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Read from the process environment.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = lookup(ENV_URL).ok_or(ConfigError::Missing(ENV_URL))?;
        let anon_key = lookup(ENV_ANON_KEY).ok_or(ConfigError::Missing(ENV_ANON_KEY))?;

        let mut config = Self::new(url, anon_key);
        if let Some(bucket) = lookup(ENV_STORAGE_BUCKET) {
            config.storage_bucket = bucket;
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            config.timeout_secs = raw.trim().parse().map_err(|_| ConfigError::Invalid {
                key: ENV_TIMEOUT_SECS,
                value: raw.clone(),
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Read a JSON config file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        let url = self.url.trim();
        if url.is_empty() {
            return Err(ConfigError::Missing(ENV_URL));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                key: ENV_URL,
                value: self.url.clone(),
            });
        }
        if self.anon_key.trim().is_empty() {
            return Err(ConfigError::Missing(ENV_ANON_KEY));
        }
        if self.storage_bucket.trim().is_empty() {
            return Err(ConfigError::Missing(ENV_STORAGE_BUCKET));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: ENV_TIMEOUT_SECS,
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_from_lookup_defaults() {
        let config = BackendConfig::from_lookup(lookup(&[
            (ENV_URL, "https://demo.supabase.co"),
            (ENV_ANON_KEY, "anon"),
        ]))
        .unwrap();
        assert_eq!(config.storage_bucket, "patient-files");
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = BackendConfig::from_lookup(lookup(&[
            (ENV_URL, "https://demo.supabase.co"),
            (ENV_ANON_KEY, "anon"),
            (ENV_STORAGE_BUCKET, "scans"),
            (ENV_TIMEOUT_SECS, "5"),
        ]))
        .unwrap();
        assert_eq!(config.storage_bucket, "scans");
        assert_eq!(config.timeout_secs, 5);
    }

    #[test]
    fn test_missing_and_invalid_values() {
        assert!(matches!(
            BackendConfig::from_lookup(lookup(&[(ENV_ANON_KEY, "anon")])),
            Err(ConfigError::Missing(ENV_URL))
        ));
        assert!(matches!(
            BackendConfig::from_lookup(lookup(&[
                (ENV_URL, "https://demo.supabase.co"),
                (ENV_ANON_KEY, "anon"),
                (ENV_TIMEOUT_SECS, "soon"),
            ])),
            Err(ConfigError::Invalid { key: ENV_TIMEOUT_SECS, .. })
        ));
        assert!(BackendConfig::new("ftp://demo", "anon").validate().is_err());
        assert!(BackendConfig::new("https://demo", "  ").validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"url": "https://demo.supabase.co", "anon_key": "anon", "timeout_secs": 12}}"#
        )
        .unwrap();

        let config = BackendConfig::from_file(file.path()).unwrap();
        assert_eq!(config.url, "https://demo.supabase.co");
        assert_eq!(config.timeout_secs, 12);
        assert_eq!(config.storage_bucket, DEFAULT_STORAGE_BUCKET);
    }
}
