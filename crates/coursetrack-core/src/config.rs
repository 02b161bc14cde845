//! Application configuration management.
//!
//! This module handles loading the configuration, which holds the content
//! store URL, an optional static access token and the request timeout.
//!
//! Configuration is stored at `~/.config/coursetrack/config.json`. Values can
//! be overridden from the environment (`COURSETRACK_URL`, `COURSETRACK_TOKEN`,
//! `COURSETRACK_TIMEOUT_SECS`); the lookup is injected so the core never reads
//! process state on its own.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Application name used for the config directory path
const APP_NAME: &str = "coursetrack";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// HTTP request timeout used when none is configured.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const ENV_URL: &str = "COURSETRACK_URL";
pub const ENV_TOKEN: &str = "COURSETRACK_TOKEN";
pub const ENV_TIMEOUT: &str = "COURSETRACK_TIMEOUT_SECS";

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    pub base_url: Option<String>,
    pub token: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Apply overrides from an environment lookup. Empty values are ignored.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = lookup(ENV_URL) {
            self.base_url = Some(url);
        }
        if let Some(token) = lookup(ENV_TOKEN) {
            self.token = Some(token);
        }
        if let Some(timeout) = lookup(ENV_TIMEOUT) {
            let secs = timeout
                .trim()
                .parse()
                .with_context(|| format!("{} must be a number of seconds, got {:?}", ENV_TIMEOUT, timeout))?;
            self.request_timeout_secs = Some(secs);
        }
        Ok(self)
    }

    /// Base URL without trailing slash. Fails if none is configured.
    pub fn base_url(&self) -> Result<String> {
        let url = self
            .base_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| anyhow::anyhow!("No content store URL configured (set {})", ENV_URL))?;

        if !(url.starts_with("http://") || url.starts_with("https://")) {
            anyhow::bail!("Content store URL must start with http:// or https://, got {}", url);
        }
        Ok(url.trim_end_matches('/').to_string())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_env_overrides_file_values() {
        let config = Config {
            base_url: Some("https://file.example".into()),
            token: Some("file-token".into()),
            request_timeout_secs: None,
        }
        .with_env_overrides(env(&[(ENV_URL, "https://env.example/"), (ENV_TOKEN, "")]))
        .expect("overrides");

        assert_eq!(config.base_url().expect("url"), "https://env.example");
        // empty env values do not clobber the file
        assert_eq!(config.token.as_deref(), Some("file-token"));
        assert_eq!(config.request_timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[test]
    fn test_invalid_timeout_rejected() {
        let result = Config::default().with_env_overrides(env(&[(ENV_TIMEOUT, "soon")]));
        assert!(result.is_err());

        let config = Config::default()
            .with_env_overrides(env(&[(ENV_TIMEOUT, " 5 ")]))
            .expect("overrides");
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_base_url_validation() {
        assert!(Config::default().base_url().is_err());

        let config = Config {
            base_url: Some("ftp://cms.example".into()),
            ..Config::default()
        };
        assert!(config.base_url().is_err());
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let path = std::env::temp_dir().join("coursetrack-missing-config-test.json");
        let config = Config::load_from(&path).expect("load");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("coursetrack-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"base_url": "https://cms.example", "request_timeout_secs": 10}"#)
            .expect("write config");
        let config = Config::load_from(&path).expect("load");
        let _ = std::fs::remove_file(&path);

        assert_eq!(config.base_url.as_deref(), Some("https://cms.example"));
        assert_eq!(config.token, None);
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
    }
}
