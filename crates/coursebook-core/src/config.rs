//! Application configuration management.
//!
//! This module handles loading the data-layer configuration:
//! where the static snapshot lives, cache and retry tuning, and where the
//! local overlay is persisted.
//!
//! Configuration is stored at `~/.config/coursebook/config.json`.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::fetch::RetryPolicy;

/// Application name used for config/data directory paths
const APP_NAME: &str = "coursebook";

/// Config file name
const CONFIG_FILE: &str = "config.json";

const ENV_DATA_DIR: &str = "COURSEBOOK_DATA_DIR";
const ENV_BASE_URL: &str = "COURSEBOOK_BASE_URL";
const ENV_OVERLAY_DIR: &str = "COURSEBOOK_OVERLAY_DIR";

const DEFAULT_CACHE_TTL_SECS: u64 = 300;
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_RETRY_DELAY_MS: u64 = 1000;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding `<resource>.json` snapshot files.
    pub data_dir: Option<PathBuf>,
    /// HTTP base serving `<resource>.json`; takes precedence over `data_dir`.
    pub base_url: Option<String>,
    pub cache_ttl_secs: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub request_timeout_secs: u64,
    pub overlay_dir: Option<PathBuf>,
    /// Run a background cache sweep this often; off when unset.
    pub sweep_interval_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            base_url: None,
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            overlay_dir: None,
            sweep_interval_secs: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    /// Apply `COURSEBOOK_*` environment variables on top of the file settings.
    pub fn with_env_overrides(mut self) -> Self {
        self.apply_overrides(|name| std::env::var(name).ok());
        self
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(dir) = lookup(ENV_DATA_DIR) {
            self.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(url) = lookup(ENV_BASE_URL) {
            self.base_url = Some(url);
        }
        if let Some(dir) = lookup(ENV_OVERLAY_DIR) {
            self.overlay_dir = Some(PathBuf::from(dir));
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn overlay_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.overlay_dir {
            return Ok(dir.clone());
        }
        let data_dir = dirs::data_local_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find local data directory"))?;
        Ok(data_dir.join(APP_NAME).join("overlay"))
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn sweep_interval(&self) -> Option<Duration> {
        self.sweep_interval_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_retries,
            Duration::from_millis(self.retry_delay_ms),
            self.request_timeout(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.cache_ttl(), Duration::from_secs(300));
        assert_eq!(config.sweep_interval(), None);

        let policy = config.retry_policy();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.retry_delay, Duration::from_secs(1));
        assert_eq!(policy.deadline, Some(Duration::from_secs(16)));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::TempDir::new().expect("Failed to create temp directory");
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"data_dir": "/srv/data", "max_retries": 5}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.data_dir, Some(PathBuf::from("/srv/data")));
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.retry_delay_ms, 1000);
    }

    #[test]
    fn test_extreme_retry_settings_do_not_overflow() {
        let dir = tempfile::TempDir::new().expect("Failed to create temp directory");
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"max_retries": 4294967295, "retry_delay_ms": 18446744073709551615}"#).unwrap();

        let policy = Config::load_from(&path).unwrap().retry_policy();
        assert_eq!(policy.total_delay(), Duration::from_millis(u64::MAX).saturating_mul(u32::MAX));
        assert!(policy.deadline.is_some());
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::TempDir::new().expect("Failed to create temp directory");
        let config = Config::load_from(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config {
            data_dir: Some(PathBuf::from("/from/file")),
            overlay_dir: Some(PathBuf::from("/overlay/file")),
            ..Config::default()
        };
        config.apply_overrides(|name| match name {
            "COURSEBOOK_DATA_DIR" => Some("/from/env".to_string()),
            "COURSEBOOK_BASE_URL" => Some("https://school.example/data".to_string()),
            "COURSEBOOK_OVERLAY_DIR" => Some("  ".to_string()),
            _ => None,
        });

        assert_eq!(config.data_dir, Some(PathBuf::from("/from/env")));
        assert_eq!(config.base_url.as_deref(), Some("https://school.example/data"));
        // Blank values are ignored
        assert_eq!(config.overlay_dir, Some(PathBuf::from("/overlay/file")));
    }

    #[test]
    fn test_explicit_overlay_dir_wins() {
        let config = Config {
            overlay_dir: Some(PathBuf::from("/tmp/overlay")),
            ..Config::default()
        };
        assert_eq!(config.overlay_dir().unwrap(), PathBuf::from("/tmp/overlay"));
    }
}
