//! Configuration loading and management
//!
//! Handles parsing of `taskflow.toml`, found in the data directory unless a
//! path is given explicitly.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::achievements::TrackThresholds;
use crate::error::{Error, Result};
use crate::store::DEFAULT_NAMESPACE;

/// Config file name inside the data directory
pub const CONFIG_FILE: &str = "taskflow.toml";

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Prefix for every storage key
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Hosted store connection
    #[serde(default)]
    pub remote: RemoteConfig,

    /// Achievement thresholds
    #[serde(default)]
    pub achievements: TrackThresholds,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            remote: RemoteConfig::default(),
            achievements: TrackThresholds::default(),
        }
    }
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

/// Remote store configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Project base URL, e.g. `https://project.supabase.co`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Public (anon) API key sent with every request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Per-request timeout
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    10_000
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl RemoteConfig {
    /// URL and key, when both are set
    pub fn endpoint(&self) -> Option<(&str, &str)> {
        let url = self.url.as_deref().filter(|url| !url.trim().is_empty())?;
        let key = self.api_key.as_deref().filter(|key| !key.trim().is_empty())?;
        Some((url, key))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    fn validate(&self) -> Result<()> {
        if self.timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "remote.timeout_ms must be greater than 0".to_string(),
            ));
        }
        if let Some(url) = &self.url {
            let url = url.trim();
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                return Err(Error::InvalidConfig(format!(
                    "remote.url must be an http(s) URL, got '{url}'"
                )));
            }
        }
        Ok(())
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `path`, or return defaults
    ///
    /// A missing file is normal. An invalid one is logged and ignored.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "ignoring invalid config");
                Self::default()
            }
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        validate_namespace(&self.namespace)?;
        self.remote.validate()?;
        self.achievements.validate()
    }
}

fn validate_namespace(namespace: &str) -> Result<()> {
    if namespace.is_empty() {
        return Err(Error::InvalidConfig(
            "namespace cannot be empty".to_string(),
        ));
    }
    if !namespace
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
    {
        return Err(Error::InvalidConfig(format!(
            "namespace must be alphanumeric, '-' or '_', got '{namespace}'"
        )));
    }
    Ok(())
}

/// Platform data directory for taskflow
pub fn default_data_dir() -> Result<PathBuf> {
    ProjectDirs::from("", "", "taskflow")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| {
            Error::InvalidConfig(
                "cannot determine a data directory; pass --data-dir or set TASKFLOW_DATA_DIR"
                    .to_string(),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::achievements::Thresholds;

    #[test]
    fn empty_file_yields_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.remote.timeout_ms, 10_000);
        assert!(config.remote.endpoint().is_none());
    }

    #[test]
    fn partial_achievements_keep_other_tracks() {
        let config: Config = toml::from_str(
            r#"
            [achievements]
            streak = [2, 4, 8, 16, 32]
            "#,
        )
        .unwrap();
        assert_eq!(config.achievements.streak, Thresholds([2, 4, 8, 16, 32]));
        assert_eq!(
            config.achievements.tasks_completed,
            Thresholds::TASKS_COMPLETED
        );
    }

    #[test]
    fn bad_namespace_is_rejected() {
        let config = Config {
            namespace: "my tasks".to_string(),
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let mut config = Config::default();
        config.remote.timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn endpoint_needs_url_and_key() {
        let mut remote = RemoteConfig {
            url: Some("https://x.supabase.co".to_string()),
            ..RemoteConfig::default()
        };
        assert!(remote.endpoint().is_none());
        remote.api_key = Some("anon".to_string());
        assert_eq!(remote.endpoint(), Some(("https://x.supabase.co", "anon")));
    }
}
