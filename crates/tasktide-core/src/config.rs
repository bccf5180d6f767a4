//! Application configuration management.
//!
//! Holds the last signed-in user, the default Pomodoro settings and the
//! cache tuning knobs.
//!
//! Configuration is stored at `~/.config/tasktide/config.json`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cache::DEFAULT_SWEEP_INTERVAL;
use crate::pomodoro::PomodoroSettings;

/// Application name used for config/cache/data directory paths
pub const APP_NAME: &str = "tasktide";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Log subdirectory under the app cache directory
const LOG_DIR: &str = "logs";

/// Environment variable that overrides the signed-in uid
pub const USER_ENV: &str = "TASKTIDE_USER";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub last_uid: Option<String>,
    pub pomodoro: PomodoroSettings,
    pub sweep_interval_secs: u64,
    /// Byte quota for the persistent cache tier; `None` is unlimited.
    pub cache_quota_bytes: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            last_uid: None,
            pomodoro: PomodoroSettings::default(),
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL.as_secs(),
            cache_quota_bytes: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path).context("Failed to read config file")?;
            Ok(serde_json::from_str(&contents).context("Failed to parse config file")?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// The uid to act as: `TASKTIDE_USER` if set, else the last signed-in uid.
    pub fn active_uid(&self) -> Option<String> {
        std::env::var(USER_ENV)
            .ok()
            .filter(|uid| !uid.trim().is_empty())
            .or_else(|| self.last_uid.clone())
    }

    /// Per-user cache directory, `<cache_dir>/tasktide[/<uid>]`.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir =
            dirs::cache_dir().ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(user_dir(&cache_dir.join(APP_NAME), self.active_uid().as_deref()))
    }

    /// Log directory, `<cache_dir>/tasktide/logs`, shared by every user and
    /// kept out of the per-user cache store.
    pub fn log_dir(&self) -> Result<PathBuf> {
        let cache_dir =
            dirs::cache_dir().ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(log_dir_in(&cache_dir))
    }

    /// Directory for the document snapshot and the auth session.
    pub fn data_dir(&self) -> Result<PathBuf> {
        let data_dir =
            dirs::data_dir().ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    pub fn sweep_interval(&self) -> Duration {
        if self.sweep_interval_secs == 0 {
            DEFAULT_SWEEP_INTERVAL
        } else {
            Duration::from_secs(self.sweep_interval_secs)
        }
    }
}

fn log_dir_in(cache_dir: &Path) -> PathBuf {
    cache_dir.join(APP_NAME).join(LOG_DIR)
}

fn user_dir(base: &Path, uid: Option<&str>) -> PathBuf {
    match uid {
        Some(uid) => base.join(uid),
        None => base.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.sweep_interval(), Duration::from_secs(300));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            last_uid: Some("u1".into()),
            sweep_interval_secs: 60,
            ..Default::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "last_uid": "u9" }"#).unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.last_uid.as_deref(), Some("u9"));
        assert_eq!(config.pomodoro, PomodoroSettings::default());
    }

    #[test]
    fn test_user_dir() {
        let base = Path::new("/tmp/tasktide");
        assert_eq!(user_dir(base, Some("u1")), PathBuf::from("/tmp/tasktide/u1"));
        assert_eq!(user_dir(base, None), PathBuf::from("/tmp/tasktide"));
    }

    #[test]
    fn test_log_dir_sits_outside_user_cache() {
        let cache = Path::new("/tmp/cache");
        let logs = log_dir_in(cache);
        assert_eq!(logs, PathBuf::from("/tmp/cache/tasktide/logs"));
        assert!(!logs.starts_with(user_dir(&cache.join(APP_NAME), Some("u1"))));
    }
}
