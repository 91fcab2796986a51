use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::connectivity::DEFAULT_POLL_INTERVAL;
use crate::pagination::DEFAULT_PAGE_SIZE;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:3000/api";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ConsoleConfig {
    pub api_url: String,
    pub page_size: u32,
    pub page_size_options: Vec<u32>,
    pub poll_interval_secs: u64,
    pub export_dir: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            page_size_options: vec![10, 25, 50, 100],
            poll_interval_secs: DEFAULT_POLL_INTERVAL.as_secs(),
            export_dir: None,
            log_file: None,
        }
    }
}

impl ConsoleConfig {
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    #[must_use]
    pub fn export_dir(&self) -> PathBuf {
        self.export_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn normalize(&mut self) {
        if self.page_size == 0 {
            self.page_size = DEFAULT_PAGE_SIZE;
        }
        self.page_size_options.retain(|size| *size > 0);
        if !self.page_size_options.contains(&self.page_size) {
            self.page_size_options.push(self.page_size);
        }
        self.page_size_options.sort_unstable();
        self.page_size_options.dedup();
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config directory is unavailable for this platform")]
    ConfigDirUnavailable,
    #[error("failed to read config file at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

pub fn load_default() -> Result<ConsoleConfig, ConfigError> {
    let path = default_config_path()?;
    load_from_path(&path)
}

pub fn load_from_path(path: &Path) -> Result<ConsoleConfig, ConfigError> {
    if !path.exists() {
        return Ok(ConsoleConfig::default());
    }

    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    if raw.trim().is_empty() {
        return Ok(ConsoleConfig::default());
    }

    let mut config: ConsoleConfig = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    config.normalize();
    Ok(config)
}

pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    let base_dir = if let Some(custom) = env::var_os("TABLESCOPE_CONFIG_DIR") {
        PathBuf::from(custom)
    } else if cfg!(target_os = "windows") {
        env::var_os("APPDATA")
            .map(PathBuf::from)
            .ok_or(ConfigError::ConfigDirUnavailable)?
    } else if let Some(xdg_config_home) = env::var_os("XDG_CONFIG_HOME") {
        PathBuf::from(xdg_config_home)
    } else {
        let home = env::var_os("HOME").ok_or(ConfigError::ConfigDirUnavailable)?;
        PathBuf::from(home).join(".config")
    };

    Ok(base_dir.join("tablescope").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;
    use std::time::Duration;

    use tempfile::TempDir;

    use super::{load_from_path, ConfigError, ConsoleConfig, DEFAULT_API_URL};

    #[test]
    fn missing_config_file_loads_defaults() {
        let temp_dir = TempDir::new().expect("failed to create temp directory");

        let config =
            load_from_path(&temp_dir.path().join("config.toml")).expect("defaults should load");

        assert_eq!(config, ConsoleConfig::default());
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.page_size, 25);
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
    }

    #[test]
    fn partial_config_keeps_defaults_for_missing_keys() {
        let temp_dir = TempDir::new().expect("failed to create temp directory");
        let path = temp_dir.path().join("config.toml");
        fs::write(
            &path,
            "api_url = \"http://db-console.internal/api\"\npage_size = 40\nexport_dir = \"/tmp/exports\"\n",
        )
        .expect("failed to write config");

        let config = load_from_path(&path).expect("config should load");

        assert_eq!(config.api_url, "http://db-console.internal/api");
        assert_eq!(config.page_size, 40);
        assert_eq!(config.page_size_options, vec![10, 25, 40, 50, 100]);
        assert_eq!(config.export_dir(), PathBuf::from("/tmp/exports"));
        assert_eq!(config.poll_interval_secs, 5);
    }

    #[test]
    fn malformed_config_reports_parse_error() {
        let temp_dir = TempDir::new().expect("failed to create temp directory");
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "page_size = \"lots\"").expect("failed to write config");

        let error = load_from_path(&path).expect_err("config should fail to parse");
        assert!(matches!(error, ConfigError::Parse { .. }));
    }

    #[test]
    fn zero_page_size_falls_back_to_default() {
        let temp_dir = TempDir::new().expect("failed to create temp directory");
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "page_size = 0\npage_size_options = [0, 5]").expect("write");

        let config = load_from_path(&path).expect("config should load");

        assert_eq!(config.page_size, 25);
        assert_eq!(config.page_size_options, vec![5, 25]);
    }
}
