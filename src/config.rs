use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::storage::ensure_data_dir;

pub const DEFAULT_CONFIG_PATH: &str = "config/chat.json";
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:5000";

const DATABASE_PATH_ENV: &str = "CHAT_DATABASE_PATH";
const LISTEN_ADDR_ENV: &str = "CHAT_LISTEN_ADDR";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub listen_addr: String,
    /// SQLite file. In-memory storage when unset.
    pub database_path: Option<String>,
    pub sweep_interval_secs: u64,
    pub stale_after_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            database_path: None,
            sweep_interval_secs: 15,
            stale_after_secs: 10,
        }
    }
}

impl AppConfig {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }

    /// Environment (including `.env`) wins over the config file.
    pub fn apply_env(&mut self) {
        if let Ok(path) = std::env::var(DATABASE_PATH_ENV) {
            if !path.is_empty() {
                self.database_path = Some(path);
            }
        }
        if let Ok(addr) = std::env::var(LISTEN_ADDR_ENV) {
            if !addr.is_empty() {
                self.listen_addr = addr;
            }
        }
    }

    /// Reads `path`, falling back to defaults when the file is absent or unusable.
    pub fn load(path: &Path) -> Self {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                log::info!("No config at {}; using defaults", path.display());
                return Self::default();
            }
            Err(err) => {
                log::warn!("Cannot read config {}: {err}; using defaults", path.display());
                return Self::default();
            }
        };

        serde_json::from_str(&content).unwrap_or_else(|err| {
            log::warn!("Invalid config {}: {err}; using defaults", path.display());
            Self::default()
        })
    }

    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        ensure_data_dir(path)?;
        fs::write(path, serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        assert_eq!(AppConfig::load(&path), AppConfig::default());
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(AppConfig::load(&path), AppConfig::default());
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.json");
        fs::write(&path, r#"{"stale_after_secs": 30}"#).unwrap();

        let config = AppConfig::load(&path);
        assert_eq!(config.stale_after(), Duration::from_secs(30));
        assert_eq!(config.sweep_interval(), Duration::from_secs(15));
        assert_eq!(config.listen_addr, DEFAULT_LISTEN_ADDR);
    }

    #[test]
    fn saved_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/chat.json");
        let config = AppConfig {
            database_path: Some("data/chat.db".into()),
            ..AppConfig::default()
        };

        config.save(&path).unwrap();
        assert_eq!(AppConfig::load(&path), config);
    }
}
