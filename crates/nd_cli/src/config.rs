use std::path::{Path, PathBuf};

use nd_core::{Error, Result};
use nd_scheduler::ScheduleConfig;
use nd_scrapers::ScrapeConfig;
use nd_storage::StorageConfig;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Everything the daemon needs, read from a JSON file. Missing keys fall
/// back to their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub fetch: ScheduleConfig,
    #[serde(default = "ScheduleConfig::cleanup")]
    pub cleanup: ScheduleConfig,
    pub scrape: ScrapeConfig,
    pub retention_days: u32,
    pub status_path: PathBuf,
    pub storage: StorageConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gemini_api_key: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            fetch: ScheduleConfig::fetch(),
            cleanup: ScheduleConfig::cleanup(),
            scrape: ScrapeConfig::default(),
            retention_days: 30,
            status_path: PathBuf::from("scheduler_status.json"),
            storage: StorageConfig::default(),
            gemini_api_key: None,
        }
    }
}

impl AppConfig {
    /// Read `path`, or use the defaults when there is no file there.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(path = %path.display(), "No config file, using default configuration");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&raw)
            .map_err(|e| Error::Config(format!("Invalid config file {}: {}", path.display(), e)))?;
        info!(path = %path.display(), "Loaded configuration from file");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = AppConfig::load(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.fetch.interval(), Duration::from_secs(45 * 60));
        assert_eq!(config.cleanup.interval(), Duration::from_secs(12 * 3600));
    }

    #[test]
    fn test_partial_file_merges_with_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{
                "fetch": {"interval_secs": 1800},
                "retention_days": 7,
                "storage": {"backend": "sqlite", "path": "news.db"},
                "scrape": {"max_concurrent_fetches": 2}
            }"#,
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.fetch.interval(), Duration::from_secs(1800));
        assert_eq!(config.fetch.max_attempts, 3);
        assert_eq!(config.cleanup, ScheduleConfig::cleanup());
        assert_eq!(config.retention_days, 7);
        assert_eq!(config.scrape.max_concurrent_fetches, 2);
        assert_eq!(config.scrape.min_delay_secs, 1.5);
        assert_eq!(
            config.storage,
            StorageConfig::Sqlite {
                path: PathBuf::from("news.db")
            }
        );
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(AppConfig::load(&path), Err(Error::Config(_))));
    }
}
