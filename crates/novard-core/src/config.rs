use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use crate::models::StatusFilter;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub request_timeout_secs: u64,
    pub default_filter: StatusFilter,
    pub log_level: String,
    pub ocr_command: String,
    pub ocr_language: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: 60,
            default_filter: StatusFilter::Open,
            log_level: "info".to_string(),
            ocr_command: "tesseract".to_string(),
            ocr_language: "eng".to_string(),
        }
    }

    /// Load from the config directory, then let environment variables win.
    /// A missing file is created with the defaults.
    pub fn load() -> Result<Self> {
        let path = Self::get_config_path()?;
        if !path.exists() {
            let defaults = Self::new();
            match defaults.save() {
                Ok(()) => debug!(path = %path.display(), "wrote default config"),
                Err(e) => warn!(error = %e, "could not write default config"),
            }
        }

        let config = Self::load_from(&path)?;
        Ok(config.with_overrides(
            std::env::var("NOVARD_BASE_URL").ok(),
            std::env::var("NOVARD_OCR_COMMAND").ok(),
        ))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    pub fn with_overrides(mut self, base_url: Option<String>, ocr_command: Option<String>) -> Self {
        if let Some(url) = base_url.filter(|u| !u.trim().is_empty()) {
            self.base_url = url;
        }
        if let Some(command) = ocr_command.filter(|c| !c.trim().is_empty()) {
            self.ocr_command = command;
        }
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("novard"))
    }

    fn get_config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::new());
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"base_url": "http://backend:8000", "default_filter": "all"}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.base_url, "http://backend:8000");
        assert_eq!(config.default_filter, StatusFilter::All);
        assert_eq!(config.ocr_command, "tesseract");
    }

    #[test]
    fn test_save_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("novard").join("config.json");
        let mut config = Config::new();
        config.request_timeout_secs = 5;
        config.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_env_overrides_win_unless_blank() {
        let config = Config::new().with_overrides(Some("http://x:1".to_string()), Some("  ".to_string()));
        assert_eq!(config.base_url, "http://x:1");
        assert_eq!(config.ocr_command, "tesseract");
    }
}
