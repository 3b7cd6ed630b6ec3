use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    #[serde(default = "default_extractor_api_url")]
    pub extractor_api_url: String,

    pub extractor_api_key: Option<String>,

    /// Shared secret for saving pages. When unset, anyone may save.
    pub access_key: Option<String>,

    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_db_path() -> String {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("shelfmark");
    std::fs::create_dir_all(&data_dir).ok();
    data_dir.join("bookmarks.db").to_string_lossy().to_string()
}

fn default_extractor_api_url() -> String {
    "https://mercury.postlight.com".to_string()
}

fn default_page_size() -> u32 {
    25
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            extractor_api_url: default_extractor_api_url(),
            extractor_api_key: None,
            access_key: None,
            page_size: default_page_size(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("shelfmark")
            .join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: Config = toml::from_str(r#"db_path = "/tmp/test.db""#).unwrap();

        assert_eq!(config.db_path, "/tmp/test.db");
        assert_eq!(config.extractor_api_url, "https://mercury.postlight.com");
        assert!(config.extractor_api_key.is_none());
        assert!(config.access_key.is_none());
        assert_eq!(config.page_size, 25);
    }

    #[test]
    fn full_config_round_trips_through_toml() {
        let config: Config = toml::from_str(
            r#"
            db_path = "/tmp/test.db"
            extractor_api_url = "http://localhost:3000"
            extractor_api_key = "k3y"
            access_key = "sekret"
            page_size = 10
            "#,
        )
        .unwrap();
        assert_eq!(config.extractor_api_url, "http://localhost:3000");
        assert_eq!(config.extractor_api_key.as_deref(), Some("k3y"));
        assert_eq!(config.access_key.as_deref(), Some("sekret"));
        assert_eq!(config.page_size, 10);

        let rendered = toml::to_string_pretty(&config).unwrap();
        let reparsed: Config = toml::from_str(&rendered).unwrap();
        assert_eq!(reparsed.access_key.as_deref(), Some("sekret"));
        assert_eq!(reparsed.page_size, 10);
    }
}
