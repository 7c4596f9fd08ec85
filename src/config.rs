use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Result, anyhow};

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";
pub const DEFAULT_TITLE: &str = "铁路专业知识AI";
pub const BASE_URL_ENV: &str = "RAILCHAT_API_BASE_URL";

/// Base URL baked in at compile time, if the build environment set one.
fn build_time_base_url() -> &'static str {
    option_env!("RAILCHAT_API_BASE_URL").unwrap_or(DEFAULT_BASE_URL)
}

/// On-disk configuration. Every field is optional.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)
            .map_err(|e| anyhow!("Invalid config file {}: {}", path.display(), e))?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    /// Persist a new base URL. An unreadable or corrupt file is replaced
    /// rather than blocking the repair.
    pub fn save_base_url(path: &Path, url: &str) -> Result<()> {
        let mut config = Self::load_from(path).unwrap_or_default();
        config.base_url = Some(url.trim().to_string());
        config.save_to(path)
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("railchat").join("config.json"))
    }
}

/// Values given on the command line; they win over everything else.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub base_url: Option<String>,
    pub title: Option<String>,
    pub timeout_secs: Option<u64>,
    pub log_file: Option<PathBuf>,
}

/// Fully resolved settings the app runs with.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Settings {
    pub base_url: String,
    pub title: String,
    pub timeout_secs: Option<u64>,
    pub log_file: PathBuf,
}

impl Settings {
    /// Layer CLI overrides, then the environment value, then the config file,
    /// then the compiled-in defaults.
    pub fn resolve(config: Config, overrides: Overrides, env_base_url: Option<String>) -> Self {
        let base_url = non_blank(overrides.base_url)
            .or_else(|| non_blank(env_base_url))
            .or_else(|| non_blank(config.base_url))
            .unwrap_or_else(|| build_time_base_url().to_string());

        let title = non_blank(overrides.title)
            .or_else(|| non_blank(config.title))
            .unwrap_or_else(|| DEFAULT_TITLE.to_string());

        let timeout_secs = overrides
            .timeout_secs
            .or(config.timeout_secs)
            .filter(|secs| *secs > 0);

        let log_file = overrides
            .log_file
            .or(config.log_file)
            .unwrap_or_else(default_log_file);

        Self {
            base_url,
            title,
            timeout_secs,
            log_file,
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn default_log_file() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("railchat")
        .join("railchat.log")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_default() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            base_url: Some("http://rail.internal:8080".to_string()),
            timeout_secs: Some(30),
            ..Config::default()
        };

        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);

        let raw = fs::read_to_string(&path).unwrap();
        assert!(!raw.contains("title"));
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_save_base_url_keeps_other_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        Config {
            title: Some("Rail AI".to_string()),
            ..Config::default()
        }
        .save_to(&path)
        .unwrap();

        Config::save_base_url(&path, " http://rail.internal ").unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.base_url.as_deref(), Some("http://rail.internal"));
        assert_eq!(config.title.as_deref(), Some("Rail AI"));
    }

    #[test]
    fn test_save_base_url_repairs_corrupt_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        Config::save_base_url(&path, "http://localhost:5000").unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.base_url.as_deref(), Some("http://localhost:5000"));
    }

    #[test]
    fn test_resolve_defaults() {
        let settings = Settings::resolve(Config::default(), Overrides::default(), None);
        assert_eq!(settings.base_url, build_time_base_url());
        assert_eq!(settings.title, DEFAULT_TITLE);
        assert_eq!(settings.timeout(), None);
        assert!(settings.log_file.ends_with("railchat/railchat.log"));
    }

    #[test]
    fn test_resolve_precedence() {
        let config = Config {
            base_url: Some("http://from-file".to_string()),
            title: Some("File title".to_string()),
            timeout_secs: Some(5),
            log_file: None,
        };

        let settings = Settings::resolve(
            config.clone(),
            Overrides::default(),
            Some("http://from-env".to_string()),
        );
        assert_eq!(settings.base_url, "http://from-env");
        assert_eq!(settings.title, "File title");
        assert_eq!(settings.timeout(), Some(Duration::from_secs(5)));

        let settings = Settings::resolve(
            config.clone(),
            Overrides {
                base_url: Some("http://from-cli".to_string()),
                timeout_secs: Some(0),
                ..Overrides::default()
            },
            Some("http://from-env".to_string()),
        );
        assert_eq!(settings.base_url, "http://from-cli");
        assert_eq!(settings.timeout(), None);

        let settings = Settings::resolve(config, Overrides::default(), Some("   ".to_string()));
        assert_eq!(settings.base_url, "http://from-file");
    }
}
