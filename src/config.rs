use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Result, anyhow};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_ENDPOINT: &str = "/ask_ai";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub base_url: Option<String>,
    pub endpoint: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub timeout_secs: Option<u64>,
    pub log_file: Option<PathBuf>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            tracing::debug!(path = %config_path.display(), "no config file, using defaults");
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(config_path)?;
        let config: Config = serde_json::from_str(&config_content)
            .map_err(|e| anyhow!("Invalid config file {:?}: {}", config_path, e))?;
        tracing::debug!(path = %config_path.display(), "loaded config");
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(config_path, config_content)?;
        Ok(())
    }

    /// Apply `COMPANION_*` environment variables on top of the file values
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup("COMPANION_URL") {
            self.base_url = Some(url);
        }
        if let Some(email) = lookup("COMPANION_EMAIL") {
            self.email = Some(email);
        }
        if let Some(password) = lookup("COMPANION_PASSWORD") {
            self.password = Some(password);
        }
        self
    }

    /// A URL given on the command line wins over both the file and the env
    pub fn with_url_override(mut self, url: Option<String>) -> Self {
        if let Some(url) = url {
            self.base_url = Some(url);
        }
        self
    }

    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    /// Login credentials, only when both halves are present
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.email, &self.password) {
            (Some(email), Some(password)) => Some((email.as_str(), password.as_str())),
            _ => None,
        }
    }

    pub fn log_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.log_file {
            return Ok(path.clone());
        }
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow!("Could not determine cache directory"))?;

        Ok(cache_dir.join("companion-chat").join("companion-chat.log"))
    }

    fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("companion-chat").join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::new());
        assert_eq!(config.base_url(), DEFAULT_BASE_URL);
        assert_eq!(config.endpoint(), "/ask_ai");
        assert_eq!(config.timeout(), Duration::from_secs(60));
        assert!(config.credentials().is_none());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            base_url: Some("http://companion.local/".to_string()),
            email: Some("student@example.com".to_string()),
            password: Some("hunter2".to_string()),
            timeout_secs: Some(5),
            ..Config::new()
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.base_url(), "http://companion.local");
        assert_eq!(loaded.credentials(), Some(("student@example.com", "hunter2")));
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_env_overrides_file_values() {
        let env: HashMap<&str, &str> = [
            ("COMPANION_URL", "http://override:8000"),
            ("COMPANION_EMAIL", "env@example.com"),
        ]
        .into_iter()
        .collect();

        let config = Config {
            base_url: Some("http://file:5000".to_string()),
            password: Some("pw".to_string()),
            ..Config::new()
        }
        .with_overrides_from(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.base_url(), "http://override:8000");
        assert_eq!(config.credentials(), Some(("env@example.com", "pw")));
    }

    #[test]
    fn test_cli_url_beats_env_and_file() {
        let file = Config {
            base_url: Some("http://file:5000".to_string()),
            ..Config::new()
        };
        let env = |key: &str| (key == "COMPANION_URL").then(|| "http://env:5000".to_string());

        let from_cli = file
            .clone()
            .with_overrides_from(env)
            .with_url_override(Some("http://cli:5000".to_string()));
        assert_eq!(from_cli.base_url(), "http://cli:5000");

        let no_cli = file.with_overrides_from(env).with_url_override(None);
        assert_eq!(no_cli.base_url(), "http://env:5000");
    }
}
