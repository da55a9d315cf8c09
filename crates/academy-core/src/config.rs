//! Application configuration management.
//!
//! Configuration is stored at `~/.config/academy/config.json` and covers the
//! backend URL, token storage backend, interface language and the last used
//! username. `ACADEMY_*` environment variables override the file.

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "academy";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Backend used when nothing is configured
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/";

/// Where access and refresh tokens are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenBackend {
    #[default]
    File,
    Keyring,
    Memory,
}

impl FromStr for TokenBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "file" => Ok(TokenBackend::File),
            "keyring" | "keychain" => Ok(TokenBackend::Keyring),
            "memory" => Ok(TokenBackend::Memory),
            other => Err(anyhow::anyhow!("Unknown token backend: {}", other)),
        }
    }
}

/// Interface language, matching the languages the platform publishes in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Ru,
    En,
    Ky,
}

impl FromStr for Language {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "ru" => Ok(Language::Ru),
            "en" => Ok(Language::En),
            "ky" => Ok(Language::Ky),
            other => Err(anyhow::anyhow!("Unsupported language: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub token_backend: TokenBackend,
    pub language: Language,
    pub last_username: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token_backend: TokenBackend::default(),
            language: Language::default(),
            last_username: None,
            request_timeout_secs: crate::api::client::DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str::<Self>(&contents).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    /// Load the file config, then apply `ACADEMY_*` environment overrides.
    pub fn load_with_env() -> Result<Self> {
        let mut config = Self::load()?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = lookup("ACADEMY_BASE_URL") {
            self.base_url = url;
        }
        if let Some(backend) = lookup("ACADEMY_TOKEN_BACKEND") {
            self.token_backend = backend.parse()?;
        }
        if let Some(language) = lookup("ACADEMY_LANGUAGE") {
            self.language = language.parse()?;
        }
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Cache directory, one per backend host so accounts don't mix
    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME).join(self.host_dir()?))
    }

    fn host_dir(&self) -> Result<String> {
        let url = Url::parse(&self.base_url)
            .with_context(|| format!("Invalid base URL: {}", self.base_url))?;
        let host = url.host_str().unwrap_or("default");
        Ok(match url.port() {
            Some(port) => format!("{}_{}", host, port),
            None => host.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.token_backend, TokenBackend::File);
        assert_eq!(config.language, Language::Ru);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{"language": "en"}"#).unwrap();
        assert_eq!(config.language, Language::En);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("ACADEMY_BASE_URL", "https://academy.example.kg/"),
            ("ACADEMY_TOKEN_BACKEND", "keychain"),
            ("ACADEMY_LANGUAGE", "ky"),
        ]);
        let mut config = Config::default();
        config
            .apply_env(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.base_url, "https://academy.example.kg/");
        assert_eq!(config.token_backend, TokenBackend::Keyring);
        assert_eq!(config.language, Language::Ky);
    }

    #[test]
    fn test_bad_env_value_is_an_error() {
        let mut config = Config::default();
        let result = config.apply_env(|key| {
            (key == "ACADEMY_TOKEN_BACKEND").then(|| "floppy".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_host_dir() {
        let mut config = Config::default();
        assert_eq!(config.host_dir().unwrap(), "localhost_8000");
        config.base_url = "https://academy.example.kg/".to_string();
        assert_eq!(config.host_dir().unwrap(), "academy.example.kg");
    }
}
