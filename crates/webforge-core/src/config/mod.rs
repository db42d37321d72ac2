//! Configuration management with file persistence

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable overriding the configuration directory
pub const CONFIG_DIR_ENV: &str = "WEBFORGE_CONFIG_DIR";

/// Environment variables consulted when no API key is stored in the settings
pub const API_KEY_ENV_VARS: &[&str] = &["WEBFORGE_API_KEY", "OPENAI_API_KEY"];

/// Webforge configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub preview: PreviewConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: usize,
    /// Request timeout; `None` waits for the service indefinitely
    pub timeout_secs: Option<u64>,
    /// Fall back to `WEBFORGE_API_KEY` / `OPENAI_API_KEY` when no key is stored
    pub env_key_fallback: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Delay before the settings surface is reopened after a quota failure
    pub settings_reopen_delay_ms: u64,
    /// Where preview documents are written; defaults to `<config_dir>/preview`
    pub output_dir: Option<PathBuf>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            temperature: 0.7,
            max_tokens: 2000,
            timeout_secs: None,
            env_key_fallback: true,
        }
    }
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            settings_reopen_delay_ms: 1000,
            output_dir: None,
        }
    }
}

impl LlmConfig {
    /// Resolve the credential: the stored settings key wins, then the environment
    pub fn resolve_api_key(&self, stored: &str) -> Option<String> {
        let stored = stored.trim();
        if !stored.is_empty() {
            return Some(stored.to_string());
        }
        if !self.env_key_fallback {
            return None;
        }

        API_KEY_ENV_VARS
            .iter()
            .filter_map(|var| env::var(var).ok())
            .map(|key| key.trim().to_string())
            .find(|key| !key.is_empty())
    }
}

/// Redact an API key for display, keeping the last four characters
pub fn redact_api_key(key: &str) -> String {
    let len = key.chars().count();
    if len == 0 {
        "(not set)".to_string()
    } else if len <= 4 {
        "***".to_string()
    } else {
        let suffix: String = key.chars().skip(len - 4).collect();
        format!("***{}", suffix)
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        let dir = if let Ok(custom_dir) = env::var(CONFIG_DIR_ENV) {
            PathBuf::from(custom_dir)
        } else {
            dirs::config_dir()
                .ok_or_else(|| anyhow!("Could not determine config directory"))?
                .join("webforge")
        };
        Ok(dir)
    }

    /// Get the config file path
    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Directory receiving preview documents
    pub fn preview_dir(&self) -> anyhow::Result<PathBuf> {
        match &self.preview.output_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(Self::config_dir()?.join("preview")),
        }
    }

    /// Load configuration from file, or the defaults if it doesn't exist
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config: Config = toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to an explicit path
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        self.validate()?;

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(anyhow!("Temperature must be between 0.0 and 2.0"));
        }
        if self.llm.max_tokens == 0 {
            return Err(anyhow!("max_tokens must be greater than zero"));
        }
        if self.llm.base_url.trim().is_empty() {
            return Err(anyhow!("llm.base_url must not be empty"));
        }
        Ok(())
    }

    /// Get a configuration value by key
    pub fn get(&self, key: &str) -> anyhow::Result<String> {
        match key {
            "llm.base_url" => Ok(self.llm.base_url.clone()),
            "llm.model" => Ok(self.llm.model.clone()),
            "llm.temperature" => Ok(self.llm.temperature.to_string()),
            "llm.max_tokens" => Ok(self.llm.max_tokens.to_string()),
            "llm.timeout_secs" => Ok(self
                .llm
                .timeout_secs
                .map_or_else(|| "none".to_string(), |secs| secs.to_string())),
            "llm.env_key_fallback" => Ok(self.llm.env_key_fallback.to_string()),

            "preview.settings_reopen_delay_ms" => {
                Ok(self.preview.settings_reopen_delay_ms.to_string())
            }
            "preview.output_dir" => Ok(self.preview_dir()?.display().to_string()),

            _ => Err(anyhow!(
                "Unknown configuration key: {}. Use `webforge config list` to see available keys.",
                key
            )),
        }
    }

    /// Set a configuration value by key
    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        match key {
            "llm.base_url" => {
                let url = value.trim().trim_end_matches('/');
                if url.is_empty() {
                    return Err(anyhow!("llm.base_url must not be empty"));
                }
                self.llm.base_url = url.to_string();
            }
            "llm.model" => {
                self.llm.model = value.to_string();
            }
            "llm.temperature" => {
                let temp: f32 = value
                    .parse()
                    .with_context(|| format!("Invalid temperature value: {}", value))?;
                if !(0.0..=2.0).contains(&temp) {
                    return Err(anyhow!("Temperature must be between 0.0 and 2.0"));
                }
                self.llm.temperature = temp;
            }
            "llm.max_tokens" => {
                let max: usize = value
                    .parse()
                    .with_context(|| format!("Invalid max_tokens value: {}", value))?;
                if max == 0 {
                    return Err(anyhow!("max_tokens must be greater than zero"));
                }
                self.llm.max_tokens = max;
            }
            "llm.timeout_secs" => {
                self.llm.timeout_secs = match value.trim() {
                    "" | "none" | "0" => None,
                    secs => Some(
                        secs.parse()
                            .with_context(|| format!("Invalid timeout_secs value: {}", value))?,
                    ),
                };
            }
            "llm.env_key_fallback" => {
                self.llm.env_key_fallback = value
                    .parse()
                    .with_context(|| format!("Invalid boolean value: {}", value))?;
            }

            "preview.settings_reopen_delay_ms" => {
                self.preview.settings_reopen_delay_ms = value
                    .parse()
                    .with_context(|| format!("Invalid delay value: {}", value))?;
            }
            "preview.output_dir" => {
                self.preview.output_dir = Some(PathBuf::from(value));
            }

            "llm.api_key" | "api_key" => {
                return Err(anyhow!(
                    "API keys are not stored in config.toml. \
                     Use `webforge settings set api_key <KEY>` or the WEBFORGE_API_KEY environment variable."
                ));
            }

            _ => {
                return Err(anyhow!(
                    "Unknown configuration key: {}. Use `webforge config list` to see available keys.",
                    key
                ));
            }
        }
        Ok(())
    }

    /// List all configuration keys and their values
    pub fn list(&self) -> anyhow::Result<Vec<(String, String)>> {
        let keys = [
            "llm.base_url",
            "llm.model",
            "llm.temperature",
            "llm.max_tokens",
            "llm.timeout_secs",
            "llm.env_key_fallback",
            "preview.settings_reopen_delay_ms",
            "preview.output_dir",
        ];

        keys.into_iter()
            .map(|key| {
                let value = self.get(key)?;
                Ok((key.to_string(), value))
            })
            .collect()
    }

    /// Reset configuration to defaults
    pub fn reset() -> anyhow::Result<()> {
        let path = Self::config_path()?;
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove config file: {}", path.display()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();

        assert_eq!(config.llm.model, "gpt-3.5-turbo");
        assert_eq!(config.llm.temperature, 0.7);
        assert_eq!(config.llm.max_tokens, 2000);
        assert_eq!(config.preview.settings_reopen_delay_ms, 1000);
        assert!(config.preview.output_dir.is_none());
    }

    #[test]
    fn test_config_set_and_get() {
        let mut config = Config::default();

        config.set("llm.model", "gpt-4o-mini").unwrap();
        config.set("llm.temperature", "0.2").unwrap();
        config.set("llm.base_url", "http://localhost:8080/v1/").unwrap();

        assert_eq!(config.get("llm.model").unwrap(), "gpt-4o-mini");
        assert_eq!(config.get("llm.temperature").unwrap(), "0.2");
        assert_eq!(config.get("llm.base_url").unwrap(), "http://localhost:8080/v1");
    }

    #[test]
    fn test_config_set_rejects_invalid_values() {
        let mut config = Config::default();

        assert!(config.set("llm.temperature", "3.5").is_err());
        assert!(config.set("llm.temperature", "warm").is_err());
        assert!(config.set("llm.max_tokens", "0").is_err());
        assert!(config.set("llm.base_url", "  ").is_err());
        assert!(config.set("no.such.key", "1").is_err());
    }

    #[test]
    fn test_timeout_is_opt_in() {
        let mut config = Config::default();
        assert!(config.llm.timeout_secs.is_none());
        assert_eq!(config.get("llm.timeout_secs").unwrap(), "none");

        config.set("llm.timeout_secs", "45").unwrap();
        assert_eq!(config.llm.timeout_secs, Some(45));
        assert_eq!(config.get("llm.timeout_secs").unwrap(), "45");

        config.set("llm.timeout_secs", "none").unwrap();
        assert!(config.llm.timeout_secs.is_none());
        assert!(config.set("llm.timeout_secs", "soon").is_err());
    }

    #[test]
    fn test_api_key_cannot_be_set_in_config() {
        let mut config = Config::default();
        let err = config.set("api_key", "sk-test").unwrap_err();
        assert!(err.to_string().contains("settings set api_key"));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.set("llm.model", "gpt-4o").unwrap();
        config.set("preview.settings_reopen_delay_ms", "250").unwrap();
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.llm.model, "gpt-4o");
        assert_eq!(loaded.preview.settings_reopen_delay_ms, 250);
    }

    #[test]
    fn test_load_missing_file_returns_default() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.llm.model, "gpt-3.5-turbo");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[llm]\nmodel = \"local-model\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.llm.model, "local-model");
        assert_eq!(config.llm.max_tokens, 2000);
        assert_eq!(config.preview.settings_reopen_delay_ms, 1000);
    }

    #[test]
    fn test_stored_api_key_wins() {
        let llm = LlmConfig::default();
        assert_eq!(llm.resolve_api_key("  sk-stored "), Some("sk-stored".to_string()));
    }

    #[test]
    fn test_env_fallback_can_be_disabled() {
        let llm = LlmConfig {
            env_key_fallback: false,
            ..LlmConfig::default()
        };
        assert_eq!(llm.resolve_api_key(""), None);
        assert_eq!(llm.resolve_api_key("sk-a"), Some("sk-a".to_string()));
    }

    #[test]
    fn test_redact_api_key() {
        assert_eq!(redact_api_key(""), "(not set)");
        assert_eq!(redact_api_key("abc"), "***");
        assert_eq!(redact_api_key("sk-1234567890"), "***7890");
    }

    #[test]
    fn test_list_contains_all_keys() {
        let config = Config {
            preview: PreviewConfig {
                output_dir: Some(PathBuf::from("/tmp/webforge-preview")),
                ..PreviewConfig::default()
            },
            ..Config::default()
        };

        let entries = config.list().unwrap();
        assert_eq!(entries.len(), 8);
        assert!(entries.iter().any(|(k, v)| k == "preview.output_dir" && v == "/tmp/webforge-preview"));
    }
}
