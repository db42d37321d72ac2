//! User settings
//!
//! Settings are persisted as a whole under one key-value record. The API key
//! lives here rather than in `config.toml`.

use serde::{Deserialize, Serialize};

use crate::config::redact_api_key;
use crate::error::{Error, Result};

/// Smallest editor font size accepted
pub const MIN_FONT_SIZE: u8 = 12;
/// Largest editor font size accepted
pub const MAX_FONT_SIZE: u8 = 20;

/// Editor colour theme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "dark" => Some(Theme::Dark),
            "light" => Some(Theme::Light),
            _ => None,
        }
    }
}

/// Persisted user settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    /// Credential for the generation service; empty when unset
    pub api_key: String,
    pub theme: Theme,
    /// Editor font size in points
    pub font_size: u8,
    pub auto_save: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            theme: Theme::Dark,
            font_size: 14,
            auto_save: true,
        }
    }
}

impl AppSettings {
    /// Setting names accepted by [`AppSettings::set`]
    pub const KEYS: [&'static str; 4] = ["api_key", "theme", "font_size", "auto_save"];

    /// Check field ranges
    pub fn validate(&self) -> Result<()> {
        if !(MIN_FONT_SIZE..=MAX_FONT_SIZE).contains(&self.font_size) {
            return Err(Error::InvalidInput(format!(
                "font_size must be between {} and {}, got {}",
                MIN_FONT_SIZE, MAX_FONT_SIZE, self.font_size
            )));
        }
        Ok(())
    }

    /// Whether switching from `self` to `other` changes the credential
    pub fn credential_changed(&self, other: &AppSettings) -> bool {
        self.api_key.trim() != other.api_key.trim()
    }

    /// Update one field from its textual form; nothing changes on error
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut updated = self.clone();
        match key {
            "api_key" => updated.api_key = value.trim().to_string(),
            "theme" => {
                updated.theme = Theme::parse(value).ok_or_else(|| {
                    Error::InvalidInput(format!("theme must be 'dark' or 'light', got '{}'", value))
                })?;
            }
            "font_size" => {
                updated.font_size = value.parse().map_err(|_| {
                    Error::InvalidInput(format!("font_size must be a number, got '{}'", value))
                })?;
            }
            "auto_save" => {
                updated.auto_save = value.parse().map_err(|_| {
                    Error::InvalidInput(format!("auto_save must be true or false, got '{}'", value))
                })?;
            }
            _ => {
                return Err(Error::InvalidInput(format!(
                    "Unknown setting '{}'. Valid settings: {}",
                    key,
                    Self::KEYS.join(", ")
                )));
            }
        }
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// All settings as display pairs, with the key redacted
    pub fn list(&self) -> Vec<(String, String)> {
        vec![
            ("api_key".to_string(), redact_api_key(&self.api_key)),
            ("theme".to_string(), self.theme.as_str().to_string()),
            ("font_size".to_string(), self.font_size.to_string()),
            ("auto_save".to_string(), self.auto_save.to_string()),
        ]
    }
}
