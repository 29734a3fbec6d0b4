//! Persisted user settings.
//!
//! Stored as JSON under the platform config directory
//! (`~/.config/scribe/settings.json` on Linux). Missing or unreadable files
//! load as defaults so a fresh install works without setup.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScribeError};

/// Environment variable consulted when no API key is stored in settings.
pub const API_KEY_ENV_VAR: &str = "GEMINI_API_KEY";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Gemini API key. Leave unset to use the environment variable instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Preferred transcription model name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl Settings {
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("scribe").join("settings.json"))
    }

    /// Load settings from disk. Missing or unparseable files yield defaults.
    pub fn load() -> Self {
        let Some(path) = Self::path() else {
            return Self::default();
        };
        match std::fs::read_to_string(&path) {
            Ok(body) => serde_json::from_str(&body).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::path().ok_or_else(|| ScribeError::InvalidInput {
            message: "Cannot determine the user configuration directory".to_string(),
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let body = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(&path, body)?;
        Ok(())
    }

    /// API key from settings, falling back to `GEMINI_API_KEY`.
    pub fn api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(API_KEY_ENV_VAR).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_empty() {
        let settings = Settings::default();
        assert!(settings.api_key.is_none());
        assert!(settings.model.is_none());
    }

    #[test]
    fn missing_fields_deserialize_as_defaults() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert!(settings.api_key.is_none());
        assert!(settings.model.is_none());
    }

    #[test]
    fn stored_api_key_wins() {
        let settings = Settings {
            api_key: Some("stored-key".to_string()),
            model: None,
        };
        assert_eq!(settings.api_key(), Some("stored-key".to_string()));
    }

    #[test]
    fn unset_fields_are_not_serialized() {
        let body = serde_json::to_string(&Settings::default()).unwrap();
        assert_eq!(body, "{}");
    }

    #[test]
    fn round_trips_through_json() {
        let settings = Settings {
            api_key: Some("k".to_string()),
            model: Some("gemini-2.5-flash".to_string()),
        };
        let body = serde_json::to_string(&settings).unwrap();
        let loaded: Settings = serde_json::from_str(&body).unwrap();
        assert_eq!(loaded.api_key, settings.api_key);
        assert_eq!(loaded.model, settings.model);
    }
}
