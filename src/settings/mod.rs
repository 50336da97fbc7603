//! Settings
//!
//! JSON-backed key/value settings. The core reads only the locale and the
//! `"query"` section; everything else is carried for collaborators.

mod config;

use std::fs;
use std::path::Path;

use serde_json::{Map, Value};
use thiserror::Error;

pub use config::{QueryConfig, DEFAULT_LIMIT, MAX_LIMIT};

/// Locale used when settings carry none
pub const DEFAULT_LOCALE: &str = "en";

/// Result type for settings operations
pub type SettingsResult<T> = Result<T, SettingsError>;

/// Settings loading errors
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to read settings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid settings JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Settings root must be a JSON object")]
    NotAnObject,
}

/// Application settings
#[derive(Debug, Clone, Default)]
pub struct Settings {
    values: Map<String, Value>,
}

impl Settings {
    /// Empty settings; every lookup falls back to defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse settings from a JSON object string
    pub fn from_json_str(text: &str) -> SettingsResult<Self> {
        match serde_json::from_str(text)? {
            Value::Object(values) => Ok(Self { values }),
            _ => Err(SettingsError::NotAnObject),
        }
    }

    /// Load settings from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> SettingsResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Set a value
    pub fn with_setting(mut self, key: impl Into<String>, value: Value) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    /// Raw setting lookup
    pub fn get_setting(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Default locale for requests
    pub fn locale(&self) -> String {
        self.get_setting("locale")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_LOCALE)
            .to_string()
    }

    /// Typed resolver configuration from the `"query"` key
    ///
    /// A missing section yields the defaults; a malformed one is an error.
    pub fn query_config(&self) -> SettingsResult<QueryConfig> {
        match self.get_setting("query") {
            Some(section) => Ok(serde_json::from_value(section.clone())?),
            None => Ok(QueryConfig::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_locale_defaults() {
        assert_eq!(Settings::new().locale(), "en");
    }

    #[test]
    fn test_locale_from_settings() {
        let settings = Settings::new().with_setting("locale", json!("fr"));
        assert_eq!(settings.locale(), "fr");
    }

    #[test]
    fn test_from_json_str() {
        let settings =
            Settings::from_json_str(r#"{"locale": "de", "query": {"defaultLimit": 25}}"#).unwrap();
        assert_eq!(settings.locale(), "de");
        let config = settings.query_config().unwrap();
        assert_eq!(config.default_limit, 25);
        assert_eq!(config.max_limit, MAX_LIMIT);
    }

    #[test]
    fn test_missing_query_section_uses_defaults() {
        assert_eq!(Settings::new().query_config().unwrap(), QueryConfig::default());
    }

    #[test]
    fn test_malformed_query_section_rejected() {
        let settings = Settings::from_json_str(r#"{"query": {"maxLimit": "ten"}}"#).unwrap();
        assert!(matches!(settings.query_config(), Err(SettingsError::Parse(_))));

        let settings = Settings::new().with_setting("query", json!([1, 2]));
        assert!(matches!(settings.query_config(), Err(SettingsError::Parse(_))));
    }

    #[test]
    fn test_non_object_rejected() {
        assert!(matches!(
            Settings::from_json_str("[1, 2]"),
            Err(SettingsError::NotAnObject)
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"locale": "es"}}"#).unwrap();

        let settings = Settings::from_file(file.path()).unwrap();
        assert_eq!(settings.locale(), "es");
        assert_eq!(settings.get_setting("missing"), None);
    }
}
