//! Persistent user settings.

use crate::units::UnitPreference;
use dirs_next as dirs;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

pub const DEFAULT_API_URL: &str = "http://localhost:3000";

#[derive(Debug)]
pub enum SettingsError {
    NoConfigDir,
    UnknownKey(String),
    InvalidValue { key: String, value: String },
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::NoConfigDir => write!(f, "No configuration directory available"),
            SettingsError::UnknownKey(key) => write!(f, "Unknown setting '{key}'"),
            SettingsError::InvalidValue { key, value } => {
                write!(f, "Invalid value '{value}' for setting '{key}'")
            }
            SettingsError::Io(e) => write!(f, "{e}"),
            SettingsError::Json(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for SettingsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SettingsError::Io(e) => Some(e),
            SettingsError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SettingsError {
    fn from(e: std::io::Error) -> Self {
        SettingsError::Io(e)
    }
}

impl From<serde_json::Error> for SettingsError {
    fn from(e: serde_json::Error) -> Self {
        SettingsError::Json(e)
    }
}

/// Pacing and retry behaviour of bulk day edits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BulkSettings {
    /// Pause after this many requests. `0` disables pacing.
    pub pacing_every: usize,
    pub pacing_delay_ms: u64,
    /// Retries per request for transient failures. `0` reports failures
    /// without retrying.
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
}

impl Default for BulkSettings {
    fn default() -> Self {
        Self {
            pacing_every: 3,
            pacing_delay_ms: 300,
            max_retries: 0,
            retry_backoff_ms: 500,
        }
    }
}

/// Persistent configuration for user preferences and API access.
///
/// Every field falls back to its default when missing from the file, so
/// settings written by older versions keep loading.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub unit_preference: UnitPreference,
    pub api_base_url: String,
    pub api_token: Option<String>,
    pub bulk: BulkSettings,
    pub last_block_id: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            unit_preference: UnitPreference::Auto,
            api_base_url: DEFAULT_API_URL.to_string(),
            api_token: None,
            bulk: BulkSettings::default(),
            last_block_id: None,
        }
    }
}

impl Settings {
    const FILE: &'static str = "flow_settings.json";

    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join(Self::FILE))
    }

    /// Load settings from the JSON configuration file.
    ///
    /// A missing or unreadable file yields the defaults.
    pub fn load() -> Self {
        if let Some(path) = Self::path() {
            if let Ok(data) = std::fs::read_to_string(&path) {
                match serde_json::from_str(&data) {
                    Ok(cfg) => return cfg,
                    Err(e) => log::warn!("Ignoring invalid settings file {}: {e}", path.display()),
                }
            }
        }
        Self::default()
    }

    pub fn save(&self) -> Result<PathBuf, SettingsError> {
        let path = Self::path().ok_or(SettingsError::NoConfigDir)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, serde_json::to_string_pretty(self)?)?;
        log::info!("Saved settings to {}", path.display());
        Ok(path)
    }

    /// Bearer token for the API. `FLOW_API_TOKEN` takes precedence over the
    /// stored value.
    pub fn api_token(&self) -> Option<String> {
        std::env::var("FLOW_API_TOKEN")
            .ok()
            .filter(|t| !t.is_empty())
            .or_else(|| self.api_token.clone())
    }

    /// Base URL of the API. `FLOW_API_URL` takes precedence over the stored
    /// value.
    pub fn api_base_url(&self) -> String {
        std::env::var("FLOW_API_URL")
            .ok()
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| self.api_base_url.clone())
    }

    /// Update one setting from its dotted key, as used by `flow config set`.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), SettingsError> {
        let invalid = || SettingsError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        };
        let optional = |v: &str| (!v.is_empty() && v != "none").then(|| v.to_string());
        match key {
            "unit_preference" => self.unit_preference = value.parse().map_err(|_| invalid())?,
            "api_base_url" => self.api_base_url = value.to_string(),
            "api_token" => self.api_token = optional(value),
            "last_block_id" => self.last_block_id = optional(value),
            "bulk.pacing_every" => self.bulk.pacing_every = value.parse().map_err(|_| invalid())?,
            "bulk.pacing_delay_ms" => {
                self.bulk.pacing_delay_ms = value.parse().map_err(|_| invalid())?
            }
            "bulk.max_retries" => self.bulk.max_retries = value.parse().map_err(|_| invalid())?,
            "bulk.retry_backoff_ms" => {
                self.bulk.retry_backoff_ms = value.parse().map_err(|_| invalid())?
            }
            _ => return Err(SettingsError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    /// Key/value listing with the token masked.
    pub fn describe(&self) -> Vec<(&'static str, String)> {
        vec![
            ("unit_preference", self.unit_preference.to_string()),
            ("api_base_url", self.api_base_url.clone()),
            (
                "api_token",
                if self.api_token.is_some() { "<set>".into() } else { "<unset>".into() },
            ),
            (
                "last_block_id",
                self.last_block_id.clone().unwrap_or_else(|| "<unset>".into()),
            ),
            ("bulk.pacing_every", self.bulk.pacing_every.to_string()),
            ("bulk.pacing_delay_ms", self.bulk.pacing_delay_ms.to_string()),
            ("bulk.max_retries", self.bulk.max_retries.to_string()),
            ("bulk.retry_backoff_ms", self.bulk.retry_backoff_ms.to_string()),
        ]
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use once_cell::sync::Lazy;
    use std::sync::Mutex;

    /// Serializes tests that touch process environment variables.
    pub(crate) static ENV_MUTEX: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    #[test]
    fn settings_roundtrip() {
        let mut s = Settings::default();
        s.unit_preference = UnitPreference::Kg;
        s.api_base_url = "https://example.test".into();
        s.api_token = Some("secret".into());
        s.bulk.pacing_every = 5;
        s.bulk.max_retries = 2;
        s.last_block_id = Some("b1".into());

        let json = serde_json::to_string(&s).unwrap();
        let loaded: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(s, loaded);
    }

    #[test]
    fn missing_fields_use_defaults() {
        let loaded: Settings = serde_json::from_str(r#"{"bulk":{"max_retries":4}}"#).unwrap();
        assert_eq!(loaded.unit_preference, UnitPreference::Auto);
        assert_eq!(loaded.api_base_url, DEFAULT_API_URL);
        assert_eq!(loaded.bulk.max_retries, 4);
        assert_eq!(loaded.bulk.pacing_every, 3);
        assert_eq!(loaded.bulk.pacing_delay_ms, 300);
    }

    #[test]
    fn set_parses_values() {
        let mut s = Settings::default();
        s.set("unit_preference", "LB").unwrap();
        assert_eq!(s.unit_preference, UnitPreference::Lb);
        s.set("bulk.pacing_delay_ms", "150").unwrap();
        assert_eq!(s.bulk.pacing_delay_ms, 150);
        s.set("api_token", "abc").unwrap();
        assert_eq!(s.api_token.as_deref(), Some("abc"));
        s.set("api_token", "none").unwrap();
        assert_eq!(s.api_token, None);

        assert!(matches!(
            s.set("bulk.max_retries", "many"),
            Err(SettingsError::InvalidValue { .. })
        ));
        assert!(matches!(
            s.set("colour", "blue"),
            Err(SettingsError::UnknownKey(_))
        ));
    }

    #[test]
    fn describe_masks_token() {
        let mut s = Settings::default();
        s.api_token = Some("secret".into());
        let listing = s.describe();
        assert!(listing.iter().all(|(_, v)| !v.contains("secret")));
    }

    #[test]
    fn save_and_load_from_config_dir() {
        use std::env;
        use std::fs;

        let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());

        let dir = tempfile::tempdir().unwrap();
        let prev_config = env::var_os("XDG_CONFIG_HOME");
        unsafe {
            env::set_var("XDG_CONFIG_HOME", dir.path());
        }

        let mut s = Settings::default();
        s.unit_preference = UnitPreference::Kg;
        let path = s.save().unwrap();
        assert!(path.starts_with(dir.path()));
        assert_eq!(Settings::load().unit_preference, UnitPreference::Kg);

        fs::write(&path, "{}").unwrap();
        assert_eq!(Settings::load(), Settings::default());

        fs::write(&path, "not json").unwrap();
        assert_eq!(Settings::load(), Settings::default());

        if let Some(val) = prev_config {
            unsafe {
                env::set_var("XDG_CONFIG_HOME", val);
            }
        } else {
            unsafe {
                env::remove_var("XDG_CONFIG_HOME");
            }
        }
    }

    #[test]
    fn env_overrides_stored_values() {
        use std::env;

        let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());

        let mut s = Settings::default();
        s.api_token = Some("stored".into());
        s.api_base_url = "https://stored.test".into();

        unsafe {
            env::set_var("FLOW_API_TOKEN", "forced");
            env::set_var("FLOW_API_URL", "https://forced.test");
        }
        assert_eq!(s.api_token().as_deref(), Some("forced"));
        assert_eq!(s.api_base_url(), "https://forced.test");

        unsafe {
            env::remove_var("FLOW_API_TOKEN");
            env::remove_var("FLOW_API_URL");
        }
        assert_eq!(s.api_token().as_deref(), Some("stored"));
        assert_eq!(s.api_base_url(), "https://stored.test");
    }
}
