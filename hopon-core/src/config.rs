//! Configuration management
//!
//! Settings live in `<hopon dir>/settings.json`:
//! ```json
//! {
//!   "app":      { "demoMode": false },
//!   "identity": { "allowedDomains": ["vitstudent.ac.in"] },
//!   "rides":    { "defaultCountryCode": "+91", "utcOffsetMinutes": 330 },
//!   "store":    { "backend": "local", "url": null, "apiKey": null, "table": "rides" }
//! }
//! ```
//! Keys this crate does not know about are kept when the file is saved.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use crate::adapters::postgrest::DEFAULT_TABLE;
use crate::domain::result::{Error, Result as DomainResult};
use crate::domain::{CreatePolicy, IdentityGate, DEFAULT_ALLOWED_DOMAIN};

/// Environment variable that overrides demo mode (for CI/testing)
pub const DEMO_MODE_ENV: &str = "HOPON_DEMO_MODE";

/// Environment variable that points the CLI at a hosted store
pub const STORE_URL_ENV: &str = "HOPON_STORE_URL";

/// Environment variable holding the hosted store API key
pub const STORE_KEY_ENV: &str = "HOPON_STORE_KEY";

const DEFAULT_COUNTRY_CODE: &str = "+91";
const DEFAULT_UTC_OFFSET_MINUTES: i32 = 330;

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    app: AppSettings,
    #[serde(default)]
    identity: IdentitySettings,
    #[serde(default)]
    rides: RideSettings,
    #[serde(default)]
    store: StoreSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppSettings {
    #[serde(default)]
    demo_mode: bool,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentitySettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    allowed_domains: Option<Vec<String>>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RideSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default_country_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    utc_offset_minutes: Option<i32>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoreSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    backend: Option<StoreBackend>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    table: Option<String>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Where rides are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// `rides.duckdb` in the hopon directory
    #[default]
    Local,
    /// Hosted PostgREST table
    Remote,
}

/// Hosted store connection settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteStore {
    pub url: String,
    pub api_key: String,
    pub table: String,
}

/// HopOn configuration (resolved view of settings plus environment)
#[derive(Debug, Clone)]
pub struct Config {
    pub demo_mode: bool,
    pub allowed_domains: Vec<String>,
    pub default_country_code: String,
    pub utc_offset_minutes: i32,
    pub backend: StoreBackend,
    pub store_url: Option<String>,
    pub store_api_key: Option<String>,
    pub store_table: String,
    // Keep the raw settings for preservation when saving
    _raw_settings: SettingsFile,
}

impl Default for Config {
    fn default() -> Self {
        Self::resolve(SettingsFile::default(), |_| None)
    }
}

fn parse_flag(value: Option<String>) -> Option<bool> {
    match value?.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse the settings file, `None` when it does not exist
fn parse_settings(settings_path: &Path) -> Result<Option<SettingsFile>> {
    if !settings_path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(settings_path)?;
    let settings = serde_json::from_str(&content)
        .with_context(|| format!("malformed settings file {}", settings_path.display()))?;
    Ok(Some(settings))
}

/// Settings for loading: a malformed file is reported and read as defaults
fn read_settings(settings_path: &Path) -> Result<SettingsFile> {
    match parse_settings(settings_path) {
        Ok(settings) => Ok(settings.unwrap_or_default()),
        Err(e) => {
            eprintln!("[hopon] Ignoring {:#}", e);
            Ok(SettingsFile::default())
        }
    }
}

impl Config {
    /// Load config from the hopon directory
    ///
    /// `HOPON_DEMO_MODE` overrides demo mode. `HOPON_STORE_URL` selects the
    /// hosted store, with `HOPON_STORE_KEY` as its API key.
    pub fn load(hopon_dir: &Path) -> Result<Self> {
        let raw = read_settings(&hopon_dir.join("settings.json"))?;
        Ok(Self::resolve(raw, |name| std::env::var(name).ok()))
    }

    fn resolve(raw: SettingsFile, env: impl Fn(&str) -> Option<String>) -> Self {
        let demo_mode = parse_flag(env(DEMO_MODE_ENV)).unwrap_or(raw.app.demo_mode);

        let env_url = env(STORE_URL_ENV).filter(|v| !v.trim().is_empty());
        let backend = if env_url.is_some() {
            StoreBackend::Remote
        } else {
            raw.store.backend.unwrap_or_default()
        };

        let allowed_domains = raw
            .identity
            .allowed_domains
            .clone()
            .filter(|domains| !domains.is_empty())
            .unwrap_or_else(|| vec![DEFAULT_ALLOWED_DOMAIN.to_string()]);

        Self {
            demo_mode,
            allowed_domains,
            default_country_code: raw
                .rides
                .default_country_code
                .clone()
                .unwrap_or_else(|| DEFAULT_COUNTRY_CODE.to_string()),
            utc_offset_minutes: raw
                .rides
                .utc_offset_minutes
                .unwrap_or(DEFAULT_UTC_OFFSET_MINUTES),
            backend,
            store_url: env_url.or_else(|| raw.store.url.clone()),
            store_api_key: env(STORE_KEY_ENV)
                .filter(|v| !v.trim().is_empty())
                .or_else(|| raw.store.api_key.clone()),
            store_table: raw
                .store
                .table
                .clone()
                .unwrap_or_else(|| DEFAULT_TABLE.to_string()),
            _raw_settings: raw,
        }
    }

    /// Save config to the hopon directory
    ///
    /// Only demo mode is written back; every other key in the file is kept
    /// as it is on disk. A file that does not parse is left untouched and
    /// the save fails.
    pub fn save(&self, hopon_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(hopon_dir)?;
        let settings_path = hopon_dir.join("settings.json");

        let mut settings = parse_settings(&settings_path)?.unwrap_or_default();
        settings.app.demo_mode = self.demo_mode;

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)?;
        Ok(())
    }

    /// Enable demo mode
    pub fn enable_demo_mode(&mut self) {
        self.demo_mode = true;
    }

    /// Disable demo mode
    pub fn disable_demo_mode(&mut self) {
        self.demo_mode = false;
    }

    /// Email gate for the configured domains
    pub fn identity_gate(&self) -> IdentityGate {
        IdentityGate::new(&self.allowed_domains)
    }

    /// Posting policy for the configured campus
    pub fn create_policy(&self) -> DomainResult<CreatePolicy> {
        let utc_offset = FixedOffset::east_opt(self.utc_offset_minutes * 60).ok_or_else(|| {
            Error::Config(format!(
                "utcOffsetMinutes {} is out of range",
                self.utc_offset_minutes
            ))
        })?;
        Ok(CreatePolicy {
            default_country_code: self.default_country_code.clone(),
            utc_offset,
        })
    }

    /// Hosted store settings, when the remote backend is selected
    pub fn remote_store(&self) -> DomainResult<Option<RemoteStore>> {
        if self.backend != StoreBackend::Remote {
            return Ok(None);
        }
        let url = self.store_url.clone().ok_or_else(|| {
            Error::Config(format!(
                "remote store selected but no URL configured (set store.url or {})",
                STORE_URL_ENV
            ))
        })?;
        let api_key = self.store_api_key.clone().ok_or_else(|| {
            Error::Config(format!(
                "remote store selected but no API key configured (set store.apiKey or {})",
                STORE_KEY_ENV
            ))
        })?;
        Ok(Some(RemoteStore {
            url,
            api_key,
            table: self.store_table.clone(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(!config.demo_mode);
        assert_eq!(config.allowed_domains, vec!["vitstudent.ac.in"]);
        assert_eq!(config.default_country_code, "+91");
        assert_eq!(config.utc_offset_minutes, 330);
        assert_eq!(config.backend, StoreBackend::Local);
        assert_eq!(config.store_table, "rides");
        assert!(config.remote_store().unwrap().is_none());
    }

    #[test]
    fn test_settings_file_values() {
        let raw: SettingsFile = serde_json::from_str(
            r#"{
                "identity": { "allowedDomains": ["vit.ac.in"] },
                "rides": { "defaultCountryCode": "+1", "utcOffsetMinutes": -300 },
                "store": { "backend": "remote", "url": "https://x.supabase.co", "apiKey": "k" }
            }"#,
        )
        .unwrap();
        let config = Config::resolve(raw, no_env);

        assert_eq!(config.allowed_domains, vec!["vit.ac.in"]);
        assert!(config.identity_gate().validate("a@vit.ac.in").is_ok());
        let policy = config.create_policy().unwrap();
        assert_eq!(policy.default_country_code, "+1");
        assert_eq!(policy.utc_offset.local_minus_utc(), -300 * 60);

        let remote = config.remote_store().unwrap().unwrap();
        assert_eq!(remote.url, "https://x.supabase.co");
        assert_eq!(remote.table, "rides");
    }

    #[test]
    fn test_env_overrides() {
        let raw = SettingsFile::default();
        let config = Config::resolve(raw, |name| match name {
            DEMO_MODE_ENV => Some("yes".to_string()),
            STORE_URL_ENV => Some("https://env.supabase.co".to_string()),
            STORE_KEY_ENV => Some("env-key".to_string()),
            _ => None,
        });

        assert!(config.demo_mode);
        assert_eq!(config.backend, StoreBackend::Remote);
        assert_eq!(config.remote_store().unwrap().unwrap().api_key, "env-key");
    }

    #[test]
    fn test_remote_without_key_is_config_error() {
        let raw: SettingsFile =
            serde_json::from_str(r#"{ "store": { "backend": "remote", "url": "https://x" } }"#).unwrap();
        let config = Config::resolve(raw, no_env);
        assert!(matches!(config.remote_store(), Err(Error::Config(_))));
    }

    #[test]
    fn test_bad_offset_is_config_error() {
        let mut config = Config::default();
        config.utc_offset_minutes = 24 * 60;
        assert!(matches!(config.create_policy(), Err(Error::Config(_))));
    }

    #[test]
    fn test_save_preserves_unknown_keys() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("settings.json"),
            r#"{ "app": { "demoMode": false, "theme": "dark" }, "custom": { "x": 1 },
                 "store": { "table": "rides_v2" } }"#,
        )
        .unwrap();

        let mut config = Config::resolve(read_settings(&dir.path().join("settings.json")).unwrap(), no_env);
        assert_eq!(config.store_table, "rides_v2");
        config.enable_demo_mode();
        config.save(dir.path()).unwrap();

        let content = std::fs::read_to_string(dir.path().join("settings.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["app"]["demoMode"], true);
        assert_eq!(value["app"]["theme"], "dark");
        assert_eq!(value["custom"]["x"], 1);
        assert_eq!(value["store"]["table"], "rides_v2");
    }

    #[test]
    fn test_malformed_settings_fall_back_to_defaults() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("settings.json"), "{ not json").unwrap();
        let raw = read_settings(&dir.path().join("settings.json")).unwrap();
        let config = Config::resolve(raw, no_env);
        assert!(!config.demo_mode);
    }

    #[test]
    fn test_save_refuses_to_overwrite_malformed_settings() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let original = r#"{ "store": { "url": "https://x.supabase.co", "apiKey": "k" "#;
        std::fs::write(&path, original).unwrap();

        let mut config = Config::load(dir.path()).unwrap();
        config.enable_demo_mode();
        let err = config.save(dir.path()).unwrap_err();

        assert!(err.to_string().contains("malformed settings file"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), original);
    }
}
