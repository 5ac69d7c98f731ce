use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::Arc, time::Duration};

use crate::{
    location::{FixedPosition, IpPosition, Position, PositionSource},
    provider::openweather::DEFAULT_WEATHER_URL,
};

/// Environment variable that overrides the stored API key.
pub const API_KEY_ENV: &str = "LOCALWEATHER_API_KEY";

pub const DEFAULT_ICON_BASE_URL: &str = "https://openweathermap.org/img/wn";
pub const DEFAULT_GEOLOCATION_ENDPOINT: &str = "http://ip-api.com/json";

/// Weather provider endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub weather_url: String,
    pub icon_base_url: String,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            weather_url: DEFAULT_WEATHER_URL.to_string(),
            icon_base_url: DEFAULT_ICON_BASE_URL.to_string(),
        }
    }
}

/// How the device position is obtained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeolocationSettings {
    pub enabled: bool,
    pub endpoint: String,
    pub timeout_secs: u64,
    /// When both are set they are used instead of `endpoint`.
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl Default for GeolocationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: DEFAULT_GEOLOCATION_ENDPOINT.to_string(),
            timeout_secs: 10,
            latitude: None,
            longitude: None,
        }
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// api_key = "..."
///
/// [geolocation]
/// latitude = 48.85
/// longitude = 2.35
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,
    pub provider: ProviderSettings,
    pub geolocation: GeolocationSettings,
}

impl Config {
    /// Load config from disk, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(path)
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "localweather", "localweather")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// API key from the environment, falling back to the stored one.
    pub fn api_key(&self) -> Option<String> {
        Self::resolve_api_key(std::env::var(API_KEY_ENV).ok(), self.api_key.as_deref())
    }

    fn resolve_api_key(from_env: Option<String>, stored: Option<&str>) -> Option<String> {
        from_env
            .filter(|k| !k.trim().is_empty())
            .or_else(|| stored.filter(|k| !k.trim().is_empty()).map(str::to_owned))
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.api_key = Some(api_key.trim().to_string());
    }

    pub fn fixed_position(&self) -> Option<Position> {
        match (self.geolocation.latitude, self.geolocation.longitude) {
            (Some(latitude), Some(longitude)) => Some(Position { latitude, longitude }),
            _ => None,
        }
    }

    /// Position source described by the `[geolocation]` section, if enabled.
    pub fn position_source(&self) -> Result<Option<Arc<dyn PositionSource>>> {
        if !self.geolocation.enabled {
            return Ok(None);
        }

        if let Some(pos) = self.fixed_position() {
            return Ok(Some(Arc::new(FixedPosition(pos))));
        }

        let source = IpPosition::new(
            self.geolocation.endpoint.clone(),
            Duration::from_secs(self.geolocation.timeout_secs),
        )
        .context("Failed to build geolocation client")?;

        Ok(Some(Arc::new(source)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_openweather() {
        let cfg = Config::default();
        assert_eq!(cfg.provider.weather_url, DEFAULT_WEATHER_URL);
        assert_eq!(cfg.provider.icon_base_url, DEFAULT_ICON_BASE_URL);
        assert!(cfg.geolocation.enabled);
        assert!(cfg.api_key.is_none());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg = Config::from_toml(
            r#"
            api_key = "OPEN_KEY"

            [geolocation]
            latitude = 48.85
            longitude = 2.35
            "#,
        )
        .expect("config should parse");

        assert_eq!(cfg.api_key.as_deref(), Some("OPEN_KEY"));
        assert_eq!(cfg.provider, ProviderSettings::default());
        assert_eq!(cfg.geolocation.endpoint, DEFAULT_GEOLOCATION_ENDPOINT);
        assert_eq!(cfg.fixed_position(), Some(Position { latitude: 48.85, longitude: 2.35 }));
    }

    #[test]
    fn toml_roundtrip() {
        let mut cfg = Config::default();
        cfg.set_api_key("  KEY  ".into());
        cfg.geolocation.enabled = false;

        let text = toml::to_string_pretty(&cfg).expect("serialize");
        let back = Config::from_toml(&text).expect("parse");
        assert_eq!(back, cfg);
        assert_eq!(back.api_key.as_deref(), Some("KEY"));
    }

    #[test]
    fn env_key_wins_over_stored_key() {
        assert_eq!(
            Config::resolve_api_key(Some("ENV".into()), Some("FILE")),
            Some("ENV".to_string())
        );
        assert_eq!(
            Config::resolve_api_key(Some("  ".into()), Some("FILE")),
            Some("FILE".to_string())
        );
        assert_eq!(Config::resolve_api_key(None, Some("")), None);
    }

    #[test]
    fn disabled_geolocation_has_no_source() {
        let mut cfg = Config::default();
        cfg.geolocation.enabled = false;
        assert!(cfg.position_source().expect("no error").is_none());
    }

    #[test]
    fn half_a_fixed_position_is_ignored() {
        let mut cfg = Config::default();
        cfg.geolocation.latitude = Some(1.0);
        assert_eq!(cfg.fixed_position(), None);
        assert!(cfg.position_source().expect("builds ip source").is_some());
    }
}
