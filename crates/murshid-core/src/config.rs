use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Result, anyhow};

use crate::language::{Language, Theme};
use crate::location::LocationSource;
use crate::state::UserFix;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_NOMINATIM_BASE_URL: &str = "https://nominatim.openstreetmap.org";
pub const DEFAULT_IP_LOCATION_URL: &str = "http://ip-api.com/json";
pub const DEFAULT_GEOCODE_DELAY_MS: u64 = 800;
pub const DEFAULT_USER_AGENT: &str = concat!("murshid/", env!("CARGO_PKG_VERSION"));

/// Read-only settings loaded at startup. Nothing here is written back:
/// changes made in the UI last for the session only.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Config {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub language: Option<String>,
    pub theme: Option<String>,
    pub show_ads: Option<bool>,
    pub gemini_base_url: Option<String>,
    pub nominatim_base_url: Option<String>,
    pub location_source: Option<String>,
    pub fixed_latitude: Option<f64>,
    pub fixed_longitude: Option<f64>,
    pub ip_location_url: Option<String>,
    pub geocode_delay_ms: Option<u64>,
    pub user_agent: Option<String>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)
            .map_err(|e| anyhow!("Invalid config file {:?}: {}", path, e))?;
        Ok(config)
    }

    /// Gemini key: environment first, then the config file
    pub fn api_key(&self) -> Option<String> {
        ["GEMINI_API_KEY", "API_KEY"]
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find(|key| !key.is_empty())
            .or_else(|| self.api_key.clone())
    }

    pub fn model(&self) -> String {
        self.model.clone().unwrap_or_else(|| DEFAULT_MODEL.to_string())
    }

    /// Configured language, else the one detected from the locale
    pub fn language(&self) -> Language {
        self.language
            .as_deref()
            .and_then(Language::from_code)
            .unwrap_or_else(Language::detect)
    }

    pub fn theme(&self) -> Theme {
        self.theme
            .as_deref()
            .and_then(Theme::from_str)
            .unwrap_or_default()
    }

    pub fn show_ads(&self) -> bool {
        self.show_ads.unwrap_or(true)
    }

    pub fn gemini_base_url(&self) -> String {
        self.gemini_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string())
    }

    pub fn nominatim_base_url(&self) -> String {
        self.nominatim_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_NOMINATIM_BASE_URL.to_string())
    }

    pub fn ip_location_url(&self) -> String {
        self.ip_location_url
            .clone()
            .unwrap_or_else(|| DEFAULT_IP_LOCATION_URL.to_string())
    }

    pub fn geocode_delay(&self) -> Duration {
        Duration::from_millis(self.geocode_delay_ms.unwrap_or(DEFAULT_GEOCODE_DELAY_MS))
    }

    pub fn user_agent(&self) -> String {
        self.user_agent
            .clone()
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string())
    }

    /// Where positions come from. A `fixed` source without both
    /// coordinates is treated as unsupported.
    pub fn location_source(&self) -> LocationSource {
        match self.location_source.as_deref().map(str::to_lowercase).as_deref() {
            Some("fixed") => match (self.fixed_latitude, self.fixed_longitude) {
                (Some(lat), Some(lon)) => LocationSource::Fixed(UserFix::new(lat, lon)),
                _ => LocationSource::None,
            },
            Some("none") => LocationSource::None,
            Some("denied") => LocationSource::Denied,
            _ => LocationSource::Ip(self.ip_location_url()),
        }
    }

    fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("murshid").join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config.model(), DEFAULT_MODEL);
        assert!(config.show_ads());
        assert_eq!(config.geocode_delay(), Duration::from_millis(800));
        assert_eq!(config.theme(), Theme::System);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"model":"gemini-2.0-flash","language":"ar","theme":"dark","show_ads":false,"geocode_delay_ms":1000}}"#
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.model(), "gemini-2.0-flash");
        assert_eq!(config.language(), Language::Arabic);
        assert_eq!(config.theme(), Theme::Dark);
        assert!(!config.show_ads());
        assert_eq!(config.geocode_delay(), Duration::from_millis(1000));
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{not json").unwrap();
        assert!(Config::load_from(file.path()).is_err());
    }

    #[test]
    fn test_location_source_selection() {
        let mut config = Config::new();
        assert_eq!(
            config.location_source(),
            LocationSource::Ip(DEFAULT_IP_LOCATION_URL.to_string())
        );

        config.location_source = Some("fixed".to_string());
        assert_eq!(config.location_source(), LocationSource::None);

        config.fixed_latitude = Some(31.63);
        config.fixed_longitude = Some(-8.0);
        assert_eq!(
            config.location_source(),
            LocationSource::Fixed(UserFix::new(31.63, -8.0))
        );

        config.location_source = Some("Denied".to_string());
        assert_eq!(config.location_source(), LocationSource::Denied);
    }
}
