use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Optional `#RRGGBB` overrides for the built-in palette
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThemeOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub positive: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_dim: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Dashboard server WebSocket endpoint
    #[serde(default = "default_ws_url")]
    pub ws_url: String,

    /// REST API base, without trailing slash
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Wait between a dropped socket and the next attempt
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    /// Periodic HTTP refresh of the full dashboard; 0 disables it
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Quiet time before the transaction search applies
    #[serde(default = "default_search_debounce_ms")]
    pub search_debounce_ms: u64,

    /// Also send error notifications to the desktop
    #[serde(default)]
    pub desktop_notifications: bool,

    /// Override for the local cache file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_path: Option<PathBuf>,

    #[serde(default)]
    pub theme: ThemeOverrides,
}

fn default_ws_url() -> String {
    "ws://localhost:8080/ws".to_string()
}

fn default_api_base_url() -> String {
    "http://localhost:8080/api/v1".to_string()
}

fn default_reconnect_delay_ms() -> u64 {
    3000
}

fn default_refresh_interval_secs() -> u64 {
    30
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_search_debounce_ms() -> u64 {
    300
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ws_url: default_ws_url(),
            api_base_url: default_api_base_url(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            refresh_interval_secs: default_refresh_interval_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            search_debounce_ms: default_search_debounce_ms(),
            desktop_notifications: false,
            store_path: None,
            theme: ThemeOverrides::default(),
        }
    }
}

impl AppConfig {
    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?
            .join("sentinel-dash");

        if let Err(e) = std::fs::create_dir_all(&config_dir) {
            tracing::warn!("Could not create config directory: {}", e);
        }

        Ok(config_dir.join("config.toml"))
    }

    /// Load config from the default location, creating it on first run
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Ok(path) => Ok(Self::load_from(&path)),
            Err(_) => Ok(AppConfig::default()),
        }
    }

    /// Load config from `path`, falling back to defaults if it is unusable
    pub fn load_from(path: &Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config: {}", e);
                        return AppConfig::default();
                    }
                },
                Err(e) => {
                    // Leave the user's file alone
                    tracing::warn!("Failed to read config: {}", e);
                    return AppConfig::default();
                }
            }
        }

        let config = AppConfig::default();
        if let Err(e) = config.save_to(path) {
            tracing::warn!("Could not write default config: {}", e);
        }
        config
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn refresh_interval(&self) -> Option<Duration> {
        (self.refresh_interval_secs > 0).then(|| Duration::from_secs(self.refresh_interval_secs))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_serialization() {
        let config = AppConfig {
            ws_url: "wss://agent.example/ws".to_string(),
            refresh_interval_secs: 0,
            desktop_notifications: true,
            theme: ThemeOverrides {
                accent: Some("#FFC107".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };

        let serialized = toml::to_string_pretty(&config).unwrap();
        let deserialized: AppConfig = toml::from_str(&serialized).unwrap();

        assert_eq!(deserialized.ws_url, config.ws_url);
        assert_eq!(deserialized.theme, config.theme);
        assert!(deserialized.desktop_notifications);
        assert_eq!(deserialized.refresh_interval_secs, 0);
        assert_eq!(deserialized.refresh_interval(), None);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: AppConfig = toml::from_str("reconnect_delay_ms = 500\n").unwrap();
        assert_eq!(config.reconnect_delay(), Duration::from_millis(500));
        assert_eq!(config.ws_url, "ws://localhost:8080/ws");
        assert_eq!(config.refresh_interval(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_zero_refresh_disables_interval() {
        let config = AppConfig {
            refresh_interval_secs: 0,
            ..Default::default()
        };
        assert_eq!(config.refresh_interval(), None);
    }

    #[test]
    fn test_load_from_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = AppConfig::load_from(&path);
        assert_eq!(config.api_base_url, "http://localhost:8080/api/v1");
        assert!(path.exists());
    }

    #[test]
    fn test_load_from_bad_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "ws_url = [").unwrap();

        let config = AppConfig::load_from(&path);
        assert_eq!(config.reconnect_delay_ms, 3000);
    }

    #[test]
    fn test_load_from_unreadable_file_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let original = vec![0xff, 0xfe, b'w', b's', 0x80];
        std::fs::write(&path, &original).unwrap();

        let config = AppConfig::load_from(&path);
        assert_eq!(config.ws_url, "ws://localhost:8080/ws");
        assert_eq!(std::fs::read(&path).unwrap(), original);
    }
}
