mod defaults;

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::BridgeError;
use defaults::*;

/// Top-level zapcast configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub bridge: BridgeConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,
    #[serde(default)]
    pub campaign: CampaignConfig,
}

/// General bridge settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Base directory for session data (`~` is expanded).
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Number of recent log lines kept for `/api/logs`.
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            log_capacity: default_log_capacity(),
        }
    }
}

/// HTTP API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_host")]
    pub host: String,
    #[serde(default = "default_api_port")]
    pub port: u16,
    /// Max request body size in megabytes. Media arrives base64-inline,
    /// so this needs to be generous.
    #[serde(default = "default_body_limit_mb")]
    pub body_limit_mb: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_api_host(),
            port: default_api_port(),
            body_limit_mb: default_body_limit_mb(),
        }
    }
}

/// WhatsApp session configuration.
///
/// Session data is stored at `{data_dir}/wa_session/`. Pairing is done by
/// scanning the QR code exposed on `/api/status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatsAppConfig {
    /// Device name shown in WhatsApp's linked-devices list.
    #[serde(default = "default_device_name")]
    pub device_name: String,
    /// Delay before re-initializing the session after a disconnect.
    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            device_name: default_device_name(),
            reconnect_delay_secs: default_reconnect_delay_secs(),
        }
    }
}

/// Campaign pacing and phone normalization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignConfig {
    /// Country code prepended to bare 10-11 digit numbers.
    #[serde(default = "default_country_code")]
    pub country_code: String,
    /// Lower bound of the randomized pause between sends.
    #[serde(default = "default_pause_min_ms")]
    pub pause_min_ms: u64,
    /// Upper bound of the randomized pause between sends.
    #[serde(default = "default_pause_max_ms")]
    pub pause_max_ms: u64,
}

impl Default for CampaignConfig {
    fn default() -> Self {
        Self {
            country_code: default_country_code(),
            pause_min_ms: default_pause_min_ms(),
            pause_max_ms: default_pause_max_ms(),
        }
    }
}

/// Expand `~` to home directory.
pub fn shellexpand(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return format!("{}/{rest}", home.to_string_lossy());
        }
    }
    path.to_string()
}

/// Load configuration from a TOML file. A missing file is not an error:
/// all sections fall back to their defaults.
pub fn load(path: &str) -> Result<Config, BridgeError> {
    let path = Path::new(path);
    if !path.exists() {
        tracing::info!(
            "Config file not found at {}, using defaults",
            path.display()
        );
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| BridgeError::Config(format!("failed to read {}: {}", path.display(), e)))?;

    let config: Config = toml::from_str(&content)
        .map_err(|e| BridgeError::Config(format!("failed to parse config: {e}")))?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.api.port, 3001);
        assert_eq!(cfg.api.body_limit_mb, 50);
        assert_eq!(cfg.campaign.country_code, "55");
        assert_eq!(cfg.campaign.pause_min_ms, 2000);
        assert_eq!(cfg.campaign.pause_max_ms, 5000);
        assert_eq!(cfg.whatsapp.reconnect_delay_secs, 5);
        assert_eq!(cfg.bridge.log_capacity, 500);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            [api]
            port = 8080

            [campaign]
            country_code = "351"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.api.port, 8080);
        assert_eq!(cfg.api.host, "127.0.0.1");
        assert_eq!(cfg.campaign.country_code, "351");
        assert_eq!(cfg.campaign.pause_max_ms, 5000);
    }

    #[test]
    fn test_empty_toml_is_all_defaults() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg.api.port, 3001);
        assert_eq!(cfg.whatsapp.device_name, "ZAPCAST");
    }

    #[test]
    fn test_shellexpand_home() {
        std::env::set_var("HOME", "/home/test");
        assert_eq!(shellexpand("~/.zapcast"), "/home/test/.zapcast");
        assert_eq!(shellexpand("/abs/path"), "/abs/path");
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let cfg = load("/nonexistent/zapcast.toml").unwrap();
        assert_eq!(cfg.api.port, 3001);
    }
}
