//! Configuration file management.
//!
//! TOML config at `$data_dir/config.toml`, every field defaulted so an
//! absent file yields a working (gateway-less) daemon. The gateway secret
//! can come from the environment instead of the file.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Complete daemon configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Payment gateway settings.
    #[serde(default)]
    pub gateway: GatewaySection,
    /// Storage settings.
    #[serde(default)]
    pub storage: StorageSection,
    /// Advanced settings.
    #[serde(default)]
    pub advanced: AdvancedSection,
}

/// Payment gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewaySection {
    /// Secret key. Empty = gateway disabled. `BURSAR_GATEWAY_SECRET_KEY`
    /// overrides.
    #[serde(default)]
    pub secret_key: String,
    /// API base URL.
    #[serde(default = "default_gateway_base_url")]
    pub base_url: String,
    /// URL the payer lands on after checkout. Empty = gateway default.
    #[serde(default)]
    pub callback_url: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_gateway_timeout_secs")]
    pub timeout_secs: u64,
}

/// Storage configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageSection {
    /// Data directory. Empty = platform default.
    #[serde(default)]
    pub data_dir: String,
}

/// Advanced configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancedSection {
    /// Log level: "debug" | "info" | "warn" | "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// Default value functions

fn default_gateway_base_url() -> String {
    bursar_gateway::client::DEFAULT_BASE_URL.to_string()
}

fn default_gateway_timeout_secs() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            secret_key: String::new(),
            base_url: default_gateway_base_url(),
            callback_url: String::new(),
            timeout_secs: default_gateway_timeout_secs(),
        }
    }
}

impl Default for AdvancedSection {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl DaemonConfig {
    /// Load configuration from the default config file location.
    ///
    /// Falls back to defaults if the file does not exist, then applies
    /// environment overrides.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();
        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Self::default()
        };

        if let Ok(secret) = std::env::var("BURSAR_GATEWAY_SECRET_KEY") {
            if !secret.is_empty() {
                config.gateway.secret_key = secret;
            }
        }
        Ok(config)
    }

    /// Gateway client settings, when a secret key is configured.
    pub fn gateway_config(&self) -> Option<bursar_gateway::GatewayConfig> {
        if self.gateway.secret_key.trim().is_empty() {
            return None;
        }
        Some(bursar_gateway::GatewayConfig {
            secret_key: self.gateway.secret_key.clone(),
            base_url: self.gateway.base_url.clone(),
            timeout: Duration::from_secs(self.gateway.timeout_secs),
        })
    }

    /// Checkout callback URL, when configured.
    pub fn callback_url(&self) -> Option<&str> {
        if self.gateway.callback_url.is_empty() {
            None
        } else {
            Some(&self.gateway.callback_url)
        }
    }

    /// Get the data directory path.
    pub fn data_dir(&self) -> PathBuf {
        if self.storage.data_dir.is_empty() {
            Self::default_data_dir()
        } else {
            PathBuf::from(&self.storage.data_dir)
        }
    }

    /// Get the config file path.
    fn config_path() -> PathBuf {
        if let Ok(dir) = std::env::var("BURSAR_DATA_DIR") {
            return PathBuf::from(dir).join("config.toml");
        }
        Self::default_data_dir().join("config.toml")
    }

    /// Platform-specific default data directory.
    fn default_data_dir() -> PathBuf {
        if let Ok(dir) = std::env::var("BURSAR_DATA_DIR") {
            return PathBuf::from(dir);
        }
        std::env::var("HOME")
            .map(|h| PathBuf::from(h).join(".bursar"))
            .unwrap_or_else(|_| PathBuf::from("/tmp/bursar"))
    }
}
