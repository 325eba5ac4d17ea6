//! Configuration module
//!
//! `AppConfig` is read from a TOML file. The path comes from the
//! `SHOPPINGCART_CONFIG` environment variable, falling back to
//! `~/.config/shoppingcart/config.toml`. A missing file yields the defaults.
//!
//! ```toml
//! [database]
//! url = "sqlite://./shoppingcart.db?mode=rwc"
//! replica_url = "postgres://reporting@replica/shop"
//!
//! [shop]
//! store_billing_info = false
//! platform_name = "Open Learning"
//! payment_support_email = "billing@example.com"
//! donations_enabled = true
//! registration_code_length = 8
//!
//! [logging]
//! level = "info"
//! json = false
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::shared::errors::InfraError;

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "SHOPPINGCART_CONFIG";

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseSettings,
    pub shop: ShopConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Primary store URL
    pub url: String,
    /// Read replica used by reporting queries only
    pub replica_url: Option<String>,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: "sqlite://./shoppingcart.db?mode=rwc".to_string(),
            replica_url: None,
        }
    }
}

/// Site-wide shop switches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShopConfig {
    /// Keep street lines, card data and the raw processor reply on purchase
    pub store_billing_info: bool,
    pub platform_name: String,
    pub payment_support_email: String,
    pub donations_enabled: bool,
    pub default_currency: String,
    pub registration_code_length: usize,
}

impl Default for ShopConfig {
    fn default() -> Self {
        Self {
            store_billing_info: false,
            platform_name: "Your Platform Name Here".to_string(),
            payment_support_email: "billing@example.com".to_string(),
            donations_enabled: true,
            default_currency: "usd".to_string(),
            registration_code_length: 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON lines instead of the human-readable format
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Parse a TOML document
    pub fn from_toml_str(raw: &str) -> Result<Self, InfraError> {
        toml::from_str(raw).map_err(|e| InfraError::Config(format!("Invalid config: {}", e)))
    }

    /// Load from `path`; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self, InfraError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .map_err(|e| InfraError::Config(format!("Cannot read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&raw)
    }

    /// Load from `$SHOPPINGCART_CONFIG` or the default path
    pub fn load_default() -> Result<Self, InfraError> {
        let path = std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(default_config_path);
        Self::load(&path)
    }
}

/// `~/.config/shoppingcart/config.toml` (platform equivalent elsewhere)
pub fn default_config_path() -> PathBuf {
    dirs_next::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("shoppingcart")
        .join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let cfg = AppConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, AppConfig::default());
        assert!(!cfg.shop.store_billing_info);
        assert_eq!(cfg.shop.registration_code_length, 8);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = AppConfig::from_toml_str(
            r#"
            [shop]
            store_billing_info = true
            platform_name = "Open Learning"

            [database]
            replica_url = "sqlite::memory:"
            "#,
        )
        .unwrap();
        assert!(cfg.shop.store_billing_info);
        assert_eq!(cfg.shop.platform_name, "Open Learning");
        assert!(cfg.shop.donations_enabled);
        assert_eq!(cfg.database.replica_url.as_deref(), Some("sqlite::memory:"));
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn malformed_document_is_config_error() {
        let err = AppConfig::from_toml_str("[shop\nbroken").unwrap_err();
        assert!(matches!(err, InfraError::Config(_)));
    }

    #[test]
    fn missing_file_gives_defaults() {
        let cfg = AppConfig::load(Path::new("/definitely/not/here/config.toml")).unwrap();
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn default_path_ends_with_app_dir() {
        assert!(default_config_path().ends_with("shoppingcart/config.toml"));
    }
}
