//! # Configuration
//!
//! Loads the service configuration from a TOML file. Every field has a
//! default so a partial file (or no file at all) still yields a usable
//! configuration; the mailer stays disabled until an SMTP server is set.
//!
//! ```toml
//! [database]
//! url = "sqlite:drivermanager.db"
//!
//! [notifications]
//! recipient_group = "driver notifications"
//! horizon_days = 30
//! app_url = "https://cloud.example.com/apps/drivermanager/"
//!
//! [mail]
//! smtp_server = "smtp.example.com"
//! from_address = "noreply"
//! domain = "example.com"
//!
//! [[directory.users]]
//! id = "alice"
//! display_name = "Alice"
//! email = "alice@example.com"
//! groups = ["driver notifications"]
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Environment variable holding the config file path
pub const CONFIG_PATH_ENV: &str = "DRIVERMANAGER_CONFIG";
/// Config file used when the environment variable is not set
pub const DEFAULT_CONFIG_PATH: &str = "drivermanager.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub notifications: NotificationConfig,
    pub mail: MailConfig,
    pub directory: DirectoryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:drivermanager.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub allowed_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:3000".to_string(),
            allowed_origin: "http://localhost:8080".to_string(),
        }
    }
}

/// Upper bound for `horizon_days` and `lookback_days`
pub const MAX_WINDOW_DAYS: u32 = 3650;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Group whose members receive the report
    pub recipient_group: String,
    /// Days ahead of today included in the report
    pub horizon_days: u32,
    /// Days before today still reported as expired
    pub lookback_days: u32,
    /// Seconds between daily-gate checks
    pub check_interval_secs: u64,
    /// Absolute URL of the driver list view, used as the notification link
    pub app_url: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            recipient_group: "driver notifications".to_string(),
            horizon_days: 30,
            lookback_days: 30,
            check_interval_secs: 3600,
            app_url: "http://localhost:3000/apps/drivermanager/".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    /// Empty disables the email channel
    pub smtp_server: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
    /// Local part of the sender address
    pub from_address: String,
    /// Domain part of the sender address
    pub domain: String,
    pub from_name: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            smtp_server: String::new(),
            smtp_port: 587,
            username: String::new(),
            password: String::new(),
            from_address: "noreply".to_string(),
            domain: "yourcompany.com".to_string(),
            from_name: "Driver Manager System".to_string(),
        }
    }
}

impl MailConfig {
    pub fn is_enabled(&self) -> bool {
        !self.smtp_server.trim().is_empty()
    }

    /// Full sender address, e.g. `noreply@yourcompany.com`
    pub fn sender_address(&self) -> String {
        format!("{}@{}", self.from_address, self.domain)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    /// User ids allowed to trigger test runs regardless of group membership
    pub admins: Vec<String>,
    pub users: Vec<DirectoryUser>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryUser {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub groups: Vec<String>,
}

impl AppConfig {
    pub fn load(config_path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        let config: AppConfig = toml::from_str(&config_content)
            .with_context(|| format!("Failed to parse config TOML: {:?}", config_path))?;

        if config.notifications.recipient_group.trim().is_empty() {
            return Err(anyhow::anyhow!("notifications.recipient_group must not be empty"));
        }
        if config.notifications.check_interval_secs == 0 {
            return Err(anyhow::anyhow!("notifications.check_interval_secs must be positive"));
        }
        if config.notifications.horizon_days > MAX_WINDOW_DAYS {
            return Err(anyhow::anyhow!(
                "notifications.horizon_days must be at most {}",
                MAX_WINDOW_DAYS
            ));
        }
        if config.notifications.lookback_days > MAX_WINDOW_DAYS {
            return Err(anyhow::anyhow!(
                "notifications.lookback_days must be at most {}",
                MAX_WINDOW_DAYS
            ));
        }

        info!("Loaded configuration from {:?}", config_path);
        Ok(config)
    }

    pub fn load_or_default(config_path: &Path) -> Self {
        match Self::load(config_path) {
            Ok(config) => config,
            Err(e) => {
                warn!("Failed to load config from {:?}: {:#}", config_path, e);
                info!("Using default configuration (email notifications disabled)");
                AppConfig::default()
            }
        }
    }
}
