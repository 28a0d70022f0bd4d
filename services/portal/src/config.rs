//! Service configuration
//!
//! Settings are layered with the `config` crate: built-in defaults, then
//! `config/default.toml`, then the file named by `PORTAL_CONFIG`, then
//! environment variables such as `PORTAL__SERVER__PORT=8080`.

use chrono_tz::Tz;
use common::{database::DatabaseConfig, mail::MailConfig};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

/// Top-level settings of the portal service
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub database: DatabaseConfig,
    pub mail: MailConfig,
    pub portal: PortalConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Which workbook backend to run against
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// JSON workbook snapshot imported when the store is empty
    pub seed_path: Option<String>,
}

/// Behaviour of the portal itself
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    /// IANA timezone used for dates, ids and email timestamps
    pub timezone: String,
    /// Public address of the maintenance portal, linked from team emails
    pub portal_url: String,
    /// Recipient of new fault reports when the team list has no address
    pub maintenance_fallback_email: String,
    /// Failed logins after which an account stops accepting passwords
    pub max_login_attempts: u32,
    /// Entries kept in a problem's activity log
    pub activity_log_limit: usize,
    pub version: String,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            timezone: "Australia/Sydney".to_string(),
            portal_url: "https://maintenanceportal2025.github.io/priority-portal-v1/holden-maintenance-portal.html".to_string(),
            maintenance_fallback_email: "irc.mtceteam@gmail.com".to_string(),
            max_login_attempts: 5,
            activity_log_limit: 50,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl PortalConfig {
    pub fn tz(&self) -> Tz {
        self.timezone.parse().unwrap_or(chrono_tz::Australia::Sydney)
    }
}

/// An account created when the user sheet is first used
#[derive(Debug, Clone, Deserialize)]
pub struct SeedAccount {
    pub username: String,
    pub password: String,
    pub email: String,
    pub role: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub seed_accounts: Vec<SeedAccount>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            seed_accounts: default_seed_accounts(),
        }
    }
}

fn default_seed_accounts() -> Vec<SeedAccount> {
    let account = |username: &str, password: &str, role: &str, name: &str| SeedAccount {
        username: username.to_string(),
        password: password.to_string(),
        email: format!("{}@lakeillawong.com.au", username),
        role: role.to_string(),
        name: name.to_string(),
    };

    vec![
        account("director", "maint2025", "Director", "Director Account"),
        account("team1", "team2025", "Team", "Team Member 1"),
        account("team2", "team2025", "Team", "Team Member 2"),
        account("committee", "rc2025", "Committee", "Residents Committee"),
    ]
}

impl Settings {
    /// Load settings from files and the environment
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .add_source(File::with_name("config/default").required(false));

        if let Ok(path) = env::var("PORTAL_CONFIG") {
            builder = builder.add_source(File::with_name(&path).required(true));
        }

        let settings: Settings = builder
            .add_source(
                Environment::with_prefix("PORTAL")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.portal.timezone.parse::<Tz>().is_err() {
            return Err(ConfigError::Message(format!(
                "Unknown timezone '{}'",
                self.portal.timezone
            )));
        }
        if self.portal.activity_log_limit == 0 {
            return Err(ConfigError::Message(
                "portal.activity_log_limit must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
