//! Application configuration management.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Deployment environment (`development`, `production`, ...).
    #[serde(default = "default_environment")]
    pub environment: String,
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Outgoing mail configuration.
    #[serde(default)]
    pub email: EmailConfig,
    /// Background worker configuration.
    #[serde(default)]
    pub worker: WorkerConfig,
    /// Session token lifetimes.
    #[serde(default)]
    pub auth: AuthConfig,
}

fn default_environment() -> String {
    "development".to_string()
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// Apply pending migrations when the server starts.
    #[serde(default = "default_run_migrations")]
    pub run_migrations: bool,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_run_migrations() -> bool {
    true
}

/// SMTP configuration for transactional email.
#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    /// SMTP relay host.
    pub smtp_host: String,
    /// SMTP relay port.
    pub smtp_port: u16,
    /// SMTP username.
    pub smtp_username: String,
    /// SMTP password.
    pub smtp_password: String,
    /// Sender address.
    pub from_email: String,
    /// Sender display name.
    pub from_name: String,
    /// Public URL of the email verification endpoint.
    pub verify_base_url: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: "localhost".to_string(),
            smtp_port: 1025,
            smtp_username: String::new(),
            smtp_password: String::new(),
            from_email: "noreply@bankline.local".to_string(),
            from_name: "Bankline".to_string(),
            verify_base_url: "http://localhost:8080/v1/verify_email".to_string(),
        }
    }
}

/// Session token configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Access token expiration in seconds.
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry_secs: u64,
    /// Refresh token expiration in seconds.
    #[serde(default = "default_refresh_token_expiry")]
    pub refresh_token_expiry_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_token_expiry_secs: default_access_token_expiry(),
            refresh_token_expiry_secs: default_refresh_token_expiry(),
        }
    }
}

impl AuthConfig {
    /// Access token lifetime as a [`Duration`].
    #[must_use]
    pub const fn access_token_ttl(&self) -> Duration {
        Duration::from_secs(self.access_token_expiry_secs)
    }

    /// Refresh token lifetime as a [`Duration`].
    #[must_use]
    pub const fn refresh_token_ttl(&self) -> Duration {
        Duration::from_secs(self.refresh_token_expiry_secs)
    }
}

fn default_access_token_expiry() -> u64 {
    900 // 15 minutes
}

fn default_refresh_token_expiry() -> u64 {
    86400 // 24 hours
}

/// Background task worker configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    /// Queue name to relative weight. The weight is also the queue's concurrency.
    #[serde(default = "default_queues")]
    pub queues: BTreeMap<String, u32>,
    /// Idle delay between polls when every queue is empty, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// How long a claimed task stays invisible to other workers, in seconds.
    #[serde(default = "default_lease_secs")]
    pub lease_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            queues: default_queues(),
            poll_interval_ms: default_poll_interval_ms(),
            lease_secs: default_lease_secs(),
        }
    }
}

impl WorkerConfig {
    /// Poll interval as a [`Duration`].
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Lease length as a [`Duration`].
    #[must_use]
    pub const fn lease(&self) -> Duration {
        Duration::from_secs(self.lease_secs)
    }
}

fn default_queues() -> BTreeMap<String, u32> {
    BTreeMap::from([("critical".to_string(), 10), ("default".to_string(), 5)])
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_lease_secs() -> u64 {
    1800 // 30 minutes
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("BANKLINE").separator("__"))
            .build()?;

        config.try_deserialize()
    }

    /// Returns true when running with production settings.
    #[must_use]
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}
