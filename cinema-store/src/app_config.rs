use config::ConfigError;
use serde::Deserialize;
use std::env;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub kafka: KafkaConfig,
    pub session_provider: SessionProviderConfig,
    pub business_rules: BusinessRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    /// How long a pending booking holds its seats.
    #[serde(default = "default_hold_seconds")]
    pub booking_hold_seconds: u64,
}

fn default_hold_seconds() -> u64 { 15 * 60 }

/// Upper bound for a hold; one day.
pub const MAX_BOOKING_HOLD_SECONDS: i64 = 24 * 60 * 60;

impl BusinessRules {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match i64::try_from(self.booking_hold_seconds) {
            Ok(seconds) if (1..=MAX_BOOKING_HOLD_SECONDS).contains(&seconds) => Ok(()),
            _ => Err(ConfigError::Message(format!(
                "business_rules.booking_hold_seconds must be between 1 and {}, got {}",
                MAX_BOOKING_HOLD_SECONDS, self.booking_hold_seconds
            ))),
        }
    }

    /// Hold duration, clamped to `MAX_BOOKING_HOLD_SECONDS`.
    pub fn booking_hold(&self) -> chrono::Duration {
        let seconds = i64::try_from(self.booking_hold_seconds)
            .unwrap_or(MAX_BOOKING_HOLD_SECONDS)
            .min(MAX_BOOKING_HOLD_SECONDS);
        chrono::Duration::seconds(seconds)
    }
}

impl Default for BusinessRules {
    fn default() -> Self {
        Self { booking_hold_seconds: default_hold_seconds() }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Postgres,
    /// Process-local store for development; nothing survives a restart.
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 { 5 }

#[derive(Debug, Deserialize, Clone)]
pub struct KafkaConfig {
    pub brokers: String,
    #[serde(default = "default_topic")]
    pub topic: String,
    #[serde(default = "default_send_timeout")]
    pub send_timeout_seconds: u64,
}

fn default_topic() -> String { "bookings".to_string() }
fn default_send_timeout() -> u64 { 10 }

impl KafkaConfig {
    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.send_timeout_seconds)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionProviderConfig {
    pub url: String,
    #[serde(default = "default_provider_timeout")]
    pub timeout_seconds: u64,
}

fn default_provider_timeout() -> u64 { 5 }

impl SessionProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local, uncommitted overrides
            .add_source(config::File::with_name("config/local").required(false))
            // Eg.. `CINEMA_DATABASE__URL=postgres://...`
            .add_source(config::Environment::with_prefix("CINEMA").separator("__"))
            .build()?;

        Self::from_settings(s)
    }

    /// Deserialises merged settings and rejects values the service cannot run with.
    pub fn from_settings(settings: config::Config) -> Result<Self, ConfigError> {
        let cfg: Config = settings.try_deserialize()?;
        cfg.business_rules.validate()?;
        Ok(cfg)
    }
}
