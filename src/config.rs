//! Configuration management for Equiplend server

use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmailConfig {
    /// When disabled, notifications are only logged
    pub enabled: bool,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_from: String,
    pub smtp_from_name: Option<String>,
    pub smtp_use_tls: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    /// When disabled, OTP sessions are kept in process memory
    pub enabled: bool,
    pub url: String,
}

/// Fee schedule used by the return assessment
#[derive(Debug, Deserialize, Clone)]
pub struct BorrowingConfig {
    /// Penalty per full day past the intended return date
    pub per_day_rate: Decimal,
    pub minor_damage_fee: Decimal,
    /// Unset means the fee is entered by an admin during review
    pub moderate_damage_fee: Option<Decimal>,
    pub severe_damage_fee: Option<Decimal>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OtpConfig {
    pub ttl_seconds: i64,
    pub resend_cooldown_seconds: i64,
    /// How long a verified email may be used for a submission
    pub verification_ttl_seconds: i64,
    pub max_attempts: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub borrowing: BorrowingConfig,
    #[serde(default)]
    pub otp: OtpConfig,
}

impl AppConfig {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let config = Config::builder()
            .add_source(File::with_name("config/default"))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Environment variables (with prefix EQUIPLEND_)
            .add_source(
                Environment::with_prefix("EQUIPLEND")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("auth.jwt_secret", env::var("JWT_SECRET").ok())?
            .set_override_option("redis.url", env::var("REDIS_URL").ok())?
            .build()?;

        config.try_deserialize()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "change-this-secret-in-production".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            smtp_host: "localhost".to_string(),
            smtp_port: 587,
            smtp_username: None,
            smtp_password: None,
            smtp_from: "noreply@equiplend.local".to_string(),
            smtp_from_name: Some("Equiplend".to_string()),
            smtp_use_tls: true,
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: "redis://127.0.0.1:6379".to_string(),
        }
    }
}

impl Default for BorrowingConfig {
    fn default() -> Self {
        Self {
            per_day_rate: Decimal::new(50, 0),
            minor_damage_fee: Decimal::new(100, 0),
            moderate_damage_fee: None,
            severe_damage_fee: None,
        }
    }
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: 300,
            resend_cooldown_seconds: 300,
            verification_ttl_seconds: 1800,
            max_attempts: 5,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
            logging: LoggingConfig::default(),
            email: EmailConfig::default(),
            redis: RedisConfig::default(),
            borrowing: BorrowingConfig::default(),
            otp: OtpConfig::default(),
        }
    }
}
