//! # Service Configuration
//!
//! Environment-driven settings for the HTTP service. Ledger settings live in
//! [`trustcred_ledger::LedgerConfig`].

use std::str::FromStr;

use thiserror::Error;
use zeroize::Zeroizing;

use crate::middleware::rate_limit::RateLimitConfig;

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Test => "test",
            Self::Production => "production",
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "test" => Ok(Self::Test),
            "production" | "prod" => Ok(Self::Production),
            other => Err(ConfigError::InvalidValue {
                var: "APP_ENV",
                value: other.to_string(),
            }),
        }
    }
}

/// What a failed ledger read turns into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackMode {
    Fail,
    Synthetic,
}

impl FromStr for FallbackMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail" => Ok(Self::Fail),
            "synthetic" => Ok(Self::Synthetic),
            other => Err(ConfigError::InvalidValue {
                var: "LEDGER_FALLBACK",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },
}

/// HTTP service configuration.
///
/// Custom `Debug` redacts `redis_url` and `database_url`, which may embed
/// passwords.
#[derive(Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub port: u16,
    pub cors_origin: String,
    /// Base of the verification URL embedded in QR codes.
    pub base_url: String,
    pub fallback: FallbackMode,
    pub redis_url: Option<Zeroizing<String>>,
    pub database_url: Option<Zeroizing<String>>,
    pub db_max_connections: u32,
    pub cache_key_prefix: String,
    pub rate_limit: RateLimitConfig,
    pub metrics_enabled: bool,
    pub json_logs: bool,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("environment", &self.environment)
            .field("port", &self.port)
            .field("cors_origin", &self.cors_origin)
            .field("base_url", &self.base_url)
            .field("fallback", &self.fallback)
            .field("redis_url", &self.redis_url.as_ref().map(|_| "[REDACTED]"))
            .field("database_url", &self.database_url.as_ref().map(|_| "[REDACTED]"))
            .field("db_max_connections", &self.db_max_connections)
            .field("cache_key_prefix", &self.cache_key_prefix)
            .field("rate_limit", &self.rate_limit)
            .field("metrics_enabled", &self.metrics_enabled)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            port: 3001,
            cors_origin: "http://localhost:3000".to_string(),
            base_url: "https://api.trustcred.com".to_string(),
            fallback: FallbackMode::Synthetic,
            redis_url: None,
            database_url: None,
            db_max_connections: 10,
            cache_key_prefix: trustcred_verify::cache::DEFAULT_KEY_PREFIX.to_string(),
            rate_limit: RateLimitConfig::default(),
            metrics_enabled: true,
            json_logs: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// `APP_ENV` takes precedence over `NODE_ENV`. `LEDGER_FALLBACK`
    /// defaults to `synthetic` in development and `fail` elsewhere.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let environment: Environment = std::env::var("APP_ENV")
            .or_else(|_| std::env::var("NODE_ENV"))
            .map(|v| v.parse())
            .unwrap_or(Ok(Environment::Development))?;

        let fallback = match std::env::var("LEDGER_FALLBACK") {
            Ok(v) => v.parse()?,
            Err(_) if environment == Environment::Development => FallbackMode::Synthetic,
            Err(_) => FallbackMode::Fail,
        };

        let mut rate_limit = RateLimitConfig::default();
        if let Some(secs) = parse_var::<u64>("RATE_LIMIT_WINDOW_SECS")? {
            rate_limit.window_secs = secs;
        }
        rate_limit.trust_proxy = std::env::var("TRUST_PROXY")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true"))
            .unwrap_or(false);

        Ok(Self {
            environment,
            port: parse_var("PORT")?.unwrap_or(defaults.port),
            cors_origin: std::env::var("CORS_ORIGIN").unwrap_or(defaults.cors_origin),
            base_url: std::env::var("BASE_URL").unwrap_or(defaults.base_url),
            fallback,
            redis_url: std::env::var("REDIS_URL")
                .ok()
                .filter(|u| !u.is_empty())
                .map(Zeroizing::new),
            database_url: std::env::var("DATABASE_URL")
                .ok()
                .filter(|u| !u.is_empty())
                .map(Zeroizing::new),
            db_max_connections: parse_var("DB_MAX_CONNECTIONS")?
                .unwrap_or(defaults.db_max_connections),
            cache_key_prefix: std::env::var("REDIS_KEY_PREFIX").unwrap_or(defaults.cache_key_prefix),
            rate_limit,
            metrics_enabled: std::env::var("TRUSTCRED_METRICS_ENABLED")
                .map(|v| v.to_lowercase() != "false")
                .unwrap_or(true),
            json_logs: std::env::var("LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
        })
    }
}

fn parse_var<T: FromStr>(var: &'static str) -> Result<Option<T>, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { var, value: raw }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_parses_aliases() {
        assert_eq!("prod".parse::<Environment>().unwrap(), Environment::Production);
        assert_eq!("Development".parse::<Environment>().unwrap(), Environment::Development);
        assert!("staging".parse::<Environment>().is_err());
    }

    #[test]
    fn fallback_mode_parses() {
        assert_eq!("synthetic".parse::<FallbackMode>().unwrap(), FallbackMode::Synthetic);
        assert_eq!(" FAIL ".parse::<FallbackMode>().unwrap(), FallbackMode::Fail);
        assert!("retry".parse::<FallbackMode>().is_err());
    }

    #[test]
    fn debug_redacts_connection_urls() {
        let config = AppConfig {
            redis_url: Some(Zeroizing::new("redis://:hunter2@cache:6379".to_string())),
            database_url: Some(Zeroizing::new("postgres://app:swordfish@db/trustcred".to_string())),
            ..AppConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("swordfish"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn unset_var_parses_to_none() {
        let parsed: Option<u16> = parse_var("TRUSTCRED_NONEXISTENT_PORT_VAR").unwrap();
        assert!(parsed.is_none());
    }
}
