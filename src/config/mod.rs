//! Configuration for the sync backend.
//!
//! Unlike the TOML-file configuration some sibling services use, this
//! crate is configured entirely from environment variables.
//! Each concern still gets its own submodule with its own `from_env`/
//! `validate`, matching the layout a file-based config would use.

pub mod auth;
pub mod database;
pub mod limits;
pub mod observability;
pub mod server;

use std::str::FromStr;

pub use auth::AuthConfig;
pub use database::DatabaseConfig;
pub use limits::LimitsConfig;
pub use observability::{LogFormat, ObservabilityConfig};
pub use server::ServerConfig;

/// Deployment environment. `Dev` relaxes the JWT secret requirement and
/// enables the `X-Debug-Sub` owner-substitution header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Dev,
    Production,
}

impl Environment {
    fn from_env() -> Self {
        match std::env::var("ENV").ok().as_deref() {
            Some("dev") => Environment::Dev,
            _ => Environment::Production,
        }
    }

    pub fn is_dev(&self) -> bool {
        matches!(self, Environment::Dev)
    }
}

/// Root configuration, assembled once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub limits: LimitsConfig,
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// Load configuration from the process environment and validate it.
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = Environment::from_env();
        let config = AppConfig {
            environment,
            server: ServerConfig::from_env()?,
            database: DatabaseConfig::from_env()?,
            auth: AuthConfig::from_env()?,
            limits: LimitsConfig::from_env()?,
            observability: ObservabilityConfig::from_env()?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.database.validate()?;
        self.auth.validate(self.environment)?;
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for environment variable {0}: {1:?}")]
    InvalidValue(String, String),

    #[error("configuration validation error: {0}")]
    Validation(String),
}

/// Read an environment variable and parse it, falling back to `default`
/// when the variable is unset. An empty value is also treated as unset.
pub(crate) fn env_or<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
{
    match std::env::var(key) {
        Ok(raw) if !raw.is_empty() => raw
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string(), raw)),
        _ => Ok(default),
    }
}

/// Read a required environment variable.
pub(crate) fn require_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}
