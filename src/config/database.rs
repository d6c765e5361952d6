//! Database connection settings.

use super::ConfigError;

/// PostgreSQL connection pool configuration. This is the only supported
/// database backend — there is no SQLite mode.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Connection URL for the primary (write) database.
    pub url: String,

    /// Optional read replica URL. Reads go here when set; writes and
    /// transactional work always go through `url`.
    pub read_url: Option<String>,

    /// Minimum number of connections in each pool.
    pub min_connections: u32,

    /// Maximum number of connections in each pool.
    pub max_connections: u32,

    /// Time to wait for a connection before giving up.
    pub acquire_timeout_secs: u64,

    /// Run pending migrations on startup.
    pub run_migrations: bool,
}

impl DatabaseConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let url = super::require_env("DATABASE_URL")?;
        let read_url = std::env::var("DATABASE_READ_URL")
            .ok()
            .filter(|v| !v.is_empty());
        let min_connections = super::env_or("DATABASE_MIN_CONNECTIONS", 1u32)?;
        let max_connections = super::env_or("DATABASE_MAX_CONNECTIONS", 20u32)?;
        let acquire_timeout_secs = super::env_or("DATABASE_ACQUIRE_TIMEOUT_SECS", 10u64)?;
        let run_migrations = super::env_or("DATABASE_RUN_MIGRATIONS", true)?;

        Ok(DatabaseConfig {
            url,
            read_url,
            min_connections,
            max_connections,
            acquire_timeout_secs,
            run_migrations,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.is_empty() {
            return Err(ConfigError::Validation(
                "DATABASE_URL cannot be empty".into(),
            ));
        }
        if self.min_connections > self.max_connections {
            return Err(ConfigError::Validation(
                "DATABASE_MIN_CONNECTIONS cannot exceed DATABASE_MAX_CONNECTIONS".into(),
            ));
        }
        Ok(())
    }
}
