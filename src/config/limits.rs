//! Pagination and rate-limit defaults.

use super::ConfigError;

/// Pagination and in-memory rate-limit configuration.
#[derive(Debug, Clone)]
pub struct LimitsConfig {
    /// Default page size for REST list endpoints.
    pub rest_list_default_limit: i64,

    /// Default page size for `/pull`.
    pub pull_default_limit: i64,

    /// Maximum page size accepted by either surface.
    pub max_limit: i64,

    /// Token-bucket rate limit, in requests per minute, applied per
    /// `(owner_id, endpoint-class)`. Not shared across
    /// processes and lost on restart by design.
    pub rate_limit_requests_per_minute: u32,
}

impl LimitsConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let rest_list_default_limit = super::env_or("REST_LIST_DEFAULT_LIMIT", 50i64)?;
        let pull_default_limit = super::env_or("PULL_DEFAULT_LIMIT", 100i64)?;
        let max_limit = super::env_or("SYNC_MAX_LIMIT", 200i64)?;
        let rate_limit_requests_per_minute = super::env_or("RATE_LIMIT_RPM", 300u32)?;

        Ok(LimitsConfig {
            rest_list_default_limit,
            pull_default_limit,
            max_limit,
            rate_limit_requests_per_minute,
        })
    }

    /// Clamp a caller-supplied limit into `[1, max_limit]`, falling back
    /// to `default` when none was supplied.
    pub fn clamp_limit(&self, requested: Option<i64>, default: i64) -> i64 {
        requested.unwrap_or(default).clamp(1, self.max_limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> LimitsConfig {
        LimitsConfig {
            rest_list_default_limit: 50,
            pull_default_limit: 100,
            max_limit: 200,
            rate_limit_requests_per_minute: 300,
        }
    }

    #[test]
    fn clamp_uses_default_when_absent() {
        let config = config();
        assert_eq!(config.clamp_limit(None, 50), 50);
    }

    #[test]
    fn clamp_caps_at_max() {
        let config = config();
        assert_eq!(config.clamp_limit(Some(10_000), 50), 200);
    }

    #[test]
    fn clamp_floors_at_one() {
        let config = config();
        assert_eq!(config.clamp_limit(Some(0), 50), 1);
        assert_eq!(config.clamp_limit(Some(-5), 50), 1);
    }
}
