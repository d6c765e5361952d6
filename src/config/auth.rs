//! Authentication configuration.
//!
//! OIDC/JWKS token validation and the middleware that resolves a
//! request to a `user-id` are out of scope — this module only
//! holds the shared-secret material a downstream validator would need
//! and enforces that it is present outside dev mode.

use super::{ConfigError, Environment};

/// Authentication configuration.
#[derive(Clone)]
pub struct AuthConfig {
    /// HS256 signing secret for validating bearer tokens. Required
    /// outside dev mode.
    pub jwt_hs256_secret: Option<String>,
}

impl AuthConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let jwt_hs256_secret = std::env::var("JWT_HS256_SECRET")
            .ok()
            .filter(|v| !v.is_empty());
        Ok(AuthConfig { jwt_hs256_secret })
    }

    pub fn validate(&self, environment: Environment) -> Result<(), ConfigError> {
        if !environment.is_dev() && self.jwt_hs256_secret.is_none() {
            return Err(ConfigError::Validation(
                "JWT_HS256_SECRET is required outside dev mode (set ENV=dev to disable)".into(),
            ));
        }
        Ok(())
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field(
                "jwt_hs256_secret",
                &self.jwt_hs256_secret.as_ref().map(|_| "****"),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_secret() {
        let config = AuthConfig {
            jwt_hs256_secret: Some("super-secret-value".to_string()),
        };
        let output = format!("{config:?}");
        assert!(output.contains("****"));
        assert!(!output.contains("super-secret-value"));
    }

    #[test]
    fn production_requires_secret() {
        let config = AuthConfig {
            jwt_hs256_secret: None,
        };
        assert!(config.validate(Environment::Production).is_err());
    }

    #[test]
    fn dev_mode_allows_missing_secret() {
        let config = AuthConfig {
            jwt_hs256_secret: None,
        };
        assert!(config.validate(Environment::Dev).is_ok());
    }

    #[test]
    fn production_accepts_present_secret() {
        let config = AuthConfig {
            jwt_hs256_secret: Some("secret".to_string()),
        };
        assert!(config.validate(Environment::Production).is_ok());
    }
}
