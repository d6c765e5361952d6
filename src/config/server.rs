//! HTTP server settings.

use std::net::SocketAddr;

use super::ConfigError;

/// HTTP server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to.
    pub addr: SocketAddr,

    /// Request body size limit in bytes.
    pub body_limit_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Maximum time to drain in-flight requests during shutdown before
    /// aborting.
    pub shutdown_grace_secs: u64,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw = std::env::var("HTTP_ADDR").unwrap_or_else(|_| ":8081".to_string());
        let addr = parse_addr(&raw)?;
        let body_limit_bytes = super::env_or("HTTP_BODY_LIMIT_BYTES", 2 * 1024 * 1024usize)?;
        let request_timeout_secs = super::env_or("HTTP_REQUEST_TIMEOUT_SECS", 30u64)?;
        let shutdown_grace_secs = super::env_or("HTTP_SHUTDOWN_GRACE_SECS", 30u64)?;

        Ok(ServerConfig {
            addr,
            body_limit_bytes,
            request_timeout_secs,
            shutdown_grace_secs,
        })
    }
}

/// Parse `HTTP_ADDR`. Accepts a bare `:PORT` shorthand (bound to
/// `0.0.0.0`) as well as a full `host:port` pair.
fn parse_addr(raw: &str) -> Result<SocketAddr, ConfigError> {
    let normalized = if let Some(port) = raw.strip_prefix(':') {
        format!("0.0.0.0:{port}")
    } else {
        raw.to_string()
    };
    normalized
        .parse()
        .map_err(|_| ConfigError::InvalidValue("HTTP_ADDR".to_string(), raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_port_shorthand() {
        let addr = parse_addr(":8081").unwrap();
        assert_eq!(addr.to_string(), "0.0.0.0:8081");
    }

    #[test]
    fn parses_full_host_port() {
        let addr = parse_addr("127.0.0.1:9090").unwrap();
        assert_eq!(addr.to_string(), "127.0.0.1:9090");
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_addr("not-an-address").is_err());
    }

    #[test]
    fn from_env_defaults_to_8081() {
        temp_env::with_var_unset("HTTP_ADDR", || {
            let config = ServerConfig::from_env().unwrap();
            assert_eq!(config.addr.port(), 8081);
        });
    }
}
