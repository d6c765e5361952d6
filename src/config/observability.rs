//! Logging configuration. The full OTLP/SIEM export
//! pipeline a sibling service ships is out of scope here; this is just
//! the format switch `observability::init_tracing` reads at startup.

use super::{ConfigError, env_or};

/// Output format for the process's `tracing` subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable, for local development.
    #[default]
    Pretty,
    /// One JSON object per line, for production log aggregation.
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub log_format: LogFormat,
    /// `RUST_LOG`-style filter directive, e.g. `info` or `syncd=debug,tower_http=info`.
    pub log_filter: String,
}

impl ObservabilityConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(ObservabilityConfig {
            log_format: env_or("LOG_FORMAT", LogFormat::Pretty)?,
            log_filter: env_or("RUST_LOG", "info".to_string())?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_parses_known_values() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("Pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!("cef".parse::<LogFormat>().is_err());
    }

    #[test]
    fn from_env_defaults() {
        temp_env::with_vars_unset(["LOG_FORMAT", "RUST_LOG"], || {
            let config = ObservabilityConfig::from_env().unwrap();
            assert_eq!(config.log_format, LogFormat::Pretty);
            assert_eq!(config.log_filter, "info");
        });
    }
}
