//! Tracing subscriber initialization: an `EnvFilter`
//! plus one of two console formats. No OTLP export, no SIEM layers --
//! those belong to an external structured-logging pipeline this crate
//! doesn't own.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{LogFormat, ObservabilityConfig};

#[derive(Debug, thiserror::Error)]
pub enum TracingError {
    #[error("failed to install global tracing subscriber: {0}")]
    Init(String),
}

/// Held for the process lifetime; dropping it is harmless since there is
/// no exporter flush to perform without OTLP.
pub struct TracingGuard;

pub fn init_tracing(config: &ObservabilityConfig) -> Result<TracingGuard, TracingError> {
    let filter = EnvFilter::try_new(&config.log_filter)
        .map_err(|err| TracingError::Init(format!("invalid RUST_LOG directive: {err}")))?;

    let registry = tracing_subscriber::registry().with(filter);

    let result = match config.log_format {
        LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init(),
        LogFormat::Json => registry.with(fmt::layer().json().flatten_event(true)).try_init(),
    };
    result.map_err(|err| TracingError::Init(err.to_string()))?;

    Ok(TracingGuard)
}
