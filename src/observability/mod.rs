//! Structured logging setup.
//!
//! Just the plain `tracing`/`tracing-subscriber` init every
//! service/middleware call logs through (`tracing::info!`,
//! `tracing::error!`), not the OTLP/SIEM export pipeline a sibling
//! service ships.

mod tracing_init;

pub use tracing_init::{TracingError, TracingGuard, init_tracing};
