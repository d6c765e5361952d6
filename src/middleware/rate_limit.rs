//! Token-bucket rate limiting, keyed by `(owner_id, endpoint-class)`
//!.
//!
//! Backed by a [`dashmap::DashMap`] rather than the Redis-backed cache a
//! sibling service would use: cross-instance coordination is explicitly
//! not required at this scale, and the state is meant to be lost on
//! restart.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use uuid::Uuid;

use crate::AppState;
use crate::error::ApiError;

struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
}

/// In-memory token-bucket limiter. One bucket per `(owner_id,
/// endpoint-class)` pair; buckets are created lazily and never expired,
/// which is acceptable at the scale this is designed for.
pub struct RateLimiter {
    buckets: DashMap<(Uuid, String), TokenBucket>,
    capacity: f64,
    refill_per_sec: f64,
}

impl RateLimiter {
    pub fn new(requests_per_minute: u32) -> Self {
        let capacity = requests_per_minute.max(1) as f64;
        Self {
            buckets: DashMap::new(),
            capacity,
            refill_per_sec: capacity / 60.0,
        }
    }

    /// Consume one token for `(owner_id, endpoint_class)`. `Err` carries
    /// the number of whole seconds the caller should wait before retrying.
    fn check(&self, owner_id: Uuid, endpoint_class: &str) -> Result<(), u64> {
        let mut entry = self
            .buckets
            .entry((owner_id, endpoint_class.to_string()))
            .or_insert_with(|| TokenBucket {
                tokens: self.capacity,
                last_refill: Instant::now(),
            });

        let now = Instant::now();
        let elapsed = now.duration_since(entry.last_refill).as_secs_f64();
        entry.tokens = (entry.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        entry.last_refill = now;

        if entry.tokens >= 1.0 {
            entry.tokens -= 1.0;
            Ok(())
        } else {
            let deficit = 1.0 - entry.tokens;
            let wait_secs = (deficit / self.refill_per_sec).ceil().max(1.0) as u64;
            Err(wait_secs)
        }
    }
}

/// Applied per-route via `route_layer` so [`MatchedPath`] is populated
///").
///
/// Requests whose owner cannot be resolved (missing/invalid
/// `Authorization`) are passed through untouched -- the [`crate::auth::Owner`]
/// extractor downstream is the thing that rejects them with
/// `Unauthorized`; rate limiting only meaningfully applies to requests
/// that will otherwise be accepted.
pub async fn rate_limit_middleware(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let Ok(owner_id) = crate::auth::resolve_owner(req.headers(), &state.config) else {
        return next.run(req).await;
    };

    let endpoint_class = req
        .extensions()
        .get::<MatchedPath>()
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    match state.rate_limiter.check(owner_id, &endpoint_class) {
        Ok(()) => next.run(req).await,
        Err(retry_after_secs) => ApiError::RateLimited { retry_after_secs }.into_response(),
    }
}
