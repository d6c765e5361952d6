//! Authenticated-subject resolution.
//!
//! Full OIDC/JWKS validation and the production authentication
//! middleware are out of scope -- treated there as an
//! external collaborator that hands the core an `owner_id`. This module
//! is the minimal stand-in needed to run the crate standalone: HS256
//! bearer-token validation against `JWT_HS256_SECRET`, plus a dev-mode
//! `X-Debug-Sub` override for local testing without a real token.
//! `X-Debug-Sub` and the unsigned-secret fallback MUST be inert outside
//! dev mode.

use axum::extract::{FromRequestParts, State};
use axum::http::HeaderMap;
use axum::http::request::Parts;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::Deserialize;
use uuid::Uuid;

use crate::AppState;
use crate::config::AppConfig;
use crate::error::ApiError;

const DEBUG_SUB_HEADER: &str = "x-debug-sub";

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
}

/// The resolved tenant for the current request.
#[derive(Debug, Clone, Copy)]
pub struct Owner(pub Uuid);

impl<S> FromRequestParts<S> for Owner
where
    AppState: axum::extract::FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let State(app_state): State<AppState> = State::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::Internal("app state unavailable".into()))?;
        Ok(Owner(resolve_owner(&parts.headers, &app_state.config)?))
    }
}

/// Resolve the caller's `owner_id` from request headers alone, shared by
/// the [`Owner`] extractor and the rate-limit middleware (which runs
/// ahead of extraction and only has headers to go on).
pub fn resolve_owner(headers: &HeaderMap, config: &AppConfig) -> Result<Uuid, ApiError> {
    if config.environment.is_dev()
        && let Some(debug_sub) = headers.get(DEBUG_SUB_HEADER)
    {
        let raw = debug_sub.to_str().map_err(|_| ApiError::Unauthorized)?;
        return Uuid::parse_str(raw).map_err(|_| ApiError::Unauthorized);
    }

    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::Unauthorized)?;
    let token = header.strip_prefix("Bearer ").ok_or(ApiError::Unauthorized)?;

    let secret = config.auth.jwt_hs256_secret.as_deref().ok_or(ApiError::Unauthorized)?;

    validate_hs256(token, secret)
}

fn validate_hs256(token: &str, secret: &str) -> Result<Uuid, ApiError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_aud = false;
    let data = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map_err(|_| ApiError::Unauthorized)?;
    Uuid::parse_str(&data.claims.sub).map_err(|_| ApiError::Unauthorized)
}
