//! Delta-sync surface: session/epoch lifecycle plus
//! per-family `push`/`pull`. Every endpoint here (other than opening a
//! session) requires `X-Sync-Session`/`X-Sync-Epoch` and is rejected by
//! the [`crate::session::SessionCoordinator`] before touching an entity
//! service.

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::AppState;
use crate::auth::Owner;
use crate::error::ApiError;
use crate::models::PullPage;
use crate::services::EntityService;
use crate::session::SyncHeaders;

use super::{parse_family, resolve_cursor};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/sync/sessions", post(open_session))
        .route("/v1/sync/wipe", post(wipe))
        .route("/v1/sync/state", get(state))
        .route("/v1/sync/{family}/pull", get(pull))
        .route("/v1/sync/{family}/push", post(push))
}

const SESSION_HEADER: &str = "x-sync-session";
const EPOCH_HEADER: &str = "x-sync-epoch";

/// Parse the two required sync headers. Missing or
/// malformed values are `BadRequest`, distinct from the coordinator's
/// `SessionExpired`/`EpochStale` once a syntactically valid pair is
/// checked against stored state.
fn extract_sync_headers(headers: &HeaderMap) -> Result<SyncHeaders, ApiError> {
    let session_id = headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::BadRequest("missing X-Sync-Session header".into()))?;
    let session_id = Uuid::parse_str(session_id)
        .map_err(|_| ApiError::BadRequest("malformed X-Sync-Session header".into()))?;

    let epoch = headers
        .get(EPOCH_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::BadRequest("missing X-Sync-Epoch header".into()))?;
    let epoch: i64 = epoch
        .parse()
        .map_err(|_| ApiError::BadRequest("malformed X-Sync-Epoch header".into()))?;

    Ok(SyncHeaders { session_id, epoch })
}

#[derive(Serialize)]
struct SessionResponse {
    session_id: Uuid,
    epoch: i64,
}

async fn open_session(State(state): State<AppState>, Owner(owner): Owner) -> Result<Json<SessionResponse>, ApiError> {
    let session = state.sessions.open_session(owner).await?;
    Ok(Json(SessionResponse {
        session_id: session.session_id,
        epoch: session.epoch_at_open,
    }))
}

#[derive(Serialize)]
struct WipeResponse {
    epoch: i64,
}

async fn wipe(
    State(state): State<AppState>,
    Owner(owner): Owner,
    headers: HeaderMap,
) -> Result<Json<WipeResponse>, ApiError> {
    let sync_headers = extract_sync_headers(&headers)?;
    state.sessions.validate(owner, &sync_headers).await?;
    let epoch = state.sessions.wipe(owner, owner).await?;
    Ok(Json(WipeResponse { epoch }))
}

#[derive(Serialize)]
struct StateResponse {
    epoch: i64,
    #[serde(rename = "lastWipeAt", skip_serializing_if = "Option::is_none")]
    last_wipe_at: Option<String>,
}

async fn state(
    State(state): State<AppState>,
    Owner(owner): Owner,
    headers: HeaderMap,
) -> Result<Json<StateResponse>, ApiError> {
    let sync_headers = extract_sync_headers(&headers)?;
    state.sessions.validate(owner, &sync_headers).await?;

    let owner_state = state.sessions.owner_state(owner).await?;
    Ok(Json(StateResponse {
        epoch: owner_state.epoch,
        last_wipe_at: owner_state.last_wipe_at.map(|t| t.to_rfc3339()),
    }))
}

#[derive(Deserialize)]
struct PullQuery {
    cursor: Option<String>,
    limit: Option<i64>,
    strict: Option<bool>,
}

async fn pull(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(family): Path<String>,
    headers: HeaderMap,
    Query(query): Query<PullQuery>,
) -> Result<Json<PullPage>, ApiError> {
    let sync_headers = extract_sync_headers(&headers)?;
    state.sessions.validate(owner, &sync_headers).await?;

    let family = parse_family(&family)?;
    let cursor = resolve_cursor(query.cursor.as_deref(), query.strict.unwrap_or(false))?;
    let limit = state.config.limits.clamp_limit(query.limit, state.config.limits.pull_default_limit);

    let service = EntityService::new(family, state.db.clone());
    let page = service.pull(owner, &cursor, limit).await?;
    Ok(Json(page))
}

#[derive(Deserialize)]
struct PushRequest {
    items: Vec<Value>,
}

#[derive(Serialize)]
struct PushResponse {
    acks: Vec<crate::models::PushAck>,
}

async fn push(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(family): Path<String>,
    headers: HeaderMap,
    Json(body): Json<PushRequest>,
) -> Result<Json<PushResponse>, ApiError> {
    let sync_headers = extract_sync_headers(&headers)?;
    state.sessions.validate(owner, &sync_headers).await?;

    let family = parse_family(&family)?;
    let service = EntityService::new(family, state.db.clone());
    let acks = service.push_batch(owner, body.items).await?;
    Ok(Json(PushResponse { acks }))
}
