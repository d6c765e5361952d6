//! Single-item REST CRUD: optimistic concurrency via
//! `ETag`/`If-Match`, tombstone status mapping, cursor-paginated list.
//! Shares [`crate::services::EntityService::apply_mutation`] with the
//! delta-sync push path, so both surfaces enforce identical LWW and
//! parent-integrity rules.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::AppState;
use crate::auth::Owner;
use crate::error::ApiError;
use crate::models::{Item, ListPage};
use crate::services::{ApplyMutationOptions, EntityService};

use super::{etag_header_value, parse_family, parse_if_match, resolve_cursor};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/{family}", get(list).post(create))
        .route("/v1/{family}/{uid}", get(get_item).patch(update).delete(delete))
}

#[derive(Deserialize)]
struct ListQuery {
    cursor: Option<String>,
    limit: Option<i64>,
    #[serde(rename = "includeDeleted", default)]
    include_deleted: bool,
    strict: Option<bool>,
}

async fn list(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(family): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListPage>, ApiError> {
    let family = parse_family(&family)?;
    let cursor = resolve_cursor(query.cursor.as_deref(), query.strict.unwrap_or(false))?;
    let limit = state.config.limits.clamp_limit(query.limit, state.config.limits.rest_list_default_limit);

    let service = EntityService::new(family, state.db.clone());
    let page = service.list(owner, &cursor, limit, query.include_deleted).await?;
    Ok(Json(page))
}

#[derive(Deserialize)]
struct GetQuery {
    #[serde(rename = "includeDeleted", default)]
    include_deleted: bool,
}

async fn get_item(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path((family, uid)): Path<(String, Uuid)>,
    Query(query): Query<GetQuery>,
) -> Result<Response, ApiError> {
    let family = parse_family(&family)?;
    let service = EntityService::new(family, state.db.clone());
    let record = service.get(owner, uid).await?.ok_or(ApiError::NotFound)?;

    if record.is_tombstoned() && !query.include_deleted {
        return Err(ApiError::Gone);
    }

    let etag = etag_header_value(record.version);
    let item = Item::from(record);
    let mut response = Json(item).into_response();
    response
        .headers_mut()
        .insert(header::ETAG, etag.parse().expect("etag value is always valid ascii"));
    Ok(response)
}

async fn create(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(family): Path<String>,
    Json(payload): Json<Value>,
) -> Result<Response, ApiError> {
    let family = parse_family(&family)?;
    let service = EntityService::new(family, state.db.clone());
    let item = service.apply_mutation(owner, payload, ApplyMutationOptions::default()).await?;
    Ok(respond_with_etag(StatusCode::CREATED, item))
}

async fn update(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path((family, uid)): Path<(String, Uuid)>,
    headers: HeaderMap,
    Json(mut payload): Json<Value>,
) -> Result<Response, ApiError> {
    let family = parse_family(&family)?;
    let service = EntityService::new(family, state.db.clone());
    let expected_version = require_if_match(&headers)?;
    reject_absent_or_tombstoned(&service, owner, uid).await?;

    set_uid(&mut payload, uid);
    let opts = ApplyMutationOptions {
        enforce_version: true,
        expected_version,
        force_timestamp_ms: None,
        set_deleted: false,
    };
    let item = service.apply_mutation(owner, payload, opts).await?;
    Ok(respond_with_etag(StatusCode::OK, item))
}

async fn delete(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path((family, uid)): Path<(String, Uuid)>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let family = parse_family(&family)?;
    let service = EntityService::new(family, state.db.clone());
    let expected_version = require_if_match(&headers)?;
    reject_absent_or_tombstoned(&service, owner, uid).await?;

    let mut payload = serde_json::json!({});
    set_uid(&mut payload, uid);
    let opts = ApplyMutationOptions {
        enforce_version: true,
        expected_version,
        force_timestamp_ms: None,
        set_deleted: true,
    };
    let item = service.apply_mutation(owner, payload, opts).await?;
    Ok(respond_with_etag(StatusCode::OK, item))
}

fn require_if_match(headers: &HeaderMap) -> Result<i32, ApiError> {
    let raw = headers
        .get(header::IF_MATCH)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::BadRequest("If-Match header is required".into()))?;
    parse_if_match(raw)
}

/// PATCH/DELETE target a row by path `uid`; absent or tombstoned rows
/// are rejected before `apply_mutation` runs so the caller gets `404`/
/// `410` rather than a version-mismatch computed against a row that
/// doesn't (meaningfully) exist.
async fn reject_absent_or_tombstoned(service: &EntityService, owner: Uuid, uid: Uuid) -> Result<(), ApiError> {
    match service.get(owner, uid).await? {
        None => Err(ApiError::NotFound),
        Some(record) if record.is_tombstoned() => Err(ApiError::Gone),
        Some(_) => Ok(()),
    }
}

fn set_uid(payload: &mut Value, uid: Uuid) {
    if let Value::Object(map) = payload {
        map.insert("uid".to_string(), serde_json::json!(uid.to_string()));
    }
}

fn respond_with_etag(status: StatusCode, item: Item) -> Response {
    let etag = etag_header_value(item.version);
    let mut response = (status, Json(item)).into_response();
    response
        .headers_mut()
        .insert(header::ETAG, etag.parse().expect("etag value is always valid ascii"));
    response
}
