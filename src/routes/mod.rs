//! REST request surface.
//!
//! Split into two concerns: [`sync`] is the
//! delta-sync surface (`/v1/sync/...`, header-gated by session/epoch),
//! [`crud`] is single-item REST CRUD (`/v1/{family}/...`, gated by
//! ETag/`If-Match`). Both dispatch into the same [`crate::services`]
//! layer so the two surfaces share one set of invariants.

pub mod crud;
pub mod sync;

use axum::Router;

use crate::AppState;
use crate::error::ApiError;
use crate::extraction::Cursor;
use crate::models::Family;

pub fn router() -> Router<AppState> {
    Router::new().merge(sync::router()).merge(crud::router())
}

fn parse_family(segment: &str) -> Result<Family, ApiError> {
    Family::from_url_segment(segment).ok_or_else(|| ApiError::BadRequest(format!("unknown entity family: {segment}")))
}

/// Parse an `If-Match` value as the quoted integer version the
/// ETag contract uses.
fn parse_if_match(raw: &str) -> Result<i32, ApiError> {
    let trimmed = raw.trim();
    let unquoted = trimmed.strip_prefix('"').and_then(|s| s.strip_suffix('"')).unwrap_or(trimmed);
    unquoted
        .parse::<i32>()
        .map_err(|_| ApiError::BadRequest("malformed If-Match header, expected a quoted integer version".into()))
}

fn etag_header_value(version: i32) -> String {
    format!("\"{version}\"")
}

/// Resolve the cursor query parameter according to the validation mode
/// the caller selected.
fn resolve_cursor(cursor: Option<&str>, strict: bool) -> Result<String, ApiError> {
    let cursor = cursor.unwrap_or("");
    if strict {
        Cursor::decode(cursor)?;
    }
    Ok(cursor.to_string())
}
