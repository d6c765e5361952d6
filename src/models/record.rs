//! Wire and storage shapes shared by every entity family.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

/// A row as read back from storage.
#[derive(Debug, Clone)]
pub struct EntityRecord {
    pub uid: Uuid,
    pub owner_id: Uuid,
    pub updated_at_ms: i64,
    pub deleted_at_ms: Option<i64>,
    pub version: i32,
    pub payload_json: Value,
    pub created_at: DateTime<Utc>,
}

impl EntityRecord {
    pub fn is_tombstoned(&self) -> bool {
        self.deleted_at_ms.is_some()
    }
}

/// Outcome of a single LWW upsert: the authoritative `(version,
/// updated_at_ms)` after the guard either fired or didn't.
#[derive(Debug, Clone, Copy)]
pub struct UpsertOutcome {
    pub version: i32,
    pub updated_at_ms: i64,
}

/// Acknowledgement for one pushed item.
#[derive(Debug, Clone, Serialize, Default)]
pub struct PushAck {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<i32>,
    #[serde(rename = "updatedAt", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One tombstone surfaced by a delta pull.
#[derive(Debug, Clone, Serialize)]
pub struct DeleteEntry {
    pub uid: Uuid,
    #[serde(rename = "deletedAt")]
    pub deleted_at: String,
}

/// Response body for `GET /v1/sync/{family}/pull`.
#[derive(Debug, Clone, Serialize, Default)]
pub struct PullPage {
    pub upserts: Vec<Value>,
    pub deletes: Vec<DeleteEntry>,
    #[serde(rename = "nextCursor", skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

/// One item in a unified REST list response.
#[derive(Debug, Clone, Serialize)]
pub struct ListItem {
    pub uid: Uuid,
    pub version: i32,
    #[serde(rename = "updatedAt")]
    pub updated_at: String,
    #[serde(rename = "deletedAt", skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<String>,
    pub payload: Value,
}

/// Response body for REST family list endpoints.
#[derive(Debug, Clone, Serialize, Default)]
pub struct ListPage {
    pub items: Vec<ListItem>,
    #[serde(rename = "nextCursor", skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

/// A single item in a REST response: version, timestamps, and payload
///.
#[derive(Debug, Clone, Serialize)]
pub struct Item {
    pub uid: Uuid,
    pub version: i32,
    #[serde(rename = "updatedAt")]
    pub updated_at: String,
    #[serde(rename = "deletedAt", skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<String>,
    pub payload: Value,
}

impl From<EntityRecord> for Item {
    fn from(r: EntityRecord) -> Self {
        use crate::extraction::timestamp::format_rfc3339_millis;
        Item {
            uid: r.uid,
            version: r.version,
            updated_at: format_rfc3339_millis(r.updated_at_ms),
            deleted_at: r.deleted_at_ms.map(format_rfc3339_millis),
            payload: r.payload_json,
        }
    }
}
