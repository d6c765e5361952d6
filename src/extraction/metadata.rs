//! Extraction of sync metadata from an opaque client payload.
//!
//! The engine never validates or interprets entity bodies beyond this:
//! pulling out the fields it needs to place the write in the LWW total
//! order and, for Comment/ChatMessage, to check parent integrity.

use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use super::timestamp::parse_timestamp_ms;
use crate::models::Family;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("missing or invalid uid")]
    InvalidUid,
    #[error("missing or invalid parentType (expected \"note\" or \"task\")")]
    InvalidParentType,
    #[error("missing or invalid parentUid")]
    InvalidParentUid,
    #[error("missing or invalid chatUid")]
    InvalidChatUid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentType {
    Note,
    Task,
}

impl ParentType {
    pub fn as_family(self) -> Family {
        match self {
            ParentType::Note => Family::Note,
            ParentType::Task => Family::Task,
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "note" => Some(ParentType::Note),
            "task" => Some(ParentType::Task),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ParentRef {
    pub parent_type: ParentType,
    pub parent_uid: Uuid,
}

/// Sync metadata pulled out of one client payload.
#[derive(Debug, Clone)]
pub struct SyncMetadata {
    pub uid: Uuid,
    pub updated_at_ms: i64,
    pub version: i32,
    pub is_deleted: bool,
    pub deleted_at_ms: Option<i64>,
    pub parent: Option<ParentRef>,
    pub chat_uid: Option<Uuid>,
}

impl SyncMetadata {
    pub fn is_tombstone(&self) -> bool {
        self.is_deleted
    }
}

/// Extract sync metadata from `payload` for the given `family`.
///
/// `now_ms` supplies the fallback "server time" for a missing timestamp.
pub fn extract(family: Family, payload: &Value, now_ms: i64) -> Result<SyncMetadata, ExtractionError> {
    let uid = payload
        .get("uid")
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or(ExtractionError::InvalidUid)?;

    let updated_at_ms = ["updatedTs", "updatedAt", "updateTime"]
        .iter()
        .find_map(|key| payload.get(*key).and_then(parse_timestamp_ms))
        .unwrap_or(now_ms);

    let sync = payload.get("sync");

    let version = sync
        .and_then(|s| s.get("version"))
        .and_then(Value::as_i64)
        .map(|v| v.max(1) as i32)
        .unwrap_or(1);

    let is_deleted = sync
        .and_then(|s| s.get("isDeleted"))
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let deleted_at_ms = if is_deleted {
        Some(
            sync.and_then(|s| s.get("deletedAt"))
                .and_then(parse_timestamp_ms)
                .unwrap_or(updated_at_ms),
        )
    } else {
        None
    };

    let parent = match family {
        Family::Comment => Some(extract_parent_ref(payload)?),
        _ => None,
    };

    let chat_uid = match family {
        Family::ChatMessage => Some(
            payload
                .get("chatUid")
                .and_then(Value::as_str)
                .and_then(|s| Uuid::parse_str(s).ok())
                .ok_or(ExtractionError::InvalidChatUid)?,
        ),
        _ => None,
    };

    Ok(SyncMetadata {
        uid,
        updated_at_ms,
        version,
        is_deleted,
        deleted_at_ms,
        parent,
        chat_uid,
    })
}

fn extract_parent_ref(payload: &Value) -> Result<ParentRef, ExtractionError> {
    let parent_type = payload
        .get("parentType")
        .and_then(Value::as_str)
        .and_then(ParentType::parse)
        .ok_or(ExtractionError::InvalidParentType)?;
    let parent_uid = payload
        .get("parentUid")
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or(ExtractionError::InvalidParentUid)?;
    Ok(ParentRef {
        parent_type,
        parent_uid,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_basic_note() {
        let payload = json!({
            "uid": "3fa85f64-5717-4562-b3fc-2c963f66afa6",
            "updatedTs": "2024-11-03T10:00:00Z",
            "sync": { "version": 1, "isDeleted": false },
        });
        let meta = extract(Family::Note, &payload, 0).unwrap();
        assert_eq!(meta.updated_at_ms, 1730628000000);
        assert_eq!(meta.version, 1);
        assert!(!meta.is_deleted);
    }

    #[test]
    fn missing_uid_errors() {
        let payload = json!({});
        assert_eq!(extract(Family::Note, &payload, 0), Err(ExtractionError::InvalidUid));
    }

    #[test]
    fn falls_back_to_server_time() {
        let payload = json!({ "uid": Uuid::nil().to_string() });
        let meta = extract(Family::Note, &payload, 42).unwrap();
        assert_eq!(meta.updated_at_ms, 42);
    }

    #[test]
    fn version_floors_to_one() {
        let payload = json!({ "uid": Uuid::nil().to_string(), "sync": { "version": 0 } });
        let meta = extract(Family::Note, &payload, 0).unwrap();
        assert_eq!(meta.version, 1);
    }

    #[test]
    fn tombstone_inherits_updated_at_when_deleted_at_missing() {
        let payload = json!({
            "uid": Uuid::nil().to_string(),
            "updatedTs": "2024-11-03T10:00:05Z",
            "sync": { "isDeleted": true },
        });
        let meta = extract(Family::Note, &payload, 0).unwrap();
        assert_eq!(meta.deleted_at_ms, Some(meta.updated_at_ms));
    }

    #[test]
    fn comment_requires_parent_ref() {
        let payload = json!({ "uid": Uuid::nil().to_string() });
        assert_eq!(
            extract(Family::Comment, &payload, 0),
            Err(ExtractionError::InvalidParentType)
        );

        let payload = json!({
            "uid": Uuid::nil().to_string(),
            "parentType": "note",
            "parentUid": Uuid::nil().to_string(),
        });
        let meta = extract(Family::Comment, &payload, 0).unwrap();
        let parent = meta.parent.unwrap();
        assert_eq!(parent.parent_type, ParentType::Note);
    }

    #[test]
    fn chat_message_requires_chat_uid() {
        let payload = json!({ "uid": Uuid::nil().to_string() });
        assert_eq!(
            extract(Family::ChatMessage, &payload, 0),
            Err(ExtractionError::InvalidChatUid)
        );
    }

    #[test]
    fn priority_order_prefers_updated_ts() {
        let payload = json!({
            "uid": Uuid::nil().to_string(),
            "updatedTs": "2024-11-03T10:00:00Z",
            "updatedAt": "2024-11-03T11:00:00Z",
            "updateTime": "2024-11-03T12:00:00Z",
        });
        let meta = extract(Family::Note, &payload, 0).unwrap();
        assert_eq!(meta.updated_at_ms, 1730628000000);
    }
}
