//! Owner epoch state and sync session handles.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Per-owner epoch record. Created lazily; `epoch` starts at 1 and
/// increments on every full wipe.
#[derive(Debug, Clone)]
pub struct OwnerState {
    pub owner_id: Uuid,
    pub epoch: i64,
    pub last_wipe_at: Option<DateTime<Utc>>,
    pub last_wipe_by: Option<Uuid>,
}

/// A sync session binding a client to the epoch it observed when opened.
#[derive(Debug, Clone)]
pub struct SyncSession {
    pub session_id: Uuid,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub epoch_at_open: i64,
    pub closed_at: Option<DateTime<Utc>>,
}

impl SyncSession {
    pub fn is_open(&self) -> bool {
        self.closed_at.is_none()
    }

    pub fn is_expired(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> bool {
        now - self.last_seen_at > ttl
    }
}
