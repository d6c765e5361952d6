//! Opaque pagination cursors.
//!
//! A cursor encodes a `(updated_at_ms, uid)` position in the strict total
//! order `Pull`/`List` range-scan over, so that resuming from it with a
//! strict-`>` predicate yields exactly the rows a client has not yet seen.
//! The uid breaks ties between rows sharing a millisecond.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CursorError {
    #[error("invalid cursor format")]
    InvalidFormat,
    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("invalid timestamp in cursor")]
    InvalidTimestamp,
    #[error("invalid uid in cursor")]
    InvalidUid,
}

/// A decoded cursor position: the `(updated_at_ms, uid)` tuple a range scan
/// resumes strictly after.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub updated_at_ms: i64,
    pub uid: Uuid,
}

impl Cursor {
    pub const BEGINNING: Cursor = Cursor {
        updated_at_ms: 0,
        uid: Uuid::nil(),
    };

    pub fn new(updated_at_ms: i64, uid: Uuid) -> Self {
        Self { updated_at_ms, uid }
    }

    /// Encode as `base64url(no-pad)("{ms}|{uuid}")`. Scoped to the endpoint
    /// that issues it: no table name or owner is embedded.
    pub fn encode(&self) -> String {
        let raw = format!("{}|{}", self.updated_at_ms, self.uid);
        URL_SAFE_NO_PAD.encode(raw.as_bytes())
    }

    /// Strict decode: a malformed string is always an error. Callers choose
    /// whether to surface that as `BadRequest` or fall back to `BEGINNING`
    /// (the tolerant default).
    pub fn decode(encoded: &str) -> Result<Self, CursorError> {
        if encoded.is_empty() {
            return Ok(Self::BEGINNING);
        }
        let bytes = URL_SAFE_NO_PAD.decode(encoded)?;
        let raw = String::from_utf8(bytes).map_err(|_| CursorError::InvalidFormat)?;
        let (ms_str, uid_str) = raw.split_once('|').ok_or(CursorError::InvalidFormat)?;
        let updated_at_ms: i64 = ms_str.parse().map_err(|_| CursorError::InvalidTimestamp)?;
        let uid = Uuid::parse_str(uid_str).map_err(|_| CursorError::InvalidUid)?;
        Ok(Self { updated_at_ms, uid })
    }

    /// Tolerant decode: an empty or unparseable cursor is treated as
    /// `BEGINNING` rather than rejected.
    pub fn decode_tolerant(encoded: &str) -> Self {
        Self::decode(encoded).unwrap_or(Self::BEGINNING)
    }
}

impl std::fmt::Display for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.encode())
    }
}
