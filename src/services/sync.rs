//! `Push`, `Pull`, `Get`, `List` for a single entity family.
//!
//! The five base-shape families share one upsert/get/range-scan shape
//! (`EntityRepo`); Comment and ChatMessage carry one extra column each
//! and get their own repo traits. [`EntityService`] hides that split
//! behind a per-family dispatch so routes never need to know which
//! shape a family has.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::db::{DbError, DbPool, DbResult};
use crate::error::ApiError;
use crate::extraction::{self, Cursor, SyncMetadata, timestamp::format_rfc3339_millis};
use crate::models::{DeleteEntry, EntityRecord, Family, ListItem, ListPage, PullPage, PushAck, UpsertOutcome};

#[derive(Clone)]
pub struct EntityService {
    family: Family,
    db: Arc<DbPool>,
}

impl EntityService {
    pub fn new(family: Family, db: Arc<DbPool>) -> Self {
        Self { family, db }
    }

    pub fn family(&self) -> Family {
        self.family
    }

    /// Push a whole batch inside one transaction. Item-level failures
    /// (extraction, parent integrity) are collected into the returned
    /// acks; any database error aborts and rolls back the entire batch
    ///.
    pub async fn push_batch(&self, owner_id: Uuid, items: Vec<Value>) -> Result<Vec<PushAck>, ApiError> {
        let mut tx = self.db.write_pool().begin().await.map_err(DbError::from)?;
        let now_ms = Utc::now().timestamp_millis();

        let mut acks = Vec::with_capacity(items.len());
        for payload in items {
            match self.push_item(&mut tx, owner_id, payload, now_ms).await {
                Ok(ack) => acks.push(ack),
                Err(err) => return Err(ApiError::from(err)),
            }
        }

        tx.commit().await.map_err(DbError::from)?;
        Ok(acks)
    }

    /// `PushItem`. `Ok(PushAck{error: Some(_), ..})` is an
    /// item-level failure that does not abort the caller's transaction;
    /// `Err` is a database-level failure that does.
    pub async fn push_item(
        &self,
        conn: &mut PgConnection,
        owner_id: Uuid,
        payload: Value,
        now_ms: i64,
    ) -> DbResult<PushAck> {
        match self.push_item_typed(conn, owner_id, payload, now_ms).await? {
            Ok(success) => Ok(PushAck {
                uid: Some(success.uid),
                version: Some(success.version),
                updated_at: Some(format_rfc3339_millis(success.updated_at_ms)),
                error: None,
            }),
            Err(failure) => Ok(item_error(failure.uid(), failure.message().to_string())),
        }
    }

    /// Same algorithm as [`Self::push_item`] but preserves whether an
    /// item-level failure was an extraction error or a parent-integrity
    /// failure, so [`super::mutation`] can map it to the right REST
    /// status.
    pub(crate) async fn push_item_typed(
        &self,
        conn: &mut PgConnection,
        owner_id: Uuid,
        payload: Value,
        now_ms: i64,
    ) -> DbResult<Result<PushSuccess, ItemFailure>> {
        let meta = match extraction::extract(self.family, &payload, now_ms) {
            Ok(meta) => meta,
            Err(err) => return Ok(Err(ItemFailure::Extraction(None, err.to_string()))),
        };

        if !meta.is_tombstone()
            && let Some(reason) = self.check_parent(conn, owner_id, &meta).await?
        {
            return Ok(Err(ItemFailure::ParentMissing(meta.uid, reason)));
        }

        let outcome = self.upsert(conn, owner_id, &meta, &payload).await?;
        Ok(Ok(PushSuccess {
            uid: meta.uid,
            version: outcome.version,
            updated_at_ms: outcome.updated_at_ms,
        }))
    }

    /// Parent-integrity check.
    /// Returns `Some(reason)` when the check fails.
    async fn check_parent(
        &self,
        conn: &mut PgConnection,
        owner_id: Uuid,
        meta: &SyncMetadata,
    ) -> DbResult<Option<String>> {
        if let Some(parent) = meta.parent {
            let parent_service = EntityService::new(parent.parent_type.as_family(), Arc::clone(&self.db));
            if !parent_service.is_live(conn, owner_id, parent.parent_uid).await? {
                return Ok(Some("parent is missing or not live".to_string()));
            }
        }
        if let Some(chat_uid) = meta.chat_uid {
            let chat_service = EntityService::new(Family::Chat, Arc::clone(&self.db));
            if !chat_service.is_live(conn, owner_id, chat_uid).await? {
                return Ok(Some("chat is missing or not live".to_string()));
            }
        }
        Ok(None)
    }

    /// `Pull`: split upserts/deletes, always including
    /// tombstones regardless of any `includeDeleted` toggle -- pull has
    /// no such parameter, deletes surface indefinitely.
    pub async fn pull(&self, owner_id: Uuid, cursor: &str, limit: i64) -> Result<PullPage, ApiError> {
        let position = Cursor::decode_tolerant(cursor);
        let rows = self
            .range_after(owner_id, position.updated_at_ms, position.uid, limit, true)
            .await?;

        let mut page = PullPage::default();
        for row in &rows {
            match row.deleted_at_ms {
                Some(deleted_ms) => page.deletes.push(DeleteEntry {
                    uid: row.uid,
                    deleted_at: format_rfc3339_millis(deleted_ms),
                }),
                None => page.upserts.push(row.payload_json.clone()),
            }
        }
        if let Some(last) = rows.last() {
            page.next_cursor = Some(Cursor::new(last.updated_at_ms, last.uid).encode());
        }
        Ok(page)
    }

    /// `Get`: returns the row regardless of tombstone status;
    /// the REST layer decides the status code.
    pub async fn get(&self, owner_id: Uuid, uid: Uuid) -> Result<Option<EntityRecord>, ApiError> {
        Ok(self.get_raw(owner_id, uid).await?)
    }

    pub(crate) fn db(&self) -> &Arc<DbPool> {
        &self.db
    }

    /// `List`: unified `items` array, optionally excluding
    /// tombstones.
    pub async fn list(
        &self,
        owner_id: Uuid,
        cursor: &str,
        limit: i64,
        include_deleted: bool,
    ) -> Result<ListPage, ApiError> {
        let position = Cursor::decode_tolerant(cursor);
        let rows = self
            .range_after(owner_id, position.updated_at_ms, position.uid, limit, include_deleted)
            .await?;

        let mut page = ListPage::default();
        for row in &rows {
            page.items.push(ListItem {
                uid: row.uid,
                version: row.version,
                updated_at: format_rfc3339_millis(row.updated_at_ms),
                deleted_at: row.deleted_at_ms.map(format_rfc3339_millis),
                payload: row.payload_json.clone(),
            });
        }
        if let Some(last) = rows.last() {
            page.next_cursor = Some(Cursor::new(last.updated_at_ms, last.uid).encode());
        }
        Ok(page)
    }

    pub(crate) async fn upsert(
        &self,
        conn: &mut PgConnection,
        owner_id: Uuid,
        meta: &SyncMetadata,
        payload: &Value,
    ) -> DbResult<UpsertOutcome> {
        match self.family {
            Family::Comment => {
                let parent = meta.parent.expect("comment metadata always carries a parent ref");
                self.db
                    .comments()
                    .upsert(
                        conn,
                        owner_id,
                        meta.uid,
                        meta.updated_at_ms,
                        meta.deleted_at_ms,
                        meta.version,
                        parent.parent_type,
                        parent.parent_uid,
                        payload,
                    )
                    .await
            }
            Family::ChatMessage => {
                let chat_uid = meta.chat_uid.expect("chat message metadata always carries a chat uid");
                self.db
                    .chat_messages()
                    .upsert(
                        conn,
                        owner_id,
                        meta.uid,
                        meta.updated_at_ms,
                        meta.deleted_at_ms,
                        meta.version,
                        chat_uid,
                        payload,
                    )
                    .await
            }
            base => {
                let repo = self.db.entity(base).expect("base family repos are always registered");
                repo.upsert(conn, owner_id, meta.uid, meta.updated_at_ms, meta.deleted_at_ms, meta.version, payload)
                    .await
            }
        }
    }

    pub(crate) async fn get_raw(&self, owner_id: Uuid, uid: Uuid) -> DbResult<Option<EntityRecord>> {
        match self.family {
            Family::Comment => self.db.comments().get(self.db.read_pool(), owner_id, uid).await,
            Family::ChatMessage => self.db.chat_messages().get(self.db.read_pool(), owner_id, uid).await,
            base => {
                self.db
                    .entity(base)
                    .expect("base family repos are always registered")
                    .get(self.db.read_pool(), owner_id, uid)
                    .await
            }
        }
    }

    async fn range_after(
        &self,
        owner_id: Uuid,
        after_ms: i64,
        after_uid: Uuid,
        limit: i64,
        include_deleted: bool,
    ) -> DbResult<Vec<EntityRecord>> {
        match self.family {
            Family::Comment => {
                self.db
                    .comments()
                    .range_after(self.db.read_pool(), owner_id, after_ms, after_uid, limit, include_deleted)
                    .await
            }
            Family::ChatMessage => {
                self.db
                    .chat_messages()
                    .range_after(self.db.read_pool(), owner_id, after_ms, after_uid, limit, include_deleted)
                    .await
            }
            base => {
                self.db
                    .entity(base)
                    .expect("base family repos are always registered")
                    .range_after(self.db.read_pool(), owner_id, after_ms, after_uid, limit, include_deleted)
                    .await
            }
        }
    }

    /// Whether a non-tombstoned row exists for `uid`, used for parent
    /// integrity checks. `self.family` here is the *parent* family
    /// (Note, Task, or Chat), not the child being pushed.
    async fn is_live(&self, conn: &mut PgConnection, owner_id: Uuid, uid: Uuid) -> DbResult<bool> {
        match self.family {
            Family::Comment => self.db.comments().is_live(conn, owner_id, uid).await,
            Family::ChatMessage => self.db.chat_messages().is_live(conn, owner_id, uid).await,
            base => {
                self.db
                    .entity(base)
                    .expect("base family repos are always registered")
                    .is_live(conn, owner_id, uid)
                    .await
            }
        }
    }
}

fn item_error(uid: Option<Uuid>, message: String) -> PushAck {
    PushAck {
        uid,
        version: None,
        updated_at: None,
        error: Some(message),
    }
}

/// A successful [`EntityService::push_item_typed`] outcome.
pub(crate) struct PushSuccess {
    pub uid: Uuid,
    pub version: i32,
    pub updated_at_ms: i64,
}

/// Why a single item in a push/mutation failed, preserved so callers can
/// map it to the right REST status instead of a flat string.
pub(crate) enum ItemFailure {
    /// Extraction rejected the payload outright (malformed/missing
    /// fields) -- no `uid` could be trusted.
    Extraction(Option<Uuid>, String),
    /// The payload extracted cleanly but its parent/chat is missing or
    /// not live.
    ParentMissing(Uuid, String),
}

impl ItemFailure {
    fn uid(&self) -> Option<Uuid> {
        match self {
            ItemFailure::Extraction(uid, _) => *uid,
            ItemFailure::ParentMissing(uid, _) => Some(*uid),
        }
    }

    fn message(&self) -> &str {
        match self {
            ItemFailure::Extraction(_, msg) => msg,
            ItemFailure::ParentMissing(_, msg) => msg,
        }
    }
}
