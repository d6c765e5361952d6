//! Postgres-backed repo for the ChatMessage family, which
//! stores an extra `chat_uid` column absent from the five base-shape
//! tables and so gets its own narrow trait rather than
//! [`EntityRepo`](crate::db::repo::EntityRepo).

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Row};
use uuid::Uuid;

use crate::db::error::DbResult;
use crate::models::{EntityRecord, Family, UpsertOutcome};

use super::common;

const TABLE: &str = "chat_messages";

#[async_trait]
pub trait ChatMessageRepo: Send + Sync {
    fn family(&self) -> Family {
        Family::ChatMessage
    }

    #[allow(clippy::too_many_arguments)]
    async fn upsert(
        &self,
        conn: &mut PgConnection,
        owner_id: Uuid,
        uid: Uuid,
        updated_at_ms: i64,
        deleted_at_ms: Option<i64>,
        initial_version: i32,
        chat_uid: Uuid,
        payload: &serde_json::Value,
    ) -> DbResult<UpsertOutcome>;

    async fn get(&self, pool: &PgPool, owner_id: Uuid, uid: Uuid) -> DbResult<Option<EntityRecord>>;

    async fn range_after(
        &self,
        pool: &PgPool,
        owner_id: Uuid,
        after_ms: i64,
        after_uid: Uuid,
        limit: i64,
        include_deleted: bool,
    ) -> DbResult<Vec<EntityRecord>>;

    async fn is_live(&self, conn: &mut PgConnection, owner_id: Uuid, uid: Uuid) -> DbResult<bool>;

    async fn wipe_owner(&self, conn: &mut PgConnection, owner_id: Uuid) -> DbResult<u64>;
}

pub struct PostgresChatMessageRepo;

impl PostgresChatMessageRepo {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PostgresChatMessageRepo {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatMessageRepo for PostgresChatMessageRepo {
    async fn upsert(
        &self,
        conn: &mut PgConnection,
        owner_id: Uuid,
        uid: Uuid,
        updated_at_ms: i64,
        deleted_at_ms: Option<i64>,
        initial_version: i32,
        chat_uid: Uuid,
        payload: &serde_json::Value,
    ) -> DbResult<UpsertOutcome> {
        let query = r#"
            INSERT INTO chat_messages (
                owner_id, uid, updated_at_ms, deleted_at_ms, version, payload_json, created_at,
                chat_uid
            )
            VALUES ($1, $2, $3, $4, GREATEST($5, 1), $6, now(), $7)
            ON CONFLICT (owner_id, uid) DO UPDATE SET
                updated_at_ms = EXCLUDED.updated_at_ms,
                deleted_at_ms = EXCLUDED.deleted_at_ms,
                payload_json = EXCLUDED.payload_json,
                chat_uid = EXCLUDED.chat_uid,
                version = chat_messages.version + 1
            WHERE chat_messages.updated_at_ms < EXCLUDED.updated_at_ms
            RETURNING version, updated_at_ms
        "#;

        let row = sqlx::query(query)
            .bind(owner_id)
            .bind(uid)
            .bind(updated_at_ms)
            .bind(deleted_at_ms)
            .bind(initial_version)
            .bind(payload)
            .bind(chat_uid)
            .fetch_optional(&mut *conn)
            .await?;

        let outcome = if let Some(row) = row {
            UpsertOutcome {
                version: row.get("version"),
                updated_at_ms: row.get("updated_at_ms"),
            }
        } else {
            let row =
                sqlx::query("SELECT version, updated_at_ms FROM chat_messages WHERE owner_id = $1 AND uid = $2")
                    .bind(owner_id)
                    .bind(uid)
                    .fetch_optional(&mut *conn)
                    .await?
                    .ok_or(crate::db::error::DbError::NotFound)?;
            UpsertOutcome {
                version: row.get("version"),
                updated_at_ms: row.get("updated_at_ms"),
            }
        };

        common::fix_payload_version(conn, TABLE, owner_id, uid, updated_at_ms, outcome).await?;
        Ok(outcome)
    }

    async fn get(&self, pool: &PgPool, owner_id: Uuid, uid: Uuid) -> DbResult<Option<EntityRecord>> {
        common::get_row(pool, TABLE, owner_id, uid).await
    }

    async fn range_after(
        &self,
        pool: &PgPool,
        owner_id: Uuid,
        after_ms: i64,
        after_uid: Uuid,
        limit: i64,
        include_deleted: bool,
    ) -> DbResult<Vec<EntityRecord>> {
        common::range_after(pool, TABLE, owner_id, after_ms, after_uid, limit, include_deleted).await
    }

    async fn is_live(&self, conn: &mut PgConnection, owner_id: Uuid, uid: Uuid) -> DbResult<bool> {
        common::is_live(conn, TABLE, owner_id, uid).await
    }

    async fn wipe_owner(&self, conn: &mut PgConnection, owner_id: Uuid) -> DbResult<u64> {
        common::wipe_owner(conn, TABLE, owner_id).await
    }
}
