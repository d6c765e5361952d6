//! Postgres-backed repo for the Comment family, which stores
//! an extra `(parent_type, parent_uid)` pair absent from the five
//! base-shape tables and so gets its own narrow trait rather than
//! [`EntityRepo`](crate::db::repo::EntityRepo).

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Row};
use uuid::Uuid;

use crate::db::error::DbResult;
use crate::extraction::ParentType;
use crate::models::{EntityRecord, Family, UpsertOutcome};

use super::common;

const TABLE: &str = "comments";

#[async_trait]
pub trait CommentRepo: Send + Sync {
    fn family(&self) -> Family {
        Family::Comment
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
        parent_type: ParentType,
        parent_uid: Uuid,
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

fn parent_type_str(p: ParentType) -> &'static str {
    match p {
        ParentType::Note => "note",
        ParentType::Task => "task",
    }
}

pub struct PostgresCommentRepo;

impl PostgresCommentRepo {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PostgresCommentRepo {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommentRepo for PostgresCommentRepo {
    async fn upsert(
        &self,
        conn: &mut PgConnection,
        owner_id: Uuid,
        uid: Uuid,
        updated_at_ms: i64,
        deleted_at_ms: Option<i64>,
        initial_version: i32,
        parent_type: ParentType,
        parent_uid: Uuid,
        payload: &serde_json::Value,
    ) -> DbResult<UpsertOutcome> {
        let query = r#"
            INSERT INTO comments (
                owner_id, uid, updated_at_ms, deleted_at_ms, version, payload_json, created_at,
                parent_type, parent_uid
            )
            VALUES ($1, $2, $3, $4, GREATEST($5, 1), $6, now(), $7, $8)
            ON CONFLICT (owner_id, uid) DO UPDATE SET
                updated_at_ms = EXCLUDED.updated_at_ms,
                deleted_at_ms = EXCLUDED.deleted_at_ms,
                payload_json = EXCLUDED.payload_json,
                parent_type = EXCLUDED.parent_type,
                parent_uid = EXCLUDED.parent_uid,
                version = comments.version + 1
            WHERE comments.updated_at_ms < EXCLUDED.updated_at_ms
            RETURNING version, updated_at_ms
        "#;

        let row = sqlx::query(query)
            .bind(owner_id)
            .bind(uid)
            .bind(updated_at_ms)
            .bind(deleted_at_ms)
            .bind(initial_version)
            .bind(payload)
            .bind(parent_type_str(parent_type))
            .bind(parent_uid)
            .fetch_optional(&mut *conn)
            .await?;

        let outcome = if let Some(row) = row {
            UpsertOutcome {
                version: row.get("version"),
                updated_at_ms: row.get("updated_at_ms"),
            }
        } else {
            let row = sqlx::query("SELECT version, updated_at_ms FROM comments WHERE owner_id = $1 AND uid = $2")
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
