//! Generic Postgres-backed [`EntityRepo`] for the five base-shape
//! families: Note, Task, TaskList, TaskListCategory, Chat.
//! These tables differ only by name; Comment and ChatMessage carry an
//! extra column and get their own repos in [`super::comments`] and
//! [`super::chat_messages`].

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::db::error::DbResult;
use crate::db::repo::EntityRepo;
use crate::models::{EntityRecord, Family, UpsertOutcome};

use super::common;

pub struct PostgresEntityRepo {
    family: Family,
    table: &'static str,
}

impl PostgresEntityRepo {
    pub fn new(family: Family) -> Self {
        Self {
            family,
            table: family.table(),
        }
    }
}

#[async_trait]
impl EntityRepo for PostgresEntityRepo {
    fn family(&self) -> Family {
        self.family
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
        payload: &serde_json::Value,
    ) -> DbResult<UpsertOutcome> {
        common::upsert_base(
            conn,
            self.table,
            owner_id,
            uid,
            updated_at_ms,
            deleted_at_ms,
            initial_version,
            payload,
        )
        .await
    }

    async fn get(&self, pool: &PgPool, owner_id: Uuid, uid: Uuid) -> DbResult<Option<EntityRecord>> {
        common::get_row(pool, self.table, owner_id, uid).await
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
        common::range_after(pool, self.table, owner_id, after_ms, after_uid, limit, include_deleted).await
    }

    async fn is_live(&self, conn: &mut PgConnection, owner_id: Uuid, uid: Uuid) -> DbResult<bool> {
        common::is_live(conn, self.table, owner_id, uid).await
    }

    async fn wipe_owner(&self, conn: &mut PgConnection, owner_id: Uuid) -> DbResult<u64> {
        common::wipe_owner(conn, self.table, owner_id).await
    }
}
