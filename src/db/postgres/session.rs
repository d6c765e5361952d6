//! Sync session lifecycle: a session binds a client to
//! the owner epoch observed when it opened, and is valid until closed
//! or until 24h has passed since it was last touched.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool, Row};
use uuid::Uuid;

use crate::db::error::DbResult;
use crate::models::SyncSession;

#[async_trait]
pub trait SessionRepo: Send + Sync {
    async fn open(&self, pool: &PgPool, owner_id: Uuid, epoch_at_open: i64) -> DbResult<SyncSession>;

    async fn get(&self, pool: &PgPool, session_id: Uuid) -> DbResult<Option<SyncSession>>;

    /// Bump `last_seen_at` to now, used on every sync request that
    /// presents this session.
    async fn touch(&self, pool: &PgPool, session_id: Uuid) -> DbResult<()>;

    async fn close(&self, conn: &mut PgConnection, session_id: Uuid) -> DbResult<()>;

    /// Close every open session for an owner, run as part of a full wipe.
    async fn close_all_for_owner(&self, conn: &mut PgConnection, owner_id: Uuid) -> DbResult<()>;
}

fn row_to_session(row: &sqlx::postgres::PgRow) -> SyncSession {
    SyncSession {
        session_id: row.get("session_id"),
        owner_id: row.get("owner_id"),
        created_at: row.get("created_at"),
        last_seen_at: row.get("last_seen_at"),
        epoch_at_open: row.get("epoch_at_open"),
        closed_at: row.get("closed_at"),
    }
}

pub struct PostgresSessionRepo;

impl PostgresSessionRepo {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PostgresSessionRepo {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionRepo for PostgresSessionRepo {
    async fn open(&self, pool: &PgPool, owner_id: Uuid, epoch_at_open: i64) -> DbResult<SyncSession> {
        let session_id = Uuid::new_v4();
        let now: DateTime<Utc> = Utc::now();
        let row = sqlx::query(
            r#"
            INSERT INTO sync_sessions (session_id, owner_id, created_at, last_seen_at, epoch_at_open)
            VALUES ($1, $2, $3, $3, $4)
            RETURNING session_id, owner_id, created_at, last_seen_at, epoch_at_open, closed_at
            "#,
        )
        .bind(session_id)
        .bind(owner_id)
        .bind(now)
        .bind(epoch_at_open)
        .fetch_one(pool)
        .await?;
        Ok(row_to_session(&row))
    }

    async fn get(&self, pool: &PgPool, session_id: Uuid) -> DbResult<Option<SyncSession>> {
        let row = sqlx::query(
            "SELECT session_id, owner_id, created_at, last_seen_at, epoch_at_open, closed_at
             FROM sync_sessions WHERE session_id = $1",
        )
        .bind(session_id)
        .fetch_optional(pool)
        .await?;
        Ok(row.as_ref().map(row_to_session))
    }

    async fn touch(&self, pool: &PgPool, session_id: Uuid) -> DbResult<()> {
        sqlx::query("UPDATE sync_sessions SET last_seen_at = now() WHERE session_id = $1 AND closed_at IS NULL")
            .bind(session_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    async fn close(&self, conn: &mut PgConnection, session_id: Uuid) -> DbResult<()> {
        sqlx::query("UPDATE sync_sessions SET closed_at = now() WHERE session_id = $1 AND closed_at IS NULL")
            .bind(session_id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    async fn close_all_for_owner(&self, conn: &mut PgConnection, owner_id: Uuid) -> DbResult<()> {
        sqlx::query("UPDATE sync_sessions SET closed_at = now() WHERE owner_id = $1 AND closed_at IS NULL")
            .bind(owner_id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }
}
