//! Per-owner epoch bookkeeping. The epoch increments on
//! every full wipe; sessions opened before a bump are stale and get
//! rejected by the session-epoch guard.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgConnection, PgPool, Row};
use uuid::Uuid;

use crate::db::error::DbResult;
use crate::models::OwnerState;

#[async_trait]
pub trait OwnerStateRepo: Send + Sync {
    /// Fetch the owner's state, creating it at epoch 1 if this is the
    /// owner's first contact with the service.
    async fn get_or_create(&self, pool: &PgPool, owner_id: Uuid) -> DbResult<OwnerState>;

    /// Increment the owner's epoch and stamp the wipe, inside the
    /// caller's transaction. Returns the new epoch.
    async fn bump_epoch(&self, conn: &mut PgConnection, owner_id: Uuid, wiped_by: Uuid) -> DbResult<i64>;
}

fn row_to_state(row: &sqlx::postgres::PgRow) -> OwnerState {
    OwnerState {
        owner_id: row.get("owner_id"),
        epoch: row.get("epoch"),
        last_wipe_at: row.get("last_wipe_at"),
        last_wipe_by: row.get("last_wipe_by"),
    }
}

pub struct PostgresOwnerStateRepo;

impl PostgresOwnerStateRepo {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PostgresOwnerStateRepo {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OwnerStateRepo for PostgresOwnerStateRepo {
    async fn get_or_create(&self, pool: &PgPool, owner_id: Uuid) -> DbResult<OwnerState> {
        let row = sqlx::query(
            r#"
            INSERT INTO owner_state (owner_id, epoch)
            VALUES ($1, 1)
            ON CONFLICT (owner_id) DO UPDATE SET owner_id = owner_state.owner_id
            RETURNING owner_id, epoch, last_wipe_at, last_wipe_by
            "#,
        )
        .bind(owner_id)
        .fetch_one(pool)
        .await?;
        Ok(row_to_state(&row))
    }

    async fn bump_epoch(&self, conn: &mut PgConnection, owner_id: Uuid, wiped_by: Uuid) -> DbResult<i64> {
        let now = Utc::now();
        let epoch: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO owner_state (owner_id, epoch, last_wipe_at, last_wipe_by)
            VALUES ($1, 2, $2, $3)
            ON CONFLICT (owner_id) DO UPDATE SET
                epoch = owner_state.epoch + 1,
                last_wipe_at = EXCLUDED.last_wipe_at,
                last_wipe_by = EXCLUDED.last_wipe_by
            RETURNING epoch
            "#,
        )
        .bind(owner_id)
        .bind(now)
        .bind(wiped_by)
        .fetch_one(&mut *conn)
        .await?;
        Ok(epoch)
    }
}
