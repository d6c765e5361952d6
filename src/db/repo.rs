//! Storage-layer contracts shared by every entity family.
//!
//! Every method here runs against a caller-supplied connection so the
//! service layer controls transaction boundaries; nothing in this crate
//! opens its own transaction except the session coordinator's wipe.

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::{EntityRecord, Family, UpsertOutcome};

use super::error::DbResult;

/// CRUD and range-scan access to one entity family's table.
#[async_trait]
pub trait EntityRepo: Send + Sync {
    fn family(&self) -> Family;

    /// Insert or update a row under the LWW guard.
    ///
    /// The guard only lets the write through when `updated_at_ms` is
    /// strictly greater than the stored value; replays and stale writes
    /// are no-ops that return the row's current authoritative state.
    /// `initial_version` seeds the row's `version` on insert`); it is ignored on conflict,
    /// where the guarded `UPDATE` always increments the stored version.
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
    ) -> DbResult<UpsertOutcome>;

    async fn get(&self, pool: &PgPool, owner_id: Uuid, uid: Uuid) -> DbResult<Option<EntityRecord>>;

    /// Rows for `owner_id` ordered by `(updated_at_ms, uid)` strictly after
    /// the given position, used by both delta pull and REST list.
    async fn range_after(
        &self,
        pool: &PgPool,
        owner_id: Uuid,
        after_ms: i64,
        after_uid: Uuid,
        limit: i64,
        include_deleted: bool,
    ) -> DbResult<Vec<EntityRecord>>;

    /// Whether a non-tombstoned row exists for `uid`.
    async fn is_live(&self, conn: &mut PgConnection, owner_id: Uuid, uid: Uuid) -> DbResult<bool>;

    /// Delete every row owned by `owner_id`. Used only by the full-wipe
    /// path, which supplies its own transaction.
    async fn wipe_owner(&self, conn: &mut PgConnection, owner_id: Uuid) -> DbResult<u64>;
}
