//! SQL shared by every base-shape family table. Table names are internal constants
//! from [`Family::table`], never user input, so `format!`-built
//! identifiers are safe here.

use sqlx::{PgConnection, PgPool, Row};
use uuid::Uuid;

use crate::db::error::{DbError, DbResult};
use crate::models::{EntityRecord, UpsertOutcome};

fn row_to_record(row: &sqlx::postgres::PgRow) -> EntityRecord {
    EntityRecord {
        uid: row.get("uid"),
        owner_id: row.get("owner_id"),
        updated_at_ms: row.get("updated_at_ms"),
        deleted_at_ms: row.get("deleted_at_ms"),
        version: row.get("version"),
        payload_json: row.get("payload_json"),
        created_at: row.get("created_at"),
    }
}

#[allow(clippy::too_many_arguments)]
pub async fn upsert_base(
    conn: &mut PgConnection,
    table: &str,
    owner_id: Uuid,
    uid: Uuid,
    updated_at_ms: i64,
    deleted_at_ms: Option<i64>,
    initial_version: i32,
    payload: &serde_json::Value,
) -> DbResult<UpsertOutcome> {
    let query = format!(
        r#"
        INSERT INTO {table} (owner_id, uid, updated_at_ms, deleted_at_ms, version, payload_json, created_at)
        VALUES ($1, $2, $3, $4, GREATEST($5, 1), $6, now())
        ON CONFLICT (owner_id, uid) DO UPDATE SET
            updated_at_ms = EXCLUDED.updated_at_ms,
            deleted_at_ms = EXCLUDED.deleted_at_ms,
            payload_json = EXCLUDED.payload_json,
            version = {table}.version + 1
        WHERE {table}.updated_at_ms < EXCLUDED.updated_at_ms
        RETURNING version, updated_at_ms
        "#
    );

    let row = sqlx::query(&query)
        .bind(owner_id)
        .bind(uid)
        .bind(updated_at_ms)
        .bind(deleted_at_ms)
        .bind(initial_version)
        .bind(payload)
        .fetch_optional(&mut *conn)
        .await?;

    let outcome = if let Some(row) = row {
        UpsertOutcome {
            version: row.get("version"),
            updated_at_ms: row.get("updated_at_ms"),
        }
    } else {
        current_state(conn, table, owner_id, uid).await?
    };

    fix_payload_version(conn, table, owner_id, uid, updated_at_ms, outcome).await?;
    Ok(outcome)
}

/// Keep `payload_json.sync.version` equal to the row's authoritative
/// `version` column. Scoped to
/// `updated_at_ms` so a replay of a stale write never clobbers a payload
/// a newer write already landed.
pub async fn fix_payload_version(
    conn: &mut PgConnection,
    table: &str,
    owner_id: Uuid,
    uid: Uuid,
    updated_at_ms: i64,
    outcome: UpsertOutcome,
) -> DbResult<()> {
    if outcome.updated_at_ms != updated_at_ms {
        return Ok(());
    }
    let query = format!(
        r#"
        UPDATE {table}
        SET payload_json = jsonb_set(
            coalesce(payload_json, '{{}}'::jsonb), '{{sync,version}}', to_jsonb($1::int), true
        )
        WHERE owner_id = $2 AND uid = $3 AND updated_at_ms = $4
        "#
    );
    sqlx::query(&query)
        .bind(outcome.version)
        .bind(owner_id)
        .bind(uid)
        .bind(updated_at_ms)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Read back the authoritative `(version, updated_at_ms)` for a row the
/// LWW guard refused to touch -- either a genuine no-op replay or a
/// stale write that lost the race.
async fn current_state(
    conn: &mut PgConnection,
    table: &str,
    owner_id: Uuid,
    uid: Uuid,
) -> DbResult<UpsertOutcome> {
    let query = format!("SELECT version, updated_at_ms FROM {table} WHERE owner_id = $1 AND uid = $2");
    let row = sqlx::query(&query)
        .bind(owner_id)
        .bind(uid)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(DbError::NotFound)?;
    Ok(UpsertOutcome {
        version: row.get("version"),
        updated_at_ms: row.get("updated_at_ms"),
    })
}

pub async fn get_row(pool: &PgPool, table: &str, owner_id: Uuid, uid: Uuid) -> DbResult<Option<EntityRecord>> {
    let query =
        format!("SELECT owner_id, uid, updated_at_ms, deleted_at_ms, version, payload_json, created_at FROM {table} WHERE owner_id = $1 AND uid = $2");
    let row = sqlx::query(&query)
        .bind(owner_id)
        .bind(uid)
        .fetch_optional(pool)
        .await?;
    Ok(row.as_ref().map(row_to_record))
}

#[allow(clippy::too_many_arguments)]
pub async fn range_after(
    pool: &PgPool,
    table: &str,
    owner_id: Uuid,
    after_ms: i64,
    after_uid: Uuid,
    limit: i64,
    include_deleted: bool,
) -> DbResult<Vec<EntityRecord>> {
    let deleted_clause = if include_deleted { "" } else { "AND deleted_at_ms IS NULL" };
    let query = format!(
        r#"
        SELECT owner_id, uid, updated_at_ms, deleted_at_ms, version, payload_json, created_at
        FROM {table}
        WHERE owner_id = $1 AND (updated_at_ms, uid) > ($2, $3) {deleted_clause}
        ORDER BY updated_at_ms ASC, uid ASC
        LIMIT $4
        "#
    );
    let rows = sqlx::query(&query)
        .bind(owner_id)
        .bind(after_ms)
        .bind(after_uid)
        .bind(limit)
        .fetch_all(pool)
        .await?;
    Ok(rows.iter().map(row_to_record).collect())
}

pub async fn is_live(conn: &mut PgConnection, table: &str, owner_id: Uuid, uid: Uuid) -> DbResult<bool> {
    let query = format!(
        "SELECT EXISTS(SELECT 1 FROM {table} WHERE owner_id = $1 AND uid = $2 AND deleted_at_ms IS NULL)"
    );
    let exists: bool = sqlx::query_scalar(&query)
        .bind(owner_id)
        .bind(uid)
        .fetch_one(&mut *conn)
        .await?;
    Ok(exists)
}

pub async fn wipe_owner(conn: &mut PgConnection, table: &str, owner_id: Uuid) -> DbResult<u64> {
    let query = format!("DELETE FROM {table} WHERE owner_id = $1");
    let result = sqlx::query(&query).bind(owner_id).execute(&mut *conn).await?;
    Ok(result.rows_affected())
}
