//! `ApplyMutation`: the REST-style create-or-update used by
//! single-item CRUD, layered on top of [`EntityService::push_item`] so
//! it shares the exact same LWW/parent-integrity/coherence guarantees
//! as the delta-sync `push` path.

use chrono::Utc;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::db::DbError;
use crate::extraction::timestamp::format_rfc3339_millis;
use crate::models::Item;

use super::sync::{EntityService, ItemFailure};

/// Controls for [`EntityService::apply_mutation`]'s create-or-update behavior.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplyMutationOptions {
    pub enforce_version: bool,
    pub expected_version: i32,
    pub force_timestamp_ms: Option<i64>,
    pub set_deleted: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum MutationError {
    #[error("version mismatch")]
    VersionMismatch,
    /// Malformed payload.
    #[error("{0}")]
    BadRequest(String),
    /// Missing/non-live parent or chat.
    #[error("{0}")]
    ParentMissing(String),
    #[error(transparent)]
    Db(#[from] DbError),
}

impl EntityService {
    pub async fn apply_mutation(
        &self,
        owner_id: Uuid,
        mut payload: Value,
        opts: ApplyMutationOptions,
    ) -> Result<Item, MutationError> {
        let uid = ensure_uid(&mut payload);

        // Probing on a snapshot ahead of the transaction is sufficient:
        // the LWW guard inside `push_item`'s upsert is what actually
        // arbitrates the write, so a probe that is a moment stale only
        // affects the fidelity of the `enforceVersion` fast-fail, never
        // correctness of the stored row.
        let existing = self.get_raw(owner_id, uid).await?;

        if let Some(row) = &existing
            && opts.enforce_version
            && row.version != opts.expected_version
        {
            return Err(MutationError::VersionMismatch);
        }

        let now_ms = Utc::now().timestamp_millis();
        let write_ms = opts.force_timestamp_ms.unwrap_or_else(|| match &existing {
            None => now_ms,
            Some(row) => now_ms.max(row.updated_at_ms + 1),
        });

        assemble_canonical_payload(&mut payload, &existing, write_ms, opts.set_deleted);

        let mut tx = self.db().write_pool().begin().await.map_err(DbError::from)?;
        let result = self.push_item_typed(&mut tx, owner_id, payload, write_ms).await?;
        match result {
            Ok(_) => {}
            Err(ItemFailure::Extraction(_, msg)) => return Err(MutationError::BadRequest(msg)),
            Err(ItemFailure::ParentMissing(_, msg)) => return Err(MutationError::ParentMissing(msg)),
        }
        tx.commit().await.map_err(DbError::from)?;

        let record = self
            .get_raw(owner_id, uid)
            .await?
            .ok_or_else(|| DbError::Fatal("row vanished immediately after a successful mutation".into()))?;
        Ok(Item::from(record))
    }
}

fn ensure_uid(payload: &mut Value) -> Uuid {
    if let Some(existing) = payload.get("uid").and_then(Value::as_str).and_then(|s| Uuid::parse_str(s).ok()) {
        return existing;
    }
    let uid = Uuid::new_v4();
    if let Value::Object(map) = payload {
        map.insert("uid".to_string(), json!(uid.to_string()));
    }
    uid
}

/// Assemble the server-canonical payload: a
/// placeholder `sync.version` (the storage layer overwrites it with the
/// authoritative value once the write commits), `sync.isDeleted`, and a
/// normalised `updatedTs`/`sync.deletedAt`.
fn assemble_canonical_payload(
    payload: &mut Value,
    existing: &Option<crate::models::EntityRecord>,
    write_ms: i64,
    set_deleted: bool,
) {
    let next_version = existing.as_ref().map(|r| r.version + 1).unwrap_or(1);
    let mut sync = json!({
        "version": next_version,
        "isDeleted": set_deleted,
    });
    if set_deleted && let Value::Object(sync_obj) = &mut sync {
        sync_obj.insert("deletedAt".to_string(), json!(format_rfc3339_millis(write_ms)));
    }

    if let Value::Object(map) = payload {
        map.insert("sync".to_string(), sync);
        map.insert("updatedTs".to_string(), json!(format_rfc3339_millis(write_ms)));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::db::DbPool;
    use crate::db::tests::harness::isolated_pool;
    use crate::models::Family;

    async fn notes_service() -> EntityService {
        let pool = isolated_pool().await;
        EntityService::new(Family::Note, Arc::new(DbPool::from_pools(pool, None)))
    }

    #[tokio::test]
    #[ignore = "requires Docker - run with `cargo test -- --ignored`"]
    async fn create_with_no_uid_generates_one_and_starts_at_version_one() {
        let notes = notes_service().await;
        let owner = Uuid::new_v4();

        let item = notes.apply_mutation(owner, json!({"title": "a"}), ApplyMutationOptions::default()).await.unwrap();

        assert_eq!(item.version, 1);
        assert!(!item.uid.is_nil());
    }

    #[tokio::test]
    #[ignore = "requires Docker - run with `cargo test -- --ignored`"]
    async fn enforced_version_mismatch_then_match() {
        let notes = notes_service().await;
        let owner = Uuid::new_v4();

        let created = notes.apply_mutation(owner, json!({"title": "a"}), ApplyMutationOptions::default()).await.unwrap();
        assert_eq!(created.version, 1);

        let stale = notes
            .apply_mutation(
                owner,
                json!({"uid": created.uid, "title": "b"}),
                ApplyMutationOptions {
                    enforce_version: true,
                    expected_version: 99,
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(stale, Err(MutationError::VersionMismatch)));

        let updated = notes
            .apply_mutation(
                owner,
                json!({"uid": created.uid, "title": "b"}),
                ApplyMutationOptions {
                    enforce_version: true,
                    expected_version: created.version,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.version, 2);
    }

    #[tokio::test]
    #[ignore = "requires Docker - run with `cargo test -- --ignored`"]
    async fn monotonic_bump_fires_even_with_identical_server_clock() {
        let notes = notes_service().await;
        let owner = Uuid::new_v4();

        let created = notes
            .apply_mutation(
                owner,
                json!({"title": "a"}),
                ApplyMutationOptions {
                    force_timestamp_ms: Some(9_999_999_999_999),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        // `force_timestamp_ms` pins the row's clock far in the future; a
        // following mutation with no override must still bump strictly
        // past it rather than losing the race to the LWW guard.
        let updated = notes
            .apply_mutation(owner, json!({"uid": created.uid, "title": "b"}), ApplyMutationOptions::default())
            .await
            .unwrap();

        assert_eq!(updated.version, 2);
    }

    #[tokio::test]
    #[ignore = "requires Docker - run with `cargo test -- --ignored`"]
    async fn set_deleted_produces_a_tombstone_with_deleted_at() {
        let notes = notes_service().await;
        let owner = Uuid::new_v4();

        let created = notes.apply_mutation(owner, json!({"title": "a"}), ApplyMutationOptions::default()).await.unwrap();

        let deleted = notes
            .apply_mutation(
                owner,
                json!({"uid": created.uid}),
                ApplyMutationOptions {
                    set_deleted: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(deleted.deleted_at.is_some());
        assert_eq!(deleted.version, 2);
    }

    #[tokio::test]
    #[ignore = "requires Docker - run with `cargo test -- --ignored`"]
    async fn payload_sync_version_matches_row_version_after_mutation() {
        let notes = notes_service().await;
        let owner = Uuid::new_v4();

        let created = notes.apply_mutation(owner, json!({"title": "a"}), ApplyMutationOptions::default()).await.unwrap();
        let updated = notes
            .apply_mutation(owner, json!({"uid": created.uid, "title": "b"}), ApplyMutationOptions::default())
            .await
            .unwrap();

        assert_eq!(updated.payload["sync"]["version"], updated.version);
    }
}
