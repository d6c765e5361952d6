//! Session and epoch coordinator.
//!
//! Gates every sync-surface request on a valid, non-expired session for
//! the caller's owner and on the epoch the caller last observed. Full
//! wipe is the only way the epoch moves, and it is isolated from
//! concurrent writes by closing every open session in the same
//! transaction that bumps the epoch.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::db::DbPool;
use crate::error::ApiError;
use crate::models::{Family, OwnerState, SyncSession};

/// Sliding session TTL.
pub const SESSION_TTL: chrono::Duration = chrono::Duration::hours(24);

pub struct SessionCoordinator {
    db: Arc<DbPool>,
}

/// Headers presented on every sync request.
pub struct SyncHeaders {
    pub session_id: Uuid,
    pub epoch: i64,
}

impl SessionCoordinator {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    pub async fn owner_state(&self, owner_id: Uuid) -> Result<OwnerState, ApiError> {
        Ok(self.db.owner_state().get_or_create(self.db.write_pool(), owner_id).await?)
    }

    /// `POST /v1/sync/sessions`: snapshot the owner's current epoch into
    /// a freshly opened session.
    pub async fn open_session(&self, owner_id: Uuid) -> Result<SyncSession, ApiError> {
        let state = self.owner_state(owner_id).await?;
        Ok(self
            .db
            .sessions()
            .open(self.db.write_pool(), owner_id, state.epoch)
            .await?)
    }

    /// Validate `X-Sync-Session` / `X-Sync-Epoch` against the stored
    /// session and the owner's current epoch. On success, slides the
    /// session's TTL forward.
    pub async fn validate(&self, owner_id: Uuid, headers: &SyncHeaders) -> Result<(), ApiError> {
        let session = self
            .db
            .sessions()
            .get(self.db.read_pool(), headers.session_id)
            .await?
            .ok_or(ApiError::SessionExpired)?;

        if session.owner_id != owner_id {
            return Err(ApiError::Forbidden);
        }
        if !session.is_open() || session.is_expired(Utc::now(), SESSION_TTL) {
            return Err(ApiError::SessionExpired);
        }

        let state = self.owner_state(owner_id).await?;
        if headers.epoch != state.epoch {
            return Err(ApiError::EpochStale {
                current: state.epoch,
                got: headers.epoch,
            });
        }

        self.db.sessions().touch(self.db.write_pool(), headers.session_id).await?;
        Ok(())
    }

    /// `POST /v1/sync/wipe`: delete every row for the owner across every
    /// family, bump the epoch, and close all open sessions, atomically
    ///.
    pub async fn wipe(&self, owner_id: Uuid, wiped_by: Uuid) -> Result<i64, ApiError> {
        let mut tx = self.db.write_pool().begin().await.map_err(crate::db::DbError::from)?;

        for family in Family::ALL {
            match family {
                Family::Comment => {
                    self.db.comments().wipe_owner(&mut *tx, owner_id).await?;
                }
                Family::ChatMessage => {
                    self.db.chat_messages().wipe_owner(&mut *tx, owner_id).await?;
                }
                base => {
                    if let Some(repo) = self.db.entity(base) {
                        repo.wipe_owner(&mut *tx, owner_id).await?;
                    }
                }
            }
        }

        let new_epoch = self.db.owner_state().bump_epoch(&mut *tx, owner_id, wiped_by).await?;
        self.db.sessions().close_all_for_owner(&mut *tx, owner_id).await?;

        tx.commit().await.map_err(crate::db::DbError::from)?;
        Ok(new_epoch)
    }
}
