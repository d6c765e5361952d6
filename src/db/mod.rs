mod error;
pub mod postgres;
mod repo;
#[cfg(test)]
pub(crate) mod tests;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

pub use error::{DbError, DbResult};
pub use repo::EntityRepo;

use crate::config::DatabaseConfig;
use crate::models::Family;

use postgres::{
    ChatMessageRepo, CommentRepo, OwnerStateRepo, PostgresChatMessageRepo, PostgresCommentRepo,
    PostgresEntityRepo, PostgresOwnerStateRepo, PostgresSessionRepo, SessionRepo,
};

/// Cached repository handles, built once at startup.
struct CachedRepos {
    base: HashMap<Family, Arc<dyn EntityRepo>>,
    comments: Arc<dyn CommentRepo>,
    chat_messages: Arc<dyn ChatMessageRepo>,
    owner_state: Arc<dyn OwnerStateRepo>,
    sessions: Arc<dyn SessionRepo>,
}

const BASE_FAMILIES: [Family; 5] = [
    Family::Note,
    Family::Task,
    Family::TaskList,
    Family::TaskListCategory,
    Family::Chat,
];

fn build_repos() -> CachedRepos {
    let base = BASE_FAMILIES
        .into_iter()
        .map(|family| (family, Arc::new(PostgresEntityRepo::new(family)) as Arc<dyn EntityRepo>))
        .collect();
    CachedRepos {
        base,
        comments: Arc::new(PostgresCommentRepo::new()),
        chat_messages: Arc::new(PostgresChatMessageRepo::new()),
        owner_state: Arc::new(PostgresOwnerStateRepo::new()),
        sessions: Arc::new(PostgresSessionRepo::new()),
    }
}

/// The database pool and its cached repository handles.
///
/// Reads go to a replica pool when one is configured; writes and
/// transactional work always go through `write`.
pub struct DbPool {
    write: sqlx::PgPool,
    read: Option<sqlx::PgPool>,
    repos: CachedRepos,
}

impl DbPool {
    /// Build a pool from existing `sqlx::PgPool`s. Primarily useful for
    /// tests that already have a pool from `sqlx::test`.
    pub fn from_pools(write: sqlx::PgPool, read: Option<sqlx::PgPool>) -> Self {
        DbPool {
            write,
            read,
            repos: build_repos(),
        }
    }

    pub async fn from_config(config: &DatabaseConfig) -> DbResult<Self> {
        let write = sqlx::postgres::PgPoolOptions::new()
            .min_connections(config.min_connections)
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect(&config.url)
            .await?;

        let read = match &config.read_url {
            Some(read_url) => {
                tracing::info!("configuring read replica pool");
                Some(
                    sqlx::postgres::PgPoolOptions::new()
                        .min_connections(config.min_connections)
                        .max_connections(config.max_connections)
                        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
                        .connect(read_url)
                        .await?,
                )
            }
            None => None,
        };

        Ok(DbPool {
            write,
            read,
            repos: build_repos(),
        })
    }

    /// Pool to use for reads. Falls back to `write` when no replica is
    /// configured.
    pub fn read_pool(&self) -> &sqlx::PgPool {
        self.read.as_ref().unwrap_or(&self.write)
    }

    /// Pool to use for writes and for opening transactions.
    pub fn write_pool(&self) -> &sqlx::PgPool {
        &self.write
    }

    /// Run pending migrations against the write pool.
    pub async fn run_migrations(&self) -> DbResult<()> {
        tracing::info!("running database migrations");
        sqlx::migrate!("./migrations").run(&self.write).await?;
        tracing::info!("database migrations complete");
        Ok(())
    }

    /// Repo for one of the five base-shape families. Returns `None` for
    /// Comment and ChatMessage, which carry an extra column and are
    /// reached through [`DbPool::comments`] / [`DbPool::chat_messages`].
    pub fn entity(&self, family: Family) -> Option<Arc<dyn EntityRepo>> {
        self.repos.base.get(&family).cloned()
    }

    pub fn comments(&self) -> Arc<dyn CommentRepo> {
        Arc::clone(&self.repos.comments)
    }

    pub fn chat_messages(&self) -> Arc<dyn ChatMessageRepo> {
        Arc::clone(&self.repos.chat_messages)
    }

    pub fn owner_state(&self) -> Arc<dyn OwnerStateRepo> {
        Arc::clone(&self.repos.owner_state)
    }

    pub fn sessions(&self) -> Arc<dyn SessionRepo> {
        Arc::clone(&self.repos.sessions)
    }
}
