//! Repo-level tests for per-owner epoch bookkeeping.

use uuid::Uuid;

use crate::db::postgres::{OwnerStateRepo, PostgresOwnerStateRepo};

use super::harness::isolated_pool;

#[tokio::test]
#[ignore = "requires Docker - run with `cargo test -- --ignored`"]
async fn get_or_create_starts_at_epoch_one() {
    let pool = isolated_pool().await;
    let repo = PostgresOwnerStateRepo::new();
    let owner = Uuid::new_v4();

    let state = repo.get_or_create(&pool, owner).await.unwrap();

    assert_eq!(state.epoch, 1);
    assert!(state.last_wipe_at.is_none());
}

#[tokio::test]
#[ignore = "requires Docker - run with `cargo test -- --ignored`"]
async fn get_or_create_is_idempotent() {
    let pool = isolated_pool().await;
    let repo = PostgresOwnerStateRepo::new();
    let owner = Uuid::new_v4();

    repo.get_or_create(&pool, owner).await.unwrap();
    let second = repo.get_or_create(&pool, owner).await.unwrap();

    assert_eq!(second.epoch, 1, "a second contact must not reset or bump the epoch");
}

#[tokio::test]
#[ignore = "requires Docker - run with `cargo test -- --ignored`"]
async fn bump_epoch_increments_by_exactly_one_and_records_the_wipe() {
    let pool = isolated_pool().await;
    let repo = PostgresOwnerStateRepo::new();
    let owner = Uuid::new_v4();
    let wiped_by = Uuid::new_v4();
    let mut conn = pool.acquire().await.unwrap();

    repo.get_or_create(&pool, owner).await.unwrap();
    let new_epoch = repo.bump_epoch(&mut conn, owner, wiped_by).await.unwrap();
    assert_eq!(new_epoch, 2);

    let state = repo.get_or_create(&pool, owner).await.unwrap();
    assert_eq!(state.epoch, 2);
    assert_eq!(state.last_wipe_by, Some(wiped_by));
    assert!(state.last_wipe_at.is_some());

    let again = repo.bump_epoch(&mut conn, owner, wiped_by).await.unwrap();
    assert_eq!(again, 3);
}

#[tokio::test]
#[ignore = "requires Docker - run with `cargo test -- --ignored`"]
async fn bump_epoch_on_an_owner_with_no_prior_state_starts_from_one() {
    let pool = isolated_pool().await;
    let repo = PostgresOwnerStateRepo::new();
    let owner = Uuid::new_v4();
    let mut conn = pool.acquire().await.unwrap();

    let new_epoch = repo.bump_epoch(&mut conn, owner, owner).await.unwrap();

    assert_eq!(new_epoch, 2, "an owner with no prior contact is implicitly at epoch 1");
}
