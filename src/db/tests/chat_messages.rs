//! Repo-level tests for the ChatMessage family's extra `chat_uid`
//! column.

use serde_json::json;
use uuid::Uuid;

use crate::db::postgres::{ChatMessageRepo, PostgresChatMessageRepo};

use super::harness::isolated_pool;

#[tokio::test]
#[ignore = "requires Docker - run with `cargo test -- --ignored`"]
async fn stores_and_returns_chat_uid_linked_message() {
    let pool = isolated_pool().await;
    let repo = PostgresChatMessageRepo::new();
    let owner = Uuid::new_v4();
    let uid = Uuid::new_v4();
    let chat_uid = Uuid::new_v4();
    let mut conn = pool.acquire().await.unwrap();

    repo.upsert(&mut conn, owner, uid, 1_000, None, 1, chat_uid, &json!({"body": "hi"})).await.unwrap();

    let row = repo.get(&pool, owner, uid).await.unwrap().unwrap();
    assert_eq!(row.payload_json["body"], "hi");
}

#[tokio::test]
#[ignore = "requires Docker - run with `cargo test -- --ignored`"]
async fn lww_guard_applies_to_chat_messages_too() {
    let pool = isolated_pool().await;
    let repo = PostgresChatMessageRepo::new();
    let owner = Uuid::new_v4();
    let uid = Uuid::new_v4();
    let chat_uid = Uuid::new_v4();
    let mut conn = pool.acquire().await.unwrap();

    repo.upsert(&mut conn, owner, uid, 1_000, None, 1, chat_uid, &json!({"body": "a"})).await.unwrap();
    let replayed = repo.upsert(&mut conn, owner, uid, 500, None, 1, chat_uid, &json!({"body": "b"})).await.unwrap();

    assert_eq!(replayed.version, 1);
    let row = repo.get(&pool, owner, uid).await.unwrap().unwrap();
    assert_eq!(row.payload_json["body"], "a");
}

#[tokio::test]
#[ignore = "requires Docker - run with `cargo test -- --ignored`"]
async fn tombstone_chat_message_is_not_live() {
    let pool = isolated_pool().await;
    let repo = PostgresChatMessageRepo::new();
    let owner = Uuid::new_v4();
    let uid = Uuid::new_v4();
    let chat_uid = Uuid::new_v4();
    let mut conn = pool.acquire().await.unwrap();

    repo.upsert(&mut conn, owner, uid, 1_000, None, 1, chat_uid, &json!({})).await.unwrap();
    repo.upsert(&mut conn, owner, uid, 2_000, Some(2_000), 1, chat_uid, &json!({})).await.unwrap();

    assert!(!repo.is_live(&mut conn, owner, uid).await.unwrap());
}
