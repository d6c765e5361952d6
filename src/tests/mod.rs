//! End-to-end HTTP tests driving the full router, built the way a hand-rolled `tower::ServiceExt::oneshot`
//! harness would be wired against any `axum::Router`. Requires Docker
//! (each test stands up an isolated Postgres schema); run with
//! `cargo test -- --ignored`.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use crate::AppState;
use crate::config::{AppConfig, AuthConfig, DatabaseConfig, Environment, LimitsConfig, LogFormat, ObservabilityConfig, ServerConfig};
use crate::db::DbPool;
use crate::db::tests::harness::isolated_pool;
use crate::middleware::RateLimiter;
use crate::session::SessionCoordinator;

async fn test_app() -> (Router, Uuid) {
    let pool = isolated_pool().await;
    let db = Arc::new(DbPool::from_pools(pool, None));
    let owner = Uuid::new_v4();

    let config = Arc::new(AppConfig {
        environment: Environment::Dev,
        server: ServerConfig {
            addr: "0.0.0.0:0".parse().unwrap(),
            body_limit_bytes: 2 * 1024 * 1024,
            request_timeout_secs: 30,
            shutdown_grace_secs: 1,
        },
        database: DatabaseConfig {
            url: String::new(),
            read_url: None,
            min_connections: 1,
            max_connections: 1,
            acquire_timeout_secs: 5,
            run_migrations: false,
        },
        auth: AuthConfig { jwt_hs256_secret: None },
        limits: LimitsConfig {
            rest_list_default_limit: 50,
            pull_default_limit: 100,
            max_limit: 200,
            rate_limit_requests_per_minute: 10_000,
        },
        observability: ObservabilityConfig {
            log_format: LogFormat::Pretty,
            log_filter: "info".to_string(),
        },
    });

    let state = AppState {
        sessions: Arc::new(SessionCoordinator::new(Arc::clone(&db))),
        rate_limiter: Arc::new(RateLimiter::new(config.limits.rate_limit_requests_per_minute)),
        db,
        config,
    };

    (crate::build_router(state), owner)
}

fn req(method: &str, uri: &str, owner: Uuid) -> axum::http::request::Builder {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("x-debug-sub", owner.to_string())
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
#[ignore = "requires Docker - run with `cargo test -- --ignored`"]
async fn optimistic_concurrency_via_etag() {
    let (app, owner) = test_app().await;

    let create = req("POST", "/v1/notes", owner)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({"title": "a"}).to_string()))
        .unwrap();
    let response = app.clone().oneshot(create).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let item = body_json(response).await;
    let uid = item["uid"].as_str().unwrap();

    let mismatched = req("PATCH", &format!("/v1/notes/{uid}"), owner)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::IF_MATCH, "\"999\"")
        .body(Body::from(json!({"title": "b"}).to_string()))
        .unwrap();
    let response = app.clone().oneshot(mismatched).await.unwrap();
    assert_eq!(response.status(), StatusCode::PRECONDITION_FAILED);

    let matched = req("PATCH", &format!("/v1/notes/{uid}"), owner)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::IF_MATCH, "\"1\"")
        .body(Body::from(json!({"title": "b"}).to_string()))
        .unwrap();
    let response = app.clone().oneshot(matched).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get(header::ETAG).unwrap(), "\"2\"");
}

#[tokio::test]
#[ignore = "requires Docker - run with `cargo test -- --ignored`"]
async fn tombstone_status_mapping() {
    let (app, owner) = test_app().await;

    let create = req("POST", "/v1/notes", owner)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({"title": "a"}).to_string()))
        .unwrap();
    let response = app.clone().oneshot(create).await.unwrap();
    let item = body_json(response).await;
    let uid = item["uid"].as_str().unwrap();

    let delete = req("DELETE", &format!("/v1/notes/{uid}"), owner)
        .header(header::IF_MATCH, "\"1\"")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(delete).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let get = req("GET", &format!("/v1/notes/{uid}"), owner).body(Body::empty()).unwrap();
    let response = app.clone().oneshot(get).await.unwrap();
    assert_eq!(response.status(), StatusCode::GONE);

    let get_with_deleted = req("GET", &format!("/v1/notes/{uid}?includeDeleted=true"), owner)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(get_with_deleted).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let item = body_json(response).await;
    assert!(item["deletedAt"].is_string());

    let patch_tombstone = req("PATCH", &format!("/v1/notes/{uid}"), owner)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::IF_MATCH, "\"2\"")
        .body(Body::from(json!({"title": "c"}).to_string()))
        .unwrap();
    let response = app.clone().oneshot(patch_tombstone).await.unwrap();
    assert_eq!(response.status(), StatusCode::GONE);
}

#[tokio::test]
#[ignore = "requires Docker - run with `cargo test -- --ignored`"]
async fn wipe_then_epoch_stale_rejection() {
    let (app, owner) = test_app().await;

    let open = req("POST", "/v1/sync/sessions", owner).body(Body::empty()).unwrap();
    let response = app.clone().oneshot(open).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let session = body_json(response).await;
    let session_id = session["session_id"].as_str().unwrap().to_string();
    let epoch = session["epoch"].as_i64().unwrap();
    assert_eq!(epoch, 1);

    let wipe = req("POST", "/v1/sync/wipe", owner)
        .header("x-sync-session", &session_id)
        .header("x-sync-epoch", epoch.to_string())
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(wipe).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let wiped = body_json(response).await;
    assert_eq!(wiped["epoch"], 2);

    let push_with_stale_epoch = req("POST", "/v1/sync/notes/push", owner)
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-sync-session", &session_id)
        .header("x-sync-epoch", epoch.to_string())
        .body(Body::from(json!({"items": []}).to_string()))
        .unwrap();
    let response = app.clone().oneshot(push_with_stale_epoch).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let reopen = req("POST", "/v1/sync/sessions", owner).body(Body::empty()).unwrap();
    let response = app.clone().oneshot(reopen).await.unwrap();
    let session = body_json(response).await;
    assert_eq!(session["epoch"], 2);

    let pull = req("GET", "/v1/sync/notes/pull", owner)
        .header("x-sync-session", session["session_id"].as_str().unwrap())
        .header("x-sync-epoch", "2")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(pull).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let page = body_json(response).await;
    assert!(page["upserts"].as_array().unwrap().is_empty());
}

#[tokio::test]
#[ignore = "requires Docker - run with `cargo test -- --ignored`"]
async fn unauthenticated_request_is_rejected() {
    let (app, _owner) = test_app().await;

    let request = Request::builder().method("GET").uri("/v1/notes").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "requires Docker - run with `cargo test -- --ignored`"]
async fn sync_state_without_sync_headers_is_rejected() {
    let (app, owner) = test_app().await;

    let request = req("GET", "/v1/sync/state", owner).body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
