//! Postgres test harness: one shared `testcontainers` instance per test
//! binary, with every test getting its own schema so rows from one test
//! never leak into another.
//!
//! Requires Docker. Every test built against this harness is
//! `#[ignore]`d; run them with `cargo test -- --ignored`.

use std::sync::OnceLock;

use sqlx::PgPool;
use testcontainers_modules::postgres::Postgres;
use testcontainers_modules::testcontainers::runners::AsyncRunner;
use testcontainers_modules::testcontainers::{ContainerAsync, ImageExt};
use tokio::sync::OnceCell;

struct SharedContainer {
    #[allow(dead_code)]
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static SHARED_CONTAINER: OnceLock<OnceCell<SharedContainer>> = OnceLock::new();

async fn get_shared_container() -> &'static SharedContainer {
    let cell = SHARED_CONTAINER.get_or_init(OnceCell::new);
    cell.get_or_init(|| async {
        let container = Postgres::default()
            .with_tag("16-alpine")
            .start()
            .await
            .expect("failed to start postgres container");
        let host = container.get_host().await.expect("failed to get container host");
        let port = container
            .get_host_port_ipv4(5432)
            .await
            .expect("failed to get container port");
        SharedContainer {
            container,
            connection_string: format!("postgres://postgres:postgres@{host}:{port}/postgres"),
        }
    })
    .await
}

/// A fresh, migrated database schema isolated from every other test.
pub async fn isolated_pool() -> PgPool {
    let shared = get_shared_container().await;

    let admin_pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(1)
        .connect(&shared.connection_string)
        .await
        .expect("failed to connect to postgres container");

    let schema = format!("test_{}", uuid::Uuid::new_v4().simple());
    sqlx::query(&format!("CREATE SCHEMA \"{schema}\""))
        .execute(&admin_pool)
        .await
        .expect("failed to create test schema");

    let isolated_url = format!("{}?options=-c search_path={schema}", shared.connection_string);
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&isolated_url)
        .await
        .expect("failed to connect to isolated schema");

    sqlx::migrate!("./migrations").run(&pool).await.expect("failed to run migrations");
    pool
}
