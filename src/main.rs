use std::sync::Arc;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

mod auth;
mod config;
mod db;
mod error;
mod extraction;
mod middleware;
mod models;
mod observability;
mod routes;
mod session;
mod services;
#[cfg(test)]
mod tests;

use config::AppConfig;
use db::DbPool;
use middleware::{RateLimiter, rate_limit_middleware, request_id_middleware};
use session::SessionCoordinator;

/// Shared application state, cloned into every request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: Arc<DbPool>,
    pub sessions: Arc<SessionCoordinator>,
    pub rate_limiter: Arc<RateLimiter>,
}

fn build_router(state: AppState) -> Router {
    routes::router()
        .route_layer(axum::middleware::from_fn_with_state(state.clone(), rate_limit_middleware))
        .layer(RequestBodyLimitLayer::new(state.config.server.body_limit_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(axum::middleware::from_fn(request_id_middleware))
        .with_state(state)
}

#[tokio::main]
async fn main() {
    let config = AppConfig::from_env().unwrap_or_else(|err| {
        eprintln!("invalid configuration: {err}");
        std::process::exit(1);
    });

    let _tracing_guard = observability::init_tracing(&config.observability).expect("failed to initialize tracing");

    tracing::info!(addr = %config.server.addr, environment = ?config.environment, "starting syncd");

    let db = DbPool::from_config(&config.database)
        .await
        .expect("failed to connect to database");

    if config.database.run_migrations {
        db.run_migrations().await.expect("failed to run database migrations");
    }

    let db = Arc::new(db);
    let state = AppState {
        rate_limiter: Arc::new(RateLimiter::new(config.limits.rate_limit_requests_per_minute)),
        sessions: Arc::new(SessionCoordinator::new(Arc::clone(&db))),
        db,
        config: Arc::new(config),
    };

    let addr = state.config.server.addr;
    let shutdown_grace_secs = state.config.server.shutdown_grace_secs;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await.expect("failed to bind to address");
    tracing::info!(addr = %addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_grace_secs))
        .await
        .expect("server error");
}

/// Wait for `SIGINT`/`SIGTERM`, then arm a watchdog that forces the
/// process to exit if in-flight requests haven't drained within
/// `grace_secs`. `axum::serve`'s own
/// drain, which runs after this future resolves, has no built-in bound.
async fn shutdown_signal(grace_secs: u64) {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!(grace_secs, "shutdown signal received, draining in-flight requests");
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_secs(grace_secs)).await;
        tracing::warn!("shutdown grace period elapsed, forcing exit");
        std::process::exit(1);
    });
}
