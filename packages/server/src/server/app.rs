//! Application setup and server configuration.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{header::CONTENT_TYPE, Method},
    routing::get,
    Router,
};
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::kernel::ServerDeps;
use crate::server::routes::{get_best_gyms_page, health_handler, list_best_gyms_pages};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Present when running against Postgres; reported by the health check.
    pub db_pool: Option<PgPool>,
    pub server_deps: Arc<ServerDeps>,
}

/// Build the Axum application router
pub fn build_app(server_deps: Arc<ServerDeps>, db_pool: Option<PgPool>) -> Router {
    let state = AppState { db_pool, server_deps };

    // Pages are public, read-only content
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/v1/best-gyms-pages", get(list_best_gyms_pages))
        .route("/api/v1/best-gyms-pages/:slug", get(get_best_gyms_page))
        .layer(Extension(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
