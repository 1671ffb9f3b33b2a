use axum::{extract::Extension, http::StatusCode, Json};
use serde::Serialize;

use crate::domains::best_gyms::PageFilter;
use crate::server::app::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    page_store: StoreHealth,
    #[serde(skip_serializing_if = "Option::is_none")]
    connection_pool: Option<ConnectionPoolHealth>,
    ranking: String,
}

#[derive(Serialize)]
pub struct StoreHealth {
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pages: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize)]
pub struct ConnectionPoolHealth {
    size: u32,
    idle_connections: usize,
    max_connections: u32,
}

/// Health check endpoint
///
/// Checks:
/// - Page store reachability (counts stored pages)
/// - Connection pool utilization, when backed by Postgres
/// - Whether a ranking provider is configured (informational)
///
/// Returns 200 OK if the page store answers, 503 Service Unavailable otherwise.
pub async fn health_handler(Extension(state): Extension<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let store_health = match tokio::time::timeout(
        std::time::Duration::from_secs(5),
        state.server_deps.pages.count(&PageFilter::default()),
    )
    .await
    {
        Ok(Ok(pages)) => StoreHealth {
            status: "ok".to_string(),
            pages: Some(pages),
            error: None,
        },
        Ok(Err(e)) => StoreHealth {
            status: "error".to_string(),
            pages: None,
            error: Some(format!("Query failed: {}", e)),
        },
        Err(_) => StoreHealth {
            status: "error".to_string(),
            pages: None,
            error: Some("Query timeout (>5s)".to_string()),
        },
    };

    let pool_health = state.db_pool.as_ref().map(|pool| ConnectionPoolHealth {
        size: pool.size(),
        idle_connections: pool.num_idle(),
        max_connections: pool.options().get_max_connections(),
    });

    let ranking = if state.server_deps.ranking.is_enabled() {
        "configured"
    } else {
        "fallback_only"
    };

    let is_healthy = store_health.status == "ok";
    let status_code = if is_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(HealthResponse {
            status: if is_healthy { "healthy" } else { "unhealthy" }.to_string(),
            page_store: store_health,
            connection_pool: pool_health,
            ranking: ranking.to_string(),
        }),
    )
}
