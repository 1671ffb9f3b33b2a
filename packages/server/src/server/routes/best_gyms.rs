//! Read API for generated best-gyms pages.
//!
//! GET /api/v1/best-gyms-pages?state=&city=&page=&per_page=
//! GET /api/v1/best-gyms-pages/:slug

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::common::BestGymsPageId;
use crate::domains::best_gyms::{BestGymsPage, PageFilter};
use crate::server::app::AppState;

const DEFAULT_PER_PAGE: i64 = 20;
const MAX_PER_PAGE: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct ListPagesQuery {
    pub state: Option<String>,
    pub city: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl ListPagesQuery {
    fn filter(&self) -> PageFilter {
        let clean = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        PageFilter {
            state: clean(&self.state),
            city: clean(&self.city),
        }
    }

    /// (page, per_page) with page >= 1 and per_page in 1..=100.
    fn pagination(&self) -> (i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self.per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE);
        (page, per_page)
    }

    /// Rows to skip for the requested page; saturates for absurd page numbers.
    fn offset(&self) -> i64 {
        let (page, per_page) = self.pagination();
        (page - 1).saturating_mul(per_page)
    }
}

#[derive(Debug, Serialize)]
pub struct PageSummary {
    pub id: BestGymsPageId,
    pub title: String,
    pub slug: String,
    pub state: Option<String>,
    pub city: Option<String>,
    pub gym_count: usize,
    pub updated_at: DateTime<Utc>,
}

impl From<&BestGymsPage> for PageSummary {
    fn from(page: &BestGymsPage) -> Self {
        Self {
            id: page.id,
            title: page.title.clone(),
            slug: page.slug.clone(),
            state: page.state.clone(),
            city: page.city.clone(),
            gym_count: page.gyms_data.0.len(),
            updated_at: page.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PageListResponse {
    pub pages: Vec<PageSummary>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

/// List stored pages ordered by slug.
pub async fn list_best_gyms_pages(
    Extension(state): Extension<AppState>,
    Query(query): Query<ListPagesQuery>,
) -> Result<Json<PageListResponse>, StatusCode> {
    let filter = query.filter();
    let (page, per_page) = query.pagination();
    let pages_store = &state.server_deps.pages;

    let total = pages_store.count(&filter).await.map_err(|e| {
        error!(error = %e, "failed to count best gyms pages");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let pages = pages_store
        .list(&filter, per_page, query.offset())
        .await
        .map_err(|e| {
            error!(error = %e, "failed to list best gyms pages");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Ok(Json(PageListResponse {
        pages: pages.iter().map(PageSummary::from).collect(),
        total,
        page,
        per_page,
    }))
}

/// Full page by slug; 404 when no page has been generated for it.
pub async fn get_best_gyms_page(
    Extension(state): Extension<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<BestGymsPage>, StatusCode> {
    let page = state
        .server_deps
        .pages
        .find_by_slug(&slug)
        .await
        .map_err(|e| {
            error!(slug = %slug, error = %e, "failed to load best gyms page");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    page.map(Json).ok_or(StatusCode::NOT_FOUND)
}
