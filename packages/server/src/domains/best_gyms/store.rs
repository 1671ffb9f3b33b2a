use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::PgPool;

use super::models::{BestGymsPage, PageFilter, PagePayload, UpsertOutcome};
use crate::kernel::BasePageStore;

/// Postgres-backed store for generated pages.
#[derive(Clone)]
pub struct PgPageStore {
    pool: PgPool,
}

impl PgPageStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BasePageStore for PgPageStore {
    async fn exists(&self, slug: &str) -> Result<bool> {
        BestGymsPage::exists(slug, &self.pool)
            .await
            .with_context(|| format!("Failed to check page {}", slug))
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<BestGymsPage>> {
        BestGymsPage::find_by_slug(slug, &self.pool)
            .await
            .with_context(|| format!("Failed to load page {}", slug))
    }

    async fn upsert(&self, payload: PagePayload) -> Result<UpsertOutcome> {
        BestGymsPage::upsert(&payload, &self.pool)
            .await
            .with_context(|| format!("Failed to save page {}", payload.slug))
    }

    async fn list(&self, filter: &PageFilter, limit: i64, offset: i64) -> Result<Vec<BestGymsPage>> {
        BestGymsPage::list(filter, limit, offset, &self.pool)
            .await
            .context("Failed to list pages")
    }

    async fn count(&self, filter: &PageFilter) -> Result<i64> {
        BestGymsPage::count(filter, &self.pool)
            .await
            .context("Failed to count pages")
    }
}
