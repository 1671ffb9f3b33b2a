use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::PgPool;

use crate::common::BestGymsPageId;
use crate::domains::directory::GymSnapshot;

/// Heading block rendered above the gym list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntroSection {
    pub main_heading: String,
    pub sub_heading: String,
}

/// A cached "Best Gyms in ..." page.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BestGymsPage {
    pub id: BestGymsPageId,
    pub title: String,
    pub slug: String,
    pub featured_image: Option<String>,
    pub intro_section: Option<Json<IntroSection>>,
    pub faq_section: Option<Json<serde_json::Value>>,
    pub gyms_data: Json<Vec<GymSnapshot>>,
    pub country: Option<String>,
    pub state: Option<String>,
    pub city: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Everything the pipeline writes for one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PagePayload {
    pub title: String,
    pub slug: String,
    pub gyms_data: Vec<GymSnapshot>,
    pub country: Option<String>,
    pub state: Option<String>,
    pub city: Option<String>,
    pub intro_section: Option<IntroSection>,
    pub faq_section: Option<serde_json::Value>,
    pub featured_image: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created(BestGymsPageId),
    Updated(BestGymsPageId),
}

impl UpsertOutcome {
    pub fn id(&self) -> BestGymsPageId {
        match self {
            UpsertOutcome::Created(id) | UpsertOutcome::Updated(id) => *id,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, UpsertOutcome::Created(_))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UpsertOutcome::Created(_) => "created",
            UpsertOutcome::Updated(_) => "updated",
        }
    }
}

/// Exact-match filters for listing pages. Empty filters match every page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PageFilter {
    pub state: Option<String>,
    pub city: Option<String>,
}

impl PageFilter {
    pub fn matches(&self, page: &BestGymsPage) -> bool {
        let field_matches = |filter: &Option<String>, value: &Option<String>| match filter {
            Some(wanted) => value.as_deref() == Some(wanted.as_str()),
            None => true,
        };
        field_matches(&self.state, &page.state) && field_matches(&self.city, &page.city)
    }
}

impl BestGymsPage {
    /// Build the row a fresh insert would produce.
    pub fn from_payload(id: BestGymsPageId, payload: PagePayload, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: payload.title,
            slug: payload.slug,
            featured_image: payload.featured_image,
            intro_section: payload.intro_section.map(Json),
            faq_section: payload.faq_section.map(Json),
            gyms_data: Json(payload.gyms_data),
            country: payload.country,
            state: payload.state,
            city: payload.city,
            created_at: now,
            updated_at: now,
        }
    }

    pub async fn exists(slug: &str, pool: &PgPool) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM best_gyms_pages WHERE slug = $1)",
        )
        .bind(slug)
        .fetch_one(pool)
        .await?;
        Ok(exists)
    }

    pub async fn find_by_slug(slug: &str, pool: &PgPool) -> Result<Option<Self>> {
        let page = sqlx::query_as::<_, Self>(
            r#"
            SELECT id, title, slug, featured_image, intro_section, faq_section, gyms_data,
                   country, state, city, created_at, updated_at
            FROM best_gyms_pages
            WHERE slug = $1
            "#,
        )
        .bind(slug)
        .fetch_optional(pool)
        .await?;
        Ok(page)
    }

    /// Insert or overwrite by slug in a single statement.
    ///
    /// `xmax = 0` holds only for a freshly inserted row.
    pub async fn upsert(payload: &PagePayload, pool: &PgPool) -> Result<UpsertOutcome> {
        let (id, inserted) = sqlx::query_as::<_, (BestGymsPageId, bool)>(
            r#"
            INSERT INTO best_gyms_pages (
                title, slug, featured_image, intro_section, faq_section, gyms_data,
                country, state, city, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NOW(), NOW())
            ON CONFLICT (slug) DO UPDATE SET
                title = EXCLUDED.title,
                featured_image = EXCLUDED.featured_image,
                intro_section = EXCLUDED.intro_section,
                faq_section = EXCLUDED.faq_section,
                gyms_data = EXCLUDED.gyms_data,
                country = EXCLUDED.country,
                state = EXCLUDED.state,
                city = EXCLUDED.city,
                updated_at = NOW()
            RETURNING id, (xmax = 0) AS inserted
            "#,
        )
        .bind(&payload.title)
        .bind(&payload.slug)
        .bind(&payload.featured_image)
        .bind(payload.intro_section.as_ref().map(Json))
        .bind(payload.faq_section.as_ref().map(Json))
        .bind(Json(&payload.gyms_data))
        .bind(&payload.country)
        .bind(&payload.state)
        .bind(&payload.city)
        .fetch_one(pool)
        .await?;

        Ok(if inserted {
            UpsertOutcome::Created(id)
        } else {
            UpsertOutcome::Updated(id)
        })
    }

    pub async fn list(filter: &PageFilter, limit: i64, offset: i64, pool: &PgPool) -> Result<Vec<Self>> {
        let pages = sqlx::query_as::<_, Self>(
            r#"
            SELECT id, title, slug, featured_image, intro_section, faq_section, gyms_data,
                   country, state, city, created_at, updated_at
            FROM best_gyms_pages
            WHERE ($1::TEXT IS NULL OR state = $1)
              AND ($2::TEXT IS NULL OR city = $2)
            ORDER BY slug
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(filter.state.as_deref())
        .bind(filter.city.as_deref())
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;
        Ok(pages)
    }

    pub async fn count(filter: &PageFilter, pool: &PgPool) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM best_gyms_pages
            WHERE ($1::TEXT IS NULL OR state = $1)
              AND ($2::TEXT IS NULL OR city = $2)
            "#,
        )
        .bind(filter.state.as_deref())
        .bind(filter.city.as_deref())
        .fetch_one(pool)
        .await?;
        Ok(count)
    }
}
