use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::PgPool;

use super::models::{AddressQuery, AddressRecord, Gym, GymMedia, GymRecord, Location};
use crate::common::GymId;
use crate::kernel::BaseDirectory;

/// Postgres-backed gym directory.
#[derive(Clone)]
pub struct PgDirectory {
    pool: PgPool,
}

impl PgDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct LocationRow {
    country: Option<String>,
    state: String,
    city: String,
}

impl From<LocationRow> for Location {
    fn from(row: LocationRow) -> Self {
        Location::new(row.country, row.state, row.city)
    }
}

#[async_trait]
impl BaseDirectory for PgDirectory {
    async fn find_city_state_pairs(
        &self,
        state: Option<&str>,
        city: Option<&str>,
    ) -> Result<Vec<Location>> {
        let rows = sqlx::query_as::<_, LocationRow>(
            r#"
            SELECT MAX(NULLIF(TRIM(country), '')) AS country, state, city
            FROM addresses
            WHERE deleted_at IS NULL
              AND city IS NOT NULL AND city <> ''
              AND state IS NOT NULL AND state <> ''
              AND ($1::TEXT IS NULL OR state = $1)
              AND ($2::TEXT IS NULL OR city = $2)
            GROUP BY state, city
            ORDER BY state, city
            "#,
        )
        .bind(state)
        .bind(city)
        .fetch_all(&self.pool)
        .await
        .context("Failed to load city/state pairs")?;

        Ok(rows.into_iter().map(Location::from).collect())
    }

    async fn find_states(&self, state: Option<&str>) -> Result<Vec<Location>> {
        let rows = sqlx::query_as::<_, LocationRow>(
            r#"
            SELECT MAX(NULLIF(TRIM(country), '')) AS country, state, ''::TEXT AS city
            FROM addresses
            WHERE deleted_at IS NULL
              AND state IS NOT NULL AND state <> ''
              AND ($1::TEXT IS NULL OR state = $1)
            GROUP BY state
            ORDER BY state
            "#,
        )
        .bind(state)
        .fetch_all(&self.pool)
        .await
        .context("Failed to load states")?;

        Ok(rows.into_iter().map(Location::from).collect())
    }

    async fn find_addresses(&self, query: &AddressQuery) -> Result<Vec<AddressRecord>> {
        AddressRecord::find(query, &self.pool)
            .await
            .context("Failed to load addresses")
    }

    async fn find_gyms(&self, ids: &[GymId]) -> Result<Vec<GymRecord>> {
        let gyms = Gym::find_by_ids(ids, &self.pool)
            .await
            .context("Failed to load gyms")?;
        let media = GymMedia::find_for_gyms(ids, &self.pool)
            .await
            .context("Failed to load gym media")?;

        Ok(GymRecord::assemble(gyms, media))
    }
}
