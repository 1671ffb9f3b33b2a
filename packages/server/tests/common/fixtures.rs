//! Test fixtures for creating test data.
//!
//! In-memory directories for pipeline tests, plus SQL inserts for the
//! Postgres-backed tests.

use anyhow::Result;
use gymdir_core::common::GymId;
use gymdir_core::domains::best_gyms::assembler::build_payload;
use gymdir_core::domains::best_gyms::PagePayload;
use gymdir_core::domains::directory::Location;
use gymdir_core::kernel::InMemoryDirectory;
use sqlx::PgPool;

/// Austin and Dallas, Texas, plus one Ohio city.
///
/// | id | name            | place           | rating | reviews |
/// |----|-----------------|-----------------|--------|---------|
/// | 1  | Iron Temple     | Austin, Texas   | 4.2    | 20      |
/// | 2  | Lift Lab        | Austin, Texas   | 4.8    | 20      |
/// | 3  | Barbell Barn    | Austin, Texas   | 4.5    | 20      |
/// | 4  | Tiny Studio     | Austin, Texas   | 5.0    | 14      |
/// | 5  | Dallas Strength | Dallas, Texas   | 4.6    | 30      |
/// | 6  | Buckeye Fitness | Columbus, Ohio  | 4.1    | 16      |
pub fn texas_directory() -> InMemoryDirectory {
    InMemoryDirectory::new()
        .with_gym(1, "Iron Temple")
        .with_address(1, "Texas", "Austin", &rates(4.2, 20))
        .with_gym(2, "Lift Lab")
        .with_address(2, "Texas", "Austin", &rates(4.8, 20))
        .with_gym(3, "Barbell Barn")
        .with_address(3, "Texas", "Austin", &rates(4.5, 20))
        .with_rated_gym(4, "Tiny Studio", "Texas", "Austin", 5, 14)
        .with_gym(5, "Dallas Strength")
        .with_address(5, "Texas", "Dallas", &rates(4.6, 30))
        .with_gym(6, "Buckeye Fitness")
        .with_address(6, "Ohio", "Columbus", &rates(4.1, 16))
}

/// `count` integer rates whose mean rounds to `mean` (two decimals).
pub fn rates(mean: f64, count: usize) -> Vec<i32> {
    let total = (mean * count as f64).round() as i32;
    let base = total / count as i32;
    let extra = (total - base * count as i32) as usize;
    (0..count).map(|i| if i < extra { base + 1 } else { base }).collect()
}

pub fn gym_ids(raw: &[i64]) -> Vec<GymId> {
    raw.iter().copied().map(GymId::new).collect()
}

/// A previously generated page with no gyms listed.
pub fn existing_page(location: &Location) -> PagePayload {
    build_payload(location, Vec::new())
}

// =============================================================================
// Postgres fixtures
// =============================================================================

pub async fn insert_gym(pool: &PgPool, name: &str, slug: &str) -> Result<i64> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO gyms (name, slug, description) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(name)
    .bind(slug)
    .bind(format!("{} description", name))
    .fetch_one(pool)
    .await?;
    Ok(id)
}

pub async fn insert_address(pool: &PgPool, gym_id: i64, state: &str, city: &str, is_primary: bool) -> Result<i64> {
    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO addresses (gym_id, street, city, state, country, full_address, is_primary)
        VALUES ($1, '1 Main St', $2, $3, 'US', '1 Main St', $4)
        RETURNING id
        "#,
    )
    .bind(gym_id)
    .bind(city)
    .bind(state)
    .bind(is_primary)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

pub async fn insert_reviews(pool: &PgPool, address_id: i64, rates: &[i32]) -> Result<()> {
    for rate in rates {
        sqlx::query("INSERT INTO reviews (address_id, reviewer, rate) VALUES ($1, 'tester', $2)")
            .bind(address_id)
            .bind(rate)
            .execute(pool)
            .await?;
    }
    Ok(())
}

pub async fn soft_delete_gym(pool: &PgPool, gym_id: i64) -> Result<()> {
    sqlx::query("UPDATE gyms SET deleted_at = NOW() WHERE id = $1")
        .bind(gym_id)
        .execute(pool)
        .await?;
    Ok(())
}
