// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// Candidate selection, ranking and page assembly are domain functions that use these traits.
//
// Naming convention: Base* for trait names (e.g., BaseDirectory, BasePageStore)

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

use crate::common::GymId;
use crate::domains::best_gyms::models::{BestGymsPage, PageFilter, PagePayload, UpsertOutcome};
use crate::domains::directory::models::{AddressQuery, AddressRecord, GymRecord, Location};

// =============================================================================
// Directory Trait (Infrastructure - read-only gym data)
// =============================================================================

#[async_trait]
pub trait BaseDirectory: Send + Sync {
    /// Distinct (city, state) pairs where both are non-empty, ordered by state then city.
    /// Country is taken from the pair's address data when any is present.
    async fn find_city_state_pairs(
        &self,
        state: Option<&str>,
        city: Option<&str>,
    ) -> Result<Vec<Location>>;

    /// One state-wide location per distinct non-empty state, ordered by state.
    async fn find_states(&self, state: Option<&str>) -> Result<Vec<Location>>;

    /// Non-deleted addresses matching the query, with gym name and review rates.
    async fn find_addresses(&self, query: &AddressQuery) -> Result<Vec<AddressRecord>>;

    /// Non-deleted gyms with their media. Unknown ids are absent from the result.
    async fn find_gyms(&self, ids: &[GymId]) -> Result<Vec<GymRecord>>;
}

// =============================================================================
// Page Store Trait (Infrastructure - generated pages)
// =============================================================================

#[async_trait]
pub trait BasePageStore: Send + Sync {
    async fn exists(&self, slug: &str) -> Result<bool>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<BestGymsPage>>;

    /// Insert the page, or overwrite every payload field of the page with the
    /// same slug in one statement (keeping its id).
    async fn upsert(&self, payload: PagePayload) -> Result<UpsertOutcome>;

    /// Pages matching the filter, ordered by slug.
    async fn list(&self, filter: &PageFilter, limit: i64, offset: i64) -> Result<Vec<BestGymsPage>>;

    async fn count(&self, filter: &PageFilter) -> Result<i64>;
}

// =============================================================================
// Ranking Provider Trait (Infrastructure - LLM text generation)
// =============================================================================

/// Failure talking to a ranking provider.
#[derive(Debug, Error)]
pub enum RankingError {
    #[error("ranking provider is not configured: {0}")]
    Config(String),

    #[error("request to ranking provider failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("ranking provider returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("could not parse ranking provider response: {0}")]
    Parse(String),

    #[error("ranking provider returned no text")]
    EmptyResponse,
}

#[async_trait]
pub trait BaseRankingProvider: Send + Sync {
    /// Short provider name used in logs.
    fn name(&self) -> &'static str;

    /// Send a single prompt and return the model's raw text answer.
    async fn generate(&self, prompt: &str, timeout: Duration) -> Result<String, RankingError>;
}
