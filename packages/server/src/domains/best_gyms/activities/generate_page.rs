//! Single-location page generation.
//!
//! Candidates -> existing-page check -> one ranking call -> profiles ->
//! assembly -> upsert. Ranking problems never fail the run; the local rating
//! order takes over instead.

use std::fmt;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::common::GymId;
use crate::domains::best_gyms::assembler::{assemble_gyms_data, build_payload, build_slug};
use crate::domains::best_gyms::fallback::fallback_rank;
use crate::domains::best_gyms::models::UpsertOutcome;
use crate::domains::directory::{ranking_pool, CandidateGym, Location};
use crate::kernel::ServerDeps;

/// Where a page's gym order came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankingSource {
    Service,
    Fallback,
}

impl fmt::Display for RankingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RankingSource::Service => "service",
            RankingSource::Fallback => "fallback",
        })
    }
}

/// Result of generating one location's page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    Saved {
        slug: String,
        outcome: UpsertOutcome,
        gyms: usize,
        source: RankingSource,
    },
    /// A page already exists and `force` was not set.
    SkippedExisting { slug: String },
    /// No gym passed the quality gate; nothing was written.
    NoCandidates { slug: String },
    /// None of the ordered gyms could be loaded; nothing was written.
    NoGyms { slug: String },
}

impl GenerationOutcome {
    pub fn slug(&self) -> &str {
        match self {
            GenerationOutcome::Saved { slug, .. }
            | GenerationOutcome::SkippedExisting { slug }
            | GenerationOutcome::NoCandidates { slug }
            | GenerationOutcome::NoGyms { slug } => slug,
        }
    }

    pub fn is_saved(&self) -> bool {
        matches!(self, GenerationOutcome::Saved { .. })
    }
}

/// Generate (or regenerate with `force`) the page for one location.
pub async fn generate_page(location: &Location, force: bool, deps: &ServerDeps) -> Result<GenerationOutcome> {
    let slug = build_slug(location);

    let candidates = deps
        .reader()
        .candidates(location)
        .await
        .with_context(|| format!("Failed to load candidate gyms for {}", location))?;

    if candidates.is_empty() {
        info!(location = %location, slug = %slug, "no qualifying gyms, skipping page");
        return Ok(GenerationOutcome::NoCandidates { slug });
    }

    if !force && deps.pages.exists(&slug).await? {
        info!(location = %location, slug = %slug, "page already exists, skipping");
        return Ok(GenerationOutcome::SkippedExisting { slug });
    }

    let ranked = deps.ranking.rank(&ranking_pool(&candidates), location).await;

    persist_ranked(location, slug, ranked, &candidates, deps).await
}

/// Turn an ordering into a stored page, falling back to the local rating
/// order when the ordering is empty or none of its gyms can be loaded.
pub(crate) async fn persist_ranked(
    location: &Location,
    slug: String,
    ranked: Vec<GymId>,
    candidates: &[CandidateGym],
    deps: &ServerDeps,
) -> Result<GenerationOutcome> {
    let reader = deps.reader();

    let (mut ids, mut source) = if ranked.is_empty() {
        info!(location = %location, "no usable ranking, ordering by local rating");
        (fallback_ids(candidates), RankingSource::Fallback)
    } else {
        (ranked, RankingSource::Service)
    };

    let mut profiles = reader
        .profiles(location, &ids)
        .await
        .with_context(|| format!("Failed to load gym profiles for {}", location))?;
    let mut gyms = assemble_gyms_data(&ids, &profiles);

    if gyms.is_empty() && source == RankingSource::Service {
        warn!(location = %location, "ranked gyms could not be loaded, ordering by local rating");
        ids = fallback_ids(candidates);
        source = RankingSource::Fallback;
        profiles = reader
            .profiles(location, &ids)
            .await
            .with_context(|| format!("Failed to load gym profiles for {}", location))?;
        gyms = assemble_gyms_data(&ids, &profiles);
    }

    if gyms.is_empty() {
        warn!(location = %location, slug = %slug, "no gym profiles available, skipping page");
        return Ok(GenerationOutcome::NoGyms { slug });
    }

    let gym_count = gyms.len();
    let outcome = deps
        .pages
        .upsert(build_payload(location, gyms))
        .await
        .with_context(|| format!("Failed to save best gyms page {}", slug))?;

    info!(
        location = %location,
        slug = %slug,
        page_id = %outcome.id(),
        action = outcome.as_str(),
        gyms = gym_count,
        source = %source,
        "saved best gyms page"
    );

    Ok(GenerationOutcome::Saved {
        slug,
        outcome,
        gyms: gym_count,
        source,
    })
}

fn fallback_ids(candidates: &[CandidateGym]) -> Vec<GymId> {
    fallback_rank(candidates).iter().map(|c| c.id).collect()
}
