//! Multi-location page generation with a single ranking call.

use std::collections::HashMap;

use anyhow::{Context, Result};
use tracing::info;

use super::generate_page::{persist_ranked, GenerationOutcome};
use crate::common::GymId;
use crate::domains::best_gyms::assembler::build_slug;
use crate::domains::best_gyms::ranking::{BatchRankingInput, RankingKey};
use crate::domains::directory::{ranking_pool, CandidateGym, Location};
use crate::kernel::ServerDeps;

struct PendingPage {
    index: usize,
    location: Location,
    slug: String,
    candidates: Vec<CandidateGym>,
}

/// Generate pages for every location in the batch. Outcomes come back in
/// the order of `locations`.
///
/// Existing pages are dropped before the ranking call unless `force`. A
/// location the ranking answer leaves out falls back on its own; the others
/// keep their ranked order.
pub async fn generate_batch(locations: &[Location], force: bool, deps: &ServerDeps) -> Result<Vec<GenerationOutcome>> {
    let reader = deps.reader();
    let mut outcomes: Vec<Option<GenerationOutcome>> = vec![None; locations.len()];
    let mut pending = Vec::new();

    for (index, location) in locations.iter().enumerate() {
        let slug = build_slug(location);

        if !force && deps.pages.exists(&slug).await? {
            info!(location = %location, slug = %slug, "page already exists, skipping");
            outcomes[index] = Some(GenerationOutcome::SkippedExisting { slug });
            continue;
        }

        let candidates = reader
            .candidates(location)
            .await
            .with_context(|| format!("Failed to load candidate gyms for {}", location))?;

        if candidates.is_empty() {
            info!(location = %location, slug = %slug, "no qualifying gyms, skipping page");
            outcomes[index] = Some(GenerationOutcome::NoCandidates { slug });
            continue;
        }

        pending.push(PendingPage {
            index,
            location: location.clone(),
            slug,
            candidates,
        });
    }

    if pending.is_empty() {
        info!(locations = locations.len(), "nothing to generate in batch");
        return Ok(outcomes.into_iter().flatten().collect());
    }

    let inputs: Vec<BatchRankingInput> = pending
        .iter()
        .map(|page| BatchRankingInput::new(page.location.clone(), ranking_pool(&page.candidates)))
        .collect();

    let mut ranked: HashMap<RankingKey, Vec<GymId>> = deps
        .ranking
        .rank_batch(&inputs)
        .await
        .into_iter()
        .map(|result| (result.key(), result.gym_ids))
        .collect();

    for page in pending {
        let ids = ranked
            .remove(&RankingKey::for_location(&page.location))
            .unwrap_or_default();
        outcomes[page.index] = Some(persist_ranked(&page.location, page.slug, ids, &page.candidates, deps).await?);
    }

    let outcomes: Vec<GenerationOutcome> = outcomes.into_iter().flatten().collect();
    let saved = outcomes.iter().filter(|o| o.is_saved()).count();
    info!(locations = locations.len(), saved, "batch generation finished");

    Ok(outcomes)
}
