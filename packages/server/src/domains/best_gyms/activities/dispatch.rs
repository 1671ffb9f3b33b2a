//! Resolve locations and hand them to a job dispatcher.
//!
//! Shared by the two CLI entry points: one unit per location, or one unit
//! per fixed-size batch of locations.

use anyhow::{Context, Result};
use tracing::info;

use crate::domains::best_gyms::jobs::{BatchGenerateBestGymsPagesJob, GenerateBestGymsPageJob};
use crate::domains::directory::{Location, LocationFilter};
use crate::kernel::jobs::{DispatchOutcome, Job, JobDispatcher};
use crate::kernel::ServerDeps;

pub const DEFAULT_BATCH_SIZE: usize = 20;

/// What to generate and where the work goes.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub filter: LocationFilter,
    pub force: bool,
    pub queue_name: String,
    /// Stop after this many resolved locations.
    pub location_limit: Option<usize>,
    /// Locations per batch unit; values below 1 count as 1.
    pub batch_size: usize,
}

impl GenerationRequest {
    pub fn new(filter: LocationFilter, queue_name: impl Into<String>) -> Self {
        Self {
            filter,
            force: false,
            queue_name: queue_name.into(),
            location_limit: None,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn with_location_limit(mut self, limit: Option<usize>) -> Self {
        self.location_limit = limit;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub locations: usize,
    pub units: usize,
    /// Units that ran inline and failed.
    pub failed: usize,
}

impl DispatchSummary {
    fn record(&mut self, outcome: &DispatchOutcome) {
        self.units += 1;
        if outcome.is_failure() {
            self.failed += 1;
        }
    }
}

/// Locations matching the request, capped by its location limit (at least one).
pub async fn resolve_request_locations(request: &GenerationRequest, deps: &ServerDeps) -> Result<Vec<Location>> {
    let mut locations = deps
        .reader()
        .resolve_locations(&request.filter)
        .await
        .context("Failed to resolve locations")?;

    if let Some(limit) = request.location_limit {
        locations.truncate(limit.max(1));
    }

    Ok(locations)
}

/// One unit of work per location.
pub async fn dispatch_per_location(
    request: &GenerationRequest,
    deps: &ServerDeps,
    dispatcher: &dyn JobDispatcher,
) -> Result<DispatchSummary> {
    let locations = resolve_request_locations(request, deps).await?;
    let mut summary = DispatchSummary {
        locations: locations.len(),
        ..Default::default()
    };

    if locations.is_empty() {
        info!(filter = ?request.filter, "no locations matched, nothing to dispatch");
        return Ok(summary);
    }

    info!(locations = locations.len(), force = request.force, queue = %request.queue_name, "dispatching page generation");

    for location in locations {
        let job = Job::for_command(&GenerateBestGymsPageJob::new(location, request.force), &request.queue_name)?;
        let outcome = dispatcher.dispatch(job).await?;
        summary.record(&outcome);
    }

    info!(locations = summary.locations, units = summary.units, failed = summary.failed, "dispatch finished");
    Ok(summary)
}

/// One unit of work per batch of `batch_size` locations (the last may be shorter).
pub async fn dispatch_batches(
    request: &GenerationRequest,
    deps: &ServerDeps,
    dispatcher: &dyn JobDispatcher,
) -> Result<DispatchSummary> {
    let locations = resolve_request_locations(request, deps).await?;
    let mut summary = DispatchSummary {
        locations: locations.len(),
        ..Default::default()
    };

    if locations.is_empty() {
        info!(filter = ?request.filter, "no locations matched, nothing to dispatch");
        return Ok(summary);
    }

    let batch_size = request.batch_size.max(1);
    let batch_count = locations.len().div_ceil(batch_size);
    info!(
        locations = locations.len(),
        batch_size,
        batches = batch_count,
        force = request.force,
        queue = %request.queue_name,
        "dispatching batch page generation"
    );

    for (index, batch) in locations.chunks(batch_size).enumerate() {
        let labels: Vec<String> = batch.iter().map(Location::label).collect();
        info!(
            batch = index + 1,
            of = batch_count,
            size = batch.len(),
            locations = %labels.join("; "),
            "dispatching batch"
        );

        let job = Job::for_command(
            &BatchGenerateBestGymsPagesJob::new(batch.to_vec(), request.force),
            &request.queue_name,
        )?;
        let outcome = dispatcher.dispatch(job).await?;
        summary.record(&outcome);
    }

    info!(locations = summary.locations, units = summary.units, failed = summary.failed, "dispatch finished");
    Ok(summary)
}
