//! Background jobs for best-gyms page generation.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::activities::{generate_batch, generate_page};
use super::ranking::RankingKey;
use crate::domains::directory::Location;
use crate::kernel::jobs::{CommandMeta, JobRegistry};
use crate::kernel::ServerDeps;

fn force_suffix(force: bool) -> &'static str {
    if force {
        ":force"
    } else {
        ""
    }
}

/// Generate one location's page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateBestGymsPageJob {
    pub location: Location,
    #[serde(default)]
    pub force: bool,
}

impl GenerateBestGymsPageJob {
    pub const JOB_TYPE: &'static str = "generate_best_gyms_page";

    pub fn new(location: Location, force: bool) -> Self {
        Self { location, force }
    }

    pub async fn run(self, deps: &ServerDeps) -> Result<()> {
        generate_page(&self.location, self.force, deps)
            .await
            .with_context(|| format!("Best gyms page generation failed for {}", self.location))?;
        Ok(())
    }
}

impl CommandMeta for GenerateBestGymsPageJob {
    fn command_type(&self) -> &'static str {
        Self::JOB_TYPE
    }

    fn idempotency_key(&self) -> Option<String> {
        Some(format!(
            "best_gyms_page:{}{}",
            RankingKey::for_location(&self.location),
            force_suffix(self.force)
        ))
    }

    fn max_attempts(&self) -> i32 {
        3
    }

    fn backoff(&self) -> Duration {
        Duration::from_secs(60)
    }
}

/// Generate the pages of several locations with one ranking call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchGenerateBestGymsPagesJob {
    pub locations: Vec<Location>,
    #[serde(default)]
    pub force: bool,
}

impl BatchGenerateBestGymsPagesJob {
    pub const JOB_TYPE: &'static str = "batch_generate_best_gyms_pages";

    pub fn new(locations: Vec<Location>, force: bool) -> Self {
        Self { locations, force }
    }

    pub async fn run(self, deps: &ServerDeps) -> Result<()> {
        let labels: Vec<String> = self.locations.iter().map(Location::label).collect();
        generate_batch(&self.locations, self.force, deps)
            .await
            .with_context(|| format!("Best gyms batch generation failed for [{}]", labels.join("; ")))?;
        Ok(())
    }
}

impl CommandMeta for BatchGenerateBestGymsPagesJob {
    fn command_type(&self) -> &'static str {
        Self::JOB_TYPE
    }

    fn idempotency_key(&self) -> Option<String> {
        let keys: Vec<String> = self
            .locations
            .iter()
            .map(|l| RankingKey::for_location(l).to_string())
            .collect();
        Some(format!("best_gyms_batch:{}{}", keys.join(";"), force_suffix(self.force)))
    }

    fn max_attempts(&self) -> i32 {
        3
    }

    fn backoff(&self) -> Duration {
        Duration::from_secs(120)
    }
}

/// Register the best-gyms job handlers.
pub fn register_best_gyms_jobs(registry: &mut JobRegistry) {
    registry.register::<GenerateBestGymsPageJob, _, _>(GenerateBestGymsPageJob::JOB_TYPE, |job, deps| async move {
        job.run(&deps).await
    });

    registry.register::<BatchGenerateBestGymsPagesJob, _, _>(
        BatchGenerateBestGymsPagesJob::JOB_TYPE,
        |job, deps| async move { job.run(&deps).await },
    );
}
