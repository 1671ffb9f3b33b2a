//! Read-side queries the page pipeline runs against the directory.

use std::collections::HashMap;

use anyhow::Result;
use tracing::debug;

use super::candidates::{aggregate_candidates, apply_gate, CandidateGym, QualityGate, RankingCandidate, RatingSummary};
use super::models::{Address, AddressQuery, Location};
use super::snapshot::GymSnapshot;
use crate::common::GymId;
use crate::kernel::BaseDirectory;

/// Trimmed location filters; blank input counts as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationFilter {
    pub state: Option<String>,
    pub city: Option<String>,
}

impl LocationFilter {
    pub fn new(state: Option<&str>, city: Option<&str>) -> Self {
        let clean = |value: Option<&str>| {
            value
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        Self {
            state: clean(state),
            city: clean(city),
        }
    }
}

pub struct DirectoryReader<'a> {
    directory: &'a dyn BaseDirectory,
    gate: QualityGate,
}

impl<'a> DirectoryReader<'a> {
    pub fn new(directory: &'a dyn BaseDirectory, gate: QualityGate) -> Self {
        Self { directory, gate }
    }

    /// Gyms with an address in the location that pass the quality gate,
    /// in first-seen address order.
    pub async fn candidates(&self, location: &Location) -> Result<Vec<CandidateGym>> {
        let records = self
            .directory
            .find_addresses(&AddressQuery::for_location(&location.state, &location.city))
            .await?;

        let all = aggregate_candidates(&records);
        let total = all.len();
        let gated = apply_gate(all, &self.gate);

        debug!(
            location = %location,
            addresses = records.len(),
            gyms = total,
            qualifying = gated.len(),
            "selected candidate gyms"
        );

        Ok(gated)
    }

    /// Full snapshots for exactly the given gyms, rated within the location.
    ///
    /// Gyms that no longer exist or have no address in the location are
    /// absent from the result.
    pub async fn profiles(&self, location: &Location, ids: &[GymId]) -> Result<HashMap<GymId, GymSnapshot>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let query = AddressQuery::for_location(&location.state, &location.city).with_gym_ids(ids.to_vec());
        let records = self.directory.find_addresses(&query).await?;

        let mut addresses: HashMap<GymId, Vec<&Address>> = HashMap::new();
        let mut rates: HashMap<GymId, Vec<&i32>> = HashMap::new();
        for record in records.iter().filter(|r| r.gym_name.is_some()) {
            let gym_id = record.address.gym_id;
            addresses.entry(gym_id).or_default().push(&record.address);
            rates.entry(gym_id).or_default().extend(record.rates.iter());
        }

        let present: Vec<GymId> = ids.iter().copied().filter(|id| addresses.contains_key(id)).collect();
        let gyms = self.directory.find_gyms(&present).await?;

        let profiles = gyms
            .iter()
            .map(|record| {
                let id = record.gym.id;
                let summary = rates
                    .get(&id)
                    .map(|r| RatingSummary::from_rates(r.iter().copied()))
                    .unwrap_or_default();
                let gym_addresses = addresses.get(&id).map(Vec::as_slice).unwrap_or(&[]);
                (id, GymSnapshot::build(record, summary, gym_addresses))
            })
            .collect();

        Ok(profiles)
    }

    /// Every location a page can be generated for under the filter.
    ///
    /// With a city filter only the matching (city, state) pairs are returned.
    /// Otherwise one state-wide entry per state is added. Sorted by state then
    /// city, so the state-wide entry leads its state.
    pub async fn resolve_locations(&self, filter: &LocationFilter) -> Result<Vec<Location>> {
        let state = filter.state.as_deref();
        let city = filter.city.as_deref();

        let mut locations = self.directory.find_city_state_pairs(state, city).await?;

        if city.is_none() {
            locations.extend(self.directory.find_states(state).await?);
        }

        locations.retain(Location::is_valid);
        locations.sort_by(|a, b| (&a.state, &a.city).cmp(&(&b.state, &b.city)));
        locations.dedup_by(|a, b| a.state == b.state && a.city == b.city);

        Ok(locations)
    }
}

/// Identity-only payload for the ranking service.
pub fn ranking_pool(candidates: &[CandidateGym]) -> Vec<RankingCandidate> {
    candidates.iter().map(RankingCandidate::from).collect()
}
