//! Ranking client: asks the configured provider to order candidate gyms and
//! validates whatever comes back.
//!
//! Every failure mode (no credential, network error, bad status, empty or
//! unparseable text) resolves to an empty ranking. Callers fall back to the
//! local rating order in that case.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::prompts;
use crate::common::GymId;
use crate::domains::directory::{Location, LocationKind, RankingCandidate};
use crate::kernel::{BaseRankingProvider, RankingError};

/// Most gyms a page lists.
pub const MAX_RANKED_GYMS: usize = 10;

lazy_static! {
    // ```json ... ``` or ``` ... ```
    static ref CODE_FENCE_REGEX: Regex =
        Regex::new(r"```(?:json)?\s*([\s\S]*?)\s*```").expect("code fence regex");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankingTimeouts {
    pub single: Duration,
    pub batch: Duration,
}

impl Default for RankingTimeouts {
    fn default() -> Self {
        Self {
            single: Duration::from_secs(60),
            batch: Duration::from_secs(120),
        }
    }
}

/// Key that matches a batch answer back to the location it was asked for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RankingKey {
    pub location: String,
    pub kind: LocationKind,
}

impl RankingKey {
    pub fn for_location(location: &Location) -> Self {
        Self {
            location: location.label(),
            kind: location.kind(),
        }
    }
}

impl fmt::Display for RankingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.location, self.kind)
    }
}

/// One location's entry in a batch ranking request.
#[derive(Debug, Clone)]
pub struct BatchRankingInput {
    pub location: Location,
    pub candidates: Vec<RankingCandidate>,
}

impl BatchRankingInput {
    pub fn new(location: Location, candidates: Vec<RankingCandidate>) -> Self {
        Self {
            location,
            candidates,
        }
    }

    pub fn key(&self) -> RankingKey {
        RankingKey::for_location(&self.location)
    }
}

/// Validated ranking for one location of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedResult {
    pub location: String,
    #[serde(rename = "type")]
    pub kind: LocationKind,
    pub gym_ids: Vec<GymId>,
}

impl RankedResult {
    pub fn key(&self) -> RankingKey {
        RankingKey {
            location: self.location.clone(),
            kind: self.kind,
        }
    }
}

/// Raw batch entry as the model writes it.
#[derive(Debug, Deserialize)]
struct BatchEntry {
    location: String,
    #[serde(rename = "type")]
    kind: LocationKind,
    gym_ids: Vec<serde_json::Value>,
}

pub struct RankingClient {
    provider: Option<Arc<dyn BaseRankingProvider>>,
    timeouts: RankingTimeouts,
}

impl RankingClient {
    pub fn new(provider: Arc<dyn BaseRankingProvider>, timeouts: RankingTimeouts) -> Self {
        Self {
            provider: Some(provider),
            timeouts,
        }
    }

    /// A client without credentials: every ranking comes back empty.
    pub fn disabled() -> Self {
        Self {
            provider: None,
            timeouts: RankingTimeouts::default(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.provider.is_some()
    }

    pub fn timeouts(&self) -> RankingTimeouts {
        self.timeouts
    }

    /// Rank one location's candidates. Empty when the service is unavailable
    /// or returned nothing usable.
    pub async fn rank(&self, candidates: &[RankingCandidate], location: &Location) -> Vec<GymId> {
        let Some(provider) = &self.provider else {
            debug!(location = %location, "no ranking credential configured, skipping ranking call");
            return Vec::new();
        };
        if candidates.is_empty() {
            return Vec::new();
        }

        let prompt = prompts::single_location_prompt(candidates, location);
        let text = match provider.generate(&prompt, self.timeouts.single).await {
            Ok(text) => text,
            Err(e) => {
                log_provider_error(provider.name(), &e, Some(location));
                return Vec::new();
            }
        };

        let valid: HashSet<GymId> = candidates.iter().map(|c| c.id).collect();
        match parse_ranked_ids(&text, &valid) {
            Some(ids) => {
                debug!(location = %location, provider = provider.name(), ranked = ids.len(), "ranking received");
                ids
            }
            None => {
                warn!(location = %location, provider = provider.name(), text = %text, "ranking response is not a JSON array");
                Vec::new()
            }
        }
    }

    /// Rank several locations with a single provider call.
    ///
    /// Only entries whose key matches an input survive; their ids are
    /// restricted to that input's candidates.
    pub async fn rank_batch(&self, inputs: &[BatchRankingInput]) -> Vec<RankedResult> {
        let Some(provider) = &self.provider else {
            debug!(locations = inputs.len(), "no ranking credential configured, skipping batch ranking call");
            return Vec::new();
        };
        if inputs.is_empty() {
            return Vec::new();
        }

        let prompt = prompts::batch_prompt(inputs);
        info!(provider = provider.name(), locations = inputs.len(), "requesting batch ranking");

        let text = match provider.generate(&prompt, self.timeouts.batch).await {
            Ok(text) => text,
            Err(e) => {
                log_provider_error(provider.name(), &e, None);
                return Vec::new();
            }
        };

        let valid: HashMap<RankingKey, HashSet<GymId>> = inputs
            .iter()
            .map(|input| (input.key(), input.candidates.iter().map(|c| c.id).collect()))
            .collect();

        match parse_batch(&text, &valid) {
            Some(results) => {
                info!(provider = provider.name(), ranked_locations = results.len(), "batch ranking received");
                results
            }
            None => {
                warn!(provider = provider.name(), text = %text, "batch ranking response is not a JSON array");
                Vec::new()
            }
        }
    }
}

fn log_provider_error(provider: &str, error: &RankingError, location: Option<&Location>) {
    let location = location.map(|l| l.label()).unwrap_or_else(|| "batch".to_string());
    match error {
        RankingError::Network(_) | RankingError::EmptyResponse => {
            warn!(provider, location = %location, error = %error, "ranking unavailable, falling back to local rating");
        }
        RankingError::Config(_) | RankingError::Api { .. } | RankingError::Parse(_) => {
            error!(provider, location = %location, error = %error, "ranking request failed, falling back to local rating");
        }
    }
}

/// Replace fenced code blocks with their contents and trim.
pub fn strip_code_fences(text: &str) -> String {
    CODE_FENCE_REGEX.replace_all(text, "$1").trim().to_string()
}

fn parse_id(value: &serde_json::Value) -> Option<GymId> {
    let raw = match value {
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    raw.map(GymId::new)
}

/// Keep ids that are candidates, drop repeats and cap the list.
fn filter_ids<'a>(values: impl IntoIterator<Item = &'a serde_json::Value>, valid: &HashSet<GymId>) -> Vec<GymId> {
    let mut seen = HashSet::new();
    values
        .into_iter()
        .filter_map(parse_id)
        .filter(|id| valid.contains(id) && seen.insert(*id))
        .take(MAX_RANKED_GYMS)
        .collect()
}

/// Parse a single-location answer. `None` when the text is not a JSON array.
pub fn parse_ranked_ids(text: &str, valid: &HashSet<GymId>) -> Option<Vec<GymId>> {
    let cleaned = strip_code_fences(text);
    let values: Vec<serde_json::Value> = serde_json::from_str(&cleaned).ok()?;
    Some(filter_ids(&values, valid))
}

/// Parse a batch answer. `None` when the text is not a JSON array; malformed
/// entries and entries for unknown keys are skipped one by one.
pub fn parse_batch(text: &str, valid: &HashMap<RankingKey, HashSet<GymId>>) -> Option<Vec<RankedResult>> {
    let cleaned = strip_code_fences(text);
    let values: Vec<serde_json::Value> = serde_json::from_str(&cleaned).ok()?;

    let mut answered = HashSet::new();
    let mut results = Vec::new();
    for value in values {
        let entry: BatchEntry = match serde_json::from_value(value) {
            Ok(entry) => entry,
            Err(e) => {
                debug!(error = %e, "skipping malformed batch ranking entry");
                continue;
            }
        };

        let key = RankingKey {
            location: entry.location,
            kind: entry.kind,
        };
        let Some(valid_ids) = valid.get(&key) else {
            debug!(key = %key, "skipping batch ranking entry for unknown location");
            continue;
        };
        if !answered.insert(key.clone()) {
            continue;
        }

        results.push(RankedResult {
            gym_ids: filter_ids(&entry.gym_ids, valid_ids),
            location: key.location,
            kind: key.kind,
        });
    }

    Some(results)
}
