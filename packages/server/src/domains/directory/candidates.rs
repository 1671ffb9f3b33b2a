//! Candidate selection for best-gyms pages.
//!
//! Addresses inside a location are grouped by their owning gym and the
//! reviews of every address are flattened into one rating.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::models::AddressRecord;
use crate::common::GymId;

/// Minimum review volume and rating a gym needs to be ranked.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QualityGate {
    /// Every gym with an address in the location is a candidate
    Disabled,
    Threshold { min_reviews: usize, min_rating: f64 },
}

impl QualityGate {
    pub const STANDARD_MIN_REVIEWS: usize = 15;
    pub const STANDARD_MIN_RATING: f64 = 4.0;

    pub fn standard() -> Self {
        QualityGate::Threshold {
            min_reviews: Self::STANDARD_MIN_REVIEWS,
            min_rating: Self::STANDARD_MIN_RATING,
        }
    }

    pub fn admits(&self, review_count: usize, rating: f64) -> bool {
        match *self {
            QualityGate::Disabled => true,
            QualityGate::Threshold {
                min_reviews,
                min_rating,
            } => review_count >= min_reviews && rating >= min_rating,
        }
    }
}

impl Default for QualityGate {
    fn default() -> Self {
        Self::standard()
    }
}

/// A gym competing for a place on a location's page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateGym {
    pub id: GymId,
    pub name: String,
    pub rating: f64,
    pub review_count: usize,
}

/// The identity-only view of a candidate sent to the ranking service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingCandidate {
    pub id: GymId,
    pub name: String,
}

impl From<&CandidateGym> for RankingCandidate {
    fn from(candidate: &CandidateGym) -> Self {
        Self {
            id: candidate.id,
            name: candidate.name.clone(),
        }
    }
}

/// Rating summary over a set of review rates. Zero rates are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RatingSummary {
    pub rating: f64,
    pub review_count: usize,
}

impl RatingSummary {
    pub fn from_rates<'a>(rates: impl IntoIterator<Item = &'a i32>) -> Self {
        let (sum, count) = rates
            .into_iter()
            .filter(|rate| **rate != 0)
            .fold((0i64, 0usize), |(sum, count), rate| {
                (sum + i64::from(*rate), count + 1)
            });

        if count == 0 {
            return Self::default();
        }

        Self {
            rating: round2(sum as f64 / count as f64),
            review_count: count,
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Group address records by gym (first-seen order) and rate each gym.
///
/// Records whose gym is missing are skipped.
pub fn aggregate_candidates(records: &[AddressRecord]) -> Vec<CandidateGym> {
    let mut grouped: IndexMap<GymId, (&str, Vec<&i32>)> = IndexMap::new();

    for record in records {
        let Some(name) = record.gym_name.as_deref() else {
            continue;
        };
        let entry = grouped
            .entry(record.address.gym_id)
            .or_insert_with(|| (name, Vec::new()));
        entry.1.extend(record.rates.iter());
    }

    grouped
        .into_iter()
        .map(|(id, (name, rates))| {
            let summary = RatingSummary::from_rates(rates);
            CandidateGym {
                id,
                name: name.to_string(),
                rating: summary.rating,
                review_count: summary.review_count,
            }
        })
        .collect()
}

/// Candidates that pass the gate, in their original order.
pub fn apply_gate(candidates: Vec<CandidateGym>, gate: &QualityGate) -> Vec<CandidateGym> {
    candidates
        .into_iter()
        .filter(|c| gate.admits(c.review_count, c.rating))
        .collect()
}
