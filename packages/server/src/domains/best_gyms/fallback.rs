use crate::domains::directory::CandidateGym;

use super::ranking::MAX_RANKED_GYMS;

/// Order candidates by local rating, best first, keeping input order on ties.
pub fn fallback_rank(candidates: &[CandidateGym]) -> Vec<CandidateGym> {
    let mut ranked = candidates.to_vec();
    ranked.sort_by(|a, b| b.rating.total_cmp(&a.rating));
    ranked.truncate(MAX_RANKED_GYMS);
    ranked
}
