//! Deterministic ranking of scored candidates.
//!
//! Total order: composite descending, resume id ascending on exact ties.
//! The id tiebreak makes repeated runs over the same inputs byte-stable,
//! independent of scoring or arrival order.

use std::cmp::Ordering;

use crate::models::ScoredCandidate;

/// Sorts candidates into their final order, assigns 1-based ranks, and
/// drops entries below the optional composite floor.
pub fn rank(mut candidates: Vec<ScoredCandidate>, min_composite: Option<f64>) -> Vec<ScoredCandidate> {
    if let Some(floor) = min_composite {
        candidates.retain(|c| c.breakdown.composite >= floor);
    }
    candidates.sort_by(|a, b| compare(a, b));
    for (i, candidate) in candidates.iter_mut().enumerate() {
        candidate.breakdown.rank = Some(i as u32 + 1);
    }
    candidates
}

/// Prefix of an already ranked list, order preserved.
pub fn top(ranked: &[ScoredCandidate], n: usize) -> &[ScoredCandidate] {
    &ranked[..n.min(ranked.len())]
}

fn compare(a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
    b.breakdown
        .composite
        .partial_cmp(&a.breakdown.composite)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.record.id.cmp(&b.record.id))
}
