//! Reciprocal Rank Fusion (RRF) for hybrid search
//!
//! Merges the lexical and semantic top-20 candidate lists into a single
//! ranked list. Each list contributes `1/(60 + rank)` with 1-based ranks;
//! an artifact present in only one list scores zero for the other.

use std::collections::HashMap;

/// RRF constant (standard value from literature)
pub const RRF_K: f32 = 60.0;

/// Ranks and fused score for one artifact.
#[derive(Debug, Clone, Default)]
pub struct FusedScore {
    pub ft_rank: Option<usize>,
    pub sm_rank: Option<usize>,
    pub score: f32,
}

/// Fuse two ranked id lists. Inputs are ordered best-first; output is sorted
/// by fused score descending, equal scores in unspecified order (callers
/// apply their own tie-breaks).
pub fn rrf_fuse(lexical: &[String], semantic: &[String]) -> Vec<(String, FusedScore)> {
    let mut scores: HashMap<String, FusedScore> = HashMap::new();

    for (rank0, id) in lexical.iter().enumerate() {
        let rank = rank0 + 1;
        let entry = scores.entry(id.clone()).or_default();
        entry.ft_rank = Some(rank);
        entry.score += 1.0 / (RRF_K + rank as f32);
    }

    for (rank0, id) in semantic.iter().enumerate() {
        let rank = rank0 + 1;
        let entry = scores.entry(id.clone()).or_default();
        entry.sm_rank = Some(rank);
        entry.score += 1.0 / (RRF_K + rank as f32);
    }

    let mut results: Vec<_> = scores.into_iter().collect();
    results.sort_by(|a, b| {
        b.1.score
            .partial_cmp(&a.1.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    results
}
