use serde::{Deserialize, Serialize};

/// Row shape shared by the lexical and semantic candidate queries: identity,
/// display fields, the ranking tie-break aggregates, and the source-specific
/// relevance score (token-frequency or cosine similarity).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub usage_count: u64,
    #[serde(default)]
    pub rating_avg: f32,
    pub score: f32,
}

/// One fused search result. `ft_rank`/`sm_rank` are 1-based positions within
/// the respective top-20 candidate lists; absence from a list leaves the rank
/// null and contributes zero to the fused score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ft_rank: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sm_rank: Option<usize>,
    pub rrf_score: f32,
}
