//! Hybrid search
//!
//! Lexical and semantic top-20 candidate lists fused with RRF. Without a
//! usable query embedding the engine serves lexical-only results instead of
//! failing the request.

use std::collections::HashMap;

use crate::config::AppState;
use crate::engine::normalize_limit;
use crate::graph::rrf_fuse;
use crate::storage::StorageBackend;
use crate::types::{Candidate, SearchHit};
use crate::visibility::VisibilityScope;
use crate::Result;

/// Depth of each candidate list fed into the fusion.
pub const SEARCH_CANDIDATES: usize = 20;

/// Substring candidates fetched before in-process re-ranking.
const LEXICAL_FETCH: usize = 100;

/// Tokens shorter than this don't discriminate; queries yielding none fall
/// back to whole-string substring matching.
const MIN_TOKEN_LEN: usize = 3;

pub fn tokenize(query: &str) -> Vec<String> {
    query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() >= MIN_TOKEN_LEN)
        .map(|t| t.to_lowercase())
        .collect()
}

fn occurrences(haystack: &str, needle: &str) -> usize {
    if needle.is_empty() {
        return 0;
    }
    haystack.matches(needle).count()
}

/// Re-rank substring candidates by token frequency: name matches count
/// double, summary matches single. Returns the candidates best-first with
/// their scores replaced; ties break on the usage/rating aggregates, then id.
pub fn lexical_rank(candidates: Vec<Candidate>, tokens: &[String]) -> Vec<Candidate> {
    let mut ranked: Vec<Candidate> = candidates
        .into_iter()
        .map(|mut c| {
            let name = c.name.to_lowercase();
            let summary = c.summary.to_lowercase();
            let score: usize = tokens
                .iter()
                .map(|t| occurrences(&name, t) * 2 + occurrences(&summary, t))
                .sum();
            c.score = score as f32;
            c
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(b.usage_count.cmp(&a.usage_count))
            .then(
                b.rating_avg
                    .partial_cmp(&a.rating_avg)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
            .then(a.id.cmp(&b.id))
    });
    ranked
}

pub async fn search(
    state: &AppState,
    tenant_id: &str,
    query: &str,
    query_embedding: Option<Vec<f32>>,
    principal_id: Option<String>,
    limit: Option<usize>,
) -> Result<Vec<SearchHit>> {
    let limit = normalize_limit(limit);
    let scope = VisibilityScope::for_principal(tenant_id, principal_id);

    let tokens = tokenize(query);
    let fetched = state
        .storage
        .lexical_candidates(query, &tokens, &scope, LEXICAL_FETCH)
        .await?;
    let mut lexical = lexical_rank(fetched, &tokens);
    lexical.truncate(SEARCH_CANDIDATES);

    let semantic: Vec<Candidate> = match query_embedding {
        Some(vector) if vector.len() == state.config.dimension => {
            state
                .storage
                .semantic_candidates(&vector, &scope, SEARCH_CANDIDATES)
                .await?
        }
        Some(vector) => {
            tracing::warn!(
                expected = state.config.dimension,
                actual = vector.len(),
                "Query embedding dimension mismatch, serving lexical-only results"
            );
            vec![]
        }
        None => vec![],
    };

    let lexical_ids: Vec<String> = lexical.iter().map(|c| c.id.clone()).collect();
    let semantic_ids: Vec<String> = semantic.iter().map(|c| c.id.clone()).collect();
    let fused = rrf_fuse(&lexical_ids, &semantic_ids);

    let mut display: HashMap<&str, &Candidate> = HashMap::new();
    for c in lexical.iter().chain(semantic.iter()) {
        display.entry(c.id.as_str()).or_insert(c);
    }

    let mut hits: Vec<SearchHit> = fused
        .into_iter()
        .filter_map(|(id, fused_score)| {
            display.get(id.as_str()).map(|c| SearchHit {
                id: id.clone(),
                name: c.name.clone(),
                summary: c.summary.clone(),
                ft_rank: fused_score.ft_rank,
                sm_rank: fused_score.sm_rank,
                rrf_score: fused_score.score,
            })
        })
        .collect();

    // fused score first, the denormalized aggregates as tie-breaks
    hits.sort_by(|a, b| {
        let key = |hit: &SearchHit| {
            display
                .get(hit.id.as_str())
                .map(|c| (c.usage_count, c.rating_avg))
                .unwrap_or((0, 0.0))
        };
        b.rrf_score
            .partial_cmp(&a.rrf_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                let (au, ar) = key(a);
                let (bu, br) = key(b);
                bu.cmp(&au)
                    .then(br.partial_cmp(&ar).unwrap_or(std::cmp::Ordering::Equal))
            })
            .then_with(|| a.id.cmp(&b.id))
    });
    hits.truncate(limit);
    Ok(hits)
}
