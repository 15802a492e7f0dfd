//! KNN edge extraction
//!
//! Turns per-artifact nearest-neighbor scans into a deduplicated, thresholded
//! undirected edge set. Edges are ephemeral: derived at query time for both
//! community detection and topology export, never persisted.

use std::collections::BTreeMap;

/// Neighbors fetched per artifact.
pub const KNN_K: usize = 10;

/// Edges below this cosine similarity are discarded.
pub const MIN_SIMILARITY: f32 = 0.3;

/// Tenants with fewer eligible artifacts than this are skipped outright.
pub const MIN_TENANT_ARTIFACTS: usize = 5;

/// Graphs with fewer nodes than this are not worth partitioning.
pub const MIN_GRAPH_ORDER: usize = 3;

/// Canonical key for an undirected edge: the id pair in sorted order, so the
/// edge collapses to one entry no matter which endpoint's scan found it.
pub type EdgeKey = (String, String);

pub fn edge_key(a: &str, b: &str) -> EdgeKey {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

/// Fold per-node KNN scans into the deduplicated edge set. Self-pairs and
/// neighbors below [`MIN_SIMILARITY`] are dropped; an edge reported from both
/// endpoints keeps the higher similarity (the scans can disagree slightly
/// when the index is approximate).
pub fn collect_edges<I, N>(scans: I) -> BTreeMap<EdgeKey, f32>
where
    I: IntoIterator<Item = (String, N)>,
    N: IntoIterator<Item = (String, f32)>,
{
    let mut edges: BTreeMap<EdgeKey, f32> = BTreeMap::new();

    for (source, neighbors) in scans {
        for (target, similarity) in neighbors {
            if target == source || similarity < MIN_SIMILARITY {
                continue;
            }
            let key = edge_key(&source, &target);
            let entry = edges.entry(key).or_insert(similarity);
            if similarity > *entry {
                *entry = similarity;
            }
        }
    }

    edges
}

/// Distinct node count of an edge set.
pub fn graph_order(edges: &BTreeMap<EdgeKey, f32>) -> usize {
    let mut nodes = std::collections::HashSet::new();
    for (a, b) in edges.keys() {
        nodes.insert(a.as_str());
        nodes.insert(b.as_str());
    }
    nodes.len()
}
