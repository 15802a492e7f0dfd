//! Community detection
//!
//! KNN edge extraction → Louvain → atomic replace-all persistence, scoped to
//! one tenant per run. Graph building uses the anonymous visibility predicate
//! so personal/private artifacts never shape shared tenant state.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::Utc;
use petgraph::graph::{NodeIndex, UnGraph};

use crate::config::AppState;
use crate::graph::{
    collect_edges, graph_order, louvain, KNN_K, MIN_GRAPH_ORDER, MIN_TENANT_ARTIFACTS,
};
use crate::hashing::generate_id;
use crate::storage::StorageBackend;
use crate::types::{AppError, CommunityAssignment, DetectionReport, SkipReason};
use crate::visibility::VisibilityScope;
use crate::Result;

/// Partitions scoring below this modularity are flagged as low quality.
/// They still persist; the warning is the only signal.
pub const LOW_MODULARITY: f32 = 0.1;

pub async fn detect_communities(
    state: &AppState,
    tenant_id: &str,
    resolution: Option<f32>,
) -> Result<DetectionReport> {
    let _guard = state
        .detection_locks
        .try_acquire(tenant_id)
        .ok_or_else(|| AppError::DetectionBusy(tenant_id.to_string()))?;

    let scope = VisibilityScope::anonymous(tenant_id);
    let started = Instant::now();
    let budget = Duration::from_millis(state.config.detection_budget_ms);

    let embedded = state.storage.eligible_embedded(&scope).await?;
    let node_count = embedded.len();

    if node_count < MIN_TENANT_ARTIFACTS {
        tracing::info!(
            tenant = tenant_id,
            artifacts = node_count,
            "Skipping detection: too few artifacts"
        );
        return Ok(DetectionReport::skipped(
            tenant_id,
            SkipReason::TooFewArtifacts,
            node_count,
        ));
    }

    if node_count * KNN_K > state.config.max_edges {
        return Err(AppError::BudgetExceeded(format!(
            "{} artifacts x K={} exceeds the {}-edge budget for tenant {}",
            node_count, KNN_K, state.config.max_edges, tenant_id
        )));
    }

    let mut scans = Vec::with_capacity(node_count);
    for (id, vector) in &embedded {
        if started.elapsed() > budget {
            return Err(AppError::BudgetExceeded(format!(
                "KNN extraction for tenant {} past {}ms",
                tenant_id, state.config.detection_budget_ms
            )));
        }
        let neighbors = state
            .storage
            .query_knn(vector, KNN_K, &scope, Some(id))
            .await?;
        scans.push((id.clone(), neighbors));
    }

    let edges = collect_edges(scans);
    if edges.is_empty() {
        tracing::info!(tenant = tenant_id, "Skipping detection: no edges above threshold");
        return Ok(DetectionReport::skipped(
            tenant_id,
            SkipReason::NoEdgesAboveThreshold,
            node_count,
        ));
    }

    let order = graph_order(&edges);
    if order < MIN_GRAPH_ORDER {
        tracing::info!(
            tenant = tenant_id,
            nodes = order,
            "Skipping detection: graph too small for partitioning"
        );
        return Ok(DetectionReport::skipped(
            tenant_id,
            SkipReason::GraphTooSmall,
            order,
        ));
    }

    if started.elapsed() > budget {
        return Err(AppError::BudgetExceeded(format!(
            "detection for tenant {} past {}ms before partitioning",
            tenant_id, state.config.detection_budget_ms
        )));
    }

    let mut graph: UnGraph<String, f32> = UnGraph::new_undirected();
    let mut node_map: HashMap<&str, NodeIndex> = HashMap::new();
    for (a, b) in edges.keys() {
        for id in [a.as_str(), b.as_str()] {
            if !node_map.contains_key(id) {
                let idx = graph.add_node(id.to_string());
                node_map.insert(id, idx);
            }
        }
    }
    for ((a, b), similarity) in &edges {
        graph.add_edge(node_map[a.as_str()], node_map[b.as_str()], *similarity);
    }

    let resolution = resolution.unwrap_or(state.config.resolution);
    let partition = louvain(&graph, resolution);
    let community_count = partition.community_count();

    if community_count <= 1 || partition.modularity < LOW_MODULARITY {
        tracing::warn!(
            tenant = tenant_id,
            communities = community_count,
            modularity = partition.modularity,
            "Low-quality partition, persisting anyway"
        );
    }

    let run_id = generate_id();
    let detected_at = Utc::now();
    let rows: Vec<CommunityAssignment> = graph
        .node_indices()
        .map(|idx| CommunityAssignment {
            tenant_id: tenant_id.to_string(),
            artifact_id: graph[idx].clone(),
            community_id: partition.communities[idx.index()],
            modularity: partition.modularity,
            detected_at,
            run_id: Some(run_id.clone()),
        })
        .collect();

    state.storage.replace_assignments(tenant_id, rows).await?;

    tracing::info!(
        tenant = tenant_id,
        communities = community_count,
        modularity = partition.modularity,
        nodes = graph.node_count(),
        edges = edges.len(),
        run = %run_id,
        "Community detection persisted"
    );

    Ok(DetectionReport {
        tenant_id: tenant_id.to_string(),
        community_count,
        modularity: partition.modularity,
        node_count: graph.node_count(),
        edge_count: edges.len(),
        skipped: None,
        run_id: Some(run_id),
    })
}
