//! Topology export
//!
//! Full-tenant snapshot for visualization: every eligible artifact (assigned
//! to a community or not), edges recomputed live from the current embedding
//! space, and per-principal relationship flags. Stale persisted partitions
//! therefore never hide fresh similarity structure.

use std::collections::{HashMap, HashSet};

use crate::config::AppState;
use crate::graph::{collect_edges, KNN_K};
use crate::storage::StorageBackend;
use crate::types::{
    CommunityAssignment, CommunitySummary, TenantTopology, TopologyEdge, TopologyNode,
    TopologyStats,
};
use crate::visibility::VisibilityScope;
use crate::Result;

fn community_label(community_id: u32) -> String {
    format!("Community {}", community_id + 1)
}

pub async fn get_topology(
    state: &AppState,
    tenant_id: &str,
    principal_id: Option<String>,
) -> Result<TenantTopology> {
    let scope = VisibilityScope::for_principal(tenant_id, principal_id.clone());

    let artifacts = state.storage.eligible_artifacts(&scope).await?;
    let assignments = state.storage.get_assignments(tenant_id).await?;
    let used: HashSet<String> = match &principal_id {
        Some(principal) => state.storage.used_artifact_ids(tenant_id, principal).await?,
        None => HashSet::new(),
    };

    // edges come from a live KNN pass, not from persisted state
    let embedded = state.storage.eligible_embedded(&scope).await?;
    let mut scans = Vec::with_capacity(embedded.len());
    for (id, vector) in &embedded {
        let neighbors = state
            .storage
            .query_knn(vector, KNN_K, &scope, Some(id))
            .await?;
        scans.push((id.clone(), neighbors));
    }
    let edge_map = collect_edges(scans);

    let assignment_by_artifact: HashMap<&str, &CommunityAssignment> = assignments
        .iter()
        .map(|a| (a.artifact_id.as_str(), a))
        .collect();

    let nodes: Vec<TopologyNode> = artifacts
        .iter()
        .map(|artifact| {
            let assignment = assignment_by_artifact.get(artifact.id.as_str());
            let community_id = assignment.map(|a| a.community_id);
            TopologyNode {
                id: artifact.id.clone(),
                name: artifact.name.clone(),
                summary: artifact.summary.clone(),
                visibility: artifact.visibility,
                community_id,
                community_label: community_id.map(community_label),
                authored: principal_id.as_deref() == Some(artifact.author_id.as_str()),
                used: used.contains(&artifact.id),
                usage_count: artifact.usage_count,
                rating_avg: artifact.rating_avg,
            }
        })
        .collect();

    let edges: Vec<TopologyEdge> = edge_map
        .iter()
        .map(|((source, target), similarity)| TopologyEdge {
            source: source.clone(),
            target: target.clone(),
            similarity: *similarity,
        })
        .collect();

    // summaries are derived from the node list, not from storage
    let mut member_counts: HashMap<u32, usize> = HashMap::new();
    for node in &nodes {
        if let Some(community_id) = node.community_id {
            *member_counts.entry(community_id).or_insert(0) += 1;
        }
    }
    let mut communities: Vec<CommunitySummary> = member_counts
        .into_iter()
        .map(|(community_id, member_count)| CommunitySummary {
            community_id,
            label: community_label(community_id),
            member_count,
        })
        .collect();
    communities.sort_by(|a, b| {
        b.member_count
            .cmp(&a.member_count)
            .then(a.community_id.cmp(&b.community_id))
    });

    let assigned_count = nodes.iter().filter(|n| n.community_id.is_some()).count();
    let stats = TopologyStats {
        node_count: nodes.len(),
        edge_count: edges.len(),
        community_count: communities.len(),
        assigned_count,
        detected_at: assignments.iter().map(|a| a.detected_at).max(),
    };

    Ok(TenantTopology {
        nodes,
        edges,
        communities,
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::community::detect_communities;
    use crate::test_utils::{axis_vector, cluster_vector, TestContext};
    use crate::types::{Artifact, UsageEvent, Visibility};

    #[tokio::test]
    async fn test_nodes_without_assignment_left_joined() {
        let ctx = TestContext::new().await;
        for cluster in 0..2 {
            for member in 0..6 {
                let id = format!("c{}-{}", cluster, member);
                ctx.seed_embedded("t1", &id, cluster_vector(cluster, member)).await;
            }
        }
        detect_communities(&ctx.state, "t1", None).await.unwrap();

        // arrives after detection: visible node, no community yet
        ctx.seed_embedded("t1", "latecomer", cluster_vector(0, 7)).await;

        let topology = get_topology(&ctx.state, "t1", None).await.unwrap();
        assert_eq!(topology.stats.node_count, 13);
        assert_eq!(topology.stats.assigned_count, 12);

        let late = topology.nodes.iter().find(|n| n.id == "latecomer").unwrap();
        assert!(late.community_id.is_none());
        assert!(late.community_label.is_none());
        // edges are recomputed live, so the latecomer is already connected
        assert!(topology
            .edges
            .iter()
            .any(|e| e.source == "latecomer" || e.target == "latecomer"));
    }

    #[tokio::test]
    async fn test_community_summaries_sorted_by_size() {
        let ctx = TestContext::new().await;
        for member in 0..8 {
            ctx.seed_embedded("t1", &format!("big-{}", member), cluster_vector(0, member)).await;
        }
        for member in 0..4 {
            ctx.seed_embedded("t1", &format!("small-{}", member), cluster_vector(1, member)).await;
        }
        detect_communities(&ctx.state, "t1", None).await.unwrap();

        let topology = get_topology(&ctx.state, "t1", None).await.unwrap();
        assert_eq!(topology.communities.len(), 2);
        assert_eq!(topology.communities[0].member_count, 8);
        assert_eq!(topology.communities[1].member_count, 4);
        assert!(topology.communities[0]
            .label
            .starts_with("Community "));
    }

    #[tokio::test]
    async fn test_principal_flags() {
        let ctx = TestContext::new().await;
        ctx.seed_artifact(
            Artifact::new(
                "mine".to_string(),
                "t1".to_string(),
                "Mine".to_string(),
                "u1".to_string(),
            ),
        )
        .await;
        ctx.seed_artifact(
            Artifact::new(
                "theirs".to_string(),
                "t1".to_string(),
                "Theirs".to_string(),
                "u2".to_string(),
            ),
        )
        .await;
        ctx.state
            .storage
            .record_usage(UsageEvent {
                artifact_id: "theirs".to_string(),
                principal_id: "u1".to_string(),
                tenant_id: "t1".to_string(),
                recorded_at: chrono::Utc::now(),
            })
            .await
            .unwrap();

        let topology = get_topology(&ctx.state, "t1", Some("u1".to_string()))
            .await
            .unwrap();
        let mine = topology.nodes.iter().find(|n| n.id == "mine").unwrap();
        let theirs = topology.nodes.iter().find(|n| n.id == "theirs").unwrap();
        assert!(mine.authored && !mine.used);
        assert!(!theirs.authored && theirs.used);

        // anonymous view carries no principal flags
        let anon = get_topology(&ctx.state, "t1", None).await.unwrap();
        assert!(anon.nodes.iter().all(|n| !n.authored && !n.used));
    }

    #[tokio::test]
    async fn test_visibility_isolation_in_topology() {
        let ctx = TestContext::new().await;
        ctx.seed_embedded("t1", "shared", axis_vector(0)).await;
        ctx.seed_embedded_private("t1", "secret", "u1", axis_vector(0)).await;

        let anon = get_topology(&ctx.state, "t1", None).await.unwrap();
        assert!(anon.nodes.iter().all(|n| n.id != "secret"));
        assert!(anon
            .edges
            .iter()
            .all(|e| e.source != "secret" && e.target != "secret"));

        // the author sees their own private node and its live edges
        let author = get_topology(&ctx.state, "t1", Some("u1".to_string()))
            .await
            .unwrap();
        assert!(author.nodes.iter().any(|n| n.id == "secret"));
        assert!(author
            .edges
            .iter()
            .any(|e| e.source == "secret" || e.target == "secret"));

        // another principal sees neither
        let other = get_topology(&ctx.state, "t1", Some("u2".to_string()))
            .await
            .unwrap();
        assert!(other.nodes.iter().all(|n| n.id != "secret"));
        assert!(other
            .edges
            .iter()
            .all(|e| e.source != "secret" && e.target != "secret"));
    }

    #[tokio::test]
    async fn test_empty_tenant_topology() {
        let ctx = TestContext::new().await;
        let topology = get_topology(&ctx.state, "empty", None).await.unwrap();
        assert!(topology.nodes.is_empty());
        assert!(topology.edges.is_empty());
        assert!(topology.communities.is_empty());
        assert_eq!(topology.stats.node_count, 0);
        assert!(topology.stats.detected_at.is_none());
    }

    #[tokio::test]
    async fn test_drafts_excluded() {
        let ctx = TestContext::new().await;
        ctx.seed_artifact(
            Artifact::new(
                "draft".to_string(),
                "t1".to_string(),
                "Draft".to_string(),
                "u1".to_string(),
            )
            .with_status(crate::types::ArtifactStatus::Draft),
        )
        .await;
        ctx.seed_artifact(
            Artifact::new(
                "live".to_string(),
                "t1".to_string(),
                "Live".to_string(),
                "u1".to_string(),
            )
            .with_visibility(Visibility::Tenant),
        )
        .await;

        let topology = get_topology(&ctx.state, "t1", Some("u1".to_string()))
            .await
            .unwrap();
        let ids: Vec<&str> = topology.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["live"]);
    }
}
