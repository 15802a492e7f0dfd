use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::artifact::Visibility;

/// One artifact in the exported tenant graph. `community_id` is null until a
/// detection run has assigned the artifact; `authored`/`used` are relative to
/// the requesting principal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopologyNode {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub summary: String,
    pub visibility: Visibility,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub community_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub community_label: Option<String>,
    pub authored: bool,
    pub used: bool,
    pub usage_count: u64,
    pub rating_avg: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopologyEdge {
    pub source: String,
    pub target: String,
    pub similarity: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommunitySummary {
    pub community_id: u32,
    pub label: String,
    pub member_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopologyStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub community_count: usize,
    /// Nodes carrying a persisted community assignment. Edges are always
    /// recomputed live, so this lagging behind node_count means detection is
    /// stale, not that the view is wrong.
    pub assigned_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detected_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantTopology {
    pub nodes: Vec<TopologyNode>,
    pub edges: Vec<TopologyEdge>,
    pub communities: Vec<CommunitySummary>,
    pub stats: TopologyStats,
}
