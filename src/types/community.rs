use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row per (tenant, artifact), replaced wholesale on every detection run.
/// Only the community detector writes this table; the topology exporter reads
/// it. No incremental mutation path exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommunityAssignment {
    pub tenant_id: String,
    pub artifact_id: String,
    pub community_id: u32,
    /// Global modularity of the partition this row belongs to.
    pub modularity: f32,
    pub detected_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
}

/// Why a detection run stopped before partitioning. A skip is an expected
/// outcome, not a failure: callers can tell "nothing to compute yet" apart
/// from an error.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SkipReason {
    #[serde(rename = "too few artifacts")]
    TooFewArtifacts,
    #[serde(rename = "no edges above threshold")]
    NoEdgesAboveThreshold,
    #[serde(rename = "graph too small for partitioning")]
    GraphTooSmall,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SkipReason::TooFewArtifacts => "too few artifacts",
            SkipReason::NoEdgesAboveThreshold => "no edges above threshold",
            SkipReason::GraphTooSmall => "graph too small for partitioning",
        };
        f.write_str(s)
    }
}

/// Outcome of a detection run, skipped or completed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionReport {
    pub tenant_id: String,
    pub community_count: usize,
    pub modularity: f32,
    pub node_count: usize,
    pub edge_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<SkipReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
}

impl DetectionReport {
    pub fn skipped(tenant_id: &str, reason: SkipReason, node_count: usize) -> Self {
        Self {
            tenant_id: tenant_id.to_string(),
            community_count: 0,
            modularity: 0.0,
            node_count,
            edge_count: 0,
            skipped: Some(reason),
            run_id: None,
        }
    }
}
