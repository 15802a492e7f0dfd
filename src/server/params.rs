use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SyncArtifactParams {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// One of: global_approved, tenant, personal, private (default: tenant)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<String>,
    /// One of: draft, published (default: published)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    pub author_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating_avg: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DeleteArtifactParams {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UpsertEmbeddingParams {
    pub artifact_id: String,
    pub vector: Vec<f32>,
    pub model_name: String,
    pub model_version: String,
    /// SHA-256 (hex) of the text that was embedded
    pub input_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RecordUsageParams {
    pub artifact_id: String,
    pub principal_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DetectCommunitiesParams {
    pub tenant_id: String,
    /// Louvain resolution override; higher values produce more, smaller
    /// communities
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GetTopologyParams {
    pub tenant_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SearchParams {
    pub tenant_id: String,
    pub query: String,
    /// Precomputed query embedding; omit for lexical-only search
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_embedding: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GetStatusParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
}
