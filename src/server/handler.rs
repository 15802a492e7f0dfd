use std::sync::Arc;

use rmcp::{
    handler::server::{
        tool::ToolCallContext, tool::ToolRouter, wrapper::Parameters, ServerHandler,
    },
    model::*,
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

use crate::config::AppState;
use crate::engine::{self, error_response, success_json, success_serialize};
use crate::server::params::*;
use crate::types::{Artifact, ArtifactStatus, Visibility};

#[derive(Clone)]
pub struct SkillGraphServer {
    state: Arc<AppState>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl SkillGraphServer {
    pub fn new(state: Arc<AppState>) -> Self {
        Self {
            state,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(description = "Upsert a skill artifact read-model row. Returns the artifact id.")]
    async fn sync_artifact(
        &self,
        params: Parameters<SyncArtifactParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let p = params.0;

        let visibility: Visibility = match p.visibility.as_deref() {
            Some(s) => match s.parse() {
                Ok(v) => v,
                Err(e) => return Ok(error_response(e)),
            },
            None => Visibility::Tenant,
        };
        let status: ArtifactStatus = match p.status.as_deref() {
            Some(s) => match s.parse() {
                Ok(v) => v,
                Err(e) => return Ok(error_response(e)),
            },
            None => ArtifactStatus::Published,
        };

        let mut artifact = Artifact::new(p.id, p.tenant_id, p.name, p.author_id)
            .with_visibility(visibility)
            .with_status(status);
        artifact.summary = p.summary.unwrap_or_default();
        artifact.usage_count = p.usage_count.unwrap_or(0);
        artifact.rating_avg = p.rating_avg.unwrap_or(0.0);

        match engine::artifact::sync_artifact(&self.state, artifact).await {
            Ok(id) => Ok(success_json(serde_json::json!({ "id": id }))),
            Err(e) => Ok(error_response(e)),
        }
    }

    #[tool(description = "Delete a skill artifact; its embedding, community assignment and usage events cascade.")]
    async fn delete_artifact(
        &self,
        params: Parameters<DeleteArtifactParams>,
    ) -> Result<CallToolResult, ErrorData> {
        match engine::artifact::delete_artifact(&self.state, &params.0.id).await {
            Ok(deleted) => Ok(success_json(serde_json::json!({ "deleted": deleted }))),
            Err(e) => Ok(error_response(e)),
        }
    }

    #[tool(description = "Store or replace an artifact's embedding vector, produced by the external embedding pipeline.")]
    async fn upsert_embedding(
        &self,
        params: Parameters<UpsertEmbeddingParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let p = params.0;
        match engine::artifact::upsert_embedding(
            &self.state,
            &p.artifact_id,
            p.vector,
            p.model_name,
            p.model_version,
            p.input_hash,
        )
        .await
        {
            Ok(()) => Ok(success_json(serde_json::json!({ "ok": true }))),
            Err(e) => Ok(error_response(e)),
        }
    }

    #[tool(description = "Record that a principal used an artifact (idempotent).")]
    async fn record_usage(
        &self,
        params: Parameters<RecordUsageParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let p = params.0;
        match engine::artifact::record_usage(&self.state, &p.artifact_id, &p.principal_id).await {
            Ok(()) => Ok(success_json(serde_json::json!({ "ok": true }))),
            Err(e) => Ok(error_response(e)),
        }
    }

    #[tool(description = "Run community detection for a tenant: KNN similarity graph, Louvain partitioning, atomic persistence. Returns counts, modularity, and a skip reason when there is too little data.")]
    async fn detect_communities(
        &self,
        params: Parameters<DetectCommunitiesParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let p = params.0;
        match engine::community::detect_communities(&self.state, &p.tenant_id, p.resolution).await
        {
            Ok(report) => Ok(success_serialize(&report)),
            Err(e) => Ok(error_response(e)),
        }
    }

    #[tool(description = "Export the tenant's similarity topology: nodes with community assignments and principal-relative flags, live-computed edges, and community summaries.")]
    async fn get_topology(
        &self,
        params: Parameters<GetTopologyParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let p = params.0;
        match engine::topology::get_topology(&self.state, &p.tenant_id, p.principal_id).await {
            Ok(topology) => Ok(success_serialize(&topology)),
            Err(e) => Ok(error_response(e)),
        }
    }

    #[tool(description = "Hybrid search over skill artifacts: lexical and semantic rankings fused with Reciprocal Rank Fusion. Falls back to lexical-only when no query embedding is supplied.")]
    async fn search(
        &self,
        params: Parameters<SearchParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let p = params.0;
        match engine::search::search(
            &self.state,
            &p.tenant_id,
            &p.query,
            p.query_embedding,
            p.principal_id,
            p.limit,
        )
        .await
        {
            Ok(hits) => {
                let count = hits.len();
                Ok(success_json(serde_json::json!({
                    "results": hits,
                    "count": count,
                    "query": p.query,
                })))
            }
            Err(e) => Ok(error_response(e)),
        }
    }

    #[tool(description = "Storage health plus optional per-tenant corpus counts.")]
    async fn get_status(
        &self,
        params: Parameters<GetStatusParams>,
    ) -> Result<CallToolResult, ErrorData> {
        match engine::system::get_status(&self.state, params.0.tenant_id).await {
            Ok(status) => Ok(success_serialize(&status)),
            Err(e) => Ok(error_response(e)),
        }
    }
}

impl ServerHandler for SkillGraphServer {
    fn get_info(&self) -> InitializeResult {
        InitializeResult {
            protocol_version: ProtocolVersion::default(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: Some(false),
                }),
                ..ServerCapabilities::default()
            },
            server_info: Implementation {
                name: "skillgraph-mcp".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Semantic relationship engine for skill catalogs: embeddings, similarity topology, community detection, and hybrid search."
                    .into(),
            ),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        Ok(ListToolsResult::with_all_items(self.tool_router.list_all()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        let tool_context = ToolCallContext::new(self, request, context);
        self.tool_router.call(tool_context).await
    }
}
