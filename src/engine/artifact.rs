//! Ingestion operations
//!
//! Entry points for the collaborators that own the data: the
//! content-management system (artifact read model), the embedding pipeline
//! (vectors), and the usage recorder. The engine validates and stores; it
//! never originates any of this data.

use chrono::Utc;

use crate::config::AppState;
use crate::storage::StorageBackend;
use crate::types::{AppError, Artifact, Embedding, UsageEvent};
use crate::Result;

pub async fn sync_artifact(state: &AppState, artifact: Artifact) -> Result<String> {
    if artifact.id.is_empty() || artifact.tenant_id.is_empty() {
        return Err(AppError::InvalidInput(
            "artifact id and tenant id are required".to_string(),
        ));
    }
    state.storage.sync_artifact(artifact).await
}

pub async fn delete_artifact(state: &AppState, id: &str) -> Result<bool> {
    state.storage.delete_artifact(id).await
}

pub async fn upsert_embedding(
    state: &AppState,
    artifact_id: &str,
    vector: Vec<f32>,
    model_name: String,
    model_version: String,
    input_hash: String,
) -> Result<()> {
    if vector.len() != state.config.dimension {
        return Err(AppError::DimensionMismatch {
            expected: state.config.dimension,
            actual: vector.len(),
        });
    }

    let embedding = Embedding::new(vector, model_name, model_version, input_hash);
    state.storage.upsert_embedding(artifact_id, embedding).await
}

/// Record a usage event. The tenant comes from the artifact row, so a usage
/// event can never be filed against a tenant the artifact doesn't belong to.
pub async fn record_usage(state: &AppState, artifact_id: &str, principal_id: &str) -> Result<()> {
    let artifact = state
        .storage
        .get_artifact(artifact_id)
        .await?
        .ok_or_else(|| AppError::ArtifactNotFound(artifact_id.to_string()))?;

    state
        .storage
        .record_usage(UsageEvent {
            artifact_id: artifact_id.to_string(),
            principal_id: principal_id.to_string(),
            tenant_id: artifact.tenant_id,
            recorded_at: Utc::now(),
        })
        .await
}
