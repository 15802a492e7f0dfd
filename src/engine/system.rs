//! System surface: health and per-tenant corpus counts.

use serde::{Deserialize, Serialize};

use crate::config::AppState;
use crate::storage::StorageBackend;
use crate::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReport {
    pub healthy: bool,
    pub dimension: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_count: Option<usize>,
}

pub async fn get_status(state: &AppState, tenant_id: Option<String>) -> Result<StatusReport> {
    let healthy = state.storage.health_check().await.unwrap_or(false);

    let (artifact_count, assigned_count) = match &tenant_id {
        Some(tenant) => {
            let artifacts = state.storage.count_artifacts(tenant).await?;
            let assignments = state.storage.get_assignments(tenant).await?;
            (Some(artifacts), Some(assignments.len()))
        }
        None => (None, None),
    };

    Ok(StatusReport {
        healthy,
        dimension: state.config.dimension,
        tenant_id,
        artifact_count,
        assigned_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestContext;
    use crate::types::Artifact;

    #[tokio::test]
    async fn test_status_with_tenant_counts() {
        let ctx = TestContext::new().await;
        ctx.seed_artifact(Artifact::new(
            "s1".to_string(),
            "t1".to_string(),
            "One".to_string(),
            "u1".to_string(),
        ))
        .await;

        let status = get_status(&ctx.state, Some("t1".to_string())).await.unwrap();
        assert!(status.healthy);
        assert_eq!(status.artifact_count, Some(1));
        assert_eq!(status.assigned_count, Some(0));

        let global = get_status(&ctx.state, None).await.unwrap();
        assert!(global.healthy);
        assert!(global.artifact_count.is_none());
    }
}
