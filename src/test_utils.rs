use std::sync::Arc;
use tempfile::TempDir;

use crate::config::{AppConfig, AppState, DetectionLocks};
use crate::storage::{StorageBackend, SurrealStorage};
use crate::types::{Artifact, Embedding, Visibility};

/// Small dimensionality keeps the test index cheap while leaving room for
/// the synthetic cluster vectors below.
pub const TEST_DIM: usize = 32;

pub struct TestContext {
    pub state: Arc<AppState>,
    pub _temp_dir: TempDir, // Kept to ensure directory lives as long as context
}

impl TestContext {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    pub async fn with_config(adjust: impl FnOnce(&mut AppConfig)) -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");

        let mut config = AppConfig {
            data_dir: temp_dir.path().to_path_buf(),
            dimension: TEST_DIM,
            log_level: "debug".to_string(),
            ..AppConfig::default()
        };
        adjust(&mut config);

        let storage = Arc::new(
            SurrealStorage::new(temp_dir.path(), config.dimension)
                .await
                .expect("Failed to init storage"),
        );

        let state = Arc::new(AppState {
            config,
            storage,
            detection_locks: DetectionLocks::new(),
        });

        Self {
            state,
            _temp_dir: temp_dir,
        }
    }

    pub async fn seed_artifact(&self, artifact: Artifact) {
        self.state
            .storage
            .sync_artifact(artifact)
            .await
            .expect("Failed to seed artifact");
    }

    /// Published, tenant-visible artifact with an embedding.
    pub async fn seed_embedded(&self, tenant: &str, id: &str, vector: Vec<f32>) {
        self.seed_embedded_named(tenant, id, id, vector).await;
    }

    pub async fn seed_embedded_named(&self, tenant: &str, id: &str, name: &str, vector: Vec<f32>) {
        self.seed_artifact(Artifact::new(
            id.to_string(),
            tenant.to_string(),
            name.to_string(),
            "seed-author".to_string(),
        ))
        .await;
        self.put_embedding(id, vector).await;
    }

    pub async fn seed_embedded_private(
        &self,
        tenant: &str,
        id: &str,
        author: &str,
        vector: Vec<f32>,
    ) {
        self.seed_artifact(
            Artifact::new(
                id.to_string(),
                tenant.to_string(),
                id.to_string(),
                author.to_string(),
            )
            .with_visibility(Visibility::Private),
        )
        .await;
        self.put_embedding(id, vector).await;
    }

    async fn put_embedding(&self, id: &str, vector: Vec<f32>) {
        self.state
            .storage
            .upsert_embedding(
                id,
                Embedding::new(
                    vector,
                    "test-model".to_string(),
                    "1".to_string(),
                    format!("hash-{}", id),
                ),
            )
            .await
            .expect("Failed to seed embedding");
    }
}

/// Unit vector along one axis; pairwise-orthogonal across distinct axes.
pub fn axis_vector(axis: usize) -> Vec<f32> {
    let mut v = vec![0.0; TEST_DIM];
    v[axis % TEST_DIM] = 1.0;
    v
}

/// Synthetic cluster member: a shared cluster axis plus a small
/// member-specific component. Intra-cluster cosine similarity lands around
/// 0.9, inter-cluster at 0.
pub fn cluster_vector(cluster: usize, member: usize) -> Vec<f32> {
    let mut v = vec![0.0; TEST_DIM];
    v[cluster % 2] = 1.0;
    v[2 + (cluster % 2) * 14 + (member % 14)] = 0.3;
    v
}
