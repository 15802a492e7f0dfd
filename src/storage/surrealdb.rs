use std::collections::HashSet;
use std::path::Path;

use async_trait::async_trait;
use surrealdb::engine::local::{Db, SurrealKv};
use surrealdb::Surreal;

use super::StorageBackend;
use crate::types::{
    Artifact, Candidate, CommunityAssignment, Embedding, EmbeddingMeta, SurrealValue, UsageEvent,
};
use crate::visibility::{VisibilityScope, TENANT_CLAUSE, TENANT_REACH_CLAUSE, VISIBILITY_CLAUSE};
use crate::Result;

/// Projection used wherever a full artifact row is read: the record id stays
/// server-side, `artifact_id` doubles as the engine-facing id.
const ARTIFACT_FIELDS: &str = "artifact_id AS id, tenant_id, name, summary, visibility, \
     status, author_id, usage_count, rating_avg, updated_at";

pub struct SurrealStorage {
    db: Surreal<Db>,
}

impl SurrealStorage {
    pub async fn new(data_dir: &Path, dimension: usize) -> Result<Self> {
        let db_path = data_dir.join("db");
        std::fs::create_dir_all(&db_path)?;

        let db: Surreal<Db> = Surreal::new::<SurrealKv>(db_path).await?;
        db.use_ns("skillgraph").use_db("main").await?;

        let schema = include_str!("schema.surql").replace("{dim}", &dimension.to_string());
        db.query(&schema).await?;

        Ok(Self { db })
    }

    /// Compare the configured dimensionality against the live vector index.
    /// On mismatch the index is rebuilt and stored vectors cleared; they stay
    /// stale until the ingestion pipeline re-embeds.
    pub async fn check_dimension(&self, expected: usize) -> Result<()> {
        let mut response = self.db.query("INFO FOR TABLE artifacts").await?;
        let result: Option<serde_json::Value> = response.take(0)?;

        if let Some(info) = result {
            if let Some(indexes) = info.get("indexes").and_then(|i| i.as_object()) {
                if let Some(idx_def) = indexes.get("idx_artifacts_vec").and_then(|v| v.as_str()) {
                    if let Some(dim) = extract_dimension(idx_def) {
                        if dim != expected {
                            tracing::warn!(
                                old = dim,
                                new = expected,
                                "Dimension mismatch detected, rebuilding vector index"
                            );
                            self.rebuild_vector_index(expected).await?;
                            self.db
                                .query("UPDATE artifacts SET embedding = NONE, embedding_meta = NONE")
                                .await?;
                            tracing::info!("Index rebuilt, stored embeddings cleared");
                            return Ok(());
                        }
                        tracing::info!(configured = expected, db = dim, "Dimension check passed");
                        return Ok(());
                    }
                }
            }
        }

        Ok(())
    }

    async fn rebuild_vector_index(&self, dim: usize) -> Result<()> {
        let queries = format!(
            "REMOVE INDEX IF EXISTS idx_artifacts_vec ON artifacts;
             DEFINE INDEX idx_artifacts_vec ON artifacts FIELDS embedding HNSW DIMENSION {d} DIST COSINE;",
            d = dim
        );
        self.db.query(&queries).await?;
        Ok(())
    }
}

fn extract_dimension(def: &str) -> Option<usize> {
    def.split("DIMENSION ")
        .nth(1)?
        .split_whitespace()
        .next()?
        .parse()
        .ok()
}

#[async_trait]
impl StorageBackend for SurrealStorage {
    async fn sync_artifact(&self, artifact: Artifact) -> Result<String> {
        let sql = r#"
            UPSERT type::thing('artifacts', $id) SET
                artifact_id = $id,
                tenant_id = $tenant_id,
                name = $name,
                summary = $summary,
                visibility = $visibility,
                status = $status,
                author_id = $author_id,
                usage_count = $usage_count,
                rating_avg = $rating_avg,
                updated_at = $updated_at
            RETURN NONE
        "#;
        self.db
            .query(sql)
            .bind(("id", artifact.id.clone()))
            .bind(("tenant_id", artifact.tenant_id))
            .bind(("name", artifact.name))
            .bind(("summary", artifact.summary))
            .bind(("visibility", artifact.visibility.to_string()))
            .bind(("status", artifact.status.to_string()))
            .bind(("author_id", artifact.author_id))
            .bind(("usage_count", artifact.usage_count as i64))
            .bind(("rating_avg", artifact.rating_avg as f64))
            .bind(("updated_at", artifact.updated_at.to_rfc3339()))
            .await?;
        Ok(artifact.id)
    }

    async fn get_artifact(&self, id: &str) -> Result<Option<Artifact>> {
        let sql = format!(
            "SELECT {} FROM type::thing('artifacts', $id)",
            ARTIFACT_FIELDS
        );
        let mut response = self.db.query(&sql).bind(("id", id.to_string())).await?;
        let artifacts: Vec<Artifact> = response.take(0)?;
        Ok(artifacts.into_iter().next())
    }

    async fn delete_artifact(&self, id: &str) -> Result<bool> {
        let existing = self.get_artifact(id).await?;
        if existing.is_none() {
            return Ok(false);
        }

        // assignment and usage rows cascade with the artifact
        let sql = r#"
            DELETE type::thing('artifacts', $id);
            DELETE community_assignments WHERE artifact_id = $id;
            DELETE usage_events WHERE artifact_id = $id;
        "#;
        self.db.query(sql).bind(("id", id.to_string())).await?;
        Ok(true)
    }

    async fn count_artifacts(&self, tenant_id: &str) -> Result<usize> {
        let sql = "SELECT count() FROM artifacts WHERE tenant_id = $tenant GROUP ALL";
        let mut response = self
            .db
            .query(sql)
            .bind(("tenant", tenant_id.to_string()))
            .await?;

        #[derive(serde::Deserialize, SurrealValue)]
        struct CountResult {
            count: u64,
        }

        let result: Option<CountResult> = response.take(0)?;
        Ok(result.map(|r| r.count as usize).unwrap_or(0))
    }

    async fn upsert_embedding(&self, artifact_id: &str, embedding: Embedding) -> Result<()> {
        if self.get_artifact(artifact_id).await?.is_none() {
            return Err(crate::AppError::ArtifactNotFound(artifact_id.to_string()));
        }

        // replacement keeps the original created_at; everything else is overwritten
        let created_at = match self.get_embedding(artifact_id).await? {
            Some(prior) => prior.created_at,
            None => embedding.created_at,
        };

        let meta = serde_json::json!({
            "model_name": embedding.model_name,
            "model_version": embedding.model_version,
            "input_hash": embedding.input_hash,
            "created_at": created_at.to_rfc3339(),
            "updated_at": embedding.updated_at.to_rfc3339(),
        });

        let sql = r#"
            UPDATE type::thing('artifacts', $id) SET
                embedding = $vector,
                embedding_meta = $meta
            RETURN NONE
        "#;
        self.db
            .query(sql)
            .bind(("id", artifact_id.to_string()))
            .bind(("vector", embedding.vector))
            .bind(("meta", meta))
            .await?;
        Ok(())
    }

    async fn get_embedding(&self, artifact_id: &str) -> Result<Option<Embedding>> {
        #[derive(serde::Deserialize)]
        struct EmbeddingRow {
            embedding: Option<Vec<f32>>,
            embedding_meta: Option<EmbeddingMeta>,
        }

        let sql = "SELECT embedding, embedding_meta FROM type::thing('artifacts', $id)";
        let mut response = self
            .db
            .query(sql)
            .bind(("id", artifact_id.to_string()))
            .await?;
        let rows: Vec<EmbeddingRow> = response.take(0)?;

        Ok(rows.into_iter().next().and_then(|row| {
            match (row.embedding, row.embedding_meta) {
                (Some(vector), Some(meta)) => Some(Embedding::from_parts(vector, meta)),
                _ => None,
            }
        }))
    }

    async fn eligible_artifacts(&self, scope: &VisibilityScope) -> Result<Vec<Artifact>> {
        let sql = format!(
            "SELECT {fields} FROM artifacts \
             WHERE {tenant} AND status = 'published' AND {vis} \
             ORDER BY name ASC",
            fields = ARTIFACT_FIELDS,
            tenant = TENANT_CLAUSE,
            vis = VISIBILITY_CLAUSE,
        );
        let mut response = self
            .db
            .query(&sql)
            .bind(("tenant", scope.tenant_id.clone()))
            .bind(("principal", scope.principal_id.clone()))
            .await?;
        let artifacts: Vec<Artifact> = response.take(0)?;
        Ok(artifacts)
    }

    async fn eligible_embedded(
        &self,
        scope: &VisibilityScope,
    ) -> Result<Vec<(String, Vec<f32>)>> {
        #[derive(serde::Deserialize)]
        struct EmbeddedRow {
            id: String,
            embedding: Vec<f32>,
        }

        let sql = format!(
            "SELECT artifact_id AS id, embedding FROM artifacts \
             WHERE embedding IS NOT NONE AND {tenant} AND status = 'published' AND {vis}",
            tenant = TENANT_CLAUSE,
            vis = VISIBILITY_CLAUSE,
        );
        let mut response = self
            .db
            .query(&sql)
            .bind(("tenant", scope.tenant_id.clone()))
            .bind(("principal", scope.principal_id.clone()))
            .await?;
        let rows: Vec<EmbeddedRow> = response.take(0)?;
        Ok(rows.into_iter().map(|r| (r.id, r.embedding)).collect())
    }

    async fn query_knn(
        &self,
        vector: &[f32],
        k: usize,
        scope: &VisibilityScope,
        exclude_id: Option<&str>,
    ) -> Result<Vec<(String, f32)>> {
        #[derive(serde::Deserialize)]
        struct Neighbor {
            id: String,
            score: f32,
        }

        let sql = format!(
            "SELECT artifact_id AS id, vector::similarity::cosine(embedding, $vec) AS score \
             FROM artifacts \
             WHERE embedding IS NOT NONE AND {tenant} AND status = 'published' AND {vis} \
               AND ($exclude IS NONE OR artifact_id != $exclude) \
             ORDER BY score DESC \
             LIMIT $limit",
            tenant = TENANT_CLAUSE,
            vis = VISIBILITY_CLAUSE,
        );
        let mut response = self
            .db
            .query(&sql)
            .bind(("vec", vector.to_vec()))
            .bind(("tenant", scope.tenant_id.clone()))
            .bind(("principal", scope.principal_id.clone()))
            .bind(("exclude", exclude_id.map(String::from)))
            .bind(("limit", k))
            .await?;
        let neighbors: Vec<Neighbor> = response.take(0)?;
        Ok(neighbors.into_iter().map(|n| (n.id, n.score)).collect())
    }

    async fn lexical_candidates(
        &self,
        query: &str,
        tokens: &[String],
        scope: &VisibilityScope,
        limit: usize,
    ) -> Result<Vec<Candidate>> {
        // SurrealDB v3.0.0 FULLTEXT @@ + search::score(0) is unreliable
        // upstream, so candidates come from substring matching and the engine
        // re-ranks them in process (engine::search::lexical_rank).
        let matcher = if tokens.is_empty() {
            "(string::lowercase(name) CONTAINS $query \
              OR string::lowercase(summary) CONTAINS $query)"
                .to_string()
        } else {
            let per_token: Vec<String> = (0..tokens.len())
                .map(|i| {
                    format!(
                        "(string::lowercase(name) CONTAINS $tok{i} \
                          OR string::lowercase(summary) CONTAINS $tok{i})",
                        i = i
                    )
                })
                .collect();
            format!("({})", per_token.join(" OR "))
        };

        let sql = format!(
            "SELECT artifact_id AS id, name, summary, usage_count, rating_avg, 1.0f AS score \
             FROM artifacts \
             WHERE {matcher} AND {reach} AND status = 'published' AND {vis} \
             LIMIT $limit",
            matcher = matcher,
            reach = TENANT_REACH_CLAUSE,
            vis = VISIBILITY_CLAUSE,
        );

        let mut builder = self
            .db
            .query(&sql)
            .bind(("query", query.to_lowercase()))
            .bind(("tenant", scope.tenant_id.clone()))
            .bind(("principal", scope.principal_id.clone()))
            .bind(("limit", limit));
        for (i, token) in tokens.iter().enumerate() {
            builder = builder.bind((format!("tok{}", i), token.to_lowercase()));
        }

        let mut response = builder.await?;
        let candidates: Vec<Candidate> = response.take(0)?;
        Ok(candidates)
    }

    async fn semantic_candidates(
        &self,
        vector: &[f32],
        scope: &VisibilityScope,
        limit: usize,
    ) -> Result<Vec<Candidate>> {
        let sql = format!(
            "SELECT artifact_id AS id, name, summary, usage_count, rating_avg, \
                vector::similarity::cosine(embedding, $vec) AS score \
             FROM artifacts \
             WHERE embedding IS NOT NONE AND {reach} AND status = 'published' AND {vis} \
             ORDER BY score DESC \
             LIMIT $limit",
            reach = TENANT_REACH_CLAUSE,
            vis = VISIBILITY_CLAUSE,
        );
        let mut response = self
            .db
            .query(&sql)
            .bind(("vec", vector.to_vec()))
            .bind(("tenant", scope.tenant_id.clone()))
            .bind(("principal", scope.principal_id.clone()))
            .bind(("limit", limit))
            .await?;
        let candidates: Vec<Candidate> = response.take(0)?;
        Ok(candidates)
    }

    async fn replace_assignments(
        &self,
        tenant_id: &str,
        rows: Vec<CommunityAssignment>,
    ) -> Result<()> {
        let data: Vec<serde_json::Value> = rows
            .iter()
            .map(|r| {
                serde_json::json!({
                    "tenant_id": r.tenant_id,
                    "artifact_id": r.artifact_id,
                    "community_id": r.community_id,
                    "modularity": r.modularity,
                    "detected_at": r.detected_at.to_rfc3339(),
                    "run_id": r.run_id,
                })
            })
            .collect();

        if data.is_empty() {
            self.db
                .query("DELETE community_assignments WHERE tenant_id = $tenant")
                .bind(("tenant", tenant_id.to_string()))
                .await?;
            return Ok(());
        }

        let sql = r#"
            BEGIN TRANSACTION;
            DELETE community_assignments WHERE tenant_id = $tenant RETURN NONE;
            INSERT INTO community_assignments $rows;
            COMMIT TRANSACTION;
        "#;
        let mut response = self
            .db
            .query(sql)
            .bind(("tenant", tenant_id.to_string()))
            .bind(("rows", data))
            .await?;

        // a cancelled transaction reports the failure on its statements; the
        // raw Value take surfaces it without fighting record-id decoding
        let _: surrealdb_types::Value = response.take(0)?;
        let _: surrealdb_types::Value = response.take(1)?;
        Ok(())
    }

    async fn get_assignments(&self, tenant_id: &str) -> Result<Vec<CommunityAssignment>> {
        let sql = "SELECT tenant_id, artifact_id, community_id, modularity, detected_at, run_id \
             FROM community_assignments WHERE tenant_id = $tenant";
        let mut response = self
            .db
            .query(sql)
            .bind(("tenant", tenant_id.to_string()))
            .await?;
        let assignments: Vec<CommunityAssignment> = response.take(0)?;
        Ok(assignments)
    }

    async fn record_usage(&self, event: UsageEvent) -> Result<()> {
        let sql = "UPDATE usage_events SET recorded_at = $recorded_at \
             WHERE artifact_id = $artifact_id AND principal_id = $principal_id \
             RETURN VALUE artifact_id";
        let mut response = self
            .db
            .query(sql)
            .bind(("recorded_at", event.recorded_at.to_rfc3339()))
            .bind(("artifact_id", event.artifact_id.clone()))
            .bind(("principal_id", event.principal_id.clone()))
            .await?;
        let updated: Vec<String> = response.take(0).unwrap_or_default();

        if updated.is_empty() {
            let row = serde_json::json!({
                "artifact_id": event.artifact_id,
                "principal_id": event.principal_id,
                "tenant_id": event.tenant_id,
                "recorded_at": event.recorded_at.to_rfc3339(),
            });
            let mut response = self
                .db
                .query("INSERT INTO usage_events $event")
                .bind(("event", row))
                .await?;
            let _: surrealdb_types::Value = response.take(0)?;
        }
        Ok(())
    }

    async fn used_artifact_ids(
        &self,
        tenant_id: &str,
        principal_id: &str,
    ) -> Result<HashSet<String>> {
        let sql = "SELECT VALUE artifact_id FROM usage_events \
             WHERE tenant_id = $tenant AND principal_id = $principal";
        let mut response = self
            .db
            .query(sql)
            .bind(("tenant", tenant_id.to_string()))
            .bind(("principal", principal_id.to_string()))
            .await?;
        let ids: Vec<String> = response.take(0)?;
        Ok(ids.into_iter().collect())
    }

    async fn health_check(&self) -> Result<bool> {
        self.db.query("INFO FOR DB").await?;
        Ok(true)
    }

    async fn shutdown(&self) -> Result<()> {
        // Force WAL flush: SELECT count() touches the storage engine,
        // ensuring pending writes from any table are committed to disk.
        self.db
            .query(
                "SELECT count() AS c FROM artifacts GROUP ALL;
                 SELECT count() AS c FROM community_assignments GROUP ALL;
                 SELECT count() AS c FROM usage_events GROUP ALL;",
            )
            .await?;
        tracing::info!("Storage flushed successfully");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ArtifactStatus, Visibility};
    use chrono::Utc;
    use tempfile::tempdir;

    const DIM: usize = 8;

    async fn setup_test_db() -> (SurrealStorage, tempfile::TempDir) {
        let tmp = tempdir().unwrap();
        let storage = SurrealStorage::new(tmp.path(), DIM).await.unwrap();
        (storage, tmp)
    }

    fn artifact(id: &str, tenant: &str, name: &str, author: &str) -> Artifact {
        Artifact::new(
            id.to_string(),
            tenant.to_string(),
            name.to_string(),
            author.to_string(),
        )
    }

    fn embedding(vector: Vec<f32>) -> Embedding {
        Embedding::new(
            vector,
            "test-model".to_string(),
            "1".to_string(),
            "hash".to_string(),
        )
    }

    fn axis(i: usize) -> Vec<f32> {
        let mut v = vec![0.0; DIM];
        v[i] = 1.0;
        v
    }

    #[tokio::test]
    async fn test_artifact_sync_and_get() {
        let (storage, _tmp) = setup_test_db().await;

        let a = artifact("skill-1", "t1", "Deploy checklist", "u1")
            .with_summary("Steps for a safe deploy".to_string());
        storage.sync_artifact(a.clone()).await.unwrap();

        let fetched = storage.get_artifact("skill-1").await.unwrap().unwrap();
        assert_eq!(fetched.name, "Deploy checklist");
        assert_eq!(fetched.tenant_id, "t1");
        assert_eq!(fetched.visibility, Visibility::Tenant);

        // re-sync overwrites read-model fields
        let renamed = artifact("skill-1", "t1", "Deploy runbook", "u1");
        storage.sync_artifact(renamed).await.unwrap();
        let fetched = storage.get_artifact("skill-1").await.unwrap().unwrap();
        assert_eq!(fetched.name, "Deploy runbook");
    }

    #[tokio::test]
    async fn test_sync_preserves_embedding() {
        let (storage, _tmp) = setup_test_db().await;

        storage
            .sync_artifact(artifact("s1", "t1", "One", "u1"))
            .await
            .unwrap();
        storage
            .upsert_embedding("s1", embedding(axis(0)))
            .await
            .unwrap();

        storage
            .sync_artifact(artifact("s1", "t1", "One renamed", "u1"))
            .await
            .unwrap();
        let emb = storage.get_embedding("s1").await.unwrap();
        assert!(emb.is_some());
    }

    #[tokio::test]
    async fn test_embedding_upsert_replaces() {
        let (storage, _tmp) = setup_test_db().await;

        storage
            .sync_artifact(artifact("s1", "t1", "One", "u1"))
            .await
            .unwrap();

        storage
            .upsert_embedding("s1", embedding(axis(0)))
            .await
            .unwrap();
        let first = storage.get_embedding("s1").await.unwrap().unwrap();

        let mut second = embedding(axis(1));
        second.input_hash = "hash-2".to_string();
        storage.upsert_embedding("s1", second).await.unwrap();

        let replaced = storage.get_embedding("s1").await.unwrap().unwrap();
        assert_eq!(replaced.input_hash, "hash-2");
        assert_eq!(replaced.vector, axis(1));
        // replacement keeps the original created_at
        assert_eq!(replaced.created_at, first.created_at);
    }

    #[tokio::test]
    async fn test_embedding_requires_artifact() {
        let (storage, _tmp) = setup_test_db().await;
        let err = storage
            .upsert_embedding("ghost", embedding(axis(0)))
            .await
            .unwrap_err();
        assert!(matches!(err, crate::AppError::ArtifactNotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_cascades() {
        let (storage, _tmp) = setup_test_db().await;

        storage
            .sync_artifact(artifact("s1", "t1", "One", "u1"))
            .await
            .unwrap();
        storage
            .upsert_embedding("s1", embedding(axis(0)))
            .await
            .unwrap();
        storage
            .replace_assignments(
                "t1",
                vec![CommunityAssignment {
                    tenant_id: "t1".to_string(),
                    artifact_id: "s1".to_string(),
                    community_id: 0,
                    modularity: 0.4,
                    detected_at: Utc::now(),
                    run_id: None,
                }],
            )
            .await
            .unwrap();
        storage
            .record_usage(UsageEvent {
                artifact_id: "s1".to_string(),
                principal_id: "u2".to_string(),
                tenant_id: "t1".to_string(),
                recorded_at: Utc::now(),
            })
            .await
            .unwrap();

        assert!(storage.delete_artifact("s1").await.unwrap());
        assert!(storage.get_artifact("s1").await.unwrap().is_none());
        assert!(storage.get_assignments("t1").await.unwrap().is_empty());
        assert!(storage
            .used_artifact_ids("t1", "u2")
            .await
            .unwrap()
            .is_empty());
        assert!(!storage.delete_artifact("s1").await.unwrap());
    }

    #[tokio::test]
    async fn test_knn_respects_visibility() {
        let (storage, _tmp) = setup_test_db().await;

        let rows = [
            ("pub-1", Visibility::Tenant, "u1"),
            ("pub-2", Visibility::GlobalApproved, "u1"),
            ("priv-1", Visibility::Private, "u1"),
        ];
        for (i, (id, vis, author)) in rows.iter().enumerate() {
            storage
                .sync_artifact(artifact(id, "t1", id, author).with_visibility(*vis))
                .await
                .unwrap();
            // shared direction plus a small per-artifact component
            let mut v = axis(0);
            v[i + 1] = 0.2;
            storage.upsert_embedding(id, embedding(v)).await.unwrap();
        }

        let anon = VisibilityScope::anonymous("t1");
        let neighbors = storage.query_knn(&axis(0), 10, &anon, None).await.unwrap();
        let ids: Vec<&str> = neighbors.iter().map(|(id, _)| id.as_str()).collect();
        assert!(ids.contains(&"pub-1"));
        assert!(ids.contains(&"pub-2"));
        assert!(!ids.contains(&"priv-1"));

        let author_scope = VisibilityScope::for_principal("t1", Some("u1".to_string()));
        let neighbors = storage
            .query_knn(&axis(0), 10, &author_scope, None)
            .await
            .unwrap();
        assert_eq!(neighbors.len(), 3);

        // exclusion keeps the scanned artifact out of its own neighbor list
        let neighbors = storage
            .query_knn(&axis(0), 10, &anon, Some("pub-1"))
            .await
            .unwrap();
        assert!(neighbors.iter().all(|(id, _)| id != "pub-1"));
    }

    #[tokio::test]
    async fn test_knn_ignores_drafts_and_other_tenants() {
        let (storage, _tmp) = setup_test_db().await;

        storage
            .sync_artifact(artifact("ok", "t1", "ok", "u1"))
            .await
            .unwrap();
        storage
            .sync_artifact(artifact("draft", "t1", "draft", "u1").with_status(ArtifactStatus::Draft))
            .await
            .unwrap();
        storage
            .sync_artifact(artifact("other", "t2", "other", "u1"))
            .await
            .unwrap();
        for id in ["ok", "draft", "other"] {
            storage.upsert_embedding(id, embedding(axis(0))).await.unwrap();
        }

        let scope = VisibilityScope::anonymous("t1");
        let neighbors = storage.query_knn(&axis(0), 10, &scope, None).await.unwrap();
        let ids: Vec<&str> = neighbors.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["ok"]);
    }

    #[tokio::test]
    async fn test_lexical_candidates_tokens() {
        let (storage, _tmp) = setup_test_db().await;

        storage
            .sync_artifact(
                artifact("s1", "t1", "Rust testing guide", "u1")
                    .with_summary("patterns for unit tests".to_string()),
            )
            .await
            .unwrap();
        storage
            .sync_artifact(artifact("s2", "t1", "Python scripting", "u1"))
            .await
            .unwrap();

        let scope = VisibilityScope::anonymous("t1");
        let tokens = vec!["rust".to_string(), "unit".to_string()];
        let candidates = storage
            .lexical_candidates("rust unit", &tokens, &scope, 20)
            .await
            .unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].id, "s1");

        // whole-query substring fallback
        let candidates = storage
            .lexical_candidates("python scr", &[], &scope, 20)
            .await
            .unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].id, "s2");
    }

    #[tokio::test]
    async fn test_semantic_candidates_ordering() {
        let (storage, _tmp) = setup_test_db().await;

        for (id, v) in [("near", axis(0)), ("far", axis(1))] {
            storage
                .sync_artifact(artifact(id, "t1", id, "u1"))
                .await
                .unwrap();
            storage.upsert_embedding(id, embedding(v)).await.unwrap();
        }

        let scope = VisibilityScope::anonymous("t1");
        let candidates = storage
            .semantic_candidates(&axis(0), &scope, 20)
            .await
            .unwrap();
        assert_eq!(candidates[0].id, "near");
        assert!(candidates[0].score > candidates[1].score);
    }

    #[tokio::test]
    async fn test_replace_assignments_swaps_whole_set() {
        let (storage, _tmp) = setup_test_db().await;

        let row = |artifact_id: &str, community_id| CommunityAssignment {
            tenant_id: "t1".to_string(),
            artifact_id: artifact_id.to_string(),
            community_id,
            modularity: 0.4,
            detected_at: Utc::now(),
            run_id: Some("run-1".to_string()),
        };

        storage
            .replace_assignments("t1", vec![row("a", 0), row("b", 0), row("c", 1)])
            .await
            .unwrap();
        assert_eq!(storage.get_assignments("t1").await.unwrap().len(), 3);

        storage
            .replace_assignments("t1", vec![row("a", 0), row("d", 1)])
            .await
            .unwrap();
        let assignments = storage.get_assignments("t1").await.unwrap();
        assert_eq!(assignments.len(), 2);
        let ids: Vec<&str> = assignments.iter().map(|a| a.artifact_id.as_str()).collect();
        assert!(ids.contains(&"a") && ids.contains(&"d"));
    }

    #[tokio::test]
    async fn test_replace_assignments_atomic_on_failure() {
        let (storage, _tmp) = setup_test_db().await;

        let row = |artifact_id: &str| CommunityAssignment {
            tenant_id: "t1".to_string(),
            artifact_id: artifact_id.to_string(),
            community_id: 0,
            modularity: 0.4,
            detected_at: Utc::now(),
            run_id: None,
        };

        storage
            .replace_assignments("t1", vec![row("a"), row("b")])
            .await
            .unwrap();

        // duplicate artifact violates the unique (tenant, artifact) index
        // mid-transaction; the whole replace must roll back
        let result = storage
            .replace_assignments("t1", vec![row("c"), row("c")])
            .await;
        assert!(result.is_err());

        let assignments = storage.get_assignments("t1").await.unwrap();
        assert_eq!(assignments.len(), 2);
        let ids: Vec<&str> = assignments.iter().map(|a| a.artifact_id.as_str()).collect();
        assert!(ids.contains(&"a") && ids.contains(&"b"));
    }

    #[tokio::test]
    async fn test_assignments_scoped_by_tenant() {
        let (storage, _tmp) = setup_test_db().await;

        let row = |tenant: &str, artifact_id: &str| CommunityAssignment {
            tenant_id: tenant.to_string(),
            artifact_id: artifact_id.to_string(),
            community_id: 0,
            modularity: 0.2,
            detected_at: Utc::now(),
            run_id: None,
        };

        storage
            .replace_assignments("t1", vec![row("t1", "a")])
            .await
            .unwrap();
        storage
            .replace_assignments("t2", vec![row("t2", "b")])
            .await
            .unwrap();

        // replacing t1 must not touch t2
        storage
            .replace_assignments("t1", vec![row("t1", "c")])
            .await
            .unwrap();
        let t2 = storage.get_assignments("t2").await.unwrap();
        assert_eq!(t2.len(), 1);
        assert_eq!(t2[0].artifact_id, "b");
    }

    #[tokio::test]
    async fn test_record_usage_idempotent() {
        let (storage, _tmp) = setup_test_db().await;

        let event = UsageEvent {
            artifact_id: "s1".to_string(),
            principal_id: "u1".to_string(),
            tenant_id: "t1".to_string(),
            recorded_at: Utc::now(),
        };
        storage.record_usage(event.clone()).await.unwrap();
        storage.record_usage(event).await.unwrap();

        let used = storage.used_artifact_ids("t1", "u1").await.unwrap();
        assert_eq!(used.len(), 1);
        assert!(used.contains("s1"));
        assert!(storage.used_artifact_ids("t1", "u2").await.unwrap().is_empty());
    }
}
