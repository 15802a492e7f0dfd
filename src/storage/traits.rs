//! Storage backend trait definition
//!
//! Defines the async interface for all database operations.
//! Implemented by SurrealStorage.
//!
//! Every method that reads artifact rows or embeddings takes a
//! [`VisibilityScope`] and composes its predicate into the query; there is no
//! unscoped read path.

use async_trait::async_trait;
use std::collections::HashSet;

use crate::types::{Artifact, CommunityAssignment, Candidate, Embedding, UsageEvent};
use crate::visibility::VisibilityScope;
use crate::Result;

/// Storage backend trait for all database operations
#[async_trait]
pub trait StorageBackend: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Artifact read model
    // ─────────────────────────────────────────────────────────────────────────

    /// Upsert the collaborator-owned artifact read model row. Returns the
    /// artifact id. Embedding fields on an existing row are left untouched.
    async fn sync_artifact(&self, artifact: Artifact) -> Result<String>;

    /// Get an artifact by id (unscoped: ingestion-side lookup, not a member
    /// read path)
    async fn get_artifact(&self, id: &str) -> Result<Option<Artifact>>;

    /// Delete an artifact, cascading its embedding, community assignment and
    /// usage events. Returns true if it existed.
    async fn delete_artifact(&self, id: &str) -> Result<bool>;

    /// Count artifacts for a tenant (all statuses)
    async fn count_artifacts(&self, tenant_id: &str) -> Result<usize>;

    // ─────────────────────────────────────────────────────────────────────────
    // Embedding store
    // ─────────────────────────────────────────────────────────────────────────

    /// Replace the artifact's embedding wholesale (overwrite on conflict).
    /// The original `created_at` survives replacement.
    async fn upsert_embedding(&self, artifact_id: &str, embedding: Embedding) -> Result<()>;

    /// Get the artifact's embedding, if one has been ingested
    async fn get_embedding(&self, artifact_id: &str) -> Result<Option<Embedding>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Scoped reads
    // ─────────────────────────────────────────────────────────────────────────

    /// All published, visibility-eligible artifacts in the scope's tenant,
    /// with or without an embedding
    async fn eligible_artifacts(&self, scope: &VisibilityScope) -> Result<Vec<Artifact>>;

    /// (artifact id, vector) for every eligible artifact that has an
    /// embedding; the node set for KNN graph building
    async fn eligible_embedded(&self, scope: &VisibilityScope)
        -> Result<Vec<(String, Vec<f32>)>>;

    /// Nearest neighbors of `vector` within the scope's tenant, best-first.
    /// Sub-linear via the HNSW index over the embedding field; for small
    /// corpora the filtered query degrades to a scan, which is acceptable at
    /// catalog sizes.
    async fn query_knn(
        &self,
        vector: &[f32],
        k: usize,
        scope: &VisibilityScope,
        exclude_id: Option<&str>,
    ) -> Result<Vec<(String, f32)>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Search candidates
    // ─────────────────────────────────────────────────────────────────────────

    /// Substring candidate match over name/summary for the given query
    /// tokens (whole query when `tokens` is empty). Reach: the scope's tenant
    /// plus globally approved artifacts. Scores are flat; the caller
    /// re-ranks.
    async fn lexical_candidates(
        &self,
        query: &str,
        tokens: &[String],
        scope: &VisibilityScope,
        limit: usize,
    ) -> Result<Vec<Candidate>>;

    /// Top candidates by cosine similarity to the query vector, same reach
    /// as [`Self::lexical_candidates`]
    async fn semantic_candidates(
        &self,
        vector: &[f32],
        scope: &VisibilityScope,
        limit: usize,
    ) -> Result<Vec<Candidate>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Community assignments
    // ─────────────────────────────────────────────────────────────────────────

    /// Atomically replace the tenant's entire assignment set: one transaction
    /// deletes the old rows and inserts the new ones. Readers observe either
    /// the complete previous partition or the complete new one; on failure
    /// nothing changes.
    async fn replace_assignments(
        &self,
        tenant_id: &str,
        rows: Vec<CommunityAssignment>,
    ) -> Result<()>;

    /// Current assignment rows for a tenant
    async fn get_assignments(&self, tenant_id: &str) -> Result<Vec<CommunityAssignment>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Usage events
    // ─────────────────────────────────────────────────────────────────────────

    /// Record (idempotently) that a principal used an artifact
    async fn record_usage(&self, event: UsageEvent) -> Result<()>;

    /// Ids of artifacts the principal has used within the tenant
    async fn used_artifact_ids(
        &self,
        tenant_id: &str,
        principal_id: &str,
    ) -> Result<HashSet<String>>;

    // ─────────────────────────────────────────────────────────────────────────
    // System
    // ─────────────────────────────────────────────────────────────────────────

    /// Check if the database is healthy and responsive
    async fn health_check(&self) -> Result<bool>;

    /// Flush pending writes before process exit
    async fn shutdown(&self) -> Result<()>;
}
