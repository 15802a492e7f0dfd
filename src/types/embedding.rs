use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One embedding per artifact, replaced whole when the embedded text changes.
/// The vector is produced by an external provider; this engine only stores
/// and queries it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Embedding {
    pub vector: Vec<f32>,
    pub model_name: String,
    pub model_version: String,
    /// SHA-256 (hex) of the text that was embedded. Re-embedding is triggered
    /// externally when this no longer matches the current content.
    pub input_hash: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

/// Vector-less half of an [`Embedding`] as persisted alongside the artifact
/// row. The vector itself lives in its own indexed field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingMeta {
    pub model_name: String,
    pub model_version: String,
    pub input_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Embedding {
    pub fn new(
        vector: Vec<f32>,
        model_name: String,
        model_version: String,
        input_hash: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            vector,
            model_name,
            model_version,
            input_hash,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn meta(&self) -> EmbeddingMeta {
        EmbeddingMeta {
            model_name: self.model_name.clone(),
            model_version: self.model_version.clone(),
            input_hash: self.input_hash.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    pub fn from_parts(vector: Vec<f32>, meta: EmbeddingMeta) -> Self {
        Self {
            vector,
            model_name: meta.model_name,
            model_version: meta.model_version,
            input_hash: meta.input_hash,
            created_at: meta.created_at,
            updated_at: meta.updated_at,
        }
    }
}
