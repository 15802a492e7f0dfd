pub mod artifact;
pub mod community;
pub mod embedding;
pub mod error;
pub mod search;
pub mod topology;

pub use artifact::{Artifact, ArtifactStatus, UsageEvent, Visibility};
pub use community::{CommunityAssignment, DetectionReport, SkipReason};
pub use embedding::{Embedding, EmbeddingMeta};
pub use error::{AppError, Result};
pub use search::{Candidate, SearchHit};
pub use topology::{
    CommunitySummary, TenantTopology, TopologyEdge, TopologyNode, TopologyStats,
};

pub use surrealdb_types::SurrealValue;
