use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Access scope of a skill artifact, from widest to narrowest.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    GlobalApproved,
    Tenant,
    Personal,
    Private,
}

impl Visibility {
    /// Levels any member of the owning tenant may browse without being the author.
    pub fn is_org_browsable(self) -> bool {
        matches!(self, Visibility::GlobalApproved | Visibility::Tenant)
    }
}

impl std::str::FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "global_approved" => Ok(Self::GlobalApproved),
            "tenant" => Ok(Self::Tenant),
            "personal" => Ok(Self::Personal),
            "private" => Ok(Self::Private),
            _ => Err(format!("Unknown visibility level: {}", s)),
        }
    }
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Visibility::GlobalApproved => "global_approved",
            Visibility::Tenant => "tenant",
            Visibility::Personal => "personal",
            Visibility::Private => "private",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactStatus {
    #[default]
    Draft,
    Published,
}

impl std::str::FromStr for ArtifactStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "draft" => Ok(Self::Draft),
            "published" => Ok(Self::Published),
            _ => Err(format!("Unknown artifact status: {}", s)),
        }
    }
}

impl std::fmt::Display for ArtifactStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ArtifactStatus::Draft => "draft",
            ArtifactStatus::Published => "published",
        };
        f.write_str(s)
    }
}

/// Read model of a skill artifact, owned by the content-management
/// collaborator and synchronized into this engine. The engine only filters
/// on and displays these fields; it never mutates them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    #[serde(default)]
    pub summary: String,
    pub visibility: Visibility,
    #[serde(default)]
    pub status: ArtifactStatus,
    pub author_id: String,
    #[serde(default)]
    pub usage_count: u64,
    #[serde(default)]
    pub rating_avg: f32,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Artifact {
    pub fn new(id: String, tenant_id: String, name: String, author_id: String) -> Self {
        Self {
            id,
            tenant_id,
            name,
            summary: String::new(),
            visibility: Visibility::Tenant,
            status: ArtifactStatus::Published,
            author_id,
            usage_count: 0,
            rating_avg: 0.0,
            updated_at: Utc::now(),
        }
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_status(mut self, status: ArtifactStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_summary(mut self, summary: String) -> Self {
        self.summary = summary;
        self
    }
}

/// Collaborator-recorded usage of an artifact by a principal. Feeds the
/// topology `used` flag; aggregates on the artifact row feed ranking
/// tie-breaks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageEvent {
    pub artifact_id: String,
    pub principal_id: String,
    pub tenant_id: String,
    #[serde(default = "Utc::now")]
    pub recorded_at: DateTime<Utc>,
}
