//! Tenant and visibility scoping
//!
//! Single isolation boundary for every read path. Each storage query that
//! touches artifact rows or their embeddings composes the predicate produced
//! here; no component queries around it.

use crate::types::{Artifact, ArtifactStatus, Visibility};

/// Explicit tenant/principal context, threaded through every call instead of
/// ambient session state.
#[derive(Debug, Clone)]
pub struct VisibilityScope {
    pub tenant_id: String,
    pub principal_id: Option<String>,
}

/// SurQL fragment matching rows the scope's principal may see. Binds
/// `$principal` (Option<String>): anonymous scopes match only org-browsable
/// levels, authenticated scopes additionally match the principal's own
/// `personal`/`private` rows.
pub const VISIBILITY_CLAUSE: &str = "(visibility IN ['global_approved', 'tenant'] \
     OR ($principal IS NOT NONE AND author_id = $principal))";

/// SurQL fragment scoping to the tenant's own rows. Binds `$tenant`.
pub const TENANT_CLAUSE: &str = "tenant_id = $tenant";

/// SurQL fragment for search reach: the tenant's own rows plus globally
/// approved rows from any tenant. Binds `$tenant`.
pub const TENANT_REACH_CLAUSE: &str =
    "(tenant_id = $tenant OR visibility = 'global_approved')";

impl VisibilityScope {
    /// Scope with no principal: org-browsable rows only. Used for shared
    /// state (community detection) so personal/private artifacts never leak
    /// into a tenant-wide graph.
    pub fn anonymous(tenant_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            principal_id: None,
        }
    }

    pub fn for_principal(
        tenant_id: impl Into<String>,
        principal_id: Option<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            principal_id,
        }
    }

    /// In-memory equivalent of [`VISIBILITY_CLAUSE`] + published status.
    /// Queries enforce the predicate in SurQL; this exists for in-process
    /// joins and for asserting isolation in tests.
    pub fn allows(&self, artifact: &Artifact) -> bool {
        if artifact.status != ArtifactStatus::Published {
            return false;
        }
        if artifact.visibility.is_org_browsable() {
            return true;
        }
        match &self.principal_id {
            Some(p) => artifact.author_id == *p,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Artifact;

    fn artifact(visibility: Visibility, author: &str) -> Artifact {
        Artifact::new(
            "a1".to_string(),
            "t1".to_string(),
            "Test".to_string(),
            author.to_string(),
        )
        .with_visibility(visibility)
    }

    #[test]
    fn test_org_browsable_levels() {
        assert!(Visibility::GlobalApproved.is_org_browsable());
        assert!(Visibility::Tenant.is_org_browsable());
        assert!(!Visibility::Personal.is_org_browsable());
        assert!(!Visibility::Private.is_org_browsable());
    }

    #[test]
    fn test_anonymous_sees_only_org_browsable() {
        let scope = VisibilityScope::anonymous("t1");
        assert!(scope.allows(&artifact(Visibility::GlobalApproved, "u1")));
        assert!(scope.allows(&artifact(Visibility::Tenant, "u1")));
        assert!(!scope.allows(&artifact(Visibility::Personal, "u1")));
        assert!(!scope.allows(&artifact(Visibility::Private, "u1")));
    }

    #[test]
    fn test_principal_sees_own_private() {
        let scope = VisibilityScope::for_principal("t1", Some("u1".to_string()));
        assert!(scope.allows(&artifact(Visibility::Private, "u1")));
        assert!(scope.allows(&artifact(Visibility::Personal, "u1")));
        assert!(!scope.allows(&artifact(Visibility::Private, "u2")));
        assert!(!scope.allows(&artifact(Visibility::Personal, "u2")));
    }

    #[test]
    fn test_draft_never_visible() {
        let scope = VisibilityScope::for_principal("t1", Some("u1".to_string()));
        let draft = artifact(Visibility::Tenant, "u1").with_status(ArtifactStatus::Draft);
        assert!(!scope.allows(&draft));
    }
}
