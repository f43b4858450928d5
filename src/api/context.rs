// ABOUTME: Request-scoped lookup context: current build and project roster.
// ABOUTME: Loaded once per external call and torn down with it; no process-wide caches.

use std::sync::Arc;

use crate::backend::{EnvironmentBackend, ProjectMember};
use crate::deploy::Deployment;
use crate::error::Result;
use crate::types::{EnvironmentId, Member};

/// Memoized environment lookups for the duration of one external call.
///
/// Replaces per-request static caches with an explicit object: the current
/// build and the project-member roster are fetched once when the scope is
/// created and reused for every projection built within the call.
pub struct RequestScope {
    current_build: Option<Deployment>,
    members: Vec<ProjectMember>,
}

impl RequestScope {
    pub async fn load(
        backend: &Arc<dyn EnvironmentBackend>,
        environment: &EnvironmentId,
    ) -> Result<Self> {
        let current_build = backend.current_build(environment).await?;
        let members = backend.project_members(environment).await?;
        Ok(Self {
            current_build,
            members,
        })
    }

    pub fn is_current_build(&self, deployment: &Deployment) -> bool {
        self.current_build
            .as_ref()
            .is_some_and(|current| current.id == deployment.id)
    }

    pub fn role_of(&self, member: &Member) -> Option<String> {
        self.members
            .iter()
            .find(|entry| entry.member.id == member.id)
            .and_then(|entry| entry.role.clone())
    }
}
