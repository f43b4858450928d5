// ABOUTME: Environment backend boundary: current build, revision resolution, project roster.
// ABOUTME: Source-control operations and project membership storage are external.

use async_trait::async_trait;

use crate::deploy::Deployment;
use crate::types::{EnvironmentId, Member, Sha};

/// Errors from the environment backend.
#[derive(Debug, thiserror::Error)]
pub enum EnvironmentError {
    #[error("unknown environment: {0}")]
    UnknownEnvironment(String),

    #[error("cannot resolve revision: {0}")]
    UnknownRevision(String),

    #[error("environment backend unreachable: {0}")]
    Unreachable(String),
}

/// A project member together with their project role, if any.
///
/// Role is `None` for admins or operations users who can deploy but are not
/// part of the project roles.
#[derive(Debug, Clone)]
pub struct ProjectMember {
    pub member: Member,
    pub role: Option<String>,
}

/// Commit metadata for display alongside a deployment.
#[derive(Debug, Clone)]
pub struct CommitDetails {
    pub message: String,
    pub url: String,
}

/// What the orchestrator needs to know about a target environment.
#[async_trait]
pub trait EnvironmentBackend: Send + Sync {
    /// The deployment currently live on the environment, if any.
    async fn current_build(
        &self,
        environment: &EnvironmentId,
    ) -> Result<Option<Deployment>, EnvironmentError>;

    /// Resolve a requested reference (branch name, tag, abbreviated sha) to a
    /// full commit hash against the environment's repository.
    async fn resolve_revision(
        &self,
        environment: &EnvironmentId,
        reference: &str,
    ) -> Result<Sha, EnvironmentError>;

    /// The members of the project owning this environment, with their roles.
    async fn project_members(
        &self,
        environment: &EnvironmentId,
    ) -> Result<Vec<ProjectMember>, EnvironmentError>;

    /// Commit message and browse URL for a revision, when known.
    async fn commit_details(
        &self,
        environment: &EnvironmentId,
        sha: &Sha,
    ) -> Result<Option<CommitDetails>, EnvironmentError>;
}
