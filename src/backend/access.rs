// ABOUTME: Access control boundary consumed by the orchestrator.
// ABOUTME: Answers view/deploy permission questions; storage of roles is external.

use async_trait::async_trait;

use crate::deploy::Deployment;
use crate::types::{EnvironmentId, Member};

/// Permission checks the orchestrator performs before every mutating or
/// sensitive read operation. Role storage lives outside this crate.
#[async_trait]
pub trait AccessControl: Send + Sync {
    /// Whether `subject` may see the given deployment record.
    async fn can_view(&self, subject: &Member, deployment: &Deployment) -> bool;

    /// Whether `subject` may request or execute deployments to `environment`.
    async fn can_deploy(&self, subject: &Member, environment: &EnvironmentId) -> bool;
}
