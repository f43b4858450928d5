// ABOUTME: Notification boundary for human-facing messages.
// ABOUTME: Content rendering and delivery live outside this crate.

use async_trait::async_trait;

use crate::deploy::Deployment;
use crate::types::Member;

/// Errors from the notification service.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("failed to send notification: {0}")]
    Send(String),
}

/// Sends human-facing messages about deployments.
///
/// Best-effort: a failed send never blocks the lifecycle transition that
/// triggered it.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Ask `approver` to approve the submitted deployment, on behalf of `deployer`.
    async fn approval_requested(
        &self,
        deployment: &Deployment,
        deployer: &Member,
        approver: &Member,
    ) -> Result<(), NotifyError>;
}
