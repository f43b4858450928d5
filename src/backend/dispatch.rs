// ABOUTME: Job dispatcher boundary: hands a deployment to the async execution backend.
// ABOUTME: Returns an opaque token; terminal outcomes are reported out of band.

use async_trait::async_trait;

use crate::deploy::Deployment;
use crate::types::JobToken;

/// Errors from the job dispatcher.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("job dispatcher unreachable: {0}")]
    Unreachable(String),

    #[error("enqueue rejected: {0}")]
    Rejected(String),
}

/// The asynchronous execution backend that performs the actual release.
///
/// The orchestrator only enqueues work here; it never waits for completion.
#[async_trait]
pub trait JobDispatcher: Send + Sync {
    /// Enqueue the deployment for execution and return its job token.
    ///
    /// Implementations must be safe to retry with the same deployment id when
    /// the caller did not observe success.
    async fn enqueue(&self, deployment: &Deployment) -> Result<JobToken, DispatchError>;
}
