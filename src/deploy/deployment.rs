// ABOUTME: The deployment record: one attempt to release a revision to an environment.
// ABOUTME: Permanent audit history once submitted; mutated only through the state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{DeploymentId, EnvironmentId, JobToken, Member, RefType, Sha};

use super::State;
use super::strategy::DeploymentStrategy;

/// Advisory interrupt request attached to a deployment.
///
/// The external job runner consumes this; how it encodes the interrupt on the
/// wire (signal numbers and the like) is its concern, not this record's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortSignal {
    Interrupt,
}

/// One deployment attempt, tracked through its whole lifecycle.
///
/// `id`, `environment`, and the revision identity are immutable after
/// submission. `state`, timestamps, `job_token`, and `signal` change only
/// through [`StateMachine::apply`](super::StateMachine::apply); the strategy
/// may be refreshed by re-planning while the record is still pre-queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deployment {
    pub id: DeploymentId,
    pub environment: EnvironmentId,
    pub sha: Sha,
    pub branch: String,
    pub ref_type: RefType,
    pub summary: String,
    pub strategy: DeploymentStrategy,
    pub state: State,
    pub deployer: Member,
    pub approver: Option<Member>,
    pub job_token: Option<JobToken>,
    pub signal: Option<AbortSignal>,
    pub created: DateTime<Utc>,
    pub requested: Option<DateTime<Utc>>,
    pub started: Option<DateTime<Utc>>,
    pub last_updated: DateTime<Utc>,
}

impl Deployment {
    /// Replace the stored strategy with a freshly computed plan.
    ///
    /// Only meaningful while the record is pre-queue; the state machine
    /// re-plans immediately before queueing to catch environment drift.
    pub fn refresh_strategy(&mut self, strategy: DeploymentStrategy) {
        self.strategy = strategy;
        self.last_updated = Utc::now();
    }

    /// The moment shown as "started" in listings, falling back to creation
    /// time for records that never reached the queue.
    pub fn started_or_created(&self) -> DateTime<Utc> {
        self.started.unwrap_or(self.created)
    }

    /// The moment shown as "requested", with the same fallback.
    pub fn requested_or_created(&self) -> DateTime<Utc> {
        self.requested.unwrap_or(self.created)
    }
}
