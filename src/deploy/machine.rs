// ABOUTME: The transition engine: validates, runs the handler, persists — atomically.
// ABOUTME: Serialized per record; the queue guard is checked under a per-environment lock.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex as AsyncMutex;

use crate::backend::{JobDispatcher, Notifier};
use crate::error::{Error, Result};
use crate::types::{DeploymentId, EnvironmentId};

use super::deployment::{AbortSignal, Deployment};
use super::log::LogDirectory;
use super::state::{State, Transition};
use super::store::DeploymentStore;
use super::strategy::DeploymentStrategy;

/// Applies lifecycle transitions to deployment records.
///
/// `apply` is the sole mutation point for `state`, timestamps, `job_token`,
/// and `signal`. It holds a per-record lock across guard, handler, and
/// persist, so concurrent attempts against the same deployment serialize and
/// the loser fails its guard instead of corrupting the record.
pub struct StateMachine {
    store: Arc<DeploymentStore>,
    logs: Arc<LogDirectory>,
    dispatcher: Arc<dyn JobDispatcher>,
    notifier: Arc<dyn Notifier>,
    record_locks: Mutex<HashMap<DeploymentId, Arc<AsyncMutex<()>>>>,
    environment_locks: Mutex<HashMap<EnvironmentId, Arc<AsyncMutex<()>>>>,
}

impl StateMachine {
    pub fn new(
        store: Arc<DeploymentStore>,
        logs: Arc<LogDirectory>,
        dispatcher: Arc<dyn JobDispatcher>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            logs,
            dispatcher,
            notifier,
            record_locks: Mutex::new(HashMap::new()),
            environment_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Apply a transition to the deployment and return the updated record.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id, `Conflict` when the transition is not
    /// valid from the current state or the environment is busy, `Dependency`
    /// when the job dispatcher fails. A failed guard mutates nothing.
    pub async fn apply(&self, id: &DeploymentId, transition: Transition) -> Result<Deployment> {
        let record_lock = self.record_lock(id);
        let _record_guard = record_lock.lock().await;

        let mut deployment = self
            .store
            .get(id)
            .ok_or_else(|| Error::NotFound(format!("deployment {id} does not exist")))?;

        if !transition.permits(deployment.state) {
            return Err(Error::Conflict(format!(
                "cannot {transition} deployment {id} in state {}",
                deployment.state
            )));
        }

        match transition {
            Transition::Submit => self.on_submit(&mut deployment).await?,
            Transition::Queue => self.on_queue(&mut deployment).await?,
            Transition::Abort => self.on_abort(&mut deployment),
            mark => self.on_mark(&mut deployment, mark),
        }

        Ok(deployment)
    }

    /// QUEUE with a freshly computed strategy installed under the record
    /// lock, so the re-plan and the transition are one atomic unit and the
    /// strategy can never be refreshed on a record that already queued.
    ///
    /// The refreshed strategy is only persisted when the transition commits;
    /// a failed guard leaves the record untouched.
    pub async fn queue(
        &self,
        id: &DeploymentId,
        refreshed: DeploymentStrategy,
    ) -> Result<Deployment> {
        let record_lock = self.record_lock(id);
        let _record_guard = record_lock.lock().await;

        let mut deployment = self
            .store
            .get(id)
            .ok_or_else(|| Error::NotFound(format!("deployment {id} does not exist")))?;

        if !Transition::Queue.permits(deployment.state) {
            return Err(Error::Conflict(format!(
                "cannot queue deployment {id} in state {}",
                deployment.state
            )));
        }

        deployment.refresh_strategy(refreshed);
        self.on_queue(&mut deployment).await?;
        Ok(deployment)
    }

    /// SUBMIT: stamp the request time, persist, then ask the approver.
    ///
    /// The notification is best-effort; a failed send is logged and never
    /// rolls the transition back.
    async fn on_submit(&self, deployment: &mut Deployment) -> Result<()> {
        deployment.requested = Some(Utc::now());
        deployment.state = State::Submitted;
        deployment.last_updated = Utc::now();
        self.store.persist(deployment);

        if let Some(approver) = deployment.approver.clone() {
            let deployer = deployment.deployer.clone();
            match self
                .notifier
                .approval_requested(deployment, &deployer, &approver)
                .await
            {
                Ok(()) => self.log(
                    deployment,
                    &format!("Deployment submitted, approval requested from {approver}"),
                ),
                Err(e) => {
                    tracing::warn!(
                        deployment = %deployment.id,
                        error = %e,
                        "approval notification failed"
                    );
                    self.log(deployment, &format!("Approval notification failed: {e}"));
                }
            }
        }
        Ok(())
    }

    /// QUEUE: hand the deployment to the job dispatcher and commit the state.
    ///
    /// The busy-environment check and the state write happen under the same
    /// per-environment critical section, so two submitted deployments cannot
    /// both queue. An enqueue failure marks the record `Failed` with a log
    /// entry rather than leaving a `Queued` record with no job behind it.
    async fn on_queue(&self, deployment: &mut Deployment) -> Result<()> {
        let environment_lock = self.environment_lock(&deployment.environment);
        let _environment_guard = environment_lock.lock().await;

        if let Some(active) = self
            .store
            .active_for_environment(&deployment.environment, &deployment.id)
        {
            return Err(Error::Conflict(format!(
                "environment {} already has deployment {} in state {}",
                deployment.environment, active.id, active.state
            )));
        }

        let token = match self.dispatcher.enqueue(deployment).await {
            Ok(token) => token,
            Err(e) => {
                deployment.state = State::Failed;
                deployment.last_updated = Utc::now();
                self.store.persist(deployment);
                self.log(deployment, &format!("Deploy failed to queue: {e}"));
                return Err(Error::Dependency(format!(
                    "job dispatcher enqueue failed: {e}"
                )));
            }
        };

        deployment.job_token = Some(token.clone());
        deployment.started = Some(Utc::now());
        deployment.state = State::Queued;
        deployment.last_updated = Utc::now();
        self.store.persist(deployment);

        let location = self.logs.path_for(&deployment.id);
        self.log(
            deployment,
            &format!("Deploy queued as job {token} (log at {})", location.display()),
        );
        Ok(())
    }

    /// ABORT: attach the advisory interrupt for the running job.
    ///
    /// State is deliberately untouched; the terminal state arrives from the
    /// job-outcome report.
    fn on_abort(&self, deployment: &mut Deployment) {
        deployment.signal = Some(AbortSignal::Interrupt);
        deployment.last_updated = Utc::now();
        self.store.persist(deployment);
        self.log(deployment, "Abort requested, interrupt signalled to job");
    }

    /// Out-of-band progress and outcome reports from the job runner.
    fn on_mark(&self, deployment: &mut Deployment, transition: Transition) {
        let target = transition
            .target()
            .unwrap_or(deployment.state);
        deployment.state = target;
        deployment.last_updated = Utc::now();
        self.store.persist(deployment);
    }

    /// Fire-and-forget log write: a log failure never rolls back a committed
    /// transition, it is surfaced as a warning instead.
    fn log(&self, deployment: &Deployment, line: &str) {
        let log = self.logs.for_deployment(&deployment.id);
        if let Err(e) = log.write(line) {
            tracing::warn!(
                deployment = %deployment.id,
                error = %e,
                "deployment log write failed"
            );
        }
    }

    fn record_lock(&self, id: &DeploymentId) -> Arc<AsyncMutex<()>> {
        self.record_locks
            .lock()
            .entry(id.clone())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    fn environment_lock(&self, environment: &EnvironmentId) -> Arc<AsyncMutex<()>> {
        self.environment_locks
            .lock()
            .entry(environment.clone())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }
}
