// ABOUTME: The externally callable deployment operations: plan, submit, start, abort, inspect.
// ABOUTME: Performs permission and existence checks before anything touches the state machine.

use std::sync::Arc;

use crate::backend::{AccessControl, EnvironmentBackend, JobDispatcher, Notifier};
use crate::config::ReplanPolicy;
use crate::error::{Error, Result};
use crate::types::{DeploymentId, EnvironmentId, Member};

use super::deployment::Deployment;
use super::log::LogDirectory;
use super::machine::StateMachine;
use super::state::Transition;
use super::store::DeploymentStore;
use super::strategy::{DeploymentStrategy, EnvironmentSnapshot, StrategyOptions};

/// Progress and outcome reports arriving from the external job runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Running,
    Completed,
    Failed,
    Aborted,
}

impl JobOutcome {
    fn transition(self) -> Transition {
        match self {
            JobOutcome::Running => Transition::MarkRunning,
            JobOutcome::Completed => Transition::MarkCompleted,
            JobOutcome::Failed => Transition::MarkFailed,
            JobOutcome::Aborted => Transition::MarkAborted,
        }
    }
}

/// Coordinates deployment lifecycles for callers.
///
/// Every operation takes the calling subject; permission and existence
/// checks happen here, at the boundary, never deep inside the machine.
pub struct Orchestrator {
    store: Arc<DeploymentStore>,
    logs: Arc<LogDirectory>,
    machine: StateMachine,
    backend: Arc<dyn EnvironmentBackend>,
    access: Arc<dyn AccessControl>,
    replan: ReplanPolicy,
}

impl Orchestrator {
    pub fn new(
        backend: Arc<dyn EnvironmentBackend>,
        access: Arc<dyn AccessControl>,
        dispatcher: Arc<dyn JobDispatcher>,
        notifier: Arc<dyn Notifier>,
        logs: LogDirectory,
        replan: ReplanPolicy,
    ) -> Self {
        let store = Arc::new(DeploymentStore::new());
        let logs = Arc::new(logs);
        let machine = StateMachine::new(
            Arc::clone(&store),
            Arc::clone(&logs),
            dispatcher,
            notifier,
        );
        Self {
            store,
            logs,
            machine,
            backend,
            access,
            replan,
        }
    }

    pub fn backend(&self) -> &Arc<dyn EnvironmentBackend> {
        &self.backend
    }

    pub fn logs(&self) -> &Arc<LogDirectory> {
        &self.logs
    }

    /// Compute a candidate strategy for the environment. Read-only: nothing
    /// is persisted.
    pub async fn plan(
        &self,
        subject: &Member,
        environment: &EnvironmentId,
        options: StrategyOptions,
    ) -> Result<DeploymentStrategy> {
        self.ensure_can_deploy(subject, environment).await?;
        let snapshot = self.snapshot(environment, &options.revision).await?;
        Ok(DeploymentStrategy::plan(&snapshot, options))
    }

    /// Create a deployment from the strategy and apply SUBMIT.
    ///
    /// The record becomes permanent audit history from this point on.
    pub async fn submit(
        &self,
        subject: &Member,
        strategy: &DeploymentStrategy,
        approver: Option<Member>,
    ) -> Result<Deployment> {
        self.ensure_can_deploy(subject, &strategy.environment).await?;

        let id = self.store.allocate_id();
        let deployment = strategy.create_deployment(id.clone(), subject.clone(), approver);
        self.store.persist(&deployment);

        self.machine.apply(&id, Transition::Submit).await
    }

    /// Re-plan from the stored options and apply QUEUE.
    ///
    /// Re-planning immediately before queueing catches environment drift
    /// between approval and execution. Under the default latest-wins policy
    /// the refreshed plan is adopted; under `Reject` a moved target is a
    /// `Conflict`.
    pub async fn start(&self, subject: &Member, id: &DeploymentId) -> Result<Deployment> {
        let deployment = self.load(id)?;
        self.ensure_can_deploy(subject, &deployment.environment).await?;

        let options = deployment.strategy.options.clone();
        let snapshot = self.snapshot(&deployment.environment, &options.revision).await?;
        let refreshed = DeploymentStrategy::plan(&snapshot, options);

        if self.replan == ReplanPolicy::Reject && refreshed.sha != deployment.sha {
            return Err(Error::Conflict(format!(
                "target moved from {} to {} since submission",
                deployment.sha, refreshed.sha
            )));
        }

        self.machine.queue(id, refreshed).await
    }

    /// Request the running job to stop. Advisory: sets the signal, state is
    /// untouched until the job-outcome report arrives.
    pub async fn abort(&self, subject: &Member, id: &DeploymentId) -> Result<()> {
        let deployment = self.load(id)?;
        self.ensure_can_deploy(subject, &deployment.environment).await?;
        self.machine.apply(id, Transition::Abort).await?;
        Ok(())
    }

    /// Fetch one deployment record, subject to view permission.
    pub async fn inspect(&self, subject: &Member, id: &DeploymentId) -> Result<Deployment> {
        let deployment = self.load(id)?;
        if !self.access.can_view(subject, &deployment).await {
            return Err(Error::Forbidden(format!(
                "not authorised to view deployment {id}"
            )));
        }
        Ok(deployment)
    }

    /// The accumulated log lines for a deployment, with the record itself.
    pub async fn log(
        &self,
        subject: &Member,
        id: &DeploymentId,
    ) -> Result<(Vec<String>, Deployment)> {
        let deployment = self.inspect(subject, id).await?;
        let lines = self.logs.for_deployment(id).lines()?;
        Ok((lines, deployment))
    }

    /// Finished deployments, most recently started first.
    pub async fn history(
        &self,
        subject: &Member,
        environment: &EnvironmentId,
    ) -> Result<Vec<Deployment>> {
        self.visible_to(subject, self.store.history(environment)).await
    }

    /// Deployments that have not finished yet, oldest first.
    pub async fn upcoming(
        &self,
        subject: &Member,
        environment: &EnvironmentId,
    ) -> Result<Vec<Deployment>> {
        self.visible_to(subject, self.store.upcoming(environment)).await
    }

    /// The deployment currently live on the environment, if any.
    pub async fn current_build(
        &self,
        subject: &Member,
        environment: &EnvironmentId,
    ) -> Result<Option<Deployment>> {
        let current = self.backend.current_build(environment).await?;
        if let Some(deployment) = &current
            && !self.access.can_view(subject, deployment).await
        {
            return Err(Error::Forbidden(format!(
                "not authorised to view environment {environment}"
            )));
        }
        Ok(current)
    }

    /// Accept a progress or outcome report from the job runner. No
    /// permission guard: this arrives over the trusted worker boundary.
    pub async fn report(&self, id: &DeploymentId, outcome: JobOutcome) -> Result<Deployment> {
        self.machine.apply(id, outcome.transition()).await
    }

    async fn snapshot(
        &self,
        environment: &EnvironmentId,
        reference: &str,
    ) -> Result<EnvironmentSnapshot> {
        let resolved_sha = self.backend.resolve_revision(environment, reference).await?;
        let current_build = self.backend.current_build(environment).await?;
        Ok(EnvironmentSnapshot {
            environment: environment.clone(),
            current_build,
            resolved_sha,
        })
    }

    async fn visible_to(
        &self,
        subject: &Member,
        deployments: Vec<Deployment>,
    ) -> Result<Vec<Deployment>> {
        let mut visible = Vec::with_capacity(deployments.len());
        for deployment in deployments {
            if self.access.can_view(subject, &deployment).await {
                visible.push(deployment);
            }
        }
        Ok(visible)
    }

    fn load(&self, id: &DeploymentId) -> Result<Deployment> {
        self.store
            .get(id)
            .ok_or_else(|| Error::NotFound(format!("deployment {id} does not exist")))
    }

    async fn ensure_can_deploy(
        &self,
        subject: &Member,
        environment: &EnvironmentId,
    ) -> Result<()> {
        if !self.access.can_deploy(subject, environment).await {
            return Err(Error::Forbidden(format!(
                "not authorised to deploy to environment {environment}"
            )));
        }
        Ok(())
    }
}
