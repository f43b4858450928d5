// ABOUTME: Shared test doubles for the external collaborator boundaries.
// ABOUTME: Recording dispatcher/notifier, scripted environment backend, access stubs.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use stagehand::backend::{
    AccessControl, CommitDetails, DispatchError, EnvironmentBackend, EnvironmentError,
    JobDispatcher, Notifier, NotifyError, ProjectMember,
};
use stagehand::config::ReplanPolicy;
use stagehand::deploy::{Deployment, LogDirectory, Orchestrator, StrategyOptions};
use stagehand::types::{EnvironmentId, JobToken, Member, RefType, Sha};

pub const UAT: &str = "uat";
pub const MAIN_SHA: &str = "abc1234def5678abc1234def5678abc1234def56";

pub fn uat() -> EnvironmentId {
    EnvironmentId::new(UAT)
}

pub fn alice() -> Member {
    Member::new("1", "Alice", "alice@example.com")
}

pub fn bob() -> Member {
    Member::new("2", "Bob", "bob@example.com")
}

pub fn main_options() -> StrategyOptions {
    StrategyOptions::new("main", RefType::Branch, "main").with_summary("release")
}

/// Permits everything.
pub struct AllowAll;

#[async_trait]
impl AccessControl for AllowAll {
    async fn can_view(&self, _subject: &Member, _deployment: &Deployment) -> bool {
        true
    }

    async fn can_deploy(&self, _subject: &Member, _environment: &EnvironmentId) -> bool {
        true
    }
}

/// Can look but not touch.
pub struct ViewOnly;

#[async_trait]
impl AccessControl for ViewOnly {
    async fn can_view(&self, _subject: &Member, _deployment: &Deployment) -> bool {
        true
    }

    async fn can_deploy(&self, _subject: &Member, _environment: &EnvironmentId) -> bool {
        false
    }
}

/// Records every enqueue; can be switched to fail.
#[derive(Default)]
pub struct FakeDispatcher {
    pub enqueued: Mutex<Vec<String>>,
    pub fail: AtomicBool,
    next: AtomicU64,
}

#[async_trait]
impl JobDispatcher for FakeDispatcher {
    async fn enqueue(&self, deployment: &Deployment) -> Result<JobToken, DispatchError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(DispatchError::Unreachable("worker pool offline".to_string()));
        }
        self.enqueued.lock().push(deployment.id.to_string());
        let n = self.next.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(JobToken::new(format!("job-{n}")))
    }
}

/// Records every approval request; can be switched to fail.
#[derive(Default)]
pub struct FakeNotifier {
    pub sent: Mutex<Vec<(String, String)>>,
    pub fail: AtomicBool,
}

#[async_trait]
impl Notifier for FakeNotifier {
    async fn approval_requested(
        &self,
        deployment: &Deployment,
        _deployer: &Member,
        approver: &Member,
    ) -> Result<(), NotifyError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotifyError::Send("smtp relay refused".to_string()));
        }
        self.sent
            .lock()
            .push((deployment.id.to_string(), approver.email.clone()));
        Ok(())
    }
}

/// Scripted environment backend: revisions resolve through a map, the current
/// build is whatever the test placed there.
#[derive(Default)]
pub struct FakeEnvironment {
    pub current: Mutex<Option<Deployment>>,
    pub revisions: Mutex<HashMap<String, Sha>>,
    pub members: Mutex<Vec<ProjectMember>>,
}

impl FakeEnvironment {
    pub fn with_main() -> Self {
        let env = Self::default();
        env.revisions
            .lock()
            .insert("main".to_string(), Sha::new(MAIN_SHA).unwrap());
        env.members.lock().push(ProjectMember {
            member: alice(),
            role: Some("Release manager".to_string()),
        });
        env.members.lock().push(ProjectMember {
            member: bob(),
            role: None,
        });
        env
    }

    pub fn set_current(&self, deployment: Deployment) {
        *self.current.lock() = Some(deployment);
    }

    pub fn move_branch(&self, reference: &str, sha: &str) {
        self.revisions
            .lock()
            .insert(reference.to_string(), Sha::new(sha).unwrap());
    }
}

#[async_trait]
impl EnvironmentBackend for FakeEnvironment {
    async fn current_build(
        &self,
        _environment: &EnvironmentId,
    ) -> Result<Option<Deployment>, EnvironmentError> {
        Ok(self.current.lock().clone())
    }

    async fn resolve_revision(
        &self,
        _environment: &EnvironmentId,
        reference: &str,
    ) -> Result<Sha, EnvironmentError> {
        if let Some(sha) = self.revisions.lock().get(reference) {
            return Ok(sha.clone());
        }
        Sha::new(reference).map_err(|_| EnvironmentError::UnknownRevision(reference.to_string()))
    }

    async fn project_members(
        &self,
        _environment: &EnvironmentId,
    ) -> Result<Vec<ProjectMember>, EnvironmentError> {
        Ok(self.members.lock().clone())
    }

    async fn commit_details(
        &self,
        _environment: &EnvironmentId,
        sha: &Sha,
    ) -> Result<Option<CommitDetails>, EnvironmentError> {
        Ok(Some(CommitDetails {
            message: format!("commit {}", sha.short()),
            url: format!("https://git.example.com/commit/{sha}"),
        }))
    }
}

/// Everything a test needs to drive the orchestrator against fakes.
pub struct Harness {
    pub orchestrator: Arc<Orchestrator>,
    pub dispatcher: Arc<FakeDispatcher>,
    pub notifier: Arc<FakeNotifier>,
    pub environment: Arc<FakeEnvironment>,
    pub log_dir: tempfile::TempDir,
}

pub fn harness() -> Harness {
    harness_with(Arc::new(AllowAll), ReplanPolicy::LatestWins)
}

pub fn harness_with(access: Arc<dyn AccessControl>, replan: ReplanPolicy) -> Harness {
    let dispatcher = Arc::new(FakeDispatcher::default());
    let notifier = Arc::new(FakeNotifier::default());
    let environment = Arc::new(FakeEnvironment::with_main());
    let log_dir = tempfile::tempdir().expect("tempdir");

    let orchestrator = Arc::new(Orchestrator::new(
        Arc::clone(&environment) as Arc<dyn EnvironmentBackend>,
        access,
        Arc::clone(&dispatcher) as Arc<dyn JobDispatcher>,
        Arc::clone(&notifier) as Arc<dyn Notifier>,
        LogDirectory::new(log_dir.path()),
        replan,
    ));

    Harness {
        orchestrator,
        dispatcher,
        notifier,
        environment,
        log_dir,
    }
}

impl Harness {
    /// Plan and submit a deployment of `main` as Alice, approved by Bob.
    pub async fn submitted(&self) -> Deployment {
        let strategy = self
            .orchestrator
            .plan(&alice(), &uat(), main_options())
            .await
            .expect("plan");
        self.orchestrator
            .submit(&alice(), &strategy, Some(bob()))
            .await
            .expect("submit")
    }
}
