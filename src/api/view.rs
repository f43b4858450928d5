// ABOUTME: Read-only deployment projection handed to UI and API clients.
// ABOUTME: Timestamps carry a raw RFC 3339 form and a human-friendly rendering.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::backend::CommitDetails;
use crate::deploy::{Change, Deployment, State};
use crate::types::Member;

use super::context::RequestScope;

const NICE_FORMAT: &str = "%d/%m/%Y %H:%M";

/// A project member as shown in deployment listings.
#[derive(Debug, Clone, Serialize)]
pub struct MemberView {
    pub id: String,
    pub name: String,
    pub email: String,
    /// `None` for admins or operations users outside the project roles.
    pub role: Option<String>,
}

impl MemberView {
    fn build(member: &Member, scope: &RequestScope) -> Self {
        Self {
            id: member.id.to_string(),
            name: member.name.clone(),
            email: member.email.clone(),
            role: scope.role_of(member),
        }
    }
}

/// The read-only projection of one deployment record.
#[derive(Debug, Clone, Serialize)]
pub struct DeploymentView {
    pub id: String,
    pub date_created: String,
    pub date_created_nice: String,
    pub date_requested: String,
    pub date_requested_nice: String,
    pub date_started: String,
    pub date_started_nice: String,
    pub date_updated: String,
    pub date_updated_nice: String,
    pub summary: String,
    pub branch: String,
    pub sha: String,
    pub short_sha: String,
    pub ref_type: String,
    pub commit_message: Option<String>,
    pub commit_url: Option<String>,
    pub changes: Vec<Change>,
    pub deployer: Option<MemberView>,
    pub approver: Option<MemberView>,
    pub state: State,
    pub is_current_build: bool,
}

impl DeploymentView {
    pub fn build(
        deployment: &Deployment,
        scope: &RequestScope,
        commit: Option<CommitDetails>,
    ) -> Self {
        let (date_created, date_created_nice) = render(deployment.created);
        let (date_requested, date_requested_nice) = render(deployment.requested_or_created());
        let (date_started, date_started_nice) = render(deployment.started_or_created());
        let (date_updated, date_updated_nice) = render(deployment.last_updated);

        Self {
            id: deployment.id.to_string(),
            date_created,
            date_created_nice,
            date_requested,
            date_requested_nice,
            date_started,
            date_started_nice,
            date_updated,
            date_updated_nice,
            summary: deployment.summary.clone(),
            branch: deployment.branch.clone(),
            sha: deployment.sha.to_string(),
            short_sha: deployment.sha.short().to_string(),
            ref_type: deployment.ref_type.to_string(),
            commit_message: commit.as_ref().map(|c| c.message.clone()),
            commit_url: commit.map(|c| c.url),
            changes: deployment.strategy.changes.clone(),
            deployer: Some(MemberView::build(&deployment.deployer, scope)),
            approver: deployment
                .approver
                .as_ref()
                .map(|approver| MemberView::build(approver, scope)),
            state: deployment.state,
            is_current_build: scope.is_current_build(deployment),
        }
    }
}

fn render(moment: DateTime<Utc>) -> (String, String) {
    (
        moment.to_rfc3339(),
        moment.format(NICE_FORMAT).to_string(),
    )
}
