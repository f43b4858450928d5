// ABOUTME: The produced interface for UI/API clients: handlers, responses, classification.
// ABOUTME: Enforces anti-forgery tokens and write-verb semantics on mutating operations.

mod context;
mod view;

pub use context::RequestScope;
pub use view::{DeploymentView, MemberView};

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::deploy::{Deployment, Orchestrator, StrategyOptions};
use crate::error::Error;
use crate::types::{DeploymentId, EnvironmentId, Member};

/// The verb of an incoming request. Mutations require `Post`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// Who is calling and with what request envelope.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub subject: Member,
    pub method: Method,
    pub security_token: Option<String>,
}

impl RequestContext {
    pub fn get(subject: Member) -> Self {
        Self {
            subject,
            method: Method::Get,
            security_token: None,
        }
    }

    pub fn post(subject: Member, security_token: impl Into<String>) -> Self {
        Self {
            subject,
            method: Method::Post,
            security_token: Some(security_token.into()),
        }
    }
}

/// Stable classification of an API outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Success,
    Created,
    NotFound,
    Forbidden,
    MethodNotAllowed,
    Conflict,
    Invalid,
    DependencyFailed,
}

impl ResponseStatus {
    /// The machine-checkable code for this classification.
    pub fn code(&self) -> &'static str {
        match self {
            ResponseStatus::Success => "ok",
            ResponseStatus::Created => "created",
            ResponseStatus::NotFound => "not_found",
            ResponseStatus::Forbidden => "forbidden",
            ResponseStatus::MethodNotAllowed => "method_not_allowed",
            ResponseStatus::Conflict => "conflict",
            ResponseStatus::Invalid => "invalid",
            ResponseStatus::DependencyFailed => "dependency_failed",
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            ResponseStatus::Success => 200,
            ResponseStatus::Created => 201,
            ResponseStatus::NotFound => 404,
            ResponseStatus::Forbidden => 403,
            ResponseStatus::MethodNotAllowed => 405,
            ResponseStatus::Conflict => 409,
            ResponseStatus::Invalid => 422,
            ResponseStatus::DependencyFailed => 502,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ResponseStatus::Success | ResponseStatus::Created)
    }
}

/// What every handler returns: a classification, a human message, and the
/// data the caller needs to resynchronize its view.
#[derive(Debug, Serialize)]
pub struct ApiResponse {
    pub status: ResponseStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployment: Option<DeploymentView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list: Option<Vec<DeploymentView>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl ApiResponse {
    fn new(status: ResponseStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            id: None,
            deployment: None,
            list: None,
            log: None,
            location: None,
        }
    }

    fn success(message: impl Into<String>) -> Self {
        Self::new(ResponseStatus::Success, message)
    }

    fn created(message: impl Into<String>) -> Self {
        Self::new(ResponseStatus::Created, message)
    }

    fn method_not_allowed() -> Self {
        Self::new(
            ResponseStatus::MethodNotAllowed,
            "Method not allowed, requires POST",
        )
    }

    /// The JSON body a transport layer would send. Absent fields are omitted
    /// rather than serialized as null.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| {
            serde_json::json!({
                "status": self.status.code(),
                "message": self.message,
            })
        })
    }

    fn from_error(err: &Error) -> Self {
        let status = match err {
            Error::NotFound(_) => ResponseStatus::NotFound,
            Error::Forbidden(_) => ResponseStatus::Forbidden,
            Error::Conflict(_) => ResponseStatus::Conflict,
            Error::Validation(_) => ResponseStatus::Invalid,
            _ => ResponseStatus::DependencyFailed,
        };
        Self::new(status, err.to_string())
    }
}

/// The handler layer a web front or RPC server would mount.
///
/// Anti-forgery and verb checks live here; everything past them delegates to
/// the orchestrator.
pub struct Api {
    orchestrator: Arc<Orchestrator>,
    security_token: String,
}

impl Api {
    pub fn new(orchestrator: Arc<Orchestrator>, security_token: impl Into<String>) -> Self {
        Self {
            orchestrator,
            security_token: security_token.into(),
        }
    }

    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }

    /// Finished deployments for the environment, most recently started first.
    pub async fn history(&self, ctx: &RequestContext, environment: &EnvironmentId) -> ApiResponse {
        match self.orchestrator.history(&ctx.subject, environment).await {
            Ok(deployments) => self.list_response(environment, deployments).await,
            Err(e) => ApiResponse::from_error(&e),
        }
    }

    /// Deployments that have not finished yet, oldest first.
    pub async fn upcoming(&self, ctx: &RequestContext, environment: &EnvironmentId) -> ApiResponse {
        match self.orchestrator.upcoming(&ctx.subject, environment).await {
            Ok(deployments) => self.list_response(environment, deployments).await,
            Err(e) => ApiResponse::from_error(&e),
        }
    }

    /// The deployment currently live on the environment.
    pub async fn current_build(
        &self,
        ctx: &RequestContext,
        environment: &EnvironmentId,
    ) -> ApiResponse {
        match self.orchestrator.current_build(&ctx.subject, environment).await {
            Ok(Some(deployment)) => {
                let mut response = ApiResponse::success("current build");
                response.deployment = self.render_one(environment, &deployment).await;
                response
            }
            Ok(None) => ApiResponse::success("no current build"),
            Err(e) => ApiResponse::from_error(&e),
        }
    }

    /// One deployment record.
    pub async fn show(&self, ctx: &RequestContext, id: &DeploymentId) -> ApiResponse {
        match self.orchestrator.inspect(&ctx.subject, id).await {
            Ok(deployment) => {
                let environment = deployment.environment.clone();
                let mut response = ApiResponse::success("deployment");
                response.id = Some(deployment.id.to_string());
                response.deployment = self.render_one(&environment, &deployment).await;
                response
            }
            Err(e) => ApiResponse::from_error(&e),
        }
    }

    /// The accumulated deployment log, split per line.
    pub async fn log(&self, ctx: &RequestContext, id: &DeploymentId) -> ApiResponse {
        match self.orchestrator.log(&ctx.subject, id).await {
            Ok((lines, deployment)) => {
                let environment = deployment.environment.clone();
                let mut response = ApiResponse::success("deployment log");
                response.log = Some(lines);
                response.deployment = self.render_one(&environment, &deployment).await;
                response
            }
            Err(e) => ApiResponse::from_error(&e),
        }
    }

    /// Plan a deployment from raw request parameters and submit it.
    pub async fn save(
        &self,
        ctx: &RequestContext,
        environment: &EnvironmentId,
        params: &BTreeMap<String, String>,
        approver: Option<Member>,
    ) -> ApiResponse {
        if let Some(rejection) = self.check_mutation(ctx) {
            return rejection;
        }

        let options = match StrategyOptions::from_option_map(params) {
            Ok(options) => options,
            Err(e) => return ApiResponse::new(ResponseStatus::Invalid, e.to_string()),
        };

        let strategy = match self.orchestrator.plan(&ctx.subject, environment, options).await {
            Ok(strategy) => strategy,
            Err(e) => return ApiResponse::from_error(&e),
        };

        match self.orchestrator.submit(&ctx.subject, &strategy, approver).await {
            Ok(deployment) => {
                let mut response = ApiResponse::created("deployment has been created");
                response.id = Some(deployment.id.to_string());
                response.deployment = self.render_one(environment, &deployment).await;
                response
            }
            Err(e) => ApiResponse::from_error(&e),
        }
    }

    /// Queue a submitted deployment for execution.
    pub async fn start(&self, ctx: &RequestContext, id: &DeploymentId) -> ApiResponse {
        if let Some(rejection) = self.check_mutation(ctx) {
            return rejection;
        }

        match self.orchestrator.start(&ctx.subject, id).await {
            Ok(deployment) => {
                let environment = deployment.environment.clone();
                let location = self
                    .orchestrator
                    .logs()
                    .path_for(&deployment.id)
                    .display()
                    .to_string();
                let mut response = ApiResponse::created("deployment has been queued");
                response.id = Some(deployment.id.to_string());
                response.location = Some(location);
                response.deployment = self.render_one(&environment, &deployment).await;
                response
            }
            Err(e) => self.error_with_projection(ctx, id, e).await,
        }
    }

    /// Request the running job to stop.
    pub async fn abort(&self, ctx: &RequestContext, id: &DeploymentId) -> ApiResponse {
        if let Some(rejection) = self.check_mutation(ctx) {
            return rejection;
        }

        match self.orchestrator.abort(&ctx.subject, id).await {
            Ok(()) => ApiResponse::success("abort requested"),
            Err(e) => self.error_with_projection(ctx, id, e).await,
        }
    }

    /// Reject mutations that arrive without POST semantics or with a
    /// non-matching anti-forgery token.
    fn check_mutation(&self, ctx: &RequestContext) -> Option<ApiResponse> {
        if ctx.method != Method::Post {
            return Some(ApiResponse::method_not_allowed());
        }
        if ctx.security_token.as_deref() != Some(self.security_token.as_str()) {
            return Some(ApiResponse::new(
                ResponseStatus::Forbidden,
                "Security token does not match",
            ));
        }
        None
    }

    /// Attach the deployment's current projection to an error response when
    /// the caller may see it, so its UI can resynchronize.
    async fn error_with_projection(
        &self,
        ctx: &RequestContext,
        id: &DeploymentId,
        err: Error,
    ) -> ApiResponse {
        let mut response = ApiResponse::from_error(&err);
        if let Ok(deployment) = self.orchestrator.inspect(&ctx.subject, id).await {
            let environment = deployment.environment.clone();
            response.deployment = self.render_one(&environment, &deployment).await;
        }
        response
    }

    async fn list_response(
        &self,
        environment: &EnvironmentId,
        deployments: Vec<Deployment>,
    ) -> ApiResponse {
        let scope = match RequestScope::load(self.orchestrator.backend(), environment).await {
            Ok(scope) => scope,
            Err(e) => return ApiResponse::from_error(&e),
        };

        let mut list = Vec::with_capacity(deployments.len());
        for deployment in &deployments {
            list.push(self.render(&scope, deployment).await);
        }

        let mut response = ApiResponse::success("deployments");
        response.list = Some(list);
        response
    }

    async fn render_one(
        &self,
        environment: &EnvironmentId,
        deployment: &Deployment,
    ) -> Option<DeploymentView> {
        let scope = RequestScope::load(self.orchestrator.backend(), environment)
            .await
            .ok()?;
        Some(self.render(&scope, deployment).await)
    }

    async fn render(&self, scope: &RequestScope, deployment: &Deployment) -> DeploymentView {
        // Commit metadata is decoration; an unreachable backend must not
        // fail the whole response.
        let commit = self
            .orchestrator
            .backend()
            .commit_details(&deployment.environment, &deployment.sha)
            .await
            .ok()
            .flatten();
        DeploymentView::build(deployment, scope, commit)
    }
}
