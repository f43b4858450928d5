// ABOUTME: Tests for the produced API surface: token checks, verbs, classifications.
// ABOUTME: Verifies projections carry raw and human-friendly fields.

mod support;

use std::collections::BTreeMap;
use std::sync::Arc;

use stagehand::api::{Api, Method, RequestContext, ResponseStatus};
use stagehand::deploy::NO_ACTIVITY;
use stagehand::types::DeploymentId;
use support::{alice, bob, harness, main_options, uat};

const TOKEN: &str = "sekrit";

fn api(h: &support::Harness) -> Api {
    Api::new(Arc::clone(&h.orchestrator), TOKEN)
}

fn save_params() -> BTreeMap<String, String> {
    main_options().to_option_map()
}

#[tokio::test]
async fn save_requires_post() {
    let h = harness();
    let api = api(&h);

    let response = api
        .save(&RequestContext::get(alice()), &uat(), &save_params(), None)
        .await;

    assert_eq!(response.status, ResponseStatus::MethodNotAllowed);
    assert_eq!(response.status.code(), "method_not_allowed");
    assert_eq!(response.status.http_status(), 405);
}

#[tokio::test]
async fn mutations_reject_a_bad_security_token() {
    let h = harness();
    let api = api(&h);
    let ctx = RequestContext::post(alice(), "wrong-token");

    let response = api.save(&ctx, &uat(), &save_params(), None).await;
    assert_eq!(response.status, ResponseStatus::Forbidden);

    let response = api.start(&ctx, &DeploymentId::new("1")).await;
    assert_eq!(response.status, ResponseStatus::Forbidden);

    let response = api.abort(&ctx, &DeploymentId::new("1")).await;
    assert_eq!(response.status, ResponseStatus::Forbidden);

    // Nothing reached the collaborators.
    assert!(h.dispatcher.enqueued.lock().is_empty());
}

#[tokio::test]
async fn save_then_start_walks_the_lifecycle() {
    let h = harness();
    let api = api(&h);
    let ctx = RequestContext::post(alice(), TOKEN);

    let saved = api.save(&ctx, &uat(), &save_params(), Some(bob())).await;
    assert_eq!(saved.status, ResponseStatus::Created);
    assert_eq!(saved.message, "deployment has been created");
    let id = DeploymentId::new(saved.id.expect("id"));
    let view = saved.deployment.expect("projection");
    assert_eq!(view.state, stagehand::deploy::State::Submitted);
    assert_eq!(view.short_sha.len(), 7);
    assert_eq!(view.short_sha, &support::MAIN_SHA[..7]);
    assert!(view.commit_message.is_some());
    assert_eq!(
        view.deployer.as_ref().map(|d| d.role.as_deref()),
        Some(Some("Release manager"))
    );

    let started = api.start(&ctx, &id).await;
    assert_eq!(started.status, ResponseStatus::Created);
    assert_eq!(started.message, "deployment has been queued");
    let location = started.location.expect("log location");
    assert!(location.contains("deployment-"));
    assert_eq!(
        started.deployment.expect("projection").state,
        stagehand::deploy::State::Queued
    );
}

#[tokio::test]
async fn malformed_options_are_invalid() {
    let h = harness();
    let api = api(&h);
    let ctx = RequestContext::post(alice(), TOKEN);

    let mut params = save_params();
    params.remove("branch");

    let response = api.save(&ctx, &uat(), &params, None).await;
    assert_eq!(response.status, ResponseStatus::Invalid);
    assert_eq!(response.status.http_status(), 422);
}

#[tokio::test]
async fn unknown_deployment_is_not_found() {
    let h = harness();
    let api = api(&h);

    let response = api.show(&RequestContext::get(alice()), &DeploymentId::new("99")).await;
    assert_eq!(response.status, ResponseStatus::NotFound);
    assert_eq!(response.status.code(), "not_found");
}

#[tokio::test]
async fn busy_environment_conflict_carries_the_projection() {
    let h = harness();
    let api = api(&h);
    let ctx = RequestContext::post(alice(), TOKEN);

    let first = api.save(&ctx, &uat(), &save_params(), None).await;
    let second = api.save(&ctx, &uat(), &save_params(), None).await;
    let first_id = DeploymentId::new(first.id.unwrap());
    let second_id = DeploymentId::new(second.id.unwrap());

    api.start(&ctx, &first_id).await;
    let response = api.start(&ctx, &second_id).await;

    assert_eq!(response.status, ResponseStatus::Conflict);
    assert_eq!(response.status.http_status(), 409);
    // The caller gets the loser's current projection to resynchronize.
    let view = response.deployment.expect("projection");
    assert_eq!(view.state, stagehand::deploy::State::Submitted);
}

#[tokio::test]
async fn log_endpoint_returns_sentinel_before_activity() {
    let h = harness();
    let api = api(&h);
    let ctx = RequestContext::post(alice(), TOKEN);

    let saved = api.save(&ctx, &uat(), &save_params(), None).await;
    let id = DeploymentId::new(saved.id.unwrap());

    let response = api.log(&RequestContext::get(alice()), &id).await;
    assert_eq!(response.status, ResponseStatus::Success);
    let lines = response.log.expect("log lines");
    assert_eq!(lines, vec![NO_ACTIVITY.to_string()]);
}

#[tokio::test]
async fn listings_and_current_build_render_views() {
    let h = harness();
    let api = api(&h);
    let ctx = RequestContext::post(alice(), TOKEN);

    let saved = api.save(&ctx, &uat(), &save_params(), None).await;
    let id = DeploymentId::new(saved.id.unwrap());

    let upcoming = api.upcoming(&RequestContext::get(alice()), &uat()).await;
    assert_eq!(upcoming.status, ResponseStatus::Success);
    let list = upcoming.list.expect("list");
    assert_eq!(list.len(), 1);
    assert!(!list[0].is_current_build);
    assert!(!list[0].date_created_nice.is_empty());

    // Promote it to the current build and check the flag flips.
    let record = h.orchestrator.inspect(&alice(), &id).await.unwrap();
    h.environment.set_current(record);

    let upcoming = api.upcoming(&RequestContext::get(alice()), &uat()).await;
    assert!(upcoming.list.expect("list")[0].is_current_build);

    let current = api.current_build(&RequestContext::get(alice()), &uat()).await;
    assert_eq!(current.status, ResponseStatus::Success);
    assert!(current.deployment.is_some());
}

#[tokio::test]
async fn json_body_omits_absent_fields() {
    let h = harness();
    let api = api(&h);
    let ctx = RequestContext::post(alice(), TOKEN);

    let saved = api.save(&ctx, &uat(), &save_params(), None).await;
    let body = saved.to_json();

    assert_eq!(body["status"], "created");
    assert_eq!(body["message"], "deployment has been created");
    assert!(body.get("log").is_none(), "unset fields stay off the wire");
    assert!(body.get("location").is_none());
    assert_eq!(body["deployment"]["state"], "submitted");
}

#[tokio::test]
async fn method_and_token_checks_apply_before_existence_checks() {
    let h = harness();
    let api = api(&h);

    // GET on a mutating endpoint with an unknown id: the verb wins.
    let response = api
        .start(&RequestContext::get(alice()), &DeploymentId::new("404"))
        .await;
    assert_eq!(response.status, ResponseStatus::MethodNotAllowed);

    // POST with a valid token on an unknown id falls through to NotFound.
    let ctx = RequestContext::post(alice(), TOKEN);
    assert_eq!(ctx.method, Method::Post);
    let response = api.start(&ctx, &DeploymentId::new("404")).await;
    assert_eq!(response.status, ResponseStatus::NotFound);
}
