//! Integration tests for deployment convergence
//!
//! These tests create real deployments and wait on the deployment controller,
//! the same way an operator e2e suite waits on the workloads its CR installs.

use std::collections::BTreeMap;
use std::time::Duration;

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{Container, PodSpec, PodTemplateSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use kube::api::{Api, PostParams};

use kube_converge::{
    guarded_delete, wait_for_ready_replicas, wait_until_absent, wait_until_visible, ErrorKind,
    Existence, KubeObjectClient, ObjectClient, ObjectRef, PollPolicy,
};

use super::helpers::{create_test_namespace, delete_test_namespace, ensure_test_cluster};

// =============================================================================
// Test Fixtures
// =============================================================================

/// A deployment running the pause image, which becomes ready almost at once
fn pause_deployment(name: &str, replicas: i32) -> Deployment {
    let labels = BTreeMap::from([("app".to_string(), name.to_string())]);
    Deployment {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(replicas),
            selector: LabelSelector {
                match_labels: Some(labels.clone()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![Container {
                        name: "pause".to_string(),
                        image: Some("registry.k8s.io/pause:3.9".to_string()),
                        ..Default::default()
                    }],
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        status: None,
    }
}

fn quick_policy() -> PollPolicy {
    PollPolicy::new(Duration::from_secs(1), Duration::from_secs(5)).expect("valid policy")
}

// =============================================================================
// Stories
// =============================================================================

/// Story: A deployment is created, scales up, and is cleaned up
///
/// Expected behavior:
/// - The deployment becomes visible right after creation
/// - The controller brings two replicas to ready within the API budget
/// - Guarded deletion confirms existence, deletes, and waits for the 404
#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_deployment_scales_up_and_is_cleaned_up() {
    let client = ensure_test_cluster()
        .await
        .expect("failed to setup cluster");
    let ns = create_test_namespace(&client, "converge-deploy")
        .await
        .expect("failed to create namespace");
    let policy = PollPolicy::from_env().expect("valid poll policy");

    let api: Api<Deployment> = Api::namespaced(client.clone(), &ns);
    api.create(&PostParams::default(), &pause_deployment("web", 2))
        .await
        .expect("failed to create deployment");

    let deployments = KubeObjectClient::<Deployment>::namespaced(client.clone());
    let target = ObjectRef::namespaced(ns.as_str(), "web");

    wait_until_visible(&deployments, &target, &policy)
        .await
        .expect("deployment should be visible");
    wait_for_ready_replicas(&deployments, &target, 2, Existence::Confirmed, &policy)
        .await
        .expect("deployment should reach 2 ready replicas");

    guarded_delete(&deployments, &target, &policy)
        .await
        .expect("deployment should be deleted");

    delete_test_namespace(&client, &ns).await;
}

/// Story: Waiting on a deployment nobody creates fails with a timeout
///
/// The API server answers every poll with a 404, which must read as
/// "not there yet", never as a hard failure.
#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_missing_deployment_times_out_and_counts_as_absent() {
    let client = ensure_test_cluster()
        .await
        .expect("failed to setup cluster");
    let deployments = KubeObjectClient::<Deployment>::namespaced(client);
    let target = ObjectRef::namespaced("default", "does-not-exist");

    let err = deployments
        .fetch(&target)
        .await
        .expect_err("fetch of a missing deployment should fail");
    assert_eq!(err.kind, ErrorKind::NotFound);

    let err = wait_until_visible(&deployments, &target, &quick_policy())
        .await
        .expect_err("missing deployment should never become visible");
    assert!(err.is_timeout());
    assert!(err.to_string().contains("Deployment default/does-not-exist"));

    let report = wait_until_absent(&deployments, &target, &quick_policy())
        .await
        .expect("missing deployment is already absent");
    assert_eq!(report.attempts, 1);
}
