//! Test helpers for integration tests
//!
//! A single kind cluster is shared by every story in the binary; each story
//! works in its own namespace.

use std::process::Command;
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, DeleteParams, PostParams};
use kube::Client;
use kube_converge::create_client;
use kube_converge::telemetry::{init_logging, LogFormat};
use tracing::info;

/// Name of the kind cluster used for integration tests
pub const TEST_CLUSTER_NAME: &str = "kube-converge-test";

/// Outcome of bringing the cluster up, shared by every test thread
static CLUSTER_INIT: OnceLock<Result<(), String>> = OnceLock::new();

/// Run `kind` with the given arguments and return its stdout
fn kind(args: &[&str]) -> Result<String, String> {
    let output = Command::new("kind")
        .args(args)
        .output()
        .map_err(|e| format!("kind {}: {e}", args.join(" ")))?;
    if !output.status.success() {
        return Err(format!(
            "kind {} exited with {}: {}",
            args.join(" "),
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        ));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Reuse the named kind cluster, creating it on first use
fn bring_up_cluster(name: &str) -> Result<(), String> {
    let existing = kind(&["get", "clusters"])?;
    if existing.lines().map(str::trim).any(|cluster| cluster == name) {
        info!(cluster = name, "Reusing kind cluster");
        return Ok(());
    }

    info!(cluster = name, "Creating kind cluster");
    kind(&["create", "cluster", "--name", name, "--wait", "60s"]).map(|_| ())
}

/// Ensure the test cluster is ready and return a client pinned to it
///
/// The cluster is created at most once per test binary. Each call returns a
/// fresh client; clients are not shared across test threads.
pub async fn ensure_test_cluster() -> Result<Client, String> {
    init_logging(LogFormat::from_env());

    CLUSTER_INIT
        .get_or_init(|| bring_up_cluster(TEST_CLUSTER_NAME))
        .clone()?;

    let context = format!("kind-{TEST_CLUSTER_NAME}");
    create_client(None, Some(&context))
        .await
        .map_err(|e| e.to_string())
}

/// Create a namespace with a unique suffix and return its name
pub async fn create_test_namespace(client: &Client, prefix: &str) -> Result<String, String> {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() % 1_000_000)
        .unwrap_or_default();
    let name = format!("{prefix}-{suffix}");

    let namespaces: Api<Namespace> = Api::all(client.clone());
    let ns = Namespace {
        metadata: ObjectMeta {
            name: Some(name.clone()),
            ..Default::default()
        },
        ..Default::default()
    };
    namespaces
        .create(&PostParams::default(), &ns)
        .await
        .map_err(|e| format!("failed to create namespace {name}: {e}"))?;

    Ok(name)
}

/// Best-effort namespace cleanup
pub async fn delete_test_namespace(client: &Client, name: &str) {
    let namespaces: Api<Namespace> = Api::all(client.clone());
    let _ = namespaces.delete(name, &DeleteParams::default()).await;
}
