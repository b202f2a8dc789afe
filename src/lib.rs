//! kube-converge - convergence assertions for Kubernetes e2e tests
//!
//! Controllers reconcile asynchronously, so an e2e test cannot check state
//! right after applying a change. This crate polls the API server until the
//! cluster converges to what the test expects, and tells "it never happened"
//! apart from "the server rejected it".
//!
//! # Modules
//!
//! - [`classify`] - Map client results to found / absent / transient / fatal
//! - [`poller`] - Generic bounded polling engine
//! - [`assertions`] - Becomes-visible, becomes-absent, reaches-ready-count
//! - [`guard`] - Existence checks and guarded deletion
//! - [`client`] - The fetch/delete client boundary and its kube-rs implementation
//! - [`policy`] - Poll interval and budget configuration
//! - [`telemetry`] - Logging setup for test binaries
//! - [`error`] - Error types
//!
//! # Example
//!
//! ```ignore
//! use k8s_openapi::api::apps::v1::Deployment;
//! use kube_converge::{wait_for_ready_replicas, Existence, KubeObjectClient, ObjectRef, PollPolicy};
//!
//! let deployments = KubeObjectClient::<Deployment>::namespaced(client);
//! let target = ObjectRef::namespaced("tekton-pipelines", "tekton-pipelines-controller");
//! wait_for_ready_replicas(&deployments, &target, 1, Existence::Unknown, &PollPolicy::api()).await?;
//! ```

#![deny(missing_docs)]

pub mod assertions;
pub mod classify;
pub mod client;
pub mod error;
pub mod guard;
pub mod poller;
pub mod policy;
pub mod telemetry;

pub use assertions::{
    wait_for_ready_replicas, wait_until_absent, wait_until_all_absent, wait_until_all_ready,
    wait_until_visible, Existence,
};
pub use classify::{classify, ClientError, ErrorKind, Observation};
pub use client::{create_client, KubeObjectClient, ObjectClient, ObjectRef, Scalable};
pub use error::Error;
pub use guard::{delete_with_retry, ensure_exists, guarded_delete};
pub use poller::{poll_until, Outcome, PollReport, PollState, Probe};
pub use policy::PollPolicy;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;
