//! Client boundary for observing the cluster
//!
//! Assertions never talk to the API server directly. They receive an
//! [`ObjectClient`] for one resource kind, which lets poll loops run against
//! a fake in unit tests and against kube-rs in e2e suites.

use std::fmt;
use std::marker::PhantomData;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{Deployment, ReplicaSet, StatefulSet};
use k8s_openapi::NamespaceResourceScope;
use kube::api::{Api, DeleteParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config, Resource};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::classify::ClientError;
use crate::Error;

/// Identity of the object being observed
///
/// A missing namespace means the object is cluster-scoped.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    /// Object name
    pub name: String,
    /// Namespace, `None` for cluster-scoped objects
    pub namespace: Option<String>,
}

impl ObjectRef {
    /// Reference a namespaced object
    pub fn namespaced(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: Some(namespace.into()),
        }
    }

    /// Reference a cluster-scoped object
    pub fn cluster(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
        }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}/{}", ns, self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Fetch and delete capability for a single resource kind
#[async_trait]
pub trait ObjectClient: Send + Sync {
    /// Type returned by `fetch`
    type Object: Send;

    /// Resource kind, used in log lines and errors
    fn kind(&self) -> &'static str;

    /// Read one object by identity
    async fn fetch(&self, target: &ObjectRef) -> Result<Self::Object, ClientError>;

    /// Request deletion of one object
    async fn delete(&self, target: &ObjectRef) -> Result<(), ClientError>;
}

/// Label for an object of a client's kind, e.g. "Deployment ns/name"
pub fn describe<C: ObjectClient + ?Sized>(client: &C, target: &ObjectRef) -> String {
    format!("{} {}", client.kind(), target)
}

/// Objects with a replica count that becomes ready over time
pub trait Scalable {
    /// Replicas currently reported ready
    fn ready_replicas(&self) -> i32;

    /// Replicas requested in the spec, if set
    fn desired_replicas(&self) -> Option<i32>;
}

impl Scalable for Deployment {
    fn ready_replicas(&self) -> i32 {
        self.status
            .as_ref()
            .and_then(|s| s.ready_replicas)
            .unwrap_or(0)
    }

    fn desired_replicas(&self) -> Option<i32> {
        self.spec.as_ref().and_then(|s| s.replicas)
    }
}

impl Scalable for StatefulSet {
    fn ready_replicas(&self) -> i32 {
        self.status
            .as_ref()
            .and_then(|s| s.ready_replicas)
            .unwrap_or(0)
    }

    fn desired_replicas(&self) -> Option<i32> {
        self.spec.as_ref().and_then(|s| s.replicas)
    }
}

impl Scalable for ReplicaSet {
    fn ready_replicas(&self) -> i32 {
        self.status
            .as_ref()
            .and_then(|s| s.ready_replicas)
            .unwrap_or(0)
    }

    fn desired_replicas(&self) -> Option<i32> {
        self.spec.as_ref().and_then(|s| s.replicas)
    }
}

/// [`ObjectClient`] backed by a kube-rs [`Client`]
pub struct KubeObjectClient<K> {
    client: Client,
    kind: &'static str,
    make_api: fn(Client, Option<&str>) -> Api<K>,
    _marker: PhantomData<fn() -> K>,
}

impl<K> KubeObjectClient<K>
where
    K: Resource<DynamicType = ()> + k8s_openapi::Resource,
{
    /// Client for a cluster-scoped kind; target namespaces are ignored
    pub fn cluster(client: Client) -> Self {
        Self {
            client,
            kind: K::KIND,
            make_api: |client, _| Api::all(client),
            _marker: PhantomData,
        }
    }
}

impl<K> KubeObjectClient<K>
where
    K: Resource<DynamicType = (), Scope = NamespaceResourceScope> + k8s_openapi::Resource,
{
    /// Client for a namespaced kind
    ///
    /// Targets without a namespace resolve against the client's default
    /// namespace.
    pub fn namespaced(client: Client) -> Self {
        Self {
            client,
            kind: K::KIND,
            make_api: |client, ns| match ns {
                Some(ns) => Api::namespaced(client, ns),
                None => Api::default_namespaced(client),
            },
            _marker: PhantomData,
        }
    }
}

impl<K> KubeObjectClient<K> {
    fn api(&self, target: &ObjectRef) -> Api<K> {
        (self.make_api)(self.client.clone(), target.namespace.as_deref())
    }
}

#[async_trait]
impl<K> ObjectClient for KubeObjectClient<K>
where
    K: Clone + DeserializeOwned + fmt::Debug + Send + Sync + 'static,
{
    type Object = K;

    fn kind(&self) -> &'static str {
        self.kind
    }

    async fn fetch(&self, target: &ObjectRef) -> Result<K, ClientError> {
        Ok(self.api(target).get(&target.name).await?)
    }

    async fn delete(&self, target: &ObjectRef) -> Result<(), ClientError> {
        let result = self
            .api(target)
            .delete(&target.name, &DeleteParams::default())
            .await?;
        if result.is_right() {
            debug!(object = %target, "Delete request accepted, object removed");
        } else {
            debug!(object = %target, "Delete request accepted, finalizers pending");
        }
        Ok(())
    }
}

/// Default connection timeout for kube clients
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default read timeout for kube clients
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Create a kube client from an optional kubeconfig path and context
///
/// Without a path or context the config is inferred (in-cluster or
/// `KUBECONFIG`). A context without a path selects that context from the
/// default kubeconfig.
pub async fn create_client(
    kubeconfig: Option<&Path>,
    context: Option<&str>,
) -> Result<Client, Error> {
    let options = KubeConfigOptions {
        context: context.map(str::to_string),
        ..Default::default()
    };
    let mut config = match (kubeconfig, context) {
        (Some(path), _) => {
            let kubeconfig = Kubeconfig::read_from(path)
                .map_err(|e| Error::client_config(format!("failed to read kubeconfig: {}", e)))?;
            Config::from_custom_kubeconfig(kubeconfig, &options)
                .await
                .map_err(|e| Error::client_config(format!("failed to load kubeconfig: {}", e)))?
        }
        (None, Some(_)) => Config::from_kubeconfig(&options)
            .await
            .map_err(|e| Error::client_config(format!("failed to load kubeconfig: {}", e)))?,
        (None, None) => Config::infer()
            .await
            .map_err(|e| Error::client_config(format!("failed to infer config: {}", e)))?,
    };
    config.connect_timeout = Some(DEFAULT_CONNECT_TIMEOUT);
    config.read_timeout = Some(DEFAULT_READ_TIMEOUT);
    Client::try_from(config)
        .map_err(|e| Error::client_config(format!("failed to create client: {}", e)))
}
