//! # Object Store
//!
//! The CRUD surface the reconciler needs from the desired-state store.
//!
//! `KubeStore` implements it against the Kubernetes API server. Tests drive the
//! reconciler through an in-memory implementation so every call and payload can be
//! inspected.

mod api;

pub use api::KubeStore;

use async_trait::async_trait;
use k8s_openapi::NamespaceResourceScope;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use thiserror::Error;

/// Any namespaced resource the store can read and write.
pub trait StoreObject:
    ::kube::Resource<Scope = NamespaceResourceScope, DynamicType = ()>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
}

impl<K> StoreObject for K where
    K: ::kube::Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Clone
        + Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static
{
}

/// Store failures, classified at the call site.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} {namespace}/{name} not found")]
    NotFound {
        kind: String,
        namespace: String,
        name: String,
    },
    /// Optimistic-concurrency conflict (stale resourceVersion) or name collision.
    #[error("conflict writing {kind} {namespace}/{name}: {message}")]
    Conflict {
        kind: String,
        namespace: String,
        name: String,
        message: String,
    },
    /// The API server rejected the object (HTTP 422), e.g. an immutable field changed.
    /// Retrying the same write cannot succeed.
    #[error("{kind} {namespace}/{name} rejected as invalid: {message}")]
    Invalid {
        kind: String,
        namespace: String,
        name: String,
        message: String,
    },
    #[error("request for {kind} {namespace}/{name} failed: {source}")]
    Api {
        kind: String,
        namespace: String,
        name: String,
        #[source]
        source: ::kube::Error,
    },
    /// Transport failure, throttling or a server-side error.
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("failed to encode {kind} payload: {source}")]
    Serialization {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }

    #[must_use]
    pub fn is_invalid(&self) -> bool {
        matches!(self, StoreError::Invalid { .. })
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// CRUD operations against the desired-state store.
///
/// Writes carry the object's `metadata.resourceVersion`; a stale version fails with
/// [`StoreError::Conflict`].
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch an object, `Ok(None)` when it does not exist.
    async fn get<K: StoreObject>(&self, namespace: &str, name: &str)
        -> Result<Option<K>, StoreError>;

    /// Create an object exactly as given.
    async fn create<K: StoreObject>(&self, namespace: &str, obj: &K) -> Result<K, StoreError>;

    /// Replace an object's metadata and spec. The status subtree is left untouched.
    async fn replace<K: StoreObject>(&self, namespace: &str, obj: &K) -> Result<K, StoreError>;

    /// Write an object's status subtree.
    async fn replace_status<K: StoreObject>(
        &self,
        namespace: &str,
        obj: &K,
    ) -> Result<K, StoreError>;
}

/// Kind string used in errors and logs.
pub(crate) fn kind_of<K: StoreObject>() -> String {
    K::kind(&()).to_string()
}
