//! # Kubernetes Store
//!
//! `ObjectStore` backed by the API server through `kube::Api`.

use super::{kind_of, ObjectStore, StoreError, StoreObject};
use async_trait::async_trait;
use kube::api::{Api, Patch, PatchParams, PostParams};
use kube::{Client, ResourceExt};
use tracing::trace;

/// Store implementation talking to the Kubernetes API server.
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
    field_manager: String,
}

impl std::fmt::Debug for KubeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeStore")
            .field("field_manager", &self.field_manager)
            .finish_non_exhaustive()
    }
}

impl KubeStore {
    #[must_use]
    pub fn new(client: Client, field_manager: impl Into<String>) -> Self {
        Self {
            client,
            field_manager: field_manager.into(),
        }
    }

    #[must_use]
    pub fn client(&self) -> &Client {
        &self.client
    }

    fn api<K: StoreObject>(&self, namespace: &str) -> Api<K> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn post_params(&self) -> PostParams {
        PostParams {
            dry_run: false,
            field_manager: Some(self.field_manager.clone()),
        }
    }
}

/// How an HTTP status from the API server is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ApiFailure {
    NotFound,
    Conflict,
    Invalid,
    Unavailable,
    Other,
}

impl ApiFailure {
    fn from_code(code: u16) -> Self {
        match code {
            404 => ApiFailure::NotFound,
            409 => ApiFailure::Conflict,
            422 => ApiFailure::Invalid,
            429 | 500..=599 => ApiFailure::Unavailable,
            _ => ApiFailure::Other,
        }
    }
}

/// Map an API error onto the store taxonomy.
fn classify<K: StoreObject>(namespace: &str, name: &str, error: kube::Error) -> StoreError {
    let kind = kind_of::<K>();
    let namespace = namespace.to_string();
    let name = name.to_string();

    if let kube::Error::Api(response) = &error {
        let message = response.message.clone();
        match ApiFailure::from_code(response.code) {
            ApiFailure::NotFound => {
                return StoreError::NotFound {
                    kind,
                    namespace,
                    name,
                }
            }
            ApiFailure::Conflict => {
                return StoreError::Conflict {
                    kind,
                    namespace,
                    name,
                    message,
                }
            }
            ApiFailure::Invalid => {
                return StoreError::Invalid {
                    kind,
                    namespace,
                    name,
                    message,
                }
            }
            ApiFailure::Unavailable => {
                return StoreError::Unavailable(format!(
                    "{kind} {namespace}/{name}: {message} ({})",
                    response.code
                ))
            }
            ApiFailure::Other => {}
        }
    }

    if matches!(error, kube::Error::HyperError(_) | kube::Error::Service(_)) {
        return StoreError::Unavailable(format!("{kind} {namespace}/{name}: {error}"));
    }
    StoreError::Api {
        kind,
        namespace,
        name,
        source: error,
    }
}

#[async_trait]
impl ObjectStore for KubeStore {
    async fn get<K: StoreObject>(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<K>, StoreError> {
        trace!(kind = %kind_of::<K>(), namespace, name, "store.get");
        self.api::<K>(namespace)
            .get_opt(name)
            .await
            .map_err(|e| classify::<K>(namespace, name, e))
    }

    async fn create<K: StoreObject>(&self, namespace: &str, obj: &K) -> Result<K, StoreError> {
        let name = obj.name_any();
        trace!(kind = %kind_of::<K>(), namespace, name = %name, "store.create");
        self.api::<K>(namespace)
            .create(&self.post_params(), obj)
            .await
            .map_err(|e| classify::<K>(namespace, &name, e))
    }

    async fn replace<K: StoreObject>(&self, namespace: &str, obj: &K) -> Result<K, StoreError> {
        let name = obj.name_any();
        trace!(kind = %kind_of::<K>(), namespace, name = %name, "store.replace");
        self.api::<K>(namespace)
            .replace(&name, &self.post_params(), obj)
            .await
            .map_err(|e| classify::<K>(namespace, &name, e))
    }

    async fn replace_status<K: StoreObject>(
        &self,
        namespace: &str,
        obj: &K,
    ) -> Result<K, StoreError> {
        let name = obj.name_any();
        trace!(kind = %kind_of::<K>(), namespace, name = %name, "store.replace_status");

        let encoded = serde_json::to_value(obj).map_err(|source| StoreError::Serialization {
            kind: kind_of::<K>(),
            source,
        })?;
        // resourceVersion in a merge patch makes the API server enforce optimistic concurrency
        let patch = serde_json::json!({
            "metadata": { "resourceVersion": obj.resource_version() },
            "status": encoded.get("status").cloned().unwrap_or(serde_json::Value::Null),
        });

        self.api::<K>(namespace)
            .patch_status(
                &name,
                &PatchParams {
                    field_manager: Some(self.field_manager.clone()),
                    ..PatchParams::default()
                },
                &Patch::Merge(&patch),
            )
            .await
            .map_err(|e| classify::<K>(namespace, &name, e))
    }
}
