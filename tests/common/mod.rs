//! Common test utilities for reconcile tests
//!
//! Provides an in-memory `ObjectStore` that records every call and payload,
//! emulates resourceVersion conflicts and finalizer-gated deletion, and can be
//! told to fail the next call of a given kind.

#![allow(dead_code, reason = "each test binary uses a different subset of helpers")]

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Container, PodSpec, PodTemplateSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::Resource;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use workload_controller::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Get,
    Create,
    Replace,
    ReplaceStatus,
}

#[derive(Debug, Clone, Copy)]
pub enum Failure {
    Unavailable,
    Conflict,
    Invalid,
}

#[derive(Debug, Clone)]
pub struct StoreCall {
    pub op: Op,
    pub kind: String,
    pub namespace: String,
    pub name: String,
    pub payload: Option<Value>,
}

type Key = (String, String, String);

#[derive(Debug, Default)]
struct State {
    objects: BTreeMap<Key, Value>,
    calls: Vec<StoreCall>,
    failures: HashMap<(Op, String), Failure>,
    next_version: u64,
}

impl State {
    fn bump(&mut self) -> String {
        self.next_version += 1;
        self.next_version.to_string()
    }
}

#[derive(Debug, Default)]
pub struct FakeStore {
    state: Mutex<State>,
}

fn kind<K: StoreObject>() -> String {
    K::kind(&()).to_string()
}

fn store_key(kind: &str, namespace: &str, name: &str) -> Key {
    (kind.to_string(), namespace.to_string(), name.to_string())
}

fn name_of(value: &Value) -> String {
    value["metadata"]["name"].as_str().unwrap_or_default().to_string()
}

fn encode<K: StoreObject>(obj: &K) -> Result<Value, StoreError> {
    serde_json::to_value(obj).map_err(|source| StoreError::Serialization {
        kind: kind::<K>(),
        source,
    })
}

fn decode<K: StoreObject>(value: Value) -> Result<K, StoreError> {
    serde_json::from_value(value).map_err(|source| StoreError::Serialization {
        kind: kind::<K>(),
        source,
    })
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object without recording a call. Assigns uid and resourceVersion.
    pub fn insert<K: StoreObject>(&self, obj: &K) {
        let mut value = serde_json::to_value(obj).unwrap();
        let mut state = self.state.lock().unwrap();
        let version = state.bump();
        let name = name_of(&value);
        let namespace = value["metadata"]["namespace"].as_str().unwrap_or_default().to_string();
        let meta = &mut value["metadata"];
        if meta.get("uid").map_or(true, Value::is_null) {
            meta["uid"] = json!(format!("uid-{name}"));
        }
        meta["resourceVersion"] = json!(version);
        state.objects.insert(store_key(&kind::<K>(), &namespace, &name), value);
    }

    pub fn object<K: StoreObject>(&self, namespace: &str, name: &str) -> Option<K> {
        let state = self.state.lock().unwrap();
        state
            .objects
            .get(&store_key(&kind::<K>(), namespace, name))
            .map(|v| serde_json::from_value(v.clone()).unwrap())
    }

    pub fn contains(&self, kind: &str, namespace: &str, name: &str) -> bool {
        self.state.lock().unwrap().objects.contains_key(&store_key(kind, namespace, name))
    }

    /// Mutate a stored object in place, as another actor would.
    pub fn modify(&self, kind: &str, namespace: &str, name: &str, f: impl FnOnce(&mut Value)) {
        let mut state = self.state.lock().unwrap();
        let version = state.bump();
        let value = state
            .objects
            .get_mut(&store_key(kind, namespace, name))
            .unwrap_or_else(|| panic!("{kind} {namespace}/{name} not in store"));
        f(value);
        value["metadata"]["resourceVersion"] = json!(version);
    }

    /// Set a child's status as its own controller would.
    pub fn set_status(&self, kind: &str, namespace: &str, name: &str, status: Value) {
        self.modify(kind, namespace, name, |v| v["status"] = status);
    }

    /// Request deletion: stamp `deletionTimestamp`.
    pub fn mark_deleted(&self, kind: &str, namespace: &str, name: &str) {
        self.modify(kind, namespace, name, |v| {
            v["metadata"]["deletionTimestamp"] = json!("2026-10-16T10:00:00Z");
        });
    }

    /// Fail the next `op` on `kind`.
    pub fn fail_next(&self, op: Op, kind: &str, failure: Failure) {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert((op, kind.to_string()), failure);
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count(&self, op: Op, kind: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.op == op && c.kind == kind)
            .count()
    }

    /// Number of create/replace/replace_status calls.
    pub fn writes(&self) -> usize {
        self.calls().iter().filter(|c| c.op != Op::Get).count()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    fn begin(
        state: &mut State,
        op: Op,
        kind: &str,
        namespace: &str,
        name: &str,
        payload: Option<Value>,
    ) -> Result<(), StoreError> {
        state.calls.push(StoreCall {
            op,
            kind: kind.to_string(),
            namespace: namespace.to_string(),
            name: name.to_string(),
            payload,
        });
        match state.failures.remove(&(op, kind.to_string())) {
            None => Ok(()),
            Some(Failure::Unavailable) => {
                Err(StoreError::Unavailable("injected outage".to_string()))
            }
            Some(Failure::Conflict) => Err(conflict(kind, namespace, name, "injected conflict")),
            Some(Failure::Invalid) => Err(invalid(kind, namespace, name, "injected rejection")),
        }
    }
}

fn conflict(kind: &str, namespace: &str, name: &str, message: &str) -> StoreError {
    StoreError::Conflict {
        kind: kind.to_string(),
        namespace: namespace.to_string(),
        name: name.to_string(),
        message: message.to_string(),
    }
}

fn invalid(kind: &str, namespace: &str, name: &str, message: &str) -> StoreError {
    StoreError::Invalid {
        kind: kind.to_string(),
        namespace: namespace.to_string(),
        name: name.to_string(),
        message: message.to_string(),
    }
}

fn not_found(kind: &str, namespace: &str, name: &str) -> StoreError {
    StoreError::NotFound {
        kind: kind.to_string(),
        namespace: namespace.to_string(),
        name: name.to_string(),
    }
}

/// Writes must carry the stored resourceVersion when they carry one at all.
fn check_version(stored: &Value, payload: &Value, kind: &str, namespace: &str, name: &str) -> Result<(), StoreError> {
    let sent = &payload["metadata"]["resourceVersion"];
    if !sent.is_null() && *sent != stored["metadata"]["resourceVersion"] {
        return Err(conflict(kind, namespace, name, "the object has been modified"));
    }
    Ok(())
}

#[async_trait]
impl ObjectStore for FakeStore {
    async fn get<K: StoreObject>(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<K>, StoreError> {
        let kind = kind::<K>();
        let mut state = self.state.lock().unwrap();
        Self::begin(&mut state, Op::Get, &kind, namespace, name, None)?;
        match state.objects.get(&store_key(&kind, namespace, name)) {
            Some(value) => decode(value.clone()).map(Some),
            None => Ok(None),
        }
    }

    async fn create<K: StoreObject>(&self, namespace: &str, obj: &K) -> Result<K, StoreError> {
        let kind = kind::<K>();
        let mut value = encode(obj)?;
        let name = name_of(&value);
        let mut state = self.state.lock().unwrap();
        Self::begin(&mut state, Op::Create, &kind, namespace, &name, Some(value.clone()))?;

        let object_key = store_key(&kind, namespace, &name);
        if state.objects.contains_key(&object_key) {
            return Err(conflict(&kind, namespace, &name, "already exists"));
        }
        let version = state.bump();
        value["metadata"]["uid"] = json!(format!("uid-{}-{name}", kind.to_lowercase()));
        value["metadata"]["resourceVersion"] = json!(version);
        state.objects.insert(object_key, value.clone());
        decode(value)
    }

    async fn replace<K: StoreObject>(&self, namespace: &str, obj: &K) -> Result<K, StoreError> {
        let kind = kind::<K>();
        let mut value = encode(obj)?;
        let name = name_of(&value);
        let mut state = self.state.lock().unwrap();
        Self::begin(&mut state, Op::Replace, &kind, namespace, &name, Some(value.clone()))?;

        let object_key = store_key(&kind, namespace, &name);
        let stored = state
            .objects
            .get(&object_key)
            .cloned()
            .ok_or_else(|| not_found(&kind, namespace, &name))?;
        check_version(&stored, &value, &kind, namespace, &name)?;
        if kind == "Job" && value["spec"]["template"] != stored["spec"]["template"] {
            return Err(invalid(
                &kind,
                namespace,
                &name,
                "spec.template: Invalid value: field is immutable",
            ));
        }

        // status is only writable through the status subresource
        match stored.get("status") {
            Some(status) => value["status"] = status.clone(),
            None => {
                if let Some(map) = value.as_object_mut() {
                    map.remove("status");
                }
            }
        }
        value["metadata"]["uid"] = stored["metadata"]["uid"].clone();
        if !stored["metadata"]["deletionTimestamp"].is_null() {
            value["metadata"]["deletionTimestamp"] = stored["metadata"]["deletionTimestamp"].clone();
        }
        let version = state.bump();
        value["metadata"]["resourceVersion"] = json!(version);

        let released = !value["metadata"]["deletionTimestamp"].is_null()
            && value["metadata"]["finalizers"]
                .as_array()
                .map_or(true, Vec::is_empty);
        if released {
            state.objects.remove(&object_key);
        } else {
            state.objects.insert(object_key, value.clone());
        }
        decode(value)
    }

    async fn replace_status<K: StoreObject>(
        &self,
        namespace: &str,
        obj: &K,
    ) -> Result<K, StoreError> {
        let kind = kind::<K>();
        let value = encode(obj)?;
        let name = name_of(&value);
        let mut state = self.state.lock().unwrap();
        Self::begin(&mut state, Op::ReplaceStatus, &kind, namespace, &name, Some(value.clone()))?;

        let object_key = store_key(&kind, namespace, &name);
        let mut stored = state
            .objects
            .get(&object_key)
            .cloned()
            .ok_or_else(|| not_found(&kind, namespace, &name))?;
        check_version(&stored, &value, &kind, namespace, &name)?;

        stored["status"] = value.get("status").cloned().unwrap_or(Value::Null);
        let version = state.bump();
        stored["metadata"]["resourceVersion"] = json!(version);
        state.objects.insert(object_key, stored.clone());
        decode(stored)
    }
}

/// Cleanup hook that counts invocations and can be told to fail.
#[derive(Debug, Default)]
pub struct RecordingCleanup {
    pub calls: AtomicUsize,
    pub fail: bool,
}

impl RecordingCleanup {
    pub fn failing() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: true,
        }
    }

    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CleanupHook for RecordingCleanup {
    async fn cleanup(&self, _kind: &str, key: &WorkloadKey) -> anyhow::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            anyhow::bail!("external resource for {key} is still in use");
        }
        Ok(())
    }
}

pub const NAMESPACE: &str = "research";

pub fn workload_spec(image: &str) -> WorkloadSpec {
    WorkloadSpec {
        template: PodTemplateSpec {
            metadata: None,
            spec: Some(PodSpec {
                containers: vec![Container {
                    name: "main".to_string(),
                    image: Some(image.to_string()),
                    ..Container::default()
                }],
                ..PodSpec::default()
            }),
        },
        ..WorkloadSpec::default()
    }
}

fn meta(name: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(NAMESPACE.to_string()),
        labels: Some(BTreeMap::from([("app".to_string(), name.to_string())])),
        ..ObjectMeta::default()
    }
}

pub fn notebook(name: &str) -> Notebook {
    let mut nb = Notebook::new(
        name,
        NotebookSpec {
            workload: workload_spec("jupyter/base-notebook:latest"),
        },
    );
    nb.metadata = meta(name);
    nb
}

pub fn batch_job(name: &str) -> BatchJob {
    let mut bj = BatchJob::new(
        name,
        BatchJobSpec {
            workload: workload_spec("registry.local/train:1.2"),
        },
    );
    bj.metadata = meta(name);
    bj
}

/// Engine over a fresh store, with a recording cleanup hook.
pub fn engine() -> (Reconciler<FakeStore>, Arc<RecordingCleanup>) {
    engine_with_cleanup(RecordingCleanup::default())
}

pub fn engine_with_cleanup(cleanup: RecordingCleanup) -> (Reconciler<FakeStore>, Arc<RecordingCleanup>) {
    let cleanup = Arc::new(cleanup);
    let reconciler = Reconciler::new(
        FakeStore::new(),
        Arc::clone(&cleanup) as Arc<dyn CleanupHook>,
        std::time::Duration::from_secs(30),
    );
    (reconciler, cleanup)
}

pub fn key(name: &str) -> WorkloadKey {
    WorkloadKey::new(NAMESPACE, name)
}
