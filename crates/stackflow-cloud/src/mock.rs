//! In-memory mock backend for orchestrator tests
//!
//! Scripted per-stack behavior (failing calls, no-change updates, slow
//! settling) plus a recorded call log, so tests can assert both outcomes
//! and the exact backend traffic, including that none happened.

use crate::backend::{ClusterAccess, Credentials, OperationHandle, StackBackend, UpdateOutcome};
use crate::error::{CloudError, Result};
use crate::state::OperationState;
use async_trait::async_trait;
use stackflow_core::StackDescriptor;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// Scripted behavior for one stack
#[derive(Debug, Clone, Default)]
pub struct StackBehavior {
    /// `create` is rejected with this message
    pub fail_create: Option<String>,

    /// `update` is rejected with this message
    pub fail_update: Option<String>,

    /// `delete` is rejected with this message
    pub fail_delete: Option<String>,

    /// `update` reports `NoChanges`
    pub update_no_changes: bool,

    /// Number of `InProgress` polls before the operation turns terminal
    pub polls_until_settled: u32,

    /// The operation's terminal state is `Failed` with this reason
    pub operation_failure: Option<String>,

    /// Every poll reports `InProgress`, forever
    pub never_settles: bool,
}

#[derive(Default)]
struct Inner {
    existing: HashSet<String>,
    behaviors: HashMap<String, StackBehavior>,
    outputs: HashMap<String, BTreeMap<String, String>>,
    tagged: Vec<(String, String, String)>,
    calls: Vec<String>,
    seen_descriptors: HashMap<String, StackDescriptor>,
    ops: HashMap<String, OpProgress>,
    next_op: u64,
}

struct OpProgress {
    stack: String,
    polls_done: u32,
}

/// Mock [`StackBackend`] with scripted behavior and a call log
#[derive(Clone, Default)]
pub struct MockStackBackend {
    inner: Arc<Mutex<Inner>>,
}

impl MockStackBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a stack as pre-existing so deploy takes the update path
    pub fn mark_existing(&self, name: &str) {
        self.inner.lock().unwrap().existing.insert(name.to_string());
    }

    pub fn set_behavior(&self, name: &str, behavior: StackBehavior) {
        self.inner
            .lock()
            .unwrap()
            .behaviors
            .insert(name.to_string(), behavior);
    }

    pub fn set_outputs(&self, name: &str, pairs: &[(&str, &str)]) {
        let map = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.inner.lock().unwrap().outputs.insert(name.to_string(), map);
    }

    /// Seed a dangling resource for the residual check
    pub fn add_tagged_resource(&self, key: &str, value: &str, resource_id: &str) {
        self.inner.lock().unwrap().tagged.push((
            key.to_string(),
            value.to_string(),
            resource_id.to_string(),
        ));
    }

    /// Every backend call, in order, as `"<op> <stack>"`
    pub fn calls(&self) -> Vec<String> {
        self.inner.lock().unwrap().calls.clone()
    }

    /// Calls of one kind, in order
    pub fn calls_of(&self, op: &str) -> Vec<String> {
        let prefix = format!("{op} ");
        self.inner
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| c.starts_with(&prefix))
            .map(|c| c[prefix.len()..].to_string())
            .collect()
    }

    /// The descriptor the backend last received for a stack, as resolved
    /// by the orchestrator
    pub fn seen_descriptor(&self, name: &str) -> Option<StackDescriptor> {
        self.inner.lock().unwrap().seen_descriptors.get(name).cloned()
    }

    fn behavior(inner: &Inner, stack: &str) -> StackBehavior {
        inner.behaviors.get(stack).cloned().unwrap_or_default()
    }

    fn start_op(inner: &mut Inner, kind: &str, stack: &str) -> OperationHandle {
        inner.next_op += 1;
        let id = format!("{kind}-{:04}", inner.next_op);
        inner.ops.insert(
            id.clone(),
            OpProgress {
                stack: stack.to_string(),
                polls_done: 0,
            },
        );
        OperationHandle::new(stack, id)
    }
}

#[async_trait]
impl StackBackend for MockStackBackend {
    async fn exists(&self, name: &str) -> Result<bool> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(format!("exists {name}"));
        Ok(inner.existing.contains(name))
    }

    async fn create(&self, stack: &StackDescriptor) -> Result<OperationHandle> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(format!("create {}", stack.name));
        inner
            .seen_descriptors
            .insert(stack.name.clone(), stack.clone());
        if let Some(reason) = Self::behavior(&inner, &stack.name).fail_create {
            return Err(CloudError::Backend(reason));
        }
        inner.existing.insert(stack.name.clone());
        Ok(Self::start_op(&mut inner, "create", &stack.name))
    }

    async fn update(&self, stack: &StackDescriptor) -> Result<UpdateOutcome> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(format!("update {}", stack.name));
        inner
            .seen_descriptors
            .insert(stack.name.clone(), stack.clone());
        let behavior = Self::behavior(&inner, &stack.name);
        if let Some(reason) = behavior.fail_update {
            return Err(CloudError::Backend(reason));
        }
        if behavior.update_no_changes {
            return Ok(UpdateOutcome::NoChanges);
        }
        Ok(UpdateOutcome::Started(Self::start_op(
            &mut inner, "update", &stack.name,
        )))
    }

    async fn delete(&self, name: &str) -> Result<OperationHandle> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(format!("delete {name}"));
        if let Some(reason) = Self::behavior(&inner, name).fail_delete {
            return Err(CloudError::Backend(reason));
        }
        inner.existing.remove(name);
        Ok(Self::start_op(&mut inner, "delete", name))
    }

    async fn poll(&self, handle: &OperationHandle) -> Result<OperationState> {
        let mut inner = self.inner.lock().unwrap();
        let Some(op) = inner.ops.get(&handle.id) else {
            return Err(CloudError::UnknownHandle(handle.id.clone()));
        };
        let stack = op.stack.clone();
        let behavior = Self::behavior(&inner, &stack);

        if behavior.never_settles {
            return Ok(OperationState::InProgress);
        }

        let op = inner.ops.get_mut(&handle.id).unwrap();
        op.polls_done += 1;
        if op.polls_done <= behavior.polls_until_settled {
            return Ok(OperationState::InProgress);
        }

        Ok(match behavior.operation_failure {
            Some(reason) => OperationState::Failed(reason),
            None => OperationState::Succeeded,
        })
    }

    async fn outputs(&self, name: &str) -> Result<BTreeMap<String, String>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.outputs.get(name).cloned().unwrap_or_default())
    }

    async fn list_tagged(&self, key: &str, value: &str) -> Result<Vec<String>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .tagged
            .iter()
            .filter(|(k, v, _)| k == key && v == value)
            .map(|(_, _, id)| id.clone())
            .collect())
    }
}

/// Mock [`ClusterAccess`] adapter
#[derive(Clone, Default)]
pub struct MockClusterAccess {
    fail: Arc<Mutex<Option<String>>>,
    refreshes: Arc<Mutex<u32>>,
}

impl MockClusterAccess {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_with(&self, reason: &str) {
        *self.fail.lock().unwrap() = Some(reason.to_string());
    }

    pub fn refresh_count(&self) -> u32 {
        *self.refreshes.lock().unwrap()
    }
}

#[async_trait]
impl ClusterAccess for MockClusterAccess {
    async fn refresh_access(&self, cluster: &str, _region: &str) -> Result<Credentials> {
        if let Some(reason) = self.fail.lock().unwrap().clone() {
            return Err(CloudError::Connection(reason));
        }
        *self.refreshes.lock().unwrap() += 1;
        Ok(Credentials {
            cluster: cluster.to_string(),
            endpoint: format!("https://{cluster}.mock.local"),
        })
    }

    async fn check_ready(&self, _credentials: &Credentials) -> Result<bool> {
        Ok(true)
    }
}
