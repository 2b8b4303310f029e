//! Backend trait definitions
//!
//! These two traits are the only points where the orchestration core
//! touches the outside world. Everything provider-specific lives behind
//! them (see `stackflow-cloud-aws` for the CloudFormation/EKS shim).

use crate::error::Result;
use crate::state::OperationState;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stackflow_core::StackDescriptor;
use std::collections::BTreeMap;

/// Opaque token for an in-flight backend operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationHandle {
    /// Stack the operation belongs to
    pub stack: String,

    /// Backend-assigned operation identifier
    pub id: String,
}

impl OperationHandle {
    pub fn new(stack: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            stack: stack.into(),
            id: id.into(),
        }
    }
}

/// Outcome of an update call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// An update was started; poll the handle until it settles
    Started(OperationHandle),

    /// The backend found nothing to change. Benign idempotent success,
    /// never an error.
    NoChanges,
}

/// Provisioning backend for named declarative stacks
#[async_trait]
pub trait StackBackend: Send + Sync {
    /// Whether a stack with this name already exists on the backend
    async fn exists(&self, name: &str) -> Result<bool>;

    /// Start creating the stack
    async fn create(&self, stack: &StackDescriptor) -> Result<OperationHandle>;

    /// Start updating the stack
    async fn update(&self, stack: &StackDescriptor) -> Result<UpdateOutcome>;

    /// Start deleting the stack
    async fn delete(&self, name: &str) -> Result<OperationHandle>;

    /// Observe the state of an in-flight operation
    async fn poll(&self, handle: &OperationHandle) -> Result<OperationState>;

    /// Named output values of a settled stack, referenced by later
    /// stacks' parameters
    async fn outputs(&self, name: &str) -> Result<BTreeMap<String, String>>;

    /// Best-effort query for resources carrying the given tag, used by
    /// teardown's residual-resource check
    async fn list_tagged(&self, key: &str, value: &str) -> Result<Vec<String>>;
}

/// Connection credentials for the provisioned cluster endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub cluster: String,
    pub endpoint: String,
}

/// Access adapter for the resulting cluster endpoint
#[async_trait]
pub trait ClusterAccess: Send + Sync {
    /// Refresh connection credentials for the named cluster
    async fn refresh_access(&self, cluster: &str, region: &str) -> Result<Credentials>;

    /// Liveness probe against the cluster endpoint
    async fn check_ready(&self, credentials: &Credentials) -> Result<bool>;
}
