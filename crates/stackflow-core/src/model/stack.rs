//! Stack descriptor model
//!
//! A stack is one independently provisionable unit of declarative
//! infrastructure (network, cluster, node pool, ...). The descriptor is
//! static input data; runtime state lives in the orchestrator.

use serde::{Deserialize, Serialize};

/// One deployable stack as declared in the manifest
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StackDescriptor {
    /// Unique stack name within the deployment
    pub name: String,

    /// Opaque template reference (path or URI), passed through to the
    /// backend uninterpreted
    pub template: String,

    /// Ordered parameter list. Values may reference a dependency's
    /// outputs with the `{stack.OutputName}` placeholder form.
    #[serde(default)]
    pub parameters: Vec<(String, String)>,

    /// Names of stacks that must settle before this one starts
    #[serde(default)]
    pub depends_on: Vec<String>,

    /// Backend capabilities (e.g. IAM acknowledgement flags), opaque
    #[serde(default)]
    pub capabilities: Vec<String>,

    /// Tags applied to backend resources, opaque
    #[serde(default)]
    pub tags: Vec<(String, String)>,
}

impl StackDescriptor {
    pub fn new(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            template: template.into(),
            ..Default::default()
        }
    }

    pub fn with_dependency(mut self, dep: impl Into<String>) -> Self {
        self.depends_on.push(dep.into());
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.push((key.into(), value.into()));
        self
    }
}
