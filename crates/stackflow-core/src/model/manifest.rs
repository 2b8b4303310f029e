//! Deployment manifest model

use super::stack::StackDescriptor;
use serde::{Deserialize, Serialize};

/// Default bound on a single stack's settle wait, in seconds
pub const DEFAULT_SETTLE_TIMEOUT_SECS: u64 = 300;

/// Default interval between backend polls, in seconds
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// A parsed `stacks.kdl` manifest
///
/// Stack order in the manifest is preserved; the orchestrator uses it as
/// the tie-breaker when dependencies allow more than one ordering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// Project name; also the teardown confirmation token
    pub name: String,

    /// Declared stacks, in manifest order
    pub stacks: Vec<StackDescriptor>,

    /// Cluster whose access is refreshed once infrastructure settles
    #[serde(default)]
    pub cluster: Option<ClusterSpec>,

    /// Wait tuning
    #[serde(default)]
    pub settings: Settings,
}

impl Manifest {
    pub fn stack(&self, name: &str) -> Option<&StackDescriptor> {
        self.stacks.iter().find(|s| s.name == name)
    }
}

/// Cluster endpoint named by the manifest
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterSpec {
    pub name: String,
    pub region: String,
}

/// Manifest-level wait settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Per-stack settle timeout in seconds
    pub settle_timeout_secs: u64,

    /// Poll interval in seconds
    pub poll_interval_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            settle_timeout_secs: DEFAULT_SETTLE_TIMEOUT_SECS,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
        }
    }
}
