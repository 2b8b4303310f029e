//! Stack and operation state types

use serde::{Deserialize, Serialize};

/// Lifecycle state of one stack during an orchestration run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StackState {
    /// Not attempted yet (or skipped because a dependency failed)
    NotStarted,
    Creating,
    Updating,
    /// Terminal success: no asynchronous change pending
    Settled,
    Failed,
    Deleting,
    Deleted,
}

impl StackState {
    /// True once no further transition can happen in this run
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Settled | Self::Failed | Self::Deleted)
    }
}

impl std::fmt::Display for StackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NotStarted => "not-started",
            Self::Creating => "creating",
            Self::Updating => "updating",
            Self::Settled => "settled",
            Self::Failed => "failed",
            Self::Deleting => "deleting",
            Self::Deleted => "deleted",
        };
        write!(f, "{s}")
    }
}

/// Backend-observed state of one asynchronous operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationState {
    InProgress,
    Succeeded,
    Failed(String),
}

impl OperationState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::InProgress)
    }
}
