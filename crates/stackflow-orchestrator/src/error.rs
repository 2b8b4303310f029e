//! Orchestrator error types
//!
//! Only run-level failures surface here. Stack-local errors (backend
//! rejections, settle timeouts) are recorded on the affected
//! [`StackRun`](crate::run::StackRun) and never cross stack boundaries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OrchestratorError {
    /// Cyclic or unresolved dependency; fails before any backend call
    #[error("configuration error: {0}")]
    Config(#[from] stackflow_core::CoreError),

    /// Teardown confirmation token did not match the project name
    #[error("teardown aborted: confirmation token did not match project '{expected}'")]
    ConfirmationDenied { expected: String },
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;
