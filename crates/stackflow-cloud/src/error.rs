//! Stack backend error types

use thiserror::Error;

/// Errors raised by stack backends and cluster access adapters.
///
/// These are stack-local: the orchestrator records them on the affected
/// stack and never lets them abort independent branches.
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("backend rejected the call: {0}")]
    Backend(String),

    #[error("unknown operation handle: {0}")]
    UnknownHandle(String),

    #[error("cluster connection failed: {0}")]
    Connection(String),

    #[error("command execution failed: {0}")]
    CommandFailed(String),
}

pub type Result<T> = std::result::Result<T, CloudError>;
