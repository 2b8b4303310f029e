//! Stackflow backend abstraction
//!
//! Defines the two narrow seams the orchestration core uses to touch the
//! outside world ([`StackBackend`] for declarative stack operations,
//! [`ClusterAccess`] for cluster credentials), plus the readiness waiter
//! both orchestrators poll through.

pub mod backend;
pub mod error;
pub mod state;
pub mod wait;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use backend::{ClusterAccess, Credentials, OperationHandle, StackBackend, UpdateOutcome};
pub use error::{CloudError, Result};
pub use state::{OperationState, StackState};
pub use wait::{WaitConfig, WaitError, wait_for_state};
