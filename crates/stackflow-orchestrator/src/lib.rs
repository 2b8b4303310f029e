//! Stackflow orchestration
//!
//! Drives ordered, idempotent deployment and teardown of interdependent
//! infrastructure stacks through the `stackflow-cloud` backend traits.
//! One [`DeploymentRun`] aggregate is produced per invocation; stack-local
//! failures are recorded on it and never abort independent branches.

pub mod deploy;
pub mod error;
pub mod run;
pub mod teardown;

pub use deploy::{Deployer, InfraReadyHook};
pub use error::{OrchestratorError, Result};
pub use run::{DeploymentRun, RunOutcome, StackRun};
pub use teardown::{Destroyer, PreTeardownHook};
