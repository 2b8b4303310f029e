//! AWS backend for Stackflow
//!
//! Implements the `StackBackend` and `ClusterAccess` traits over the
//! `aws` CLI: CloudFormation for stacks, EKS for cluster access.
//!
//! # Requirements
//!
//! - `aws` CLI installed and configured (`aws configure`)
//! - for cluster access, `kubectl` configured via `aws eks update-kubeconfig`

pub mod backend;
pub mod cli;
pub mod error;

pub use backend::{CloudFormationBackend, EksAccess};
pub use cli::AwsCli;
pub use error::{AwsError, Result};
