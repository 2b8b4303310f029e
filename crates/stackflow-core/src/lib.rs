//! Stackflow core
//!
//! Manifest model, KDL parser, and the stack dependency graph. The
//! orchestration itself lives in `stackflow-orchestrator`; this crate is
//! pure data and validation with no backend calls.

pub mod config;
pub mod error;
pub mod graph;
pub mod model;
pub mod parser;

pub use config::{OrchestratorConfig, find_manifest_file, find_manifest_in};
pub use error::{CoreError, Result};
pub use graph::DependencyGraph;
pub use model::{ClusterSpec, Manifest, Settings, StackDescriptor};
pub use parser::{parse_manifest_file, parse_manifest_str};
