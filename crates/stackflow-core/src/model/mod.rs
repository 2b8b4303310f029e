//! Manifest data model

mod manifest;
mod stack;

pub use manifest::{
    ClusterSpec, DEFAULT_POLL_INTERVAL_SECS, DEFAULT_SETTLE_TIMEOUT_SECS, Manifest, Settings,
};
pub use stack::StackDescriptor;
