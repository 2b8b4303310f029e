//! KDL manifest parser
//!
//! Parses `stacks.kdl` deployment manifests. Node-type parsing is split
//! into submodules.

mod stack;

use stack::{parse_cluster, parse_stack};

use crate::error::{CoreError, Result};
use crate::model::{Manifest, Settings};
use kdl::KdlDocument;
use std::fs;
use std::path::Path;

/// Parse a KDL manifest file
pub fn parse_manifest_file<P: AsRef<Path>>(path: P) -> Result<Manifest> {
    let content = fs::read_to_string(path.as_ref())?;
    let default_name = path
        .as_ref()
        .parent()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
        .unwrap_or("unnamed")
        .to_string();
    parse_manifest_str(&content, default_name)
}

/// Parse a KDL manifest string
pub fn parse_manifest_str(content: &str, default_name: String) -> Result<Manifest> {
    let doc: KdlDocument = content.parse()?;

    let mut name = default_name;
    let mut stacks = Vec::new();
    let mut cluster = None;
    let mut settings = Settings::default();

    for node in doc.nodes() {
        match node.name().value() {
            "project" => {
                if let Some(project_name) =
                    node.entries().first().and_then(|e| e.value().as_string())
                {
                    name = project_name.to_string();
                }
            }
            "stack" => {
                let descriptor = parse_stack(node)?;
                if stacks
                    .iter()
                    .any(|s: &crate::model::StackDescriptor| s.name == descriptor.name)
                {
                    return Err(CoreError::DuplicateStack(descriptor.name));
                }
                stacks.push(descriptor);
            }
            "cluster" => {
                cluster = Some(parse_cluster(node)?);
            }
            "settings" => {
                if let Some(children) = node.children() {
                    for child in children.nodes() {
                        match child.name().value() {
                            "settle-timeout" | "settle_timeout" => {
                                if let Some(v) =
                                    child.entries().first().and_then(|e| e.value().as_integer())
                                {
                                    settings.settle_timeout_secs = parse_seconds("settle-timeout", v)?;
                                }
                            }
                            "poll-interval" | "poll_interval" => {
                                if let Some(v) =
                                    child.entries().first().and_then(|e| e.value().as_integer())
                                {
                                    settings.poll_interval_secs = parse_seconds("poll-interval", v)?;
                                }
                            }
                            _ => {}
                        }
                    }
                }
            }
            _ => {
                // Unknown top-level nodes are skipped
            }
        }
    }

    if stacks.is_empty() {
        return Err(CoreError::InvalidManifest(
            "manifest declares no stacks".to_string(),
        ));
    }

    Ok(Manifest {
        name,
        stacks,
        cluster,
        settings,
    })
}

fn parse_seconds(setting: &str, value: i128) -> Result<u64> {
    u64::try_from(value).map_err(|_| {
        CoreError::InvalidManifest(format!("{setting} must be a non-negative number of seconds"))
    })
}
