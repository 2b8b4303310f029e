//! Stack and cluster node parsing

use crate::error::{CoreError, Result};
use crate::model::{ClusterSpec, StackDescriptor};
use kdl::KdlNode;

/// Parse a `stack "name" { ... }` node
pub fn parse_stack(node: &KdlNode) -> Result<StackDescriptor> {
    let name = node
        .entries()
        .first()
        .and_then(|e| e.value().as_string())
        .ok_or_else(|| CoreError::InvalidManifest("stack requires a name".to_string()))?
        .to_string();

    let mut descriptor = StackDescriptor {
        name: name.clone(),
        ..Default::default()
    };

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "template" => {
                    descriptor.template = child
                        .entries()
                        .first()
                        .and_then(|e| e.value().as_string())
                        .unwrap_or("")
                        .to_string();
                }
                "param" => {
                    let mut values = child
                        .entries()
                        .iter()
                        .filter_map(|e| e.value().as_string().map(|s| s.to_string()));
                    let key = values.next().ok_or_else(|| {
                        CoreError::InvalidManifest(format!(
                            "stack '{name}': param requires a name and a value"
                        ))
                    })?;
                    let value = values.next().unwrap_or_default();
                    descriptor.parameters.push((key, value));
                }
                "depends-on" | "depends_on" => {
                    for entry in child.entries() {
                        if let Some(dep) = entry.value().as_string() {
                            descriptor.depends_on.push(dep.to_string());
                        }
                    }
                }
                "capability" => {
                    if let Some(cap) = child.entries().first().and_then(|e| e.value().as_string()) {
                        descriptor.capabilities.push(cap.to_string());
                    }
                }
                "tag" => {
                    let mut values = child
                        .entries()
                        .iter()
                        .filter_map(|e| e.value().as_string().map(|s| s.to_string()));
                    if let (Some(key), Some(value)) = (values.next(), values.next()) {
                        descriptor.tags.push((key, value));
                    }
                }
                _ => {}
            }
        }
    }

    if descriptor.template.is_empty() {
        return Err(CoreError::InvalidManifest(format!(
            "stack '{name}' has no template"
        )));
    }

    Ok(descriptor)
}

/// Parse a `cluster "name" { region "..." }` node
pub fn parse_cluster(node: &KdlNode) -> Result<ClusterSpec> {
    let name = node
        .entries()
        .first()
        .and_then(|e| e.value().as_string())
        .ok_or_else(|| CoreError::InvalidManifest("cluster requires a name".to_string()))?
        .to_string();

    let mut spec = ClusterSpec {
        name,
        ..Default::default()
    };

    if let Some(children) = node.children() {
        for child in children.nodes() {
            if child.name().value() == "region"
                && let Some(region) = child.entries().first().and_then(|e| e.value().as_string())
            {
                spec.region = region.to_string();
            }
        }
    }

    Ok(spec)
}
