use stackflow_core::{ClusterSpec, Manifest, OrchestratorConfig, Settings, StackDescriptor};
use std::time::Duration;

/// Build a manifest from `(name, depends_on)` pairs
pub fn manifest(project: &str, stacks: &[(&str, &[&str])]) -> Manifest {
    let stacks = stacks
        .iter()
        .map(|(name, deps)| {
            let mut s = StackDescriptor::new(*name, format!("templates/{name}.yaml"));
            for dep in *deps {
                s = s.with_dependency(*dep);
            }
            s
        })
        .collect();
    Manifest {
        name: project.to_string(),
        stacks,
        cluster: None,
        settings: Settings::default(),
    }
}

#[allow(dead_code)]
pub fn with_cluster(mut m: Manifest, cluster: &str, region: &str) -> Manifest {
    m.cluster = Some(ClusterSpec {
        name: cluster.to_string(),
        region: region.to_string(),
    });
    m
}

/// Short waits so paused-clock tests stay readable
pub fn config(manifest: &Manifest) -> OrchestratorConfig {
    let mut config = OrchestratorConfig::from_manifest(manifest);
    config.settle_timeout = Duration::from_secs(30);
    config.poll_interval = Duration::from_secs(1);
    config
}
