//! Run configuration and manifest discovery

use crate::error::{CoreError, Result};
use crate::model::{ClusterSpec, Manifest};
use std::path::{Path, PathBuf};
use std::time::Duration;

const MANIFEST_CANDIDATES: [&str; 2] = ["stacks.kdl", ".stacks.kdl"];

/// Immutable per-run configuration handed to the orchestrators at
/// construction. There is no process-global mutable state.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Project name; doubles as the teardown confirmation token
    pub project: String,

    /// Cluster to refresh access for once infrastructure settles
    pub cluster: Option<ClusterSpec>,

    /// Per-stack bound on the settle wait
    pub settle_timeout: Duration,

    /// Interval between backend polls
    pub poll_interval: Duration,
}

impl OrchestratorConfig {
    pub fn from_manifest(manifest: &Manifest) -> Self {
        Self {
            project: manifest.name.clone(),
            cluster: manifest.cluster.clone(),
            settle_timeout: Duration::from_secs(manifest.settings.settle_timeout_secs),
            poll_interval: Duration::from_secs(manifest.settings.poll_interval_secs),
        }
    }
}

/// Locate the deployment manifest.
///
/// Search order:
/// 1. `STACKFLOW_MANIFEST` environment variable (direct path)
/// 2. `stacks.kdl`, `.stacks.kdl` in the current directory
pub fn find_manifest_file() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("STACKFLOW_MANIFEST") {
        let path = PathBuf::from(path);
        if path.exists() {
            return Ok(path);
        }
    }

    let current_dir = std::env::current_dir()?;
    find_manifest_in(&current_dir)
}

/// Locate the manifest within a specific directory
pub fn find_manifest_in(dir: &Path) -> Result<PathBuf> {
    for candidate in MANIFEST_CANDIDATES {
        let path = dir.join(candidate);
        if path.exists() {
            return Ok(path);
        }
    }
    Err(CoreError::ManifestNotFound(dir.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Settings;
    use std::fs;

    #[test]
    fn test_find_manifest_in_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("stacks.kdl"), "// test").unwrap();

        let found = find_manifest_in(dir.path()).unwrap();
        assert!(found.ends_with("stacks.kdl"));
    }

    #[test]
    fn test_find_manifest_prefers_visible_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("stacks.kdl"), "// visible").unwrap();
        fs::write(dir.path().join(".stacks.kdl"), "// hidden").unwrap();

        let found = find_manifest_in(dir.path()).unwrap();
        assert!(found.ends_with("stacks.kdl"));
        assert!(!found.file_name().unwrap().to_str().unwrap().starts_with('.'));
    }

    #[test]
    fn test_find_manifest_missing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            find_manifest_in(dir.path()),
            Err(CoreError::ManifestNotFound(_))
        ));
    }

    #[test]
    fn test_config_from_manifest() {
        let manifest = Manifest {
            name: "demo".to_string(),
            stacks: Vec::new(),
            cluster: Some(ClusterSpec {
                name: "demo-cluster".to_string(),
                region: "ap-northeast-1".to_string(),
            }),
            settings: Settings {
                settle_timeout_secs: 120,
                poll_interval_secs: 2,
            },
        };

        let config = OrchestratorConfig::from_manifest(&manifest);
        assert_eq!(config.project, "demo");
        assert_eq!(config.settle_timeout, Duration::from_secs(120));
        assert_eq!(config.poll_interval, Duration::from_secs(2));
        assert_eq!(config.cluster.unwrap().name, "demo-cluster");
    }
}
