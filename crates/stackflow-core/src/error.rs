use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("KDL parse error: {0}")]
    KdlParse(#[from] kdl::KdlError),

    #[error("failed to read manifest: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    #[error("stack '{0}' is defined more than once")]
    DuplicateStack(String),

    #[error("stack '{stack}' depends on unknown stack '{dependency}'")]
    UnknownDependency { stack: String, dependency: String },

    #[error("dependency cycle detected involving: {0}")]
    DependencyCycle(String),

    #[error(
        "no manifest found\nsearched: stacks.kdl, .stacks.kdl in {0}\n\
        set STACKFLOW_MANIFEST to point at a manifest directly"
    )]
    ManifestNotFound(PathBuf),
}

pub type Result<T> = std::result::Result<T, CoreError>;
