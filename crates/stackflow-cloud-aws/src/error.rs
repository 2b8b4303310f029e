//! AWS backend error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AwsError {
    #[error("aws CLI not found. Install it and run `aws configure`")]
    CliNotFound,

    #[error("aws command failed: {0}")]
    CommandFailed(String),

    #[error("unexpected aws CLI output: {0}")]
    UnexpectedOutput(String),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<AwsError> for stackflow_cloud::CloudError {
    fn from(e: AwsError) -> Self {
        match e {
            AwsError::CommandFailed(msg) => stackflow_cloud::CloudError::CommandFailed(msg),
            other => stackflow_cloud::CloudError::Backend(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, AwsError>;

#[cfg(test)]
mod tests {
    use super::*;
    use stackflow_cloud::CloudError;

    #[test]
    fn test_maps_into_cloud_error() {
        let e = CloudError::from(AwsError::CommandFailed("denied".to_string()));
        assert!(matches!(e, CloudError::CommandFailed(_)));

        let e = CloudError::from(AwsError::CliNotFound);
        assert!(matches!(e, CloudError::Backend(_)));
    }
}
