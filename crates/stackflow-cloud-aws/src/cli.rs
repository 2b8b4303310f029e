//! aws CLI wrapper
//!
//! Shells out to the `aws` CLI with `--output json` and parses the
//! result. Only the handful of CloudFormation/EKS subcommands the backend
//! needs are wrapped.

use crate::error::{AwsError, Result};
use serde::Deserialize;
use std::process::Stdio;
use tokio::process::Command;

/// aws CLI wrapper bound to one region
pub struct AwsCli {
    region: String,
}

impl AwsCli {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
        }
    }

    /// Run an aws subcommand and return stdout. A non-zero exit maps to
    /// `CommandFailed` with the CLI's stderr.
    pub async fn run(&self, args: &[&str]) -> Result<String> {
        let mut cmd = Command::new("aws");
        cmd.arg("--region").arg(&self.region);
        cmd.args(args);
        cmd.arg("--output").arg("json");
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        tracing::debug!("running: aws --region {} {}", self.region, args.join(" "));

        let output = cmd.output().await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AwsError::CliNotFound
            } else {
                AwsError::Io(e)
            }
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AwsError::CommandFailed(stderr.trim().to_string()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Describe one CloudFormation stack. `Ok(None)` when the stack does
    /// not exist.
    pub async fn describe_stack(&self, name: &str) -> Result<Option<StackSummary>> {
        let result = self
            .run(&["cloudformation", "describe-stacks", "--stack-name", name])
            .await;

        match result {
            Ok(output) => {
                let parsed: DescribeStacks = serde_json::from_str(&output)?;
                parsed
                    .stacks
                    .into_iter()
                    .next()
                    .map(Some)
                    .ok_or_else(|| AwsError::UnexpectedOutput("empty Stacks list".to_string()))
            }
            // describe-stacks reports a missing stack as a ValidationError
            Err(AwsError::CommandFailed(stderr)) if stderr.contains("does not exist") => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn describe_eks_cluster(&self, name: &str) -> Result<EksCluster> {
        let output = self
            .run(&["eks", "describe-cluster", "--name", name])
            .await?;
        let parsed: DescribeCluster = serde_json::from_str(&output)?;
        Ok(parsed.cluster)
    }

    pub async fn update_kubeconfig(&self, cluster: &str) -> Result<()> {
        self.run(&["eks", "update-kubeconfig", "--name", cluster])
            .await?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct DescribeStacks {
    #[serde(rename = "Stacks")]
    stacks: Vec<StackSummary>,
}

/// The slice of `describe-stacks` output the backend cares about
#[derive(Debug, Clone, Deserialize)]
pub struct StackSummary {
    #[serde(rename = "StackId")]
    pub stack_id: String,

    #[serde(rename = "StackStatus")]
    pub stack_status: String,

    #[serde(rename = "Outputs", default)]
    pub outputs: Vec<StackOutput>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StackOutput {
    #[serde(rename = "OutputKey")]
    pub key: String,

    #[serde(rename = "OutputValue")]
    pub value: String,
}

#[derive(Debug, Deserialize)]
struct DescribeCluster {
    #[serde(rename = "cluster")]
    cluster: EksCluster,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EksCluster {
    #[serde(rename = "name")]
    pub name: String,

    #[serde(rename = "status")]
    pub status: String,

    #[serde(rename = "endpoint", default)]
    pub endpoint: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_stacks_parses() {
        let json = r#"{
            "Stacks": [{
                "StackId": "arn:aws:cloudformation:ap-northeast-1:123:stack/vpc/abc",
                "StackStatus": "CREATE_COMPLETE",
                "Outputs": [
                    {"OutputKey": "SubnetIds", "OutputValue": "subnet-1,subnet-2"}
                ]
            }]
        }"#;
        let parsed: DescribeStacks = serde_json::from_str(json).unwrap();
        let stack = &parsed.stacks[0];
        assert_eq!(stack.stack_status, "CREATE_COMPLETE");
        assert_eq!(stack.outputs[0].key, "SubnetIds");
    }

    #[test]
    fn test_describe_stacks_without_outputs() {
        let json = r#"{
            "Stacks": [{
                "StackId": "arn:aws:cloudformation:ap-northeast-1:123:stack/vpc/abc",
                "StackStatus": "CREATE_IN_PROGRESS"
            }]
        }"#;
        let parsed: DescribeStacks = serde_json::from_str(json).unwrap();
        assert!(parsed.stacks[0].outputs.is_empty());
    }

    #[test]
    fn test_describe_cluster_parses() {
        let json = r#"{
            "cluster": {
                "name": "demo",
                "status": "ACTIVE",
                "endpoint": "https://ABC.gr7.ap-northeast-1.eks.amazonaws.com"
            }
        }"#;
        let parsed: DescribeCluster = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.cluster.status, "ACTIVE");
    }
}
