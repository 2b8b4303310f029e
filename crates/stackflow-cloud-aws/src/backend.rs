//! CloudFormation/EKS backend implementation

use crate::cli::AwsCli;
use crate::error::AwsError;
use async_trait::async_trait;
use stackflow_cloud::{
    CloudError, ClusterAccess, Credentials, OperationHandle, OperationState, Result, StackBackend,
    UpdateOutcome,
};
use stackflow_core::StackDescriptor;
use std::collections::BTreeMap;

const OP_CREATE: &str = "create";
const OP_UPDATE: &str = "update";
const OP_DELETE: &str = "delete";

/// CloudFormation-backed [`StackBackend`]
pub struct CloudFormationBackend {
    cli: AwsCli,
}

impl CloudFormationBackend {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            cli: AwsCli::new(region),
        }
    }

    fn stack_args(stack: &StackDescriptor) -> Vec<String> {
        let mut args = vec![
            "--stack-name".to_string(),
            stack.name.clone(),
            "--template-body".to_string(),
            format!("file://{}", stack.template),
        ];
        if !stack.parameters.is_empty() {
            args.push("--parameters".to_string());
            for (key, value) in &stack.parameters {
                args.push(format!("ParameterKey={key},ParameterValue={value}"));
            }
        }
        if !stack.capabilities.is_empty() {
            args.push("--capabilities".to_string());
            args.extend(stack.capabilities.iter().cloned());
        }
        if !stack.tags.is_empty() {
            args.push("--tags".to_string());
            for (key, value) in &stack.tags {
                args.push(format!("Key={key},Value={value}"));
            }
        }
        args
    }

    async fn run_stack_op(&self, op: &str, stack: &StackDescriptor) -> Result<OperationHandle> {
        let mut args: Vec<String> =
            vec!["cloudformation".to_string(), format!("{op}-stack")];
        args.extend(Self::stack_args(stack));
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        self.cli.run(&args).await.map_err(CloudError::from)?;
        Ok(OperationHandle::new(&stack.name, op))
    }
}

#[async_trait]
impl StackBackend for CloudFormationBackend {
    async fn exists(&self, name: &str) -> Result<bool> {
        let summary = self.cli.describe_stack(name).await.map_err(CloudError::from)?;
        // A stack left in REVIEW_IN_PROGRESS has no resources; treat it
        // as absent so deploy recreates it.
        Ok(summary.is_some_and(|s| s.stack_status != "REVIEW_IN_PROGRESS"))
    }

    async fn create(&self, stack: &StackDescriptor) -> Result<OperationHandle> {
        self.run_stack_op(OP_CREATE, stack).await
    }

    async fn update(&self, stack: &StackDescriptor) -> Result<UpdateOutcome> {
        match self.run_stack_op(OP_UPDATE, stack).await {
            Ok(handle) => Ok(UpdateOutcome::Started(handle)),
            Err(CloudError::CommandFailed(stderr))
                if stderr.contains("No updates are to be performed") =>
            {
                Ok(UpdateOutcome::NoChanges)
            }
            Err(e) => Err(e),
        }
    }

    async fn delete(&self, name: &str) -> Result<OperationHandle> {
        self.cli
            .run(&["cloudformation", "delete-stack", "--stack-name", name])
            .await
            .map_err(CloudError::from)?;
        Ok(OperationHandle::new(name, OP_DELETE))
    }

    async fn poll(&self, handle: &OperationHandle) -> Result<OperationState> {
        let summary = self
            .cli
            .describe_stack(&handle.stack)
            .await
            .map_err(CloudError::from)?;
        Ok(map_stack_status(
            &handle.id,
            summary.as_ref().map(|s| s.stack_status.as_str()),
        ))
    }

    async fn outputs(&self, name: &str) -> Result<BTreeMap<String, String>> {
        let summary = self.cli.describe_stack(name).await.map_err(CloudError::from)?;
        Ok(summary
            .map(|s| {
                s.outputs
                    .into_iter()
                    .map(|o| (o.key, o.value))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn list_tagged(&self, key: &str, value: &str) -> Result<Vec<String>> {
        let filter = format!("Key={key},Values={value}");
        let output = self
            .cli
            .run(&[
                "resourcegroupstaggingapi",
                "get-resources",
                "--tag-filters",
                &filter,
            ])
            .await
            .map_err(CloudError::from)?;

        let parsed: serde_json::Value = serde_json::from_str(&output)
            .map_err(|e| CloudError::Backend(e.to_string()))?;
        let arns = parsed["ResourceTagMappingList"]
            .as_array()
            .map(|list| {
                list.iter()
                    .filter_map(|r| r["ResourceARN"].as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();
        Ok(arns)
    }
}

/// Map a CloudFormation stack status to an operation state, relative to
/// the operation kind carried in the handle. `None` means the stack no
/// longer exists.
fn map_stack_status(op: &str, status: Option<&str>) -> OperationState {
    match (op, status) {
        // Gone is exactly what delete wants
        (OP_DELETE, None) | (OP_DELETE, Some("DELETE_COMPLETE")) => OperationState::Succeeded,
        (_, None) => OperationState::Failed("stack disappeared during operation".to_string()),
        (OP_CREATE, Some("CREATE_COMPLETE")) => OperationState::Succeeded,
        (OP_UPDATE, Some("UPDATE_COMPLETE")) => OperationState::Succeeded,
        (_, Some(status)) if status.ends_with("_IN_PROGRESS") => OperationState::InProgress,
        (_, Some(status)) => OperationState::Failed(format!("stack status: {status}")),
    }
}

/// EKS-backed [`ClusterAccess`]
pub struct EksAccess {
    cli: AwsCli,
}

impl EksAccess {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            cli: AwsCli::new(region),
        }
    }
}

#[async_trait]
impl ClusterAccess for EksAccess {
    async fn refresh_access(&self, cluster: &str, _region: &str) -> Result<Credentials> {
        self.cli
            .update_kubeconfig(cluster)
            .await
            .map_err(|e| CloudError::Connection(e.to_string()))?;
        let described = self
            .cli
            .describe_eks_cluster(cluster)
            .await
            .map_err(|e| CloudError::Connection(e.to_string()))?;
        Ok(Credentials {
            cluster: described.name,
            endpoint: described.endpoint.unwrap_or_default(),
        })
    }

    async fn check_ready(&self, credentials: &Credentials) -> Result<bool> {
        let described = self
            .cli
            .describe_eks_cluster(&credentials.cluster)
            .await
            .map_err(|e| CloudError::Connection(e.to_string()))?;
        Ok(described.status == "ACTIVE")
    }
}
