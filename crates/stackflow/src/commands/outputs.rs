use crate::utils::ResolvedConfig;
use anyhow::anyhow;
use colored::Colorize;
use stackflow_cloud::StackBackend;
use stackflow_cloud_aws::CloudFormationBackend;
use stackflow_core::Manifest;

pub async fn handle(
    manifest: &Manifest,
    resolved: ResolvedConfig,
    stack: &str,
    json: bool,
) -> anyhow::Result<i32> {
    if manifest.stack(stack).is_none() {
        return Err(anyhow!("stack '{stack}' is not in the manifest"));
    }

    let backend = CloudFormationBackend::new(resolved.region);
    let outputs = backend.outputs(stack).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outputs)?);
        return Ok(0);
    }

    if outputs.is_empty() {
        println!("stack {} has no outputs", stack.cyan());
        return Ok(0);
    }

    println!("{}", format!("outputs of {stack}:").bold());
    for (key, value) in &outputs {
        println!("  {} = {}", key.cyan(), value);
    }
    Ok(0)
}
