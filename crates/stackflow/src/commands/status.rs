use crate::utils::ResolvedConfig;
use anyhow::anyhow;
use colored::Colorize;
use stackflow_cloud::StackBackend;
use stackflow_cloud_aws::CloudFormationBackend;
use stackflow_core::Manifest;

pub async fn handle(
    manifest: &Manifest,
    resolved: ResolvedConfig,
    stack: Option<String>,
) -> anyhow::Result<i32> {
    let backend = CloudFormationBackend::new(resolved.region);

    let targets: Vec<&str> = match &stack {
        Some(name) => {
            if manifest.stack(name).is_none() {
                return Err(anyhow!(
                    "stack '{}' is not in the manifest. available: {}",
                    name,
                    manifest
                        .stacks
                        .iter()
                        .map(|s| s.name.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                ));
            }
            vec![name.as_str()]
        }
        None => manifest.stacks.iter().map(|s| s.name.as_str()).collect(),
    };

    println!("{}", format!("stacks ({}):", targets.len()).bold());
    for name in targets {
        match backend.exists(name).await {
            Ok(true) => println!("  • {} {}", name.cyan(), "deployed".green()),
            Ok(false) => println!("  • {} {}", name.cyan(), "absent".dimmed()),
            Err(e) => println!("  • {} {} ({e})", name.cyan(), "unknown".yellow()),
        }
    }

    Ok(0)
}
