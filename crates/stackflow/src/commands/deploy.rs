use crate::utils::{self, ResolvedConfig};
use colored::Colorize;
use stackflow_cloud_aws::{CloudFormationBackend, EksAccess};
use stackflow_core::Manifest;
use stackflow_orchestrator::Deployer;
use std::sync::Arc;

pub async fn handle(
    manifest: &Manifest,
    resolved: ResolvedConfig,
    json: bool,
) -> anyhow::Result<i32> {
    println!("{}", "deploying stacks...".blue().bold());
    println!("project: {}", manifest.name.cyan());
    println!();
    println!("{}", format!("stacks ({}):", manifest.stacks.len()).bold());
    for stack in &manifest.stacks {
        let deps = if stack.depends_on.is_empty() {
            String::new()
        } else {
            format!(" (after {})", stack.depends_on.join(", "))
        };
        println!("  • {}{}", stack.name.cyan(), deps.dimmed());
    }
    println!();

    let backend = Arc::new(CloudFormationBackend::new(resolved.region.clone()));
    let mut deployer = Deployer::new(backend, resolved.config.clone());
    if resolved.config.cluster.is_some() {
        deployer = deployer
            .with_cluster_access(Arc::new(EksAccess::new(resolved.region)))
            .with_infra_ready_hook(Box::new(|_| {
                println!(
                    "{}",
                    "✓ infrastructure ready, apply workloads now".green().bold()
                );
            }));
    }

    let cancel = utils::cancel_on_ctrl_c();
    let run = deployer.deploy(manifest, &cancel).await?;
    utils::report_run(&run, json)
}
