use crate::utils::{self, ResolvedConfig};
use colored::Colorize;
use stackflow_cloud_aws::CloudFormationBackend;
use stackflow_core::Manifest;
use stackflow_orchestrator::{Destroyer, OrchestratorError};
use std::io::Write;
use std::sync::Arc;

pub async fn handle(
    manifest: &Manifest,
    resolved: ResolvedConfig,
    confirm: Option<String>,
    pre_hook: Option<String>,
    json: bool,
) -> anyhow::Result<i32> {
    println!("{}", "tearing down stacks...".yellow().bold());
    println!("project: {}", manifest.name.cyan());
    println!();
    println!(
        "{}",
        format!(
            "warning: this deletes all {} stacks and their resources.",
            manifest.stacks.len()
        )
        .yellow()
    );

    let token = match confirm {
        Some(token) => token,
        None => prompt_for_token(&manifest.name)?,
    };

    let backend = Arc::new(CloudFormationBackend::new(resolved.region));
    let mut destroyer = Destroyer::new(backend, resolved.config);
    if let Some(command) = pre_hook {
        destroyer = destroyer.with_pre_teardown_hook(Box::new(move || {
            let command = command.clone();
            Box::pin(async move { run_pre_hook(&command).await })
        }));
    }

    let cancel = utils::cancel_on_ctrl_c();
    match destroyer.teardown(manifest, &token, &cancel).await {
        Ok(run) => utils::report_run(&run, json),
        Err(OrchestratorError::ConfirmationDenied { expected }) => {
            println!();
            println!(
                "{}",
                format!("✗ aborted: type the project name '{expected}' to confirm").red()
            );
            Ok(2)
        }
        Err(e) => Err(e.into()),
    }
}

fn prompt_for_token(project: &str) -> anyhow::Result<String> {
    print!("type the project name '{}' to confirm: ", project.cyan());
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// Run the application-layer cleanup command. Best effort: the caller
/// logs a failure and proceeds with stack deletion.
async fn run_pre_hook(command: &str) -> Result<(), String> {
    println!("{}", format!("■ running pre-teardown hook: {command}").yellow());
    let status = tokio::process::Command::new("sh")
        .arg("-c")
        .arg(command)
        .status()
        .await
        .map_err(|e| e.to_string())?;
    if status.success() {
        Ok(())
    } else {
        Err(format!("hook exited with {status}"))
    }
}
