use anyhow::Context;
use colored::Colorize;
use stackflow_core::{Manifest, OrchestratorConfig};
use stackflow_orchestrator::{DeploymentRun, RunOutcome};
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// Load the manifest and build the run configuration. A `--region` flag
/// overrides the manifest's cluster region for backend calls.
pub fn load_manifest(
    path: Option<&Path>,
    region: Option<String>,
) -> anyhow::Result<(Manifest, ResolvedConfig)> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => stackflow_core::find_manifest_file()?,
    };
    let manifest = stackflow_core::parse_manifest_file(&path)
        .with_context(|| format!("failed to load {}", path.display()))?;
    println!("manifest: {}", path.display().to_string().cyan());

    let region = region
        .or_else(|| manifest.cluster.as_ref().map(|c| c.region.clone()))
        .unwrap_or_else(|| "us-east-1".to_string());
    let config = OrchestratorConfig::from_manifest(&manifest);
    Ok((manifest, ResolvedConfig { config, region }))
}

/// Run configuration plus the resolved backend region
pub struct ResolvedConfig {
    pub config: OrchestratorConfig,
    pub region: String,
}

/// Cancellation token wired to Ctrl-C. The first signal requests a
/// cooperative stop; in-flight backend calls are never interrupted.
pub fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\n{}", "interrupt received, stopping new work...".yellow());
            token.cancel();
        }
    });
    cancel
}

/// Print the per-stack outcome table and return the process exit code.
pub fn report_run(run: &DeploymentRun, json: bool) -> anyhow::Result<i32> {
    if json {
        println!("{}", serde_json::to_string_pretty(run)?);
        return Ok(exit_code(&run.outcome));
    }

    println!();
    println!("{}", "run report:".bold());
    for stack in &run.stacks {
        let state = stack.state.to_string();
        let state = match stack.state {
            stackflow_cloud::StackState::Settled | stackflow_cloud::StackState::Deleted => {
                state.green()
            }
            stackflow_cloud::StackState::Failed => state.red(),
            _ => state.yellow(),
        };
        let detail = match (&stack.last_error, &stack.skipped_due_to) {
            (Some(err), _) => format!(" ({err})"),
            (None, Some(dep)) => format!(" (skipped: dependency '{dep}' did not settle)"),
            _ => String::new(),
        };
        println!("  • {} {}{}", stack.name.cyan(), state, detail.dimmed());
    }

    for warning in &run.warnings {
        println!("  {} {}", "⚠".yellow(), warning.yellow());
    }

    println!();
    match &run.outcome {
        RunOutcome::Success => println!("{}", "✓ all stacks settled".green().bold()),
        RunOutcome::PartialFailure { failed } => println!(
            "{}",
            format!("✗ partial failure: {}", failed.join(", ")).red().bold()
        ),
        RunOutcome::Aborted => println!("{}", "✗ run aborted".red().bold()),
    }

    Ok(exit_code(&run.outcome))
}

pub fn exit_code(outcome: &RunOutcome) -> i32 {
    match outcome {
        RunOutcome::Success => 0,
        RunOutcome::PartialFailure { .. } => 1,
        RunOutcome::Aborted => 2,
    }
}
