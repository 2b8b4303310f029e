use colored::Colorize;
use stackflow_core::{DependencyGraph, Manifest};

pub fn handle(manifest: &Manifest) -> anyhow::Result<i32> {
    println!("{}", "validating manifest...".blue());

    let graph = DependencyGraph::build(&manifest.stacks)?;
    let order = graph.ordering()?;

    println!("{}", "✓ manifest is valid".green().bold());
    println!();
    println!("summary:");
    println!("  project: {}", manifest.name.cyan());
    println!("  stacks: {}", manifest.stacks.len());
    for stack in &manifest.stacks {
        let deps = if stack.depends_on.is_empty() {
            "(no dependencies)".to_string()
        } else {
            format!("after {}", stack.depends_on.join(", "))
        };
        println!("    - {} {}", stack.name.cyan(), deps.dimmed());
    }
    if let Some(cluster) = &manifest.cluster {
        println!("  cluster: {} ({})", cluster.name.cyan(), cluster.region);
    }
    println!();
    println!("deployment order: {}", order.join(" → ").cyan());

    Ok(0)
}
