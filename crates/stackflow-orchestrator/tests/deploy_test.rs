mod common;

use common::{config, manifest, with_cluster};
use stackflow_cloud::mock::{MockClusterAccess, MockStackBackend, StackBehavior};
use stackflow_cloud::StackState;
use stackflow_core::StackDescriptor;
use stackflow_orchestrator::{Deployer, OrchestratorError, RunOutcome};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn deployer(backend: &MockStackBackend, m: &stackflow_core::Manifest) -> Deployer {
    Deployer::new(Arc::new(backend.clone()), config(m))
}

#[tokio::test(start_paused = true)]
async fn test_deploys_in_dependency_order() {
    let m = manifest(
        "demo",
        &[
            ("nodegroup", &["cluster"]),
            ("vpc", &[]),
            ("cluster", &["vpc"]),
        ],
    );
    let backend = MockStackBackend::new();
    let run = deployer(&backend, &m)
        .deploy(&m, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(run.outcome, RunOutcome::Success);
    for stack in &run.stacks {
        assert_eq!(stack.state, StackState::Settled, "stack {}", stack.name);
    }

    let creates = backend.calls_of("create");
    let pos = |n: &str| creates.iter().position(|c| c == n).unwrap();
    assert!(pos("vpc") < pos("cluster"));
    assert!(pos("cluster") < pos("nodegroup"));
}

#[tokio::test(start_paused = true)]
async fn test_cycle_rejected_before_any_backend_call() {
    let m = manifest("demo", &[("a", &["b"]), ("b", &["a"])]);
    let backend = MockStackBackend::new();
    let result = deployer(&backend, &m)
        .deploy(&m, &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(OrchestratorError::Config(_))));
    assert!(backend.calls().is_empty(), "no side effects on cycle");
}

#[tokio::test(start_paused = true)]
async fn test_unresolved_dependency_rejected() {
    let m = manifest("demo", &[("cluster", &["vpc"])]);
    let backend = MockStackBackend::new();
    let result = deployer(&backend, &m)
        .deploy(&m, &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(OrchestratorError::Config(_))));
    assert!(backend.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_failed_dependency_skips_dependents() {
    let m = manifest(
        "demo",
        &[
            ("vpc", &[]),
            ("cluster", &["vpc"]),
            ("nodegroup", &["cluster"]),
            ("dns", &[]),
        ],
    );
    let backend = MockStackBackend::new();
    backend.set_behavior(
        "vpc",
        StackBehavior {
            fail_create: Some("rollback complete".to_string()),
            ..Default::default()
        },
    );

    let run = deployer(&backend, &m)
        .deploy(&m, &CancellationToken::new())
        .await
        .unwrap();

    let vpc = run.stack("vpc").unwrap();
    assert_eq!(vpc.state, StackState::Failed);
    assert!(vpc.last_error.as_deref().unwrap().contains("rollback"));

    // Dependents never attempted, transitively
    let cluster = run.stack("cluster").unwrap();
    assert_eq!(cluster.state, StackState::NotStarted);
    assert_eq!(cluster.skipped_due_to.as_deref(), Some("vpc"));
    let nodegroup = run.stack("nodegroup").unwrap();
    assert_eq!(nodegroup.state, StackState::NotStarted);
    assert_eq!(nodegroup.skipped_due_to.as_deref(), Some("cluster"));

    // Independent branch still ran
    assert_eq!(run.stack("dns").unwrap().state, StackState::Settled);

    assert!(!backend.calls_of("create").contains(&"cluster".to_string()));
    assert_eq!(
        run.outcome,
        RunOutcome::PartialFailure {
            failed: vec!["vpc".to_string()]
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_existing_stack_takes_update_path() {
    let m = manifest("demo", &[("vpc", &[])]);
    let backend = MockStackBackend::new();
    backend.mark_existing("vpc");

    let run = deployer(&backend, &m)
        .deploy(&m, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(run.outcome, RunOutcome::Success);
    assert_eq!(backend.calls_of("update"), vec!["vpc"]);
    assert!(backend.calls_of("create").is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_update_with_no_changes_is_settled() {
    let m = manifest("demo", &[("vpc", &[])]);
    let backend = MockStackBackend::new();
    backend.mark_existing("vpc");
    backend.set_behavior(
        "vpc",
        StackBehavior {
            update_no_changes: true,
            ..Default::default()
        },
    );

    let run = deployer(&backend, &m)
        .deploy(&m, &CancellationToken::new())
        .await
        .unwrap();

    let vpc = run.stack("vpc").unwrap();
    assert_eq!(vpc.state, StackState::Settled);
    assert!(vpc.last_error.is_none());
    assert_eq!(run.outcome, RunOutcome::Success);
}

#[tokio::test(start_paused = true)]
async fn test_settle_timeout_fails_stack_but_not_run() {
    let m = manifest("demo", &[("stuck", &[]), ("dns", &[])]);
    let backend = MockStackBackend::new();
    backend.set_behavior(
        "stuck",
        StackBehavior {
            never_settles: true,
            ..Default::default()
        },
    );

    let run = deployer(&backend, &m)
        .deploy(&m, &CancellationToken::new())
        .await
        .unwrap();

    let stuck = run.stack("stuck").unwrap();
    assert_eq!(stuck.state, StackState::Failed);
    assert!(stuck.last_error.as_deref().unwrap().contains("timeout"));

    assert_eq!(run.stack("dns").unwrap().state, StackState::Settled);
    assert_eq!(
        run.outcome,
        RunOutcome::PartialFailure {
            failed: vec!["stuck".to_string()]
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_independent_stacks_run_concurrently() {
    let m = manifest("demo", &[("a", &[]), ("b", &[]), ("c", &[])]);
    let backend = MockStackBackend::new();
    for name in ["a", "c"] {
        backend.set_behavior(
            name,
            StackBehavior {
                polls_until_settled: 3,
                ..Default::default()
            },
        );
    }
    // b is artificially delayed; it must not delay or fail the others
    backend.set_behavior(
        "b",
        StackBehavior {
            polls_until_settled: 5,
            ..Default::default()
        },
    );

    let start = tokio::time::Instant::now();
    let run = deployer(&backend, &m)
        .deploy(&m, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(run.outcome, RunOutcome::Success);
    for stack in &run.stacks {
        assert_eq!(stack.state, StackState::Settled, "stack {}", stack.name);
    }
    // Waits overlap: total time is the slowest stack, not the sum
    assert_eq!(start.elapsed(), Duration::from_secs(5));
}

#[tokio::test(start_paused = true)]
async fn test_dependency_outputs_resolve_into_parameters() {
    let mut m = manifest("demo", &[("vpc", &[])]);
    m.stacks.push(
        StackDescriptor::new("cluster", "templates/cluster.yaml")
            .with_dependency("vpc")
            .with_parameter("SubnetIds", "{vpc.SubnetIds}"),
    );
    let backend = MockStackBackend::new();
    backend.set_outputs("vpc", &[("SubnetIds", "subnet-1,subnet-2")]);

    let run = deployer(&backend, &m)
        .deploy(&m, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(run.outcome, RunOutcome::Success);
    let seen = backend.seen_descriptor("cluster").unwrap();
    assert_eq!(
        seen.parameters,
        vec![("SubnetIds".to_string(), "subnet-1,subnet-2".to_string())]
    );
    assert_eq!(
        run.stack("vpc").unwrap().outputs.get("SubnetIds").unwrap(),
        "subnet-1,subnet-2"
    );
}

#[tokio::test(start_paused = true)]
async fn test_missing_dependency_output_fails_stack_only() {
    let mut m = manifest("demo", &[("vpc", &[]), ("dns", &[])]);
    m.stacks.push(
        StackDescriptor::new("cluster", "templates/cluster.yaml")
            .with_dependency("vpc")
            .with_parameter("SubnetIds", "{vpc.DoesNotExist}"),
    );
    let backend = MockStackBackend::new();

    let run = deployer(&backend, &m)
        .deploy(&m, &CancellationToken::new())
        .await
        .unwrap();

    let cluster = run.stack("cluster").unwrap();
    assert_eq!(cluster.state, StackState::Failed);
    assert_eq!(run.stack("dns").unwrap().state, StackState::Settled);
}

#[tokio::test(start_paused = true)]
async fn test_cluster_access_refreshed_and_infra_ready_signalled() {
    let m = with_cluster(
        manifest("demo", &[("vpc", &[])]),
        "demo-cluster",
        "ap-northeast-1",
    );
    let backend = MockStackBackend::new();
    let access = MockClusterAccess::new();
    let ready = Arc::new(AtomicBool::new(false));
    let ready_flag = ready.clone();

    let run = Deployer::new(Arc::new(backend.clone()), config(&m))
        .with_cluster_access(Arc::new(access.clone()))
        .with_infra_ready_hook(Box::new(move |_| {
            ready_flag.store(true, Ordering::SeqCst);
        }))
        .deploy(&m, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(run.outcome, RunOutcome::Success);
    assert_eq!(access.refresh_count(), 1);
    assert!(ready.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn test_cluster_refresh_failure_is_warning_not_failure() {
    let m = with_cluster(
        manifest("demo", &[("vpc", &[])]),
        "demo-cluster",
        "ap-northeast-1",
    );
    let backend = MockStackBackend::new();
    let access = MockClusterAccess::new();
    access.fail_with("expired credentials");

    let run = Deployer::new(Arc::new(backend.clone()), config(&m))
        .with_cluster_access(Arc::new(access))
        .deploy(&m, &CancellationToken::new())
        .await
        .unwrap();

    // Settled stacks stay settled; the refresh problem is advisory
    assert_eq!(run.outcome, RunOutcome::Success);
    assert_eq!(run.stack("vpc").unwrap().state, StackState::Settled);
    assert!(
        run.warnings
            .iter()
            .any(|w| w.contains("cluster access refresh failed"))
    );
}

#[tokio::test(start_paused = true)]
async fn test_pre_cancelled_run_issues_no_operations() {
    let m = manifest("demo", &[("vpc", &[]), ("cluster", &["vpc"])]);
    let backend = MockStackBackend::new();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let run = deployer(&backend, &m).deploy(&m, &cancel).await.unwrap();

    assert_eq!(run.outcome, RunOutcome::Aborted);
    assert!(backend.calls().is_empty());
    for stack in &run.stacks {
        assert_eq!(stack.state, StackState::NotStarted);
    }
}

#[tokio::test(start_paused = true)]
async fn test_update_path_is_recorded_as_updating() {
    let m = manifest("demo", &[("vpc", &[])]);
    let backend = MockStackBackend::new();
    backend.mark_existing("vpc");
    backend.set_behavior(
        "vpc",
        StackBehavior {
            never_settles: true,
            ..Default::default()
        },
    );

    let cancel = CancellationToken::new();
    let deploy = {
        let backend = backend.clone();
        let m = m.clone();
        let cancel = cancel.clone();
        let config = config(&m);
        tokio::spawn(async move {
            Deployer::new(Arc::new(backend), config)
                .deploy(&m, &cancel)
                .await
        })
    };

    tokio::time::sleep(Duration::from_secs(2)).await;
    cancel.cancel();
    let run = deploy.await.unwrap().unwrap();

    // The stack was found on the backend, so the in-flight snapshot must
    // say Updating, not Creating
    let vpc = run.stack("vpc").unwrap();
    assert_eq!(vpc.state, StackState::Updating);
    assert_eq!(backend.calls_of("update"), vec!["vpc"]);
    assert!(backend.calls_of("create").is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_mid_run_stops_new_work() {
    let m = manifest("demo", &[("slow", &[]), ("late", &["slow"])]);
    let backend = MockStackBackend::new();
    backend.set_behavior(
        "slow",
        StackBehavior {
            never_settles: true,
            ..Default::default()
        },
    );

    let cancel = CancellationToken::new();
    let deploy = {
        let backend = backend.clone();
        let m = m.clone();
        let cancel = cancel.clone();
        let config = config(&m);
        tokio::spawn(async move {
            Deployer::new(Arc::new(backend), config)
                .deploy(&m, &cancel)
                .await
        })
    };

    tokio::time::sleep(Duration::from_secs(2)).await;
    cancel.cancel();
    let run = deploy.await.unwrap().unwrap();

    assert_eq!(run.outcome, RunOutcome::Aborted);
    // The in-flight stack observed cancellation at a poll boundary and
    // keeps its as-it-stood state; the dependent was never started.
    let slow = run.stack("slow").unwrap();
    assert_eq!(slow.state, StackState::Creating);
    assert_eq!(slow.last_error.as_deref(), Some("run cancelled"));
    assert_eq!(run.stack("late").unwrap().state, StackState::NotStarted);
    assert!(backend.calls_of("create").iter().all(|c| c == "slow"));
}
