//! Deployment orchestrator
//!
//! Applies a manifest's stacks in stable topological order. Independent
//! ready stacks run concurrently as tasks; the status table is written
//! only by the scheduler loop, with tasks reporting results through the
//! join set (single-writer).

use crate::error::Result;
use crate::run::DeploymentRun;
use stackflow_cloud::{
    ClusterAccess, OperationState, StackBackend, StackState, UpdateOutcome, WaitConfig, WaitError,
    wait_for_state,
};
use stackflow_core::{DependencyGraph, Manifest, OrchestratorConfig, StackDescriptor};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Called once every stack has settled and cluster access is refreshed,
/// so an external workload-deployment step can apply its manifests.
pub type InfraReadyHook = Box<dyn Fn(&DeploymentRun) + Send + Sync>;

/// Deployment orchestrator
pub struct Deployer {
    backend: Arc<dyn StackBackend>,
    cluster_access: Option<Arc<dyn ClusterAccess>>,
    config: OrchestratorConfig,
    on_infra_ready: Option<InfraReadyHook>,
}

/// What one stack task reports back to the scheduler
enum Applied {
    Settled {
        outputs: BTreeMap<String, String>,
    },
    Failed {
        error: String,
    },
    /// The run was cancelled while this stack's wait was in flight; its
    /// backend state is indeterminate and its recorded state stays as it
    /// stood.
    Cancelled,
}

impl Deployer {
    pub fn new(backend: Arc<dyn StackBackend>, config: OrchestratorConfig) -> Self {
        Self {
            backend,
            cluster_access: None,
            config,
            on_infra_ready: None,
        }
    }

    pub fn with_cluster_access(mut self, access: Arc<dyn ClusterAccess>) -> Self {
        self.cluster_access = Some(access);
        self
    }

    pub fn with_infra_ready_hook(mut self, hook: InfraReadyHook) -> Self {
        self.on_infra_ready = Some(hook);
        self
    }

    /// Deploy every stack in the manifest.
    ///
    /// Fails fast (before any backend call) on a dependency cycle or an
    /// unresolved dependency name. Per-stack failures are recorded on the
    /// run; only their dependents are skipped.
    pub async fn deploy(
        &self,
        manifest: &Manifest,
        cancel: &CancellationToken,
    ) -> Result<DeploymentRun> {
        let graph = DependencyGraph::build(&manifest.stacks)?;
        let order = graph.ordering()?;

        tracing::info!(project = %self.config.project, stacks = order.len(), "starting deployment");

        let mut run = DeploymentRun::begin(&self.config.project, &order);
        let descriptors: HashMap<&str, &StackDescriptor> = manifest
            .stacks
            .iter()
            .map(|s| (s.name.as_str(), s))
            .collect();
        let wait_config = WaitConfig::new(self.config.settle_timeout, self.config.poll_interval);

        let mut scheduled: HashSet<String> = HashSet::new();
        let mut outputs_by_stack: HashMap<String, BTreeMap<String, String>> = HashMap::new();
        let mut tasks: JoinSet<(String, Applied)> = JoinSet::new();
        let mut aborted = false;

        loop {
            if !aborted && cancel.is_cancelled() {
                tracing::warn!("cancellation requested; no new stack operations will start");
                aborted = true;
            }

            if !aborted {
                self.schedule_ready(
                    &order,
                    &graph,
                    &descriptors,
                    &mut run,
                    &mut scheduled,
                    &outputs_by_stack,
                    &wait_config,
                    cancel,
                    &mut tasks,
                )
                .await;
            }

            let Some(joined) = tasks.join_next().await else {
                break;
            };
            match joined {
                Ok((name, applied)) => match applied {
                    Applied::Settled { outputs } => {
                        tracing::info!(stack = %name, "stack settled");
                        if let Some(stack) = run.stack_mut(&name) {
                            stack.state = StackState::Settled;
                            stack.outputs = outputs.clone();
                        }
                        outputs_by_stack.insert(name, outputs);
                    }
                    Applied::Failed { error } => {
                        tracing::error!(stack = %name, %error, "stack failed");
                        run.mark_failed(&name, error);
                    }
                    Applied::Cancelled => {
                        tracing::warn!(stack = %name, "stack wait cancelled in flight");
                        if let Some(stack) = run.stack_mut(&name) {
                            stack.last_error = Some("run cancelled".to_string());
                        }
                        aborted = true;
                    }
                },
                Err(join_error) => {
                    tracing::error!(%join_error, "stack task aborted unexpectedly");
                    run.warnings.push(format!("stack task aborted: {join_error}"));
                    aborted = true;
                }
            }
        }

        run.finish(aborted);

        if run.outcome == crate::run::RunOutcome::Success {
            self.refresh_cluster_access(&mut run).await;
        }

        Ok(run)
    }

    /// Spawn every not-yet-scheduled stack whose dependencies are all
    /// settled; skip stacks with a failed or skipped dependency.
    ///
    /// The backend existence probe happens here, before the task starts,
    /// so the status table records `Creating` or `Updating` to match the
    /// path the stack will take.
    #[allow(clippy::too_many_arguments)]
    async fn schedule_ready(
        &self,
        order: &[String],
        graph: &DependencyGraph,
        descriptors: &HashMap<&str, &StackDescriptor>,
        run: &mut DeploymentRun,
        scheduled: &mut HashSet<String>,
        outputs_by_stack: &HashMap<String, BTreeMap<String, String>>,
        wait_config: &WaitConfig,
        cancel: &CancellationToken,
        tasks: &mut JoinSet<(String, Applied)>,
    ) {
        // Skips can cascade, so sweep until a fixpoint
        loop {
            let mut changed = false;

            for name in order {
                if scheduled.contains(name) {
                    continue;
                }
                let Some(record) = run.stack(name) else {
                    continue;
                };
                if record.is_skipped() {
                    continue;
                }

                let deps = graph.dependencies_of(name);
                let blocked = deps.iter().find(|dep| {
                    run.stack(dep)
                        .map(|d| d.state == StackState::Failed || d.is_skipped())
                        .unwrap_or(false)
                });
                if let Some(dep) = blocked {
                    tracing::warn!(stack = %name, dependency = %dep, "skipping: dependency did not settle");
                    run.mark_skipped(name, *dep);
                    changed = true;
                    continue;
                }

                let ready = deps
                    .iter()
                    .all(|dep| run.stack(dep).map(|d| d.state == StackState::Settled) == Some(true));
                if !ready {
                    continue;
                }

                let Some(descriptor) = descriptors.get(name.as_str()) else {
                    continue;
                };
                scheduled.insert(name.clone());
                changed = true;

                let resolved = match resolve_parameters(descriptor, outputs_by_stack) {
                    Ok(resolved) => resolved,
                    Err(error) => {
                        run.mark_failed(name, error);
                        continue;
                    }
                };
                let exists = match self.backend.exists(name).await {
                    Ok(exists) => exists,
                    Err(e) => {
                        run.mark_failed(name, format!("existence check failed: {e}"));
                        continue;
                    }
                };
                run.set_state(
                    name,
                    if exists {
                        StackState::Updating
                    } else {
                        StackState::Creating
                    },
                );

                let backend = self.backend.clone();
                let wait_config = wait_config.clone();
                let cancel = cancel.clone();
                tasks.spawn(async move {
                    let name = resolved.name.clone();
                    let applied = apply_one(backend, resolved, exists, wait_config, cancel).await;
                    (name, applied)
                });
            }

            if !changed {
                break;
            }
        }
    }

    async fn refresh_cluster_access(&self, run: &mut DeploymentRun) {
        let Some(spec) = &self.config.cluster else {
            self.signal_infra_ready(run);
            return;
        };
        let Some(access) = &self.cluster_access else {
            self.signal_infra_ready(run);
            return;
        };

        match access.refresh_access(&spec.name, &spec.region).await {
            Ok(credentials) => {
                match access.check_ready(&credentials).await {
                    Ok(true) => {
                        tracing::info!(cluster = %spec.name, "cluster access refreshed");
                    }
                    Ok(false) => {
                        run.warnings
                            .push(format!("cluster '{}' is not ready yet", spec.name));
                    }
                    Err(e) => {
                        run.warnings
                            .push(format!("cluster readiness probe failed: {e}"));
                    }
                }
                self.signal_infra_ready(run);
            }
            Err(e) => {
                // Settled stacks stay settled; the refresh failure is
                // surfaced to the caller as a warning on the run.
                tracing::error!(cluster = %spec.name, error = %e, "cluster access refresh failed");
                run.warnings
                    .push(format!("cluster access refresh failed: {e}"));
            }
        }
    }

    fn signal_infra_ready(&self, run: &DeploymentRun) {
        if let Some(hook) = &self.on_infra_ready {
            tracing::info!("infrastructure ready");
            hook(run);
        }
    }
}

/// Drive one stack to settled: update when the scheduler found it on
/// the backend, create otherwise, then poll until the backend reports a
/// terminal operation state or the bound elapses.
async fn apply_one(
    backend: Arc<dyn StackBackend>,
    stack: StackDescriptor,
    exists: bool,
    wait_config: WaitConfig,
    cancel: CancellationToken,
) -> Applied {
    let name = stack.name.clone();

    let handle = if exists {
        tracing::debug!(stack = %name, "stack exists, updating");
        match backend.update(&stack).await {
            Ok(UpdateOutcome::Started(handle)) => handle,
            Ok(UpdateOutcome::NoChanges) => {
                // Benign idempotent outcome: the stack is already in the
                // desired state.
                tracing::info!(stack = %name, "no changes to apply");
                return Applied::Settled {
                    outputs: fetch_outputs(&*backend, &name).await,
                };
            }
            Err(e) => {
                return Applied::Failed {
                    error: format!("update rejected: {e}"),
                };
            }
        }
    } else {
        tracing::debug!(stack = %name, "stack absent, creating");
        match backend.create(&stack).await {
            Ok(handle) => handle,
            Err(e) => {
                return Applied::Failed {
                    error: format!("create rejected: {e}"),
                };
            }
        }
    };

    let wait = wait_for_state(
        || {
            let backend = backend.clone();
            let handle = handle.clone();
            async move {
                match backend.poll(&handle).await {
                    Ok(state) => state,
                    Err(e) => OperationState::Failed(format!("poll failed: {e}")),
                }
            }
        },
        OperationState::is_terminal,
        &wait_config,
        &cancel,
    )
    .await;

    match wait {
        Ok(OperationState::Succeeded) => Applied::Settled {
            outputs: fetch_outputs(&*backend, &name).await,
        },
        Ok(OperationState::Failed(reason)) => Applied::Failed { error: reason },
        Ok(OperationState::InProgress) => unreachable!("InProgress is not terminal"),
        Err(WaitError::Timeout(bound)) => Applied::Failed {
            error: format!("timeout: stack did not settle within {bound:?}"),
        },
        Err(WaitError::Cancelled) => Applied::Cancelled,
    }
}

async fn fetch_outputs(backend: &dyn StackBackend, name: &str) -> BTreeMap<String, String> {
    match backend.outputs(name).await {
        Ok(outputs) => outputs,
        Err(e) => {
            tracing::warn!(stack = %name, error = %e, "could not fetch stack outputs");
            BTreeMap::new()
        }
    }
}

fn is_reference_name(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Substitute `{stack.OutputName}` placeholders in parameter values with
/// the live outputs of settled dependencies.
fn resolve_parameters(
    descriptor: &StackDescriptor,
    outputs_by_stack: &HashMap<String, BTreeMap<String, String>>,
) -> std::result::Result<StackDescriptor, String> {
    let mut resolved = descriptor.clone();
    for (key, value) in &mut resolved.parameters {
        let mut out = String::with_capacity(value.len());
        let mut rest = value.as_str();
        while let Some(start) = rest.find('{') {
            let Some(len) = rest[start..].find('}') else {
                break;
            };
            let placeholder = &rest[start + 1..start + len];
            out.push_str(&rest[..start]);
            match placeholder.split_once('.') {
                Some((stack, output)) if is_reference_name(stack) && is_reference_name(output) => {
                    let found = outputs_by_stack
                        .get(stack)
                        .and_then(|outputs| outputs.get(output));
                    match found {
                        Some(v) => out.push_str(v),
                        None => {
                            return Err(format!(
                                "parameter '{key}' references unknown output '{placeholder}'"
                            ));
                        }
                    }
                }
                _ => {
                    // Not an output reference; keep the braces verbatim
                    out.push_str(&rest[start..start + len + 1]);
                }
            }
            rest = &rest[start + len + 1..];
        }
        out.push_str(rest);
        *value = out;
    }
    Ok(resolved)
}
