//! Teardown orchestrator
//!
//! Mirror-image of deployment: the application layer is removed first,
//! best effort, since it may hold backend resources that block stack
//! deletion. Stacks are then deleted in strict reverse topological
//! order. Destruction never starts without the exact confirmation token.

use crate::error::{OrchestratorError, Result};
use crate::run::DeploymentRun;
use futures_util::future::BoxFuture;
use stackflow_cloud::{
    OperationState, StackBackend, StackState, WaitConfig, WaitError, wait_for_state,
};
use stackflow_core::{DependencyGraph, Manifest, OrchestratorConfig};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Removes application-layer resources before any stack deletion.
/// Errors are logged and teardown proceeds: stuck stacks are worse than
/// partial cleanup.
pub type PreTeardownHook =
    Box<dyn Fn() -> BoxFuture<'static, std::result::Result<(), String>> + Send + Sync>;

/// Teardown orchestrator
pub struct Destroyer {
    backend: Arc<dyn StackBackend>,
    config: OrchestratorConfig,
    pre_teardown: Option<PreTeardownHook>,
}

impl Destroyer {
    pub fn new(backend: Arc<dyn StackBackend>, config: OrchestratorConfig) -> Self {
        Self {
            backend,
            config,
            pre_teardown: None,
        }
    }

    pub fn with_pre_teardown_hook(mut self, hook: PreTeardownHook) -> Self {
        self.pre_teardown = Some(hook);
        self
    }

    /// Delete every stack in the manifest, in reverse dependency order.
    ///
    /// `confirmation` must equal the project name exactly; otherwise the
    /// call returns [`OrchestratorError::ConfirmationDenied`] before any
    /// backend call.
    pub async fn teardown(
        &self,
        manifest: &Manifest,
        confirmation: &str,
        cancel: &CancellationToken,
    ) -> Result<DeploymentRun> {
        if confirmation != self.config.project {
            return Err(OrchestratorError::ConfirmationDenied {
                expected: self.config.project.clone(),
            });
        }

        let graph = DependencyGraph::build(&manifest.stacks)?;
        let order = graph.reverse_ordering()?;

        tracing::info!(project = %self.config.project, stacks = order.len(), "starting teardown");

        let mut run = DeploymentRun::begin(&self.config.project, &order);
        let wait_config = WaitConfig::new(self.config.settle_timeout, self.config.poll_interval);

        if let Some(hook) = &self.pre_teardown {
            if let Err(e) = hook().await {
                tracing::warn!(error = %e, "pre-teardown hook failed; proceeding anyway");
                run.warnings
                    .push(format!("application-layer cleanup failed: {e}"));
            }
        }

        let mut aborted = false;
        for name in &order {
            if cancel.is_cancelled() {
                aborted = true;
                break;
            }

            // A stack may be deleted only once everything depending on it
            // is gone. A dependent that failed to delete (or was skipped)
            // blocks this stack.
            let blocking = graph.dependents_of(name).into_iter().find(|dep| {
                run.stack(dep)
                    .map(|d| d.state != StackState::Deleted)
                    .unwrap_or(false)
            });
            if let Some(dep) = blocking {
                tracing::warn!(stack = %name, dependent = %dep, "skipping deletion: dependent still present");
                run.mark_skipped(name, dep);
                continue;
            }

            self.delete_one(name, &mut run, &wait_config, cancel).await;
            if cancel.is_cancelled()
                && run.stack(name).map(|s| s.state) == Some(StackState::Deleting)
            {
                aborted = true;
                break;
            }
        }

        run.finish(aborted);
        self.check_residuals(&mut run).await;

        Ok(run)
    }

    async fn delete_one(
        &self,
        name: &str,
        run: &mut DeploymentRun,
        wait_config: &WaitConfig,
        cancel: &CancellationToken,
    ) {
        match self.backend.exists(name).await {
            Ok(false) => {
                // Never created (or already gone): nothing to delete
                tracing::info!(stack = %name, "stack does not exist, nothing to delete");
                run.set_state(name, StackState::Deleted);
                return;
            }
            Ok(true) => {}
            Err(e) => {
                run.mark_failed(name, format!("existence check failed: {e}"));
                return;
            }
        }

        run.set_state(name, StackState::Deleting);
        let handle = match self.backend.delete(name).await {
            Ok(handle) => handle,
            Err(e) => {
                tracing::error!(stack = %name, error = %e, "delete rejected");
                run.mark_failed(name, format!("delete rejected: {e}"));
                return;
            }
        };

        let backend = self.backend.clone();
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
            wait_config,
            cancel,
        )
        .await;

        match wait {
            Ok(OperationState::Succeeded) => {
                tracing::info!(stack = %name, "stack deleted");
                run.set_state(name, StackState::Deleted);
            }
            Ok(OperationState::Failed(reason)) => {
                tracing::error!(stack = %name, %reason, "deletion failed");
                run.mark_failed(name, reason);
            }
            Ok(OperationState::InProgress) => unreachable!("InProgress is not terminal"),
            Err(WaitError::Timeout(bound)) => {
                run.mark_failed(
                    name,
                    format!("timeout: deletion did not complete within {bound:?}"),
                );
            }
            Err(WaitError::Cancelled) => {
                // Backend state indeterminate; leave the record as Deleting
                if let Some(stack) = run.stack_mut(name) {
                    stack.last_error = Some("run cancelled".to_string());
                }
            }
        }
    }

    /// Best-effort residual-resource check. Findings are advisory
    /// warnings, never fatal.
    async fn check_residuals(&self, run: &mut DeploymentRun) {
        match self
            .backend
            .list_tagged("project", &self.config.project)
            .await
        {
            Ok(residuals) => {
                for resource in residuals {
                    tracing::warn!(%resource, "residual resource left behind");
                    run.warnings
                        .push(format!("residual resource left behind: {resource}"));
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "residual resource check failed");
                run.warnings
                    .push(format!("residual resource check failed: {e}"));
            }
        }
    }
}
