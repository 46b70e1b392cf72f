//! Stack operation execution.
//!
//! Drives a resolved plan to completion: renders each stack, submits the
//! create/update/delete request, polls the asynchronous provider operation
//! until it settles, and aggregates failure diagnostics from the stack's
//! event history. Operations execute strictly in plan order; node-pool
//! operations within one batch run concurrently since they only depend on
//! the control plane having settled.

use crate::config::ClusterConfig;
use crate::error::{CirrusError, Result};
use crate::plan::{batches, StackOperation};
use crate::provider::{PollOutcome, StackEvent, StackService};
use crate::render::TemplateRenderer;
use crate::target::OperationTarget;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Lifecycle of one stack operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationState {
    Pending,
    Submitting,
    InProgress,
    Succeeded,
    Failed,
}

/// Execution knobs.
#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    /// Fixed interval between provider status polls.
    pub poll_interval: Duration,
    /// Return as soon as each request is accepted instead of waiting for
    /// the operation to settle.
    pub skip_wait: bool,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self { poll_interval: Duration::from_secs(10), skip_wait: false }
    }
}

/// Result of one settled stack operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationOutcome {
    pub target: OperationTarget,
    pub stack_name: String,
    /// The provider had nothing to change.
    pub no_change: bool,
    pub final_status: String,
}

/// Results of a whole plan, in execution order.
#[derive(Debug, Clone, Default)]
pub struct ExecutionReport {
    pub outcomes: Vec<OperationOutcome>,
}

impl ExecutionReport {
    /// Human-readable per-stack summary.
    pub fn summary(&self) -> String {
        self.outcomes
            .iter()
            .map(|o| {
                if o.no_change {
                    format!("{}: no changes", o.stack_name)
                } else {
                    format!("{}: {}", o.stack_name, o.final_status)
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Executes resolved stack plans against a [`StackService`].
pub struct StackOrchestrator {
    stacks: Arc<dyn StackService>,
    renderer: Arc<dyn TemplateRenderer>,
    options: OrchestratorOptions,
}

impl StackOrchestrator {
    pub fn new(
        stacks: Arc<dyn StackService>,
        renderer: Arc<dyn TemplateRenderer>,
        options: OrchestratorOptions,
    ) -> Self {
        Self { stacks, renderer, options }
    }

    /// Execute a plan, batch by batch.
    ///
    /// A failed operation halts everything after it; the caller is left
    /// with the outcomes of the operations that settled plus the failure
    /// diagnostics of the one that stopped the sequence.
    #[instrument(skip(self, config, operations), fields(cluster = %config.cluster_name))]
    pub async fn execute(
        &self,
        config: &ClusterConfig,
        operations: &[StackOperation],
    ) -> Result<ExecutionReport> {
        let config = Arc::new(config.clone());
        let mut report = ExecutionReport::default();

        for batch in batches(operations) {
            if let [operation] = batch.as_slice() {
                report.outcomes.push(self.run(&config, operation.clone()).await?);
                continue;
            }

            // Mutually independent operations (node pools) run concurrently,
            // each with its own rendered template and poll loop.
            let handles: Vec<JoinHandle<Result<OperationOutcome>>> = batch
                .into_iter()
                .map(|operation| {
                    let stacks = self.stacks.clone();
                    let renderer = self.renderer.clone();
                    let options = self.options.clone();
                    let config = config.clone();
                    tokio::spawn(async move {
                        run_operation(stacks, renderer, options, config, operation).await
                    })
                })
                .collect();

            for handle in handles {
                let outcome =
                    handle.await.map_err(|e| CirrusError::Internal(e.to_string()))??;
                report.outcomes.push(outcome);
            }
        }

        Ok(report)
    }

    async fn run(
        &self,
        config: &Arc<ClusterConfig>,
        operation: StackOperation,
    ) -> Result<OperationOutcome> {
        run_operation(
            self.stacks.clone(),
            self.renderer.clone(),
            self.options.clone(),
            config.clone(),
            operation,
        )
        .await
    }
}

/// Drive one operation through `Pending -> Submitting -> InProgress ->
/// {Succeeded | Failed}`.
async fn run_operation(
    stacks: Arc<dyn StackService>,
    renderer: Arc<dyn TemplateRenderer>,
    options: OrchestratorOptions,
    config: Arc<ClusterConfig>,
    operation: StackOperation,
) -> Result<OperationOutcome> {
    let mut state = OperationState::Pending;
    debug!(target = %operation.target, kind = %operation.kind, ?state, "rendering stack template");
    let rendered = renderer.render(&operation.target, &config).await?;
    let stack_name = rendered.stack_name.clone();

    state = OperationState::Submitting;
    debug!(stack = %stack_name, kind = %operation.kind, ?state, "submitting stack request");
    let submitted = stacks
        .submit(&stack_name, &rendered.template_body, &rendered.parameters, operation.kind)
        .await?;
    metrics::counter!("cirrus_stack_submit_total", "kind" => operation.kind.to_string())
        .increment(1);

    if submitted.no_change {
        info!(stack = %stack_name, "no updates to perform");
        return Ok(OperationOutcome {
            target: operation.target,
            stack_name,
            no_change: true,
            final_status: String::new(),
        });
    }

    if options.skip_wait {
        info!(stack = %stack_name, "request accepted, not waiting for completion");
        return Ok(OperationOutcome {
            target: operation.target,
            stack_name,
            no_change: false,
            final_status: "SUBMITTED".to_string(),
        });
    }

    state = OperationState::InProgress;
    loop {
        match stacks.poll_status(&stack_name).await? {
            PollOutcome::InProgress { status } => {
                debug!(stack = %stack_name, %status, ?state, "waiting for stack to settle");
                tokio::time::sleep(options.poll_interval).await;
            }
            PollOutcome::Done { status, succeeded: true } => {
                state = OperationState::Succeeded;
                info!(stack = %stack_name, %status, ?state, "stack operation succeeded");
                metrics::counter!("cirrus_stack_operations_total", "result" => "succeeded")
                    .increment(1);
                return Ok(OperationOutcome {
                    target: operation.target,
                    stack_name,
                    no_change: false,
                    final_status: status,
                });
            }
            PollOutcome::Done { status, succeeded: false } => {
                state = OperationState::Failed;
                warn!(stack = %stack_name, %status, ?state, "stack operation failed, fetching events");
                metrics::counter!("cirrus_stack_operations_total", "result" => "failed")
                    .increment(1);

                let events = stacks.list_events(&stack_name).await?;
                let messages = stack_event_messages(&events);
                let details =
                    if messages.is_empty() { status } else { messages.join("\n") };
                return Err(CirrusError::StackOperationFailed { stack_name, details });
            }
        }
    }
}

/// Extract human-readable failure messages from a stack's event history.
///
/// Only failure events are kept; failures caused by the provider cancelling
/// a sibling resource are suppressed so the actual root cause is not buried.
/// Each message is the event's non-empty fields joined with spaces, in the
/// order the provider reported the events.
pub fn stack_event_messages(events: &[StackEvent]) -> Vec<String> {
    events
        .iter()
        .filter(|event| event.status.contains("FAILED"))
        .filter(|event| event.status_reason.as_deref() != Some("Resource creation cancelled"))
        .map(|event| {
            let mut parts = vec![event.status.as_str(), event.resource_type.as_str()];
            if let Some(id) = event.logical_id.as_deref() {
                if !id.is_empty() {
                    parts.push(id);
                }
            }
            if let Some(reason) = event.status_reason.as_deref() {
                if !reason.is_empty() {
                    parts.push(reason);
                }
            }
            parts.join(" ")
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkerPool;
    use crate::plan::{plan, OperationKind};
    use crate::provider::MemoryProvider;
    use crate::render::BuiltinRenderer;
    use crate::target::OperationTarget;

    fn test_config() -> ClusterConfig {
        ClusterConfig {
            cluster_name: "test".to_string(),
            region: "us-west-1".to_string(),
            key_name: "mykey".to_string(),
            worker_pools: vec![
                WorkerPool { name: "pool-a".to_string(), ..Default::default() },
                WorkerPool { name: "pool-b".to_string(), ..Default::default() },
            ],
            ..Default::default()
        }
    }

    fn fast_options() -> OrchestratorOptions {
        OrchestratorOptions { poll_interval: Duration::from_millis(1), skip_wait: false }
    }

    fn orchestrator(provider: Arc<MemoryProvider>) -> StackOrchestrator {
        StackOrchestrator::new(provider, Arc::new(BuiltinRenderer), fast_options())
    }

    fn event(
        status: &str,
        resource_type: &str,
        logical_id: Option<&str>,
        reason: Option<&str>,
    ) -> StackEvent {
        StackEvent {
            resource_type: resource_type.to_string(),
            logical_id: logical_id.map(String::from),
            status: status.to_string(),
            status_reason: reason.map(String::from),
        }
    }

    #[test]
    fn test_event_aggregation() {
        let events = vec![
            // Failure with all fields set
            event("CREATE_FAILED", "Computer", Some("test_comp"), Some("BAD HD")),
            // Success, should not show up
            event("SUCCESS", "Computer", None, None),
            // Failure due to cancellation should not show up
            event("CREATE_FAILED", "Computer", None, Some("Resource creation cancelled")),
            // Failure with missing fields
            event("CREATE_FAILED", "Computer", None, None),
        ];

        let messages = stack_event_messages(&events);
        assert_eq!(
            messages,
            vec!["CREATE_FAILED Computer test_comp BAD HD", "CREATE_FAILED Computer"]
        );
    }

    #[tokio::test]
    async fn test_full_create_runs_in_plan_order() {
        let provider = Arc::new(MemoryProvider::new());
        let config = test_config();
        let operations = plan(&[], &config, OperationKind::Create).unwrap();

        let report = orchestrator(provider.clone()).execute(&config, &operations).await.unwrap();
        assert_eq!(report.outcomes.len(), 4);

        let submitted: Vec<String> =
            provider.submits().iter().map(|s| s.stack_name.clone()).collect();
        assert_eq!(submitted[0], "test-etcd");
        assert_eq!(submitted[1], "test-control-plane");
        // Pool submissions race each other but both come after the control plane.
        assert!(submitted[2..].contains(&"test-pool-a".to_string()));
        assert!(submitted[2..].contains(&"test-pool-b".to_string()));
    }

    #[tokio::test]
    async fn test_no_change_update_is_success() {
        let provider = Arc::new(MemoryProvider::new().with_no_change("test-etcd"));
        let config = test_config();
        let operations =
            plan(&[OperationTarget::Etcd], &config, OperationKind::Update).unwrap();

        let report = orchestrator(provider).execute(&config, &operations).await.unwrap();
        assert_eq!(report.outcomes.len(), 1);
        assert!(report.outcomes[0].no_change);
        assert!(report.summary().contains("no changes"));
    }

    #[tokio::test]
    async fn test_failure_halts_remaining_sequence() {
        let provider = Arc::new(
            MemoryProvider::new()
                .with_polls(
                    "test-etcd",
                    vec![PollOutcome::Done {
                        status: "CREATE_FAILED".to_string(),
                        succeeded: false,
                    }],
                )
                .with_events(
                    "test-etcd",
                    vec![event("CREATE_FAILED", "Volume", Some("data"), Some("out of quota"))],
                ),
        );
        let config = test_config();
        let operations = plan(
            &[OperationTarget::Etcd, OperationTarget::ControlPlane],
            &config,
            OperationKind::Create,
        )
        .unwrap();

        let err = orchestrator(provider.clone())
            .execute(&config, &operations)
            .await
            .unwrap_err();
        match err {
            CirrusError::StackOperationFailed { stack_name, details } => {
                assert_eq!(stack_name, "test-etcd");
                assert_eq!(details, "CREATE_FAILED Volume data out of quota");
            }
            other => panic!("unexpected error: {:?}", other),
        }

        // The control-plane stack must never have been submitted.
        let submitted: Vec<String> =
            provider.submits().iter().map(|s| s.stack_name.clone()).collect();
        assert_eq!(submitted, vec!["test-etcd"]);
    }

    #[tokio::test]
    async fn test_skip_wait_returns_after_submission() {
        // Polling would never settle; skip-wait must not poll at all.
        let provider = Arc::new(MemoryProvider::new().with_polls(
            "test-etcd",
            vec![PollOutcome::InProgress { status: "CREATE_IN_PROGRESS".to_string() }],
        ));
        let config = test_config();
        let operations =
            plan(&[OperationTarget::Etcd], &config, OperationKind::Create).unwrap();

        let options = OrchestratorOptions { skip_wait: true, ..fast_options() };
        let orchestrator =
            StackOrchestrator::new(provider, Arc::new(BuiltinRenderer), options);
        let report = orchestrator.execute(&config, &operations).await.unwrap();
        assert_eq!(report.outcomes[0].final_status, "SUBMITTED");
    }

    #[tokio::test]
    async fn test_polling_waits_for_terminal_status() {
        let provider = Arc::new(MemoryProvider::new().with_polls(
            "test-etcd",
            vec![
                PollOutcome::InProgress { status: "CREATE_IN_PROGRESS".to_string() },
                PollOutcome::InProgress { status: "CREATE_IN_PROGRESS".to_string() },
                PollOutcome::Done { status: "CREATE_COMPLETE".to_string(), succeeded: true },
            ],
        ));
        let config = test_config();
        let operations =
            plan(&[OperationTarget::Etcd], &config, OperationKind::Create).unwrap();

        let report = orchestrator(provider).execute(&config, &operations).await.unwrap();
        assert_eq!(report.outcomes[0].final_status, "CREATE_COMPLETE");
    }

    #[tokio::test]
    async fn test_provider_rejection_propagates() {
        let provider =
            Arc::new(MemoryProvider::new().with_rejection("test-etcd", "template too large"));
        let config = test_config();
        let operations =
            plan(&[OperationTarget::Etcd], &config, OperationKind::Create).unwrap();

        let err = orchestrator(provider).execute(&config, &operations).await.unwrap_err();
        assert!(matches!(err, CirrusError::ProviderRejected { .. }));
    }

    #[tokio::test]
    async fn test_failure_without_events_falls_back_to_status() {
        let provider = Arc::new(MemoryProvider::new().with_polls(
            "test-etcd",
            vec![PollOutcome::Done { status: "ROLLBACK_COMPLETE".to_string(), succeeded: false }],
        ));
        let config = test_config();
        let operations =
            plan(&[OperationTarget::Etcd], &config, OperationKind::Create).unwrap();

        let err = orchestrator(provider).execute(&config, &operations).await.unwrap_err();
        match err {
            CirrusError::StackOperationFailed { details, .. } => {
                assert_eq!(details, "ROLLBACK_COMPLETE");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
