//! Cluster facade.
//!
//! Ties one configuration, one provider, and the orchestrator options into
//! the operations the command surface exposes. Every mutating entry point
//! validates first; the orchestrator never runs on a failed-validation
//! configuration.

use crate::config::ClusterConfig;
use crate::error::Result;
use crate::orchestrate::{ExecutionReport, OrchestratorOptions, StackOrchestrator};
use crate::plan::{plan, OperationKind};
use crate::provider::ProviderSet;
use crate::render::{BuiltinRenderer, TemplateRenderer};
use crate::target::{expand, OperationTarget};
use crate::validate::StateValidator;
use std::fmt;
use std::sync::Arc;
use tracing::{info, instrument};

/// A provisioned-or-to-be-provisioned cluster.
pub struct Cluster {
    config: ClusterConfig,
    provider: ProviderSet,
    renderer: Arc<dyn TemplateRenderer>,
    options: OrchestratorOptions,
}

/// Connection summary printed after successful operations.
#[derive(Debug, Clone)]
pub struct ClusterInfo {
    pub cluster_name: String,
    pub external_dns_name: String,
}

impl fmt::Display for ClusterInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Cluster name:  {}", self.cluster_name)?;
        write!(f, "API endpoint:  https://{}", self.external_dns_name)
    }
}

impl Cluster {
    pub fn new(config: ClusterConfig, provider: ProviderSet, options: OrchestratorOptions) -> Self {
        Self { config, provider, renderer: Arc::new(BuiltinRenderer), options }
    }

    /// Swap in a different template-rendering collaborator.
    pub fn with_renderer(mut self, renderer: Arc<dyn TemplateRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    /// Run the pre-flight checks applicable to the requested targets.
    #[instrument(skip(self), fields(cluster = %self.config.cluster_name))]
    pub async fn validate(&self, targets: &[OperationTarget]) -> Result<()> {
        let expanded = expand(targets, &self.config)?;
        StateValidator::new(&self.config, self.provider.query.as_ref())
            .validate(&expanded)
            .await
    }

    /// Create the requested stacks, in dependency order.
    pub async fn create(&self, targets: &[OperationTarget]) -> Result<ExecutionReport> {
        self.operate(targets, OperationKind::Create).await
    }

    /// Update the requested stacks, in dependency order. Re-running against
    /// an already-converged cluster reports "no changes" per stack.
    pub async fn update(&self, targets: &[OperationTarget]) -> Result<ExecutionReport> {
        self.operate(targets, OperationKind::Update).await
    }

    /// Tear down the requested stacks, dependents first.
    pub async fn destroy(&self, targets: &[OperationTarget]) -> Result<ExecutionReport> {
        self.operate(targets, OperationKind::Delete).await
    }

    /// Connection info for the cluster.
    pub fn info(&self) -> ClusterInfo {
        ClusterInfo {
            cluster_name: self.config.cluster_name.clone(),
            external_dns_name: self.config.external_dns_name.clone(),
        }
    }

    async fn operate(
        &self,
        targets: &[OperationTarget],
        kind: OperationKind,
    ) -> Result<ExecutionReport> {
        let expanded = expand(targets, &self.config)?;

        // Teardown skips the control-plane-scoped checks: a record or
        // volume belonging to the cluster being destroyed must not block
        // its own removal. Network and key-pair checks still apply.
        let validation_scope: Vec<OperationTarget> = match kind {
            OperationKind::Delete => expanded
                .iter()
                .filter(|t| **t != OperationTarget::ControlPlane)
                .cloned()
                .collect(),
            _ => expanded.clone(),
        };
        StateValidator::new(&self.config, self.provider.query.as_ref())
            .validate(&validation_scope)
            .await?;

        let operations = plan(targets, &self.config, kind)?;
        info!(
            cluster = %self.config.cluster_name,
            %kind,
            stacks = operations.len(),
            "executing stack plan"
        );

        let orchestrator = StackOrchestrator::new(
            self.provider.stacks.clone(),
            self.renderer.clone(),
            self.options.clone(),
        );
        orchestrator.execute(&self.config, &operations).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Subnet, WorkerPool};
    use crate::error::CirrusError;
    use crate::provider::MemoryProvider;
    use crate::validate::ViolationCategory;
    use std::time::Duration;

    fn test_config() -> ClusterConfig {
        ClusterConfig {
            cluster_name: "test".to_string(),
            region: "us-west-1".to_string(),
            external_dns_name: "test.staging.core-os.net".to_string(),
            key_name: "test-key-name".to_string(),
            subnets: vec![Subnet {
                availability_zone: "dummy-az-0".to_string(),
                instance_cidr: "10.0.1.0/24".to_string(),
                route_table_id: None,
            }],
            worker_pools: vec![WorkerPool { name: "pool-a".to_string(), ..Default::default() }],
            ..Default::default()
        }
    }

    fn cluster_with(provider: MemoryProvider) -> Cluster {
        let options = OrchestratorOptions {
            poll_interval: Duration::from_millis(1),
            skip_wait: false,
        };
        Cluster::new(test_config(), ProviderSet::from_single(Arc::new(provider)), options)
    }

    #[tokio::test]
    async fn test_update_validates_before_executing() {
        // Missing key pair: no stack request may ever be issued.
        let provider = Arc::new(MemoryProvider::new());
        let options = OrchestratorOptions {
            poll_interval: Duration::from_millis(1),
            skip_wait: false,
        };
        let cluster =
            Cluster::new(test_config(), ProviderSet::from_single(provider.clone()), options);

        let err = cluster.update(&[OperationTarget::All]).await.unwrap_err();
        match err {
            CirrusError::Validation(v) => {
                assert_eq!(v.category, ViolationCategory::KeyPairMissing)
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(provider.submits().is_empty());
    }

    #[tokio::test]
    async fn test_update_converged_cluster_is_noop() {
        let provider = MemoryProvider::new()
            .with_key_pair("test-key-name")
            .with_no_change("test-etcd")
            .with_no_change("test-control-plane")
            .with_no_change("test-pool-a");
        let cluster = cluster_with(provider);

        let report = cluster.update(&[]).await.unwrap();
        assert_eq!(report.outcomes.len(), 3);
        assert!(report.outcomes.iter().all(|o| o.no_change));
    }

    #[tokio::test]
    async fn test_destroy_skips_control_plane_scoped_checks() {
        // The record for the cluster's own DNS name exists; destroying must
        // not trip the record-conflict check.
        let provider = MemoryProvider::new()
            .with_key_pair("test-key-name")
            .with_hosted_zone("z1", "staging.core-os.net.")
            .with_record_set("z1", "test.staging.core-os.net.");
        let mut config = test_config();
        config.dns.create_record_set = true;
        config.dns.hosted_zone_id = "z1".to_string();

        let options = OrchestratorOptions {
            poll_interval: Duration::from_millis(1),
            skip_wait: false,
        };
        let cluster =
            Cluster::new(config, ProviderSet::from_single(Arc::new(provider)), options);

        cluster.destroy(&[]).await.unwrap();
        assert!(cluster.update(&[]).await.is_err());
    }

    #[tokio::test]
    async fn test_info() {
        let cluster = cluster_with(MemoryProvider::new());
        let info = cluster.info();
        assert_eq!(info.cluster_name, "test");
        assert!(info.to_string().contains("https://test.staging.core-os.net"));
    }
}
