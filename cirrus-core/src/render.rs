//! Stack template rendering collaborator.
//!
//! The orchestrator hands each planned target to a [`TemplateRenderer`] and
//! submits whatever comes back. Real provisioning templates (cloud-init,
//! userdata) are produced outside this engine; [`BuiltinRenderer`] emits the
//! minimal template body and parameter set the built-in backends accept.

use crate::config::ClusterConfig;
use crate::error::Result;
use crate::target::OperationTarget;
use async_trait::async_trait;
use serde_json::json;
use std::collections::BTreeMap;

/// A stack ready for submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedStack {
    pub stack_name: String,
    pub template_body: String,
    pub parameters: BTreeMap<String, String>,
}

/// Renders one target's template and parameters.
#[async_trait]
pub trait TemplateRenderer: Send + Sync {
    async fn render(&self, target: &OperationTarget, config: &ClusterConfig)
        -> Result<RenderedStack>;
}

/// Built-in renderer producing a minimal JSON template per stack.
#[derive(Debug, Default)]
pub struct BuiltinRenderer;

#[async_trait]
impl TemplateRenderer for BuiltinRenderer {
    async fn render(
        &self,
        target: &OperationTarget,
        config: &ClusterConfig,
    ) -> Result<RenderedStack> {
        let stack_name = target.stack_name(&config.cluster_name);

        let body = json!({
            "Description": format!("cirrus {} stack for cluster {}", target, config.cluster_name),
            "Subnets": config
                .subnets
                .iter()
                .map(|s| json!({
                    "AvailabilityZone": s.availability_zone,
                    "InstanceCIDR": s.instance_cidr,
                    "RouteTableId": s.route_table_id,
                }))
                .collect::<Vec<_>>(),
        });

        let mut parameters = BTreeMap::new();
        parameters.insert("ClusterName".to_string(), config.cluster_name.clone());
        parameters.insert("Region".to_string(), config.region.clone());
        parameters.insert("KeyName".to_string(), config.key_name.clone());
        if let OperationTarget::NodePool(name) = target {
            let pool = config.worker_pools.iter().find(|p| &p.name == name);
            if let Some(pool) = pool {
                parameters.insert("PoolCount".to_string(), pool.count.to_string());
            }
        }
        for (key, value) in &config.stack_tags {
            parameters.insert(format!("Tag:{}", key), value.clone());
        }

        Ok(RenderedStack {
            stack_name,
            template_body: serde_json::to_string_pretty(&body)
                .map_err(crate::error::CirrusError::internal)?,
            parameters,
        })
    }
}
