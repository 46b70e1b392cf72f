//! Operation target model.
//!
//! The vocabulary of addressable sub-stacks and the fixed dependency ordering
//! among them. Targets arrive from the CLI as strings and are resolved into
//! the concrete set of stacks the configuration defines before planning.

use crate::config::ClusterConfig;
use crate::error::{CirrusError, Result};
use std::fmt;

/// An addressable sub-stack of the cluster.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OperationTarget {
    /// Every stack the configuration defines.
    All,
    /// The coordination-service (etcd) stack.
    Etcd,
    /// The control-plane stack.
    ControlPlane,
    /// A named worker-pool stack.
    NodePool(String),
}

impl OperationTarget {
    /// Parse a target from its CLI spelling. Anything that is not a known
    /// keyword names a node pool; existence is checked during expansion.
    pub fn parse(s: &str) -> Self {
        match s {
            "all" => Self::All,
            "etcd" => Self::Etcd,
            "control-plane" => Self::ControlPlane,
            name => Self::NodePool(name.to_string()),
        }
    }

    /// Name of the provider stack backing this target.
    pub fn stack_name(&self, cluster_name: &str) -> String {
        format!("{}-{}", cluster_name, self)
    }

    /// Targets this one depends on. The rule is fixed, not configurable:
    /// `Etcd < ControlPlane < NodePool(*)`; node pools are mutually
    /// unordered.
    pub fn dependencies(&self) -> Vec<OperationTarget> {
        match self {
            Self::All | Self::Etcd => vec![],
            Self::ControlPlane => vec![Self::Etcd],
            Self::NodePool(_) => vec![Self::ControlPlane],
        }
    }
}

impl fmt::Display for OperationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Etcd => write!(f, "etcd"),
            Self::ControlPlane => write!(f, "control-plane"),
            Self::NodePool(name) => write!(f, "{}", name),
        }
    }
}

/// Every concrete target the configuration defines, in canonical order:
/// etcd, control-plane, then node pools in declaration order.
pub fn all_targets(config: &ClusterConfig) -> Vec<OperationTarget> {
    let mut targets = vec![OperationTarget::Etcd, OperationTarget::ControlPlane];
    targets.extend(
        config.worker_pools.iter().map(|p| OperationTarget::NodePool(p.name.clone())),
    );
    targets
}

/// Expand a requested target set into concrete targets.
///
/// An empty request or one containing `all` expands to every defined target.
/// Named node pools absent from the configuration fail with `UnknownTarget`.
/// The result is deduplicated and in canonical order.
pub fn expand(requested: &[OperationTarget], config: &ClusterConfig) -> Result<Vec<OperationTarget>> {
    if requested.is_empty() || requested.contains(&OperationTarget::All) {
        return Ok(all_targets(config));
    }

    let defined = all_targets(config);
    for target in requested {
        if !defined.contains(target) {
            return Err(CirrusError::UnknownTarget { target: target.to_string() });
        }
    }

    // Canonical order makes plans deterministic regardless of request order.
    Ok(defined.into_iter().filter(|t| requested.contains(t)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkerPool;

    fn test_config() -> ClusterConfig {
        ClusterConfig {
            cluster_name: "test".to_string(),
            worker_pools: vec![
                WorkerPool { name: "pool-a".to_string(), ..Default::default() },
                WorkerPool { name: "pool-b".to_string(), ..Default::default() },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_round_trip() {
        for s in ["all", "etcd", "control-plane", "pool-a"] {
            assert_eq!(OperationTarget::parse(s).to_string(), s);
        }
    }

    #[test]
    fn test_all_targets() {
        assert_eq!(
            all_targets(&test_config()),
            vec![
                OperationTarget::Etcd,
                OperationTarget::ControlPlane,
                OperationTarget::NodePool("pool-a".to_string()),
                OperationTarget::NodePool("pool-b".to_string()),
            ]
        );
    }

    #[test]
    fn test_expand_all_and_empty_are_equivalent() {
        let config = test_config();
        let from_all = expand(&[OperationTarget::All], &config).unwrap();
        let from_empty = expand(&[], &config).unwrap();
        assert_eq!(from_all, all_targets(&config));
        assert_eq!(from_empty, all_targets(&config));
    }

    #[test]
    fn test_expand_filters_and_orders() {
        let config = test_config();
        let expanded = expand(
            &[
                OperationTarget::NodePool("pool-b".to_string()),
                OperationTarget::Etcd,
            ],
            &config,
        )
        .unwrap();
        assert_eq!(
            expanded,
            vec![OperationTarget::Etcd, OperationTarget::NodePool("pool-b".to_string())]
        );
    }

    #[test]
    fn test_expand_unknown_pool() {
        let result = expand(&[OperationTarget::NodePool("nope".to_string())], &test_config());
        assert!(matches!(result, Err(CirrusError::UnknownTarget { .. })));
    }

    #[test]
    fn test_dependency_rule() {
        assert!(OperationTarget::Etcd.dependencies().is_empty());
        assert_eq!(OperationTarget::ControlPlane.dependencies(), vec![OperationTarget::Etcd]);
        assert_eq!(
            OperationTarget::NodePool("p".to_string()).dependencies(),
            vec![OperationTarget::ControlPlane]
        );
    }

    #[test]
    fn test_stack_name() {
        assert_eq!(OperationTarget::Etcd.stack_name("prod"), "prod-etcd");
        assert_eq!(
            OperationTarget::NodePool("gpu".to_string()).stack_name("prod"),
            "prod-gpu"
        );
    }
}
