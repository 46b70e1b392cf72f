//! Cluster configuration model.
//!
//! The declarative description of the desired cluster, loaded once per
//! command invocation and immutable afterwards. Field names mirror the YAML
//! configuration format (`clusterName`, `externalDNSName`, ...).

use crate::error::{CirrusError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, instrument};

/// Desired-state description of a cluster.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClusterConfig {
    /// Cluster name, used as the prefix of every stack name.
    pub cluster_name: String,

    /// Provider region the cluster lives in.
    pub region: String,

    /// DNS name the cluster's API endpoint is reachable at.
    #[serde(rename = "externalDNSName")]
    pub external_dns_name: String,

    /// Name of the security key pair nodes are provisioned with.
    pub key_name: String,

    /// Identifier of an existing network to deploy into. When unset, a new
    /// network is created as part of the coordination-service stack.
    pub vpc_id: Option<String>,

    /// Declared address block of the network. For an existing network this
    /// must match the live block exactly.
    #[serde(rename = "vpcCIDR")]
    pub vpc_cidr: Option<String>,

    /// Subnet descriptors, in declaration order.
    pub subnets: Vec<Subnet>,

    /// DNS record-set configuration.
    pub dns: DnsConfig,

    /// Controller (control-plane node) settings.
    pub controller: ControllerConfig,

    /// Worker pool definitions, in declaration order.
    pub worker_pools: Vec<WorkerPool>,

    /// Tags propagated onto every stack.
    pub stack_tags: BTreeMap<String, String>,
}

/// A subnet the cluster places instances into.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Subnet {
    pub availability_zone: String,

    #[serde(rename = "instanceCIDR")]
    pub instance_cidr: String,

    /// Pre-existing route table to associate, if any.
    pub route_table_id: Option<String>,
}

/// DNS record-set configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DnsConfig {
    /// Whether to create a record for the external DNS name.
    pub create_record_set: bool,

    /// TTL of the created record, in seconds.
    #[serde(rename = "recordSetTTL")]
    pub record_set_ttl: u64,

    /// Hosted zone the record is created in. Accepts a bare id or the
    /// provider's `/hostedzone/<id>` resource path.
    pub hosted_zone_id: String,

    /// Hosted zone name, used to look the zone up when no id is given.
    /// Zone names are not unique; an ambiguous lookup fails validation.
    pub hosted_zone: String,
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self {
            create_record_set: false,
            record_set_ttl: 300,
            hosted_zone_id: String::new(),
            hosted_zone: String::new(),
        }
    }
}

/// Controller node settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ControllerConfig {
    pub root_volume: RootVolume,
}

/// Root volume specification for a node role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RootVolume {
    #[serde(rename = "type")]
    pub volume_type: String,

    /// Volume size in GiB.
    pub size: u64,

    /// Provisioned IOPS. Only meaningful for the provisioned-IOPS volume
    /// type; must stay 0 otherwise.
    pub iops: u64,
}

impl Default for RootVolume {
    fn default() -> Self {
        Self { volume_type: "gp2".to_string(), size: 30, iops: 0 }
    }
}

/// A named, independently scalable group of worker nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkerPool {
    pub name: String,
    pub count: u32,
    pub root_volume: RootVolume,
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self { name: String::new(), count: 1, root_volume: RootVolume::default() }
    }
}

/// Where the cluster's network comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkPlacement<'a> {
    /// A new network is created as part of the cluster's own stacks.
    Create,
    /// The cluster deploys into a pre-existing network.
    Existing { id: &'a str, declared_cidr: Option<&'a str> },
}

impl ClusterConfig {
    /// Parse a cluster configuration from YAML.
    #[instrument(skip(content))]
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: ClusterConfig = serde_yaml::from_str(content)
            .map_err(|e| CirrusError::InvalidConfig { reason: e.to_string() })?;
        config.validate_required()?;
        Ok(config)
    }

    /// Load a cluster configuration from a file path.
    #[instrument]
    pub fn from_file<P: AsRef<Path> + std::fmt::Debug>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Reading cluster configuration from {:?}", path);

        let content = std::fs::read_to_string(path).map_err(|e| CirrusError::FileReadError {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;

        Self::from_yaml(&content)
    }

    /// Check fields that have no sensible default.
    fn validate_required(&self) -> Result<()> {
        let missing = [
            ("clusterName", self.cluster_name.is_empty()),
            ("region", self.region.is_empty()),
            ("externalDNSName", self.external_dns_name.is_empty()),
            ("keyName", self.key_name.is_empty()),
        ];
        for (field, empty) in missing {
            if empty {
                return Err(CirrusError::InvalidConfig {
                    reason: format!("{} must be set", field),
                });
            }
        }
        if self.subnets.is_empty() {
            return Err(CirrusError::InvalidConfig {
                reason: "at least one subnet must be defined".to_string(),
            });
        }
        for pool in &self.worker_pools {
            if pool.name.is_empty() {
                return Err(CirrusError::InvalidConfig {
                    reason: "worker pool name must be set".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Resolve the network placement mode.
    pub fn network_placement(&self) -> NetworkPlacement<'_> {
        match &self.vpc_id {
            Some(id) => {
                NetworkPlacement::Existing { id, declared_cidr: self.vpc_cidr.as_deref() }
            }
            None => NetworkPlacement::Create,
        }
    }

    /// Availability zone the controller's dry-run volume is placed in.
    ///
    /// Invariant upheld by `validate_required`: at least one subnet exists.
    pub fn controller_availability_zone(&self) -> &str {
        &self.subnets[0].availability_zone
    }

    /// Names of all defined worker pools, in declaration order.
    pub fn pool_names(&self) -> Vec<&str> {
        self.worker_pools.iter().map(|p| p.name.as_str()).collect()
    }
}
