//! Provider capability interfaces.
//!
//! The engine never talks to a cloud SDK directly. The validator consumes
//! [`ProviderQuery`], a narrow read-only query surface, and the orchestrator
//! consumes [`StackService`], the stack-orchestration surface. Both are
//! object-safe so they can be exercised against deterministic in-process
//! implementations.

use crate::config::RootVolume;
use crate::error::Result;
use crate::plan::OperationKind;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub mod factory;
pub mod memory;

pub use factory::{for_name, ProviderSet};
pub use memory::MemoryProvider;

/// A network as observed on the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkInfo {
    /// The network's address block (CIDR).
    pub address_block: String,
}

/// A subnet as observed on the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubnetInfo {
    pub cidr: String,
}

/// A hosted DNS zone as observed on the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostedZone {
    pub id: String,
    /// Zone name, fully qualified (trailing dot).
    pub name: String,
}

/// A DNS record set as observed on the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSet {
    pub name: String,
}

/// Outcome of a dry-run volume creation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeDryRun {
    /// Whether the provider would accept the parameters.
    pub accepted: bool,
    /// The provider's rejection reason, when not accepted.
    pub reason: Option<String>,
}

/// A single event reported by the provider during a stack operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackEvent {
    pub resource_type: String,
    pub logical_id: Option<String>,
    pub status: String,
    pub status_reason: Option<String>,
}

/// Acknowledgement of a submitted stack request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submitted {
    /// The provider found nothing to change. Treated as success with an
    /// empty change report, never as an error.
    pub no_change: bool,
}

/// Result of polling a stack's status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The operation is still running.
    InProgress { status: String },
    /// The operation reached a terminal state.
    Done { status: String, succeeded: bool },
}

/// Read-only provider queries consumed by the pre-flight validator.
#[async_trait]
pub trait ProviderQuery: Send + Sync {
    /// Describe a network by identifier. An absent network yields `None`,
    /// not an error, so callers can distinguish "doesn't exist" from
    /// "query failed".
    async fn describe_network(&self, id: &str) -> Result<Option<NetworkInfo>>;

    /// List the subnets already present in a network.
    async fn describe_subnets(&self, network_id: &str) -> Result<Vec<SubnetInfo>>;

    /// Whether a security key pair exists in the target region.
    async fn key_pair_exists(&self, name: &str) -> Result<bool>;

    /// Hosted zones whose name matches `name` exactly.
    async fn find_hosted_zones_by_name(&self, name: &str) -> Result<Vec<HostedZone>>;

    /// Resolve a hosted zone by identifier. `None` if it does not exist.
    async fn get_hosted_zone(&self, id: &str) -> Result<Option<HostedZone>>;

    /// List record sets in a hosted zone.
    async fn list_record_sets(&self, zone_id: &str) -> Result<Vec<RecordSet>>;

    /// Validate volume parameters without creating anything.
    async fn dry_run_create_volume(
        &self,
        availability_zone: &str,
        volume: &RootVolume,
    ) -> Result<VolumeDryRun>;
}

/// Stack-execution capability consumed by the orchestrator.
#[async_trait]
pub trait StackService: Send + Sync {
    /// Submit a create/update/delete request for a stack.
    ///
    /// Fails with `ProviderRejected` when the provider refuses the input.
    async fn submit(
        &self,
        stack_name: &str,
        template_body: &str,
        parameters: &BTreeMap<String, String>,
        kind: OperationKind,
    ) -> Result<Submitted>;

    /// Poll the stack's current status.
    async fn poll_status(&self, stack_name: &str) -> Result<PollOutcome>;

    /// Fetch the stack's event history in chronological order.
    async fn list_events(&self, stack_name: &str) -> Result<Vec<StackEvent>>;
}
