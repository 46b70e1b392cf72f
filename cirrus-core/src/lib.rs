//! cirrus core library
//!
//! Validation and orchestration engine for provisioning a distributed
//! compute cluster as a set of interdependent infrastructure stacks: a
//! coordination-service (etcd) stack, a control-plane stack, and any number
//! of worker-pool stacks. The engine validates the declared configuration
//! against live provider state, resolves a requested target set into a
//! dependency-ordered operation plan, and drives each asynchronous stack
//! operation to completion.

pub mod cluster;
pub mod config;
pub mod error;
pub mod netrange;
pub mod orchestrate;
pub mod plan;
pub mod provider;
pub mod render;
pub mod target;
pub mod validate;

// Re-export commonly used items
pub use cluster::{Cluster, ClusterInfo};
pub use config::{ClusterConfig, NetworkPlacement, RootVolume, Subnet, WorkerPool};
pub use error::{CirrusError, Result};
pub use orchestrate::{ExecutionReport, OrchestratorOptions, StackOrchestrator};
pub use plan::{OperationKind, StackOperation};
pub use provider::{ProviderQuery, ProviderSet, StackService};
pub use target::OperationTarget;
pub use validate::{StateValidator, Violation, ViolationCategory};
