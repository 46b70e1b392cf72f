//! Stack plan resolution.
//!
//! Expands a requested target set into the concrete, dependency-ordered list
//! of stack operations to perform. The dependency graph is declared per
//! target ([`OperationTarget::dependencies`]) and the execution order is
//! computed by topological sort, so the ordering is testable in isolation
//! and survives deeper dependency chains.

use crate::config::ClusterConfig;
use crate::error::{CirrusError, Result};
use crate::target::{expand, OperationTarget};
use std::collections::{HashMap, VecDeque};
use std::fmt;

/// The kind of mutation applied to each planned stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Create,
    Update,
    Delete,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// One planned operation on one stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackOperation {
    pub target: OperationTarget,
    pub kind: OperationKind,
    /// Targets within this plan that must settle before this operation may
    /// start. Already reflects the reversed ordering for deletes.
    pub depends_on: Vec<OperationTarget>,
}

/// Resolve a requested target set into an ordered operation list.
///
/// The order is a total order consistent with the dependency partial order:
/// coordination service before control plane before any worker pool, with
/// node pools tie-broken by configuration-declaration order. `Delete` plans
/// are reversed, since a stack may be removed only after every stack that
/// depends on it is gone.
pub fn plan(
    requested: &[OperationTarget],
    config: &ClusterConfig,
    kind: OperationKind,
) -> Result<Vec<StackOperation>> {
    let targets = expand(requested, config)?;

    // Execution-order prerequisites per target, restricted to the planned
    // set. For deletes the edges flip: dependents come down first.
    let prerequisites: HashMap<OperationTarget, Vec<OperationTarget>> = targets
        .iter()
        .map(|t| {
            let deps = match kind {
                OperationKind::Create | OperationKind::Update => t
                    .dependencies()
                    .into_iter()
                    .filter(|d| targets.contains(d))
                    .collect::<Vec<_>>(),
                OperationKind::Delete => targets
                    .iter()
                    .filter(|other| other.dependencies().contains(t))
                    .cloned()
                    .collect(),
            };
            (t.clone(), deps)
        })
        .collect();

    let ordered = topological_sort(&targets, &prerequisites)?;

    Ok(ordered
        .into_iter()
        .map(|target| {
            let depends_on = prerequisites[&target].clone();
            StackOperation { target, kind, depends_on }
        })
        .collect())
}

/// Kahn's algorithm over the declared prerequisites.
///
/// `targets` supplies the tie-breaking order, so the result is deterministic
/// for identical inputs.
fn topological_sort(
    targets: &[OperationTarget],
    prerequisites: &HashMap<OperationTarget, Vec<OperationTarget>>,
) -> Result<Vec<OperationTarget>> {
    let mut in_degree: HashMap<&OperationTarget, usize> =
        targets.iter().map(|t| (t, prerequisites[t].len())).collect();

    let mut queue: VecDeque<&OperationTarget> =
        targets.iter().filter(|t| in_degree[t] == 0).collect();

    let mut result = Vec::with_capacity(targets.len());
    while let Some(node) = queue.pop_front() {
        result.push(node.clone());

        for candidate in targets {
            if !prerequisites[candidate].contains(node) {
                continue;
            }
            if let Some(count) = in_degree.get_mut(candidate) {
                *count -= 1;
                if *count == 0 {
                    queue.push_back(candidate);
                }
            }
        }
    }

    // The fixed dependency rule cannot cycle; this guards future graphs.
    if result.len() != targets.len() {
        return Err(CirrusError::Internal(
            "circular dependency in stack operation plan".to_string(),
        ));
    }

    Ok(result)
}

/// Group an ordered plan into batches whose members may run concurrently.
///
/// An operation joins the earliest batch in which all of its prerequisites
/// have already settled. With the fixed dependency rule this yields
/// singleton batches for the coordination-service and control-plane stacks
/// and one batch holding every node pool.
pub fn batches(operations: &[StackOperation]) -> Vec<Vec<StackOperation>> {
    let mut result: Vec<Vec<StackOperation>> = Vec::new();
    let mut settled: Vec<OperationTarget> = Vec::new();
    let mut current: Vec<StackOperation> = Vec::new();

    for operation in operations {
        let ready = operation.depends_on.iter().all(|d| settled.contains(d));
        if !ready || current.iter().any(|op| operation.depends_on.contains(&op.target)) {
            settled.extend(current.iter().map(|op| op.target.clone()));
            if !current.is_empty() {
                result.push(std::mem::take(&mut current));
            }
        }
        current.push(operation.clone());
    }
    if !current.is_empty() {
        result.push(current);
    }
    result
}
