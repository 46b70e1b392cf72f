//! Deterministic in-process provider.
//!
//! Serves two purposes: the fixture-driven backend the test suite runs
//! against, and the `memory` backend the CLI can exercise an entire
//! plan/validate/execute cycle on without touching a cloud account. All
//! state lives behind a mutex; queries are answered from fixtures seeded
//! through the `with_*` builders.

use super::{
    HostedZone, NetworkInfo, PollOutcome, ProviderQuery, RecordSet, StackEvent, StackService,
    SubnetInfo, Submitted, VolumeDryRun,
};
use crate::config::RootVolume;
use crate::error::{CirrusError, Result};
use crate::plan::OperationKind;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use tracing::debug;

/// A seeded network fixture.
#[derive(Debug, Clone)]
struct NetworkFixture {
    cidr: String,
    subnet_cidrs: Vec<String>,
}

/// Programmed behavior for one stack.
#[derive(Debug, Clone, Default)]
struct StackFixture {
    /// Submit responds with `no_change`.
    no_change: bool,
    /// Submit is rejected with this reason.
    reject: Option<String>,
    /// Poll outcomes consumed front-to-back; the last one repeats.
    polls: VecDeque<PollOutcome>,
    /// Event history returned after a terminal failure.
    events: Vec<StackEvent>,
}

/// A submit call the provider observed, for assertions and dry runs.
#[derive(Debug, Clone)]
pub struct SubmitRecord {
    pub stack_name: String,
    pub kind: OperationKind,
    pub parameters: BTreeMap<String, String>,
}

#[derive(Default)]
struct State {
    networks: HashMap<String, NetworkFixture>,
    key_pairs: HashSet<String>,
    hosted_zones: Vec<HostedZone>,
    record_sets: HashMap<String, Vec<String>>,
    stacks: HashMap<String, StackFixture>,
    submits: Vec<SubmitRecord>,
    volume_requests: Vec<(String, RootVolume)>,
}

/// In-process provider implementing both capability surfaces.
#[derive(Default)]
pub struct MemoryProvider {
    state: Mutex<State>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a network with its address block and existing subnet CIDRs.
    pub fn with_network(self, id: &str, cidr: &str, subnet_cidrs: &[&str]) -> Self {
        self.state.lock().unwrap().networks.insert(
            id.to_string(),
            NetworkFixture {
                cidr: cidr.to_string(),
                subnet_cidrs: subnet_cidrs.iter().map(|s| s.to_string()).collect(),
            },
        );
        self
    }

    /// Seed an existing key pair.
    pub fn with_key_pair(self, name: &str) -> Self {
        self.state.lock().unwrap().key_pairs.insert(name.to_string());
        self
    }

    /// Seed a hosted zone. `name` should be fully qualified (trailing dot).
    pub fn with_hosted_zone(self, id: &str, name: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .hosted_zones
            .push(HostedZone { id: id.to_string(), name: name.to_string() });
        self
    }

    /// Seed an existing record set in a zone.
    pub fn with_record_set(self, zone_id: &str, name: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .record_sets
            .entry(zone_id.to_string())
            .or_default()
            .push(name.to_string());
        self
    }

    /// Make submit report "no updates to perform" for a stack.
    pub fn with_no_change(self, stack_name: &str) -> Self {
        self.state.lock().unwrap().stacks.entry(stack_name.to_string()).or_default().no_change =
            true;
        self
    }

    /// Make submit fail for a stack.
    pub fn with_rejection(self, stack_name: &str, reason: &str) -> Self {
        self.state.lock().unwrap().stacks.entry(stack_name.to_string()).or_default().reject =
            Some(reason.to_string());
        self
    }

    /// Program the poll outcomes for a stack, consumed in order.
    pub fn with_polls(self, stack_name: &str, polls: Vec<PollOutcome>) -> Self {
        self.state.lock().unwrap().stacks.entry(stack_name.to_string()).or_default().polls =
            polls.into();
        self
    }

    /// Program the event history returned for a stack.
    pub fn with_events(self, stack_name: &str, events: Vec<StackEvent>) -> Self {
        self.state.lock().unwrap().stacks.entry(stack_name.to_string()).or_default().events =
            events;
        self
    }

    /// Submit calls observed so far, in order.
    pub fn submits(&self) -> Vec<SubmitRecord> {
        self.state.lock().unwrap().submits.clone()
    }

    /// Dry-run volume requests observed so far, in order.
    pub fn volume_requests(&self) -> Vec<(String, RootVolume)> {
        self.state.lock().unwrap().volume_requests.clone()
    }
}

#[async_trait]
impl ProviderQuery for MemoryProvider {
    async fn describe_network(&self, id: &str) -> Result<Option<NetworkInfo>> {
        let state = self.state.lock().unwrap();
        Ok(state.networks.get(id).map(|n| NetworkInfo { address_block: n.cidr.clone() }))
    }

    async fn describe_subnets(&self, network_id: &str) -> Result<Vec<SubnetInfo>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .networks
            .get(network_id)
            .map(|n| n.subnet_cidrs.iter().map(|c| SubnetInfo { cidr: c.clone() }).collect())
            .unwrap_or_default())
    }

    async fn key_pair_exists(&self, name: &str) -> Result<bool> {
        Ok(self.state.lock().unwrap().key_pairs.contains(name))
    }

    async fn find_hosted_zones_by_name(&self, name: &str) -> Result<Vec<HostedZone>> {
        let state = self.state.lock().unwrap();
        Ok(state.hosted_zones.iter().filter(|z| z.name == name).cloned().collect())
    }

    async fn get_hosted_zone(&self, id: &str) -> Result<Option<HostedZone>> {
        let state = self.state.lock().unwrap();
        Ok(state.hosted_zones.iter().find(|z| z.id == id).cloned())
    }

    async fn list_record_sets(&self, zone_id: &str) -> Result<Vec<RecordSet>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .record_sets
            .get(zone_id)
            .map(|names| names.iter().map(|n| RecordSet { name: n.clone() }).collect())
            .unwrap_or_default())
    }

    async fn dry_run_create_volume(
        &self,
        availability_zone: &str,
        volume: &RootVolume,
    ) -> Result<VolumeDryRun> {
        self.state
            .lock()
            .unwrap()
            .volume_requests
            .push((availability_zone.to_string(), volume.clone()));

        // Conservative static rule: provisioned IOPS only make sense on the
        // provisioned-IOPS volume type.
        if volume.iops > 0 && volume.volume_type != "io1" {
            return Ok(VolumeDryRun {
                accepted: false,
                reason: Some(format!(
                    "iops may not be set on volume type '{}'",
                    volume.volume_type
                )),
            });
        }
        Ok(VolumeDryRun { accepted: true, reason: None })
    }
}

#[async_trait]
impl StackService for MemoryProvider {
    async fn submit(
        &self,
        stack_name: &str,
        _template_body: &str,
        parameters: &BTreeMap<String, String>,
        kind: OperationKind,
    ) -> Result<Submitted> {
        let mut state = self.state.lock().unwrap();
        state.submits.push(SubmitRecord {
            stack_name: stack_name.to_string(),
            kind,
            parameters: parameters.clone(),
        });

        let fixture = state.stacks.get(stack_name).cloned().unwrap_or_default();
        if let Some(reason) = fixture.reject {
            return Err(CirrusError::ProviderRejected { reason });
        }

        debug!(stack = %stack_name, ?kind, no_change = fixture.no_change, "submitted");
        Ok(Submitted { no_change: fixture.no_change })
    }

    async fn poll_status(&self, stack_name: &str) -> Result<PollOutcome> {
        let mut state = self.state.lock().unwrap();
        let fixture = state.stacks.entry(stack_name.to_string()).or_default();

        // Outcomes are consumed in order; the final one repeats so callers
        // polling past the programmed sequence keep seeing the terminal state.
        let outcome = if fixture.polls.len() > 1 {
            fixture.polls.pop_front()
        } else {
            fixture.polls.front().cloned()
        };

        // Unprogrammed stacks settle immediately.
        Ok(outcome
            .unwrap_or(PollOutcome::Done { status: "COMPLETE".to_string(), succeeded: true }))
    }

    async fn list_events(&self, stack_name: &str) -> Result<Vec<StackEvent>> {
        let state = self.state.lock().unwrap();
        Ok(state.stacks.get(stack_name).map(|f| f.events.clone()).unwrap_or_default())
    }
}
