//! Pre-flight state validation.
//!
//! Checks the declared cluster configuration against live provider state
//! before any mutating call is issued. Mutating calls on cloud
//! infrastructure are slow, costly, and hard to roll back cleanly, so every
//! mismatch caught here is a mutation avoided. All checks are read-only:
//! they take the narrow [`ProviderQuery`] capability and never create
//! resources (the volume check is a provider dry run).

use crate::config::{ClusterConfig, NetworkPlacement};
use crate::error::Result;
use crate::netrange::{cidr_contains, cidr_overlaps, is_subdomain, with_trailing_dot};
use crate::provider::{HostedZone, ProviderQuery};
use crate::target::OperationTarget;
use std::fmt;
use thiserror::Error;
use tracing::{debug, instrument};

/// The concern a validation violation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationCategory {
    NetworkPlacement,
    SubnetOverlap,
    KeyPairMissing,
    DnsZoneMismatch,
    DnsRecordConflict,
    VolumeParameter,
}

impl fmt::Display for ViolationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NetworkPlacement => "network placement",
            Self::SubnetOverlap => "subnet overlap",
            Self::KeyPairMissing => "key pair missing",
            Self::DnsZoneMismatch => "DNS zone mismatch",
            Self::DnsRecordConflict => "DNS record conflict",
            Self::VolumeParameter => "volume parameter",
        };
        write!(f, "{}", name)
    }
}

/// A single configuration/environment mismatch.
#[derive(Debug, Clone, Error)]
#[error("{category}: {message}")]
pub struct Violation {
    pub category: ViolationCategory,
    pub message: String,
}

impl Violation {
    fn new(category: ViolationCategory, message: impl Into<String>) -> Self {
        Self { category, message: message.into() }
    }
}

/// Pre-flight validator over one configuration and one provider.
pub struct StateValidator<'a> {
    config: &'a ClusterConfig,
    provider: &'a dyn ProviderQuery,
}

impl<'a> StateValidator<'a> {
    pub fn new(config: &'a ClusterConfig, provider: &'a dyn ProviderQuery) -> Self {
        Self { config, provider }
    }

    /// Run every check applicable to the expanded target set and return the
    /// first violation encountered.
    ///
    /// Network and key-pair checks guard every stack; the DNS and
    /// controller-volume checks only matter when the control plane itself is
    /// being operated on.
    #[instrument(skip(self), fields(cluster = %self.config.cluster_name))]
    pub async fn validate(&self, targets: &[OperationTarget]) -> Result<()> {
        self.validate_existing_network_state().await?;
        self.validate_key_pair().await?;

        if targets.contains(&OperationTarget::ControlPlane) {
            self.validate_dns_config().await?;
            self.validate_controller_root_volume().await?;
        }

        debug!("pre-flight validation passed");
        Ok(())
    }

    /// Check subnet placement against the network the cluster deploys into.
    ///
    /// Configured subnets must never overlap each other. When an existing
    /// network is referenced, the network must exist, a declared address
    /// block must match the live one, and every instance CIDR must fit
    /// inside the network without colliding with subnets already there.
    /// When the configuration creates its own network there is nothing
    /// remote to validate against.
    pub async fn validate_existing_network_state(&self) -> Result<()> {
        let subnets = &self.config.subnets;
        for (i, a) in subnets.iter().enumerate() {
            for b in &subnets[i + 1..] {
                if cidr_overlaps(&a.instance_cidr, &b.instance_cidr)? {
                    return Err(Violation::new(
                        ViolationCategory::SubnetOverlap,
                        format!(
                            "configured subnets {} and {} overlap",
                            a.instance_cidr, b.instance_cidr
                        ),
                    )
                    .into());
                }
            }
        }

        let (network_id, declared_cidr) = match self.config.network_placement() {
            NetworkPlacement::Create => return Ok(()),
            NetworkPlacement::Existing { id, declared_cidr } => (id, declared_cidr),
        };

        let network = self.provider.describe_network(network_id).await?.ok_or_else(|| {
            Violation::new(
                ViolationCategory::NetworkPlacement,
                format!("network {} does not exist in region {}", network_id, self.config.region),
            )
        })?;

        if let Some(declared) = declared_cidr {
            if declared != network.address_block {
                return Err(Violation::new(
                    ViolationCategory::NetworkPlacement,
                    format!(
                        "declared address block {} does not match network {} ({})",
                        declared, network_id, network.address_block
                    ),
                )
                .into());
            }
        }

        for subnet in subnets {
            if !cidr_contains(&network.address_block, &subnet.instance_cidr)? {
                return Err(Violation::new(
                    ViolationCategory::NetworkPlacement,
                    format!(
                        "instance CIDR {} is not contained in network {} ({})",
                        subnet.instance_cidr, network_id, network.address_block
                    ),
                )
                .into());
            }
        }

        let existing = self.provider.describe_subnets(network_id).await?;
        for subnet in subnets {
            for live in &existing {
                if cidr_overlaps(&subnet.instance_cidr, &live.cidr)? {
                    return Err(Violation::new(
                        ViolationCategory::SubnetOverlap,
                        format!(
                            "instance CIDR {} overlaps existing subnet {} in network {}",
                            subnet.instance_cidr, live.cidr, network_id
                        ),
                    )
                    .into());
                }
            }
        }

        Ok(())
    }

    /// The configured key pair must already exist; absence is reported, not
    /// auto-created.
    pub async fn validate_key_pair(&self) -> Result<()> {
        if !self.provider.key_pair_exists(&self.config.key_name).await? {
            return Err(Violation::new(
                ViolationCategory::KeyPairMissing,
                format!(
                    "key pair {} does not exist in region {}",
                    self.config.key_name, self.config.region
                ),
            )
            .into());
        }
        Ok(())
    }

    /// Check the hosted zone a record set would be created in.
    ///
    /// Only runs when record-set creation is requested. An unresolved zone
    /// is a `DnsZoneMismatch`, deliberately strict. The external DNS name
    /// must be the zone name or a true subdomain of it, and no record of the
    /// same name may already exist (creating one would silently overwrite
    /// it).
    pub async fn validate_dns_config(&self) -> Result<()> {
        if !self.config.dns.create_record_set {
            return Ok(());
        }

        let external_name = &self.config.external_dns_name;
        let zone = self.resolve_hosted_zone().await?;

        if !is_subdomain(external_name, &zone.name) {
            return Err(Violation::new(
                ViolationCategory::DnsZoneMismatch,
                format!(
                    "external DNS name {} is not a subdomain of hosted zone {} ({})",
                    external_name, zone.id, zone.name
                ),
            )
            .into());
        }

        let records = self.provider.list_record_sets(&zone.id).await?;
        let wanted = with_trailing_dot(external_name);
        for record in records {
            if with_trailing_dot(&record.name) == wanted {
                return Err(Violation::new(
                    ViolationCategory::DnsRecordConflict,
                    format!(
                        "record {} already exists in hosted zone {}",
                        record.name, zone.id
                    ),
                )
                .into());
            }
        }

        Ok(())
    }

    /// Resolve the configured hosted zone: by id when one is given, by name
    /// otherwise. The id may be bare or the provider's `/hostedzone/<id>`
    /// resource path. Zone names are not unique on the provider, so a name
    /// lookup matching more than one zone fails rather than picking one.
    async fn resolve_hosted_zone(&self) -> Result<HostedZone> {
        let dns = &self.config.dns;

        if !dns.hosted_zone_id.is_empty() {
            let zone_id = normalize_zone_id(&dns.hosted_zone_id);
            let zone = self.provider.get_hosted_zone(zone_id).await?.ok_or_else(|| {
                Violation::new(
                    ViolationCategory::DnsZoneMismatch,
                    format!("hosted zone {} does not resolve", dns.hosted_zone_id),
                )
            })?;
            return Ok(zone);
        }

        if dns.hosted_zone.is_empty() {
            return Err(Violation::new(
                ViolationCategory::DnsZoneMismatch,
                "record-set creation requested but no hosted zone is configured",
            )
            .into());
        }

        let wanted = with_trailing_dot(&dns.hosted_zone);
        let mut zones = self.provider.find_hosted_zones_by_name(&wanted).await?;
        match zones.len() {
            0 => Err(Violation::new(
                ViolationCategory::DnsZoneMismatch,
                format!("hosted zone {} does not resolve", dns.hosted_zone),
            )
            .into()),
            1 => Ok(zones.remove(0)),
            _ => Err(Violation::new(
                ViolationCategory::DnsZoneMismatch,
                format!(
                    "hosted zone name {} matches multiple zones, set hostedZoneId instead",
                    dns.hosted_zone
                ),
            )
            .into()),
        }
    }

    /// Dry-run a volume creation with the controller's root-volume
    /// parameters. Validates legality (type/size/IOPS combinations) without
    /// provisioning anything.
    pub async fn validate_controller_root_volume(&self) -> Result<()> {
        let volume = &self.config.controller.root_volume;
        let outcome = self
            .provider
            .dry_run_create_volume(self.config.controller_availability_zone(), volume)
            .await?;

        if !outcome.accepted {
            return Err(Violation::new(
                ViolationCategory::VolumeParameter,
                outcome.reason.unwrap_or_else(|| {
                    format!(
                        "provider rejected root volume type={} size={} iops={}",
                        volume.volume_type, volume.size, volume.iops
                    )
                }),
            )
            .into());
        }
        Ok(())
    }
}

/// Strip the provider's zone-resource path prefix, accepting both spellings
/// of a hosted zone identifier as equivalent.
fn normalize_zone_id(id: &str) -> &str {
    id.strip_prefix("/hostedzone/").unwrap_or(id)
}
