//! Aggregated locality: pack machines next to everything the application already runs.

use std::cmp::Reverse;

use log::debug;
use rand::prelude::*;

use crate::config::{parse_option, PolicyOptions};
use crate::deployment::VmDeploymentSpec;
use crate::error::{ConfigError, DeployerError};
use crate::factory::PolicyFactory;
use crate::placement_context::PlacementContext;
use crate::policies::{DEFAULT_MAX_VMS_PER_HOST, MAX_VMS_PER_HOST_OPTION};
use crate::policy::{retrieve_topology, DeployerPolicy, PlacementPolicy, PlanningServices};
use crate::request::DeploymentRequest;
use crate::selection::suitable_store_from_least_used_or_full;
use crate::topology::{Identifiable, PhysicalTopology};

/// Like [`LocalityPolicy`](super::locality::LocalityPolicy), but counts machines of all templates of the
/// application and visits the busiest racks and hosts first.
///
/// The per-host cap applies to the total number of machines of the application on a host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatedLocalityPolicy {
    max_vms_per_host: u32,
}

impl AggregatedLocalityPolicy {
    pub const NAME: &'static str = "agglocality";

    pub fn new(max_vms_per_host: u32) -> Self {
        Self { max_vms_per_host }
    }

    pub fn max_vms_per_host(&self) -> u32 {
        self.max_vms_per_host
    }
}

impl Default for AggregatedLocalityPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_VMS_PER_HOST)
    }
}

impl PlacementPolicy for AggregatedLocalityPolicy {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn generate_deployment(
        &self,
        request: &DeploymentRequest<'_>,
        services: &PlanningServices<'_>,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<VmDeploymentSpec>, DeployerError> {
        let mut result = Vec::new();
        if request.is_empty() {
            return Ok(result);
        }

        let mut topologies = Vec::new();
        let mut merged = PhysicalTopology::new();
        for (template, count) in request.template_requests() {
            let topology = retrieve_topology(template.id(), services.topology)?;
            merged = PhysicalTopology::merge(&topology, &merged);
            topologies.push((template, count, topology));
        }

        let mut ctx = PlacementContext::new(&merged);
        ctx.seed_from_application(request.application(), None, &merged, services.status)?;

        for (template, count, topology) in &topologies {
            let mut remaining = *count;
            let mut racks = topology.racks_with_hosts();
            racks.shuffle(rng);
            racks.sort_by_key(|r| Reverse(ctx.rack_usage(r.id())));
            'racks: for rack in racks {
                let mut hosts = topology.hosts_of(rack);
                hosts.shuffle(rng);
                hosts.sort_by_key(|h| Reverse(ctx.host_usage(h.id())));
                for host in hosts {
                    if remaining == 0 {
                        break 'racks;
                    }
                    while remaining > 0 && ctx.host_usage(host.id()) < self.max_vms_per_host {
                        let stores = topology.stores_for_host(host);
                        let store = suitable_store_from_least_used_or_full(&stores, &ctx)?;
                        debug!(
                            "Placing machine of template {} on host {} with store {}",
                            template.id(),
                            host.id(),
                            store.id()
                        );
                        ctx.record_placement(&merged, host.id(), Some(store));
                        result.push(VmDeploymentSpec::new(template.id(), host.id(), Some(store.id())));
                        remaining -= 1;
                    }
                }
            }
            if remaining > 0 {
                return Err(DeployerError::infeasible("Can not fit policy on the given hosts"));
            }
        }
        Ok(result)
    }
}

/// Creates [`AggregatedLocalityPolicy`] instances. Supports the `maxVmsPerHost` option.
pub struct AggregatedLocalityPolicyFactory;

impl PolicyFactory for AggregatedLocalityPolicyFactory {
    fn new_instance(&self) -> DeployerPolicy {
        AggregatedLocalityPolicy::default().into()
    }

    fn from_options(&self, options: &PolicyOptions) -> Result<DeployerPolicy, ConfigError> {
        let max_vms_per_host = parse_option::<u32>(AggregatedLocalityPolicy::NAME, options, MAX_VMS_PER_HOST_OPTION)?
            .unwrap_or(DEFAULT_MAX_VMS_PER_HOST);
        Ok(AggregatedLocalityPolicy::new(max_vms_per_host).into())
    }
}
