//! Locality: pack machines of a template onto as few hosts as possible.

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
use crate::topology::{Identifiable, PhysicalTopology};

/// Fills hosts up to `max_vms_per_host` machines of the same template before moving to the next host, and
/// exhausts a rack before moving to the next rack. Data centers, racks and hosts are visited in random order.
/// Stores are not assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalityPolicy {
    max_vms_per_host: u32,
}

impl LocalityPolicy {
    pub const NAME: &'static str = "locality";

    pub fn new(max_vms_per_host: u32) -> Self {
        Self { max_vms_per_host }
    }

    pub fn max_vms_per_host(&self) -> u32 {
        self.max_vms_per_host
    }
}

impl Default for LocalityPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_VMS_PER_HOST)
    }
}

impl PlacementPolicy for LocalityPolicy {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn generate_deployment(
        &self,
        request: &DeploymentRequest<'_>,
        services: &PlanningServices<'_>,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<VmDeploymentSpec>, DeployerError> {
        let mut topologies = Vec::new();
        for (template, count) in request.template_requests() {
            topologies.push((template, count, retrieve_topology(template.id(), services.topology)?));
        }

        let mut result = Vec::new();
        for (template, count, topology) in &topologies {
            let mut ctx = PlacementContext::new(topology);
            ctx.seed_from_application(request.application(), Some(template.id()), topology, services.status)?;

            let mut remaining = *count;
            for host in shuffled_hosts(topology, rng) {
                while remaining > 0 && ctx.host_usage(&host) < self.max_vms_per_host {
                    debug!("Placing machine of template {} on host {}", template.id(), host);
                    ctx.record_host(topology, &host);
                    result.push(VmDeploymentSpec::new(template.id(), &host, None));
                    remaining -= 1;
                }
                if remaining == 0 {
                    break;
                }
            }
            if remaining > 0 {
                return Err(DeployerError::infeasible("Does not fit"));
            }
        }
        Ok(result)
    }
}

/// Returns host IDs grouped by rack and data center, each level shuffled.
fn shuffled_hosts(topology: &PhysicalTopology, rng: &mut dyn RngCore) -> Vec<String> {
    let mut result = Vec::with_capacity(topology.host_count());
    let mut dcs: Vec<_> = topology.data_centers().collect();
    dcs.shuffle(rng);
    for dc in dcs {
        let mut racks = topology.racks_of(dc);
        racks.shuffle(rng);
        for rack in racks {
            let mut hosts = rack.hosts().to_vec();
            hosts.shuffle(rng);
            result.extend(hosts);
        }
    }
    result
}

/// Creates [`LocalityPolicy`] instances. Supports the `maxVmsPerHost` option.
pub struct LocalityPolicyFactory;

impl PolicyFactory for LocalityPolicyFactory {
    fn new_instance(&self) -> DeployerPolicy {
        LocalityPolicy::default().into()
    }

    fn from_options(&self, options: &PolicyOptions) -> Result<DeployerPolicy, ConfigError> {
        let max_vms_per_host = parse_option::<u32>(LocalityPolicy::NAME, options, MAX_VMS_PER_HOST_OPTION)?
            .unwrap_or(DEFAULT_MAX_VMS_PER_HOST);
        Ok(LocalityPolicy::new(max_vms_per_host).into())
    }
}
