//! Basic replication: spread machines of a template over racks.

use log::debug;
use rand::RngCore;

use crate::config::PolicyOptions;
use crate::deployment::VmDeploymentSpec;
use crate::error::{ConfigError, DeployerError};
use crate::factory::PolicyFactory;
use crate::placement_context::PlacementContext;
use crate::policy::{retrieve_topology, DeployerPolicy, PlacementPolicy, PlanningServices};
use crate::request::DeploymentRequest;
use crate::selection::{least_stressed_from_least_used, pick_least_used, suitable_store_from_least_used_or_full};
use crate::topology::Identifiable;

/// Places every machine into the least used rack, on the least stressed of its least used hosts.
///
/// Only machines of the same template are taken into account, so replicas of one template end up in
/// different racks as long as there are enough of them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BasicReplicationPolicy;

impl BasicReplicationPolicy {
    pub const NAME: &'static str = "replicated";

    pub fn new() -> Self {
        Default::default()
    }
}

impl PlacementPolicy for BasicReplicationPolicy {
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
        for (template, count) in request.template_requests() {
            let topology = retrieve_topology(template.id(), services.topology)?;
            let mut ctx = PlacementContext::new(&topology);
            ctx.seed_from_application(request.application(), Some(template.id()), &topology, services.status)?;

            let racks = topology.racks_with_hosts();
            for _ in 0..count {
                let rack = pick_least_used(&racks, |r| ctx.rack_usage(r.id()), rng)
                    .ok_or_else(|| DeployerError::infeasible("Does not fit"))?;
                let hosts = topology.hosts_of(rack);
                let host = least_stressed_from_least_used(&hosts, &ctx, template)
                    .ok_or_else(|| DeployerError::infeasible("Does not fit"))?;
                let stores = topology.stores_for_host(host);
                let store = suitable_store_from_least_used_or_full(&stores, &ctx)?;
                debug!(
                    "Placing machine of template {} on host {} (rack {}) with store {}",
                    template.id(),
                    host.id(),
                    rack.id(),
                    store.id()
                );
                ctx.record_placement(&topology, host.id(), Some(store));
                result.push(VmDeploymentSpec::new(template.id(), host.id(), Some(store.id())));
            }
        }
        Ok(result)
    }
}

/// Creates [`BasicReplicationPolicy`] instances. No options are supported.
pub struct BasicReplicationPolicyFactory;

impl PolicyFactory for BasicReplicationPolicyFactory {
    fn new_instance(&self) -> DeployerPolicy {
        BasicReplicationPolicy::new().into()
    }

    fn from_options(&self, _options: &PolicyOptions) -> Result<DeployerPolicy, ConfigError> {
        Ok(self.new_instance())
    }
}
