//! HDFS-like replication with a 2:1 split between the busiest rack and the others.

use log::debug;
use rand::RngCore;

use crate::application::VmTemplate;
use crate::config::PolicyOptions;
use crate::deployment::VmDeploymentSpec;
use crate::error::{ConfigError, DeployerError};
use crate::factory::PolicyFactory;
use crate::placement_context::PlacementContext;
use crate::policy::{retrieve_topology, DeployerPolicy, PlacementPolicy, PlanningServices};
use crate::request::DeploymentRequest;
use crate::selection::{least_stressed_from_least_used, pick_other, suitable_store_from_least_used};
use crate::topology::{Identifiable, PhysicalRack, PhysicalTopology};

/// Keeps about two thirds of the machines of a template in the rack which already holds the most of them (the
/// "fat" rack) and spreads the rest over random other racks.
///
/// Fails if the topology has a single rack, since then no machine can be put outside the fat rack.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hdfs2ReplicationPolicy;

impl Hdfs2ReplicationPolicy {
    pub const NAME: &'static str = "hdfs2";

    pub fn new() -> Self {
        Default::default()
    }
}

impl PlacementPolicy for Hdfs2ReplicationPolicy {
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
            let fat = fat_rack(&racks, &ctx).ok_or_else(|| DeployerError::infeasible("Does not fit"))?;
            let mut fat_vms = ctx.rack_usage(fat.id());
            let mut total_vms = ctx.total_machines();
            debug!(
                "Rack {} is the fat rack for template {} with {} of {} machines",
                fat.id(),
                template.id(),
                fat_vms,
                total_vms
            );

            for _ in 0..count {
                total_vms += 1;
                let rack = if 3 * (fat_vms + 1) <= 2 * total_vms {
                    fat_vms += 1;
                    fat
                } else {
                    let other = pick_other(&racks, fat, rng);
                    if other.id() == fat.id() {
                        return Err(DeployerError::infeasible(
                            "No other rack to place VMs. This policy is useless.",
                        ));
                    }
                    other
                };
                result.push(place_on_rack(&mut ctx, &topology, template, rack)?);
            }
        }
        Ok(result)
    }
}

/// Returns the first rack holding the most machines.
fn fat_rack<'t>(racks: &[&'t PhysicalRack], ctx: &PlacementContext) -> Option<&'t PhysicalRack> {
    let mut best: Option<(&PhysicalRack, u32)> = None;
    for rack in racks {
        let usage = ctx.rack_usage(rack.id());
        if best.map_or(true, |(_, max)| usage > max) {
            best = Some((*rack, usage));
        }
    }
    best.map(|(rack, _)| rack)
}

fn place_on_rack(
    ctx: &mut PlacementContext,
    topology: &PhysicalTopology,
    template: &VmTemplate,
    rack: &PhysicalRack,
) -> Result<VmDeploymentSpec, DeployerError> {
    let hosts = topology.hosts_of(rack);
    let host = least_stressed_from_least_used(&hosts, ctx, template)
        .ok_or_else(|| DeployerError::infeasible("Does not fit"))?;
    let stores = topology.stores_for_host(host);
    let store = suitable_store_from_least_used(&stores, ctx)?;
    debug!(
        "Placing machine of template {} on host {} (rack {}) with store {}",
        template.id(),
        host.id(),
        rack.id(),
        store.id()
    );
    ctx.record_placement(topology, host.id(), Some(store));
    Ok(VmDeploymentSpec::new(template.id(), host.id(), Some(store.id())))
}

/// Creates [`Hdfs2ReplicationPolicy`] instances. No options are supported.
pub struct Hdfs2ReplicationPolicyFactory;

impl PolicyFactory for Hdfs2ReplicationPolicyFactory {
    fn new_instance(&self) -> DeployerPolicy {
        Hdfs2ReplicationPolicy::new().into()
    }

    fn from_options(&self, _options: &PolicyOptions) -> Result<DeployerPolicy, ConfigError> {
        Ok(self.new_instance())
    }
}
