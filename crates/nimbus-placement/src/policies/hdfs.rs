//! HDFS-like replication in groups of three.

use log::debug;
use rand::prelude::*;

use crate::application::VmTemplate;
use crate::config::PolicyOptions;
use crate::deployment::VmDeploymentSpec;
use crate::error::{ConfigError, DeployerError};
use crate::factory::PolicyFactory;
use crate::placement_context::PlacementContext;
use crate::policy::{retrieve_topology, DeployerPolicy, PlacementPolicy, PlanningServices};
use crate::request::DeploymentRequest;
use crate::selection::{least_stressed_from_least_used, pick_other, suitable_store_from_least_used_or_full};
use crate::topology::{Identifiable, PhysicalHost, PhysicalTopology};

/// Number of machines in a replication group.
pub const GROUP_SIZE: u32 = 3;

/// Places machines in groups of three: two on one host and the third one as far away as possible, preferably in
/// another data center, else in another rack, else on another host of the same rack.
///
/// A trailing incomplete group is put on a single host. The policy never fails for lack of distinct hosts: the
/// third machine ends up next to the other two if there is no other host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HdfsReplicationPolicy;

impl HdfsReplicationPolicy {
    pub const NAME: &'static str = "hdfs";

    pub fn new() -> Self {
        Default::default()
    }
}

impl PlacementPolicy for HdfsReplicationPolicy {
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
            let hosts: Vec<&PhysicalHost> = topology.hosts().collect();

            let mut remaining = count;
            while remaining >= GROUP_SIZE {
                let primary = least_stressed_host(&hosts, &ctx, template)?;
                let secondary = pick_different_host(primary, &topology, rng);
                place_on_host(&mut result, &mut ctx, &topology, template, primary, GROUP_SIZE - 1)?;

                let stores = topology.stores_for_host(secondary);
                let store = stores
                    .choose(rng)
                    .copied()
                    .ok_or_else(|| DeployerError::infeasible("Not enough disk space"))?;
                debug!(
                    "Placing replica of template {} on host {} with store {}",
                    template.id(),
                    secondary.id(),
                    store.id()
                );
                ctx.record_placement(&topology, secondary.id(), Some(store));
                result.push(VmDeploymentSpec::new(template.id(), secondary.id(), Some(store.id())));
                remaining -= GROUP_SIZE;
            }

            if remaining > 0 {
                let host = least_stressed_host(&hosts, &ctx, template)?;
                place_on_host(&mut result, &mut ctx, &topology, template, host, remaining)?;
            }
        }
        Ok(result)
    }
}

fn least_stressed_host<'t>(
    hosts: &[&'t PhysicalHost],
    ctx: &PlacementContext,
    template: &VmTemplate,
) -> Result<&'t PhysicalHost, DeployerError> {
    least_stressed_from_least_used(hosts, ctx, template).ok_or_else(|| DeployerError::infeasible("Does not fit"))
}

fn place_on_host(
    result: &mut Vec<VmDeploymentSpec>,
    ctx: &mut PlacementContext,
    topology: &PhysicalTopology,
    template: &VmTemplate,
    host: &PhysicalHost,
    count: u32,
) -> Result<(), DeployerError> {
    let stores = topology.stores_for_host(host);
    for _ in 0..count {
        let store = suitable_store_from_least_used_or_full(&stores, ctx)?;
        debug!(
            "Placing machine of template {} on host {} with store {}",
            template.id(),
            host.id(),
            store.id()
        );
        ctx.record_placement(topology, host.id(), Some(store));
        result.push(VmDeploymentSpec::new(template.id(), host.id(), Some(store.id())));
    }
    Ok(())
}

/// Picks a host in another data center if possible, else in another rack, else another host of the same rack.
/// Returns `host` itself when it is the only host.
fn pick_different_host<'t>(
    host: &'t PhysicalHost,
    topology: &'t PhysicalTopology,
    rng: &mut dyn RngCore,
) -> &'t PhysicalHost {
    let (rack, dc) = match topology.rack_of(host).and_then(|r| topology.data_center_of(r).map(|dc| (r, dc))) {
        Some(parents) => parents,
        None => return host,
    };
    let dcs: Vec<_> = topology
        .data_centers()
        .filter(|dc| topology.racks_of(dc).iter().any(|r| !r.hosts().is_empty()))
        .collect();
    let other_dc = pick_other(&dcs, dc, rng);
    let racks: Vec<_> = topology
        .racks_of(other_dc)
        .into_iter()
        .filter(|r| !r.hosts().is_empty())
        .collect();
    let other_rack = pick_other(&racks, rack, rng);
    let hosts = topology.hosts_of(other_rack);
    pick_other(&hosts, host, rng)
}

/// Creates [`HdfsReplicationPolicy`] instances. No options are supported.
pub struct HdfsReplicationPolicyFactory;

impl PolicyFactory for HdfsReplicationPolicyFactory {
    fn new_instance(&self) -> DeployerPolicy {
        HdfsReplicationPolicy::new().into()
    }

    fn from_options(&self, _options: &PolicyOptions) -> Result<DeployerPolicy, ConfigError> {
        Ok(self.new_instance())
    }
}
