//! Per-run usage counters.

use std::collections::HashMap;

use log::trace;

use crate::application::Application;
use crate::collaborators::VmStatusSource;
use crate::error::DeployerError;
use crate::topology::{Identifiable, PhysicalStore, PhysicalTopology};

/// Counts of machines per rack, host and store within the topology a policy run works on.
///
/// Every node in scope has an entry, so a missing entry means the node is outside of the scope.
#[derive(Debug, Clone, Default)]
pub struct PlacementContext {
    vms_per_rack: HashMap<String, u32>,
    vms_per_host: HashMap<String, u32>,
    vms_per_store: HashMap<String, u32>,
}

impl PlacementContext {
    /// Creates context with zero counters for every rack, host and store of the topology.
    pub fn new(topology: &PhysicalTopology) -> Self {
        Self {
            vms_per_rack: topology.racks().map(|r| (r.id().to_string(), 0)).collect(),
            vms_per_host: topology.hosts().map(|h| (h.id().to_string(), 0)).collect(),
            vms_per_store: topology.stores().map(|s| (s.id().to_string(), 0)).collect(),
        }
    }

    /// Counts machines already placed by the application.
    ///
    /// With `template` set only machines launched from that template are counted. Rack counters are then recomputed
    /// as sums of their host counters.
    pub fn seed_from_application(
        &mut self,
        application: &Application,
        template: Option<&str>,
        topology: &PhysicalTopology,
        status: &dyn VmStatusSource,
    ) -> Result<(), DeployerError> {
        let machines = application.placed_machines(status).map_err(|e| {
            DeployerError::collaborator(
                format!("can't refresh machines of application '{}'", application.id()),
                e,
            )
        })?;
        for placed in machines {
            if let Some(template) = template {
                if placed.spec.template() != template {
                    continue;
                }
            }
            if let Some(count) = self.vms_per_host.get_mut(&placed.machine.host) {
                *count += 1;
            }
            for store in &placed.machine.stores {
                if let Some(count) = self.vms_per_store.get_mut(store) {
                    *count += 1;
                }
            }
        }
        for rack in topology.racks() {
            let sum = rack
                .hosts()
                .iter()
                .map(|host| self.vms_per_host.get(host).copied().unwrap_or(0))
                .sum();
            self.vms_per_rack.insert(rack.id().to_string(), sum);
        }
        trace!(
            "Seeded counters of application {}: {} machines in scope",
            application.id(),
            self.total_machines()
        );
        Ok(())
    }

    /// Records one machine on the host and on the rack of the host.
    pub fn record_host(&mut self, topology: &PhysicalTopology, host: &str) {
        *self.vms_per_host.entry(host.to_string()).or_insert(0) += 1;
        if let Some(rack) = topology.host(host).map(|h| h.rack()) {
            *self.vms_per_rack.entry(rack.to_string()).or_insert(0) += 1;
        }
    }

    /// Records one machine placed on the host with an optional store.
    pub fn record_placement(&mut self, topology: &PhysicalTopology, host: &str, store: Option<&PhysicalStore>) {
        self.record_host(topology, host);
        if let Some(store) = store {
            *self.vms_per_store.entry(store.id().to_string()).or_insert(0) += 1;
        }
    }

    pub fn rack_usage(&self, rack: &str) -> u32 {
        self.vms_per_rack.get(rack).copied().unwrap_or(0)
    }

    pub fn host_usage(&self, host: &str) -> u32 {
        self.vms_per_host.get(host).copied().unwrap_or(0)
    }

    pub fn store_usage(&self, store: &str) -> u32 {
        self.vms_per_store.get(store).copied().unwrap_or(0)
    }

    pub fn host_counters(&self) -> &HashMap<String, u32> {
        &self.vms_per_host
    }

    /// Returns the number of machines counted on hosts in scope.
    pub fn total_machines(&self) -> u32 {
        self.vms_per_host.values().sum()
    }
}
