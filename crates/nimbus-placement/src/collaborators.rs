//! Contracts of the external collaborators consumed by placement policies, with in-memory implementations.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::deployment::{MachineStatus, VirtualMachine};
use crate::error::CollaboratorError;
use crate::topology::PhysicalTopology;

/// Source of the physical topology reachable by machines of a template.
pub trait TopologyProvider: Send + Sync {
    /// Returns the subtree of the inventory machines of the template may use.
    fn topology_for_template(&self, template_id: &str) -> Result<PhysicalTopology, CollaboratorError>;
}

/// Ground truth about machines known to the virtualization layer.
pub trait VmStatusSource: Send + Sync {
    /// Returns IDs of all known machines.
    fn list_machine_ids(&self) -> Result<Vec<String>, CollaboratorError>;

    /// Returns full information about the machine.
    fn fetch_machine(&self, id: &str) -> Result<VirtualMachine, CollaboratorError>;

    /// Returns the machine status only. Cheaper than [`VmStatusSource::fetch_machine`].
    fn fetch_machine_status(&self, id: &str) -> Result<MachineStatus, CollaboratorError>;
}

/// Topology provider backed by a fixed per-template table.
#[derive(Debug, Clone, Default)]
pub struct StaticTopologyProvider {
    topologies: HashMap<String, PhysicalTopology>,
    fallback: Option<PhysicalTopology>,
}

impl StaticTopologyProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the topology of the template.
    pub fn with_template(mut self, template_id: &str, topology: PhysicalTopology) -> Self {
        self.topologies.insert(template_id.to_string(), topology);
        self
    }

    /// Sets the topology returned for templates without an explicit entry.
    pub fn with_fallback(mut self, topology: PhysicalTopology) -> Self {
        self.fallback = Some(topology);
        self
    }
}

impl TopologyProvider for StaticTopologyProvider {
    fn topology_for_template(&self, template_id: &str) -> Result<PhysicalTopology, CollaboratorError> {
        self.topologies
            .get(template_id)
            .or(self.fallback.as_ref())
            .cloned()
            .ok_or_else(|| CollaboratorError::NotFound {
                kind: "template",
                id: template_id.to_string(),
            })
    }
}

/// VM status source backed by a fixed set of machines.
#[derive(Debug, Clone, Default)]
pub struct InMemoryVmStatus {
    machines: IndexMap<String, VirtualMachine>,
}

impl InMemoryVmStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_machine(mut self, machine: VirtualMachine) -> Self {
        self.machines.insert(machine.id.clone(), machine);
        self
    }

    fn get(&self, id: &str) -> Result<&VirtualMachine, CollaboratorError> {
        self.machines.get(id).ok_or_else(|| CollaboratorError::NotFound {
            kind: "machine",
            id: id.to_string(),
        })
    }
}

impl VmStatusSource for InMemoryVmStatus {
    fn list_machine_ids(&self) -> Result<Vec<String>, CollaboratorError> {
        Ok(self.machines.keys().cloned().collect())
    }

    fn fetch_machine(&self, id: &str) -> Result<VirtualMachine, CollaboratorError> {
        self.get(id).cloned()
    }

    fn fetch_machine_status(&self, id: &str) -> Result<MachineStatus, CollaboratorError> {
        self.get(id).map(|machine| machine.status)
    }
}
