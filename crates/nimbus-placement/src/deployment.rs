//! Placement specifications, virtual machines and deployments.

use std::collections::HashSet;

use indexmap::IndexMap;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::collaborators::VmStatusSource;
use crate::error::{CollaboratorError, DeployerError};

/// Prefix of generated deployment IDs.
pub const DEPLOYMENT_ID_PREFIX: &str = "deployment";

/// A committed placement decision for one machine: template, host and optional store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VmDeploymentSpec {
    template: String,
    host: String,
    store: Option<String>,
}

impl VmDeploymentSpec {
    pub fn new(template: &str, host: &str, store: Option<&str>) -> Self {
        Self {
            template: template.to_string(),
            host: host.to_string(),
            store: store.map(str::to_string),
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn store(&self) -> Option<&str> {
        self.store.as_deref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MachineStatus {
    /// The launch stage has submitted the machine but the virtualization layer has not reported it yet.
    Launching,
    On,
    Off,
}

/// Live machine as reported by the virtualization layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualMachine {
    pub id: String,
    pub host: String,
    pub stores: Vec<String>,
    pub status: MachineStatus,
}

impl VirtualMachine {
    pub fn new(id: &str, host: &str, status: MachineStatus) -> Self {
        Self {
            id: id.to_string(),
            host: host.to_string(),
            stores: Vec::new(),
            status,
        }
    }

    pub fn with_store(mut self, store: &str) -> Self {
        self.stores.push(store.to_string());
        self
    }
}

/// Launched machine paired with the specification it was launched from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedMachine {
    pub machine: VirtualMachine,
    pub spec: VmDeploymentSpec,
}

/// A placement plan and, once launched, the machines realizing it.
///
/// Before launch the list of specifications is authoritative. After [`Deployment::mark_launched`] the
/// machine → specification mapping is authoritative and the specifications can no longer be replaced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deployment {
    id: String,
    launched: bool,
    specs: Vec<VmDeploymentSpec>,
    machines: IndexMap<String, PlacedMachine>,
}

impl Deployment {
    /// Creates empty unlaunched deployment.
    pub fn new(id: &str) -> Self {
        Self::with_specs(id, Vec::new())
    }

    /// Creates unlaunched deployment holding the given specifications.
    pub fn with_specs(id: &str, specs: Vec<VmDeploymentSpec>) -> Self {
        Self {
            id: id.to_string(),
            launched: false,
            specs,
            machines: IndexMap::new(),
        }
    }

    /// Generates a fresh deployment ID.
    pub fn generate_id() -> String {
        format!("{}-{}", DEPLOYMENT_ID_PREFIX, Uuid::new_v4())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_launched(&self) -> bool {
        self.launched
    }

    /// Marks the deployment as launched. There is no way back.
    pub fn mark_launched(&mut self) {
        self.launched = true;
    }

    pub fn specs(&self) -> &[VmDeploymentSpec] {
        &self.specs
    }

    pub fn add_spec(&mut self, spec: VmDeploymentSpec) -> Result<(), DeployerError> {
        self.ensure_not_launched()?;
        self.specs.push(spec);
        Ok(())
    }

    /// Replaces the plan of a deployment which has not been launched yet.
    pub fn replace_specs(&mut self, specs: Vec<VmDeploymentSpec>) -> Result<(), DeployerError> {
        self.ensure_not_launched()?;
        self.specs = specs;
        Ok(())
    }

    fn ensure_not_launched(&self) -> Result<(), DeployerError> {
        if self.launched {
            return Err(DeployerError::Contract(format!(
                "deployment '{}' is already launched",
                self.id
            )));
        }
        Ok(())
    }

    /// Records a machine launched from the specification.
    pub fn add_machine(&mut self, machine: VirtualMachine, spec: VmDeploymentSpec) {
        self.machines.insert(machine.id.clone(), PlacedMachine { machine, spec });
    }

    pub fn remove_machine(&mut self, id: &str) -> Option<PlacedMachine> {
        self.machines.shift_remove(id)
    }

    pub fn machines(&self) -> impl Iterator<Item = &PlacedMachine> {
        self.machines.values()
    }

    pub fn spec_for_machine(&self, id: &str) -> Option<&VmDeploymentSpec> {
        self.machines.get(id).map(|placed| &placed.spec)
    }

    /// Returns the machine view refreshed against the virtualization layer, without modifying the deployment.
    ///
    /// Machines which are no longer known are dropped and all others adopt the host and stores currently reported
    /// for them. Machines still launching are kept as they are, also when the virtualization layer does not know
    /// them yet. Only transport failures are returned as errors.
    pub fn refreshed_machines(&self, status: &dyn VmStatusSource) -> Result<Vec<PlacedMachine>, CollaboratorError> {
        if self.machines.is_empty() {
            return Ok(Vec::new());
        }
        let known: HashSet<String> = status.list_machine_ids()?.into_iter().collect();
        let mut result = Vec::with_capacity(self.machines.len());
        for placed in self.machines.values() {
            let id = &placed.machine.id;
            if placed.machine.status == MachineStatus::Launching {
                match status.fetch_machine_status(id) {
                    Ok(MachineStatus::Launching) => {
                        debug!("Machine {} of deployment {} is not yet fully launched", id, self.id);
                        result.push(placed.clone());
                        continue;
                    }
                    Ok(_) => {}
                    Err(CollaboratorError::NotFound { .. }) => {
                        warn!(
                            "Status of launching machine {} of deployment {} is unknown, keeping it as is",
                            id, self.id
                        );
                        result.push(placed.clone());
                        continue;
                    }
                    Err(e) => return Err(e),
                }
            } else if !known.contains(id) {
                debug!("Machine {} of deployment {} no longer exists", id, self.id);
                continue;
            }
            result.push(PlacedMachine {
                machine: status.fetch_machine(id)?,
                spec: placed.spec.clone(),
            });
        }
        Ok(result)
    }

    /// Refreshes the machine view in place.
    pub fn refresh_machines(&mut self, status: &dyn VmStatusSource) -> Result<(), CollaboratorError> {
        let refreshed = self.refreshed_machines(status)?;
        self.machines = refreshed
            .into_iter()
            .map(|placed| (placed.machine.id.clone(), placed))
            .collect();
        Ok(())
    }
}
