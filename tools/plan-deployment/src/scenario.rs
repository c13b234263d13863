//! Scenario file: inventory, application and request to plan.

use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;

use nimbus_placement::application::{Application, PolicyBinding, VmTemplate};
use nimbus_placement::collaborators::{InMemoryVmStatus, StaticTopologyProvider};
use nimbus_placement::deployment::{Deployment, MachineStatus, VirtualMachine, VmDeploymentSpec};
use nimbus_placement::error::{ConfigError, DeployerError};
use nimbus_placement::topology::{Identifiable, PhysicalTopology};

#[derive(Debug, Deserialize)]
pub struct StoreConfig {
    pub id: String,
    pub capacity: u64,
    #[serde(default)]
    pub used: u64,
}

#[derive(Debug, Deserialize)]
pub struct HostConfig {
    pub id: String,
    #[serde(default)]
    pub cpu_usage: f64,
    #[serde(default)]
    pub mem_usage: f64,
    #[serde(default)]
    pub stores: Vec<StoreConfig>,
}

#[derive(Debug, Deserialize)]
pub struct RackConfig {
    pub id: String,
    #[serde(default)]
    pub hosts: Vec<HostConfig>,
    #[serde(default)]
    pub stores: Vec<StoreConfig>,
}

#[derive(Debug, Deserialize)]
pub struct DataCenterConfig {
    pub id: String,
    #[serde(default)]
    pub racks: Vec<RackConfig>,
}

#[derive(Debug, Deserialize)]
pub struct TemplateConfig {
    pub id: String,
    pub name: Option<String>,
    #[serde(default)]
    pub cpu: u32,
    #[serde(default)]
    pub mem: u32,
    #[serde(default)]
    pub io: u32,
    #[serde(default)]
    pub net: u32,
    /// Hosts machines of the template may use, all hosts if absent.
    pub hosts: Option<Vec<String>>,
}

/// Machine the application already runs.
#[derive(Debug, Deserialize)]
pub struct MachineConfig {
    pub id: String,
    pub template: String,
    pub host: String,
    #[serde(default)]
    pub stores: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApplicationConfig {
    pub id: String,
    pub name: Option<String>,
    /// Policy config value, e.g. `locality[maxVmsPerHost=2]`.
    pub policy: String,
    #[serde(default)]
    pub machines: Vec<MachineConfig>,
}

#[derive(Debug, Deserialize)]
pub struct Scenario {
    pub data_centers: Vec<DataCenterConfig>,
    pub templates: Vec<TemplateConfig>,
    pub application: ApplicationConfig,
    /// Number of machines to place per template.
    pub request: IndexMap<String, u32>,
}

impl Scenario {
    pub fn from_file(path: &Path) -> Result<Self, DeployerError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let scenario = serde_yaml::from_str(&content).map_err(ConfigError::from)?;
        Ok(scenario)
    }

    pub fn topology(&self) -> Result<PhysicalTopology, DeployerError> {
        let mut topology = PhysicalTopology::new();
        for dc in &self.data_centers {
            topology.add_data_center(&dc.id)?;
            for rack in &dc.racks {
                topology.add_rack(&rack.id, &dc.id)?;
                for store in &rack.stores {
                    topology.add_rack_store(&store.id, &rack.id, store.capacity, store.used)?;
                }
                for host in &rack.hosts {
                    topology.add_host(&host.id, &rack.id, host.cpu_usage, host.mem_usage)?;
                    for store in &host.stores {
                        topology.add_host_store(&store.id, &host.id, store.capacity, store.used)?;
                    }
                }
            }
        }
        Ok(topology)
    }

    /// Builds topology provider with a topology per template restricted to the hosts it may use.
    pub fn topology_provider(&self) -> Result<StaticTopologyProvider, DeployerError> {
        let topology = self.topology()?;
        let mut provider = StaticTopologyProvider::new();
        for template in &self.templates {
            let mut reachable = topology.clone();
            if let Some(hosts) = &template.hosts {
                reachable.retain_hosts(|host| hosts.iter().any(|id| id == host.id()));
            }
            provider = provider.with_template(&template.id, reachable);
        }
        Ok(provider)
    }

    /// Builds the application with its existing machines, which are reported as running.
    pub fn application(&self) -> (Application, InMemoryVmStatus) {
        let config = &self.application;
        let mut application = Application::new(
            &config.id,
            config.name.as_deref().unwrap_or(&config.id),
            PolicyBinding::parse(&config.policy),
        );
        for template in &self.templates {
            application.put_template(
                VmTemplate::new(&template.id)
                    .with_name(template.name.as_deref().unwrap_or(&template.id))
                    .with_cpu(template.cpu)
                    .with_mem(template.mem)
                    .with_io(template.io)
                    .with_net(template.net),
            );
        }

        let mut status = InMemoryVmStatus::new();
        if !config.machines.is_empty() {
            let mut existing = Deployment::new("deployment-existing");
            for machine in &config.machines {
                let mut vm = VirtualMachine::new(&machine.id, &machine.host, MachineStatus::On);
                for store in &machine.stores {
                    vm = vm.with_store(store);
                }
                let spec = VmDeploymentSpec::new(
                    &machine.template,
                    &machine.host,
                    machine.stores.first().map(String::as_str),
                );
                existing.add_machine(vm.clone(), spec);
                status = status.with_machine(vm);
            }
            existing.mark_launched();
            application.put_deployment(existing);
        }
        (application, status)
    }
}
