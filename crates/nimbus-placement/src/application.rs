//! Applications and VM templates.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::collaborators::VmStatusSource;
use crate::config::parse_config_value;
use crate::deployment::{Deployment, PlacedMachine};
use crate::error::CollaboratorError;
use crate::topology::Identifiable;

/// Resource profile machines are launched from.
///
/// The weights are relative and only compared with each other (see least-stressed host selection).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmTemplate {
    id: String,
    name: String,
    cpu: u32,
    mem: u32,
    io: u32,
    net: u32,
}

impl VmTemplate {
    /// Creates template with zero weights.
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            cpu: 0,
            mem: 0,
            io: 0,
            net: 0,
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_cpu(mut self, cpu: u32) -> Self {
        self.cpu = cpu;
        self
    }

    pub fn with_mem(mut self, mem: u32) -> Self {
        self.mem = mem;
        self
    }

    pub fn with_io(mut self, io: u32) -> Self {
        self.io = io;
        self
    }

    pub fn with_net(mut self, net: u32) -> Self {
        self.net = net;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cpu(&self) -> u32 {
        self.cpu
    }

    pub fn mem(&self) -> u32 {
        self.mem
    }

    pub fn io(&self) -> u32 {
        self.io
    }

    pub fn net(&self) -> u32 {
        self.net
    }
}

impl Identifiable for VmTemplate {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Name of the placement policy an application uses plus its options string.
///
/// The textual form is `name` or `name[key=value,...]`, e.g. `locality[maxVmsPerHost=2]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyBinding {
    pub name: String,
    pub config: Option<String>,
}

impl PolicyBinding {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            config: None,
        }
    }

    pub fn with_config(name: &str, config: &str) -> Self {
        Self {
            name: name.to_string(),
            config: Some(config.to_string()),
        }
    }

    /// Parses binding from its textual form.
    pub fn parse(value: &str) -> Self {
        let (name, config) = parse_config_value(value.trim());
        Self { name, config }
    }
}

impl fmt::Display for PolicyBinding {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.config {
            Some(config) => write!(f, "{}[{}]", self.name, config),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Tenant application: its templates, deployments and placement policy binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    id: String,
    name: String,
    policy: PolicyBinding,
    templates: IndexMap<String, VmTemplate>,
    deployments: IndexMap<String, Deployment>,
}

impl Application {
    pub fn new(id: &str, name: &str, policy: PolicyBinding) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            policy,
            templates: IndexMap::new(),
            deployments: IndexMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn policy(&self) -> &PolicyBinding {
        &self.policy
    }

    pub fn set_policy(&mut self, policy: PolicyBinding) {
        self.policy = policy;
    }

    /// Adds or replaces template.
    pub fn put_template(&mut self, template: VmTemplate) {
        self.templates.insert(template.id.clone(), template);
    }

    pub fn template(&self, id: &str) -> Option<&VmTemplate> {
        self.templates.get(id)
    }

    pub fn templates(&self) -> impl Iterator<Item = &VmTemplate> {
        self.templates.values()
    }

    /// Adds or replaces deployment.
    pub fn put_deployment(&mut self, deployment: Deployment) {
        self.deployments.insert(deployment.id().to_string(), deployment);
    }

    pub fn deployment(&self, id: &str) -> Option<&Deployment> {
        self.deployments.get(id)
    }

    pub fn deployment_mut(&mut self, id: &str) -> Option<&mut Deployment> {
        self.deployments.get_mut(id)
    }

    pub fn deployments(&self) -> impl Iterator<Item = &Deployment> {
        self.deployments.values()
    }

    /// Returns machines currently placed by launched deployments, refreshed against the virtualization layer.
    pub fn placed_machines(&self, status: &dyn VmStatusSource) -> Result<Vec<PlacedMachine>, CollaboratorError> {
        let mut result = Vec::new();
        for deployment in self.deployments.values().filter(|d| d.is_launched()) {
            result.extend(deployment.refreshed_machines(status)?);
        }
        Ok(result)
    }
}

impl Identifiable for Application {
    fn id(&self) -> &str {
        &self.id
    }
}
