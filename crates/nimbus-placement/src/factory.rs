//! Registry of policy factories.

use std::collections::HashMap;

use sugars::boxed;

use crate::config::{parse_config_value, parse_options, PolicyOptions};
use crate::error::{ConfigError, DeployerError};
use crate::policies::aggregated_locality::{AggregatedLocalityPolicy, AggregatedLocalityPolicyFactory};
use crate::policies::hdfs::{HdfsReplicationPolicy, HdfsReplicationPolicyFactory};
use crate::policies::hdfs2::{Hdfs2ReplicationPolicy, Hdfs2ReplicationPolicyFactory};
use crate::policies::locality::{LocalityPolicy, LocalityPolicyFactory};
use crate::policies::random::{RandomPolicy, RandomPolicyFactory};
use crate::policies::replication::{BasicReplicationPolicy, BasicReplicationPolicyFactory};
use crate::policy::DeployerPolicy;

/// Creates policy instances, either with default settings or from parsed options.
pub trait PolicyFactory: Send + Sync {
    fn new_instance(&self) -> DeployerPolicy;

    /// Creates an instance configured by options. Unknown options are ignored.
    fn from_options(&self, options: &PolicyOptions) -> Result<DeployerPolicy, ConfigError>;
}

/// Maps policy names to their factories.
pub struct PolicyFactories {
    factories: HashMap<String, Box<dyn PolicyFactory>>,
}

impl PolicyFactories {
    /// Creates empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Creates registry with factories of all built-in policies.
    pub fn with_defaults() -> Self {
        Self::new()
            .with_factory(RandomPolicy::NAME, boxed!(RandomPolicyFactory))
            .with_factory(BasicReplicationPolicy::NAME, boxed!(BasicReplicationPolicyFactory))
            .with_factory(LocalityPolicy::NAME, boxed!(LocalityPolicyFactory))
            .with_factory(AggregatedLocalityPolicy::NAME, boxed!(AggregatedLocalityPolicyFactory))
            .with_factory(HdfsReplicationPolicy::NAME, boxed!(HdfsReplicationPolicyFactory))
            .with_factory(Hdfs2ReplicationPolicy::NAME, boxed!(Hdfs2ReplicationPolicyFactory))
    }

    pub fn with_factory(mut self, name: &str, factory: Box<dyn PolicyFactory>) -> Self {
        self.register(name, factory);
        self
    }

    /// Registers factory under the name, replacing the previous one.
    pub fn register(&mut self, name: &str, factory: Box<dyn PolicyFactory>) {
        self.factories.insert(name.to_string(), factory);
    }

    pub fn has_factory(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn factory(&self, name: &str) -> Option<&dyn PolicyFactory> {
        self.factories.get(name).map(|f| f.as_ref())
    }

    /// Returns registered policy names in alphabetical order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Creates policy registered under the name, configured by options if given.
    pub fn create(&self, name: &str, options: Option<&PolicyOptions>) -> Result<DeployerPolicy, DeployerError> {
        let factory = self.factory(name).ok_or_else(|| {
            DeployerError::MissingPolicy(format!("Could not retrieve a factory for policy type '{}'", name))
        })?;
        match options {
            Some(options) => Ok(factory.from_options(options)?),
            None => Ok(factory.new_instance()),
        }
    }

    /// Creates policy from config value such as `locality[maxVmsPerHost=2]`.
    pub fn resolve(&self, config_str: &str) -> Result<DeployerPolicy, DeployerError> {
        let (name, options) = parse_config_value(config_str);
        let options = options.map(|s| parse_options(&s));
        self.create(&name, options.as_ref())
    }
}

impl Default for PolicyFactories {
    fn default() -> Self {
        Self::with_defaults()
    }
}
