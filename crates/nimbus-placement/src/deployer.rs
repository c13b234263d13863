//! Entry point: resolves the policy of an application and turns its requests into deployments.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use log::{debug, info};
use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64;

use crate::application::Application;
use crate::collaborators::{TopologyProvider, VmStatusSource};
use crate::config::{parse_options, DeployerConfig};
use crate::deployment::Deployment;
use crate::error::DeployerError;
use crate::factory::PolicyFactories;
use crate::policy::{DeployerPolicy, PlacementPolicy, PlanningServices};
use crate::request::DeploymentRequest;
use crate::topology::Identifiable;

/// Keeps the placement policy bound to each application and generates deployments with it.
///
/// The deployer can be shared between threads. Each generation works on its own counters, so concurrent calls do
/// not see each other's placements.
pub struct Deployer {
    factories: PolicyFactories,
    policies: RwLock<HashMap<String, DeployerPolicy>>,
    topology: Arc<dyn TopologyProvider>,
    status: Arc<dyn VmStatusSource>,
}

impl Deployer {
    /// Creates deployer with the built-in policy factories and no bound policies.
    pub fn new(topology: Arc<dyn TopologyProvider>, status: Arc<dyn VmStatusSource>) -> Self {
        Self {
            factories: PolicyFactories::with_defaults(),
            policies: RwLock::new(HashMap::new()),
            topology,
            status,
        }
    }

    /// Replaces the policy factories.
    pub fn with_policy_factories(mut self, factories: PolicyFactories) -> Self {
        self.factories = factories;
        self
    }

    pub fn factories(&self) -> &PolicyFactories {
        &self.factories
    }

    /// Returns a clone of the policy bound to the application. A seeded random policy shares its stream with the clone.
    pub fn policy(&self, application: &str) -> Option<DeployerPolicy> {
        self.policies
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(application)
            .cloned()
    }

    /// Binds the policy to the application, replacing the previous one.
    pub fn set_policy<P: Into<DeployerPolicy>>(&self, application: &str, policy: P) {
        let policy = policy.into();
        debug!("Binding policy {} to application {}", policy.name(), application);
        self.policies
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(application.to_string(), policy);
    }

    /// Binds a default instance of the named policy to the application.
    pub fn set_policy_by_name(&self, application: &str, name: &str) -> Result<(), DeployerError> {
        let policy = self.factories.create(name, None)?;
        self.set_policy(application, policy);
        Ok(())
    }

    /// Binds an instance of the named policy configured by options string, e.g. `maxVmsPerHost=2`.
    pub fn set_policy_with_config(&self, application: &str, name: &str, options: &str) -> Result<(), DeployerError> {
        let options = parse_options(options);
        let policy = self.factories.create(name, Some(&options))?;
        self.set_policy(application, policy);
        Ok(())
    }

    /// Unbinds the policy of the application, returning it.
    pub fn remove_policy(&self, application: &str) -> Option<DeployerPolicy> {
        self.policies
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(application)
    }

    /// Binds the policy named by the application's own policy binding.
    pub fn bind_application(&self, application: &Application) -> Result<(), DeployerError> {
        let binding = application.policy();
        match &binding.config {
            Some(options) => self.set_policy_with_config(application.id(), &binding.name, options),
            None => self.set_policy_by_name(application.id(), &binding.name),
        }
    }

    /// Binds all policies listed in the config.
    ///
    /// Either all bindings are installed or, if one of them can't be resolved, none.
    pub fn apply_config(&self, config: &DeployerConfig) -> Result<(), DeployerError> {
        let mut resolved = Vec::with_capacity(config.applications.len());
        for binding in &config.applications {
            resolved.push((binding.application.as_str(), self.factories.resolve(&binding.policy)?));
        }
        let mut policies = self.policies.write().unwrap_or_else(PoisonError::into_inner);
        for (application, policy) in resolved {
            policies.insert(application.to_string(), policy);
        }
        Ok(())
    }

    /// Generates deployment for the request using a fresh random source.
    pub fn generate_deployment(&self, request: &DeploymentRequest<'_>) -> Result<Deployment, DeployerError> {
        self.generate_deployment_with_rng(request, &mut Pcg64::from_entropy())
    }

    /// Generates deployment for the request using the given random source.
    ///
    /// The returned deployment is not launched and has a fresh ID.
    pub fn generate_deployment_with_rng(
        &self,
        request: &DeploymentRequest<'_>,
        rng: &mut dyn RngCore,
    ) -> Result<Deployment, DeployerError> {
        let application = request.application().id();
        let policy = self.policy(application).ok_or_else(|| {
            DeployerError::MissingPolicy(format!("Cannot find policy for application '{}'", application))
        })?;
        let services = PlanningServices {
            topology: self.topology.as_ref(),
            status: self.status.as_ref(),
        };
        let specs = policy.generate_deployment(request, &services, rng)?;
        let deployment = Deployment::with_specs(&Deployment::generate_id(), specs);
        info!(
            "Generated deployment {} for request {} of application {} using policy {}: {} machines",
            deployment.id(),
            request.id(),
            application,
            policy.name(),
            deployment.specs().len()
        );
        Ok(deployment)
    }
}
