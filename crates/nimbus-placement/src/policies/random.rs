//! Random placement.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use log::debug;
use rand::prelude::*;
use rand_pcg::Pcg64;

use crate::config::{parse_option, PolicyOptions};
use crate::deployment::VmDeploymentSpec;
use crate::error::{ConfigError, DeployerError};
use crate::factory::PolicyFactory;
use crate::policy::{retrieve_topology, DeployerPolicy, PlacementPolicy, PlanningServices};
use crate::request::DeploymentRequest;
use crate::topology::{Identifiable, PhysicalHost};

/// Puts every machine on a uniformly random host reachable by its template. Stores are not assigned.
///
/// A seeded policy draws from its own random stream which advances across runs, so the sequence of plans is
/// reproducible from a fresh instance. Clones share the stream.
#[derive(Clone, Default)]
pub struct RandomPolicy {
    seed: Option<u64>,
    stream: Option<Arc<Mutex<Pcg64>>>,
}

impl RandomPolicy {
    pub const NAME: &'static str = "random";

    pub fn new() -> Self {
        Default::default()
    }

    /// Creates policy which draws from a random stream started from the seed.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            stream: Some(Arc::new(Mutex::new(Pcg64::seed_from_u64(seed)))),
        }
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    fn place<R: Rng + ?Sized>(
        &self,
        request: &DeploymentRequest<'_>,
        services: &PlanningServices<'_>,
        rng: &mut R,
    ) -> Result<Vec<VmDeploymentSpec>, DeployerError> {
        let mut result = Vec::new();
        for (template, count) in request.template_requests() {
            let topology = retrieve_topology(template.id(), services.topology)?;
            let hosts: Vec<&PhysicalHost> = topology.hosts().collect();
            for _ in 0..count {
                let host = hosts
                    .choose(rng)
                    .ok_or_else(|| DeployerError::infeasible("Does not fit"))?;
                debug!("Placing machine of template {} on host {}", template.id(), host.id());
                result.push(VmDeploymentSpec::new(template.id(), host.id(), None));
            }
        }
        Ok(result)
    }
}

impl PlacementPolicy for RandomPolicy {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn generate_deployment(
        &self,
        request: &DeploymentRequest<'_>,
        services: &PlanningServices<'_>,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<VmDeploymentSpec>, DeployerError> {
        match &self.stream {
            Some(stream) => {
                let mut stream = stream.lock().unwrap_or_else(PoisonError::into_inner);
                self.place(request, services, &mut *stream)
            }
            None => self.place(request, services, rng),
        }
    }
}

impl fmt::Debug for RandomPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RandomPolicy").field("seed", &self.seed).finish()
    }
}

// Policies are equal when configured alike, the position of the stream is not compared.
impl PartialEq for RandomPolicy {
    fn eq(&self, other: &Self) -> bool {
        self.seed == other.seed
    }
}

impl Eq for RandomPolicy {}

/// Creates [`RandomPolicy`] instances. Supports the `seed` option.
pub struct RandomPolicyFactory;

impl PolicyFactory for RandomPolicyFactory {
    fn new_instance(&self) -> DeployerPolicy {
        RandomPolicy::new().into()
    }

    fn from_options(&self, options: &PolicyOptions) -> Result<DeployerPolicy, ConfigError> {
        let policy = match parse_option::<u64>(RandomPolicy::NAME, options, "seed")? {
            Some(seed) => RandomPolicy::with_seed(seed),
            None => RandomPolicy::new(),
        };
        Ok(policy.into())
    }
}
