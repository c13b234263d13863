//! Placement policy interface.

use rand::RngCore;

use crate::collaborators::{TopologyProvider, VmStatusSource};
use crate::deployment::VmDeploymentSpec;
use crate::error::DeployerError;
use crate::policies::aggregated_locality::AggregatedLocalityPolicy;
use crate::policies::hdfs::HdfsReplicationPolicy;
use crate::policies::hdfs2::Hdfs2ReplicationPolicy;
use crate::policies::locality::LocalityPolicy;
use crate::policies::random::RandomPolicy;
use crate::policies::replication::BasicReplicationPolicy;
use crate::request::DeploymentRequest;
use crate::topology::PhysicalTopology;

/// Collaborators a policy consults during a run.
#[derive(Clone, Copy)]
pub struct PlanningServices<'a> {
    pub topology: &'a dyn TopologyProvider,
    pub status: &'a dyn VmStatusSource,
}

/// Strategy turning a deployment request into a list of placement specifications.
///
/// A run either returns a specification for every requested machine or fails as a whole.
pub trait PlacementPolicy {
    /// Returns the name the policy is registered under.
    fn name(&self) -> &'static str;

    fn generate_deployment(
        &self,
        request: &DeploymentRequest<'_>,
        services: &PlanningServices<'_>,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<VmDeploymentSpec>, DeployerError>;
}

/// Fetches the topology reachable by machines of the template.
///
/// A topology without hosts is an error since nothing can be placed there.
pub fn retrieve_topology(template: &str, provider: &dyn TopologyProvider) -> Result<PhysicalTopology, DeployerError> {
    let topology = provider.topology_for_template(template).map_err(|e| {
        DeployerError::collaborator(format!("can't retrieve topology of template '{}'", template), e)
    })?;
    if topology.host_count() == 0 {
        return Err(DeployerError::infeasible(format!(
            "No hosts available for template '{}'",
            template
        )));
    }
    Ok(topology)
}

/// Policy bound to an application in the deployer registry.
#[derive(Debug, Clone, PartialEq)]
pub enum DeployerPolicy {
    Random(RandomPolicy),
    Replicated(BasicReplicationPolicy),
    Locality(LocalityPolicy),
    AggregatedLocality(AggregatedLocalityPolicy),
    Hdfs(HdfsReplicationPolicy),
    Hdfs2(Hdfs2ReplicationPolicy),
}

impl DeployerPolicy {
    fn inner(&self) -> &dyn PlacementPolicy {
        match self {
            DeployerPolicy::Random(p) => p,
            DeployerPolicy::Replicated(p) => p,
            DeployerPolicy::Locality(p) => p,
            DeployerPolicy::AggregatedLocality(p) => p,
            DeployerPolicy::Hdfs(p) => p,
            DeployerPolicy::Hdfs2(p) => p,
        }
    }
}

impl PlacementPolicy for DeployerPolicy {
    fn name(&self) -> &'static str {
        self.inner().name()
    }

    fn generate_deployment(
        &self,
        request: &DeploymentRequest<'_>,
        services: &PlanningServices<'_>,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<VmDeploymentSpec>, DeployerError> {
        self.inner().generate_deployment(request, services, rng)
    }
}

macro_rules! impl_from_policy {
    ($($variant:ident($policy:ty)),*) => {
        $(
            impl From<$policy> for DeployerPolicy {
                fn from(policy: $policy) -> Self {
                    DeployerPolicy::$variant(policy)
                }
            }
        )*
    };
}

impl_from_policy!(
    Random(RandomPolicy),
    Replicated(BasicReplicationPolicy),
    Locality(LocalityPolicy),
    AggregatedLocality(AggregatedLocalityPolicy),
    Hdfs(HdfsReplicationPolicy),
    Hdfs2(Hdfs2ReplicationPolicy)
);
