//! Error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors returned by the deployer and by placement policies.
///
/// Any error returned from a policy run means that the whole request failed: no partial plan is produced.
#[derive(Debug, Error)]
pub enum DeployerError {
    /// No policy is bound to an application, or no factory is registered for a policy name.
    #[error("{0}")]
    MissingPolicy(String),

    /// The caller violated the API contract, e.g. built a request without an application.
    #[error("contract violation: {0}")]
    Contract(String),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The request cannot be satisfied within the reachable topology.
    #[error("{0}")]
    Infeasible(String),

    /// An external collaborator (topology provider, VM status source) failed.
    #[error("{context}: {source}")]
    Collaborator {
        context: String,
        #[source]
        source: CollaboratorError,
    },

    #[error("topology error: {0}")]
    Topology(#[from] TopologyError),
}

impl DeployerError {
    pub(crate) fn infeasible<S: Into<String>>(reason: S) -> Self {
        DeployerError::Infeasible(reason.into())
    }

    pub(crate) fn collaborator<S: Into<String>>(context: S, source: CollaboratorError) -> Self {
        DeployerError::Collaborator {
            context: context.into(),
            source,
        }
    }
}

/// Errors in policy options, configuration files and request references.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value '{value}' of option '{option}' for policy '{policy}'")]
    InvalidOption {
        policy: String,
        option: String,
        value: String,
    },

    #[error("template '{template}' is not known to application '{application}'")]
    UnknownTemplate { application: String, template: String },

    #[error("can't read file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("can't parse YAML: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Failures of the external collaborators consumed by the policies.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CollaboratorError {
    #[error("service unreachable: {0}")]
    Unreachable(String),

    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    #[error("request timed out: {0}")]
    Timeout(String),
}

/// Errors raised while building a topology.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TopologyError {
    #[error("duplicate node id '{0}'")]
    DuplicateId(String),

    #[error("unknown {kind} '{id}'")]
    UnknownParent { kind: &'static str, id: String },
}

pub type DeployerResult<T> = Result<T, DeployerError>;
