//! Config utils and deployer configuration.

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Options of a placement policy, parsed from `key=value` pairs.
pub type PolicyOptions = HashMap<String, String>;

/// Parses config value string, which consists of two parts - name and options.
/// Example: `locality[maxVmsPerHost=2]` parts are name `locality` and options string `maxVmsPerHost=2`.
pub fn parse_config_value(config_str: &str) -> (String, Option<String>) {
    match config_str.split_once('[') {
        Some((l, r)) => (l.trim().to_string(), Some(r.replace(']', "").trim().to_string())),
        None => (config_str.trim().to_string(), None),
    }
}

/// Parses options string from config value, returns map with option names and values.
///
/// Pairs without `=` are skipped.
pub fn parse_options(options_str: &str) -> PolicyOptions {
    let mut options = HashMap::new();
    for option_str in options_str.split(',') {
        if let Some((name, value)) = option_str.split_once('=') {
            options.insert(name.trim().to_string(), value.trim().to_string());
        }
    }
    options
}

/// Reads typed option value, returns `None` if the option is absent.
pub fn parse_option<T: FromStr>(policy: &str, options: &PolicyOptions, name: &str) -> Result<Option<T>, ConfigError> {
    match options.get(name) {
        None => Ok(None),
        Some(value) => value.parse::<T>().map(Some).map_err(|_| ConfigError::InvalidOption {
            policy: policy.to_string(),
            option: name.to_string(),
            value: value.clone(),
        }),
    }
}

/// Holds raw deployer config parsed from YAML file.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
struct RawDeployerConfig {
    pub applications: Option<Vec<ApplicationPolicyConfig>>,
}

/// Binds a policy, in `name[key=value,...]` form, to an application.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct ApplicationPolicyConfig {
    /// Application ID.
    pub application: String,
    /// Policy config value.
    pub policy: String,
}

/// Represents deployer configuration.
#[derive(Debug, Default, PartialEq, Serialize, Deserialize, Clone)]
pub struct DeployerConfig {
    /// Policy bindings installed into the deployer registry.
    pub applications: Vec<ApplicationPolicyConfig>,
}

impl DeployerConfig {
    /// Creates deployer config by reading parameter values from YAML file
    /// (uses default values if some parameters are absent).
    pub fn from_file<P: AsRef<Path>>(file_name: P) -> Result<Self, ConfigError> {
        let path = file_name.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        content.parse()
    }
}

impl FromStr for DeployerConfig {
    type Err = ConfigError;

    /// Creates deployer config from YAML string.
    fn from_str(content: &str) -> Result<Self, Self::Err> {
        let raw: RawDeployerConfig = serde_yaml::from_str(content)?;
        Ok(Self {
            applications: raw.applications.unwrap_or_default(),
        })
    }
}
