//! Placement policies and their factories.

pub mod aggregated_locality;
pub mod hdfs;
pub mod hdfs2;
pub mod locality;
pub mod random;
pub mod replication;

/// Default number of machines the locality policies put on one host.
pub const DEFAULT_MAX_VMS_PER_HOST: u32 = 4;

/// Option key of the per-host cap of the locality policies.
pub const MAX_VMS_PER_HOST_OPTION: &str = "maxVmsPerHost";
