#![doc = include_str!("../readme.md")]

pub mod application;
pub mod collaborators;
pub mod config;
pub mod deployer;
pub mod deployment;
pub mod error;
pub mod factory;
pub mod placement_context;
pub mod policies;
pub mod policy;
pub mod request;
pub mod selection;
pub mod topology;
