#![allow(dead_code)]

use std::sync::Arc;

use nimbus_placement::application::{Application, PolicyBinding, VmTemplate};
use nimbus_placement::collaborators::{InMemoryVmStatus, StaticTopologyProvider};
use nimbus_placement::deployer::Deployer;
use nimbus_placement::deployment::{Deployment, MachineStatus, VirtualMachine, VmDeploymentSpec};
use nimbus_placement::topology::PhysicalTopology;

pub const APP: &str = "app-1";
pub const TEMPLATE: &str = "web";

pub fn dc_id(prefix: &str, dc: usize) -> String {
    format!("{}dc{}", prefix, dc)
}

pub fn rack_id(prefix: &str, dc: usize, rack: usize) -> String {
    format!("{}-rack{}", dc_id(prefix, dc), rack)
}

pub fn host_id(prefix: &str, dc: usize, rack: usize, host: usize) -> String {
    format!("{}-host{}", rack_id(prefix, dc, rack), host)
}

// Builds a regular topology: every data center has `racks` racks, every rack has `hosts` hosts and `rack_stores`
// stores, every host has `local_stores` stores. Stores have capacity 1 and are empty, hosts are idle.
pub fn create_topology(
    dcs: usize,
    racks: usize,
    hosts: usize,
    rack_stores: usize,
    local_stores: usize,
    prefix: &str,
) -> PhysicalTopology {
    let mut topology = PhysicalTopology::new();
    for d in 0..dcs {
        topology.add_data_center(&dc_id(prefix, d)).unwrap();
        for r in 0..racks {
            let rack = rack_id(prefix, d, r);
            topology.add_rack(&rack, &dc_id(prefix, d)).unwrap();
            for s in 0..rack_stores {
                topology.add_rack_store(&format!("{}-store{}", rack, s), &rack, 1, 0).unwrap();
            }
            for h in 0..hosts {
                let host = host_id(prefix, d, r, h);
                topology.add_host(&host, &rack, 0., 0.).unwrap();
                for s in 0..local_stores {
                    topology.add_host_store(&format!("{}-store{}", host, s), &host, 1, 0).unwrap();
                }
            }
        }
    }
    topology
}

pub fn create_application(policy: &str, templates: &[&str]) -> Application {
    let mut application = Application::new(APP, "test application", PolicyBinding::parse(policy));
    for template in templates {
        application.put_template(VmTemplate::new(template).with_cpu(1).with_mem(1));
    }
    application
}

// Adds a launched deployment with one machine per (id, template, host) triple.
pub fn add_existing_machines(
    application: &mut Application,
    status: InMemoryVmStatus,
    machines: &[(&str, &str, &str)],
) -> InMemoryVmStatus {
    let mut status = status;
    let mut deployment = Deployment::new("deployment-existing");
    for (id, template, host) in machines {
        let machine = VirtualMachine::new(id, host, MachineStatus::On);
        deployment.add_machine(machine.clone(), VmDeploymentSpec::new(template, host, None));
        status = status.with_machine(machine);
    }
    deployment.mark_launched();
    application.put_deployment(deployment);
    status
}

pub fn create_deployer(topology: PhysicalTopology, status: InMemoryVmStatus) -> Deployer {
    Deployer::new(
        Arc::new(StaticTopologyProvider::new().with_fallback(topology)),
        Arc::new(status),
    )
}
