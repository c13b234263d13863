mod common;

use rand::SeedableRng;
use rand_pcg::Pcg64;

use nimbus_placement::application::VmTemplate;
use nimbus_placement::collaborators::InMemoryVmStatus;
use nimbus_placement::error::DeployerError;
use nimbus_placement::placement_context::PlacementContext;
use nimbus_placement::selection::*;
use nimbus_placement::topology::{Identifiable, PhysicalStore, PhysicalTopology};

use common::{add_existing_machines, create_application, create_topology, TEMPLATE};

fn topology_with_stores(stores: &[(&str, u64, u64)]) -> PhysicalTopology {
    let mut topology = PhysicalTopology::new();
    topology.add_data_center("dc").unwrap();
    topology.add_rack("rack", "dc").unwrap();
    topology.add_host("host", "rack", 0., 0.).unwrap();
    for (id, capacity, used) in stores {
        topology.add_rack_store(id, "rack", *capacity, *used).unwrap();
    }
    topology
}

#[test]
// A store filled to exactly 60% is rejected, one filled to 59% is accepted.
fn test_store_admission_threshold() {
    let topology = topology_with_stores(&[("full", 100, 60)]);
    let stores: Vec<&PhysicalStore> = topology.stores().collect();
    match suitable_store(&stores) {
        Err(DeployerError::Infeasible(reason)) => assert_eq!(reason, "Not enough disk space"),
        other => panic!("unexpected result {:?}", other),
    }

    let topology = topology_with_stores(&[("almost", 100, 59)]);
    let stores: Vec<&PhysicalStore> = topology.stores().collect();
    assert_eq!(suitable_store(&stores).unwrap().id(), "almost");
}

#[test]
// The store with the lowest used ratio is selected.
fn test_suitable_store_lowest_ratio() {
    let topology = topology_with_stores(&[("a", 10, 5), ("b", 10, 1), ("c", 10, 3)]);
    let stores: Vec<&PhysicalStore> = topology.stores().collect();
    assert_eq!(suitable_store(&stores).unwrap().id(), "b");
}

#[test]
// If the least used store is too full, the fallback looks at all stores.
fn test_suitable_store_or_full() {
    let topology = topology_with_stores(&[("busy", 10, 1), ("idle", 10, 9)]);
    let stores: Vec<&PhysicalStore> = topology.stores().collect();
    let mut ctx = PlacementContext::new(&topology);
    ctx.record_placement(&topology, "host", topology.store("busy"));

    assert!(suitable_store_from_least_used(&stores, &ctx).is_err());
    assert_eq!(suitable_store_from_least_used_or_full(&stores, &ctx).unwrap().id(), "busy");
}

#[test]
// Least used list keeps all candidates tied at the minimum, in order.
fn test_least_used_list() {
    let topology = create_topology(1, 1, 4, 0, 0, "");
    let mut ctx = PlacementContext::new(&topology);
    ctx.record_host(&topology, "dc0-rack0-host0");
    ctx.record_host(&topology, "dc0-rack0-host2");
    let hosts: Vec<_> = topology.hosts().collect();
    let least_used: Vec<&str> = least_used_list(&hosts, |h| ctx.host_usage(h.id()))
        .iter()
        .map(|h| h.id())
        .collect();
    assert_eq!(least_used, vec!["dc0-rack0-host1", "dc0-rack0-host3"]);

    let mut rng = Pcg64::seed_from_u64(42);
    for _ in 0..10 {
        let picked = pick_least_used(&hosts, |h| ctx.host_usage(h.id()), &mut rng).unwrap();
        assert!(least_used.contains(&picked.id()));
    }
}

#[test]
// CPU heavy templates go to the host with the lowest CPU usage, others to the lowest memory usage.
fn test_least_stressed() {
    let mut topology = PhysicalTopology::new();
    topology.add_data_center("dc").unwrap();
    topology.add_rack("rack", "dc").unwrap();
    topology.add_host("cpu-free", "rack", 0.1, 0.9).unwrap();
    topology.add_host("mem-free", "rack", 0.9, 0.1).unwrap();
    let hosts: Vec<_> = topology.hosts().collect();

    let cpu_heavy = VmTemplate::new("cpu").with_cpu(4).with_mem(1);
    let mem_heavy = VmTemplate::new("mem").with_cpu(1).with_mem(4);
    let balanced = VmTemplate::new("balanced").with_cpu(2).with_mem(2);
    assert_eq!(least_stressed(&hosts, &cpu_heavy).unwrap().id(), "cpu-free");
    assert_eq!(least_stressed(&hosts, &mem_heavy).unwrap().id(), "mem-free");
    assert_eq!(least_stressed(&hosts, &balanced).unwrap().id(), "mem-free");
    assert!(least_stressed(&[], &balanced).is_none());
}

#[test]
// Picking another node falls back to the avoided one only when it is alone.
fn test_pick_other() {
    let topology = create_topology(1, 2, 1, 0, 0, "");
    let racks: Vec<_> = topology.racks().collect();
    let mut rng = Pcg64::seed_from_u64(7);
    for _ in 0..10 {
        assert_eq!(pick_other(&racks, racks[0], &mut rng).id(), "dc0-rack1");
    }
    assert_eq!(pick_other(&racks[..1], racks[0], &mut rng).id(), "dc0-rack0");
}

#[test]
// Seeding counts machines of the template on hosts in scope and sums them into racks.
fn test_seed_from_application() {
    let topology = create_topology(1, 2, 2, 0, 0, "");
    let mut application = create_application("random", &[TEMPLATE, "db"]);
    let status = add_existing_machines(
        &mut application,
        InMemoryVmStatus::new(),
        &[
            ("vm-1", TEMPLATE, "dc0-rack0-host0"),
            ("vm-2", TEMPLATE, "dc0-rack0-host1"),
            ("vm-3", "db", "dc0-rack0-host1"),
            ("vm-4", TEMPLATE, "elsewhere"),
        ],
    );

    let mut ctx = PlacementContext::new(&topology);
    ctx.seed_from_application(&application, Some(TEMPLATE), &topology, &status)
        .unwrap();
    assert_eq!(ctx.host_usage("dc0-rack0-host1"), 1);
    assert_eq!(ctx.rack_usage("dc0-rack0"), 2);
    assert_eq!(ctx.rack_usage("dc0-rack1"), 0);
    assert_eq!(ctx.total_machines(), 2);
    assert!(!ctx.host_counters().contains_key("elsewhere"));

    let mut ctx = PlacementContext::new(&topology);
    ctx.seed_from_application(&application, None, &topology, &status).unwrap();
    assert_eq!(ctx.rack_usage("dc0-rack0"), 3);
}
