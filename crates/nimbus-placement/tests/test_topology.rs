mod common;

use nimbus_placement::error::TopologyError;
use nimbus_placement::topology::{Identifiable, PhysicalTopology, StoreLocation};

use common::create_topology;

#[test]
// Merging a topology with itself gives the same topology.
fn test_merge_with_self() {
    let topology = create_topology(2, 3, 4, 1, 1, "");
    let merged = PhysicalTopology::merge(&topology, &topology);
    assert_eq!(merged, topology);
}

#[test]
// Merging disjoint topologies keeps all nodes, shared data centers get racks from both sides.
fn test_merge_union() {
    let mut first = PhysicalTopology::new();
    first.add_data_center("dc").unwrap();
    first.add_rack("r1", "dc").unwrap();
    first.add_host("h1", "r1", 0.5, 0.5).unwrap();

    let mut second = PhysicalTopology::new();
    second.add_data_center("dc").unwrap();
    second.add_rack("r1", "dc").unwrap();
    second.add_host("h1", "r1", 0.9, 0.9).unwrap();
    second.add_host("h2", "r1", 0.1, 0.1).unwrap();
    second.add_rack("r2", "dc").unwrap();
    second.add_host("h3", "r2", 0.2, 0.2).unwrap();
    second.add_rack_store("s1", "r2", 10, 1).unwrap();

    let merged = PhysicalTopology::merge(&first, &second);
    assert_eq!(merged.data_centers().count(), 1);
    assert_eq!(merged.data_center("dc").unwrap().racks(), &["r1".to_string(), "r2".to_string()]);
    assert_eq!(merged.rack("r1").unwrap().hosts(), &["h1".to_string(), "h2".to_string()]);
    assert_eq!(merged.host_count(), 3);
    assert_eq!(merged.store("s1").unwrap().capacity(), 10);
    // attributes of the first topology win
    assert_eq!(merged.host("h1").unwrap().cpu_usage(), 0.5);
}

#[test]
// A host listed under different racks stays only under the rack of the first topology.
fn test_merge_conflicting_parents() {
    let mut first = PhysicalTopology::new();
    first.add_data_center("dc").unwrap();
    first.add_rack("r1", "dc").unwrap();
    first.add_host("h1", "r1", 0.5, 0.5).unwrap();
    first.add_host_store("h1-disk", "h1", 10, 0).unwrap();

    let mut second = PhysicalTopology::new();
    second.add_data_center("dc").unwrap();
    second.add_rack("r2", "dc").unwrap();
    second.add_host("h1", "r2", 0.5, 0.5).unwrap();
    second.add_host("h2", "r2", 0.5, 0.5).unwrap();
    second.add_host_store("h1-disk", "h1", 10, 0).unwrap();

    let merged = PhysicalTopology::merge(&first, &second);
    assert_eq!(merged.host("h1").unwrap().rack(), "r1");
    assert_eq!(merged.rack("r1").unwrap().hosts(), &["h1".to_string()]);
    assert_eq!(merged.rack("r2").unwrap().hosts(), &["h2".to_string()]);
    assert_eq!(merged.host("h1").unwrap().stores(), &["h1-disk".to_string()]);
    let listed: usize = merged.racks().map(|rack| rack.hosts().len()).sum();
    assert_eq!(listed, merged.host_count());
}

#[test]
// Host-local stores come before the stores of the rack.
fn test_stores_for_host() {
    let topology = create_topology(1, 1, 2, 2, 1, "");
    let host = topology.host("dc0-rack0-host1").unwrap();
    let stores: Vec<&str> = topology.stores_for_host(host).iter().map(|s| s.id()).collect();
    assert_eq!(
        stores,
        vec!["dc0-rack0-host1-store0", "dc0-rack0-store0", "dc0-rack0-store1"]
    );
    assert_eq!(
        topology.store("dc0-rack0-host1-store0").unwrap().location(),
        &StoreLocation::Host("dc0-rack0-host1".to_string())
    );
}

#[test]
// Parent lookups go from a host up to its data center.
fn test_parent_lookups() {
    let topology = create_topology(2, 2, 2, 0, 0, "");
    let host = topology.host("dc1-rack0-host1").unwrap();
    let rack = topology.rack_of(host).unwrap();
    assert_eq!(rack.id(), "dc1-rack0");
    assert_eq!(topology.data_center_of(rack).unwrap().id(), "dc1");
    assert_eq!(topology.hosts_of(rack).len(), 2);
}

#[test]
// Filtering hosts removes their local stores and prunes racks and data centers left empty.
fn test_retain_hosts() {
    let mut topology = create_topology(2, 2, 2, 0, 1, "");
    topology.retain_hosts(|host| host.id().starts_with("dc0-rack1"));
    assert_eq!(topology.host_count(), 2);
    assert_eq!(topology.stores().count(), 2);
    assert_eq!(topology.racks().count(), 1);
    assert_eq!(topology.data_centers().count(), 1);
    assert_eq!(topology.data_center("dc0").unwrap().racks(), &["dc0-rack1".to_string()]);
}

#[test]
// Racks holding only stores survive pruning.
fn test_prune_keeps_store_racks() {
    let mut topology = create_topology(1, 2, 1, 1, 0, "");
    topology.retain_hosts(|host| host.id() != "dc0-rack1-host0");
    assert_eq!(topology.racks().count(), 2);
    assert_eq!(topology.racks_with_hosts().len(), 1);
}

#[test]
// Node IDs are unique and parents must exist.
fn test_builder_errors() {
    let mut topology = PhysicalTopology::new();
    topology.add_data_center("dc").unwrap();
    assert_eq!(
        topology.add_data_center("dc"),
        Err(TopologyError::DuplicateId("dc".to_string()))
    );
    assert!(matches!(
        topology.add_host("h1", "missing", 0., 0.),
        Err(TopologyError::UnknownParent { kind: "rack", .. })
    ));
    assert!(topology.add_host_store("s1", "missing", 1, 0).is_err());
}

#[test]
// Store without capacity is never considered free.
fn test_used_ratio() {
    let mut topology = PhysicalTopology::new();
    topology.add_data_center("dc").unwrap();
    topology.add_rack("r", "dc").unwrap();
    topology.add_rack_store("half", "r", 10, 5).unwrap();
    topology.add_rack_store("empty", "r", 0, 0).unwrap();
    assert_eq!(topology.store("half").unwrap().used_ratio(), 0.5);
    assert!(topology.store("empty").unwrap().used_ratio().is_infinite());
}
