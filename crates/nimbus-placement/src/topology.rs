//! Physical topology model.
//!
//! The topology is a tree `DataCenter -> Rack -> {Host, Store}` where hosts may own local stores as well.
//! Nodes are kept in per-kind arenas keyed by their unique id, and every non-root node stores the id of its parent,
//! so upward traversal ("the rack of this host", "the data center of this rack") is a single lookup.
//!
//! Child lists preserve insertion order, which makes flattened queries deterministic.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::TopologyError;

/// An entity addressed by a unique string id.
pub trait Identifiable {
    fn id(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicalDataCenter {
    id: String,
    racks: Vec<String>,
}

impl PhysicalDataCenter {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            racks: Vec::new(),
        }
    }

    /// Returns IDs of racks in this data center.
    pub fn racks(&self) -> &[String] {
        &self.racks
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicalRack {
    id: String,
    data_center: String,
    hosts: Vec<String>,
    stores: Vec<String>,
}

impl PhysicalRack {
    fn new(id: &str, data_center: &str) -> Self {
        Self {
            id: id.to_string(),
            data_center: data_center.to_string(),
            hosts: Vec::new(),
            stores: Vec::new(),
        }
    }

    /// Returns ID of the data center owning this rack.
    pub fn data_center(&self) -> &str {
        &self.data_center
    }

    /// Returns IDs of hosts in this rack.
    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    /// Returns IDs of rack-local (network) stores.
    pub fn stores(&self) -> &[String] {
        &self.stores
    }

    fn is_empty(&self) -> bool {
        self.hosts.is_empty() && self.stores.is_empty()
    }
}

/// Physical host with its current utilization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicalHost {
    id: String,
    rack: String,
    cpu_usage: f64,
    mem_usage: f64,
    stores: Vec<String>,
}

impl PhysicalHost {
    /// Returns ID of the rack owning this host.
    pub fn rack(&self) -> &str {
        &self.rack
    }

    /// Returns the CPU utilization of the host.
    pub fn cpu_usage(&self) -> f64 {
        self.cpu_usage
    }

    /// Returns the memory utilization of the host.
    pub fn mem_usage(&self) -> f64 {
        self.mem_usage
    }

    /// Returns IDs of host-local stores.
    pub fn stores(&self) -> &[String] {
        &self.stores
    }
}

/// Owner of a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreLocation {
    Rack(String),
    Host(String),
}

/// Storage volume with its capacity and currently used space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicalStore {
    id: String,
    location: StoreLocation,
    capacity: u64,
    used: u64,
}

impl PhysicalStore {
    pub fn location(&self) -> &StoreLocation {
        &self.location
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    pub fn used(&self) -> u64 {
        self.used
    }

    /// Returns the ratio of used space to capacity.
    ///
    /// A store without capacity is reported as full.
    pub fn used_ratio(&self) -> f64 {
        if self.capacity == 0 {
            return f64::INFINITY;
        }
        self.used as f64 / self.capacity as f64
    }
}

impl Identifiable for PhysicalDataCenter {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Identifiable for PhysicalRack {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Identifiable for PhysicalHost {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Identifiable for PhysicalStore {
    fn id(&self) -> &str {
        &self.id
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Root aggregate of the physical inventory.
///
/// Equality ignores the order in which nodes were added to the arenas, but not the order of child lists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhysicalTopology {
    data_centers: IndexMap<String, PhysicalDataCenter>,
    racks: IndexMap<String, PhysicalRack>,
    hosts: IndexMap<String, PhysicalHost>,
    stores: IndexMap<String, PhysicalStore>,
}

impl PhysicalTopology {
    /// Creates empty topology.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds data center.
    pub fn add_data_center(&mut self, id: &str) -> Result<(), TopologyError> {
        if self.data_centers.contains_key(id) {
            return Err(TopologyError::DuplicateId(id.to_string()));
        }
        self.data_centers.insert(id.to_string(), PhysicalDataCenter::new(id));
        Ok(())
    }

    /// Adds rack to the specified data center.
    pub fn add_rack(&mut self, id: &str, data_center: &str) -> Result<(), TopologyError> {
        if self.racks.contains_key(id) {
            return Err(TopologyError::DuplicateId(id.to_string()));
        }
        let dc = self
            .data_centers
            .get_mut(data_center)
            .ok_or_else(|| TopologyError::UnknownParent {
                kind: "data center",
                id: data_center.to_string(),
            })?;
        dc.racks.push(id.to_string());
        self.racks.insert(id.to_string(), PhysicalRack::new(id, data_center));
        Ok(())
    }

    /// Adds host with the given CPU and memory utilization to the specified rack.
    pub fn add_host(&mut self, id: &str, rack: &str, cpu_usage: f64, mem_usage: f64) -> Result<(), TopologyError> {
        if self.hosts.contains_key(id) {
            return Err(TopologyError::DuplicateId(id.to_string()));
        }
        let parent = self.racks.get_mut(rack).ok_or_else(|| TopologyError::UnknownParent {
            kind: "rack",
            id: rack.to_string(),
        })?;
        parent.hosts.push(id.to_string());
        self.hosts.insert(
            id.to_string(),
            PhysicalHost {
                id: id.to_string(),
                rack: rack.to_string(),
                cpu_usage,
                mem_usage,
                stores: Vec::new(),
            },
        );
        Ok(())
    }

    /// Adds rack-local store.
    pub fn add_rack_store(&mut self, id: &str, rack: &str, capacity: u64, used: u64) -> Result<(), TopologyError> {
        if self.stores.contains_key(id) {
            return Err(TopologyError::DuplicateId(id.to_string()));
        }
        let parent = self.racks.get_mut(rack).ok_or_else(|| TopologyError::UnknownParent {
            kind: "rack",
            id: rack.to_string(),
        })?;
        parent.stores.push(id.to_string());
        self.insert_store(id, StoreLocation::Rack(rack.to_string()), capacity, used);
        Ok(())
    }

    /// Adds host-local store.
    pub fn add_host_store(&mut self, id: &str, host: &str, capacity: u64, used: u64) -> Result<(), TopologyError> {
        if self.stores.contains_key(id) {
            return Err(TopologyError::DuplicateId(id.to_string()));
        }
        let parent = self.hosts.get_mut(host).ok_or_else(|| TopologyError::UnknownParent {
            kind: "host",
            id: host.to_string(),
        })?;
        parent.stores.push(id.to_string());
        self.insert_store(id, StoreLocation::Host(host.to_string()), capacity, used);
        Ok(())
    }

    fn insert_store(&mut self, id: &str, location: StoreLocation, capacity: u64, used: u64) {
        self.stores.insert(
            id.to_string(),
            PhysicalStore {
                id: id.to_string(),
                location,
                capacity,
                used,
            },
        );
    }

    pub fn data_centers(&self) -> impl Iterator<Item = &PhysicalDataCenter> {
        self.data_centers.values()
    }

    pub fn racks(&self) -> impl Iterator<Item = &PhysicalRack> {
        self.racks.values()
    }

    pub fn hosts(&self) -> impl Iterator<Item = &PhysicalHost> {
        self.hosts.values()
    }

    pub fn stores(&self) -> impl Iterator<Item = &PhysicalStore> {
        self.stores.values()
    }

    pub fn data_center(&self, id: &str) -> Option<&PhysicalDataCenter> {
        self.data_centers.get(id)
    }

    pub fn rack(&self, id: &str) -> Option<&PhysicalRack> {
        self.racks.get(id)
    }

    pub fn host(&self, id: &str) -> Option<&PhysicalHost> {
        self.hosts.get(id)
    }

    pub fn store(&self, id: &str) -> Option<&PhysicalStore> {
        self.stores.get(id)
    }

    pub fn host_count(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data_centers.is_empty()
    }

    /// Returns racks of the data center.
    pub fn racks_of(&self, dc: &PhysicalDataCenter) -> Vec<&PhysicalRack> {
        dc.racks.iter().filter_map(|id| self.racks.get(id)).collect()
    }

    /// Returns hosts of the rack.
    pub fn hosts_of(&self, rack: &PhysicalRack) -> Vec<&PhysicalHost> {
        rack.hosts.iter().filter_map(|id| self.hosts.get(id)).collect()
    }

    /// Returns racks which contain at least one host.
    pub fn racks_with_hosts(&self) -> Vec<&PhysicalRack> {
        self.racks.values().filter(|rack| !rack.hosts.is_empty()).collect()
    }

    /// Returns the rack owning the host.
    pub fn rack_of(&self, host: &PhysicalHost) -> Option<&PhysicalRack> {
        self.racks.get(&host.rack)
    }

    /// Returns the data center owning the rack.
    pub fn data_center_of(&self, rack: &PhysicalRack) -> Option<&PhysicalDataCenter> {
        self.data_centers.get(&rack.data_center)
    }

    /// Returns rack-local stores of the rack.
    pub fn rack_stores(&self, rack: &PhysicalRack) -> Vec<&PhysicalStore> {
        rack.stores.iter().filter_map(|id| self.stores.get(id)).collect()
    }

    /// Returns stores a machine placed on the host can use: host-local stores first, then stores of its rack.
    pub fn stores_for_host(&self, host: &PhysicalHost) -> Vec<&PhysicalStore> {
        let local = host.stores.iter().filter_map(|id| self.stores.get(id));
        let shared = self
            .racks
            .get(&host.rack)
            .into_iter()
            .flat_map(|rack| rack.stores.iter())
            .filter_map(|id| self.stores.get(id));
        local.chain(shared).collect()
    }

    /// Returns the union of two topologies.
    ///
    /// Nodes are matched by id. Children of nodes present in both topologies are combined, with children of `first`
    /// listed before children of `second`. Attributes and the parent of a node present in both (host utilization,
    /// store usage) are taken from `first`, so such a node is never listed under another parent from `second`.
    pub fn merge(first: &PhysicalTopology, second: &PhysicalTopology) -> PhysicalTopology {
        let mut result = first.clone();
        for dc in second.data_centers.values() {
            let racks = owned_ids(&dc.racks, |id| first.racks.get(id).map_or(true, |r| r.data_center == dc.id));
            let target = result
                .data_centers
                .entry(dc.id.clone())
                .or_insert_with(|| PhysicalDataCenter::new(&dc.id));
            union_ids(&mut target.racks, &racks);
        }
        for rack in second.racks.values() {
            let hosts = owned_ids(&rack.hosts, |id| first.hosts.get(id).map_or(true, |h| h.rack == rack.id));
            let stores = owned_ids(&rack.stores, |id| {
                first
                    .stores
                    .get(id)
                    .map_or(true, |s| s.location == StoreLocation::Rack(rack.id.clone()))
            });
            let target = result
                .racks
                .entry(rack.id.clone())
                .or_insert_with(|| PhysicalRack::new(&rack.id, &rack.data_center));
            union_ids(&mut target.hosts, &hosts);
            union_ids(&mut target.stores, &stores);
        }
        for host in second.hosts.values() {
            let stores = owned_ids(&host.stores, |id| {
                first
                    .stores
                    .get(id)
                    .map_or(true, |s| s.location == StoreLocation::Host(host.id.clone()))
            });
            let target = result.hosts.entry(host.id.clone()).or_insert_with(|| PhysicalHost {
                stores: Vec::new(),
                ..host.clone()
            });
            union_ids(&mut target.stores, &stores);
        }
        for store in second.stores.values() {
            result.stores.entry(store.id.clone()).or_insert_with(|| store.clone());
        }
        result
    }

    /// Removes hosts not matching the predicate together with their local stores, then prunes the tree.
    pub fn retain_hosts<F>(&mut self, mut keep: F)
    where
        F: FnMut(&PhysicalHost) -> bool,
    {
        let removed: Vec<PhysicalHost> = self.hosts.values().filter(|host| !keep(host)).cloned().collect();
        for host in removed {
            self.hosts.shift_remove(&host.id);
            for store in &host.stores {
                self.stores.shift_remove(store);
            }
            if let Some(rack) = self.racks.get_mut(&host.rack) {
                rack.hosts.retain(|id| id != &host.id);
            }
        }
        self.prune();
    }

    /// Removes racks without hosts and stores, then data centers without racks.
    pub fn prune(&mut self) {
        let empty_racks: Vec<(String, String)> = self
            .racks
            .values()
            .filter(|rack| rack.is_empty())
            .map(|rack| (rack.id.clone(), rack.data_center.clone()))
            .collect();
        for (rack, dc) in empty_racks {
            self.racks.shift_remove(&rack);
            if let Some(dc) = self.data_centers.get_mut(&dc) {
                dc.racks.retain(|id| id != &rack);
            }
        }
        self.data_centers.retain(|_, dc| !dc.racks.is_empty());
    }
}

fn owned_ids<F: Fn(&String) -> bool>(ids: &[String], owned: F) -> Vec<String> {
    ids.iter().filter(|id| owned(id)).cloned().collect()
}

fn union_ids(target: &mut Vec<String>, other: &[String]) {
    for id in other {
        if !target.contains(id) {
            target.push(id.clone());
        }
    }
}
