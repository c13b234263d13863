//! Selection helpers shared by placement policies.

use log::warn;
use rand::prelude::*;

use crate::application::VmTemplate;
use crate::error::DeployerError;
use crate::placement_context::PlacementContext;
use crate::topology::{Identifiable, PhysicalHost, PhysicalStore};

/// Stores filled to this ratio or above are not used for new machines.
pub const MAX_SUITABLE_STORAGE_RATIO: f64 = 0.6;

/// Returns candidates tied at the minimum usage, keeping their order.
pub fn least_used_list<'t, T, F>(candidates: &[&'t T], usage: F) -> Vec<&'t T>
where
    T: ?Sized,
    F: Fn(&T) -> u32,
{
    let min = match candidates.iter().map(|c| usage(*c)).min() {
        Some(min) => min,
        None => return Vec::new(),
    };
    candidates.iter().copied().filter(|c| usage(*c) == min).collect()
}

/// Returns a random candidate among those tied at the minimum usage.
pub fn pick_least_used<'t, T, F, R>(candidates: &[&'t T], usage: F, rng: &mut R) -> Option<&'t T>
where
    T: ?Sized,
    F: Fn(&T) -> u32,
    R: Rng + ?Sized,
{
    least_used_list(candidates, usage).choose(rng).copied()
}

/// Returns the host with the lowest CPU usage if the template weighs CPU over memory, else the host with the lowest
/// memory usage. The first host wins ties.
pub fn least_stressed<'t>(hosts: &[&'t PhysicalHost], template: &VmTemplate) -> Option<&'t PhysicalHost> {
    let cpu_preferred = template.cpu() > template.mem();
    let mut best = None;
    let mut statistic = f64::MAX;
    for host in hosts {
        let value = if cpu_preferred { host.cpu_usage() } else { host.mem_usage() };
        if value < statistic {
            statistic = value;
            best = Some(*host);
        }
    }
    best
}

/// Picks the least stressed host among the least used ones.
pub fn least_stressed_from_least_used<'t>(
    hosts: &[&'t PhysicalHost],
    ctx: &PlacementContext,
    template: &VmTemplate,
) -> Option<&'t PhysicalHost> {
    let least_used = least_used_list(hosts, |h| ctx.host_usage(h.id()));
    least_stressed(&least_used, template)
}

/// Returns the store with the lowest used ratio if that ratio is below [`MAX_SUITABLE_STORAGE_RATIO`].
pub fn suitable_store<'t>(stores: &[&'t PhysicalStore]) -> Result<&'t PhysicalStore, DeployerError> {
    let mut suitable = None;
    let mut best = MAX_SUITABLE_STORAGE_RATIO;
    for store in stores {
        let ratio = store.used_ratio();
        if ratio < best {
            best = ratio;
            suitable = Some(*store);
        }
    }
    suitable.ok_or_else(|| DeployerError::infeasible("Not enough disk space"))
}

/// Picks a suitable store among the least used ones.
pub fn suitable_store_from_least_used<'t>(
    stores: &[&'t PhysicalStore],
    ctx: &PlacementContext,
) -> Result<&'t PhysicalStore, DeployerError> {
    let least_used = least_used_list(stores, |s| ctx.store_usage(s.id()));
    suitable_store(&least_used)
}

/// Picks a suitable store among the least used ones, falling back to all stores.
pub fn suitable_store_from_least_used_or_full<'t>(
    stores: &[&'t PhysicalStore],
    ctx: &PlacementContext,
) -> Result<&'t PhysicalStore, DeployerError> {
    suitable_store_from_least_used(stores, ctx).or_else(|_| {
        warn!("None of the least used stores are suitable, trying all {} stores", stores.len());
        suitable_store(stores)
    })
}

/// Returns a random candidate different from `avoid`, or `avoid` itself if there is no other one.
pub fn pick_other<'t, T, R>(candidates: &[&'t T], avoid: &'t T, rng: &mut R) -> &'t T
where
    T: Identifiable + ?Sized,
    R: Rng + ?Sized,
{
    let mut shuffled = candidates.to_vec();
    shuffled.shuffle(rng);
    shuffled.into_iter().find(|c| c.id() != avoid.id()).unwrap_or(avoid)
}
